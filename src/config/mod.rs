use std::{io::ErrorKind, path::{Path, PathBuf}, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use tracing::info;
use url::Url;
use validator::{Validate, ValidationError};

use crate::spreadsheet::SpreadsheetFormat;

pub(super) const CONFIG_PATH: &str = "config.toml";
const CRAZY_GAMES_URL: &str = "https://www.crazygames.com/";
const OUTPUT_FILE_STEM: &str = "crazygames_data";


/// Everything about the target site and the run that is not typed in by the user.
///
/// Every field has a default, so a missing `config.toml` or a partial one is fine.
#[derive(Deserialize, Validate, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    /// Root of the site. Every game search starts from here.
    pub(crate) site_url: Url,
    /// Where the spreadsheet is written once all games are scraped.
    /// Defaults to `crazygames_data` with the extension of `format`.
    #[validate(length(min = 1))]
    pub(crate) output_path: Option<String>,
    pub(crate) format: SpreadsheetFormat,
    /// Field separator when writing CSV. A tab gives a TSV.
    #[validate(custom = "validate_delimiter")]
    pub(crate) delimiter: char,
    /// Hide the browser window.
    pub(crate) headless: bool,
    #[validate]
    pub(crate) selectors: Selectors,
    #[validate]
    pub(crate) timeouts: Timeouts,
}


/// CSS selectors for the parts of the site the scraper touches.
///
/// These are tied to the live markup of a third party site and are expected to rot.
#[derive(Deserialize, Validate, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Selectors {
    #[validate(length(min = 1))]
    pub(crate) search_input: String,
    /// A search result card, clicked when there is no dedicated genre page.
    #[validate(length(min = 1))]
    pub(crate) result_card: String,
    /// The link inside a search result card, clicked to open a game.
    #[validate(length(min = 1))]
    pub(crate) result_link: String,
    #[validate(length(min = 1))]
    pub(crate) summary_row: String,
    #[validate(length(min = 1))]
    pub(crate) game_title: String,
}


/// Bounds on every wait, in milliseconds.
#[derive(Deserialize, Validate, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Timeouts {
    #[validate(range(min = 1, max = 600000))]
    pub(crate) genre_link: u64,
    #[validate(range(min = 1, max = 600000))]
    pub(crate) result_card: u64,
    #[validate(range(min = 1, max = 600000))]
    pub(crate) faq_heading: u64,
    #[validate(range(min = 1, max = 600000))]
    pub(crate) faq_list: u64,
    #[validate(range(min = 1, max = 600000))]
    pub(crate) summary_rows: u64,
    /// Upper bound for a page to go network idle.
    #[validate(range(min = 1, max = 600000))]
    pub(crate) navigation: u64,
    /// How long the network has to stay quiet to count as idle.
    #[validate(range(min = 1, max = 60000))]
    pub(crate) idle_window: u64,
    #[validate(range(min = 1, max = 10000))]
    pub(crate) poll_interval: u64,
}


fn validate_delimiter(delimiter: &char) -> Result<(), ValidationError> {
    if delimiter.is_ascii() && !matches!(delimiter, '"' | '\n' | '\r') {
        Ok(())
    } else {
        Err(ValidationError::new("delimiter must be a single ASCII character other than a quote or newline"))
    }
}


impl Default for Config {
    fn default() -> Self {
        Self {
            site_url: CRAZY_GAMES_URL.parse().expect("Default site URL should have been valid"),
            output_path: None,
            format: SpreadsheetFormat::default(),
            delimiter: ',',
            headless: false,
            selectors: Selectors::default(),
            timeouts: Timeouts::default(),
        }
    }
}


impl Default for Selectors {
    fn default() -> Self {
        Self {
            search_input: "#search-input".to_string(),
            result_card: "div.css-1uvr28v".to_string(),
            result_link: "div.css-1uvr28v a".to_string(),
            summary_row: "div.GameSummary_gameTableRow__9i4Mt".to_string(),
            game_title: "h1".to_string(),
        }
    }
}


impl Default for Timeouts {
    fn default() -> Self {
        Self {
            genre_link: 5000,
            result_card: 10000,
            faq_heading: 10000,
            faq_list: 5000,
            summary_rows: 10000,
            navigation: 30000,
            idle_window: 500,
            poll_interval: 100,
        }
    }
}


impl Timeouts {
    pub(crate) fn genre_link(&self) -> Duration { Duration::from_millis(self.genre_link) }
    pub(crate) fn result_card(&self) -> Duration { Duration::from_millis(self.result_card) }
    pub(crate) fn faq_heading(&self) -> Duration { Duration::from_millis(self.faq_heading) }
    pub(crate) fn faq_list(&self) -> Duration { Duration::from_millis(self.faq_list) }
    pub(crate) fn summary_rows(&self) -> Duration { Duration::from_millis(self.summary_rows) }
    pub(crate) fn navigation(&self) -> Duration { Duration::from_millis(self.navigation) }
    pub(crate) fn idle_window(&self) -> Duration { Duration::from_millis(self.idle_window) }
    pub(crate) fn poll_interval(&self) -> Duration { Duration::from_millis(self.poll_interval) }
}


impl Config {
    pub(crate) fn output_path(&self) -> PathBuf {
        match &self.output_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(format!("{OUTPUT_FILE_STEM}.{}", self.format.extension())),
        }
    }

    /// Reads and validates the config file at `path`, falling back to the defaults if it does not exist.
    pub(crate) async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config = match tokio::fs::read_to_string(path).await {
            Ok(text) => toml::from_str::<Config>(&text)
                .with_context(|| format!("Failed to parse {}", path.display()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No {} found, using the default configuration", path.display());
                Config::default()
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
        };
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}
