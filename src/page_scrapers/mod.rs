use regex::Regex;
use scraper::{ElementRef, Selector};
use serde::Serialize;

use crate::{config::Config, error::{Result, ScrapeError}};

pub(super) use self::{details::scrape_game, faq::extract_game_names, genre::navigate_to_genre};

mod details;
mod faq;
mod genre;


/// Placeholder for any field that could not be determined.
pub(crate) const SENTINEL: &str = "N/A";

/// Spreadsheet header, in column order.
pub(crate) const COLUMNS: [&str; 6] = ["Game Name", "Game URL", "Developer", "Rating", "Votes", "Platform"];


/// Everything gathered about one game.
///
/// Fields are declared in [`COLUMNS`] order, which is also the order they are serialized in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct GameRecord {
    #[serde(rename = "Game Name")]
    pub(crate) name: String,
    #[serde(rename = "Game URL")]
    pub(crate) url: String,
    #[serde(rename = "Developer")]
    pub(crate) developer: String,
    /// Usually a decimal, but holds whatever followed the label when the votes pattern did not match.
    #[serde(rename = "Rating")]
    pub(crate) rating: String,
    #[serde(rename = "Votes")]
    pub(crate) votes: String,
    #[serde(rename = "Platform")]
    pub(crate) platform: String,
}


impl Default for GameRecord {
    fn default() -> Self {
        Self {
            name: SENTINEL.to_string(),
            url: SENTINEL.to_string(),
            developer: SENTINEL.to_string(),
            rating: SENTINEL.to_string(),
            votes: SENTINEL.to_string(),
            platform: SENTINEL.to_string(),
        }
    }
}


impl GameRecord {
    /// The row recorded for a game whose details could not be scraped.
    pub(crate) fn failed(query: &str) -> Self {
        Self { name: format!("{query} (Error)"), ..Default::default() }
    }

    /// Field values in [`COLUMNS`] order.
    pub(crate) fn values(&self) -> [&str; 6] {
        [&self.name, &self.url, &self.developer, &self.rating, &self.votes, &self.platform]
    }
}


pub(crate) struct Regexes {
    /// "1. ", "12." and the like in front of an FAQ answer
    enumeration: Regex,
    /// "4.5 (12,345 votes)"
    rating: Regex,
}


impl Default for Regexes {
    fn default() -> Self {
        Self {
            enumeration: Regex::new(r"^\s*\d+\.\s*").expect("Enumeration regex should have been valid"),
            rating: Regex::new(r"(\d+(\.\d+)?)\s+\(([\d,]+)\s+votes\)").expect("Rating regex should have been valid"),
        }
    }
}


/// Configuration plus everything derived from it once per run.
pub(crate) struct ScraperState {
    pub(crate) config: Config,
    pub(crate) regexes: Regexes,
}


impl ScraperState {
    pub(crate) fn new(config: Config) -> Self {
        Self { config, regexes: Regexes::default() }
    }
}


/// Text of `element` roughly as a browser would render it: each text node trimmed,
/// blank ones dropped, the rest joined by single spaces.
pub(crate) fn inner_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(|x| x.replace('\u{a0}', " "))
        .filter_map(|x| {
            let trimmed = x.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect::<Vec<_>>()
        .join(" ")
}


pub(crate) fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector(format!("{css}: {e:?}")))
}
