use regex::{Regex, RegexBuilder};
use tracing::info;

use crate::{
    browser::Page,
    error::{Result, ScrapeError},
};

use super::ScraperState;


/// Where the genre search left the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GenrePage {
    /// The site's curated landing page for the genre.
    Dedicated,
    /// Some game from the search results, which still carries the genre FAQ.
    FallbackGame,
}


/// Matches "Puzzle" and "Puzzle Games", ignoring case.
fn genre_link_pattern(genre: &str) -> Result<Regex> {
    RegexBuilder::new(&format!(r"^{}(\s+Games)?$", regex::escape(genre)))
        .case_insensitive(true)
        .build()
        .map_err(|e| ScrapeError::GenreNavigation(format!("{genre}: {e}")))
}


/// Searches for `genre` and opens a page that should carry its FAQ block.
///
/// A dedicated genre page is preferred; if no link to one shows up in time, the first
/// search result is opened instead. Running out of time on both is fatal.
pub(crate) fn navigate_to_genre(page: &mut dyn Page, genre: &str, state: &ScraperState) -> Result<GenrePage> {
    let selectors = &state.config.selectors;
    let timeouts = &state.config.timeouts;

    page.search(genre)?;
    info!("Loaded search results for '{genre}'");

    match page.click_link_named(&genre_link_pattern(genre)?, timeouts.genre_link()) {
        Ok(()) => {
            info!("Navigated to the dedicated '{genre}' genre page");
            return Ok(GenrePage::Dedicated);
        }
        Err(e) if e.is_timeout() => {
            info!("Dedicated '{genre}' genre page link not found. Falling back to clicking a game card.");
        }
        Err(e) => return Err(e),
    }

    match page.click_first(&selectors.result_card, timeouts.result_card()) {
        Ok(()) => {
            info!("Navigated to a game page to find the FAQ");
            Ok(GenrePage::FallbackGame)
        }
        Err(e) if e.is_timeout() => Err(ScrapeError::GenreNavigation(genre.to_string())),
        Err(e) => Err(e),
    }
}
