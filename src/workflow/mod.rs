use tracing::{debug, info};

use crate::{
    browser::Page,
    error::Result,
    page_scrapers::{extract_game_names, navigate_to_genre, scrape_game, GameRecord, ScraperState},
};


/// Trims the user's answer. Nothing left means there is nothing to search for.
pub(super) fn normalize_genre(input: &str) -> Option<String> {
    let genre = input.trim();
    (!genre.is_empty()).then(|| genre.to_string())
}


/// Runs every browser step for `genre` and returns one record per popular game, in FAQ order.
///
/// Errors here abort the run. Failures scraping a single game do not; they show up as
/// placeholder rows instead.
pub(super) fn collect_records(page: &mut dyn Page, genre: &str, state: &ScraperState) -> Result<Vec<GameRecord>> {
    let site_url = &state.config.site_url;

    info!("Navigating to {site_url}");
    page.goto(site_url)?;

    info!("Searching for genre: '{genre}'");
    let landing = navigate_to_genre(page, genre, state)?;
    debug!(?landing, "Reached a page for the genre");

    info!("Locating FAQ section and extracting popular game names");
    let game_names = extract_game_names(page, genre, state)?;

    info!("Scraping details for {} games", game_names.len());
    let mut records = Vec::with_capacity(game_names.len());
    for game_name in &game_names {
        page.goto(site_url)?;
        let record = scrape_game(page, game_name, state);
        info!(?record, "Scraped");
        records.push(record);
    }
    Ok(records)
}
