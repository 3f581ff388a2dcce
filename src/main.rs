use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{
    browser::ChromePage,
    config::{Config, CONFIG_PATH},
    page_scrapers::ScraperState,
    spreadsheet::Spreadsheet,
    workflow::{collect_records, normalize_genre},
};

mod browser;
mod config;
mod error;
mod page_scrapers;
mod spreadsheet;
mod workflow;


async fn prompt_genre() -> anyhow::Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(b"Please enter the game genre you want to search for (e.g., Action, Puzzle, Racing): ")
        .await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(normalize_genre(&line))
}


#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load(CONFIG_PATH).await?;

    let Some(genre) = prompt_genre().await? else {
        error!("Genre cannot be empty. Exiting.");
        return Ok(());
    };

    let spreadsheet = Spreadsheet::from_config(&config);
    let state = ScraperState::new(config);

    // headless_chrome blocks, so the whole browser session lives on a rayon thread.
    // The page is dropped, and the browser killed, on every path out of this closure.
    let records = tokio_rayon::spawn(move || -> anyhow::Result<_> {
        let mut page = ChromePage::launch(&state.config)?;
        let records = collect_records(&mut page, &genre, &state);
        page.close();
        Ok(records?)
    })
    .await
    .context("Scraping failed, no spreadsheet was written")?;

    info!("Saving data to '{}'", spreadsheet.path.display());
    spreadsheet
        .write(&records)
        .await
        .with_context(|| format!("Failed to write {}. Do we have permissions?", spreadsheet.path.display()))?;
    info!("Done! Your file has been saved successfully.");
    Ok(())
}
