//! Error types shared by the browser driver and the page scrapers.
//!
//! Timeouts are kept apart from every other failure so that callers can pick a
//! fallback path instead of aborting. Everything else is either fatal for the
//! run, or swallowed per game by the detail scraper.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum ScrapeError {
    #[error("Timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("FAQ question not found: '{0}'")]
    NoFaqHeading(String),

    #[error("No answer list follows the FAQ question '{0}'")]
    NoFaqList(String),

    #[error("Could not find any game names under '{0}'")]
    NoGameNames(String),

    #[error("Could not find or click any link for genre '{0}'")]
    GenreNavigation(String),

    #[error("Spreadsheet error: {0}")]
    Output(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    pub(crate) fn timeout(what: impl Into<String>, after: Duration) -> Self {
        Self::Timeout { what: what.into(), after }
    }

    pub(crate) fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<anyhow::Error> for ScrapeError {
    // headless_chrome reports everything through anyhow
    fn from(value: anyhow::Error) -> Self {
        Self::Browser(format!("{value:#}"))
    }
}

pub(crate) type Result<T> = std::result::Result<T, ScrapeError>;
