use std::time::{Duration, Instant};

use regex::Regex;
use url::Url;

use crate::error::{Result, ScrapeError};

pub(crate) mod chrome;
#[cfg(test)]
pub(crate) mod fixture;

pub(crate) use chrome::ChromePage;

/// Elements that count as headings when looking for an FAQ question.
pub(crate) const HEADING_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, [role=heading]";


/// A single browser tab, driven one step at a time.
///
/// Every method that changes the page returns only once the page has gone network idle.
/// Every wait is bounded, and running out of time is reported as [`ScrapeError::Timeout`]
/// so that callers can try something else.
pub(crate) trait Page {
    /// Loads `url`.
    fn goto(&mut self, url: &Url) -> Result<()>;

    /// Types `query` into the site's search box and submits it.
    fn search(&mut self, query: &str) -> Result<()>;

    /// Clicks the first element matching `selector` once it is visible.
    fn click_first(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    /// Clicks the first visible link whose accessible name matches `name`.
    fn click_link_named(&mut self, name: &Regex, timeout: Duration) -> Result<()>;

    /// Waits until at least one element matches `selector`.
    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    /// Whether the `index`th element matching `selector`, in document order, is rendered.
    /// An index past the last match is not visible.
    fn is_visible(&self, selector: &str, index: usize) -> Result<bool>;

    /// Scrolls the heading whose text is exactly `text` into view.
    fn scroll_to_heading(&mut self, text: &str) -> Result<()>;

    fn url(&self) -> Result<String>;

    /// Serialized DOM of the current page.
    fn content(&self) -> Result<String>;
}


/// Calls `check` every `interval` until it produces a value, or fails with a timeout
/// naming `what` once `timeout` has passed. Errors from `check` end the wait early.
pub(crate) fn poll_until<T>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut check: impl FnMut() -> Result<Option<T>>,
) -> Result<T> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(found) = check()? {
            return Ok(found);
        }
        if Instant::now() >= deadline {
            return Err(ScrapeError::timeout(what, timeout));
        }
        std::thread::sleep(interval);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_returns_first_hit() {
        let mut calls = 0;
        let found = poll_until("third call", Duration::from_secs(5), Duration::from_millis(1), || {
            calls += 1;
            Ok((calls == 3).then_some(calls))
        })
        .unwrap();
        assert_eq!(found, 3);
    }

    #[test]
    fn poll_is_bounded() {
        let started = Instant::now();
        let err = poll_until::<()>("nothing", Duration::from_millis(20), Duration::from_millis(5), || Ok(None))
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn poll_stops_on_errors() {
        let mut calls = 0;
        let err = poll_until::<()>("broken", Duration::from_secs(5), Duration::from_millis(1), || {
            calls += 1;
            Err(ScrapeError::Browser("tab crashed".into()))
        })
        .unwrap_err();
        assert!(!err.is_timeout());
        assert_eq!(calls, 1);
    }
}
