//! [`Page`] implementation on top of Chrome DevTools Protocol.

use std::{sync::Arc, thread, time::{Duration, Instant}};

use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use regex::Regex;
use tracing::{debug, info};
use url::Url;

use crate::{
    config::Config,
    error::{Result, ScrapeError},
};

use super::{poll_until, Page, HEADING_SELECTOR};

/// Evaluates to the number of network resources loaded so far, or -1 while the document is still loading.
///
/// The resource timing buffer is enlarged first, otherwise it stops growing at 250 entries and the
/// page would look idle too early.
const NETWORK_ACTIVITY_JS: &str = "(performance.setResourceTimingBufferSize(100000), \
    document.readyState === 'complete' ? performance.getEntriesByType('resource').length : -1)";
const IS_VISIBLE_JS: &str = "function() { \
    const rect = this.getBoundingClientRect(); \
    const style = window.getComputedStyle(this); \
    return rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden'; }";
const ACCESSIBLE_NAME_JS: &str = "function() { return (this.getAttribute('aria-label') || this.innerText || '').trim(); }";
const CLEAR_VALUE_JS: &str = "function() { this.value = ''; }";


/// A visible or headless Chrome with a single tab.
pub(crate) struct ChromePage {
    /// Kept alive for the lifetime of the tab. Dropping it kills the browser process,
    /// which also happens when the page is dropped without [`ChromePage::close`].
    browser: Browser,
    tab: Arc<Tab>,
    search_input: String,
    navigation: Duration,
    idle_window: Duration,
    poll_interval: Duration,
}


impl ChromePage {
    pub(crate) fn launch(config: &Config) -> Result<Self> {
        info!(headless = config.headless, "Launching browser");

        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((1920, 1080)))
            .build()
            .map_err(|e| ScrapeError::Browser(format!("Failed to launch browser: {e}")))?;
        let browser = Browser::new(options)
            .map_err(|e| ScrapeError::Browser(format!("Failed to launch browser: {e}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| ScrapeError::Browser(format!("Failed to create tab: {e}")))?;
        tab.set_default_timeout(config.timeouts.navigation());

        Ok(Self {
            browser,
            tab,
            search_input: config.selectors.search_input.clone(),
            navigation: config.timeouts.navigation(),
            idle_window: config.timeouts.idle_window(),
            poll_interval: config.timeouts.poll_interval(),
        })
    }

    /// Blocks until the document has loaded and no new resource has been fetched for the idle window.
    fn wait_for_idle(&self) -> Result<()> {
        self.tab.wait_until_navigated()?;

        let deadline = Instant::now() + self.navigation;
        let mut last_count = self.network_activity()?;
        let mut quiet_since = Instant::now();
        loop {
            thread::sleep(self.poll_interval);
            let count = self.network_activity()?;
            if count != last_count || count < 0 {
                last_count = count;
                quiet_since = Instant::now();
            } else if quiet_since.elapsed() >= self.idle_window {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ScrapeError::timeout("network idle", self.navigation));
            }
        }
    }

    fn network_activity(&self) -> Result<i64> {
        let object = self.tab.evaluate(NETWORK_ACTIVITY_JS, false)?;
        Ok(object.value.and_then(|value| value.as_i64()).unwrap_or(-1))
    }

    fn first_visible(&self, selector: &str, timeout: Duration) -> Result<Element<'_>> {
        poll_until(selector, timeout, self.poll_interval, || {
            // No match yet shows up as an error from find_elements
            let Ok(elements) = self.tab.find_elements(selector) else {
                return Ok(None);
            };
            Ok(first_passing(elements.into_iter().take(1), is_visible))
        })
    }

    /// Shuts the browser down.
    pub(crate) fn close(self) {
        info!("Closing browser session");
        drop(self.tab);
        drop(self.browser);
        debug!("Browser process released");
    }
}


/// First candidate that passes `check`. A failing check, usually a node detached by a
/// re-render between lookup and inspection, skips the candidate instead of ending the wait.
fn first_passing<T>(candidates: impl IntoIterator<Item = T>, mut check: impl FnMut(&T) -> Result<bool>) -> Option<T> {
    candidates.into_iter().find(|candidate| match check(candidate) {
        Ok(passed) => passed,
        Err(e) => {
            debug!("Skipping stale element: {e}");
            false
        }
    })
}


fn is_visible(element: &Element<'_>) -> Result<bool> {
    let object = element.call_js_fn(IS_VISIBLE_JS, vec![], false)?;
    Ok(object.value.and_then(|value| value.as_bool()).unwrap_or(false))
}


fn accessible_name(element: &Element<'_>) -> Result<String> {
    let object = element.call_js_fn(ACCESSIBLE_NAME_JS, vec![], false)?;
    Ok(object
        .value
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_default())
}


impl Page for ChromePage {
    fn goto(&mut self, url: &Url) -> Result<()> {
        debug!("Navigating to {url}");
        self.tab
            .navigate_to(url.as_str())
            .map_err(|e| ScrapeError::Browser(format!("Failed to navigate to {url}: {e}")))?;
        self.wait_for_idle()
    }

    fn search(&mut self, query: &str) -> Result<()> {
        debug!("Submitting search '{query}'");
        let input = self.first_visible(&self.search_input, self.navigation)?;
        input.click()?;
        input.call_js_fn(CLEAR_VALUE_JS, vec![], false)?;
        input.type_into(query)?;
        self.tab.press_key("Enter")?;
        self.wait_for_idle()
    }

    fn click_first(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        debug!("Clicking first '{selector}' (timeout: {timeout:?})");
        self.first_visible(selector, timeout)?.click()?;
        self.wait_for_idle()
    }

    fn click_link_named(&mut self, name: &Regex, timeout: Duration) -> Result<()> {
        debug!("Clicking link named /{name}/ (timeout: {timeout:?})");
        let link = poll_until(&format!("link named /{name}/"), timeout, self.poll_interval, || {
            let Ok(links) = self.tab.find_elements("a") else {
                return Ok(None);
            };
            Ok(first_passing(links, |link| Ok(name.is_match(&accessible_name(link)?) && is_visible(link)?)))
        })?;
        link.click()?;
        self.wait_for_idle()
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        debug!("Waiting for '{selector}' (timeout: {timeout:?})");
        poll_until(selector, timeout, self.poll_interval, || {
            Ok(self.tab.find_element(selector).ok().map(|_| ()))
        })
    }

    fn is_visible(&self, selector: &str, index: usize) -> Result<bool> {
        let script = format!(
            "(() => {{ \
                const element = document.querySelectorAll({})[{index}]; \
                return !!element && ({IS_VISIBLE_JS}).call(element); \
            }})()",
            serde_json::to_string(selector).map_err(|e| ScrapeError::Browser(e.to_string()))?,
        );
        Ok(self
            .tab
            .evaluate(&script, false)?
            .value
            .and_then(|value| value.as_bool())
            .unwrap_or(false))
    }

    fn scroll_to_heading(&mut self, text: &str) -> Result<()> {
        let script = format!(
            "(() => {{ \
                const wanted = {}; \
                const heading = Array.from(document.querySelectorAll({})) \
                    .find(element => element.textContent.trim() === wanted); \
                if (!heading) return false; \
                heading.scrollIntoView({{ block: 'center' }}); \
                return true; \
            }})()",
            serde_json::to_string(text).map_err(|e| ScrapeError::Browser(e.to_string()))?,
            serde_json::to_string(HEADING_SELECTOR).map_err(|e| ScrapeError::Browser(e.to_string()))?,
        );
        let scrolled = self
            .tab
            .evaluate(&script, false)?
            .value
            .and_then(|value| value.as_bool())
            .unwrap_or(false);
        if scrolled {
            Ok(())
        } else {
            Err(ScrapeError::Browser(format!("Heading '{text}' disappeared before it could be scrolled to")))
        }
    }

    fn url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }

    fn content(&self) -> Result<String> {
        Ok(self.tab.get_content()?)
    }
}
