//! An in-memory site for exercising the scrapers without a browser.

use std::time::Duration;

use fxhash::FxHashMap;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::{
    config::Config,
    error::{Result, ScrapeError},
    page_scrapers::{inner_text, parse_selector, ScraperState},
};

use super::{Page, HEADING_SELECTOR};

const EMPTY_PAGE: &str = "<html><body></body></html>";


/// Serves canned HTML keyed by URL. Searches jump to a canned results page.
///
/// Nothing ever changes while waiting, so every wait resolves or times out on the first look.
pub(crate) struct FixturePage {
    root: Url,
    pages: FxHashMap<Url, String>,
    searches: FxHashMap<String, Url>,
    current: Url,
    pub(crate) visits: Vec<String>,
}


impl FixturePage {
    pub(crate) fn new(root: &str) -> Self {
        let root: Url = root.parse().expect("Fixture root should have been a valid URL");
        Self {
            current: root.clone(),
            root,
            pages: Default::default(),
            searches: Default::default(),
            visits: Vec::new(),
        }
    }

    pub(crate) fn with_page(mut self, path: &str, html: &str) -> Self {
        let url = self.resolve(path);
        self.pages.insert(url, html.to_string());
        self
    }

    pub(crate) fn with_search(mut self, query: &str, path: &str) -> Self {
        let url = self.resolve(path);
        self.searches.insert(query.to_string(), url);
        self
    }

    /// Config pointing at this site with waits short enough for tests.
    pub(crate) fn state(&self) -> ScraperState {
        let mut config = Config::default();
        config.site_url = self.root.clone();
        config.timeouts.genre_link = 1;
        config.timeouts.result_card = 1;
        config.timeouts.faq_heading = 1;
        config.timeouts.faq_list = 1;
        config.timeouts.summary_rows = 1;
        config.timeouts.poll_interval = 1;
        ScraperState::new(config)
    }

    fn resolve(&self, path: &str) -> Url {
        self.root.join(path).expect("Fixture path should have been joinable")
    }

    fn document(&self) -> Html {
        Html::parse_document(self.pages.get(&self.current).map(String::as_str).unwrap_or(EMPTY_PAGE))
    }

    fn navigate(&mut self, url: Url) {
        self.visits.push(url.to_string());
        self.current = url;
    }

    fn follow(&mut self, element: ElementRef<'_>) -> Result<()> {
        let href = element
            .value()
            .attr("href")
            .or_else(|| {
                let link = Selector::parse("a[href]").expect("Link selector should have been valid");
                element.select(&link).next().and_then(|a| a.value().attr("href"))
            })
            .ok_or_else(|| ScrapeError::Browser("clicked element leads nowhere".into()))?;
        let url = self
            .current
            .join(href)
            .map_err(|e| ScrapeError::Browser(format!("bad href {href}: {e}")))?;
        self.navigate(url);
        Ok(())
    }
}


impl Page for FixturePage {
    fn goto(&mut self, url: &Url) -> Result<()> {
        self.navigate(url.clone());
        Ok(())
    }

    fn search(&mut self, query: &str) -> Result<()> {
        let url = match self.searches.get(query) {
            Some(url) => url.clone(),
            None => self.resolve(&format!("search?q={query}")),
        };
        self.navigate(url);
        Ok(())
    }

    fn click_first(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        let parsed = parse_selector(selector)?;
        let document = self.document();
        let first = document
            .select(&parsed)
            .next()
            .ok_or_else(|| ScrapeError::timeout(selector, timeout))?;
        self.follow(first)
    }

    fn click_link_named(&mut self, name: &Regex, timeout: Duration) -> Result<()> {
        let link = Selector::parse("a").expect("Link selector should have been valid");
        let document = self.document();
        let found = document
            .select(&link)
            .find(|a| {
                let accessible = a.value().attr("aria-label").map(str::to_string).unwrap_or_else(|| inner_text(*a));
                name.is_match(&accessible)
            })
            .ok_or_else(|| ScrapeError::timeout(format!("link named /{name}/"), timeout))?;
        self.follow(found)
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        let parsed = parse_selector(selector)?;
        match self.document().select(&parsed).next() {
            Some(_) => Ok(()),
            None => Err(ScrapeError::timeout(selector, timeout)),
        }
    }

    /// Only inline styles and the `hidden` attribute are understood, on the element or any ancestor.
    fn is_visible(&self, selector: &str, index: usize) -> Result<bool> {
        let parsed = parse_selector(selector)?;
        let document = self.document();
        let Some(element) = document.select(&parsed).nth(index) else {
            return Ok(false);
        };
        let hidden = std::iter::once(element)
            .chain(element.ancestors().filter_map(ElementRef::wrap))
            .any(|node| {
                let style = node.value().attr("style").unwrap_or_default().replace(' ', "");
                node.value().attr("hidden").is_some()
                    || style.contains("display:none")
                    || style.contains("visibility:hidden")
            });
        Ok(!hidden)
    }

    fn scroll_to_heading(&mut self, text: &str) -> Result<()> {
        let headings = parse_selector(HEADING_SELECTOR)?;
        if self.document().select(&headings).any(|h| inner_text(h) == text) {
            Ok(())
        } else {
            Err(ScrapeError::Browser(format!("no heading '{text}'")))
        }
    }

    fn url(&self) -> Result<String> {
        Ok(self.current.to_string())
    }

    fn content(&self) -> Result<String> {
        Ok(self.pages.get(&self.current).cloned().unwrap_or_else(|| EMPTY_PAGE.to_string()))
    }
}
