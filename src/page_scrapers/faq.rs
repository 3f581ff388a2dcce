use fxhash::FxHashSet;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use crate::{
    browser::{poll_until, Page, HEADING_SELECTOR},
    error::{Result, ScrapeError},
};

use super::{inner_text, Regexes, ScraperState};

/// No more games than this are scraped per run.
pub(super) const MAX_GAMES: usize = 10;


/// Answer lists, as counted by the indices in [`FaqBlock`].
const LIST_SELECTOR: &str = "ol, ul";


/// How far the FAQ block of a page has rendered.
///
/// Indices count elements matching [`HEADING_SELECTOR`] or [`LIST_SELECTOR`] in document order,
/// so the browser can be asked whether those exact elements are visible.
#[derive(Debug, PartialEq, Eq)]
enum FaqBlock {
    NoHeading,
    NoList { heading: usize },
    Found { heading: usize, list: usize, items: Vec<String> },
}


/// Upper-cases the first character and lower-cases the rest, so "rACING" becomes "Racing".
pub(super) fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}


pub(super) fn faq_question(genre: &str) -> String {
    format!("What are the most popular {} Games?", capitalize(genre))
}


/// Looks for a heading reading exactly `question` and the first list after it in document order.
fn find_faq_block(html: &str, question: &str) -> FaqBlock {
    let document = Html::parse_document(html);
    let candidates = Selector::parse(&format!("{HEADING_SELECTOR}, {LIST_SELECTOR}"))
        .expect("FAQ selector should have been valid");
    let headings = Selector::parse(HEADING_SELECTOR).expect("Heading selector should have been valid");
    let items = Selector::parse("li").expect("List item selector should have been valid");

    let mut headings_seen = 0;
    let mut lists_seen = 0;
    let mut heading: Option<(usize, ElementRef)> = None;
    for element in document.select(&candidates) {
        let is_list = matches!(element.value().name(), "ol" | "ul");
        let is_heading = headings.matches(&element);

        if let Some((index, found)) = heading {
            // Lists nested inside the heading itself do not count
            if is_list && !element.ancestors().any(|node| node.id() == found.id()) {
                return FaqBlock::Found {
                    heading: index,
                    list: lists_seen,
                    items: element.select(&items).map(inner_text).collect(),
                };
            }
        } else if is_heading && inner_text(element) == question {
            heading = Some((headings_seen, element));
        }

        headings_seen += usize::from(is_heading);
        lists_seen += usize::from(is_list);
    }

    match heading {
        Some((index, _)) => FaqBlock::NoList { heading: index },
        None => FaqBlock::NoHeading,
    }
}


/// Turns raw answer items into game names: numbering and whitespace stripped, blanks and
/// repeats dropped, first [`MAX_GAMES`] kept in their original order.
pub(super) fn clean_game_names(raw_items: &[String], regexes: &Regexes) -> Vec<String> {
    let mut seen = FxHashSet::default();
    raw_items
        .iter()
        .map(|item| regexes.enumeration.replace(item, "").trim().to_string())
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.clone()))
        .take(MAX_GAMES)
        .collect()
}


/// Reads the names of the most popular games of `genre` out of the FAQ block on the current page.
///
/// Fails if the question or its answer list never becomes visible, or if the list holds no usable names.
pub(crate) fn extract_game_names(page: &mut dyn Page, genre: &str, state: &ScraperState) -> Result<Vec<String>> {
    let question = faq_question(genre);
    let timeouts = &state.config.timeouts;

    poll_until(&question, timeouts.faq_heading(), timeouts.poll_interval(), || {
        Ok(match find_faq_block(&page.content()?, &question) {
            FaqBlock::NoHeading => None,
            FaqBlock::NoList { heading } | FaqBlock::Found { heading, .. } => {
                page.is_visible(HEADING_SELECTOR, heading)?.then_some(())
            }
        })
    })
    .map_err(|e| if e.is_timeout() { ScrapeError::NoFaqHeading(question.clone()) } else { e })?;
    page.scroll_to_heading(&question)?;
    info!("Found FAQ question: '{question}'");

    let raw_items = poll_until("FAQ answer list", timeouts.faq_list(), timeouts.poll_interval(), || {
        Ok(match find_faq_block(&page.content()?, &question) {
            FaqBlock::Found { list, items, .. } => page.is_visible(LIST_SELECTOR, list)?.then_some(items),
            _ => None,
        })
    })
    .map_err(|e| if e.is_timeout() { ScrapeError::NoFaqList(question.clone()) } else { e })?;
    debug!("Raw FAQ list items extracted: {raw_items:?}");

    let names = clean_game_names(&raw_items, &state.regexes);
    if names.is_empty() {
        return Err(ScrapeError::NoGameNames(question));
    }
    info!("Final list of games to scrape: {names:?}");
    Ok(names)
}
