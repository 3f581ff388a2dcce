use fxhash::FxHashSet;
use scraper::Html;
use tracing::{debug, info, warn};

use crate::{browser::Page, error::Result};

use super::{inner_text, parse_selector, GameRecord, Regexes, ScraperState};


/// Tries each rule in turn against a summary row. The first rule that applies owns the row,
/// and fills its field only if no earlier row already did. A rule whose row yields no value
/// leaves the field open for later rows.
macro_rules! apply_summary_rules {
    ($row: expr, $regexes: expr, $record: expr, $claimed: expr; $rule: ty) => {
        if <$rule>::applies($row) {
            if !$claimed.contains(<$rule>::NAME) {
                if <$rule>::extract($row, $regexes, $record) {
                    $claimed.insert(<$rule>::NAME);
                }
            } else {
                debug!("Ignoring extra {} row: '{}'", <$rule>::NAME, $row.text);
            }
        }
    };
    ($row: expr, $regexes: expr, $record: expr, $claimed: expr; $rule: ty, $($rules: ty),+) => {
        if <$rule>::applies($row) {
            apply_summary_rules!($row, $regexes, $record, $claimed; $rule)
        } else {
            apply_summary_rules!($row, $regexes, $record, $claimed; $($rules),+)
        }
    };
}


/// One labeled row of a game's details panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SummaryRow {
    /// Text of the whole row, e.g. "Developer: Acme"
    pub(super) text: String,
    /// Texts of the `div`s inside the row, in document order
    pub(super) cells: Vec<String>,
}


pub(super) trait SummaryRule {
    const NAME: &'static str;

    fn applies(row: &SummaryRow) -> bool;

    /// Fills the rule's field from `row`. Returns whether a value was found.
    fn extract(row: &SummaryRow, regexes: &Regexes, record: &mut GameRecord) -> bool;
}


struct DeveloperRow;

impl SummaryRule for DeveloperRow {
    const NAME: &'static str = "developer";

    fn applies(row: &SummaryRow) -> bool {
        row.text.starts_with("Developer:")
    }

    fn extract(row: &SummaryRow, _: &Regexes, record: &mut GameRecord) -> bool {
        record.developer = strip_label(&row.text, "Developer:");
        true
    }
}


struct RatingRow;

impl SummaryRule for RatingRow {
    const NAME: &'static str = "rating";

    fn applies(row: &SummaryRow) -> bool {
        row.text.starts_with("Rating:")
    }

    /// Splits "4.5 (12,345 votes)" into rating and votes. Anything else is kept whole as the
    /// rating, prose included.
    fn extract(row: &SummaryRow, regexes: &Regexes, record: &mut GameRecord) -> bool {
        match regexes.rating.captures(&row.text) {
            Some(captures) => {
                record.rating = captures[1].to_string();
                record.votes = captures[3].to_string();
            }
            None => record.rating = strip_label(&row.text, "Rating:"),
        }
        true
    }
}


/// Any row whose first cell mentions "Platform", even in passing. Looser than it should be,
/// but the site offers nothing better to key on.
struct PlatformRow;

impl SummaryRule for PlatformRow {
    const NAME: &'static str = "platform";

    fn applies(row: &SummaryRow) -> bool {
        row.cells.first().is_some_and(|cell| cell.contains("Platform"))
    }

    fn extract(row: &SummaryRow, _: &Regexes, record: &mut GameRecord) -> bool {
        match row.cells.get(1) {
            Some(value) => {
                record.platform = value.trim().to_string();
                true
            }
            None => {
                debug!("Platform row has no value cell: '{}'", row.text);
                false
            }
        }
    }
}


/// Removes a single leading `label` and surrounding whitespace.
fn strip_label(text: &str, label: &str) -> String {
    text.strip_prefix(label).unwrap_or(text).trim().to_string()
}


fn summary_rows(html: &str, row_selector: &str) -> Result<Vec<SummaryRow>> {
    let document = Html::parse_document(html);
    let rows = parse_selector(row_selector)?;
    let cells = parse_selector("div")?;

    Ok(document
        .select(&rows)
        .map(|row| SummaryRow {
            text: inner_text(row),
            cells: row.select(&cells).map(inner_text).collect(),
        })
        .collect())
}


fn apply_summary_rows(record: &mut GameRecord, rows: &[SummaryRow], regexes: &Regexes) {
    let mut claimed: FxHashSet<&'static str> = FxHashSet::default();
    for row in rows {
        apply_summary_rules!(row, regexes, record, claimed; DeveloperRow, RatingRow, PlatformRow);
    }
}


fn read_title(html: &str, title_selector: &str) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let title = parse_selector(title_selector)?;
    Ok(document.select(&title).next().map(inner_text).filter(|text| !text.is_empty()))
}


/// Searches for `game_name`, opens the first result and reads its details panel.
///
/// Never fails. Anything going wrong along the way yields [`GameRecord::failed`] instead.
pub(crate) fn scrape_game(page: &mut dyn Page, game_name: &str, state: &ScraperState) -> GameRecord {
    info!("Searching for game: '{game_name}'");
    match try_scrape_game(page, game_name, state) {
        Ok(record) => record,
        Err(e) => {
            warn!("Error processing '{game_name}': {e}");
            GameRecord::failed(game_name)
        }
    }
}


fn try_scrape_game(page: &mut dyn Page, game_name: &str, state: &ScraperState) -> Result<GameRecord> {
    let selectors = &state.config.selectors;
    let timeouts = &state.config.timeouts;

    page.search(game_name)?;
    page.click_first(&selectors.result_link, timeouts.result_card())?;
    info!("Opened first result for '{game_name}'");

    let mut record = GameRecord { url: page.url()?, ..Default::default() };

    match page.content().and_then(|html| read_title(&html, &selectors.game_title)) {
        Ok(Some(title)) => record.name = title,
        Ok(None) => info!("Game name not found for '{game_name}'"),
        Err(e) => info!("Game name not found for '{game_name}': {e}"),
    }

    page.wait_for(&selectors.summary_row, timeouts.summary_rows())?;
    let rows = summary_rows(&page.content()?, &selectors.summary_row)?;
    apply_summary_rows(&mut record, &rows, &state.regexes);

    Ok(record)
}
