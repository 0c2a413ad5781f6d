use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::traits::PriceExtractor;

/// Values the exchange prints in place of a price on days without trading.
const PLACEHOLDERS: &[&str] = &["", "-", "--", "—", "N/A"];

/// Parse a displayed number: strips thousands separators, rejects
/// placeholders, non-finite and non-positive values.
pub fn parse_price_text(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if PLACEHOLDERS.contains(&cleaned.as_str()) {
        return None;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p > 0.0)
}

/// Compile a selector literal. Only ever called with constants covered by tests.
fn static_selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static CSS selector must parse")
}

/// Compile a pattern literal. Same contract as `static_selector`.
fn static_regex(pattern: &'static str) -> Regex {
    Regex::new(pattern).expect("static regex must compile")
}

// ── Structured table extraction ─────────────────────────────────────

/// Reads one contract's closing price from the SGE daily quotation table.
///
/// Layout of `table.daily_new_table > tbody > tr`: column 1 is the contract
/// code, column 5 the close. Rows with fewer cells are skipped.
pub struct SgeTableExtractor {
    ticker: String,
    rows: Selector,
    cells: Selector,
}

impl SgeTableExtractor {
    pub const CONTRACT_COLUMN: usize = 1;
    pub const CLOSE_COLUMN: usize = 5;

    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            rows: static_selector("table.daily_new_table tbody tr"),
            cells: static_selector("td"),
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Contract codes sometimes carry a prefix (`iAu99.99`); longer codes
    /// such as `Au99.995` are different contracts.
    fn matches_contract(&self, code: &str) -> bool {
        !code.is_empty() && code.ends_with(self.ticker.as_str())
    }
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

impl PriceExtractor for SgeTableExtractor {
    fn extract_price(&self, document: &str) -> Option<f64> {
        let html = Html::parse_document(document);
        for row in html.select(&self.rows) {
            let cells: Vec<ElementRef<'_>> = row.select(&self.cells).collect();
            if cells.len() <= Self::CLOSE_COLUMN {
                continue;
            }
            if !self.matches_contract(&cell_text(&cells[Self::CONTRACT_COLUMN])) {
                continue;
            }
            if let Some(price) = parse_price_text(&cell_text(&cells[Self::CLOSE_COLUMN])) {
                return Some(price);
            }
        }
        None
    }
}

// ── Free-text extraction ────────────────────────────────────────────

/// Searches the visible text of a page for a number after a phrase.
///
/// Patterns are tried in order; the first capture group of the first
/// matching pattern is the price.
pub struct TextPatternExtractor {
    patterns: Vec<Regex>,
    skip: Selector,
}

impl TextPatternExtractor {
    pub fn new(patterns: Vec<Regex>) -> Self {
        Self {
            patterns,
            skip: static_selector("script, style, noscript"),
        }
    }

    /// "鸡蛋参考价为 X.XX", falling back to the shorter "鸡蛋为 X.XX".
    pub fn egg_reference_price() -> Self {
        Self::new(vec![
            static_regex(r"鸡蛋参考价为\s*(\d+\.\d+)"),
            static_regex(r"鸡蛋为\s*(\d+\.\d+)"),
        ])
    }

    /// Text content of the document with markup, scripts and styles removed.
    pub fn visible_text(&self, document: &str) -> String {
        let html = Html::parse_document(document);
        let hidden: Vec<_> = html.select(&self.skip).map(|e| e.id()).collect();

        let mut text = String::new();
        for node in html.root_element().descendants() {
            let Some(t) = node.value().as_text() else {
                continue;
            };
            let inside_hidden = node.ancestors().any(|a| hidden.contains(&a.id()));
            if !inside_hidden {
                text.push_str(t);
            }
        }
        text
    }
}

impl PriceExtractor for TextPatternExtractor {
    fn extract_price(&self, document: &str) -> Option<f64> {
        let text = self.visible_text(document);
        self.patterns.iter().find_map(|re| {
            re.captures(&text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| parse_price_text(m.as_str()))
        })
    }
}
