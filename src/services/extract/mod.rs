pub(crate) mod listening;
pub(crate) mod listing;
pub(crate) mod reading;

use scraper::{ElementRef, Selector};
use thiserror::Error;

use crate::db::models::{ChoiceOption, TestInfo};
use crate::db::types::QuestionKind;

#[derive(Debug, Error)]
pub(crate) enum ParseError {
    #[error("listing card is missing its test link")]
    MissingTestLink,
    #[error("two-column section is missing its {column} column")]
    MissingColumn { column: &'static str },
    #[error("question number is not numeric: {raw:?}")]
    BadQuestionNumber { raw: String },
}

/// One card on a paginated listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListingItem {
    pub(crate) link: String,
    pub(crate) title: String,
    pub(crate) info: TestInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PartRef {
    pub(crate) part_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExtractedQuestion {
    pub(crate) crawl_qid: Option<String>,
    pub(crate) number: i32,
    pub(crate) text: String,
    pub(crate) kind: QuestionKind,
    pub(crate) options: Option<Vec<ChoiceOption>>,
    pub(crate) answer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExtractedGroup {
    pub(crate) context: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) questions: Vec<ExtractedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReadingSection {
    pub(crate) title: String,
    pub(crate) left_column_html: String,
    pub(crate) right_column_html: String,
    pub(crate) groups: Vec<ExtractedGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListeningSection {
    pub(crate) groups: Vec<ExtractedGroup>,
    /// Markup of the section itself, kept for audio-link extraction.
    pub(crate) section_html: String,
}

/// Selectors here are static strings; a parse failure is a programming error.
pub(super) fn css(selector: &'static str) -> Selector {
    Selector::parse(selector).expect("static selector")
}

pub(super) fn collect_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Inner markup with indentation and blank lines stripped, the way the
/// source pages are stored.
pub(super) fn normalize_block_html(html: &str) -> String {
    html.lines().map(str::trim).filter(|line| !line.is_empty()).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_block_html_strips_indentation_and_blank_lines() {
        let raw = "\n   <p>Passage</p>\n\n      <p>More</p>   \n\n";
        assert_eq!(normalize_block_html(raw), "<p>Passage</p>\n<p>More</p>");
    }
}
