use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{collect_text, css, ListingItem, ParseError, PartRef};
use crate::db::models::TestInfo;
use crate::db::types::TestKind;

/// Parses one listing page into its cards, in document order. An empty
/// result is the crawl's pagination termination signal.
pub(crate) fn parse_listing(html: &str, base_url: &str) -> Result<Vec<ListingItem>, ParseError> {
    let document = Html::parse_document(html);
    let card_sel = css(".testitem-wrapper");
    let link_sel = css("a.text-dark");
    let title_sel = css("h2.testitem-title");
    let clock_sel = css(".testitem-info .far.fa-clock.mr-1");
    let attempts_sel = css(".testitem-info .far.fa-user-edit.mr-1");
    let comments_sel = css(".testitem-info .far.fa-comments.mr-1");

    let mut items = Vec::new();
    for card in document.select(&card_sel) {
        let href = card
            .select(&link_sel)
            .next()
            .and_then(|anchor| anchor.value().attr("href"))
            .ok_or(ParseError::MissingTestLink)?;
        let title = card.select(&title_sel).next().map(collect_text).unwrap_or_default();
        let info = TestInfo {
            duration: info_segment(card, &clock_sel, 0),
            attempts: info_segment(card, &attempts_sel, 1),
            comments: info_segment(card, &comments_sel, 2),
        };
        items.push(ListingItem { link: format!("{base_url}{href}"), title, info });
    }
    Ok(items)
}

/// The duration/attempts/comments figures share one pipe-delimited text
/// holder; each icon marker selects the holder, the segment index selects
/// the figure.
fn info_segment(card: ElementRef<'_>, marker: &Selector, index: usize) -> String {
    card.select(marker)
        .next()
        .and_then(|icon| icon.parent().and_then(ElementRef::wrap))
        .map(|holder| holder.text().collect::<String>())
        .and_then(|text| text.split('|').nth(index).map(|segment| segment.trim().to_string()))
        .unwrap_or_default()
}

/// Extracts the part ids a test's practice page must be requested with.
/// Listening pages carry them as `data-id` attributes; reading pages hide
/// them inside solution links. Entries without an id are dropped.
pub(crate) fn parse_parts(html: &str, kind: TestKind) -> Vec<PartRef> {
    let document = Html::parse_document(html);

    match kind {
        TestKind::Listening => {
            let item_sel = css(".part-list .part-item");
            document
                .select(&item_sel)
                .filter_map(|item| item.value().attr("data-id"))
                .map(|id| PartRef { part_id: id.to_string() })
                .collect()
        }
        TestKind::Reading => {
            let item_sel = css("#test-solutions ul li");
            let link_sel = css("a");
            document
                .select(&item_sel)
                .filter_map(|item| {
                    item.select(&link_sel).next().and_then(|anchor| anchor.value().attr("href"))
                })
                .filter_map(|href| {
                    part_id_pattern()
                        .captures(href)
                        .map(|captures| PartRef { part_id: captures[1].to_string() })
                })
                .collect()
        }
    }
}

fn part_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"parts/(\d+)/").expect("static pattern"))
}
