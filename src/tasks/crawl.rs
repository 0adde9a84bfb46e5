use std::time::Duration;

use sqlx::PgPool;
use thiserror::Error;
use tokio::time::sleep;

use crate::db::types::TestKind;
use crate::services::extract::{self, ListingItem, ParseError, PartRef};
use crate::services::fetch::{Fetch, FetchError};
use crate::services::ingest::{self, NewTest};

/// Deliberate delays between requests; the source site tolerates the crawl
/// only at this pace.
#[derive(Debug, Clone)]
pub(crate) struct CrawlPacing {
    pub(crate) between_steps: Duration,
    pub(crate) between_pages: Duration,
}

impl Default for CrawlPacing {
    fn default() -> Self {
        Self { between_steps: Duration::from_secs(2), between_pages: Duration::from_secs(3) }
    }
}

/// Listing-page failures abort the crawl; everything else is handled per
/// item.
#[derive(Debug, Error)]
pub(crate) enum CrawlError {
    #[error("failed to fetch listing page {url}")]
    ListingFetch {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("failed to parse listing page {url}")]
    ListingParse {
        url: String,
        #[source]
        source: ParseError,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub pages: u32,
    pub items: usize,
    pub items_failed: usize,
    pub sections_saved: usize,
    pub questions_seen: usize,
}

#[derive(Debug, Default)]
struct ItemOutcome {
    sections_saved: usize,
    questions_seen: usize,
}

struct CrawlTarget {
    crawl_id: String,
    base_link: String,
}

/// One sequential crawler for both content kinds; only the detail
/// extraction and the persisted shape differ between reading and listening.
pub(crate) struct Crawler<F> {
    fetcher: F,
    pool: PgPool,
    base_url: String,
    pacing: CrawlPacing,
}

impl<F: Fetch> Crawler<F> {
    pub(crate) fn new(
        fetcher: F,
        pool: PgPool,
        base_url: impl Into<String>,
        pacing: CrawlPacing,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { fetcher, pool, base_url, pacing }
    }

    /// Walks listing pages starting at page 1 until one comes back empty;
    /// that empty page is discarded and the crawl stops. A failed item is
    /// logged and skipped, a failed listing page aborts the whole crawl.
    pub(crate) async fn run(&self, kind: TestKind) -> Result<CrawlSummary, CrawlError> {
        let mut summary = CrawlSummary::default();
        let mut page = 1u32;

        loop {
            let url =
                format!("{}/tests/ielts/?term={}&page={}", self.base_url, kind.term(), page);
            let items = self.fetch_listing(&url).await?;
            if items.is_empty() {
                tracing::info!(page, term = kind.term(), "no more listing items; crawl complete");
                break;
            }

            summary.pages += 1;
            for item in &items {
                summary.items += 1;
                match self.process_item(kind, item).await {
                    Ok(outcome) => {
                        summary.sections_saved += outcome.sections_saved;
                        summary.questions_seen += outcome.questions_seen;
                    }
                    Err(err) => {
                        summary.items_failed += 1;
                        metrics::counter!("crawl_items_failed_total", "kind" => kind.term())
                            .increment(1);
                        tracing::error!(
                            error = %err,
                            link = %item.link,
                            "failed to process listing item; skipping"
                        );
                    }
                }
            }

            sleep(self.pacing.between_pages).await;
            page += 1;
        }

        Ok(summary)
    }

    async fn fetch_listing(&self, url: &str) -> Result<Vec<ListingItem>, CrawlError> {
        let body = self
            .fetcher
            .fetch(url, &[])
            .await
            .map_err(|source| CrawlError::ListingFetch { url: url.to_string(), source })?;
        extract::listing::parse_listing(&body, &self.base_url)
            .map_err(|source| CrawlError::ListingParse { url: url.to_string(), source })
    }

    async fn process_item(&self, kind: TestKind, item: &ListingItem) -> anyhow::Result<ItemOutcome> {
        let target = derive_crawl_target(&item.link)
            .ok_or_else(|| anyhow::anyhow!("listing link carries no crawl id: {}", item.link))?;

        let parts_page = self.fetcher.fetch(&item.link, &[]).await?;
        let parts = extract::listing::parse_parts(&parts_page, kind);
        if parts.is_empty() {
            anyhow::bail!("no parts found on {}", item.link);
        }

        sleep(self.pacing.between_steps).await;
        let practice_url = build_practice_url(&target.base_link, &parts);
        tracing::info!(practice_url = %practice_url, crawl_id = %target.crawl_id, "crawling practice link");

        sleep(self.pacing.between_steps).await;
        let detail_page = self
            .fetcher
            .fetch(
                &practice_url,
                &[("Referer", item.link.as_str()), ("Origin", self.base_url.as_str())],
            )
            .await?;

        let mut outcome = ItemOutcome::default();
        match kind {
            TestKind::Reading => {
                let sections = extract::reading::parse_reading_detail(&detail_page)?;
                for (section, part) in sections.iter().zip(&parts) {
                    outcome.questions_seen +=
                        section.groups.iter().map(|group| group.questions.len()).sum::<usize>();
                    ingest::save_test(
                        &self.pool,
                        &NewTest {
                            kind,
                            crawl_id: target.crawl_id.clone(),
                            part_id: Some(part.part_id.clone()),
                            title: section.title.clone(),
                            origin_url: practice_url.clone(),
                            info: item.info.clone(),
                            left_column_html: Some(section.left_column_html.clone()),
                            right_column_html: Some(section.right_column_html.clone()),
                            audio_links: None,
                            groups: section.groups.clone(),
                        },
                    )
                    .await?;
                    outcome.sections_saved += 1;
                }
            }
            TestKind::Listening => {
                let sections = extract::listening::parse_listening_detail(&detail_page)?;
                let page_title = extract::listening::parse_page_title(&detail_page);
                for (section, part) in sections.iter().zip(&parts) {
                    let audio_links =
                        extract::listening::extract_audio_links(&section.section_html);
                    outcome.questions_seen +=
                        section.groups.iter().map(|group| group.questions.len()).sum::<usize>();
                    ingest::save_test(
                        &self.pool,
                        &NewTest {
                            kind,
                            crawl_id: target.crawl_id.clone(),
                            part_id: Some(part.part_id.clone()),
                            title: page_title.clone().unwrap_or_else(|| item.title.clone()),
                            origin_url: practice_url.clone(),
                            info: item.info.clone(),
                            left_column_html: None,
                            right_column_html: None,
                            audio_links: Some(audio_links),
                            groups: section.groups.clone(),
                        },
                    )
                    .await?;
                    outcome.sections_saved += 1;
                }
            }
        }

        tracing::info!(
            total_questions = outcome.questions_seen,
            link = %item.link,
            "crawled listing item"
        );
        Ok(outcome)
    }
}

/// The external identifier sits two path segments above the trailing
/// `practice/` suffix of a listing link.
fn derive_crawl_target(link: &str) -> Option<CrawlTarget> {
    let segments: Vec<&str> = link.split('/').collect();
    if segments.len() < 3 {
        return None;
    }
    let kept = &segments[..segments.len() - 2];
    let crawl_id = (*kept.last()?).to_string();
    if crawl_id.is_empty() {
        return None;
    }
    Some(CrawlTarget { crawl_id, base_link: kept.join("/") })
}

/// Practice pages want every part id as a repeated `part` query parameter.
fn build_practice_url(base_link: &str, parts: &[PartRef]) -> String {
    let query = parts
        .iter()
        .map(|part| format!("part={}", part.part_id))
        .collect::<Vec<_>>()
        .join("&");
    format!("{base_link}/practice/?{query}")
}
