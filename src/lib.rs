pub mod db;
pub mod errors;
pub mod schemas;
pub mod services;
pub mod tasks;

pub(crate) mod core;
pub(crate) mod repositories;

#[cfg(test)]
mod test_support;

use std::time::Duration;

use crate::core::{config::Settings, telemetry};
use crate::db::types::TestKind;
use crate::services::fetch::FetchClient;
use crate::tasks::crawl::{CrawlPacing, CrawlSummary, Crawler};

/// Crawls every listing page of one content kind into the database. The
/// crawl only runs when explicitly invoked; credentials and pacing come
/// from the environment-backed settings.
pub async fn run_crawl(kind: TestKind) -> anyhow::Result<CrawlSummary> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;

    let pool = db::init_pool(&settings).await?;
    db::run_migrations(&pool).await?;

    let fetcher = FetchClient::from_settings(&settings)?;
    let pacing = CrawlPacing {
        between_steps: Duration::from_secs(settings.crawl().step_delay_seconds),
        between_pages: Duration::from_secs(settings.crawl().page_delay_seconds),
    };
    let crawler = Crawler::new(fetcher, pool, settings.crawl().base_url.clone(), pacing);

    tracing::info!(term = kind.term(), "starting crawl");
    let summary = crawler.run(kind).await?;
    tracing::info!(
        pages = summary.pages,
        items = summary.items,
        items_failed = summary.items_failed,
        sections_saved = summary.sections_saved,
        questions_seen = summary.questions_seen,
        "crawl finished"
    );

    Ok(summary)
}
