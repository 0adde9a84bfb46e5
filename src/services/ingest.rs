use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::models::TestInfo;
use crate::db::types::TestKind;
use crate::repositories;
use crate::services::extract::ExtractedGroup;

/// Persistence failures are logged with their cause; callers only see a
/// generic internal error.
#[derive(Debug, Error)]
pub(crate) enum IngestError {
    #[error("failed to persist test")]
    Internal,
}

impl IngestError {
    fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NewTest {
    pub(crate) kind: TestKind,
    pub(crate) crawl_id: String,
    pub(crate) part_id: Option<String>,
    pub(crate) title: String,
    pub(crate) origin_url: String,
    pub(crate) info: TestInfo,
    pub(crate) left_column_html: Option<String>,
    pub(crate) right_column_html: Option<String>,
    pub(crate) audio_links: Option<Vec<String>>,
    pub(crate) groups: Vec<ExtractedGroup>,
}

/// Writes one crawled test and its question groups/questions in a single
/// transaction, keyed by the external crawl identifier. Questions whose
/// answer was exposed on the crawled page also get a canonical answer
/// record for grading. A test that was already crawled is reused as-is:
/// neither its fields nor its child rows are refreshed.
pub(crate) async fn save_test(pool: &PgPool, data: &NewTest) -> Result<String, IngestError> {
    let now = primitive_now_utc();
    let mut tx = pool
        .begin()
        .await
        .map_err(|err| IngestError::internal(err, "failed to begin save transaction"))?;

    if let Some(existing) = repositories::tests::find_by_crawl_id(&mut *tx, &data.crawl_id)
        .await
        .map_err(|err| IngestError::internal(err, "failed to look up test by crawl id"))?
    {
        tracing::info!(
            crawl_id = %data.crawl_id,
            test_id = %existing.id,
            "test already crawled; reusing existing row"
        );
        tx.commit()
            .await
            .map_err(|err| IngestError::internal(err, "failed to commit save transaction"))?;
        metrics::counter!("crawl_tests_reused_total", "kind" => data.kind.term()).increment(1);
        return Ok(existing.id);
    }

    // Any error below drops the transaction, which rolls back every write
    // of this test.
    let test = repositories::tests::create(
        &mut *tx,
        repositories::tests::CreateTest {
            id: &Uuid::new_v4().to_string(),
            kind: data.kind,
            crawl_id: &data.crawl_id,
            part_id: data.part_id.as_deref(),
            title: &data.title,
            origin_url: &data.origin_url,
            info: &data.info,
            left_column_html: data.left_column_html.as_deref(),
            right_column_html: data.right_column_html.as_deref(),
            audio_links: data.audio_links.as_deref(),
            now,
        },
    )
    .await
    .map_err(|err| IngestError::internal(err, "failed to insert test row"))?;

    for group in &data.groups {
        if group.questions.is_empty() {
            tracing::warn!(
                test_id = %test.id,
                title = ?group.title,
                "skipping question group without questions"
            );
            continue;
        }

        let group_row = repositories::question_groups::create(
            &mut *tx,
            repositories::question_groups::CreateGroup {
                id: &Uuid::new_v4().to_string(),
                test_id: &test.id,
                context: group.context.as_deref(),
                title: group.title.as_deref(),
                crawl_part_id: data.part_id.as_deref(),
                // Recomputed from the finished list, never from an interim
                // running count.
                total_questions: group.questions.len() as i32,
            },
        )
        .await
        .map_err(|err| IngestError::internal(err, "failed to insert question group"))?;

        for question in &group.questions {
            let question_id = Uuid::new_v4().to_string();
            repositories::questions::create(
                &mut *tx,
                repositories::questions::CreateQuestion {
                    id: &question_id,
                    group_id: &group_row.id,
                    crawl_qid: question.crawl_qid.as_deref(),
                    number: question.number,
                    text: &question.text,
                    kind: question.kind,
                    options: question.options.as_deref(),
                    answer: question.answer.as_deref(),
                },
            )
            .await
            .map_err(|err| IngestError::internal(err, "failed to insert question"))?;

            if let Some(answer) = question.answer.as_deref() {
                let reference = question.crawl_qid.clone().unwrap_or_else(|| question_id.clone());
                repositories::answers::create(
                    &mut *tx,
                    repositories::answers::CreateAnswerRecord {
                        id: &Uuid::new_v4().to_string(),
                        test_id: &test.id,
                        question_id: &reference,
                        number: question.number as i16,
                        answer,
                        now,
                    },
                )
                .await
                .map_err(|err| IngestError::internal(err, "failed to insert answer record"))?;
            }
        }
    }

    tx.commit()
        .await
        .map_err(|err| IngestError::internal(err, "failed to commit save transaction"))?;

    metrics::counter!("crawl_tests_saved_total", "kind" => data.kind.term()).increment(1);
    Ok(test.id)
}
