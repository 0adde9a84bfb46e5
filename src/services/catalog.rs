use sqlx::PgPool;
use validator::Validate;

use crate::db::models::{AnswerRecord, Test};
use crate::errors::ServiceError;
use crate::repositories;
use crate::schemas::catalog::{GroupWithQuestions, ListTestsQuery, Paginated};
use crate::schemas::submission::{AnswerQuery, QuestionVerdict, SubmitAnswers};
use crate::services::grading;

/// Lists persisted tests, newest last, optionally filtered by a title
/// keyword.
pub async fn list_tests(
    pool: &PgPool,
    query: ListTestsQuery,
) -> Result<Paginated<Test>, ServiceError> {
    query.validate().map_err(|err| ServiceError::BadRequest(err.to_string()))?;

    let keyword = query.keyword.as_deref().map(str::trim).filter(|keyword| !keyword.is_empty());
    let skip = (query.page - 1) * query.limit;

    let data = repositories::tests::list(pool, keyword, skip, query.limit)
        .await
        .map_err(|err| ServiceError::internal(err, "failed to list tests"))?;
    let total = repositories::tests::count(pool, keyword)
        .await
        .map_err(|err| ServiceError::internal(err, "failed to count tests"))?;

    let total_pages = if total == 0 { 0 } else { (total + query.limit - 1) / query.limit };

    Ok(Paginated { data, page: query.page, limit: query.limit, total, total_pages })
}

pub async fn get_test_by_id(pool: &PgPool, id: &str) -> Result<Test, ServiceError> {
    repositories::tests::find_by_id(pool, id)
        .await
        .map_err(|err| ServiceError::internal(err, "failed to load test"))?
        .ok_or_else(|| ServiceError::NotFound("test not found".to_string()))
}

/// Question groups of a test with their questions, in stored order.
pub async fn get_questions(
    pool: &PgPool,
    test_id: &str,
) -> Result<Vec<GroupWithQuestions>, ServiceError> {
    let groups = repositories::question_groups::list_by_test_id(pool, test_id)
        .await
        .map_err(|err| ServiceError::internal(err, "failed to load question groups"))?;

    if groups.is_empty() {
        return Err(ServiceError::NotFound("no questions found for this test".to_string()));
    }

    let mut result = Vec::with_capacity(groups.len());
    for group in groups {
        let questions = repositories::questions::list_by_group_id(pool, &group.id)
            .await
            .map_err(|err| ServiceError::internal(err, "failed to load questions"))?;
        result.push(GroupWithQuestions { group, questions });
    }
    Ok(result)
}

/// Canonical answer records, selected by explicit test ids or by the
/// external group identifier the tests were crawled under.
pub async fn get_answers(
    pool: &PgPool,
    query: AnswerQuery,
) -> Result<Vec<AnswerRecord>, ServiceError> {
    if let Some(test_ids) = query.test_ids.filter(|ids| !ids.is_empty()) {
        return repositories::answers::list_by_test_ids(pool, &test_ids)
            .await
            .map_err(|err| ServiceError::internal(err, "failed to load answer records"));
    }

    if let Some(group_id) =
        query.test_group_id.as_deref().map(str::trim).filter(|group_id| !group_id.is_empty())
    {
        let test_ids = repositories::tests::ids_by_crawl_id(pool, group_id)
            .await
            .map_err(|err| ServiceError::internal(err, "failed to resolve test group"))?;
        if test_ids.is_empty() {
            return Err(ServiceError::NotFound(
                "no tests found for the given group id".to_string(),
            ));
        }
        return repositories::answers::list_by_test_ids(pool, &test_ids)
            .await
            .map_err(|err| ServiceError::internal(err, "failed to load answer records"));
    }

    Err(ServiceError::BadRequest("must provide either test_ids or test_group_id".to_string()))
}

pub async fn submit_answers(
    pool: &PgPool,
    payload: SubmitAnswers,
) -> Result<Vec<QuestionVerdict>, ServiceError> {
    if payload.test_id.trim().is_empty() {
        return Err(ServiceError::BadRequest("test_id is required".to_string()));
    }
    grading::grade(pool, &payload.test_id, &payload.answers).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::TestKind;
    use crate::schemas::submission::{AnswerDetail, SubTestAnswers};
    use crate::test_support;

    #[tokio::test]
    async fn listing_paginates_and_filters_by_keyword() {
        let Some(db) = test_support::try_db().await else { return };

        for index in 1..=3 {
            test_support::insert_test(
                &db.pool,
                TestKind::Reading,
                &format!("30{index}"),
                &format!("IELTS Reading Test {index}"),
            )
            .await;
        }
        test_support::insert_test(&db.pool, TestKind::Listening, "304", "Listening Warmup").await;

        let page = list_tests(
            &db.pool,
            ListTestsQuery { page: 1, limit: 2, keyword: Some("reading".to_string()) },
        )
        .await
        .expect("list");

        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.data.len(), 2);
        assert!(page.data.iter().all(|test| test.title.contains("Reading")));

        let rest = list_tests(
            &db.pool,
            ListTestsQuery { page: 2, limit: 2, keyword: Some("reading".to_string()) },
        )
        .await
        .expect("list rest");
        assert_eq!(rest.data.len(), 1);
    }

    #[tokio::test]
    async fn invalid_page_is_a_bad_request() {
        let Some(db) = test_support::try_db().await else { return };

        let err = list_tests(
            &db.pool,
            ListTestsQuery { page: 0, limit: 10, keyword: None },
        )
        .await
        .expect_err("should reject");
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn missing_test_is_not_found() {
        let Some(db) = test_support::try_db().await else { return };

        let err = get_test_by_id(&db.pool, "missing").await.expect_err("should miss");
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = get_questions(&db.pool, "missing").await.expect_err("should miss");
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn answers_resolve_by_ids_or_group_identifier() {
        let Some(db) = test_support::try_db().await else { return };

        let test =
            test_support::insert_test(&db.pool, TestKind::Listening, "401", "Listening Test").await;
        test_support::insert_answer(&db.pool, &test.id, "q1", 1, "TRUE").await;
        test_support::insert_answer(&db.pool, &test.id, "q2", 2, "FALSE").await;

        let by_ids = get_answers(
            &db.pool,
            AnswerQuery { test_ids: Some(vec![test.id.clone()]), test_group_id: None },
        )
        .await
        .expect("by ids");
        assert_eq!(by_ids.len(), 2);

        let by_group = get_answers(
            &db.pool,
            AnswerQuery { test_ids: None, test_group_id: Some("401".to_string()) },
        )
        .await
        .expect("by group");
        assert_eq!(by_group.len(), 2);

        let err = get_answers(
            &db.pool,
            AnswerQuery { test_ids: None, test_group_id: Some("999".to_string()) },
        )
        .await
        .expect_err("unknown group");
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = get_answers(&db.pool, AnswerQuery::default()).await.expect_err("no selector");
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn submission_is_graded_against_the_stored_key() {
        let Some(db) = test_support::try_db().await else { return };

        let test =
            test_support::insert_test(&db.pool, TestKind::Listening, "402", "Listening Test").await;
        test_support::insert_answer(&db.pool, &test.id, "q1", 1, "TRUE").await;
        test_support::insert_answer(&db.pool, &test.id, "q2", 2, "camden").await;

        let verdicts = submit_answers(
            &db.pool,
            SubmitAnswers {
                test_id: test.id.clone(),
                answers: vec![SubTestAnswers {
                    test_id: test.id.clone(),
                    details: vec![
                        AnswerDetail {
                            question_id: "q1".to_string(),
                            answers: vec!["FALSE".to_string(), "TRUE".to_string()],
                        },
                        AnswerDetail {
                            question_id: "q2".to_string(),
                            answers: vec!["london".to_string()],
                        },
                    ],
                }],
            },
        )
        .await
        .expect("grade");

        assert_eq!(verdicts.len(), 2);
        assert!(verdicts[0].correct);
        assert_eq!(verdicts[0].category, "TRUE FALSE NOT GIVEN");
        assert!(!verdicts[1].correct);
        assert_eq!(verdicts[1].category, "NOT DONE");
    }

    #[tokio::test]
    async fn submission_for_unknown_test_is_not_found() {
        let Some(db) = test_support::try_db().await else { return };

        let err = submit_answers(
            &db.pool,
            SubmitAnswers { test_id: "missing".to_string(), answers: Vec::new() },
        )
        .await
        .expect_err("should miss");
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = submit_answers(
            &db.pool,
            SubmitAnswers { test_id: "  ".to_string(), answers: Vec::new() },
        )
        .await
        .expect_err("blank id");
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }
}
