use std::sync::{Arc, OnceLock};

use sqlx::PgPool;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::models::{AnswerRecord, Test, TestInfo};
use crate::db::types::TestKind;
use crate::repositories;

/// Database-backed tests share one database and run serialized behind this
/// guard. They are skipped entirely when STUDYCRAWL_TEST_DATABASE_URL is
/// not set.
pub(crate) struct TestDb {
    pub(crate) pool: PgPool,
    _guard: OwnedMutexGuard<()>,
}

async fn db_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) async fn try_db() -> Option<TestDb> {
    let url = match std::env::var("STUDYCRAWL_TEST_DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            eprintln!("skipping database test: STUDYCRAWL_TEST_DATABASE_URL is not set");
            return None;
        }
    };

    let guard = db_lock().await;
    let pool = PgPool::connect(&url).await.expect("connect test database");
    sqlx::migrate!("./migrations").run(&pool).await.expect("run migrations");
    sqlx::query("TRUNCATE answer_records, questions, question_groups, tests CASCADE")
        .execute(&pool)
        .await
        .expect("reset tables");

    Some(TestDb { pool, _guard: guard })
}

pub(crate) async fn insert_test(
    pool: &PgPool,
    kind: TestKind,
    crawl_id: &str,
    title: &str,
) -> Test {
    repositories::tests::create(
        pool,
        repositories::tests::CreateTest {
            id: &Uuid::new_v4().to_string(),
            kind,
            crawl_id,
            part_id: Some("1"),
            title,
            origin_url: &format!("https://study4.com/tests/{crawl_id}/practice/?part=1"),
            info: &TestInfo::default(),
            left_column_html: None,
            right_column_html: None,
            audio_links: None,
            now: primitive_now_utc(),
        },
    )
    .await
    .expect("insert test")
}

pub(crate) async fn insert_answer(
    pool: &PgPool,
    test_id: &str,
    question_id: &str,
    number: i16,
    answer: &str,
) -> AnswerRecord {
    repositories::answers::create(
        pool,
        repositories::answers::CreateAnswerRecord {
            id: &Uuid::new_v4().to_string(),
            test_id,
            question_id,
            number,
            answer,
            now: primitive_now_utc(),
        },
    )
    .await
    .expect("insert answer record")
}
