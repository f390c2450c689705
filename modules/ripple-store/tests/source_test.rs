//! Integration tests for the post sources.
//! The Postgres tests require DATABASE_TEST_URL and are skipped without it.

use std::collections::HashSet;

use ripple_store::{CsvPostSource, FilterKind, ForumQuery, PgPostSource, PostSource};
use sqlx::PgPool;

fn query(forum_id: i64) -> ForumQuery {
    ForumQuery {
        forum_id,
        min_content_length: 10,
        min_topic_score: 0.5,
    }
}

const EXPORT: &str = "\
post_id,thread_id,user_id,timestamp
1,10,1,2024-01-01T00:00:00Z
2,10,2,2024-01-01T00:10:00Z
3,10,3,2024-01-01T00:20:00Z
4,20,1,2024-01-02T00:00:00Z
5,20,2,2024-01-02T00:05:00Z
6,30,1,2024-01-03T00:00:00Z
";

#[tokio::test]
async fn csv_export_on_disk_resolves_allow_lists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("posts.csv");
    std::fs::write(&path, EXPORT).unwrap();

    let source = CsvPostSource::open(&path).unwrap();
    assert_eq!(source.fetch_posts(&query(1)).await.unwrap().len(), 6);

    let lists = source
        .allow_lists(
            &query(1),
            &[FilterKind::PostsPerUser, FilterKind::ThreadsPerUser, FilterKind::UsersPerThread],
        )
        .await
        .unwrap();
    assert_eq!(lists.users, Some(HashSet::from([1])));
    assert_eq!(lists.threads, Some(HashSet::from([10])));
}

#[tokio::test]
async fn missing_export_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(CsvPostSource::open(&dir.path().join("absent.csv")).is_err());
}

/// Get a test database pool with a tiny forum loaded, or skip.
async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;

    for stmt in [
        "DROP TABLE IF EXISTS posts",
        "DROP TABLE IF EXISTS topics",
        r#"CREATE TABLE topics (
            topic_id             INTEGER PRIMARY KEY,
            forum_id             INTEGER NOT NULL,
            classification_topic DOUBLE PRECISION NOT NULL
        )"#,
        r#"CREATE TABLE posts (
            post_id        INTEGER PRIMARY KEY,
            topic_id       INTEGER NOT NULL REFERENCES topics(topic_id),
            user_id        INTEGER NOT NULL,
            content_post   TEXT NOT NULL,
            dateadded_post TIMESTAMP NOT NULL
        )"#,
        "INSERT INTO topics VALUES (10, 1, 0.9), (20, 1, 0.1), (30, 2, 0.9)",
        r#"INSERT INTO posts VALUES
            (1, 10, 1, 'long enough content', '2024-01-01 00:00:00'),
            (2, 10, 2, 'long enough content', '2024-01-01 00:10:00'),
            (3, 10, 3, 'short', '2024-01-01 00:20:00'),
            (4, 10, 4, 'long enough content', '2024-01-01 00:30:00'),
            (5, 20, 1, 'long enough content', '2024-01-02 00:00:00'),
            (6, 30, 1, 'long enough content', '2024-01-03 00:00:00')"#,
    ] {
        sqlx::query(stmt).execute(&pool).await.ok()?;
    }

    Some(pool)
}

#[tokio::test]
async fn postgres_applies_relevance_thresholds() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let source = PgPostSource::new(pool);

    let posts = source.fetch_posts(&query(1)).await.unwrap();
    let ids: Vec<_> = posts.iter().map(|p| p.post_id).collect();
    assert_eq!(ids, vec![1, 2, 4]);
    assert!(posts.iter().all(|p| p.thread_id == 10));

    let threads = source
        .filter_ids(&query(1), FilterKind::UsersPerThread)
        .await
        .unwrap();
    assert_eq!(threads, HashSet::from([10]));
}
