//! Postgres post source over the `posts` / `topics` forum schema.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures::TryStreamExt;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use ripple_common::error::Result;
use ripple_common::Post;

use crate::filters::FilterKind;
use crate::source::{ForumQuery, PostSource};

/// Binds: `$1` forum id, `$2` min content length, `$3` min topic score.
pub const POSTS_SQL: &str = r#"
    SELECT p.post_id::BIGINT AS post_id,
           p.topic_id::BIGINT AS thread_id,
           p.user_id::BIGINT AS user_id,
           p.dateadded_post::TIMESTAMP AS dateadded_post
    FROM posts p JOIN topics t ON p.topic_id = t.topic_id
    WHERE t.forum_id = $1
      AND LENGTH(p.content_post) > $2
      AND t.classification_topic >= $3
    ORDER BY p.topic_id, p.dateadded_post
"#;

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    post_id: i64,
    thread_id: i64,
    user_id: i64,
    dateadded_post: NaiveDateTime,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post::new(
            row.post_id,
            row.thread_id,
            row.user_id,
            row.dateadded_post.and_utc(),
        )
    }
}

#[derive(Clone)]
pub struct PgPostSource {
    pool: PgPool,
}

impl PgPostSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(database_url)
            .await?;
        info!("Connected to database (pool=4)");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl PostSource for PgPostSource {
    async fn fetch_posts(&self, query: &ForumQuery) -> Result<Vec<Post>> {
        let posts: Vec<Post> = sqlx::query_as::<_, PostRow>(POSTS_SQL)
            .bind(query.forum_id)
            .bind(query.min_content_length)
            .bind(query.min_topic_score)
            .fetch(&self.pool)
            .map_ok(Post::from)
            .try_collect()
            .await?;

        info!(forum = query.forum_id, posts = posts.len(), "Posts fetched");
        Ok(posts)
    }

    async fn filter_ids(&self, query: &ForumQuery, kind: FilterKind) -> Result<HashSet<i64>> {
        let rows = sqlx::query_as::<_, (i64,)>(kind.sql())
            .bind(query.forum_id)
            .bind(query.min_content_length)
            .bind(query.min_topic_score)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
