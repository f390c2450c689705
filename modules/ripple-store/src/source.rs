use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{debug, info};

use ripple_common::config::ForumConfig;
use ripple_common::error::Result;
use ripple_common::Post;

use crate::filters::{AllowLists, FilterKind, FilterResult};

/// Forum selection plus the content-length and topic-relevance thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct ForumQuery {
    pub forum_id: i64,
    /// Posts must have strictly more characters than this.
    pub min_content_length: i32,
    /// Inclusive lower bound on the thread's topic score.
    pub min_topic_score: f64,
}

impl From<&ForumConfig> for ForumQuery {
    fn from(forum: &ForumConfig) -> Self {
        Self {
            forum_id: forum.id,
            min_content_length: forum.min_content_length,
            min_topic_score: forum.min_topic_score,
        }
    }
}

/// Tabular post records for one forum.
///
/// Implemented by [`crate::PgPostSource`] (Postgres) and
/// [`crate::CsvPostSource`] (flat exports, tests).
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Relevance-filtered posts ordered by thread, then time.
    async fn fetch_posts(&self, query: &ForumQuery) -> Result<Vec<Post>>;

    /// Ids selected by one allow-list filter.
    async fn filter_ids(&self, query: &ForumQuery, kind: FilterKind) -> Result<HashSet<i64>>;

    /// Run every filter in `kinds` and combine them.
    async fn allow_lists(&self, query: &ForumQuery, kinds: &[FilterKind]) -> Result<AllowLists> {
        let mut results = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let ids = self.filter_ids(query, *kind).await?;
            if ids.is_empty() {
                debug!(filter = %kind, "Filter returned no ids, ignoring");
            }
            results.push(FilterResult { kind: *kind, ids });
        }

        let lists = AllowLists::combine(results);
        info!(
            forum = query.forum_id,
            users = lists.users.as_ref().map(|u| u.len()),
            threads = lists.threads.as_ref().map(|t| t.len()),
            "Allow-lists resolved"
        );
        Ok(lists)
    }
}
