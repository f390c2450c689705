//! Post source over a flat CSV export of one forum.
//!
//! Columns: `post_id, thread_id, user_id, timestamp` (RFC 3339), plus optional
//! `content_length` and `topic_score`. Rows missing an optional column pass
//! the corresponding threshold. Filters are evaluated in memory with the same
//! rules as the SQL filters.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use ripple_common::error::{Result, RippleError};
use ripple_common::{Post, PostId, ThreadId, Timestamp, UserId};

use crate::filters::FilterKind;
use crate::source::{ForumQuery, PostSource};

#[derive(Debug, Clone, Deserialize)]
struct CsvPostRow {
    post_id: PostId,
    thread_id: ThreadId,
    user_id: UserId,
    timestamp: Timestamp,
    #[serde(default)]
    content_length: Option<i32>,
    #[serde(default)]
    topic_score: Option<f64>,
}

impl CsvPostRow {
    fn passes(&self, query: &ForumQuery) -> bool {
        self.content_length
            .map_or(true, |len| len > query.min_content_length)
            && self
                .topic_score
                .map_or(true, |score| score >= query.min_topic_score)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CsvPostSource {
    rows: Vec<CsvPostRow>,
}

impl CsvPostSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open post export {}", path.display()))?;
        let source = Self::from_reader(file)?;
        info!(path = %path.display(), rows = source.rows.len(), "Post export loaded");
        Ok(source)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut csv = csv::Reader::from_reader(reader);
        let mut rows = Vec::new();
        for (n, row) in csv.deserialize().enumerate() {
            let row: CsvPostRow =
                row.map_err(|e| RippleError::Source(format!("post export row {}: {e}", n + 1)))?;
            rows.push(row);
        }
        Ok(Self { rows })
    }

    fn relevant<'a>(&'a self, query: &'a ForumQuery) -> impl Iterator<Item = &'a CsvPostRow> + 'a {
        self.rows.iter().filter(move |r| r.passes(query))
    }
}

#[derive(Default)]
struct Tally {
    posts: usize,
    members: HashSet<i64>,
}

#[async_trait]
impl PostSource for CsvPostSource {
    async fn fetch_posts(&self, query: &ForumQuery) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .relevant(query)
            .map(|r| Post::new(r.post_id, r.thread_id, r.user_id, r.timestamp))
            .collect();
        posts.sort_by_key(|p| (p.thread_id, p.timestamp));
        Ok(posts)
    }

    async fn filter_ids(&self, query: &ForumQuery, kind: FilterKind) -> Result<HashSet<i64>> {
        // Group by the filter's target; members are threads for user filters
        // and users for thread filters.
        let mut groups: HashMap<i64, Tally> = HashMap::new();
        for row in self.relevant(query) {
            let (key, member) = match kind {
                FilterKind::PostsPerUser | FilterKind::ThreadsPerUser => (row.user_id, row.thread_id),
                FilterKind::PostsPerThread | FilterKind::UsersPerThread => (row.thread_id, row.user_id),
            };
            let tally = groups.entry(key).or_default();
            tally.posts += 1;
            tally.members.insert(member);
        }

        Ok(groups
            .into_iter()
            .filter(|(_, t)| match kind {
                FilterKind::PostsPerUser => t.posts > 2,
                FilterKind::ThreadsPerUser => t.members.len() > 2,
                FilterKind::PostsPerThread => t.posts > 2 && t.members.len() > 1,
                FilterKind::UsersPerThread => t.members.len() > 2,
            })
            .map(|(id, _)| id)
            .collect())
    }
}
