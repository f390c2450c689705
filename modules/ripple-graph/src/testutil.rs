//! Test utilities for building small in-memory forum corpora.

use chrono::{Duration, TimeZone, Utc};

use ripple_common::{Post, PostId, ThreadId, Timestamp, UserId};

use crate::{InfluenceGraph, ThreadIndex};

/// Fixed epoch plus `m` minutes, so scenarios read in relative time.
pub fn minutes(m: i64) -> Timestamp {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(m)
}

/// Accumulates posts with auto-assigned post ids (1, 2, 3, ...).
#[derive(Debug, Default, Clone)]
pub struct CorpusBuilder {
    posts: Vec<Post>,
    next_id: PostId,
}

impl CorpusBuilder {
    pub fn new() -> Self {
        Self {
            posts: Vec::new(),
            next_id: 1,
        }
    }

    /// Add a post by `user` in `thread` at `minute`.
    pub fn post(mut self, thread: ThreadId, user: UserId, minute: i64) -> Self {
        self.posts
            .push(Post::new(self.next_id, thread, user, minutes(minute)));
        self.next_id += 1;
        self
    }

    pub fn into_posts(self) -> Vec<Post> {
        self.posts
    }

    pub fn build_index(self) -> ThreadIndex {
        ThreadIndex::build(self.posts)
    }

    pub fn build(self) -> (ThreadIndex, InfluenceGraph) {
        let index = ThreadIndex::build(self.posts);
        let graph = InfluenceGraph::build(&index);
        (index, graph)
    }
}
