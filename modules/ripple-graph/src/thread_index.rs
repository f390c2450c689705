//! Thread Index: posts grouped by thread, each thread in time order.
//!
//! Besides the per-thread sequences the index keeps two secondary views used
//! by the temporal queries:
//! - per user, the sorted timestamps of their posts in every thread they joined
//! - a global timeline of all posts sorted by timestamp, so the posts inside a
//!   forgettability window can be found with two binary searches

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::info;

use ripple_common::{Post, ThreadId, Timestamp, UserId};

/// Per-thread timestamps of one user, keyed by thread.
pub type UserActivity = BTreeMap<ThreadId, Vec<Timestamp>>;

#[derive(Debug, Clone, Default)]
pub struct ThreadIndex {
    threads: BTreeMap<ThreadId, Vec<Post>>,
    activity: HashMap<UserId, UserActivity>,
    timeline: Vec<Post>,
}

impl ThreadIndex {
    /// Group posts by thread. Within a thread, posts are stably sorted by
    /// timestamp so equal timestamps keep their source order.
    pub fn build(posts: impl IntoIterator<Item = Post>) -> Self {
        Self::build_filtered(posts, None, None)
    }

    /// Like [`ThreadIndex::build`], dropping posts whose user or thread is not
    /// on the corresponding allow-list. `None` means no restriction.
    pub fn build_filtered(
        posts: impl IntoIterator<Item = Post>,
        allowed_users: Option<&HashSet<UserId>>,
        allowed_threads: Option<&HashSet<ThreadId>>,
    ) -> Self {
        let mut threads: BTreeMap<ThreadId, Vec<Post>> = BTreeMap::new();
        let mut dropped = 0usize;

        for post in posts {
            if allowed_threads.is_some_and(|allowed| !allowed.contains(&post.thread_id)) {
                dropped += 1;
                continue;
            }
            if allowed_users.is_some_and(|allowed| !allowed.contains(&post.user_id)) {
                dropped += 1;
                continue;
            }
            threads.entry(post.thread_id).or_default().push(post);
        }

        for posts in threads.values_mut() {
            posts.sort_by_key(|p| p.timestamp);
        }

        let mut activity: HashMap<UserId, UserActivity> = HashMap::new();
        let mut timeline = Vec::new();
        for (thread_id, posts) in &threads {
            for post in posts {
                activity
                    .entry(post.user_id)
                    .or_default()
                    .entry(*thread_id)
                    .or_default()
                    .push(post.timestamp);
                timeline.push(post.clone());
            }
        }
        timeline.sort_by_key(|p| p.timestamp);

        let index = Self {
            threads,
            activity,
            timeline,
        };

        info!(
            threads = index.thread_count(),
            posts = index.post_count(),
            users = index.user_count(),
            dropped,
            "Thread index built"
        );

        index
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    pub fn post_count(&self) -> usize {
        self.timeline.len()
    }

    pub fn user_count(&self) -> usize {
        self.activity.len()
    }

    /// Threads in ascending id order.
    pub fn threads(&self) -> impl Iterator<Item = (ThreadId, &[Post])> {
        self.threads.iter().map(|(id, posts)| (*id, posts.as_slice()))
    }

    /// Posts of one thread in time order.
    pub fn thread(&self, thread_id: ThreadId) -> Option<&[Post]> {
        self.threads.get(&thread_id).map(|p| p.as_slice())
    }

    /// Every post, thread by thread.
    pub fn posts(&self) -> impl Iterator<Item = &Post> {
        self.threads.values().flatten()
    }

    pub fn user_activity(&self, user: UserId) -> Option<&UserActivity> {
        self.activity.get(&user)
    }

    /// Sorted timestamps of `user`'s posts in `thread_id`.
    pub fn user_times_in(&self, user: UserId, thread_id: ThreadId) -> Option<&[Timestamp]> {
        self.activity
            .get(&user)
            .and_then(|threads| threads.get(&thread_id))
            .map(|t| t.as_slice())
    }

    /// True if `user` has a post in `thread_id` strictly before `t`.
    pub fn posted_before(&self, user: UserId, thread_id: ThreadId, t: Timestamp) -> bool {
        self.user_times_in(user, thread_id)
            .and_then(|times| times.first())
            .is_some_and(|first| *first < t)
    }

    /// Posts with `from <= timestamp < until`, in time order.
    pub fn posts_between(&self, from: Timestamp, until: Timestamp) -> &[Post] {
        let start = self.timeline.partition_point(|p| p.timestamp < from);
        let end = self.timeline.partition_point(|p| p.timestamp < until);
        if start >= end {
            return &[];
        }
        &self.timeline[start..end]
    }
}

/// `t - window`, saturating at the earliest representable instant.
pub(crate) fn window_start(t: Timestamp, window: chrono::Duration) -> Timestamp {
    t.checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
