//! Allow-list filters over users and threads.
//!
//! Filters 0 and 1 return user ids, 2 and 3 return thread ids. Results of the
//! same target are intersected; a filter that returns nothing is ignored.

use std::collections::HashSet;
use std::fmt;

use ripple_common::error::{Result, RippleError};
use ripple_common::{ThreadId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterKind {
    /// Users with more than 2 posts.
    PostsPerUser,
    /// Users active in more than 2 distinct threads.
    ThreadsPerUser,
    /// Threads with more than 2 posts from more than 1 user.
    PostsPerThread,
    /// Threads with more than 2 distinct users.
    UsersPerThread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTarget {
    User,
    Thread,
}

impl FilterKind {
    pub const ALL: [FilterKind; 4] = [
        FilterKind::PostsPerUser,
        FilterKind::ThreadsPerUser,
        FilterKind::PostsPerThread,
        FilterKind::UsersPerThread,
    ];

    pub fn id(self) -> u8 {
        match self {
            FilterKind::PostsPerUser => 0,
            FilterKind::ThreadsPerUser => 1,
            FilterKind::PostsPerThread => 2,
            FilterKind::UsersPerThread => 3,
        }
    }

    pub fn from_id(id: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.id() == id)
            .ok_or_else(|| RippleError::Config(format!("unknown filter id {id}")))
    }

    /// Parse a whole filter set, preserving order.
    pub fn parse_set(ids: &[u8]) -> Result<Vec<Self>> {
        ids.iter().map(|id| Self::from_id(*id)).collect()
    }

    pub fn target(self) -> FilterTarget {
        match self {
            FilterKind::PostsPerUser | FilterKind::ThreadsPerUser => FilterTarget::User,
            FilterKind::PostsPerThread | FilterKind::UsersPerThread => FilterTarget::Thread,
        }
    }

    /// Grouped query over the relevance-filtered posts of one forum.
    /// Binds: `$1` forum id, `$2` min content length, `$3` min topic score.
    pub fn sql(self) -> &'static str {
        match self {
            FilterKind::PostsPerUser => {
                r#"
                SELECT p.user_id::BIGINT
                FROM posts p JOIN topics t ON p.topic_id = t.topic_id
                WHERE t.forum_id = $1
                  AND LENGTH(p.content_post) > $2 AND t.classification_topic >= $3
                GROUP BY p.user_id
                HAVING COUNT(p.post_id) > 2
                "#
            }
            FilterKind::ThreadsPerUser => {
                r#"
                SELECT p.user_id::BIGINT
                FROM posts p JOIN topics t ON p.topic_id = t.topic_id
                WHERE t.forum_id = $1
                  AND LENGTH(p.content_post) > $2 AND t.classification_topic >= $3
                GROUP BY p.user_id
                HAVING COUNT(DISTINCT p.topic_id) > 2
                "#
            }
            FilterKind::PostsPerThread => {
                r#"
                SELECT t.topic_id::BIGINT
                FROM topics t JOIN posts p ON t.topic_id = p.topic_id
                WHERE t.forum_id = $1
                  AND LENGTH(p.content_post) > $2 AND t.classification_topic >= $3
                GROUP BY t.topic_id
                HAVING COUNT(p.post_id) > 2 AND COUNT(DISTINCT p.user_id) > 1
                "#
            }
            FilterKind::UsersPerThread => {
                r#"
                SELECT t.topic_id::BIGINT
                FROM topics t JOIN posts p ON t.topic_id = p.topic_id
                WHERE t.forum_id = $1
                  AND LENGTH(p.content_post) > $2 AND t.classification_topic >= $3
                GROUP BY t.topic_id
                HAVING COUNT(DISTINCT p.user_id) > 2
                "#
            }
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterKind::PostsPerUser => "posts_per_user",
            FilterKind::ThreadsPerUser => "threads_per_user",
            FilterKind::PostsPerThread => "posts_per_thread",
            FilterKind::UsersPerThread => "users_per_thread",
        };
        write!(f, "{name}")
    }
}

/// Ids returned by one filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterResult {
    pub kind: FilterKind,
    pub ids: HashSet<i64>,
}

/// Combined allow-lists. `None` means unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowLists {
    pub users: Option<HashSet<UserId>>,
    pub threads: Option<HashSet<ThreadId>>,
}

impl AllowLists {
    pub fn combine(results: impl IntoIterator<Item = FilterResult>) -> Self {
        let mut lists = Self::default();
        for result in results {
            if result.ids.is_empty() {
                continue;
            }
            let slot = match result.kind.target() {
                FilterTarget::User => &mut lists.users,
                FilterTarget::Thread => &mut lists.threads,
            };
            *slot = Some(match slot.take() {
                Some(current) => current.intersection(&result.ids).copied().collect(),
                None => result.ids,
            });
        }
        lists
    }
}

/// Display name of a filter set, e.g. `0-2` or `none`.
pub fn filter_set_label(ids: &[u8]) -> String {
    if ids.is_empty() {
        return "none".to_string();
    }
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join("-")
}
