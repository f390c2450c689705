//! Influential-Active-Neighbor (IAN) resolution.
//!
//! A user `v1` is an IAN of `v` at time `t_v` when both windows hold:
//!
//! - **forgettability**: `v1` posted at `t1` with `t1 < t_v` and `t_v - t1 <= t_fos`
//! - **susceptibility**: in enough *other* threads, `v1` posted before `v` did,
//!   with `v`'s post in that thread no further than `t_sus` from `t1`
//!
//! The resolver only reads the thread index; window values are applied at
//! query time, so changing them never requires rebuilding the graph.

use std::collections::BTreeSet;

use ripple_common::{InfluenceWindows, Post, RunSettings, ThreadId, Timestamp, UserId};

use crate::thread_index::window_start;
use crate::ThreadIndex;

#[derive(Debug, Clone, Copy)]
pub struct IanResolver<'a> {
    index: &'a ThreadIndex,
    windows: InfluenceWindows,
    min_cross_thread_hits: usize,
}

impl<'a> IanResolver<'a> {
    pub fn new(index: &'a ThreadIndex, settings: &RunSettings) -> Self {
        Self::with_windows(index, settings.windows, settings.min_cross_thread_hits)
    }

    pub fn with_windows(
        index: &'a ThreadIndex,
        windows: InfluenceWindows,
        min_cross_thread_hits: usize,
    ) -> Self {
        Self {
            index,
            windows,
            min_cross_thread_hits,
        }
    }

    /// `t1 < t_v` and `t_v - t1 <= t_fos`.
    pub fn is_fresh(&self, t1: Timestamp, t_v: Timestamp) -> bool {
        t1 < t_v && t_v - t1 <= self.windows.t_fos
    }

    /// Count the distinct threads other than `thread_id` in which `leader`
    /// posted before `follower`, with one of `follower`'s posts there lying
    /// within `t_sus` of `anchor_time` (either side).
    ///
    /// Stops counting once `limit` hits are found.
    pub fn cross_thread_hits(
        &self,
        leader: UserId,
        follower: UserId,
        thread_id: ThreadId,
        anchor_time: Timestamp,
        limit: usize,
    ) -> usize {
        let (Some(leader_threads), Some(follower_threads)) = (
            self.index.user_activity(leader),
            self.index.user_activity(follower),
        ) else {
            return 0;
        };

        let mut hits = 0;
        for (other, follower_times) in follower_threads {
            if *other == thread_id {
                continue;
            }
            let Some(first_leader) = leader_threads.get(other).and_then(|t| t.first()) else {
                continue;
            };
            let qualifies = follower_times.iter().any(|b| {
                let gap = if *b > anchor_time {
                    *b - anchor_time
                } else {
                    anchor_time - *b
                };
                *first_leader < *b && gap <= self.windows.t_sus
            });
            if qualifies {
                hits += 1;
                if hits >= limit {
                    break;
                }
            }
        }
        hits
    }

    /// True when `leader` shows enough cross-thread activity toward `follower`.
    pub fn is_susceptible(
        &self,
        leader: UserId,
        follower: UserId,
        thread_id: ThreadId,
        anchor_time: Timestamp,
    ) -> bool {
        if leader == follower {
            return false;
        }
        let needed = self.min_cross_thread_hits;
        self.cross_thread_hits(leader, follower, thread_id, anchor_time, needed) >= needed
    }

    fn qualifies(&self, candidate: &Post, v: UserId, t_v: Timestamp) -> bool {
        candidate.user_id != v
            && self.is_fresh(candidate.timestamp, t_v)
            && self.is_susceptible(candidate.user_id, v, candidate.thread_id, candidate.timestamp)
    }

    /// IANs of `v` among the earlier posters of `thread_id`.
    pub fn in_thread(&self, v: UserId, thread_id: ThreadId, t_v: Timestamp) -> BTreeSet<UserId> {
        let mut found = BTreeSet::new();
        let Some(posts) = self.index.thread(thread_id) else {
            return found;
        };
        for post in posts {
            if post.timestamp >= t_v {
                break;
            }
            if found.contains(&post.user_id) {
                continue;
            }
            if self.qualifies(post, v, t_v) {
                found.insert(post.user_id);
            }
        }
        found
    }

    /// IANs of `v` across every thread: the qualifying occurrence of `v1` may
    /// be in any thread, not only the one `v` is posting in.
    pub fn global(&self, v: UserId, t_v: Timestamp) -> BTreeSet<UserId> {
        let mut found = BTreeSet::new();
        let from = window_start(t_v, self.windows.t_fos);
        for post in self.index.posts_between(from, t_v) {
            if found.contains(&post.user_id) {
                continue;
            }
            if self.qualifies(post, v, t_v) {
                found.insert(post.user_id);
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{minutes, CorpusBuilder};

    fn windows(sus_min: i64, fos_min: i64) -> InfluenceWindows {
        InfluenceWindows::new(chrono::Duration::minutes(sus_min), chrono::Duration::minutes(fos_min))
    }

    #[test]
    fn freshness_is_strictly_before_and_inclusive_at_window_edge() {
        let index = ThreadIndex::default();
        let r = IanResolver::with_windows(&index, windows(0, 10), 1);
        assert!(r.is_fresh(minutes(0), minutes(10)));
        assert!(!r.is_fresh(minutes(0), minutes(11)));
        assert!(!r.is_fresh(minutes(10), minutes(10)));
    }

    #[test]
    fn susceptibility_requires_leader_first_in_another_thread() {
        // Thread 2: leader 1 before follower 2. Thread 3: follower first.
        let index = CorpusBuilder::new()
            .post(1, 1, 100)
            .post(2, 1, 90)
            .post(2, 2, 95)
            .post(3, 2, 80)
            .post(3, 1, 85)
            .build_index();
        let r = IanResolver::with_windows(&index, windows(1_000, 1_000), 1);

        assert!(r.is_susceptible(1, 2, 1, minutes(100)));
        // Reverse direction only has evidence in thread 3.
        assert_eq!(r.cross_thread_hits(2, 1, 1, minutes(100), 10), 1);
        // Evidence in the anchor thread itself never counts.
        assert!(!r.is_susceptible(1, 2, 2, minutes(100)));
    }

    #[test]
    fn susceptibility_gap_is_measured_against_follower_post() {
        let index = CorpusBuilder::new()
            .post(2, 1, 0)
            .post(2, 2, 50)
            .build_index();
        let anchor = minutes(100);

        let tight = IanResolver::with_windows(&index, windows(49, 1_000), 1);
        assert!(!tight.is_susceptible(1, 2, 1, anchor));

        let exact = IanResolver::with_windows(&index, windows(50, 1_000), 1);
        assert!(exact.is_susceptible(1, 2, 1, anchor));

        // Follower post after the anchor counts symmetrically.
        let after = IanResolver::with_windows(&index, windows(50, 1_000), 1);
        assert!(after.is_susceptible(1, 2, 1, minutes(0)));
    }

    #[test]
    fn min_cross_thread_hits_is_respected() {
        let index = CorpusBuilder::new()
            .post(2, 1, 0)
            .post(2, 2, 1)
            .post(3, 1, 2)
            .post(3, 2, 3)
            .build_index();
        let anchor = minutes(10);
        assert!(IanResolver::with_windows(&index, windows(100, 100), 2).is_susceptible(1, 2, 1, anchor));
        assert!(!IanResolver::with_windows(&index, windows(100, 100), 3).is_susceptible(1, 2, 1, anchor));
    }

    #[test]
    fn user_is_never_its_own_ian() {
        let index = CorpusBuilder::new()
            .post(1, 1, 0)
            .post(1, 1, 5)
            .post(2, 1, 1)
            .build_index();
        let r = IanResolver::with_windows(&index, windows(1_000, 1_000), 1);
        assert!(r.in_thread(1, 1, minutes(5)).is_empty());
        assert!(r.global(1, minutes(5)).is_empty());
    }

    #[test]
    fn unknown_thread_yields_empty_set() {
        let index = CorpusBuilder::new().post(1, 1, 0).build_index();
        let r = IanResolver::with_windows(&index, windows(10, 10), 1);
        assert!(r.in_thread(2, 99, minutes(5)).is_empty());
    }

    #[test]
    fn global_finds_influencers_in_other_threads() {
        // Thread 4 shows 1 posting before 3, which backs 1's post in thread 1.
        let index = CorpusBuilder::new()
            .post(1, 1, 10)
            .post(4, 1, 0)
            .post(4, 3, 2)
            .post(5, 3, 20)
            .build_index();
        let r = IanResolver::with_windows(&index, windows(1_000, 1_000), 1);

        // 3 posting in thread 5 has no earlier poster there, but 1's fresh post
        // in thread 1 is backed by evidence from thread 4.
        assert!(r.in_thread(3, 5, minutes(20)).is_empty());
        let global = r.global(3, minutes(20));
        assert_eq!(global, BTreeSet::from([1]));
    }
}
