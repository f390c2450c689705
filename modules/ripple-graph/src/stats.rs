use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::{InfluenceGraph, ThreadIndex};

/// Descriptive statistics for one filtered corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorpusStats {
    pub posts: usize,
    pub threads: usize,
    pub users: usize,
    pub edges: usize,
    pub mean_posts_per_thread: f64,
    pub mean_posts_per_user: f64,
    pub mean_users_per_thread: f64,
    /// Mean of `participants / reachable audience` over threads with more than
    /// one participant and more than one out-neighbor.
    pub participation_ratio: f64,
}

impl CorpusStats {
    pub fn compute(index: &ThreadIndex, graph: &InfluenceGraph) -> Self {
        let posts = index.post_count();
        let threads = index.thread_count();
        let users = index.user_count();

        let mut participants_total = 0usize;
        let mut ratio_sum = 0.0;
        let mut ratio_threads = 0usize;

        for (_, thread_posts) in index.threads() {
            let participants: HashSet<_> = thread_posts.iter().map(|p| p.user_id).collect();
            participants_total += participants.len();

            let audience: BTreeSet<_> = participants
                .iter()
                .flat_map(|u| graph.successors(*u))
                .collect();
            if participants.len() > 1 && audience.len() > 1 {
                ratio_sum += participants.len() as f64 / audience.len() as f64;
                ratio_threads += 1;
            }
        }

        Self {
            posts,
            threads,
            users,
            edges: graph.edge_count(),
            mean_posts_per_thread: mean(posts, threads),
            mean_posts_per_user: mean(posts, users),
            mean_users_per_thread: mean(participants_total, threads),
            participation_ratio: if ratio_threads == 0 {
                0.0
            } else {
                ratio_sum / ratio_threads as f64
            },
        }
    }
}

fn mean(total: usize, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

impl std::fmt::Display for CorpusStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Corpus ===")?;
        writeln!(f, "Posts:               {}", self.posts)?;
        writeln!(f, "Threads:             {}", self.threads)?;
        writeln!(f, "Users:               {}", self.users)?;
        writeln!(f, "Influence edges:     {}", self.edges)?;
        writeln!(f, "Posts per thread:    {:.2}", self.mean_posts_per_thread)?;
        writeln!(f, "Posts per user:      {:.2}", self.mean_posts_per_user)?;
        writeln!(f, "Users per thread:    {:.2}", self.mean_users_per_thread)?;
        writeln!(f, "Participation ratio: {:.3}", self.participation_ratio)?;
        Ok(())
    }
}
