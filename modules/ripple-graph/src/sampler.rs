//! Adopter/control pair sampling.
//!
//! Walks every post in a seeded random order. A post by `v` at `t_v` becomes an
//! adopter when an earlier, fresh poster `v1` in the same thread (the anchor)
//! shows cross-thread activity toward `v`. Its control is drawn from the users
//! `v1` also reaches who had the same exposure but never joined the thread.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use ripple_common::{Label, NegativeCount, Post, RunSettings, Sample, UserId};

use crate::{IanResolver, InfluenceGraph, ThreadIndex};

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SamplerStats {
    pub events_considered: u32,
    pub no_anchor: u32,
    pub not_susceptible: u32,
    pub no_negatives: u32,
    pub pairs: u32,
}

impl std::fmt::Display for SamplerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Sampling Complete ===")?;
        writeln!(f, "Events considered: {}", self.events_considered)?;
        writeln!(f, "No anchor:         {}", self.no_anchor)?;
        writeln!(f, "Not susceptible:   {}", self.not_susceptible)?;
        writeln!(f, "No negatives:      {}", self.no_negatives)?;
        writeln!(f, "Pairs emitted:     {}", self.pairs)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    /// Adopter followed by its matched control, pair after pair.
    pub balanced: Vec<Sample>,
    /// Every other qualifying negative (label 0) for each emitted pair.
    pub imbalanced: Vec<Sample>,
    pub negatives_per_positive: Vec<NegativeCount>,
    pub stats: SamplerStats,
}

impl SampleSet {
    pub fn pair_count(&self) -> usize {
        self.balanced.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.balanced.is_empty()
    }

    /// Mean pool size per adopter, 0 when nothing was sampled.
    pub fn avg_negatives_per_positive(&self) -> f64 {
        if self.negatives_per_positive.is_empty() {
            return 0.0;
        }
        let total: usize = self
            .negatives_per_positive
            .iter()
            .map(|n| n.negatives_count)
            .sum();
        total as f64 / self.negatives_per_positive.len() as f64
    }
}

// ---------------------------------------------------------------------------
// PairSampler
// ---------------------------------------------------------------------------

pub struct PairSampler<'a> {
    index: &'a ThreadIndex,
    graph: &'a InfluenceGraph,
    resolver: IanResolver<'a>,
    max_pairs: usize,
}

impl<'a> PairSampler<'a> {
    pub fn new(index: &'a ThreadIndex, graph: &'a InfluenceGraph, settings: &RunSettings) -> Self {
        Self {
            index,
            graph,
            resolver: IanResolver::new(index, settings),
            max_pairs: settings.max_pairs,
        }
    }

    /// Sample with a fresh generator seeded from `seed`.
    pub fn sample_seeded(&self, seed: u64) -> SampleSet {
        let mut rng = StdRng::seed_from_u64(seed);
        self.sample(&mut rng)
    }

    /// Emit up to `max_pairs` adopter/control pairs. Event order and control
    /// choice are drawn from `rng`, so equal seeds give equal output.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SampleSet {
        let mut out = SampleSet::default();
        if self.max_pairs == 0 {
            return out;
        }

        let mut seen = HashSet::new();
        let mut events: Vec<&Post> = self
            .index
            .posts()
            .filter(|p| seen.insert(p.post_id))
            .collect();
        events.shuffle(rng);

        for post in events {
            out.stats.events_considered += 1;

            let Some(anchor) = self.find_anchor(post) else {
                out.stats.no_anchor += 1;
                debug!(post_id = post.post_id, "No fresh anchor, skipping");
                continue;
            };

            if !self.resolver.is_susceptible(
                anchor.user_id,
                post.user_id,
                post.thread_id,
                anchor.timestamp,
            ) {
                out.stats.not_susceptible += 1;
                debug!(
                    post_id = post.post_id,
                    anchor = anchor.user_id,
                    "Anchor not active toward adopter, skipping"
                );
                continue;
            }

            let pool = self.negative_pool(anchor, post);
            if pool.is_empty() {
                out.stats.no_negatives += 1;
                debug!(post_id = post.post_id, "Empty negative pool, skipping");
                continue;
            }

            let chosen = rng.random_range(0..pool.len());
            out.balanced.push(sample_row(post, anchor, post.user_id, Label::Adopter));
            out.balanced.push(sample_row(post, anchor, pool[chosen], Label::Control));
            out.imbalanced.extend(
                pool.iter()
                    .enumerate()
                    .filter(|(i, _)| *i != chosen)
                    .map(|(_, u)| sample_row(post, anchor, *u, Label::Control)),
            );
            out.negatives_per_positive.push(NegativeCount {
                user_id: post.user_id,
                post_id: post.post_id,
                negatives_count: pool.len(),
            });

            out.stats.pairs += 1;
            if out.stats.pairs as usize >= self.max_pairs {
                break;
            }
        }

        info!(
            pairs = out.stats.pairs,
            events = out.stats.events_considered,
            imbalanced = out.imbalanced.len(),
            "Pair sampling finished"
        );

        out
    }

    /// Earliest fresh post in the same thread by another user.
    fn find_anchor(&self, post: &Post) -> Option<&'a Post> {
        self.index
            .thread(post.thread_id)?
            .iter()
            .take_while(|p| p.timestamp < post.timestamp)
            .find(|p| {
                p.user_id != post.user_id && self.resolver.is_fresh(p.timestamp, post.timestamp)
            })
    }

    /// Users the anchor reaches, with the same cross-thread exposure, who had
    /// not posted in the thread before the adopter. Ascending user id.
    fn negative_pool(&self, anchor: &Post, post: &Post) -> Vec<UserId> {
        self.graph
            .successors(anchor.user_id)
            .into_iter()
            .filter(|u| *u != post.user_id)
            .filter(|u| !self.index.posted_before(*u, post.thread_id, post.timestamp))
            .filter(|u| {
                self.resolver
                    .is_susceptible(anchor.user_id, *u, post.thread_id, anchor.timestamp)
            })
            .collect()
    }
}

fn sample_row(post: &Post, anchor: &Post, user_id: UserId, label: Label) -> Sample {
    Sample {
        thread_id: post.thread_id,
        post_id: post.post_id,
        user_id,
        timestamp: post.timestamp,
        v1_post_id: anchor.post_id,
        v1_user_id: anchor.user_id,
        v1_timestamp: anchor.timestamp,
        label,
    }
}
