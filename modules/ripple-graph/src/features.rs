//! Feature extraction: NAN, PNE, HUB, OPT and CLC per labeled sample.

use std::collections::{BTreeSet, HashSet};

use tracing::info;

use ripple_common::{
    FeatureSet, FeatureVector, HubRule, Label, RunSettings, Sample, Timestamp, UserId,
};

use crate::{IanResolver, InfluenceGraph, ThreadIndex};

/// Computes feature vectors against one graph, index and window pair.
/// The hub set is computed once at construction.
pub struct FeatureExtractor<'a> {
    graph: &'a InfluenceGraph,
    resolver: IanResolver<'a>,
    features: FeatureSet,
    hubs: HashSet<UserId>,
}

impl<'a> FeatureExtractor<'a> {
    pub fn new(graph: &'a InfluenceGraph, index: &'a ThreadIndex, settings: &RunSettings) -> Self {
        let hubs = hub_set(graph, settings.hub_rule);
        info!(
            hubs = hubs.len(),
            features = %settings.features.label(),
            "Feature extractor ready"
        );
        Self {
            graph,
            resolver: IanResolver::new(index, settings),
            features: settings.features,
            hubs,
        }
    }

    pub fn features(&self) -> FeatureSet {
        self.features
    }

    pub fn hub_set(&self) -> &HashSet<UserId> {
        &self.hubs
    }

    /// In-thread and global IANs of the sample's user. Controls always
    /// include their matched anchor in both sets.
    pub fn neighbor_sets(&self, sample: &Sample) -> (BTreeSet<UserId>, BTreeSet<UserId>) {
        let mut in_thread = self
            .resolver
            .in_thread(sample.user_id, sample.thread_id, sample.timestamp);
        let mut global = self.resolver.global(sample.user_id, sample.timestamp);

        if sample.label == Label::Control {
            in_thread.insert(sample.v1_user_id);
            global.insert(sample.v1_user_id);
        }

        (in_thread, global)
    }

    pub fn extract(&self, sample: &Sample) -> FeatureVector {
        let mut vector = FeatureVector::new(sample.user_id, sample.label);
        let (in_thread, global) = self.neighbor_sets(sample);

        if self.features.nan {
            vector.nan = Some(in_thread.len());
        }
        if self.features.pne {
            vector.pne = Some(personal_network_exposure(in_thread.len(), global.len()));
        }
        if self.features.hub {
            vector.hub = Some(in_thread.iter().filter(|u| self.hubs.contains(u)).count());
        }

        if self.features.needs_triads() {
            let members: Vec<UserId> = global.iter().copied().collect();
            let opt = connected_pairs(self.graph, &members, sample.timestamp);

            if self.features.opt {
                vector.opt = Some(opt);
            }
            if self.features.clc {
                let without_self: Vec<UserId> = members
                    .iter()
                    .copied()
                    .filter(|u| *u != sample.user_id)
                    .collect();
                let possible = if without_self.len() == members.len() {
                    opt
                } else {
                    connected_pairs(self.graph, &without_self, sample.timestamp)
                };
                vector.clc = Some(clustering_coefficient(opt, possible));
            }
        }

        vector
    }

    pub fn extract_all(&self, samples: &[Sample]) -> Vec<FeatureVector> {
        let vectors: Vec<FeatureVector> = samples.iter().map(|s| self.extract(s)).collect();
        info!(samples = vectors.len(), "Features computed");
        vectors
    }
}

// ---------------------------------------------------------------------------
// Pure feature functions
// ---------------------------------------------------------------------------

/// Users selected as hubs by out-degree (parallel edges counted).
///
/// For [`HubRule::Percentile`], users are ranked by descending out-degree with
/// ties kept in ascending user-id order, and the first `floor(n * p)` are taken.
pub fn hub_set(graph: &InfluenceGraph, rule: HubRule) -> HashSet<UserId> {
    let mut ranked: Vec<(UserId, usize)> = graph
        .users()
        .into_iter()
        .map(|u| (u, graph.out_degree(u)))
        .collect();

    match rule {
        HubRule::Percentile(p) => {
            ranked.sort_by(|a, b| b.1.cmp(&a.1));
            let cutoff = (ranked.len() as f64 * p.clamp(0.0, 1.0)).floor() as usize;
            ranked.into_iter().take(cutoff).map(|(u, _)| u).collect()
        }
        HubRule::MinOutDegree(threshold) => ranked
            .into_iter()
            .filter(|(_, degree)| *degree > threshold)
            .map(|(u, _)| u)
            .collect(),
    }
}

/// `in_thread / global`, 0 when there is no global exposure.
pub fn personal_network_exposure(in_thread: usize, global: usize) -> f64 {
    if global == 0 {
        return 0.0;
    }
    in_thread as f64 / global as f64
}

/// Unordered pairs `(u, z)` of `members` joined by an edge in either
/// direction with timestamp `<= t`.
pub fn connected_pairs(graph: &InfluenceGraph, members: &[UserId], t: Timestamp) -> usize {
    let mut count = 0;
    for (i, u) in members.iter().enumerate() {
        for z in &members[i + 1..] {
            if graph.connected_by(*u, *z, t) {
                count += 1;
            }
        }
    }
    count
}

/// `open / possible`, 0 when nothing is possible.
pub fn clustering_coefficient(open_triads: usize, possible_triads: usize) -> f64 {
    if possible_triads == 0 {
        return 0.0;
    }
    open_triads as f64 / possible_triads as f64
}
