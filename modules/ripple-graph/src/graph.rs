//! Influence graph: a directed multigraph over users.
//!
//! Every earlier poster in a thread gets an edge to every later poster in the
//! same thread (all pairs, not just adjacent posts). Parallel edges between the
//! same pair of users are kept, because temporal queries need the timestamp of
//! each distinct occurrence.

use std::collections::{BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::info;

use ripple_common::{PostId, ThreadId, Timestamp, UserId};

use crate::ThreadIndex;

/// One influence occurrence: `from_user` posted `from_post_id` in `thread_id`
/// at `timestamp`, before `to_user` posted in the same thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluenceEdge {
    pub from_user: UserId,
    pub to_user: UserId,
    pub thread_id: ThreadId,
    pub timestamp: Timestamp,
    pub from_post_id: PostId,
}

/// Immutable after [`InfluenceGraph::build`].
#[derive(Debug, Clone, Default)]
pub struct InfluenceGraph {
    graph: DiGraph<UserId, InfluenceEdge>,
    nodes: HashMap<UserId, NodeIndex>,
}

impl InfluenceGraph {
    /// Build the graph from the thread index. Quadratic in thread length.
    pub fn build(index: &ThreadIndex) -> Self {
        let mut g = Self::default();

        for (thread_id, posts) in index.threads() {
            for (i, later) in posts.iter().enumerate() {
                let to = g.ensure_node(later.user_id);
                for earlier in &posts[..i] {
                    if earlier.user_id == later.user_id {
                        continue;
                    }
                    let from = g.ensure_node(earlier.user_id);
                    g.graph.add_edge(
                        from,
                        to,
                        InfluenceEdge {
                            from_user: earlier.user_id,
                            to_user: later.user_id,
                            thread_id,
                            timestamp: earlier.timestamp,
                            from_post_id: earlier.post_id,
                        },
                    );
                }
            }
        }

        info!(
            users = g.node_count(),
            edges = g.edge_count(),
            "Influence graph built"
        );

        g
    }

    fn ensure_node(&mut self, user: UserId) -> NodeIndex {
        if let Some(idx) = self.nodes.get(&user) {
            return *idx;
        }
        let idx = self.graph.add_node(user);
        self.nodes.insert(user, idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_user(&self, user: UserId) -> bool {
        self.nodes.contains_key(&user)
    }

    /// All users, ascending.
    pub fn users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.nodes.keys().copied().collect();
        users.sort_unstable();
        users
    }

    fn edges_directed(
        &self,
        user: UserId,
        direction: Direction,
    ) -> impl Iterator<Item = &InfluenceEdge> + '_ {
        self.nodes
            .get(&user)
            .into_iter()
            .flat_map(move |idx| self.graph.edges_directed(*idx, direction))
            .map(|e| e.weight())
    }

    /// Edges leaving `user`, parallel edges included.
    pub fn out_edges(&self, user: UserId) -> impl Iterator<Item = &InfluenceEdge> + '_ {
        self.edges_directed(user, Direction::Outgoing)
    }

    /// Edges arriving at `user`, parallel edges included.
    pub fn in_edges(&self, user: UserId) -> impl Iterator<Item = &InfluenceEdge> + '_ {
        self.edges_directed(user, Direction::Incoming)
    }

    /// Number of outgoing edges, counting every parallel edge.
    pub fn out_degree(&self, user: UserId) -> usize {
        self.out_edges(user).count()
    }

    /// Distinct users reachable over one outgoing edge, ascending.
    pub fn successors(&self, user: UserId) -> BTreeSet<UserId> {
        self.out_edges(user).map(|e| e.to_user).collect()
    }

    /// Every `from → to` edge (one direction only).
    pub fn edges_between(&self, from: UserId, to: UserId) -> impl Iterator<Item = &InfluenceEdge> + '_ {
        let target = self.nodes.get(&to).copied();
        self.nodes
            .get(&from)
            .into_iter()
            .flat_map(move |idx| self.graph.edges_directed(*idx, Direction::Outgoing))
            .filter(move |e| Some(e.target()) == target)
            .map(|e| e.weight())
    }

    /// True if an edge `u → z` or `z → u` exists with timestamp `<= t`.
    /// Influence direction is not assumed for triad tests.
    pub fn connected_by(&self, u: UserId, z: UserId, t: Timestamp) -> bool {
        self.edges_between(u, z).any(|e| e.timestamp <= t)
            || self.edges_between(z, u).any(|e| e.timestamp <= t)
    }
}
