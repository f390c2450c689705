//! Feature vocabulary shared by the extractor, the writers and the sweep.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Label, UserId};

/// The five influence features, in canonical column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    /// Number of influential active neighbors in the thread.
    Nan,
    /// Personal network exposure.
    Pne,
    /// Hub influencers among the in-thread neighbors.
    Hub,
    /// Connected (open) triads among global neighbors.
    Opt,
    /// Clustering coefficient.
    Clc,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 5] = [
        FeatureKind::Nan,
        FeatureKind::Pne,
        FeatureKind::Hub,
        FeatureKind::Opt,
        FeatureKind::Clc,
    ];

    /// Lowercase column name used in feature tables.
    pub fn column(self) -> &'static str {
        match self {
            FeatureKind::Nan => "nan",
            FeatureKind::Pne => "pne",
            FeatureKind::Hub => "hub",
            FeatureKind::Opt => "opt",
            FeatureKind::Clc => "clc",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column().to_ascii_uppercase())
    }
}

// ---------------------------------------------------------------------------
// FeatureSet
// ---------------------------------------------------------------------------

/// Per-feature enable flags. Deserializes from a `[features]` TOML table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureSet {
    pub nan: bool,
    pub pne: bool,
    pub hub: bool,
    pub opt: bool,
    pub clc: bool,
}

impl FeatureSet {
    pub fn all() -> Self {
        Self {
            nan: true,
            pne: true,
            hub: true,
            opt: true,
            clc: true,
        }
    }

    pub fn from_kinds(kinds: &[FeatureKind]) -> Self {
        let mut set = Self::default();
        for kind in kinds {
            set.set(*kind, true);
        }
        set
    }

    pub fn contains(&self, kind: FeatureKind) -> bool {
        match kind {
            FeatureKind::Nan => self.nan,
            FeatureKind::Pne => self.pne,
            FeatureKind::Hub => self.hub,
            FeatureKind::Opt => self.opt,
            FeatureKind::Clc => self.clc,
        }
    }

    pub fn set(&mut self, kind: FeatureKind, enabled: bool) {
        match kind {
            FeatureKind::Nan => self.nan = enabled,
            FeatureKind::Pne => self.pne = enabled,
            FeatureKind::Hub => self.hub = enabled,
            FeatureKind::Opt => self.opt = enabled,
            FeatureKind::Clc => self.clc = enabled,
        }
    }

    /// Enabled kinds in canonical order.
    pub fn kinds(&self) -> Vec<FeatureKind> {
        FeatureKind::ALL
            .into_iter()
            .filter(|k| self.contains(*k))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds().is_empty()
    }

    /// The triad enumeration is only needed for OPT or CLC.
    pub fn needs_triads(&self) -> bool {
        self.opt || self.clc
    }

    /// Every non-empty subset of the enabled kinds, smallest subsets first,
    /// each subset in canonical order.
    pub fn non_empty_subsets(&self) -> Vec<FeatureSet> {
        let kinds = self.kinds();
        let mut subsets: Vec<Vec<FeatureKind>> = Vec::new();
        for size in 1..=kinds.len() {
            combinations(&kinds, size, 0, &mut Vec::new(), &mut subsets);
        }
        subsets.iter().map(|s| FeatureSet::from_kinds(s)).collect()
    }

    /// Display name such as `NAN+PNE`.
    pub fn label(&self) -> String {
        self.kinds()
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join("+")
    }
}

fn combinations(
    kinds: &[FeatureKind],
    size: usize,
    start: usize,
    current: &mut Vec<FeatureKind>,
    out: &mut Vec<Vec<FeatureKind>>,
) {
    if current.len() == size {
        out.push(current.clone());
        return;
    }
    for i in start..kinds.len() {
        current.push(kinds[i]);
        combinations(kinds, size, i + 1, current, out);
        current.pop();
    }
}

// ---------------------------------------------------------------------------
// FeatureVector
// ---------------------------------------------------------------------------

/// Features computed for one sample. Disabled features stay `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub user_id: UserId,
    pub label: Label,
    pub nan: Option<usize>,
    pub pne: Option<f64>,
    pub hub: Option<usize>,
    pub opt: Option<usize>,
    pub clc: Option<f64>,
}

impl FeatureVector {
    pub fn new(user_id: UserId, label: Label) -> Self {
        Self {
            user_id,
            label,
            nan: None,
            pne: None,
            hub: None,
            opt: None,
            clc: None,
        }
    }

    pub fn value(&self, kind: FeatureKind) -> Option<f64> {
        match kind {
            FeatureKind::Nan => self.nan.map(|v| v as f64),
            FeatureKind::Pne => self.pne,
            FeatureKind::Hub => self.hub.map(|v| v as f64),
            FeatureKind::Opt => self.opt.map(|v| v as f64),
            FeatureKind::Clc => self.clc,
        }
    }
}

// ---------------------------------------------------------------------------
// HubRule
// ---------------------------------------------------------------------------

/// How the global hub set is selected from graph out-degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HubRule {
    /// Top fraction of users by descending out-degree (0.1 = top 10%).
    Percentile(f64),
    /// Users whose out-degree is strictly greater than the threshold.
    MinOutDegree(usize),
}

impl Default for HubRule {
    fn default() -> Self {
        HubRule::Percentile(0.1)
    }
}
