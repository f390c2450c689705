//! Experiment orchestration over filter sets, window pairs and feature subsets.
//!
//! The thread index and influence graph are built once per filter set and
//! reused for every window pair. Every scorer failure is recorded as a null
//! score so one bad configuration never aborts the sweep.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use typed_builder::TypedBuilder;

use ripple_common::error::Result;
use ripple_common::{FeatureSet, FileConfig};
use ripple_graph::{ArtifactWriter, CorpusStats, InfluenceGraph, ThreadIndex};
use ripple_store::{filter_set_label, FilterKind, ForumQuery, PostSource};

use crate::results::{write_negatives_summary, write_sweep_results, NegativesRow, SweepRow};
use crate::runner::{run_configuration, RunOutcome};
use crate::scorer::{ScoreRequest, Scorer};

/// One filtered corpus, ready for any number of window pairs.
pub struct Corpus {
    pub label: String,
    pub index: ThreadIndex,
    pub graph: InfluenceGraph,
}

#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub results: Vec<SweepRow>,
    pub negatives: Vec<NegativesRow>,
    pub skipped_filter_sets: Vec<String>,
}

impl std::fmt::Display for SweepReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let failed = self.results.iter().filter(|r| r.f1_score.is_none()).count();
        writeln!(f, "\n=== Sweep Complete ===")?;
        writeln!(f, "Window runs:        {}", self.negatives.len())?;
        writeln!(f, "Scored subsets:     {}", self.results.len() - failed)?;
        writeln!(f, "Failed scores:      {failed}")?;
        writeln!(f, "Skipped filter sets: {}", self.skipped_filter_sets.len())?;
        Ok(())
    }
}

#[derive(TypedBuilder)]
pub struct Experiment {
    config: FileConfig,
    source: Arc<dyn PostSource>,
    #[builder(default, setter(strip_option))]
    scorer: Option<Arc<dyn Scorer>>,
}

impl Experiment {
    pub fn config(&self) -> &FileConfig {
        &self.config
    }

    fn query(&self) -> ForumQuery {
        ForumQuery::from(&self.config.forum)
    }

    fn output_dir(&self) -> PathBuf {
        self.config.output.dir.clone()
    }

    /// Fetch posts for one filter set. `Ok(None)` when the source fails or
    /// returns nothing; the caller skips that configuration.
    pub async fn load_corpus(&self, filter_ids: &[u8]) -> Result<Option<Corpus>> {
        let label = filter_set_label(filter_ids);
        let kinds = FilterKind::parse_set(filter_ids)?;
        let query = self.query();

        let lists = match self.source.allow_lists(&query, &kinds).await {
            Ok(lists) => lists,
            Err(e) => {
                warn!(filters = %label, error = %e, "Filter query failed, skipping filter set");
                return Ok(None);
            }
        };
        let posts = match self.source.fetch_posts(&query).await {
            Ok(posts) => posts,
            Err(e) => {
                warn!(filters = %label, error = %e, "Post query failed, skipping filter set");
                return Ok(None);
            }
        };
        if posts.is_empty() {
            info!(filters = %label, "No posts, skipping filter set");
            return Ok(None);
        }

        let index =
            ThreadIndex::build_filtered(posts, lists.users.as_ref(), lists.threads.as_ref());
        if index.is_empty() {
            info!(filters = %label, "Allow-lists removed every post, skipping filter set");
            return Ok(None);
        }
        let graph = InfluenceGraph::build(&index);

        Ok(Some(Corpus {
            label,
            index,
            graph,
        }))
    }

    fn run_dir(&self, corpus: &Corpus, t_sus_days: i64, t_fos_days: i64) -> PathBuf {
        self.output_dir()
            .join(format!("filters_{}", corpus.label))
            .join(format!("sus{t_sus_days}_fos{t_fos_days}"))
    }

    /// First filter set, first window pair: artifacts only.
    pub async fn run_once(&self) -> Result<Option<RunOutcome>> {
        let filters = self.config.filters.sets.first().cloned().unwrap_or_default();
        let Some((t_sus, t_fos)) = self.config.windows.pairs().first().copied() else {
            return Ok(None);
        };
        let Some(corpus) = self.load_corpus(&filters).await? else {
            return Ok(None);
        };

        let settings = self.config.run_settings(t_sus, t_fos)?;
        let dir = self.run_dir(&corpus, t_sus, t_fos);
        run_configuration(&corpus.index, &corpus.graph, &settings, &dir).map(Some)
    }

    /// Every filter set × window pair, scoring every non-empty feature subset.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        let subsets = self.config.features.non_empty_subsets();

        for filter_ids in &self.config.filters.sets {
            let Some(corpus) = self.load_corpus(filter_ids).await? else {
                report.skipped_filter_sets.push(filter_set_label(filter_ids));
                continue;
            };

            for (t_sus, t_fos) in self.config.windows.pairs() {
                let settings = self.config.run_settings(t_sus, t_fos)?;
                let dir = self.run_dir(&corpus, t_sus, t_fos);
                let outcome = run_configuration(&corpus.index, &corpus.graph, &settings, &dir)?;

                report.negatives.push(NegativesRow {
                    filters: corpus.label.clone(),
                    t_sus_days: t_sus,
                    t_fos_days: t_fos,
                    avg_negatives_per_positive: outcome.avg_negatives_per_positive,
                });

                let Some(scorer) = &self.scorer else {
                    continue;
                };
                for subset in &subsets {
                    let f1_score = self.score_subset(scorer.as_ref(), &outcome, *subset).await;
                    report.results.push(SweepRow {
                        filters: corpus.label.clone(),
                        t_sus_days: t_sus,
                        t_fos_days: t_fos,
                        feature_set: subset.label(),
                        f1_score,
                    });
                }
            }
        }

        let out = self.output_dir();
        std::fs::create_dir_all(&out)?;
        write_negatives_summary(&out, &report.negatives)?;
        if self.scorer.is_some() {
            write_sweep_results(&out, &report.results)?;
        } else {
            info!("No scorer configured, feature subsets not scored");
        }

        info!("{report}");
        Ok(report)
    }

    async fn score_subset(
        &self,
        scorer: &dyn Scorer,
        outcome: &RunOutcome,
        features: FeatureSet,
    ) -> Option<f64> {
        if outcome.pairs == 0 {
            warn!(dir = %outcome.dir.display(), "No samples to score");
            return None;
        }
        let request = ScoreRequest {
            balanced_features: outcome.balanced_features.clone(),
            imbalanced_features: outcome.imbalanced_features.clone(),
            features,
        };
        match scorer.score(&request).await {
            Ok(score) => Some(score),
            Err(e) => {
                warn!(
                    dir = %outcome.dir.display(),
                    features = %features.label(),
                    error = %e,
                    "Scoring failed, recording null score"
                );
                None
            }
        }
    }

    /// Corpus statistics per filter set, written next to each filter's runs.
    pub async fn stats(&self) -> Result<Vec<(String, CorpusStats)>> {
        let mut all = Vec::new();
        for filter_ids in &self.config.filters.sets {
            let Some(corpus) = self.load_corpus(filter_ids).await? else {
                continue;
            };
            let stats = CorpusStats::compute(&corpus.index, &corpus.graph);
            let writer =
                ArtifactWriter::new(self.output_dir().join(format!("filters_{}", corpus.label)))?;
            writer.write_stats(&stats)?;
            info!(filters = %corpus.label, "{stats}");
            all.push((corpus.label, stats));
        }
        Ok(all)
    }
}
