use std::path::{Path, PathBuf};

use tracing::info;

use ripple_common::error::Result;
use ripple_common::RunSettings;
use ripple_graph::writer::{FEATURES_BALANCED, FEATURES_IMBALANCED};
use ripple_graph::{
    ArtifactWriter, CorpusStats, FeatureExtractor, InfluenceGraph, PairSampler, SamplerStats,
    ThreadIndex,
};

/// What one sampling + feature run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub dir: PathBuf,
    pub pairs: usize,
    pub imbalanced: usize,
    pub avg_negatives_per_positive: f64,
    pub balanced_features: PathBuf,
    pub imbalanced_features: PathBuf,
    pub stats: SamplerStats,
}

/// Sample pairs, extract features on both sample sets and write every
/// artifact into `dir`, corpus statistics included.
pub fn run_configuration(
    index: &ThreadIndex,
    graph: &InfluenceGraph,
    settings: &RunSettings,
    dir: &Path,
) -> Result<RunOutcome> {
    let writer = ArtifactWriter::new(dir)?;
    writer.write_stats(&CorpusStats::compute(index, graph))?;

    let samples = PairSampler::new(index, graph, settings).sample_seeded(settings.seed);
    writer.write_sample_set(&samples)?;

    let extractor = FeatureExtractor::new(graph, index, settings);
    let balanced = extractor.extract_all(&samples.balanced);
    let imbalanced = extractor.extract_all(&samples.imbalanced);
    let balanced_features = writer.write_features(FEATURES_BALANCED, settings.features, &balanced)?;
    let imbalanced_features =
        writer.write_features(FEATURES_IMBALANCED, settings.features, &imbalanced)?;

    let outcome = RunOutcome {
        dir: dir.to_path_buf(),
        pairs: samples.pair_count(),
        imbalanced: samples.imbalanced.len(),
        avg_negatives_per_positive: samples.avg_negatives_per_positive(),
        balanced_features,
        imbalanced_features,
        stats: samples.stats,
    };

    info!(
        dir = %dir.display(),
        pairs = outcome.pairs,
        avg_negatives = outcome.avg_negatives_per_positive,
        "Run configuration complete"
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_common::InfluenceWindows;
    use ripple_graph::testutil::CorpusBuilder;
    use ripple_graph::writer::{
        BALANCED_SAMPLES, CORPUS_STATS, IMBALANCED_SAMPLES, NEGATIVES_PER_POSITIVE,
    };

    #[test]
    fn writes_every_artifact() {
        let (index, graph) = CorpusBuilder::new()
            .post(10, 1, 0)
            .post(10, 2, 5)
            .post(10, 3, 6)
            .post(20, 1, 100)
            .post(20, 2, 110)
            .build();
        let settings = RunSettings::builder()
            .windows(InfluenceWindows::from_days(30, 30))
            .build();
        let dir = tempfile::tempdir().unwrap();

        let outcome = run_configuration(&index, &graph, &settings, dir.path()).unwrap();
        assert_eq!(outcome.pairs, 1);
        assert_eq!(outcome.avg_negatives_per_positive, 1.0);

        for name in [
            BALANCED_SAMPLES,
            IMBALANCED_SAMPLES,
            NEGATIVES_PER_POSITIVE,
            CORPUS_STATS,
        ] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }
        let stats = std::fs::read_to_string(dir.path().join(CORPUS_STATS)).unwrap();
        assert!(stats.contains("\"posts\": 5"), "{stats}");
        let features = std::fs::read_to_string(outcome.balanced_features).unwrap();
        assert_eq!(features.lines().next().unwrap(), "user_id,label,nan,pne,hub,opt,clc");
        assert_eq!(features.lines().count(), 3);
    }
}
