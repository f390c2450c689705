use std::sync::Arc;

use async_trait::async_trait;

use ripple_common::config::parse_config;
use ripple_common::error::{Result, RippleError};
use ripple_common::FeatureKind;
use ripple_experiment::{Experiment, ScoreRequest, Scorer};
use ripple_store::CsvPostSource;

const EXPORT: &str = "\
post_id,thread_id,user_id,timestamp
1,10,1,2024-01-01T00:00:00Z
2,10,2,2024-01-01T00:05:00Z
3,10,3,2024-01-01T00:06:00Z
4,20,1,2024-01-01T01:40:00Z
5,20,2,2024-01-01T01:50:00Z
";

/// Fails whenever HUB is requested.
struct PickyScorer;

#[async_trait]
impl Scorer for PickyScorer {
    async fn score(&self, request: &ScoreRequest) -> Result<f64> {
        if request.features.contains(FeatureKind::Hub) {
            return Err(RippleError::Scoring("classifier crashed".to_string()));
        }
        Ok(0.6)
    }
}

fn experiment(dir: &std::path::Path, scorer: bool) -> Experiment {
    let toml = format!(
        r#"
        [forum]
        id = 1

        [source]
        kind = "csv"
        csv_path = "unused.csv"

        [filters]
        sets = [[], [3]]

        [windows]
        t_sus_days = [30]
        t_fos_days = [30]

        [output]
        dir = "{}"
        "#,
        dir.display()
    );
    let config = parse_config(&toml).unwrap();
    let source = Arc::new(CsvPostSource::from_reader(EXPORT.as_bytes()).unwrap());
    if scorer {
        Experiment::builder()
            .config(config)
            .source(source)
            .scorer(Arc::new(PickyScorer))
            .build()
    } else {
        Experiment::builder().config(config).source(source).build()
    }
}

#[tokio::test]
async fn scorer_failures_become_null_scores_without_aborting() {
    let dir = tempfile::tempdir().unwrap();
    let report = experiment(dir.path(), true).sweep().await.unwrap();

    // Two filter sets × one window pair × 7 subsets of NAN+PNE+HUB.
    assert_eq!(report.results.len(), 14);
    assert_eq!(report.negatives.len(), 2);

    let unfiltered: Vec<_> = report.results.iter().filter(|r| r.filters == "none").collect();
    assert_eq!(unfiltered.len(), 7);
    assert_eq!(unfiltered[0].feature_set, "NAN");
    assert_eq!(unfiltered[0].f1_score, Some(0.6));
    assert_eq!(unfiltered.iter().filter(|r| r.f1_score.is_none()).count(), 4);

    // Thread filter keeps only thread 10, which has no cross-thread evidence.
    assert!(report
        .results
        .iter()
        .filter(|r| r.filters == "3")
        .all(|r| r.f1_score.is_none()));

    let sweep = std::fs::read_to_string(dir.path().join("sweep_results.csv")).unwrap();
    assert!(sweep.starts_with("filters,t_sus_days,t_fos_days,feature_set,f1_score\n"));
    assert!(sweep.contains("none,30,30,NAN+PNE,0.6\n"));
    assert!(sweep.contains("none,30,30,NAN+HUB,\n"));

    assert!(dir
        .path()
        .join("filters_none/sus30_fos30/balanced_samples.csv")
        .exists());
}

#[tokio::test]
async fn sweep_without_scorer_still_writes_negatives_summary() {
    let dir = tempfile::tempdir().unwrap();
    let report = experiment(dir.path(), false).sweep().await.unwrap();
    assert!(report.results.is_empty());

    let summary = std::fs::read_to_string(dir.path().join("negatives_summary.csv")).unwrap();
    let lines: Vec<_> = summary.lines().collect();
    assert_eq!(
        lines,
        vec![
            "filters,t_sus_days,t_fos_days,avg_negatives_per_positive",
            "none,30,30,1.0",
            "3,30,30,0.0",
        ]
    );
    assert!(!dir.path().join("sweep_results.csv").exists());
}

#[tokio::test]
async fn stats_are_written_per_filter_set() {
    let dir = tempfile::tempdir().unwrap();
    let stats = experiment(dir.path(), false).stats().await.unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].1.posts, 5);
    assert_eq!(stats[1].1.posts, 3);
    assert!(dir.path().join("filters_none/corpus_stats.json").exists());
}
