use std::path::{Path, PathBuf};

use serde::Serialize;

use ripple_common::error::Result;

pub const SWEEP_RESULTS: &str = "sweep_results.csv";
pub const NEGATIVES_SUMMARY: &str = "negatives_summary.csv";

/// One scored feature subset. A failed scorer leaves `f1_score` empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRow {
    pub filters: String,
    pub t_sus_days: i64,
    pub t_fos_days: i64,
    pub feature_set: String,
    pub f1_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NegativesRow {
    pub filters: String,
    pub t_sus_days: i64,
    pub t_fos_days: i64,
    pub avg_negatives_per_positive: f64,
}

fn write_rows<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<PathBuf> {
    let mut w = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    w.write_record(header)?;
    for row in rows {
        w.serialize(row)?;
    }
    w.flush()?;
    Ok(path.to_path_buf())
}

pub fn write_sweep_results(dir: &Path, rows: &[SweepRow]) -> Result<PathBuf> {
    write_rows(
        &dir.join(SWEEP_RESULTS),
        &["filters", "t_sus_days", "t_fos_days", "feature_set", "f1_score"],
        rows,
    )
}

pub fn write_negatives_summary(dir: &Path, rows: &[NegativesRow]) -> Result<PathBuf> {
    write_rows(
        &dir.join(NEGATIVES_SUMMARY),
        &["filters", "t_sus_days", "t_fos_days", "avg_negatives_per_positive"],
        rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_scores_are_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![
            SweepRow {
                filters: "0-1".into(),
                t_sus_days: 7,
                t_fos_days: 30,
                feature_set: "NAN".into(),
                f1_score: Some(0.5),
            },
            SweepRow {
                filters: "0-1".into(),
                t_sus_days: 7,
                t_fos_days: 30,
                feature_set: "NAN+PNE".into(),
                f1_score: None,
            },
        ];
        let path = write_sweep_results(dir.path(), &rows).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            text,
            "filters,t_sus_days,t_fos_days,feature_set,f1_score\n0-1,7,30,NAN,0.5\n0-1,7,30,NAN+PNE,\n"
        );
    }
}
