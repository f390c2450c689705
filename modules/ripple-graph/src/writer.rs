//! Flat CSV/JSON artifacts for one run configuration.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use tracing::info;

use ripple_common::error::{Result, RippleError};
use ripple_common::{FeatureKind, FeatureSet, FeatureVector, NegativeCount, Sample};

use crate::{CorpusStats, SampleSet};

pub const BALANCED_SAMPLES: &str = "balanced_samples.csv";
pub const IMBALANCED_SAMPLES: &str = "imbalanced_samples.csv";
pub const NEGATIVES_PER_POSITIVE: &str = "negatives_per_positive.csv";
pub const FEATURES_BALANCED: &str = "features_on_balanced.csv";
pub const FEATURES_IMBALANCED: &str = "features_on_imbalanced.csv";
pub const CORPUS_STATS: &str = "corpus_stats.json";

const SAMPLE_COLUMNS: [&str; 8] = [
    "thread_id",
    "post_id",
    "user_id",
    "timestamp",
    "v1_post_id",
    "v1_user_id",
    "v1_timestamp",
    "label",
];

/// Writes artifacts into one output directory, created on construction.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    fn create(&self, file_name: &str) -> Result<csv::Writer<File>> {
        let path = self.path(file_name);
        let file = File::create(&path).map_err(|e| {
            RippleError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create {}: {e}", path.display()),
            ))
        })?;
        // Headers are written explicitly so empty tables still carry them.
        Ok(WriterBuilder::new().has_headers(false).from_writer(file))
    }

    pub fn write_samples(&self, file_name: &str, samples: &[Sample]) -> Result<PathBuf> {
        let mut w = self.create(file_name)?;
        w.write_record(SAMPLE_COLUMNS)?;
        for sample in samples {
            w.serialize(sample)?;
        }
        w.flush()?;
        Ok(self.path(file_name))
    }

    pub fn write_negative_counts(&self, counts: &[NegativeCount]) -> Result<PathBuf> {
        let mut w = self.create(NEGATIVES_PER_POSITIVE)?;
        w.write_record(["user_id", "post_id", "negatives_count"])?;
        for count in counts {
            w.serialize(count)?;
        }
        w.flush()?;
        Ok(self.path(NEGATIVES_PER_POSITIVE))
    }

    /// `user_id, label` plus one column per enabled feature, canonical order.
    pub fn write_features(
        &self,
        file_name: &str,
        features: FeatureSet,
        vectors: &[FeatureVector],
    ) -> Result<PathBuf> {
        let kinds = features.kinds();
        let mut w = self.create(file_name)?;

        let mut header = vec!["user_id", "label"];
        header.extend(kinds.iter().map(|k| k.column()));
        w.write_record(&header)?;

        for v in vectors {
            let mut record = vec![v.user_id.to_string(), v.label.value().to_string()];
            record.extend(kinds.iter().map(|k| feature_cell(v, *k)));
            w.write_record(&record)?;
        }
        w.flush()?;
        Ok(self.path(file_name))
    }

    pub fn write_stats(&self, stats: &CorpusStats) -> Result<PathBuf> {
        let path = self.path(CORPUS_STATS);
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(file, stats)
            .map_err(|e| RippleError::Validation(format!("Failed to write corpus stats: {e}")))?;
        Ok(path)
    }

    /// Balanced, imbalanced and negatives-per-positive tables.
    pub fn write_sample_set(&self, set: &SampleSet) -> Result<()> {
        self.write_samples(BALANCED_SAMPLES, &set.balanced)?;
        self.write_samples(IMBALANCED_SAMPLES, &set.imbalanced)?;
        self.write_negative_counts(&set.negatives_per_positive)?;
        info!(
            dir = %self.dir.display(),
            balanced = set.balanced.len(),
            imbalanced = set.imbalanced.len(),
            "Sample tables written"
        );
        Ok(())
    }
}

/// Integer features print without a fraction; missing values are empty.
fn feature_cell(v: &FeatureVector, kind: FeatureKind) -> String {
    match kind {
        FeatureKind::Nan => v.nan.map(|n| n.to_string()),
        FeatureKind::Hub => v.hub.map(|n| n.to_string()),
        FeatureKind::Opt => v.opt.map(|n| n.to_string()),
        FeatureKind::Pne => v.pne.map(|x| x.to_string()),
        FeatureKind::Clc => v.clc.map(|x| x.to_string()),
    }
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::minutes;
    use ripple_common::Label;

    fn sample(user_id: i64, label: Label) -> Sample {
        Sample {
            thread_id: 10,
            post_id: 5,
            user_id,
            timestamp: minutes(110),
            v1_post_id: 4,
            v1_user_id: 1,
            v1_timestamp: minutes(100),
            label,
        }
    }

    #[test]
    fn sample_table_has_fixed_header_and_numeric_labels() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path().join("run")).unwrap();
        let path = writer
            .write_samples(
                BALANCED_SAMPLES,
                &[sample(2, Label::Adopter), sample(3, Label::Control)],
            )
            .unwrap();

        let text = std::fs::read_to_string(path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "thread_id,post_id,user_id,timestamp,v1_post_id,v1_user_id,v1_timestamp,label"
        );
        assert!(lines.next().unwrap().ends_with(",1"));
        assert!(lines.next().unwrap().ends_with(",0"));
    }

    #[test]
    fn empty_tables_keep_header() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path()).unwrap();
        let path = writer.write_negative_counts(&[]).unwrap();
        assert_eq!(
            std::fs::read_to_string(path).unwrap().trim(),
            "user_id,post_id,negatives_count"
        );
    }

    #[test]
    fn feature_table_has_only_enabled_columns() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path()).unwrap();
        let mut v = FeatureVector::new(7, Label::Control);
        v.nan = Some(2);
        v.pne = Some(0.5);
        let set = FeatureSet::from_kinds(&[FeatureKind::Nan, FeatureKind::Pne]);

        let path = writer.write_features(FEATURES_BALANCED, set, &[v]).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(text, "user_id,label,nan,pne\n7,0,2,0.5\n");
    }
}
