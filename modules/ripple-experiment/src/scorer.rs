//! Classifier scoring seam.
//!
//! The classifier lives outside this workspace. A [`Scorer`] receives the
//! feature tables of one run and the columns to train on, and returns an F1
//! score. Failures are the caller's to absorb.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use ripple_common::error::{Result, RippleError};
use ripple_common::FeatureSet;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRequest {
    pub balanced_features: PathBuf,
    pub imbalanced_features: PathBuf,
    pub features: FeatureSet,
}

impl ScoreRequest {
    /// Lowercase column names, e.g. `nan,pne`.
    pub fn columns(&self) -> String {
        self.features
            .kinds()
            .iter()
            .map(|k| k.column())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, request: &ScoreRequest) -> Result<f64>;
}

/// Runs an external program:
/// `<command...> --balanced <csv> --imbalanced <csv> --features <cols>`.
/// The last non-empty stdout line must be the F1 score.
#[derive(Debug, Clone)]
pub struct CommandScorer {
    program: String,
    args: Vec<String>,
}

impl CommandScorer {
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| RippleError::Config("scorer command must not be empty".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl Scorer for CommandScorer {
    async fn score(&self, request: &ScoreRequest) -> Result<f64> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--balanced")
            .arg(&request.balanced_features)
            .arg("--imbalanced")
            .arg(&request.imbalanced_features)
            .arg("--features")
            .arg(request.columns())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| RippleError::Scoring(format!("Failed to start {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RippleError::Scoring(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(program = %self.program, features = %request.columns(), "Scorer finished");
        parse_score(&stdout)
    }
}

/// F1 score from the last non-empty line of scorer output.
pub fn parse_score(stdout: &str) -> Result<f64> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| RippleError::Scoring("scorer printed nothing".to_string()))?;

    let score: f64 = line
        .parse()
        .map_err(|_| RippleError::Scoring(format!("expected an F1 score, got {line:?}")))?;
    if !(0.0..=1.0).contains(&score) {
        return Err(RippleError::Scoring(format!("F1 score out of range: {score}")));
    }
    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_common::FeatureKind;

    #[test]
    fn parses_last_non_empty_line() {
        assert_eq!(parse_score("training...\n0.82\n\n").unwrap(), 0.82);
        assert!(parse_score("").is_err());
        assert!(parse_score("done\n").is_err());
        assert!(parse_score("1.5\n").is_err());
    }

    #[test]
    fn request_columns_follow_canonical_order() {
        let request = ScoreRequest {
            balanced_features: PathBuf::from("b.csv"),
            imbalanced_features: PathBuf::from("i.csv"),
            features: FeatureSet::from_kinds(&[FeatureKind::Hub, FeatureKind::Nan]),
        };
        assert_eq!(request.columns(), "nan,hub");
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(CommandScorer::new(&[]).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_scorer_reads_stdout() {
        let scorer = CommandScorer::new(&[
            "sh".to_string(),
            "-c".to_string(),
            "echo fitting; echo 0.75".to_string(),
        ])
        .unwrap();
        let request = ScoreRequest {
            balanced_features: PathBuf::from("b.csv"),
            imbalanced_features: PathBuf::from("i.csv"),
            features: FeatureSet::all(),
        };
        assert_eq!(scorer.score(&request).await.unwrap(), 0.75);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_is_a_scoring_error() {
        let scorer = CommandScorer::new(&["false".to_string()]).unwrap();
        let request = ScoreRequest {
            balanced_features: PathBuf::from("b.csv"),
            imbalanced_features: PathBuf::from("i.csv"),
            features: FeatureSet::all(),
        };
        assert!(matches!(scorer.score(&request).await, Err(RippleError::Scoring(_))));
    }
}
