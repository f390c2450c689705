use std::path::{Path, PathBuf};

use serde::Deserialize;
use typed_builder::TypedBuilder;

use crate::error::{Result, RippleError};
use crate::features::{FeatureSet, HubRule};
use crate::types::InfluenceWindows;

// ---------------------------------------------------------------------------
// RunSettings
// ---------------------------------------------------------------------------

/// Everything one sampling + feature run needs, passed explicitly into the
/// resolver, extractor and sampler.
#[derive(Debug, Clone, TypedBuilder)]
pub struct RunSettings {
    pub windows: InfluenceWindows,
    #[builder(default = FeatureSet::all())]
    pub features: FeatureSet,
    #[builder(default)]
    pub hub_rule: HubRule,
    #[builder(default = 500)]
    pub max_pairs: usize,
    #[builder(default = 42)]
    pub seed: u64,
    /// Distinct other threads that must show the leader posting before the
    /// follower before the leader counts as active.
    #[builder(default = 1)]
    pub min_cross_thread_hits: usize,
}

// ---------------------------------------------------------------------------
// FileConfig
// ---------------------------------------------------------------------------

/// TOML-backed experiment configuration.
/// Secrets (database URL) stay as env vars, see [`EnvConfig`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub forum: ForumConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
    pub windows: WindowsConfig,
    #[serde(default = "default_features")]
    pub features: FeatureSet,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub hubs: HubsConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub scorer: Option<ScorerConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForumConfig {
    pub id: i64,
    /// Posts must have strictly more characters than this.
    #[serde(default = "default_min_content_length")]
    pub min_content_length: i32,
    /// Minimum topic-relevance score of the post's thread (inclusive).
    #[serde(default = "default_min_topic_score")]
    pub min_topic_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Postgres,
    Csv,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    pub csv_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FiltersConfig {
    /// Each entry is one filter set (list of filter ids) to run.
    #[serde(default = "default_filter_sets")]
    pub sets: Vec<Vec<u8>>,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            sets: default_filter_sets(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowsConfig {
    pub t_sus_days: Vec<i64>,
    pub t_fos_days: Vec<i64>,
}

impl WindowsConfig {
    /// Cartesian product `t_sus_days × t_fos_days`, in declaration order.
    pub fn pairs(&self) -> Vec<(i64, i64)> {
        self.t_sus_days
            .iter()
            .flat_map(|sus| self.t_fos_days.iter().map(move |fos| (*sus, *fos)))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplingConfig {
    #[serde(default = "default_max_pairs")]
    pub max_pairs: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_min_cross_thread_hits")]
    pub min_cross_thread_hits: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            max_pairs: default_max_pairs(),
            seed: default_seed(),
            min_cross_thread_hits: default_min_cross_thread_hits(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HubsConfig {
    pub percentile: Option<f64>,
    pub min_out_degree: Option<usize>,
}

impl HubsConfig {
    pub fn hub_rule(&self) -> Result<HubRule> {
        match (self.percentile, self.min_out_degree) {
            (Some(_), Some(_)) => Err(RippleError::Config(
                "hubs: set either percentile or min_out_degree, not both".to_string(),
            )),
            (Some(p), None) => Ok(HubRule::Percentile(p)),
            (None, Some(n)) => Ok(HubRule::MinOutDegree(n)),
            (None, None) => Ok(HubRule::default()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScorerConfig {
    /// Program followed by its fixed arguments.
    pub command: Vec<String>,
}

fn default_features() -> FeatureSet {
    FeatureSet {
        nan: true,
        pne: true,
        hub: true,
        opt: false,
        clc: false,
    }
}

fn default_min_content_length() -> i32 {
    10
}

fn default_min_topic_score() -> f64 {
    0.5
}

fn default_filter_sets() -> Vec<Vec<u8>> {
    vec![Vec::new()]
}

fn default_max_pairs() -> usize {
    500
}

fn default_seed() -> u64 {
    42
}

fn default_min_cross_thread_hits() -> usize {
    1
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

impl FileConfig {
    /// Reject values the core cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.windows.t_sus_days.is_empty() || self.windows.t_fos_days.is_empty() {
            return Err(RippleError::Config(
                "windows: t_sus_days and t_fos_days must each list at least one value".to_string(),
            ));
        }
        if let Some(d) = self
            .windows
            .t_sus_days
            .iter()
            .chain(&self.windows.t_fos_days)
            .find(|d| **d < 0)
        {
            return Err(RippleError::Config(format!(
                "windows: durations must be non-negative, got {d}"
            )));
        }
        for (t_sus, t_fos) in self.windows.pairs() {
            InfluenceWindows::try_from_days(t_sus, t_fos)?;
        }
        if let HubRule::Percentile(p) = self.hubs.hub_rule()? {
            if !(0.0..=1.0).contains(&p) {
                return Err(RippleError::Config(format!(
                    "hubs: percentile must be within [0, 1], got {p}"
                )));
            }
        }
        if self.features.is_empty() {
            return Err(RippleError::Config(
                "features: enable at least one of nan, pne, hub, opt, clc".to_string(),
            ));
        }
        if self.sampling.min_cross_thread_hits == 0 {
            return Err(RippleError::Config(
                "sampling: min_cross_thread_hits must be at least 1".to_string(),
            ));
        }
        for set in &self.filters.sets {
            if let Some(id) = set.iter().find(|id| **id > 3) {
                return Err(RippleError::Config(format!("filters: unknown filter id {id}")));
            }
        }
        if self.source.kind == SourceKind::Csv && self.source.csv_path.is_none() {
            return Err(RippleError::Config(
                "source: kind = \"csv\" requires csv_path".to_string(),
            ));
        }
        if let Some(scorer) = &self.scorer {
            if scorer.command.is_empty() {
                return Err(RippleError::Config("scorer: command must not be empty".to_string()));
            }
        }
        Ok(())
    }

    /// Settings for one window pair.
    pub fn run_settings(&self, t_sus_days: i64, t_fos_days: i64) -> Result<RunSettings> {
        Ok(RunSettings::builder()
            .windows(InfluenceWindows::try_from_days(t_sus_days, t_fos_days)?)
            .features(self.features)
            .hub_rule(self.hubs.hub_rule()?)
            .max_pairs(self.sampling.max_pairs)
            .seed(self.sampling.seed)
            .min_cross_thread_hits(self.sampling.min_cross_thread_hits)
            .build())
    }
}

/// Load, parse and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        RippleError::Config(format!("Failed to read config file {}: {e}", path.display()))
    })?;
    let config = parse_config(&content).map_err(|e| match e {
        RippleError::Config(msg) => {
            RippleError::Config(format!("{} ({})", msg, path.display()))
        }
        other => other,
    })?;
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(content)
        .map_err(|e| RippleError::Config(format!("Failed to parse config: {e}")))?;
    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// EnvConfig
// ---------------------------------------------------------------------------

/// Secrets and environment-specific values.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub database_url: Option<String>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL").ok(),
        };
        config.log_keys();
        config
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url.as_deref().ok_or_else(|| {
            RippleError::Config("DATABASE_URL environment variable is required".to_string())
        })
    }

    fn log_keys(&self) {
        tracing::info!("Env config loaded:");
        tracing::info!("  DATABASE_URL: {}", preview_opt(&self.database_url));
    }
}

fn preview_opt(val: &Option<String>) -> String {
    match val {
        Some(v) if !v.is_empty() => {
            let head: String = v.chars().take(5).collect();
            format!("{}...({} chars)", head, v.chars().count())
        }
        _ => "<not set>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [forum]
        id = 2

        [windows]
        t_sus_days = [7, 14]
        t_fos_days = [30]
    "#;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.forum.id, 2);
        assert_eq!(config.forum.min_content_length, 10);
        assert!((config.forum.min_topic_score - 0.5).abs() < 1e-12);
        assert_eq!(config.source.kind, SourceKind::Postgres);
        assert_eq!(config.filters.sets, vec![Vec::<u8>::new()]);
        assert_eq!(config.sampling.max_pairs, 500);
        assert_eq!(config.sampling.seed, 42);
        assert_eq!(config.sampling.min_cross_thread_hits, 1);
        assert_eq!(config.hubs.hub_rule().unwrap(), HubRule::Percentile(0.1));
        assert_eq!(config.features.label(), "NAN+PNE+HUB");
        assert!(config.scorer.is_none());
    }

    #[test]
    fn window_pairs_are_cartesian() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.windows.pairs(), vec![(7, 30), (14, 30)]);
    }

    #[test]
    fn run_settings_carry_days_as_durations() {
        let config = parse_config(MINIMAL).unwrap();
        let settings = config.run_settings(7, 30).unwrap();
        assert_eq!(settings.windows, InfluenceWindows::from_days(7, 30));
        assert_eq!(settings.max_pairs, 500);
    }

    #[test]
    fn out_of_range_window_is_rejected() {
        let toml = MINIMAL.replace("t_sus_days = [7, 14]", "t_sus_days = [7, 200000000000000]");
        assert!(matches!(parse_config(&toml), Err(RippleError::Config(_))));

        let config = parse_config(MINIMAL).unwrap();
        assert!(matches!(
            config.run_settings(200_000_000_000_000, 7),
            Err(RippleError::Config(_))
        ));
    }

    #[test]
    fn secret_preview_respects_char_boundaries() {
        assert_eq!(preview_opt(&None), "<not set>");
        assert_eq!(
            preview_opt(&Some("postgres://u@h/db".to_string())),
            "postg...(17 chars)"
        );
        assert_eq!(preview_opt(&Some("abcdéfg".to_string())), "abcdé...(7 chars)");
    }

    #[test]
    fn unknown_filter_id_is_rejected() {
        let toml = format!("{MINIMAL}\n[filters]\nsets = [[0, 9]]\n");
        assert!(matches!(parse_config(&toml), Err(RippleError::Config(_))));
    }

    #[test]
    fn both_hub_rules_are_rejected() {
        let toml = format!("{MINIMAL}\n[hubs]\npercentile = 0.2\nmin_out_degree = 50\n");
        assert!(parse_config(&toml).is_err());
    }

    #[test]
    fn empty_feature_set_is_rejected() {
        let toml = format!(
            "{MINIMAL}\n[features]\nnan = false\npne = false\nhub = false\n"
        );
        assert!(parse_config(&toml).is_err());
    }

    #[test]
    fn csv_source_requires_path() {
        let toml = format!("{MINIMAL}\n[source]\nkind = \"csv\"\n");
        assert!(parse_config(&toml).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml = format!("{MINIMAL}\n[sampling]\nmax_pair = 3\n");
        assert!(parse_config(&toml).is_err());
    }

    #[test]
    fn load_config_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ripple.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.windows.t_sus_days, vec![7, 14]);
    }
}
