//! Configuration system for glofbench.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from `~/.config/glofbench/config.toml` and/or `.glofbench/config.toml`
//! in the workspace directory.

use crate::error::BenchError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level benchmark configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BenchConfig {
    /// Input dataset configuration.
    #[serde(default)]
    pub data: DataConfig,
    /// Feature engineering configuration.
    #[serde(default)]
    pub features: FeatureConfig,
    /// Minority oversampling configuration.
    #[serde(default)]
    pub balance: BalanceConfig,
    /// Train/test split configuration.
    #[serde(default)]
    pub split: SplitConfig,
    /// Classifier evaluation configuration.
    #[serde(default)]
    pub evaluation: EvalConfig,
    /// Spreadsheet output configuration.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Input dataset configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    /// Path to the CSV dataset.
    #[serde(default = "default_input_path")]
    pub input_path: PathBuf,
    /// Field delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            delimiter: default_delimiter(),
        }
    }
}

fn default_input_path() -> PathBuf {
    PathBuf::from("sikkim_glof_filtered_data.csv")
}

fn default_delimiter() -> char {
    ','
}

/// Feature engineering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureConfig {
    /// `Flood_Occurrence` values strictly above this are labelled high risk.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

fn default_threshold() -> f64 {
    0.05
}

/// Minority oversampling configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BalanceConfig {
    /// Nearest neighbours considered when interpolating synthetic samples.
    #[serde(default = "default_k_neighbors")]
    pub k_neighbors: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            k_neighbors: default_k_neighbors(),
            seed: default_seed(),
        }
    }
}

fn default_k_neighbors() -> usize {
    5
}

fn default_seed() -> u64 {
    42
}

/// Train/test split configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplitConfig {
    /// Fraction of rows held out for testing.
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: default_test_size(),
            seed: default_seed(),
        }
    }
}

fn default_test_size() -> f64 {
    0.2
}

/// What the evaluator does when a single classifier fails to fit or predict.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the whole run on the first failure.
    Abort,
    /// Log the failure, record a row with empty metrics and continue.
    #[default]
    Skip,
}

/// Classifier evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalConfig {
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Fit classifiers concurrently on the blocking thread pool.
    #[serde(default)]
    pub parallel: bool,
    /// Seed handed to every randomized classifier.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            parallel: false,
            seed: default_seed(),
        }
    }
}

/// Spreadsheet output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportConfig {
    /// Destination workbook, overwritten on every run.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("Classifier_Comparison_Results.xlsx")
}

impl BenchConfig {
    /// Reject settings that would make a pipeline stage meaningless.
    pub fn validate(&self) -> Result<(), BenchError> {
        if !self.features.threshold.is_finite() {
            return Err(BenchError::Config(format!(
                "features.threshold must be finite, got {}",
                self.features.threshold
            )));
        }
        if self.balance.k_neighbors == 0 {
            return Err(BenchError::Config(
                "balance.k_neighbors must be at least 1".into(),
            ));
        }
        let test_size = self.split.test_size;
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(BenchError::Config(format!(
                "split.test_size must lie in (0, 1), got {test_size}"
            )));
        }
        Ok(())
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, BenchError> {
        toml::to_string_pretty(self).map_err(|e| BenchError::Config(e.to_string()))
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `GLOFBENCH_`)
/// 3. Explicit config file (`--config`)
/// 4. Workspace-local config (`.glofbench/config.toml`)
/// 5. User config (`~/.config/glofbench/config.toml`)
/// 6. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
    overrides: Option<&serde_json::Value>,
) -> Result<BenchConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(BenchConfig::default()));

    // User-level config
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "glofbench", "glofbench") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(".glofbench").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = config_file {
        if !path.exists() {
            return Err(Box::new(figment::Error::from(format!(
                "config file not found: {}",
                path.display()
            ))));
        }
        figment = figment.merge(Toml::file(path));
    }

    // Environment variables (GLOFBENCH_DATA__INPUT_PATH, GLOFBENCH_SPLIT__TEST_SIZE, etc.)
    figment = figment.merge(Env::prefixed("GLOFBENCH_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_run() {
        let config = BenchConfig::default();
        assert_eq!(config.features.threshold, 0.05);
        assert_eq!(config.balance.k_neighbors, 5);
        assert_eq!(config.balance.seed, 42);
        assert_eq!(config.split.test_size, 0.2);
        assert_eq!(config.evaluation.failure_policy, FailurePolicy::Skip);
        assert_eq!(
            config.report.output_path,
            PathBuf::from("Classifier_Comparison_Results.xlsx")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_test_size() {
        let mut config = BenchConfig::default();
        config.split.test_size = 1.0;
        assert!(matches!(config.validate(), Err(BenchError::Config(_))));
        config.split.test_size = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_neighbors() {
        let mut config = BenchConfig::default();
        config.balance.k_neighbors = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_workspace_config_file_is_merged() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg_dir = dir.path().join(".glofbench");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(
            cfg_dir.join("config.toml"),
            "[split]\ntest_size = 0.3\n\n[evaluation]\nfailure_policy = \"abort\"\n",
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None, None).unwrap();
        assert_eq!(config.split.test_size, 0.3);
        assert_eq!(config.split.seed, 42);
        assert_eq!(config.evaluation.failure_policy, FailurePolicy::Abort);
    }

    #[test]
    fn test_overrides_win() {
        let dir = tempfile::TempDir::new().unwrap();
        let overrides = serde_json::json!({ "report": { "output_path": "out.xlsx" } });

        let config = load_config(Some(dir.path()), None, Some(&overrides)).unwrap();
        assert_eq!(config.report.output_path, PathBuf::from("out.xlsx"));
    }

    #[test]
    fn test_missing_explicit_config_file_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config(Some(dir.path()), Some(&missing), None).is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = BenchConfig::default();
        let text = config.to_toml().unwrap();
        let parsed: BenchConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
