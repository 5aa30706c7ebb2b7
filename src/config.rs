//! Configuration loading and management.

use crate::data::{GeneratorConfig, MalformedPolicy};
use crate::error::RiskError;
use crate::pipeline::{DemoConfig, TrainingConfig};
use crate::scorer::ScoreThresholds;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default data file, relative to the working directory
pub const DEFAULT_DATA_PATH: &str = "cctv_data.csv";

/// Default configuration file looked up by the binaries
pub const DEFAULT_CONFIG_PATH: &str = "stampede.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data file configuration.
    pub data: DataConfig,
    /// Rule-based scorer thresholds.
    pub scorer: ScoreThresholds,
    /// Demo run settings.
    pub demo: DemoConfig,
    /// Model-selection settings.
    pub training: TrainingConfig,
    /// Synthetic data settings.
    pub generator: GeneratorConfig,
}

/// Data file configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV file with CCTV records.
    pub path: PathBuf,
    /// How rows that fail to parse are handled.
    pub on_malformed: MalformedPolicy,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATA_PATH),
            on_malformed: MalformedPolicy::default(),
        }
    }
}

impl Config {
    /// Create a new configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config = toml::from_str(&content)
            .map_err(RiskError::from)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from file, or defaults when the file is absent.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Config::from_file(path)
        } else {
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::Scoring;
    use crate::models::ModelKind;
    use crate::preprocess::ImputeStrategy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data.path, PathBuf::from("cctv_data.csv"));
        assert_eq!(config.data.on_malformed, MalformedPolicy::Fail);
        assert_eq!(config.scorer.people_high, 400);
        assert_eq!(config.training.folds, 5);
        assert_eq!(config.training.seed, 42);
        assert_eq!(config.training.candidates.len(), 3);
        assert_eq!(config.demo.sample_size, 5);
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[data]
path = "feeds/night.csv"
on_malformed = "skip"

[scorer]
people_high = 350

[training]
folds = 3
scoring = "f1_macro"

[training.preprocess]
impute = "median"
scale = true

[[training.candidates]]
name = "Forest"
kind = "random_forest"
n_trees = 25

[[training.candidates]]
name = "Tree"
kind = "decision_tree"
max_depth = 4
        "#
        )
        .unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();
        assert_eq!(config.data.path, PathBuf::from("feeds/night.csv"));
        assert_eq!(config.data.on_malformed, MalformedPolicy::Skip);
        assert_eq!(config.scorer.people_high, 350);
        assert_eq!(config.scorer.people_medium, 250);
        assert_eq!(config.training.folds, 3);
        assert_eq!(config.training.scoring, Scoring::F1Macro);
        assert_eq!(config.training.preprocess.impute, ImputeStrategy::Median);
        assert!(config.training.preprocess.scale);

        let candidates = &config.training.candidates;
        assert_eq!(candidates.len(), 2);
        match &candidates[0].model {
            ModelKind::RandomForest(forest) => {
                assert_eq!(forest.n_trees, 25);
                assert_eq!(forest.seed, 42);
            }
            other => panic!("unexpected model {:?}", other),
        }
        match &candidates[1].model {
            ModelKind::DecisionTree(tree) => assert_eq!(tree.max_depth, 4),
            other => panic!("unexpected model {:?}", other),
        }
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stampede.toml");

        let mut config = Config::default();
        config.demo.seed = Some(9);
        config.training.scoring = Scoring::F1Macro;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.demo, config.demo);
        assert_eq!(loaded.training.scoring, Scoring::F1Macro);
        assert_eq!(loaded.training.candidates.len(), 3);
        assert_eq!(loaded.training.candidates[2].name, "SubsampledBoosting");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.training.folds, 5);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[training]\nfolds = \"many\"").unwrap();
        let err = Config::from_file(temp_file.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RiskError>(),
            Some(RiskError::Toml(_))
        ));
    }
}
