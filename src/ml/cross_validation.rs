//! Cross-validation utilities for model selection

use super::metrics::ConfusionMatrix;
use crate::data::Dataset;
use crate::error::{RiskError, RiskResult};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cross-validation split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Metric used to score held-out folds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    #[default]
    Accuracy,
    F1Macro,
}

impl Scoring {
    pub fn score(&self, cm: &ConfusionMatrix) -> f64 {
        match self {
            Scoring::Accuracy => cm.accuracy(),
            Scoring::F1Macro => cm.macro_f1(),
        }
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scoring::Accuracy => write!(f, "accuracy"),
            Scoring::F1Macro => write!(f, "f1_macro"),
        }
    }
}

impl FromStr for Scoring {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "accuracy" => Ok(Scoring::Accuracy),
            "f1_macro" | "f1" => Ok(Scoring::F1Macro),
            other => Err(format!("unknown scoring metric: {}", other)),
        }
    }
}

/// Cross-validator
pub struct CrossValidator;

impl CrossValidator {
    /// K-Fold cross-validation splits
    ///
    /// Indices are shuffled with `seed`, then cut into `n_folds` contiguous
    /// folds; the last fold absorbs the remainder.
    pub fn k_fold(n_samples: usize, n_folds: usize, seed: u64) -> RiskResult<Vec<CVSplit>> {
        if n_folds < 2 {
            return Err(RiskError::InvalidConfig(format!(
                "n_folds must be >= 2, got {}",
                n_folds
            )));
        }
        if n_samples < n_folds {
            return Err(RiskError::InvalidConfig(format!(
                "cannot make {} folds from {} samples",
                n_folds, n_samples
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let fold_size = n_samples / n_folds;
        let mut splits = Vec::with_capacity(n_folds);

        for i in 0..n_folds {
            let test_start = i * fold_size;
            let test_end = if i == n_folds - 1 {
                n_samples
            } else {
                (i + 1) * fold_size
            };

            let test_indices: Vec<usize> = indices[test_start..test_end].to_vec();
            let train_indices: Vec<usize> = indices[..test_start]
                .iter()
                .chain(indices[test_end..].iter())
                .cloned()
                .collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
            });
        }

        Ok(splits)
    }

    /// Cross-validation score with a custom fit-and-score function
    pub fn cross_val_score<F>(dataset: &Dataset, splits: &[CVSplit], scorer: F) -> RiskResult<Vec<f64>>
    where
        F: Fn(&Dataset, &Dataset) -> RiskResult<f64>,
    {
        splits
            .iter()
            .map(|split| {
                let train = dataset.subset(&split.train_indices);
                let test = dataset.subset(&split.test_indices);
                scorer(&train, &test)
            })
            .collect()
    }
}

/// Summary statistics for cross-validation scores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVScores {
    pub scores: Vec<f64>,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl CVScores {
    /// Calculate summary statistics from scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        if scores.is_empty() {
            return Self {
                scores,
                mean: 0.0,
                std: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }

        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        Self {
            scores,
            mean,
            std,
            min,
            max,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "CV Scores: mean={:.4} (+/- {:.4}), min={:.4}, max={:.4}",
            self.mean, self.std, self.min, self.max
        )
    }
}
