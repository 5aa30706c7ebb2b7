//! Gradient Boosting Machine implementation
//!
//! Multiclass boosting with a softmax link: every round fits one regression
//! tree per risk level to the negative gradient of the log-loss
//! (`y_ik - p_ik`) and adds its shrunken output to that class's score.

use super::decision_tree::{DecisionTree, TaskType, TreeConfig};
use super::{validate_training_data, Classifier};
use crate::data::RiskLevel;
use crate::error::{RiskError, RiskResult};
use ndarray::{Array2, ArrayView1};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Smallest class prior used for the initial scores
const MIN_PRIOR: f64 = 1e-6;

/// GBM hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GbmParams {
    /// Number of boosting iterations
    pub n_estimators: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples required in a leaf node
    pub min_samples_leaf: usize,
    /// Fraction of training rows drawn (without replacement) per round
    pub subsample: f64,
    /// Random seed for row subsampling
    pub seed: u64,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 3,
            learning_rate: 0.1,
            min_samples_split: 2,
            min_samples_leaf: 1,
            subsample: 1.0,
            seed: 42,
        }
    }
}

impl GbmParams {
    fn validate(&self) -> RiskResult<()> {
        if !(self.learning_rate > 0.0) {
            return Err(RiskError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(RiskError::InvalidConfig(format!(
                "subsample must be in (0, 1], got {}",
                self.subsample
            )));
        }
        Ok(())
    }
}

/// Gradient boosted trees over the three risk levels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    params: GbmParams,
    init_scores: Vec<f64>,
    /// One tree per class for every boosting round
    stages: Vec<Vec<DecisionTree>>,
    feature_importances: Vec<f64>,
    train_loss: Vec<f64>,
}

impl GradientBoosting {
    pub fn new(params: GbmParams) -> Self {
        Self {
            params,
            init_scores: vec![0.0; RiskLevel::COUNT],
            stages: Vec::new(),
            feature_importances: Vec::new(),
            train_loss: Vec::new(),
        }
    }

    pub fn params(&self) -> &GbmParams {
        &self.params
    }

    /// Number of fitted boosting rounds
    pub fn n_rounds(&self) -> usize {
        self.stages.len()
    }

    /// Training log-loss after each round
    pub fn train_loss(&self) -> &[f64] {
        &self.train_loss
    }

    fn tree_config(&self, round: usize, class: usize) -> TreeConfig {
        TreeConfig {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
            max_features: None,
            seed: self
                .params
                .seed
                .wrapping_add((round * RiskLevel::COUNT + class) as u64),
            task: TaskType::Regression,
        }
    }

    fn round_indices(&self, n: usize, round: usize) -> Vec<usize> {
        if self.params.subsample >= 1.0 {
            return (0..n).collect();
        }
        let size = ((self.params.subsample * n as f64).round() as usize).clamp(1, n);
        let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed.wrapping_add(round as u64));
        let mut indices = rand::seq::index::sample(&mut rng, n, size).into_vec();
        indices.sort_unstable();
        indices
    }

    fn raw_scores(&self, row: ArrayView1<f64>) -> Vec<f64> {
        let mut scores = self.init_scores.clone();
        for stage in &self.stages {
            for (score, tree) in scores.iter_mut().zip(stage) {
                *score += self.params.learning_rate * tree.predict_one(row);
            }
        }
        scores
    }
}

impl Classifier for GradientBoosting {
    fn fit(&mut self, x: &Array2<f64>, y: &[RiskLevel]) -> RiskResult<()> {
        validate_training_data(x, y)?;
        self.params.validate()?;

        let n = x.nrows();
        let k = RiskLevel::COUNT;

        info!(
            "Training gradient boosting: {} rounds, depth {}, lr {}, subsample {}",
            self.params.n_estimators,
            self.params.max_depth,
            self.params.learning_rate,
            self.params.subsample
        );

        let mut counts = vec![0usize; k];
        for level in y {
            counts[level.index()] += 1;
        }
        self.init_scores = counts
            .iter()
            .map(|&c| (c as f64 / n as f64).max(MIN_PRIOR).ln())
            .collect();

        let mut scores = Array2::from_shape_fn((n, k), |(_, c)| self.init_scores[c]);
        self.stages = Vec::with_capacity(self.params.n_estimators);
        self.feature_importances = vec![0.0; x.ncols()];
        self.train_loss = Vec::with_capacity(self.params.n_estimators);

        for round in 0..self.params.n_estimators {
            let probs: Vec<Vec<f64>> = scores.rows().into_iter().map(|r| softmax(&r.to_vec())).collect();
            let indices = self.round_indices(n, round);

            let mut stage = Vec::with_capacity(k);
            for class in 0..k {
                let residuals: Vec<f64> = (0..n)
                    .map(|i| {
                        let target = if y[i].index() == class { 1.0 } else { 0.0 };
                        target - probs[i][class]
                    })
                    .collect();

                let mut tree = DecisionTree::new(self.tree_config(round, class));
                tree.fit_indices(x, &residuals, &indices);

                for i in 0..n {
                    scores[[i, class]] += self.params.learning_rate * tree.predict_one(x.row(i));
                }
                for (total, imp) in self
                    .feature_importances
                    .iter_mut()
                    .zip(tree.feature_importances())
                {
                    *total += imp;
                }
                stage.push(tree);
            }
            self.stages.push(stage);

            let loss = log_loss(&scores, y);
            self.train_loss.push(loss);
            if (round + 1) % 25 == 0 {
                debug!("Boosting round {}: train log-loss {:.4}", round + 1, loss);
            }
        }

        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }

        Ok(())
    }

    fn predict_proba_one(&self, row: ArrayView1<f64>) -> Vec<f64> {
        softmax(&self.raw_scores(row))
    }

    fn feature_importances(&self) -> Vec<f64> {
        self.feature_importances.clone()
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

fn log_loss(scores: &Array2<f64>, y: &[RiskLevel]) -> f64 {
    let total: f64 = scores
        .rows()
        .into_iter()
        .zip(y)
        .map(|(row, level)| {
            let probs = softmax(&row.to_vec());
            -probs[level.index()].max(1e-15).ln()
        })
        .sum();
    total / y.len().max(1) as f64
}
