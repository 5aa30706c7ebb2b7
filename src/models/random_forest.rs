//! Random Forest implementation

use super::decision_tree::{argmax, DecisionTree, TaskType, TreeConfig};
use super::{class_targets, validate_training_data, Classifier};
use crate::data::RiskLevel;
use crate::error::RiskResult;
use ndarray::{Array2, ArrayView1};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Random Forest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Max features per split (sqrt of total if None)
    pub max_features: Option<usize>,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random seed
    pub seed: u64,
    /// Out-of-bag score calculation
    pub oob_score: bool,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
            oob_score: false,
        }
    }
}

/// Random Forest classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
    feature_importances: Vec<f64>,
    oob_score_value: Option<f64>,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            feature_importances: Vec::new(),
            oob_score_value: None,
        }
    }

    /// Number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Out-of-bag accuracy, when enabled
    pub fn oob_score(&self) -> Option<f64> {
        self.oob_score_value
    }

    fn bootstrap_indices(&self, n: usize, tree_idx: usize) -> Vec<usize> {
        if !self.config.bootstrap {
            return (0..n).collect();
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed.wrapping_add(tree_idx as u64));
        (0..n).map(|_| rng.gen_range(0..n)).collect()
    }

    /// Majority vote fractions of `trees` for one row
    fn vote(trees: &[DecisionTree], row: ArrayView1<f64>) -> Vec<f64> {
        let mut votes = vec![0.0; RiskLevel::COUNT];
        for tree in trees {
            let class = tree.predict_one(row) as usize;
            if class < RiskLevel::COUNT {
                votes[class] += 1.0;
            }
        }
        let n = trees.len().max(1) as f64;
        votes.iter().map(|v| v / n).collect()
    }

    fn calculate_oob_score(&mut self, x: &Array2<f64>, y: &[RiskLevel]) {
        let n_samples = x.nrows();
        let mut correct = 0usize;
        let mut total = 0usize;

        let in_bag: Vec<Vec<bool>> = (0..self.trees.len())
            .map(|t| {
                let mut mask = vec![false; n_samples];
                for i in self.bootstrap_indices(n_samples, t) {
                    mask[i] = true;
                }
                mask
            })
            .collect();

        for i in 0..n_samples {
            let mut votes = vec![0.0; RiskLevel::COUNT];
            let mut n_votes = 0;
            for (tree, mask) in self.trees.iter().zip(in_bag.iter()) {
                if mask[i] {
                    continue;
                }
                let class = tree.predict_one(x.row(i)) as usize;
                if class < RiskLevel::COUNT {
                    votes[class] += 1.0;
                }
                n_votes += 1;
            }

            if n_votes == 0 {
                continue;
            }

            if argmax(&votes) == y[i].index() {
                correct += 1;
            }
            total += 1;
        }

        self.oob_score_value = if total > 0 {
            Some(correct as f64 / total as f64)
        } else {
            None
        };
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &[RiskLevel]) -> RiskResult<()> {
        validate_training_data(x, y)?;

        let n_features = x.ncols();
        let targets = class_targets(y);

        // Default: sqrt of the feature count for classification
        let max_features = self
            .config
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().ceil() as usize);

        let trees: Vec<DecisionTree> = (0..self.config.n_trees)
            .into_par_iter()
            .map(|i| {
                let tree_config = TreeConfig {
                    max_depth: self.config.max_depth,
                    min_samples_split: self.config.min_samples_split,
                    min_samples_leaf: self.config.min_samples_leaf,
                    max_features: Some(max_features),
                    seed: self.config.seed.wrapping_add(i as u64),
                    task: TaskType::Classification {
                        n_classes: RiskLevel::COUNT,
                    },
                };

                let mut tree = DecisionTree::new(tree_config);
                let indices = self.bootstrap_indices(x.nrows(), i);
                tree.fit_indices(x, &targets, &indices);
                tree
            })
            .collect();

        self.trees = trees;

        self.feature_importances = vec![0.0; n_features];
        for tree in &self.trees {
            for (i, &imp) in tree.feature_importances().iter().enumerate() {
                self.feature_importances[i] += imp;
            }
        }
        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }

        if self.config.oob_score && self.config.bootstrap {
            self.calculate_oob_score(x, y);
            debug!("Random forest OOB score: {:?}", self.oob_score_value);
        }

        Ok(())
    }

    fn predict_proba_one(&self, row: ArrayView1<f64>) -> Vec<f64> {
        if self.trees.is_empty() {
            return vec![1.0 / RiskLevel::COUNT as f64; RiskLevel::COUNT];
        }
        Self::vote(&self.trees, row)
    }

    fn predict(&self, x: &Array2<f64>) -> Vec<RiskLevel> {
        (0..x.nrows())
            .into_par_iter()
            .map(|i| self.predict_one(x.row(i)))
            .collect()
    }

    fn feature_importances(&self) -> Vec<f64> {
        self.feature_importances.clone()
    }
}
