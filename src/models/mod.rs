//! Machine learning models module
//!
//! Provides tree-based classifiers over the three risk levels:
//! - Decision Tree (CART)
//! - Random Forest (bagged trees, parallel fitting)
//! - Gradient Boosting (multiclass softmax boosting of regression trees)

mod decision_tree;
mod gbm;
mod random_forest;

pub use decision_tree::{DecisionTree, TaskType, TreeConfig, TreeNode};
pub use gbm::{GbmParams, GradientBoosting};
pub use random_forest::{ForestConfig, RandomForest};

use crate::data::RiskLevel;
use crate::error::{RiskError, RiskResult};
use decision_tree::argmax;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::debug;
use std::fmt;

/// A trainable classifier over risk levels
pub trait Classifier: fmt::Debug {
    /// Train on a design matrix and its labels
    fn fit(&mut self, x: &Array2<f64>, y: &[RiskLevel]) -> RiskResult<()>;

    /// Class probabilities in [`RiskLevel::ALL`] order
    fn predict_proba_one(&self, row: ArrayView1<f64>) -> Vec<f64>;

    /// Most probable class; ties go to the lower risk level
    fn predict_one(&self, row: ArrayView1<f64>) -> RiskLevel {
        let probs = self.predict_proba_one(row);
        RiskLevel::from_index(argmax(&probs)).unwrap_or(RiskLevel::Low)
    }

    fn predict(&self, x: &Array2<f64>) -> Vec<RiskLevel> {
        x.rows().into_iter().map(|row| self.predict_one(row)).collect()
    }

    /// Normalised feature importances, one per design-matrix column
    fn feature_importances(&self) -> Vec<f64>;
}

/// Check shapes shared by every classifier
pub(crate) fn validate_training_data(x: &Array2<f64>, y: &[RiskLevel]) -> RiskResult<()> {
    if x.nrows() == 0 {
        return Err(RiskError::Training("empty training set".to_string()));
    }
    if x.nrows() != y.len() {
        return Err(RiskError::Training(format!(
            "{} feature rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }
    Ok(())
}

/// Labels as class-index targets for the trees
pub(crate) fn class_targets(y: &[RiskLevel]) -> Vec<f64> {
    y.iter().map(|l| l.index() as f64).collect()
}

impl Classifier for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &[RiskLevel]) -> RiskResult<()> {
        validate_training_data(x, y)?;
        let config = TreeConfig {
            task: TaskType::Classification {
                n_classes: RiskLevel::COUNT,
            },
            ..self.config().clone()
        };
        *self = DecisionTree::new(config);
        DecisionTree::fit(self, x, &class_targets(y));
        debug!(
            "Decision tree fitted: depth {}, {} leaves",
            self.depth(),
            self.n_leaves()
        );
        Ok(())
    }

    fn predict_proba_one(&self, row: ArrayView1<f64>) -> Vec<f64> {
        DecisionTree::predict_proba_one(self, row)
    }

    fn feature_importances(&self) -> Vec<f64> {
        DecisionTree::feature_importances(self).to_vec()
    }
}

/// Model family and its hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelKind {
    GradientBoosting(GbmParams),
    RandomForest(ForestConfig),
    DecisionTree(TreeConfig),
}

/// A named training candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    #[serde(flatten)]
    pub model: ModelKind,
}

impl ModelSpec {
    pub fn new(name: &str, model: ModelKind) -> Self {
        Self {
            name: name.to_string(),
            model,
        }
    }

    /// Fresh, untrained classifier for this candidate
    pub fn build(&self) -> Box<dyn Classifier> {
        match &self.model {
            ModelKind::GradientBoosting(params) => Box::new(GradientBoosting::new(params.clone())),
            ModelKind::RandomForest(config) => Box::new(RandomForest::new(config.clone())),
            ModelKind::DecisionTree(config) => Box::new(DecisionTree::new(config.clone())),
        }
    }

    /// Candidates compared by the training pipeline when none are configured
    pub fn default_candidates() -> Vec<ModelSpec> {
        vec![
            ModelSpec::new(
                "GradientBoosting",
                ModelKind::GradientBoosting(GbmParams::default()),
            ),
            ModelSpec::new("RandomForest", ModelKind::RandomForest(ForestConfig::default())),
            ModelSpec::new(
                "SubsampledBoosting",
                ModelKind::GradientBoosting(GbmParams {
                    n_estimators: 150,
                    max_depth: 2,
                    learning_rate: 0.05,
                    subsample: 0.8,
                    ..Default::default()
                }),
            ),
        ]
    }
}
