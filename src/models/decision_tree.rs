//! Decision Tree implementation

use ndarray::{Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Decision tree configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Maximum depth of tree
    pub max_depth: usize,
    /// Minimum samples required to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf node
    pub min_samples_leaf: usize,
    /// Maximum features to consider for split (None = all)
    pub max_features: Option<usize>,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Regression on continuous targets or classification on class indices
    pub task: TaskType,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    #[default]
    Regression,
    /// Targets are class indices `0..n_classes`
    Classification { n_classes: usize },
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: None,
            seed: 42,
            task: TaskType::Regression,
        }
    }
}

/// Tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    /// Feature index for split
    pub feature_idx: Option<usize>,
    /// Threshold for split
    pub threshold: Option<f64>,
    /// Prediction value: mean target, or majority class index
    pub value: f64,
    /// Class probabilities (for classification)
    pub class_probs: Option<Vec<f64>>,
    /// Number of samples in this node
    pub n_samples: usize,
    pub left: Option<Box<TreeNode>>,
    pub right: Option<Box<TreeNode>>,
    /// Impurity at this node
    pub impurity: f64,
}

impl TreeNode {
    fn leaf(value: f64, n_samples: usize, impurity: f64) -> Self {
        Self {
            feature_idx: None,
            threshold: None,
            value,
            class_probs: None,
            n_samples,
            left: None,
            right: None,
            impurity,
        }
    }

    fn leaf_classification(class_probs: Vec<f64>, n_samples: usize, impurity: f64) -> Self {
        Self {
            value: argmax(&class_probs) as f64,
            class_probs: Some(class_probs),
            ..Self::leaf(0.0, n_samples, impurity)
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    pub fn depth(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            1 + self
                .left
                .as_ref()
                .map(|n| n.depth())
                .unwrap_or(0)
                .max(self.right.as_ref().map(|n| n.depth()).unwrap_or(0))
        }
    }

    pub fn n_leaves(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.left.as_ref().map(|n| n.n_leaves()).unwrap_or(0)
                + self.right.as_ref().map(|n| n.n_leaves()).unwrap_or(0)
        }
    }

    /// Leaf reached by `features`
    fn find_leaf(&self, features: ArrayView1<f64>) -> &TreeNode {
        let mut node = self;
        while let (Some(idx), Some(threshold), Some(left), Some(right)) =
            (node.feature_idx, node.threshold, &node.left, &node.right)
        {
            node = if features[idx] <= threshold { &**left } else { &**right };
        }
        node
    }
}

/// Candidate split found while growing
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    left: Vec<usize>,
    right: Vec<usize>,
    importance: f64,
}

/// Decision Tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    config: TreeConfig,
    root: Option<TreeNode>,
    feature_importances: Vec<f64>,
}

impl DecisionTree {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            root: None,
            feature_importances: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn default_regression() -> Self {
        Self::new(TreeConfig {
            task: TaskType::Regression,
            ..Default::default()
        })
    }

    #[cfg(test)]
    pub fn default_classification(n_classes: usize) -> Self {
        Self::new(TreeConfig {
            task: TaskType::Classification { n_classes },
            ..Default::default()
        })
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Train on all rows of `x`
    pub fn fit(&mut self, x: &Array2<f64>, y: &[f64]) {
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.fit_indices(x, y, &indices);
    }

    /// Train on the given rows of `x`; indices may repeat (bootstrap samples)
    pub fn fit_indices(&mut self, x: &Array2<f64>, y: &[f64], indices: &[usize]) {
        assert_eq!(x.nrows(), y.len(), "Features and targets must have same length");

        self.feature_importances = vec![0.0; x.ncols()];
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);

        self.root = Some(self.build_tree(x, y, indices, 0, &mut rng));

        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }
    }

    fn build_tree(
        &mut self,
        x: &Array2<f64>,
        y: &[f64],
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n = indices.len();
        let labels: Vec<f64> = indices.iter().map(|&i| y[i]).collect();
        let impurity = self.impurity(&labels);

        if depth >= self.config.max_depth || n < self.config.min_samples_split || impurity < 1e-10 {
            return self.create_leaf(&labels, impurity);
        }

        match self.find_best_split(x, y, indices, impurity, rng) {
            Some(split) => {
                if split.left.len() < self.config.min_samples_leaf
                    || split.right.len() < self.config.min_samples_leaf
                {
                    return self.create_leaf(&labels, impurity);
                }

                self.feature_importances[split.feature_idx] += split.importance;

                let left = self.build_tree(x, y, &split.left, depth + 1, rng);
                let right = self.build_tree(x, y, &split.right, depth + 1, rng);

                TreeNode {
                    feature_idx: Some(split.feature_idx),
                    threshold: Some(split.threshold),
                    value: mean(&labels),
                    class_probs: None,
                    n_samples: n,
                    left: Some(Box::new(left)),
                    right: Some(Box::new(right)),
                    impurity,
                }
            }
            None => self.create_leaf(&labels, impurity),
        }
    }

    fn create_leaf(&self, labels: &[f64], impurity: f64) -> TreeNode {
        match self.config.task {
            TaskType::Regression => TreeNode::leaf(mean(labels), labels.len(), impurity),
            TaskType::Classification { n_classes } => {
                let probs = class_probabilities(labels, n_classes);
                TreeNode::leaf_classification(probs, labels.len(), impurity)
            }
        }
    }

    fn impurity(&self, labels: &[f64]) -> f64 {
        match self.config.task {
            TaskType::Regression => mse(labels),
            TaskType::Classification { n_classes } => gini(labels, n_classes),
        }
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &[f64],
        indices: &[usize],
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let n_features = x.ncols();
        let max_features = self.config.max_features.unwrap_or(n_features).clamp(1, n_features.max(1));

        let mut feature_indices: Vec<usize> = (0..n_features).collect();
        feature_indices.shuffle(rng);
        feature_indices.truncate(max_features);

        let mut best_gain = 0.0;
        let mut best_split: Option<SplitCandidate> = None;

        for &feature_idx in &feature_indices {
            let mut values: Vec<f64> = indices.iter().map(|&i| x[[i, feature_idx]]).collect();
            values.sort_by(|a, b| a.total_cmp(b));
            values.dedup();

            // Try midpoints as thresholds
            for window in values.windows(2) {
                let threshold = (window[0] + window[1]) / 2.0;

                let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| x[[i, feature_idx]] <= threshold);

                if left_idx.is_empty() || right_idx.is_empty() {
                    continue;
                }

                let left_labels: Vec<f64> = left_idx.iter().map(|&i| y[i]).collect();
                let right_labels: Vec<f64> = right_idx.iter().map(|&i| y[i]).collect();

                let n_left = left_idx.len() as f64;
                let n_right = right_idx.len() as f64;
                let weighted_impurity = (n_left * self.impurity(&left_labels)
                    + n_right * self.impurity(&right_labels))
                    / (n_left + n_right);
                let gain = parent_impurity - weighted_impurity;

                if gain > best_gain {
                    best_gain = gain;
                    best_split = Some(SplitCandidate {
                        feature_idx,
                        threshold,
                        left: left_idx,
                        right: right_idx,
                        importance: gain * indices.len() as f64,
                    });
                }
            }
        }

        best_split
    }

    /// Predict for a single sample: leaf mean, or majority class index
    pub fn predict_one(&self, features: ArrayView1<f64>) -> f64 {
        match &self.root {
            Some(node) => node.find_leaf(features).value,
            None => 0.0,
        }
    }

    /// Class probabilities for a single sample (classification trees)
    pub fn predict_proba_one(&self, features: ArrayView1<f64>) -> Vec<f64> {
        let n_classes = match self.config.task {
            TaskType::Classification { n_classes } => n_classes,
            TaskType::Regression => 0,
        };

        self.root
            .as_ref()
            .and_then(|node| node.find_leaf(features).class_probs.clone())
            .unwrap_or_else(|| vec![1.0 / n_classes.max(1) as f64; n_classes])
    }

    /// Predict for every row of `x`
    pub fn predict(&self, x: &Array2<f64>) -> Vec<f64> {
        x.rows().into_iter().map(|row| self.predict_one(row)).collect()
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Node levels including the root, 0 for an unfitted tree
    pub fn depth(&self) -> usize {
        self.root.as_ref().map(|n| n.depth()).unwrap_or(0)
    }

    pub fn n_leaves(&self) -> usize {
        self.root.as_ref().map(|n| n.n_leaves()).unwrap_or(0)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn mse(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean(values);
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

fn class_probabilities(values: &[f64], n_classes: usize) -> Vec<f64> {
    let mut counts = vec![0.0; n_classes];
    for &v in values {
        let class = v as usize;
        if class < n_classes {
            counts[class] += 1.0;
        }
    }
    let n = values.len().max(1) as f64;
    counts.iter().map(|c| c / n).collect()
}

fn gini(values: &[f64], n_classes: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    1.0 - class_probabilities(values, n_classes)
        .iter()
        .map(|p| p * p)
        .sum::<f64>()
}

/// Index of the largest value; ties go to the lowest index
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Array2<f64> {
        Array2::from_shape_fn((n, 1), |(i, _)| i as f64 / 10.0)
    }

    #[test]
    fn test_decision_tree_regression() {
        let x = line(100);
        let y: Vec<f64> = (0..100).map(|i| 2.0 * (i as f64 / 10.0) + 1.0).collect();

        let mut tree = DecisionTree::default_regression();
        tree.fit(&x, &y);

        let predictions = tree.predict(&x);
        let mse: f64 = predictions
            .iter()
            .zip(y.iter())
            .map(|(p, t)| (p - t).powi(2))
            .sum::<f64>()
            / y.len() as f64;
        assert!(mse < 0.5);
    }

    #[test]
    fn test_decision_tree_multiclass() {
        let x = line(90);
        // Three bands: [0, 3) -> 0, [3, 6) -> 1, [6, 9) -> 2
        let y: Vec<f64> = (0..90).map(|i| (i / 30) as f64).collect();

        let mut tree = DecisionTree::default_classification(3);
        tree.fit(&x, &y);

        let correct = tree
            .predict(&x)
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| p == t)
            .count();
        assert_eq!(correct, 90);

        let probs = tree.predict_proba_one(x.row(75));
        assert_eq!(probs.len(), 3);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-10);
        assert_eq!(argmax(&probs), 2);
    }

    #[test]
    fn test_feature_importance_prefers_informative_feature() {
        // Column 0 decides the class, column 1 is constant noise
        let x = Array2::from_shape_fn((60, 2), |(i, j)| if j == 0 { i as f64 } else { 1.0 });
        let y: Vec<f64> = (0..60).map(|i| if i < 30 { 0.0 } else { 1.0 }).collect();

        let mut tree = DecisionTree::default_classification(2);
        tree.fit(&x, &y);

        assert!((tree.feature_importances()[0] - 1.0).abs() < 1e-10);
        assert_eq!(tree.feature_importances()[1], 0.0);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.n_leaves(), 2);
    }

    #[test]
    fn test_gini_and_argmax() {
        assert_eq!(gini(&[0.0, 0.0], 3), 0.0);
        assert!((gini(&[0.0, 1.0, 2.0], 3) - 2.0 / 3.0).abs() < 1e-10);
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), 1);
    }
}
