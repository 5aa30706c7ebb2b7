//! Model selection and evaluation utilities

pub mod cross_validation;
pub mod metrics;

pub use cross_validation::{CVScores, CVSplit, CrossValidator, Scoring};
pub use metrics::{AverageMetrics, ClassMetrics, ClassificationReport, ConfusionMatrix};
