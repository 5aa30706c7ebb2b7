//! # Stampede Risk - Crowd Safety Classification
//!
//! This library classifies CCTV crowd snapshots into a stampede risk level
//! (`Low`, `Medium`, `High`) with either a rule-based scorer or tree-ensemble
//! models selected by cross-validation.
//!
//! ## Modules
//!
//! - `data` - Records, CSV loading/saving, splitting and synthetic data
//! - `scorer` - Additive threshold scorer
//! - `evaluation` - Accuracy, confusion matrix and sample predictions
//! - `preprocess` - Imputation, scaling and one-hot encoding
//! - `models` - Decision Tree, Random Forest and Gradient Boosting
//! - `ml` - Classification metrics and cross-validation
//! - `pipeline` - Demo and training runs
//! - `report` - Text and JSON rendering of run reports
//! - `config` - TOML configuration

pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod ml;
pub mod models;
pub mod pipeline;
pub mod preprocess;
pub mod report;
pub mod scorer;

pub use config::Config;
pub use data::{Dataset, Record, RiskLevel};
pub use error::{RiskError, RiskResult};
pub use evaluation::{Evaluator, RiskPredictor};
pub use scorer::RiskScorer;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::data::{DataGenerator, Dataset, GeneratorConfig, MalformedPolicy, Record, RiskLevel, Split};
    pub use crate::error::{RiskError, RiskResult};
    pub use crate::evaluation::{Evaluation, Evaluator, RiskPredictor};
    pub use crate::ml::{ClassificationReport, ConfusionMatrix, Scoring};
    pub use crate::models::{Classifier, GradientBoosting, ModelKind, ModelSpec, RandomForest};
    pub use crate::pipeline::{run_demo, run_training, DemoConfig, FittedPipeline, TrainingConfig};
    pub use crate::preprocess::{ImputeStrategy, PreprocessConfig};
    pub use crate::scorer::{RiskScorer, ScoreThresholds};
}
