//! Demo and training pipelines
//!
//! Both pipelines are plain functions returning serialisable reports:
//! - [`run_demo`] evaluates the rule-based scorer on a random hold-out split
//! - [`run_training`] cross-validates the configured candidates, refits the
//!   best one on the training partition and evaluates it on the test partition
//!
//! Rendering lives in [`crate::report`].

use crate::data::{Dataset, Record, RiskLevel};
use crate::error::{RiskError, RiskResult};
use crate::evaluation::{Evaluation, Evaluator, RiskPredictor};
use crate::ml::{CVScores, ClassificationReport, ConfusionMatrix, CrossValidator, Scoring};
use crate::models::{Classifier, ModelSpec};
use crate::preprocess::{PreprocessConfig, Preprocessor};
use crate::scorer::RiskScorer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Records shown in the demo ingestion summary
const PREVIEW_LEN: usize = 3;

/// Settings for the rule-based demo run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub train_ratio: f64,
    /// Shuffle seed; `None` shuffles from entropy
    pub seed: Option<u64>,
    /// Number of predictions listed in the report
    pub sample_size: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            train_ratio: 0.8,
            seed: None,
            sample_size: 5,
        }
    }
}

/// Settings for the model-selection run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub train_ratio: f64,
    /// Seed for the train/test split and the fold assignment
    pub seed: u64,
    pub folds: usize,
    pub scoring: Scoring,
    pub sample_size: usize,
    pub preprocess: PreprocessConfig,
    /// Compared in order; ties keep the earlier candidate
    pub candidates: Vec<ModelSpec>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            train_ratio: 0.8,
            seed: 42,
            folds: 5,
            scoring: Scoring::default(),
            sample_size: 5,
            preprocess: PreprocessConfig::default(),
            candidates: ModelSpec::default_candidates(),
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> RiskResult<()> {
        validate_ratio(self.train_ratio)?;
        if self.folds < 2 {
            return Err(RiskError::InvalidConfig(format!(
                "folds must be >= 2, got {}",
                self.folds
            )));
        }
        if self.candidates.is_empty() {
            return Err(RiskError::InvalidConfig(
                "at least one model candidate is required".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_ratio(ratio: f64) -> RiskResult<()> {
    if ratio > 0.0 && ratio < 1.0 {
        Ok(())
    } else {
        Err(RiskError::InvalidConfig(format!(
            "train_ratio must be in (0, 1), got {}",
            ratio
        )))
    }
}

/// Preprocessor plus classifier, fitted together on one partition
#[derive(Debug)]
pub struct FittedPipeline {
    name: String,
    preprocessor: Preprocessor,
    model: Box<dyn Classifier>,
}

impl FittedPipeline {
    /// Fit a fresh preprocessor and a fresh `spec` model on `train`
    pub fn fit(spec: &ModelSpec, preprocess: &PreprocessConfig, train: &Dataset) -> RiskResult<Self> {
        let mut preprocessor = Preprocessor::new(preprocess.clone());
        let x = preprocessor.fit_transform(train)?;

        let mut model = spec.build();
        model.fit(&x, &train.labels())?;

        Ok(Self {
            name: spec.name.clone(),
            preprocessor,
            model,
        })
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    /// Feature importances paired with encoded column names
    pub fn feature_importances(&self) -> Vec<(String, f64)> {
        self.preprocessor
            .feature_names()
            .into_iter()
            .zip(self.model.feature_importances())
            .collect()
    }

    /// Predict every record of `dataset`
    pub fn predict_batch(&self, dataset: &Dataset) -> RiskResult<Vec<RiskLevel>> {
        let x = self.preprocessor.transform(dataset)?;
        Ok(self.model.predict(&x))
    }
}

impl RiskPredictor for FittedPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, record: &Record) -> RiskResult<RiskLevel> {
        let row = self.preprocessor.transform_record(record)?;
        Ok(self.model.predict_one(row.view()))
    }
}

/// Cross-validation outcome for one candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub name: String,
    pub cv: CVScores,
}

/// Index of the highest mean CV score; the first candidate wins ties
pub fn select_best(results: &[CandidateResult]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, result) in results.iter().enumerate() {
        match best {
            Some(b) if result.cv.mean <= results[b].cv.mean => {}
            _ => best = Some(i),
        }
    }
    best
}

/// K-fold cross-validation of one candidate on `train`
pub fn cross_validate(spec: &ModelSpec, config: &TrainingConfig, train: &Dataset) -> RiskResult<CVScores> {
    let splits = CrossValidator::k_fold(train.len(), config.folds, config.seed)?;

    let scores = CrossValidator::cross_val_score(train, &splits, |fold_train, fold_test| {
        let pipeline = FittedPipeline::fit(spec, &config.preprocess, fold_train)?;
        let predictions = pipeline.predict_batch(fold_test)?;
        let cm = ConfusionMatrix::from_labels(&fold_test.labels(), &predictions);
        let score = config.scoring.score(&cm);
        debug!(
            "{} fold: train={} test={} {}={:.4}",
            spec.name,
            fold_train.len(),
            fold_test.len(),
            config.scoring,
            score
        );
        Ok(score)
    })?;

    Ok(CVScores::from_scores(scores))
}

/// Result of the model-selection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub generated_at: DateTime<Utc>,
    pub dataset_size: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub candidates: Vec<CandidateResult>,
    pub best_model: String,
    pub evaluation: Evaluation,
    pub classification_report: ClassificationReport,
    pub feature_importances: Vec<(String, f64)>,
    pub config: TrainingConfig,
}

/// Split, cross-validate every candidate, refit the best and evaluate it
pub fn run_training(dataset: &Dataset, config: &TrainingConfig) -> RiskResult<(TrainingReport, FittedPipeline)> {
    config.validate()?;

    let split = dataset.train_test_split(config.train_ratio, Some(config.seed));
    if split.train.is_empty() {
        return Err(RiskError::InvalidConfig(format!(
            "training partition is empty ({} records loaded)",
            dataset.len()
        )));
    }
    if split.train.len() < config.folds {
        return Err(RiskError::InvalidConfig(format!(
            "{} training records cannot fill {} folds",
            split.train.len(),
            config.folds
        )));
    }

    info!(
        "Training on {} records, testing on {} ({}-fold CV, scoring={})",
        split.train.len(),
        split.test.len(),
        config.folds,
        config.scoring
    );

    let mut candidates = Vec::with_capacity(config.candidates.len());
    for spec in &config.candidates {
        let cv = cross_validate(spec, config, &split.train)?;
        info!("{}: {}", spec.name, cv.summary());
        candidates.push(CandidateResult {
            name: spec.name.clone(),
            cv,
        });
    }

    let best_idx = select_best(&candidates)
        .ok_or_else(|| RiskError::Training("no candidate produced a score".to_string()))?;
    let best_spec = &config.candidates[best_idx];
    info!("Best model: {}", best_spec.name);

    let pipeline = FittedPipeline::fit(best_spec, &config.preprocess, &split.train)?;
    let evaluation = Evaluator::new(config.sample_size).evaluate(&split.test, &pipeline)?;
    let classification_report = ClassificationReport::from_confusion(&evaluation.confusion);

    let report = TrainingReport {
        generated_at: Utc::now(),
        dataset_size: dataset.len(),
        train_size: split.train.len(),
        test_size: split.test.len(),
        candidates,
        best_model: best_spec.name.clone(),
        evaluation,
        classification_report,
        feature_importances: pipeline.feature_importances(),
        config: config.clone(),
    };

    Ok((report, pipeline))
}

/// Result of the rule-based demo run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoReport {
    pub generated_at: DateTime<Utc>,
    pub dataset_size: usize,
    /// First records of the file, before shuffling
    pub preview: Vec<Record>,
    pub train_size: usize,
    pub test_size: usize,
    pub train_distribution: [(RiskLevel, usize); RiskLevel::COUNT],
    pub evaluation: Evaluation,
}

/// Evaluate the rule-based scorer on a shuffled hold-out split
pub fn run_demo(dataset: &Dataset, scorer: &RiskScorer, config: &DemoConfig) -> RiskResult<DemoReport> {
    validate_ratio(config.train_ratio)?;

    let preview = dataset.iter().take(PREVIEW_LEN).cloned().collect();
    let split = dataset.train_test_split(config.train_ratio, config.seed);
    info!(
        "Demo split: {} training, {} test records",
        split.train.len(),
        split.test.len()
    );

    let evaluation = Evaluator::new(config.sample_size).evaluate(&split.test, scorer)?;

    Ok(DemoReport {
        generated_at: Utc::now(),
        dataset_size: dataset.len(),
        preview,
        train_size: split.train.len(),
        test_size: split.test.len(),
        train_distribution: split.train.label_distribution(),
        evaluation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataGenerator, GeneratorConfig};
    use crate::models::{ForestConfig, GbmParams, ModelKind, TreeConfig};

    fn generated(rows: usize) -> Dataset {
        DataGenerator::new(GeneratorConfig {
            rows,
            seed: Some(7),
            ..Default::default()
        })
        .unwrap()
        .generate()
    }

    fn quick_config() -> TrainingConfig {
        TrainingConfig {
            folds: 3,
            candidates: vec![
                ModelSpec::new(
                    "Boosting",
                    ModelKind::GradientBoosting(GbmParams {
                        n_estimators: 5,
                        ..Default::default()
                    }),
                ),
                ModelSpec::new(
                    "Forest",
                    ModelKind::RandomForest(ForestConfig {
                        n_trees: 5,
                        ..Default::default()
                    }),
                ),
            ],
            ..Default::default()
        }
    }

    fn result(name: &str, mean: f64) -> CandidateResult {
        CandidateResult {
            name: name.to_string(),
            cv: CVScores::from_scores(vec![mean]),
        }
    }

    #[test]
    fn test_select_best_prefers_first_maximum() {
        let results = [result("a", 0.6), result("b", 0.8), result("c", 0.8)];
        assert_eq!(select_best(&results), Some(1));
        assert_eq!(select_best(&[]), None);
    }

    #[test]
    fn test_run_training_on_generated_data() {
        let dataset = generated(60);
        let (report, pipeline) = run_training(&dataset, &quick_config()).unwrap();

        assert_eq!(report.train_size, 48);
        assert_eq!(report.test_size, 12);
        assert_eq!(report.candidates.len(), 2);
        assert!(report.candidates.iter().any(|c| c.name == report.best_model));
        for candidate in &report.candidates {
            assert_eq!(candidate.cv.scores.len(), 3);
            assert!((0.0..=1.0).contains(&candidate.cv.mean));
        }

        assert_eq!(report.evaluation.total, 12);
        assert_eq!(report.evaluation.confusion.total(), 12);
        assert_eq!(report.feature_importances.len(), pipeline.preprocessor().n_features());
    }

    #[test]
    fn test_training_is_reproducible() {
        let dataset = generated(40);
        let config = quick_config();

        let (a, _) = run_training(&dataset, &config).unwrap();
        let (b, _) = run_training(&dataset, &config).unwrap();

        assert_eq!(a.best_model, b.best_model);
        assert_eq!(a.evaluation.confusion, b.evaluation.confusion);
        for (x, y) in a.candidates.iter().zip(&b.candidates) {
            assert_eq!(x.cv.scores, y.cv.scores);
        }
    }

    #[test]
    fn test_too_few_records_for_folds() {
        let dataset = generated(3);
        let err = run_training(&dataset, &quick_config()).unwrap_err();
        assert!(matches!(err, RiskError::InvalidConfig(_)));

        let err = run_training(&Dataset::default(), &quick_config()).unwrap_err();
        assert!(matches!(err, RiskError::InvalidConfig(_)));
    }

    #[test]
    fn test_invalid_training_config() {
        let dataset = generated(30);
        let config = TrainingConfig {
            candidates: Vec::new(),
            ..quick_config()
        };
        assert!(run_training(&dataset, &config).is_err());

        let config = TrainingConfig {
            train_ratio: 1.0,
            ..quick_config()
        };
        assert!(run_training(&dataset, &config).is_err());
    }

    #[test]
    fn test_fitted_pipeline_predicts_records() {
        let dataset = generated(30);
        let spec = ModelSpec::new("Tree", ModelKind::DecisionTree(TreeConfig::default()));
        let pipeline = FittedPipeline::fit(&spec, &PreprocessConfig::default(), &dataset).unwrap();

        let batch = pipeline.predict_batch(&dataset).unwrap();
        for (record, expected) in dataset.iter().zip(&batch) {
            assert_eq!(pipeline.predict(record).unwrap(), *expected);
        }
        assert_eq!(pipeline.name(), "Tree");
    }

    #[test]
    fn test_run_demo_uses_scorer() {
        let dataset = generated(50);
        let config = DemoConfig {
            seed: Some(1),
            ..Default::default()
        };
        let report = run_demo(&dataset, &RiskScorer::default(), &config).unwrap();

        assert_eq!(report.preview.len(), 3);
        assert_eq!(report.preview[0].row, 1);
        assert_eq!(report.train_size, 40);
        assert_eq!(report.test_size, 10);
        assert_eq!(report.evaluation.samples.len(), 5);
        assert_eq!(report.evaluation.predictor, "RuleBasedScorer");

        let distributed: usize = report.train_distribution.iter().map(|(_, c)| c).sum();
        assert_eq!(distributed, 40);

        let scorer = RiskScorer::default();
        for sample in &report.evaluation.samples {
            assert_eq!(scorer.predict_risk(&sample.record).unwrap(), sample.predicted);
        }
    }
}
