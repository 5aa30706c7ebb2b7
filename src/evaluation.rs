//! Evaluation harness
//!
//! Runs any [`RiskPredictor`] over a labelled partition and collects accuracy,
//! a confusion matrix and a handful of sample predictions for inspection.

use crate::data::{Dataset, Record, RiskLevel};
use crate::error::RiskResult;
use crate::ml::ConfusionMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Anything that maps a record to a risk level
pub trait RiskPredictor {
    /// Display name used in reports
    fn name(&self) -> &str;

    fn predict(&self, record: &Record) -> RiskResult<RiskLevel>;
}

/// One prediction kept for the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionSample {
    pub record: Record,
    pub predicted: RiskLevel,
}

impl PredictionSample {
    pub fn is_correct(&self) -> bool {
        self.predicted == self.record.risk_level
    }

    pub fn status(&self) -> &'static str {
        if self.is_correct() {
            "CORRECT"
        } else {
            "WRONG"
        }
    }
}

/// Result of evaluating a predictor on a partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub predictor: String,
    pub correct: usize,
    pub total: usize,
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub samples: Vec<PredictionSample>,
}

/// Evaluator configuration
#[derive(Debug, Clone)]
pub struct Evaluator {
    sample_size: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self { sample_size: 5 }
    }
}

impl Evaluator {
    /// Keep the first `sample_size` predictions
    pub fn new(sample_size: usize) -> Self {
        Self { sample_size }
    }

    pub fn evaluate(&self, test: &Dataset, predictor: &dyn RiskPredictor) -> RiskResult<Evaluation> {
        let mut confusion = ConfusionMatrix::new();
        let mut samples = Vec::with_capacity(self.sample_size.min(test.len()));

        for record in test {
            let predicted = predictor.predict(record)?;
            confusion.record(record.risk_level, predicted);

            if samples.len() < self.sample_size {
                samples.push(PredictionSample {
                    record: record.clone(),
                    predicted,
                });
            }
        }

        let correct = confusion.correct();
        let total = confusion.total();
        debug!("{}: {}/{} correct", predictor.name(), correct, total);

        Ok(Evaluation {
            predictor: predictor.name().to_string(),
            correct,
            total,
            accuracy: confusion.accuracy(),
            confusion,
            samples,
        })
    }
}
