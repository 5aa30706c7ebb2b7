//! Text rendering of pipeline reports
//!
//! The pipelines return data; everything printed by the binaries is built
//! here so the layout can be tested without capturing stdout.

use crate::data::{Record, RiskLevel, AREA_ZONE, DENSITY_SQM, MOVEMENT_SPEED, PEOPLE_COUNT, RISK_LEVEL};
use crate::error::RiskResult;
use crate::evaluation::Evaluation;
use crate::ml::{ClassificationReport, ConfusionMatrix};
use crate::pipeline::{DemoReport, TrainingReport};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

const RULE_WIDTH: usize = 70;

/// Full text of a demo run
pub fn render_demo(report: &DemoReport) -> String {
    DemoView(report).to_string()
}

/// Full text of a training run
pub fn render_training(report: &TrainingReport) -> String {
    TrainingView(report).to_string()
}

/// Confusion matrix as a fixed-width table, rows are actual levels
pub fn render_confusion(cm: &ConfusionMatrix) -> String {
    ConfusionView(cm).to_string()
}

/// Dump any report as pretty-printed JSON
pub fn write_json<T: Serialize>(report: &T, path: &Path) -> RiskResult<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

struct DemoView<'a>(&'a DemoReport);

struct TrainingView<'a>(&'a TrainingReport);

struct ConfusionView<'a>(&'a ConfusionMatrix);

struct ClassificationView<'a>(&'a ClassificationReport);

fn banner(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(f, "{}", title)?;
    writeln!(f, "{}", "=".repeat(RULE_WIDTH))
}

fn section(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "{}", title)?;
    writeln!(f, "{}", "-".repeat(RULE_WIDTH))
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn describe_record(record: &Record) -> String {
    format!(
        "{}={}, {}={}, {}={}, {}={}, {}={}",
        PEOPLE_COUNT,
        record.people_count,
        MOVEMENT_SPEED,
        optional(record.movement_speed),
        DENSITY_SQM,
        optional(record.density_sqm),
        AREA_ZONE,
        record.area_zone.as_deref().unwrap_or("-"),
        RISK_LEVEL,
        record.risk_level
    )
}

fn write_samples(f: &mut fmt::Formatter<'_>, evaluation: &Evaluation) -> fmt::Result {
    for (i, sample) in evaluation.samples.iter().enumerate() {
        let record = &sample.record;
        writeln!(f)?;
        writeln!(f, "CCTV Feed #{}:", i + 1)?;
        writeln!(f, "  Zone: {}", record.area_zone.as_deref().unwrap_or("-"))?;
        writeln!(
            f,
            "  People: {}, Density: {}, Speed: {}",
            record.people_count,
            optional(record.density_sqm),
            optional(record.movement_speed)
        )?;
        writeln!(
            f,
            "  Predicted Risk: {} | Actual: {} | {}",
            sample.predicted,
            record.risk_level,
            sample.status()
        )?;
    }
    Ok(())
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

impl fmt::Display for ConfusionView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<12}", "Actual/Pred")?;
        for level in RiskLevel::ALL {
            write!(f, " {:<10}", level.as_str())?;
        }
        writeln!(f)?;
        writeln!(f, "{}", "-".repeat(50))?;
        for actual in RiskLevel::ALL {
            write!(f, "{:<12}", actual.as_str())?;
            for count in self.0.row(actual) {
                write!(f, " {:<10}", count)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for ClassificationView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for class in &report.classes {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                class.level.as_str(),
                class.precision,
                class.recall,
                class.f1,
                class.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", report.accuracy, report.macro_avg.support
        )?;
        for (name, avg) in [("macro avg", &report.macro_avg), ("weighted avg", &report.weighted_avg)] {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                name, avg.precision, avg.recall, avg.f1, avg.support
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for DemoView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let evaluation = &report.evaluation;

        banner(f, "CROWD SAFETY MODULE - STAMPEDE RISK (RULE-BASED DEMO)")?;

        section(f, "PHASE 1: DATA INGESTION")?;
        writeln!(f, "Data loaded: {} CCTV records", report.dataset_size)?;
        writeln!(f, "Features: {}, {}, {}, {}", PEOPLE_COUNT, MOVEMENT_SPEED, DENSITY_SQM, AREA_ZONE)?;
        writeln!(f, "Target: {} (Low/Medium/High)", RISK_LEVEL)?;
        if !report.preview.is_empty() {
            writeln!(f)?;
            writeln!(f, "Sample Records:")?;
            for (i, record) in report.preview.iter().enumerate() {
                writeln!(f, "  Record {}: {}", i + 1, describe_record(record))?;
            }
        }

        section(f, "PHASE 2: TRAIN-TEST SPLIT")?;
        writeln!(f, "Training set: {} samples", report.train_size)?;
        writeln!(f, "Test set: {} samples", report.test_size)?;
        writeln!(f)?;
        writeln!(f, "Training Data Distribution:")?;
        for (level, count) in &report.train_distribution {
            writeln!(
                f,
                "  {}: {} samples ({:.1}%)",
                level,
                count,
                percent(*count, report.train_size)
            )?;
        }

        section(f, "PHASE 3: RULE-BASED EVALUATION")?;
        writeln!(
            f,
            "Test Accuracy: {:.4} ({}/{} correct)",
            evaluation.accuracy, evaluation.correct, evaluation.total
        )?;
        writeln!(f)?;
        writeln!(f, "Confusion Matrix:")?;
        write!(f, "{}", ConfusionView(&evaluation.confusion))?;

        if !evaluation.samples.is_empty() {
            section(f, "PHASE 4: LIVE PREDICTIONS (Sample)")?;
            write_samples(f, evaluation)?;
        }

        writeln!(f)?;
        writeln!(f, "{}", "=".repeat(RULE_WIDTH))
    }
}

impl fmt::Display for TrainingView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let scoring = report.config.scoring;

        banner(f, "CROWD SAFETY MODULE - STAMPEDE RISK MODEL SELECTION")?;

        section(f, "DATA")?;
        writeln!(f, "Data loaded: {} records", report.dataset_size)?;
        writeln!(f, "Training set: {} samples", report.train_size)?;
        writeln!(f, "Test set: {} samples", report.test_size)?;
        writeln!(
            f,
            "Preprocessing: impute={}, scale={}",
            report.config.preprocess.impute, report.config.preprocess.scale
        )?;

        section(f, "MODEL TRAINING & CROSS-VALIDATION")?;
        for candidate in &report.candidates {
            writeln!(
                f,
                "{:<20} {}-fold {}: {:.4} (+/- {:.4})",
                candidate.name,
                candidate.cv.scores.len(),
                scoring,
                candidate.cv.mean,
                candidate.cv.std
            )?;
        }
        writeln!(f)?;
        writeln!(f, "BEST MODEL SELECTED: {}", report.best_model)?;

        section(f, "TEST SET EVALUATION")?;
        writeln!(
            f,
            "Accuracy: {:.4} ({}/{} correct)",
            report.evaluation.accuracy, report.evaluation.correct, report.evaluation.total
        )?;
        writeln!(f)?;
        writeln!(f, "Classification Report:")?;
        write!(f, "{}", ClassificationView(&report.classification_report))?;
        writeln!(f)?;
        writeln!(f, "Confusion Matrix:")?;
        write!(f, "{}", ConfusionView(&report.evaluation.confusion))?;

        if !report.feature_importances.is_empty() {
            section(f, "FEATURE IMPORTANCE")?;
            let mut ranking = report.feature_importances.clone();
            ranking.sort_by(|a, b| b.1.total_cmp(&a.1));
            for (i, (name, importance)) in ranking.iter().enumerate() {
                let bar = "#".repeat((importance * 40.0) as usize);
                writeln!(f, "{:2}. {:25} {:.4} {}", i + 1, name, importance, bar)?;
            }
        }

        if !report.evaluation.samples.is_empty() {
            section(f, "SAMPLE PREDICTIONS")?;
            write_samples(f, &report.evaluation)?;
        }

        writeln!(f)?;
        writeln!(f, "{}", "=".repeat(RULE_WIDTH))
    }
}
