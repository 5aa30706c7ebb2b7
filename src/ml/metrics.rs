//! Classification metrics over the three risk levels
//!
//! Includes:
//! - 3x3 confusion matrix indexed by (actual, predicted)
//! - Per-class precision, recall, F1 and support
//! - Macro and support-weighted averages
//!
//! Macro averages only count levels that occur among the actual or predicted
//! labels, so a fold without any `High` rows is not penalised for it.

use crate::data::RiskLevel;
use serde::{Deserialize, Serialize};

/// Counts of (actual, predicted) pairs in display order Low, Medium, High
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts: [[usize; RiskLevel::COUNT]; RiskLevel::COUNT],
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from paired labels
    pub fn from_labels(actual: &[RiskLevel], predicted: &[RiskLevel]) -> Self {
        assert_eq!(actual.len(), predicted.len(), "Label slices must have same length");

        let mut matrix = Self::new();
        for (&a, &p) in actual.iter().zip(predicted.iter()) {
            matrix.record(a, p);
        }
        matrix
    }

    /// Count one prediction
    pub fn record(&mut self, actual: RiskLevel, predicted: RiskLevel) {
        self.counts[actual.index()][predicted.index()] += 1;
    }

    pub fn get(&self, actual: RiskLevel, predicted: RiskLevel) -> usize {
        self.counts[actual.index()][predicted.index()]
    }

    /// Row of counts for one actual class
    pub fn row(&self, actual: RiskLevel) -> [usize; RiskLevel::COUNT] {
        self.counts[actual.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Records on the diagonal
    pub fn correct(&self) -> usize {
        (0..RiskLevel::COUNT).map(|i| self.counts[i][i]).sum()
    }

    /// Number of records whose actual label is `level`
    pub fn support(&self, level: RiskLevel) -> usize {
        self.row(level).iter().sum()
    }

    /// Number of records predicted as `level`
    pub fn predicted_count(&self, level: RiskLevel) -> usize {
        self.counts.iter().map(|row| row[level.index()]).sum()
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    /// TP / (TP + FP)
    pub fn precision(&self, level: RiskLevel) -> f64 {
        ratio(self.get(level, level), self.predicted_count(level))
    }

    /// TP / (TP + FN)
    pub fn recall(&self, level: RiskLevel) -> f64 {
        ratio(self.get(level, level), self.support(level))
    }

    pub fn f1(&self, level: RiskLevel) -> f64 {
        let precision = self.precision(level);
        let recall = self.recall(level);
        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    }

    /// True when `level` occurs as an actual or a predicted label
    pub fn is_present(&self, level: RiskLevel) -> bool {
        self.support(level) + self.predicted_count(level) > 0
    }

    /// Levels that occur in the matrix, in display order
    pub fn present_levels(&self) -> Vec<RiskLevel> {
        RiskLevel::ALL
            .iter()
            .copied()
            .filter(|&l| self.is_present(l))
            .collect()
    }

    /// Unweighted mean F1 over the present levels, 0 for an empty matrix
    pub fn macro_f1(&self) -> f64 {
        let levels = self.present_levels();
        if levels.is_empty() {
            return 0.0;
        }
        levels.iter().map(|&l| self.f1(l)).sum::<f64>() / levels.len() as f64
    }
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

/// Metrics for one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub level: RiskLevel,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Averaged metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class breakdown plus averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
}

impl ClassificationReport {
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        let classes: Vec<ClassMetrics> = cm
            .present_levels()
            .into_iter()
            .map(|level| ClassMetrics {
                level,
                precision: cm.precision(level),
                recall: cm.recall(level),
                f1: cm.f1(level),
                support: cm.support(level),
            })
            .collect();

        let total = cm.total();

        let mean = |f: fn(&ClassMetrics) -> f64| -> f64 {
            if classes.is_empty() {
                return 0.0;
            }
            classes.iter().map(f).sum::<f64>() / classes.len() as f64
        };

        let macro_avg = AverageMetrics {
            precision: mean(|c| c.precision),
            recall: mean(|c| c.recall),
            f1: mean(|c| c.f1),
            support: total,
        };

        let weighted = |f: fn(&ClassMetrics) -> f64| -> f64 {
            if total == 0 {
                return 0.0;
            }
            classes
                .iter()
                .map(|c| f(c) * c.support as f64)
                .sum::<f64>()
                / total as f64
        };

        let weighted_avg = AverageMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
            support: total,
        };

        Self {
            accuracy: cm.accuracy(),
            classes,
            macro_avg,
            weighted_avg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RiskLevel::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    #[test]
    fn test_confusion_matrix_totals() {
        let actual = [Low, Low, Medium, High, High, High, Medium];
        let predicted = [Low, Medium, Medium, High, Low, High, High];
        let cm = ConfusionMatrix::from_labels(&actual, &predicted);

        assert_eq!(cm.total(), actual.len());
        assert_eq!(cm.support(Low), 2);
        assert_eq!(cm.support(Medium), 2);
        assert_eq!(cm.support(High), 3);
        assert_eq!(cm.row(High), [1, 0, 2]);
        assert_eq!(cm.correct(), 4);
        assert!(close(cm.accuracy(), 4.0 / 7.0));
    }

    #[test]
    fn test_precision_recall_f1() {
        let actual = [Low, Low, Low, Medium, Medium, High];
        let predicted = [Low, Low, Medium, Medium, Low, High];
        let cm = ConfusionMatrix::from_labels(&actual, &predicted);

        // Low: TP=2, FP=1, FN=1
        assert!(close(cm.precision(Low), 2.0 / 3.0));
        assert!(close(cm.recall(Low), 2.0 / 3.0));
        assert!(close(cm.f1(Low), 2.0 / 3.0));
        // High: perfect
        assert!(close(cm.f1(High), 1.0));
    }

    #[test]
    fn test_zero_denominators() {
        let cm = ConfusionMatrix::from_labels(&[Low, Low], &[Low, Low]);
        assert_eq!(cm.precision(High), 0.0);
        assert_eq!(cm.recall(High), 0.0);
        assert_eq!(cm.f1(High), 0.0);

        let empty = ConfusionMatrix::new();
        assert_eq!(empty.accuracy(), 0.0);
        assert_eq!(empty.macro_f1(), 0.0);
        assert!(ClassificationReport::from_confusion(&empty).classes.is_empty());
    }

    #[test]
    fn test_macro_f1_ignores_absent_levels() {
        let cm = ConfusionMatrix::from_labels(&[Low, Low, Medium], &[Low, Low, Medium]);
        assert!(!cm.is_present(High));
        assert_eq!(cm.present_levels(), vec![Low, Medium]);
        assert!(close(cm.macro_f1(), 1.0));

        let report = ClassificationReport::from_confusion(&cm);
        let levels: Vec<RiskLevel> = report.classes.iter().map(|c| c.level).collect();
        assert_eq!(levels, vec![Low, Medium]);
        assert!(close(report.macro_avg.f1, 1.0));
        assert!(close(report.macro_avg.precision, 1.0));
    }

    #[test]
    fn test_predicted_only_level_counts_in_macro() {
        // High never occurs in the labels but is predicted once
        let cm = ConfusionMatrix::from_labels(&[Low, Low], &[Low, High]);
        assert!(cm.is_present(High));
        // Low: P=1, R=0.5, F1=2/3; High: F1=0
        assert!(close(cm.macro_f1(), (2.0 / 3.0) / 2.0));
        assert_eq!(ClassificationReport::from_confusion(&cm).classes.len(), 2);
    }

    #[test]
    fn test_classification_report_averages() {
        let actual = [Low, Low, Medium, High];
        let predicted = [Low, Medium, Medium, High];
        let cm = ConfusionMatrix::from_labels(&actual, &predicted);
        let report = ClassificationReport::from_confusion(&cm);

        assert_eq!(report.classes.len(), 3);
        assert_eq!(report.macro_avg.support, 4);
        assert!(close(report.accuracy, 0.75));
        assert!(close(report.macro_avg.f1, cm.macro_f1()));

        // Low recall 0.5 (support 2), Medium recall 1.0 (1), High recall 1.0 (1)
        assert!(close(report.weighted_avg.recall, 0.75));
    }
}
