//! Rule-based stampede risk scorer
//!
//! Adds points for crowd size, density and abnormal movement speed, then maps
//! the total onto a risk level.

use crate::data::{Record, RiskLevel, DENSITY_SQM, MOVEMENT_SPEED};
use crate::error::{RiskError, RiskResult};
use crate::evaluation::RiskPredictor;
use serde::{Deserialize, Serialize};

/// Thresholds used by [`RiskScorer`]. All comparisons are strict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreThresholds {
    /// People count above which the crowd scores 2 points
    pub people_high: u32,
    /// People count above which the crowd scores 1 point
    pub people_medium: u32,
    /// Density above which the crowd scores 2 points
    pub density_high: f64,
    /// Density above which the crowd scores 1 point
    pub density_medium: f64,
    /// Speed below which movement counts as congested
    pub speed_slow: f64,
    /// Speed above which movement counts as a rush
    pub speed_fast: f64,
    /// Minimum total for `High`
    pub high_score: u8,
    /// Minimum total for `Medium`
    pub medium_score: u8,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            people_high: 400,
            people_medium: 250,
            density_high: 7.0,
            density_medium: 4.0,
            speed_slow: 1.5,
            speed_fast: 4.0,
            high_score: 4,
            medium_score: 2,
        }
    }
}

/// Points contributed by each factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub people: u8,
    pub density: u8,
    pub speed: u8,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u8 {
        self.people + self.density + self.speed
    }
}

/// Additive threshold classifier
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    thresholds: ScoreThresholds,
}

impl RiskScorer {
    pub fn new(thresholds: ScoreThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ScoreThresholds {
        &self.thresholds
    }

    /// Points for raw feature values
    pub fn breakdown(&self, people_count: u32, density_sqm: f64, movement_speed: f64) -> ScoreBreakdown {
        let t = &self.thresholds;

        let people = if people_count > t.people_high {
            2
        } else if people_count > t.people_medium {
            1
        } else {
            0
        };

        let density = if density_sqm > t.density_high {
            2
        } else if density_sqm > t.density_medium {
            1
        } else {
            0
        };

        // Either too slow or too fast, never both
        let speed = if movement_speed < t.speed_slow || movement_speed > t.speed_fast {
            1
        } else {
            0
        };

        ScoreBreakdown {
            people,
            density,
            speed,
        }
    }

    /// Map a total score onto a risk level
    pub fn level_for(&self, score: u8) -> RiskLevel {
        if score >= self.thresholds.high_score {
            RiskLevel::High
        } else if score >= self.thresholds.medium_score {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Classify raw feature values
    pub fn classify(&self, people_count: u32, density_sqm: f64, movement_speed: f64) -> RiskLevel {
        self.level_for(self.breakdown(people_count, density_sqm, movement_speed).total())
    }

    /// Points for a record, failing on missing numeric fields
    pub fn score_breakdown(&self, record: &Record) -> RiskResult<ScoreBreakdown> {
        let density = record
            .density_sqm
            .ok_or_else(|| RiskError::malformed(record.row, DENSITY_SQM, ""))?;
        let speed = record
            .movement_speed
            .ok_or_else(|| RiskError::malformed(record.row, MOVEMENT_SPEED, ""))?;

        Ok(self.breakdown(record.people_count, density, speed))
    }

    /// Classify a record
    pub fn predict_risk(&self, record: &Record) -> RiskResult<RiskLevel> {
        let breakdown = self.score_breakdown(record)?;
        Ok(self.level_for(breakdown.total()))
    }
}

impl RiskPredictor for RiskScorer {
    fn name(&self) -> &str {
        "RuleBasedScorer"
    }

    fn predict(&self, record: &Record) -> RiskResult<RiskLevel> {
        self.predict_risk(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> RiskScorer {
        RiskScorer::default()
    }

    #[test]
    fn test_reference_scenarios() {
        let s = scorer();
        assert_eq!(s.classify(450, 8.0, 3.0), RiskLevel::High);
        assert_eq!(s.classify(200, 2.0, 2.0), RiskLevel::Low);
        assert_eq!(s.classify(300, 5.0, 0.5), RiskLevel::Medium);
        assert_eq!(s.breakdown(300, 5.0, 0.5).total(), 3);
    }

    #[test]
    fn test_people_boundaries() {
        let s = scorer();
        assert_eq!(s.breakdown(250, 0.0, 2.0).people, 0);
        assert_eq!(s.breakdown(251, 0.0, 2.0).people, 1);
        assert_eq!(s.breakdown(400, 0.0, 2.0).people, 1);
        assert_eq!(s.breakdown(401, 0.0, 2.0).people, 2);
    }

    #[test]
    fn test_density_boundaries() {
        let s = scorer();
        assert_eq!(s.breakdown(0, 4.0, 2.0).density, 0);
        assert_eq!(s.breakdown(0, 4.01, 2.0).density, 1);
        assert_eq!(s.breakdown(0, 7.0, 2.0).density, 1);
        assert_eq!(s.breakdown(0, 7.01, 2.0).density, 2);
    }

    #[test]
    fn test_speed_boundaries() {
        let s = scorer();
        assert_eq!(s.breakdown(0, 0.0, 1.49).speed, 1);
        assert_eq!(s.breakdown(0, 0.0, 1.5).speed, 0);
        assert_eq!(s.breakdown(0, 0.0, 4.0).speed, 0);
        assert_eq!(s.breakdown(0, 0.0, 4.01).speed, 1);
    }

    #[test]
    fn test_speed_contributes_at_most_one_point() {
        let s = scorer();
        for speed in [0.0, 0.5, 1.0, 1.5, 2.5, 4.0, 4.5, 9.9] {
            assert!(s.breakdown(500, 10.0, speed).speed <= 1);
        }
        // Maximum total is 2 + 2 + 1
        assert_eq!(s.breakdown(1000, 15.0, 0.1).total(), 5);
    }

    #[test]
    fn test_score_to_level_mapping() {
        let s = scorer();
        let expected = [
            RiskLevel::Low,
            RiskLevel::Low,
            RiskLevel::Medium,
            RiskLevel::Medium,
            RiskLevel::High,
            RiskLevel::High,
        ];
        for (score, level) in expected.iter().enumerate() {
            assert_eq!(s.level_for(score as u8), *level);
        }
    }

    #[test]
    fn test_deterministic_over_grid() {
        let s = scorer();
        for people in (0..=1000).step_by(50) {
            for density in [0.0, 3.9, 4.0, 4.1, 6.9, 7.0, 7.1, 15.0] {
                for speed in [0.0, 1.4, 1.5, 3.0, 4.0, 4.1, 10.0] {
                    let first = s.classify(people, density, speed);
                    assert_eq!(first, s.classify(people, density, speed));
                    assert!(RiskLevel::ALL.contains(&first));
                }
            }
        }
    }

    #[test]
    fn test_record_constructor_matches_classify_order() {
        let s = scorer();
        let record = Record::new(1, 450, 8.0, 3.0, "Entry", RiskLevel::High);
        assert_eq!(record.density_sqm, Some(8.0));
        assert_eq!(record.movement_speed, Some(3.0));
        assert_eq!(s.predict_risk(&record).unwrap(), s.classify(450, 8.0, 3.0));
        assert_eq!(s.classify(450, 8.0, 3.0), RiskLevel::High);
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let s = scorer();
        let mut record = Record::new(12, 300, 5.0, 1.0, "Exit", RiskLevel::Medium);
        assert_eq!(s.predict_risk(&record).unwrap(), RiskLevel::Medium);

        record.movement_speed = None;
        match s.predict_risk(&record).unwrap_err() {
            RiskError::MalformedRecord { row, field, .. } => {
                assert_eq!(row, 12);
                assert_eq!(field, MOVEMENT_SPEED);
            }
            other => panic!("unexpected error: {other}"),
        }

        record.density_sqm = None;
        assert!(matches!(
            s.predict_risk(&record),
            Err(RiskError::MalformedRecord { field: DENSITY_SQM, .. })
        ));
    }
}
