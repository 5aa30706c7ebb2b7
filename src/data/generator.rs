//! Synthetic CCTV data generator
//!
//! Feature values and labels are drawn independently, so the labels carry no
//! signal. The output only exercises the pipeline.

use super::dataset::Dataset;
use super::record::{Record, RiskLevel, KNOWN_ZONES};
use crate::error::{RiskError, RiskResult};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Value ranges for generated records
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Number of rows to emit
    pub rows: usize,
    /// Inclusive people count range
    pub people_range: (u32, u32),
    /// Movement speed range in m/s
    pub speed_range: (f64, f64),
    /// Density range in persons per square metre
    pub density_range: (f64, f64),
    /// Seed for reproducible output (None = entropy)
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            rows: 100,
            people_range: (50, 500),
            speed_range: (0.5, 5.0),
            density_range: (1.0, 10.0),
            seed: None,
        }
    }
}

impl GeneratorConfig {
    /// Check that every range is finite and ordered
    pub fn validate(&self) -> RiskResult<()> {
        let (people_lo, people_hi) = self.people_range;
        if people_lo > people_hi {
            return Err(RiskError::InvalidConfig(format!(
                "people_range must be ordered, got [{}, {}]",
                people_lo, people_hi
            )));
        }
        check_range("speed_range", self.speed_range)?;
        check_range("density_range", self.density_range)
    }
}

fn check_range(name: &str, (lo, hi): (f64, f64)) -> RiskResult<()> {
    if !lo.is_finite() || !hi.is_finite() || lo > hi {
        return Err(RiskError::InvalidConfig(format!(
            "{} must be finite and ordered, got [{}, {}]",
            name, lo, hi
        )));
    }
    Ok(())
}

/// Generates uniformly random records
pub struct DataGenerator {
    config: GeneratorConfig,
    rng: ChaCha8Rng,
}

impl DataGenerator {
    /// Fails with `InvalidConfig` when a range is inverted or not finite
    pub fn new(config: GeneratorConfig) -> RiskResult<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Ok(Self { config, rng })
    }

    /// Draw a single record
    pub fn next_record(&mut self, row: usize) -> Record {
        let (people_lo, people_hi) = self.config.people_range;
        let (speed_lo, speed_hi) = self.config.speed_range;
        let (density_lo, density_hi) = self.config.density_range;

        let people = self.rng.gen_range(people_lo..=people_hi);
        let speed = round2(self.rng.gen_range(speed_lo..=speed_hi));
        let density = round2(self.rng.gen_range(density_lo..=density_hi));
        let zone = KNOWN_ZONES.choose(&mut self.rng).copied().unwrap_or("Entry");
        let level = RiskLevel::ALL
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(RiskLevel::Low);

        Record::new(row, people, density, speed, zone, level)
    }

    /// Generate the configured number of rows
    pub fn generate(&mut self) -> Dataset {
        let records = (1..=self.config.rows).map(|row| self.next_record(row)).collect();
        Dataset::new(records)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
