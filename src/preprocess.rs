//! Feature preprocessing
//!
//! Turns records into a numeric design matrix:
//! - numeric columns are imputed (mean or median) and optionally standardised
//! - `Area_Zone` is filled with a constant and one-hot encoded
//!
//! All statistics are learned in [`Preprocessor::fit`] from training data only.

use crate::data::{Dataset, Record, AREA_ZONE, DENSITY_SQM, MOVEMENT_SPEED, PEOPLE_COUNT};
use crate::error::{RiskError, RiskResult};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Placeholder category for records without a zone
pub const MISSING_CATEGORY: &str = "missing";

const NUMERIC_COLUMNS: [&str; 3] = [PEOPLE_COUNT, MOVEMENT_SPEED, DENSITY_SQM];

/// How missing numeric values are filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    #[default]
    Mean,
    Median,
}

impl fmt::Display for ImputeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImputeStrategy::Mean => write!(f, "mean"),
            ImputeStrategy::Median => write!(f, "median"),
        }
    }
}

impl FromStr for ImputeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(ImputeStrategy::Mean),
            "median" => Ok(ImputeStrategy::Median),
            other => Err(format!("unknown impute strategy: {}", other)),
        }
    }
}

/// Categorical encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    #[default]
    OneHot,
}

/// Preprocessing strategy
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub impute: ImputeStrategy,
    /// Standardise numeric columns after imputation
    pub scale: bool,
    pub encoding: Encoding,
}

/// Learned preprocessing state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocessor {
    config: PreprocessConfig,
    fill_values: [f64; 3],
    means: [f64; 3],
    stds: [f64; 3],
    categories: Vec<String>,
    fitted: bool,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self {
            config,
            fill_values: [0.0; 3],
            means: [0.0; 3],
            stds: [1.0; 3],
            categories: Vec::new(),
            fitted: false,
        }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Zones seen during fit, in encoding order
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Imputation value per numeric column
    pub fn fill_values(&self) -> [f64; 3] {
        self.fill_values
    }

    pub fn n_features(&self) -> usize {
        NUMERIC_COLUMNS.len() + self.categories.len()
    }

    /// Output column names
    pub fn feature_names(&self) -> Vec<String> {
        NUMERIC_COLUMNS
            .iter()
            .map(|s| s.to_string())
            .chain(self.categories.iter().map(|c| format!("{}_{}", AREA_ZONE, c)))
            .collect()
    }

    /// Learn fill values, scaling statistics and categories
    pub fn fit(&mut self, dataset: &Dataset) -> RiskResult<()> {
        if dataset.is_empty() {
            return Err(RiskError::InvalidConfig(
                "cannot fit preprocessor on an empty dataset".to_string(),
            ));
        }

        for (j, fill) in self.fill_values.iter_mut().enumerate() {
            let present: Vec<f64> = dataset.iter().filter_map(|r| raw_numeric(r, j)).collect();
            *fill = match self.config.impute {
                ImputeStrategy::Mean => Array1::from_vec(present).mean().unwrap_or(0.0),
                ImputeStrategy::Median => median(present).unwrap_or(0.0),
            };
        }

        let imputed = Array2::from_shape_fn((dataset.len(), NUMERIC_COLUMNS.len()), |(i, j)| {
            raw_numeric(&dataset.records[i], j).unwrap_or(self.fill_values[j])
        });

        if self.config.scale {
            let means = imputed.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(3));
            let stds = imputed.std_axis(Axis(0), 0.0);
            for j in 0..NUMERIC_COLUMNS.len() {
                self.means[j] = means[j];
                // Constant columns are centred but not divided
                self.stds[j] = if stds[j] > 1e-10 { stds[j] } else { 1.0 };
            }
        }

        let categories: BTreeSet<String> = dataset.iter().map(zone_or_missing).collect();
        self.categories = categories.into_iter().collect();
        self.fitted = true;

        Ok(())
    }

    /// Encode one record
    pub fn transform_record(&self, record: &Record) -> RiskResult<Array1<f64>> {
        if !self.fitted {
            return Err(RiskError::Training("preprocessor used before fit".to_string()));
        }

        let mut row = Array1::zeros(self.n_features());
        for j in 0..NUMERIC_COLUMNS.len() {
            let value = raw_numeric(record, j).unwrap_or(self.fill_values[j]);
            row[j] = if self.config.scale {
                (value - self.means[j]) / self.stds[j]
            } else {
                value
            };
        }

        // Unknown zones leave every indicator at zero
        let zone = zone_or_missing(record);
        if let Ok(pos) = self.categories.binary_search(&zone) {
            row[NUMERIC_COLUMNS.len() + pos] = 1.0;
        }

        Ok(row)
    }

    /// Encode a dataset into an (n_samples x n_features) matrix
    pub fn transform(&self, dataset: &Dataset) -> RiskResult<Array2<f64>> {
        let mut matrix = Array2::zeros((dataset.len(), self.n_features()));
        for (i, record) in dataset.iter().enumerate() {
            matrix.row_mut(i).assign(&self.transform_record(record)?);
        }
        Ok(matrix)
    }

    pub fn fit_transform(&mut self, dataset: &Dataset) -> RiskResult<Array2<f64>> {
        self.fit(dataset)?;
        self.transform(dataset)
    }
}

fn raw_numeric(record: &Record, column: usize) -> Option<f64> {
    match column {
        0 => Some(record.people_count as f64),
        1 => record.movement_speed,
        2 => record.density_sqm,
        _ => None,
    }
}

fn zone_or_missing(record: &Record) -> String {
    record
        .area_zone
        .clone()
        .unwrap_or_else(|| MISSING_CATEGORY.to_string())
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
