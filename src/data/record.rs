//! Crowd observation records and risk labels

use crate::error::{RiskError, RiskResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const PEOPLE_COUNT: &str = "People_Count";
pub const MOVEMENT_SPEED: &str = "Movement_Speed";
pub const DENSITY_SQM: &str = "Density_sqm";
pub const AREA_ZONE: &str = "Area_Zone";
pub const RISK_LEVEL: &str = "StampedeRiskLevel";

/// Header row of the CCTV data file, in column order
pub const HEADER: [&str; 5] = [PEOPLE_COUNT, MOVEMENT_SPEED, DENSITY_SQM, AREA_ZONE, RISK_LEVEL];

/// Zones observed in the CCTV feeds
pub const KNOWN_ZONES: [&str; 3] = ["Entry", "Main_Hall", "Exit"];

/// Stampede risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// All levels in display order
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    /// Number of classes
    pub const COUNT: usize = 3;

    /// Position in display order, used as the class index by the models
    pub fn index(self) -> usize {
        match self {
            RiskLevel::Low => 0,
            RiskLevel::Medium => 1,
            RiskLevel::High => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(RiskLevel::Low),
            "Medium" => Ok(RiskLevel::Medium),
            "High" => Ok(RiskLevel::High),
            other => Err(format!("unknown risk level: {}", other)),
        }
    }
}

/// One CCTV crowd observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// 1-based data row in the source file (header excluded)
    pub row: usize,
    /// Number of people in frame
    pub people_count: u32,
    /// Average movement speed in m/s
    pub movement_speed: Option<f64>,
    /// Persons per square metre
    pub density_sqm: Option<f64>,
    /// Zone the camera covers
    pub area_zone: Option<String>,
    /// Labelled risk level
    pub risk_level: RiskLevel,
}

impl Record {
    /// Build a fully populated record.
    ///
    /// Numeric arguments follow [`RiskScorer::classify`](crate::scorer::RiskScorer::classify):
    /// people, density, speed.
    pub fn new(
        row: usize,
        people_count: u32,
        density_sqm: f64,
        movement_speed: f64,
        area_zone: &str,
        risk_level: RiskLevel,
    ) -> Self {
        Self {
            row,
            people_count,
            movement_speed: Some(movement_speed),
            density_sqm: Some(density_sqm),
            area_zone: Some(area_zone.to_string()),
            risk_level,
        }
    }

    /// Parse one CSV row.
    ///
    /// Returns `Ok(None)` when `People_Count` is empty: such rows are discarded.
    /// Empty speed, density or zone cells become `None`; anything that is
    /// present but not parseable is a `MalformedRecord`.
    pub fn from_fields(row: usize, fields: &csv::StringRecord) -> RiskResult<Option<Self>> {
        let cell = |i: usize| fields.get(i).map(str::trim).unwrap_or("");

        let people_raw = cell(0);
        if people_raw.is_empty() {
            return Ok(None);
        }
        let people_count = people_raw
            .parse::<u32>()
            .map_err(|_| RiskError::malformed(row, PEOPLE_COUNT, people_raw))?;

        let movement_speed = parse_optional_f64(row, MOVEMENT_SPEED, cell(1))?;
        let density_sqm = parse_optional_f64(row, DENSITY_SQM, cell(2))?;

        let zone_raw = cell(3);
        let area_zone = if zone_raw.is_empty() {
            None
        } else {
            Some(zone_raw.to_string())
        };

        let label_raw = cell(4);
        let risk_level = label_raw
            .parse::<RiskLevel>()
            .map_err(|_| RiskError::malformed(row, RISK_LEVEL, label_raw))?;

        Ok(Some(Self {
            row,
            people_count,
            movement_speed,
            density_sqm,
            area_zone,
            risk_level,
        }))
    }

    /// CSV cells in header order; missing values are written as empty cells
    pub fn to_fields(&self) -> [String; 5] {
        [
            self.people_count.to_string(),
            self.movement_speed.map(|v| v.to_string()).unwrap_or_default(),
            self.density_sqm.map(|v| v.to_string()).unwrap_or_default(),
            self.area_zone.clone().unwrap_or_default(),
            self.risk_level.to_string(),
        ]
    }
}

fn parse_optional_f64(row: usize, field: &'static str, raw: &str) -> RiskResult<Option<f64>> {
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(RiskError::malformed(row, field, raw)),
    }
}
