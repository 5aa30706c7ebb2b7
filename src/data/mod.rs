//! Data structures and CSV handling
//!
//! Provides the CCTV record type, the dataset container and the synthetic
//! data generator.

mod dataset;
mod generator;
mod record;

pub use dataset::{train_split_len, Dataset, LoadReport, MalformedPolicy, Split};
pub use generator::{DataGenerator, GeneratorConfig};
pub use record::{
    Record, RiskLevel, AREA_ZONE, DENSITY_SQM, HEADER, KNOWN_ZONES, MOVEMENT_SPEED, PEOPLE_COUNT,
    RISK_LEVEL,
};
