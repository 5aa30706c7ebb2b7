//! Dataset of CCTV records: CSV loading, saving and splitting

use super::record::{Record, RiskLevel, HEADER};
use crate::error::{RiskError, RiskResult};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// What to do with a row that fails to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Stop at the first malformed row
    #[default]
    Fail,
    /// Keep going and collect malformed rows in the load report
    Skip,
}

/// Ordered collection of records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub records: Vec<Record>,
}

/// Train/test split result
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
}

/// Outcome of loading a CSV file
#[derive(Debug)]
pub struct LoadReport {
    pub dataset: Dataset,
    /// Rows dropped because `People_Count` was empty
    pub skipped_empty: usize,
    /// Rows rejected under [`MalformedPolicy::Skip`]
    pub rejected: Vec<RiskError>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Labels in record order
    pub fn labels(&self) -> Vec<RiskLevel> {
        self.records.iter().map(|r| r.risk_level).collect()
    }

    /// Count of records per risk level, in display order
    pub fn label_distribution(&self) -> [(RiskLevel, usize); RiskLevel::COUNT] {
        let mut counts = [0usize; RiskLevel::COUNT];
        for record in &self.records {
            counts[record.risk_level.index()] += 1;
        }
        RiskLevel::ALL.map(|level| (level, counts[level.index()]))
    }

    /// Create a subset of the dataset by indices
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
        }
    }

    /// Shuffle, then cut at `floor(train_ratio * n)`.
    ///
    /// A `None` seed draws the shuffle from OS entropy.
    pub fn train_test_split(&self, train_ratio: f64, seed: Option<u64>) -> Split {
        let mut rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut records = self.records.clone();
        records.shuffle(&mut rng);

        let train_size = train_split_len(records.len(), train_ratio);
        let test = records.split_off(train_size);

        Split {
            train: Dataset::new(records),
            test: Dataset::new(test),
        }
    }

    /// Load from a CSV file with the canonical header
    pub fn load_csv(path: &Path, policy: MalformedPolicy) -> RiskResult<LoadReport> {
        if !path.exists() {
            return Err(RiskError::MissingDataFile {
                path: path.to_path_buf(),
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)?;

        let found: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
        if found.iter().map(String::as_str).ne(HEADER.iter().copied()) {
            return Err(RiskError::InvalidHeader {
                expected: HEADER.iter().map(|s| s.to_string()).collect(),
                found,
            });
        }

        let mut records = Vec::new();
        let mut skipped_empty = 0;
        let mut rejected = Vec::new();

        for (i, result) in reader.byte_records().enumerate() {
            let row = i + 1;
            let parsed = decode_row(row, result?).and_then(|fields| Record::from_fields(row, &fields));

            match parsed {
                Ok(Some(record)) => records.push(record),
                Ok(None) => skipped_empty += 1,
                Err(err) => match policy {
                    MalformedPolicy::Fail => return Err(err),
                    MalformedPolicy::Skip => {
                        warn!("Skipping row: {}", err);
                        rejected.push(err);
                    }
                },
            }
        }

        info!(
            "Loaded {} records from {:?} ({} empty, {} rejected)",
            records.len(),
            path,
            skipped_empty,
            rejected.len()
        );

        Ok(LoadReport {
            dataset: Dataset::new(records),
            skipped_empty,
            rejected,
        })
    }

    /// Save to a CSV file with the canonical header
    pub fn save_csv(&self, path: &Path) -> RiskResult<()> {
        let mut writer = csv::Writer::from_path(path)?;

        writer.write_record(HEADER)?;
        for record in &self.records {
            writer.write_record(record.to_fields())?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Decode a raw row, reporting invalid UTF-8 as a malformed field
fn decode_row(row: usize, bytes: csv::ByteRecord) -> RiskResult<csv::StringRecord> {
    csv::StringRecord::from_byte_record(bytes).map_err(|err| {
        let index = err.utf8_error().field();
        let field = HEADER.get(index).copied().unwrap_or("<extra>");
        let value = err
            .into_byte_record()
            .get(index)
            .map(|raw| String::from_utf8_lossy(raw).into_owned())
            .unwrap_or_default();
        RiskError::malformed(row, field, value)
    })
}

/// Size of the training partition for `n` records
pub fn train_split_len(n: usize, train_ratio: f64) -> usize {
    ((train_ratio * n as f64).floor() as usize).min(n)
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
