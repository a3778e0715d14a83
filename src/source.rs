// 📂 Record Sources - where the four record sets come from
// The pipeline only needs fully materialized records; how they are fetched
// is up to the source.

use crate::records::RecordSet;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::io;
use std::path::{Path, PathBuf};

pub const DWELLING_ATTRIBUTES_FILE: &str = "dwelling_attributes.csv";
pub const BLOCK_ATTRIBUTES_FILE: &str = "block_attributes.csv";
pub const PROPERTY_ELEMENTS_FILE: &str = "property_elements.csv";
pub const TENANCIES_FILE: &str = "tenancies.csv";

/// Supplies one consistent snapshot of all four record sets
pub trait RecordSource {
    fn load(&self) -> Result<RecordSet>;
}

impl RecordSource for RecordSet {
    fn load(&self) -> Result<RecordSet> {
        Ok(self.clone())
    }
}

/// Reads the four record sets from CSV exports in one directory
pub struct CsvSource {
    dir: PathBuf,
}

impl CsvSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CsvSource { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RecordSource for CsvSource {
    fn load(&self) -> Result<RecordSet> {
        Ok(RecordSet {
            dwelling_attributes: load_csv(&self.dir.join(DWELLING_ATTRIBUTES_FILE))?,
            block_attributes: load_csv(&self.dir.join(BLOCK_ATTRIBUTES_FILE))?,
            elements: load_csv(&self.dir.join(PROPERTY_ELEMENTS_FILE))?,
            tenancies: load_csv(&self.dir.join(TENANCIES_FILE))?,
        })
    }
}

/// Deserialize every row of a CSV file
pub fn load_csv<T: DeserializeOwned>(csv_path: &Path) -> Result<Vec<T>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file: {}", csv_path.display()))?;
    read_csv(file).with_context(|| format!("Failed to load {}", csv_path.display()))
}

/// Deserialize every row from any CSV reader
pub fn read_csv<T: DeserializeOwned, R: io::Read>(reader: R) -> Result<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut records = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let record: T = result.with_context(|| format!("Failed to deserialize row {}", line + 2))?;
        records.push(record);
    }

    Ok(records)
}

// ============================================================================
// TESTS
// ============================================================================
