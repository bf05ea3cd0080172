use std::path::Path;

use serde::Serialize;

use crate::error::ForecastError;

use super::dataset::{CensusDataset, CensusTables};

/// Read a census dataset from a JSON file.
pub fn read_json(path: impl AsRef<Path>) -> Result<CensusDataset, ForecastError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let tables: CensusTables = serde_json::from_str(&content)?;
    CensusDataset::from_tables(tables)
}

/// Read a census dataset from JSON bytes.
pub fn read_json_from_bytes(data: &[u8]) -> Result<CensusDataset, ForecastError> {
    let content = std::str::from_utf8(data)
        .map_err(|e| ForecastError::ParseError(format!("Invalid UTF-8: {e}")))?;
    let tables: CensusTables = serde_json::from_str(content)?;
    CensusDataset::from_tables(tables)
}

/// Write a census dataset to a JSON file.
pub fn write_json(
    dataset: &CensusDataset,
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), ForecastError> {
    write_json_value(dataset.tables(), path, pretty)
}

/// Serialize any value (a projection, a cohort summary) to a JSON file.
pub fn write_json_value<T: Serialize + ?Sized>(
    value: &T,
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), ForecastError> {
    let content = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    std::fs::write(path.as_ref(), content)?;
    Ok(())
}
