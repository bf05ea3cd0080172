mod csv_io;
pub(crate) mod dataset;
mod json_io;

use std::collections::BTreeMap;
use std::path::Path;

use crate::analysis::{AggregateProjection, VitalProjection};
use crate::error::ForecastError;

pub use csv_io::{
    read_cohorts_csv_from_bytes, read_csv_dir, read_series_csv, read_series_csv_from_bytes,
    write_cohort_csv, write_csv_dir, write_series_csv, COHORTS_FILE, DISTRICTS_FILE,
    SERIES_FILE, STATES_FILE, SUBDISTRICTS_FILE, VILLAGES_FILE,
};
pub use dataset::{CensusDataset, CensusTables};
pub use json_io::{read_json, read_json_from_bytes, write_json, write_json_value};

/// Trait for loading a census dataset.
pub trait DatasetReader {
    fn read(&self, path: &Path) -> Result<CensusDataset, ForecastError>;
}

/// Trait for exporting projection results.
pub trait ProjectionWriter {
    fn write_projection(
        &self,
        projection: &AggregateProjection,
        path: &Path,
    ) -> Result<(), ForecastError>;

    fn write_vital(&self, projection: &VitalProjection, path: &Path) -> Result<(), ForecastError>;
}

/// CSV format: a directory of tables in, one series table out.
pub struct CsvFormat;

impl DatasetReader for CsvFormat {
    fn read(&self, path: &Path) -> Result<CensusDataset, ForecastError> {
        read_csv_dir(path)
    }
}

impl ProjectionWriter for CsvFormat {
    fn write_projection(
        &self,
        projection: &AggregateProjection,
        path: &Path,
    ) -> Result<(), ForecastError> {
        write_series_csv(&projection_columns(projection), std::fs::File::create(path)?)
    }

    fn write_vital(&self, projection: &VitalProjection, path: &Path) -> Result<(), ForecastError> {
        write_series_csv(&vital_columns(projection), std::fs::File::create(path)?)
    }
}

/// JSON format reader/writer.
#[derive(Default)]
pub struct JsonFormat {
    pub pretty: bool,
}

impl DatasetReader for JsonFormat {
    fn read(&self, path: &Path) -> Result<CensusDataset, ForecastError> {
        read_json(path)
    }
}

impl ProjectionWriter for JsonFormat {
    fn write_projection(
        &self,
        projection: &AggregateProjection,
        path: &Path,
    ) -> Result<(), ForecastError> {
        write_json_value(projection, path, self.pretty)
    }

    fn write_vital(&self, projection: &VitalProjection, path: &Path) -> Result<(), ForecastError> {
        write_json_value(projection, path, self.pretty)
    }
}

/// Load a dataset from a CSV directory or a `.json` file.
pub fn read_dataset(path: impl AsRef<Path>) -> Result<CensusDataset, ForecastError> {
    let path = path.as_ref();
    if path.is_dir() {
        return CsvFormat.read(path);
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "json" => JsonFormat::default().read(path),
        _ => Err(ForecastError::ParseError(format!(
            "Unsupported dataset: {}. Use a directory of CSV tables or a .json file",
            path.display()
        ))),
    }
}

/// Labelled columns for a growth-method projection, in method order.
pub fn projection_columns(projection: &AggregateProjection) -> Vec<(String, &BTreeMap<i32, f64>)> {
    projection
        .series
        .iter()
        .map(|(method, series)| (method.to_string(), series))
        .collect()
}

/// The single labelled column of a vital-rate projection.
pub fn vital_columns(projection: &VitalProjection) -> Vec<(String, &BTreeMap<i32, f64>)> {
    vec![("Demographic".to_string(), &projection.series)]
}
