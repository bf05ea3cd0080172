pub mod analysis;
pub mod config;
pub mod error;
pub mod io;
pub mod models;
pub mod visualization;

#[cfg(feature = "web")]
pub mod web;

pub use analysis::{CohortAggregator, GrowthRateEstimator, PopulationAggregator};
pub use config::ForecastConfig;
pub use error::ForecastError;
pub use io::{CensusDataset, DatasetReader, ProjectionWriter};
pub use models::{CohortRecord, CohortSummary, HistoricalSeries, LocationScope, VitalRates};
