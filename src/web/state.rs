use crate::config::ForecastConfig;
use crate::io::CensusDataset;

/// Shared, read-only server state. Requests never mutate it.
pub struct AppState {
    pub dataset: CensusDataset,
    pub config: ForecastConfig,
}

impl AppState {
    pub fn new(dataset: CensusDataset, config: ForecastConfig) -> Self {
        Self { dataset, config }
    }
}
