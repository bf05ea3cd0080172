mod aggregator;
mod cohort;
mod estimator;
mod projection;

pub use aggregator::{
    AggregateProjection, HistoricalSeriesProvider, PopulationAggregator, VillageResolver,
    VitalProjection,
};
pub use cohort::CohortAggregator;
pub use estimator::{GrowthRateEstimator, GrowthRates};
pub use projection::{
    project, project_range, project_years, GrowthMethod, GrowthParameters, NegativeValuePolicy,
    Projector, TimeSpec, DEFAULT_MAX_RANGE_YEARS,
};
