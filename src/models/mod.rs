mod census;
mod cohort;
mod location;
mod rates;

pub use census::{HistoricalSeries, BASE_YEAR, CENSUS_YEARS};
pub use cohort::{
    CohortRecord, CohortRow, CohortSummary, Gender, GenderCounts, LocationFilter, TOTAL_KEY,
};
pub use location::{
    Contribution, District, LocationRequest, LocationScope, State, Subdistrict,
    SubdistrictSelection, UnresolvedContribution, Village, VillageSelection,
};
pub use rates::{VitalRates, RATE_SCALE};
