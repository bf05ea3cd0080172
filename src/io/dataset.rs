use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::analysis::{HistoricalSeriesProvider, TimeSpec, VillageResolver};
use crate::error::ForecastError;
use crate::models::{
    CohortRecord, CohortRow, District, HistoricalSeries, LocationFilter, LocationRequest, State,
    Subdistrict, SubdistrictSelection, Village, VillageSelection,
};

/// Raw census tables as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CensusTables {
    #[serde(default)]
    pub states: Vec<State>,
    #[serde(default)]
    pub districts: Vec<District>,
    #[serde(default)]
    pub subdistricts: Vec<Subdistrict>,
    #[serde(default)]
    pub villages: Vec<Village>,
    #[serde(default)]
    pub series: Vec<HistoricalSeries>,
    #[serde(default)]
    pub cohorts: Vec<CohortRow>,
}

/// Read-only, indexed census data backing the projection engine.
#[derive(Debug, Clone, Default)]
pub struct CensusDataset {
    tables: CensusTables,
    series_index: HashMap<u32, usize>,
    village_index: HashMap<u32, usize>,
}

impl CensusDataset {
    /// Index a set of tables. Duplicate series or village codes are rejected.
    pub fn from_tables(tables: CensusTables) -> Result<Self, ForecastError> {
        let mut series_index = HashMap::with_capacity(tables.series.len());
        for (i, s) in tables.series.iter().enumerate() {
            if series_index.insert(s.subdistrict_code, i).is_some() {
                return Err(ForecastError::InvalidInput(format!(
                    "Duplicate historical series for subdistrict {}",
                    s.subdistrict_code
                )));
            }
        }

        let mut village_index = HashMap::with_capacity(tables.villages.len());
        for (i, v) in tables.villages.iter().enumerate() {
            if village_index.insert(v.village_code, i).is_some() {
                return Err(ForecastError::InvalidInput(format!(
                    "Duplicate village code {}",
                    v.village_code
                )));
            }
        }

        Ok(Self {
            tables,
            series_index,
            village_index,
        })
    }

    pub fn tables(&self) -> &CensusTables {
        &self.tables
    }

    pub fn series(&self, subdistrict_code: u32) -> Option<&HistoricalSeries> {
        self.series_index
            .get(&subdistrict_code)
            .map(|&i| &self.tables.series[i])
    }

    pub fn village(&self, village_code: u32) -> Option<&Village> {
        self.village_index
            .get(&village_code)
            .map(|&i| &self.tables.villages[i])
    }

    /// All states, sorted by name.
    pub fn states(&self) -> Vec<&State> {
        let mut out: Vec<&State> = self.tables.states.iter().collect();
        out.sort_by(|a, b| a.state_name.cmp(&b.state_name));
        out
    }

    /// Districts of a state, sorted by name.
    pub fn districts(&self, state_code: u32) -> Vec<&District> {
        let mut out: Vec<&District> = self
            .tables
            .districts
            .iter()
            .filter(|d| d.state_code == state_code)
            .collect();
        out.sort_by(|a, b| a.district_name.cmp(&b.district_name));
        out
    }

    /// Subdistricts of any of the given districts, sorted by name.
    pub fn subdistricts(&self, district_codes: &[u32]) -> Vec<&Subdistrict> {
        let mut out: Vec<&Subdistrict> = self
            .tables
            .subdistricts
            .iter()
            .filter(|s| district_codes.contains(&s.district_code))
            .collect();
        out.sort_by(|a, b| a.subdistrict_name.cmp(&b.subdistrict_name));
        out
    }

    /// Villages of any of the given subdistricts, sorted by name.
    pub fn villages(&self, subdistrict_codes: &[u32]) -> Vec<&Village> {
        let mut out: Vec<&Village> = self
            .tables
            .villages
            .iter()
            .filter(|v| subdistrict_codes.contains(&v.subdistrict_code))
            .collect();
        out.sort_by(|a, b| a.village_name.cmp(&b.village_name));
        out
    }

    /// Selections for stored villages, carrying their 2011 populations.
    pub fn village_selections(&self, codes: &[u32]) -> Result<Vec<VillageSelection>, ForecastError> {
        codes
            .iter()
            .map(|&code| {
                let v = self
                    .village(code)
                    .ok_or_else(|| ForecastError::NotFound(format!("Village {code}")))?;
                Ok(VillageSelection {
                    id: v.village_code,
                    subdistrict_id: Some(v.subdistrict_code),
                    population: v.population_2011,
                })
            })
            .collect()
    }

    /// Selections for whole subdistricts, with base populations filled from stored data.
    pub fn subdistrict_selections(&self, codes: &[u32]) -> Vec<SubdistrictSelection> {
        codes
            .iter()
            .map(|&id| SubdistrictSelection {
                id,
                population: self.subdistrict_population(id),
            })
            .collect()
    }

    /// Fill in base populations the caller left out.
    pub fn fill_missing_populations(&self, request: &mut LocationRequest) {
        for sub in request.subdistricts.iter_mut().filter(|s| s.population.is_none()) {
            sub.population = self.subdistrict_population(sub.id);
        }
    }

    /// 2011 population of a subdistrict: its census series if present, else the sum of
    /// its villages. `None` when neither exists or the village sum overflows.
    pub fn subdistrict_population(&self, code: u32) -> Option<u64> {
        if let Some(series) = self.series(code) {
            return Some(series.base_population());
        }
        let mut villages = self
            .tables
            .villages
            .iter()
            .filter(|v| v.subdistrict_code == code)
            .peekable();
        villages.peek()?;
        villages.try_fold(0u64, |acc, v| acc.checked_add(v.population_2011))
    }

    /// Cohort records matching every supplied location filter and a requested year.
    pub fn cohort_records(
        &self,
        filter: &LocationFilter,
        time: &TimeSpec,
    ) -> Result<Vec<CohortRecord>, ForecastError> {
        filter.validate()?;
        Ok(self
            .tables
            .cohorts
            .iter()
            .filter(|row| time.contains(row.year) && filter.matches(row))
            .map(CohortRow::to_record)
            .collect())
    }
}

impl HistoricalSeriesProvider for CensusDataset {
    fn historical_series(&self, subdistrict_code: u32) -> Result<HistoricalSeries, ForecastError> {
        self.series(subdistrict_code).cloned().ok_or_else(|| {
            ForecastError::NotFound(format!(
                "Historical series for subdistrict {subdistrict_code}"
            ))
        })
    }
}

impl VillageResolver for CensusDataset {
    fn subdistrict_of(&self, village_code: u32) -> Option<u32> {
        self.village(village_code).map(|v| v.subdistrict_code)
    }
}
