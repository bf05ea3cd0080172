use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// Decadal census years covered by a historical series.
pub const CENSUS_YEARS: [i32; 7] = [1951, 1961, 1971, 1981, 1991, 2001, 2011];

/// Reference year every projection originates from.
pub const BASE_YEAR: i32 = 2011;

/// Decadal population counts for one subdistrict, 1951 through 2011.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    pub subdistrict_code: u32,
    /// Region name as recorded alongside the census figures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
    /// Populations in `CENSUS_YEARS` order
    pub values: [u64; 7],
}

impl HistoricalSeries {
    pub fn new(subdistrict_code: u32, values: [u64; 7]) -> Self {
        Self {
            subdistrict_code,
            region_name: None,
            values,
        }
    }

    /// Build a series from a `{year: population}` map. Every census year must be present;
    /// years outside the census grid are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use population_forecaster::models::{HistoricalSeries, CENSUS_YEARS};
    ///
    /// let map: BTreeMap<i32, u64> = CENSUS_YEARS.iter().map(|&y| (y, 100)).collect();
    /// let series = HistoricalSeries::from_census_map(7, &map).unwrap();
    /// assert_eq!(series.base_population(), 100);
    /// ```
    pub fn from_census_map(
        subdistrict_code: u32,
        map: &BTreeMap<i32, u64>,
    ) -> Result<Self, ForecastError> {
        let mut values = [0u64; 7];
        for (slot, year) in values.iter_mut().zip(CENSUS_YEARS) {
            *slot = *map.get(&year).ok_or_else(|| {
                ForecastError::InvalidInput(format!(
                    "Subdistrict {subdistrict_code}: census year {year} missing from historical series"
                ))
            })?;
        }
        Ok(Self::new(subdistrict_code, values))
    }

    /// Populations as floating point, in census-year order.
    pub fn values_f64(&self) -> [f64; 7] {
        self.values.map(|v| v as f64)
    }

    /// The 2011 census population.
    pub fn base_population(&self) -> u64 {
        self.values[6]
    }

    /// Population recorded at a census year, if `year` is on the census grid.
    pub fn population_at(&self, year: i32) -> Option<u64> {
        CENSUS_YEARS
            .iter()
            .position(|&y| y == year)
            .map(|i| self.values[i])
    }

    /// The series as a `{year: population}` map.
    pub fn to_census_map(&self) -> BTreeMap<i32, u64> {
        CENSUS_YEARS.into_iter().zip(self.values).collect()
    }
}
