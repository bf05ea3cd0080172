use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// Key of the synthetic grand-total entry in a cohort summary.
pub const TOTAL_KEY: &str = "total";

/// Gender of a cohort record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(ForecastError::ParseError(format!("Unknown gender: '{s}'"))),
        }
    }
}

/// A single cohort count, already filtered by location.
///
/// `gender` is kept as recorded; it is normalised when folded into a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRecord {
    pub age_group: String,
    pub gender: String,
    pub population: u64,
    pub year: i32,
}

/// A stored cohort count tagged with the location it was recorded for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRow {
    pub state_code: Option<u32>,
    pub district_code: Option<u32>,
    pub subdistrict_code: Option<u32>,
    pub village_code: Option<u32>,
    pub year: i32,
    pub age_group: String,
    pub gender: String,
    pub population: u64,
}

impl CohortRow {
    pub fn to_record(&self) -> CohortRecord {
        CohortRecord {
            age_group: self.age_group.clone(),
            gender: self.gender.clone(),
            population: self.population,
            year: self.year,
        }
    }
}

/// Location filters for a cohort query. Every supplied filter must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationFilter {
    #[serde(default)]
    pub state: Option<u32>,
    #[serde(default)]
    pub district: Option<u32>,
    #[serde(default)]
    pub subdistrict: Option<u32>,
    #[serde(default)]
    pub villages: Vec<u32>,
}

impl LocationFilter {
    /// Reject a filter that names no location at all.
    pub fn validate(&self) -> Result<(), ForecastError> {
        if self.state.is_none()
            && self.district.is_none()
            && self.subdistrict.is_none()
            && self.villages.is_empty()
        {
            return Err(ForecastError::InvalidInput(
                "At least one location parameter (state, district, subdistrict, or village) is required"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn matches(&self, row: &CohortRow) -> bool {
        fn check(filter: Option<u32>, value: Option<u32>) -> bool {
            filter.map_or(true, |f| value == Some(f))
        }
        check(self.state, row.state_code)
            && check(self.district, row.district_code)
            && check(self.subdistrict, row.subdistrict_code)
            && (self.villages.is_empty()
                || row.village_code.is_some_and(|v| self.villages.contains(&v)))
    }
}

/// Male/female/total counts for one age group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenderCounts {
    pub male: u64,
    pub female: u64,
    pub total: u64,
}

impl GenderCounts {
    /// Add `population` to one gender. Fails, leaving the counts untouched, if any
    /// count would exceed `u64::MAX`.
    pub fn add(&mut self, gender: Gender, population: u64) -> Result<(), ForecastError> {
        let (male, female) = match gender {
            Gender::Male => (self.male.checked_add(population), Some(self.female)),
            Gender::Female => (Some(self.male), self.female.checked_add(population)),
        };
        let (Some(male), Some(female)) = (male, female) else {
            return Err(count_overflow());
        };
        let total = male.checked_add(female).ok_or_else(count_overflow)?;
        *self = GenderCounts { male, female, total };
        Ok(())
    }
}

fn count_overflow() -> ForecastError {
    ForecastError::InvalidInput(format!("Cohort count exceeds {}", u64::MAX))
}

/// Age/gender breakdown for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    pub year: i32,
    /// Counts per age group, plus a `"total"` entry when any record was counted
    pub data: BTreeMap<String, GenderCounts>,
    /// Population on records whose gender was neither male nor female
    #[serde(default, skip_serializing_if = "is_zero")]
    pub unclassified_population: u64,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

impl CohortSummary {
    pub fn empty(year: i32) -> Self {
        Self {
            year,
            data: BTreeMap::new(),
            unclassified_population: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The grand-total entry, if any record was counted.
    pub fn total(&self) -> Option<&GenderCounts> {
        self.data.get(TOTAL_KEY)
    }

    /// Age-group entries, excluding the grand total.
    pub fn age_groups(&self) -> impl Iterator<Item = (&String, &GenderCounts)> {
        self.data.iter().filter(|(k, _)| k.as_str() != TOTAL_KEY)
    }
}
