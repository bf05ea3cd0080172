use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// A state in the administrative hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub state_code: u32,
    pub state_name: String,
}

/// A district within a state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct District {
    pub district_code: u32,
    pub district_name: String,
    pub state_code: u32,
}

/// A subdistrict within a district. Historical series are keyed by subdistrict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subdistrict {
    pub subdistrict_code: u32,
    pub subdistrict_name: String,
    pub district_code: u32,
}

/// A village with its 2011 census population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Village {
    pub village_code: u32,
    pub village_name: String,
    pub population_2011: u64,
    pub subdistrict_code: u32,
}

/// A village picked by the caller. The subdistrict id is advisory: the resolver's
/// mapping wins when it knows the village.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VillageSelection {
    pub id: u32,
    #[serde(default, rename = "subDistrictId", alias = "subdistrict_id")]
    pub subdistrict_id: Option<u32>,
    pub population: u64,
}

/// A subdistrict picked by the caller, optionally with an explicit base population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubdistrictSelection {
    pub id: u32,
    #[serde(default)]
    pub population: Option<u64>,
}

/// The raw location part of a projection request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationRequest {
    #[serde(default)]
    pub villages: Vec<VillageSelection>,
    #[serde(default)]
    pub subdistricts: Vec<SubdistrictSelection>,
}

impl LocationRequest {
    pub fn is_empty(&self) -> bool {
        self.villages.is_empty() && self.subdistricts.is_empty()
    }
}

/// One additive term of an aggregate projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub subdistrict_code: u32,
    pub base_population: u64,
    /// Villages folded into this contribution; empty for a whole-subdistrict contribution
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub village_codes: Vec<u32>,
}

/// A contribution that was left out of an aggregate, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedContribution {
    pub subdistrict_code: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub village_codes: Vec<u32>,
    pub reason: String,
}

/// The resolved set of contributions for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationScope {
    contributions: Vec<Contribution>,
    /// Selections that could not be attributed to any subdistrict
    unresolved: Vec<UnresolvedContribution>,
}

impl LocationScope {
    /// Wrap a set of contributions. An empty set, or one whose combined population
    /// does not fit in a `u64`, is rejected.
    pub fn new(
        contributions: Vec<Contribution>,
        unresolved: Vec<UnresolvedContribution>,
    ) -> Result<Self, ForecastError> {
        if contributions.is_empty() {
            return Err(ForecastError::InvalidInput(
                "Location scope resolved to no contributions".to_string(),
            ));
        }
        contributions
            .iter()
            .try_fold(0u64, |acc, c| acc.checked_add(c.base_population))
            .ok_or_else(|| {
                ForecastError::InvalidInput(format!(
                    "Combined base population of the scope exceeds {}",
                    u64::MAX
                ))
            })?;
        Ok(Self {
            contributions,
            unresolved,
        })
    }

    pub fn contributions(&self) -> &[Contribution] {
        &self.contributions
    }

    pub fn unresolved(&self) -> &[UnresolvedContribution] {
        &self.unresolved
    }

    /// Sum of every contribution's base population. `new` guarantees the sum fits.
    pub fn total_base_population(&self) -> u64 {
        self.contributions
            .iter()
            .fold(0u64, |acc, c| acc.saturating_add(c.base_population))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_scope_rejected() {
        let err = LocationScope::new(vec![], vec![]).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));
    }

    #[test]
    fn test_total_base_population() {
        let scope = LocationScope::new(
            vec![
                Contribution {
                    subdistrict_code: 1,
                    base_population: 300,
                    village_codes: vec![10, 11],
                },
                Contribution {
                    subdistrict_code: 2,
                    base_population: 700,
                    village_codes: vec![],
                },
            ],
            vec![],
        )
        .unwrap();
        assert_eq!(scope.total_base_population(), 1000);
        assert_eq!(scope.contributions().len(), 2);
    }

    #[test]
    fn test_scope_total_overflow_rejected() {
        let contribution = |code, population| Contribution {
            subdistrict_code: code,
            base_population: population,
            village_codes: vec![],
        };
        let err = LocationScope::new(vec![contribution(1, u64::MAX), contribution(2, 1)], vec![])
            .unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));

        let scope = LocationScope::new(vec![contribution(1, u64::MAX)], vec![]).unwrap();
        assert_eq!(scope.total_base_population(), u64::MAX);
    }

    #[test]
    fn test_village_selection_accepts_frontend_field_name() {
        let json = r#"{"id": 5, "name": "Rampur", "subDistrictId": 77, "population": 1200}"#;
        let sel: VillageSelection = serde_json::from_str(json).unwrap();
        assert_eq!(sel.subdistrict_id, Some(77));
        assert_eq!(sel.population, 1200);
    }

    #[test]
    fn test_village_selection_snake_case_alias() {
        let json = r#"{"id": 5, "subdistrict_id": 78, "population": 10}"#;
        let sel: VillageSelection = serde_json::from_str(json).unwrap();
        assert_eq!(sel.subdistrict_id, Some(78));
    }

    #[test]
    fn test_location_request_is_empty() {
        assert!(LocationRequest::default().is_empty());
        let req = LocationRequest {
            villages: vec![],
            subdistricts: vec![SubdistrictSelection {
                id: 1,
                population: None,
            }],
        };
        assert!(!req.is_empty());
    }
}
