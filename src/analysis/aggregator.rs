use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ForecastError;
use crate::models::{
    Contribution, HistoricalSeries, LocationRequest, LocationScope, UnresolvedContribution,
    VitalRates, BASE_YEAR,
};

use super::estimator::GrowthRateEstimator;
use super::projection::{project_years, GrowthMethod, NegativeValuePolicy, TimeSpec};

/// Source of decadal census series, keyed by subdistrict.
pub trait HistoricalSeriesProvider: Send + Sync {
    /// Returns `ForecastError::NotFound` when no series exists for the subdistrict.
    fn historical_series(&self, subdistrict_code: u32) -> Result<HistoricalSeries, ForecastError>;
}

/// Maps a village to the subdistrict it belongs to.
pub trait VillageResolver: Send + Sync {
    fn subdistrict_of(&self, village_code: u32) -> Option<u32>;
}

/// Year → population series per growth method, summed over the resolved contributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateProjection {
    pub series: BTreeMap<GrowthMethod, BTreeMap<i32, f64>>,
    pub contributions: Vec<Contribution>,
    pub unresolved: Vec<UnresolvedContribution>,
}

impl AggregateProjection {
    /// True when some part of the requested scope is missing from the sums.
    pub fn is_partial(&self) -> bool {
        !self.unresolved.is_empty()
    }

    pub fn method(&self, method: GrowthMethod) -> Option<&BTreeMap<i32, f64>> {
        self.series.get(&method)
    }
}

/// Year → population series under a vital-rate projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalProjection {
    pub series: BTreeMap<i32, f64>,
    pub rates: VitalRates,
    pub contributions: Vec<Contribution>,
    pub unresolved: Vec<UnresolvedContribution>,
}

impl VitalProjection {
    pub fn is_partial(&self) -> bool {
        !self.unresolved.is_empty()
    }
}

impl LocationScope {
    /// Turn a request's village and subdistrict selections into contributions.
    ///
    /// Villages, when present, are grouped by subdistrict (the resolver's mapping first,
    /// then the id the caller sent) and their populations summed per group. Otherwise each
    /// selected subdistrict is one contribution carrying its own base population.
    pub fn resolve(
        request: &LocationRequest,
        resolver: &dyn VillageResolver,
    ) -> Result<LocationScope, ForecastError> {
        if request.is_empty() {
            return Err(ForecastError::InvalidInput(
                "No villages or subdistricts supplied".to_string(),
            ));
        }

        let mut groups: BTreeMap<u32, Contribution> = BTreeMap::new();
        let mut unresolved = Vec::new();

        if !request.villages.is_empty() {
            for village in &request.villages {
                let Some(code) = resolver.subdistrict_of(village.id).or(village.subdistrict_id)
                else {
                    unresolved.push(UnresolvedContribution {
                        subdistrict_code: None,
                        village_codes: vec![village.id],
                        reason: format!("Village {} has no known subdistrict", village.id),
                    });
                    continue;
                };
                let entry = groups.entry(code).or_insert_with(|| Contribution {
                    subdistrict_code: code,
                    base_population: 0,
                    village_codes: Vec::new(),
                });
                entry.base_population = add_population(entry.base_population, village.population, code)?;
                entry.village_codes.push(village.id);
            }
        } else {
            for sub in &request.subdistricts {
                let Some(population) = sub.population else {
                    unresolved.push(UnresolvedContribution {
                        subdistrict_code: Some(sub.id),
                        village_codes: Vec::new(),
                        reason: format!("Subdistrict {} has no base population", sub.id),
                    });
                    continue;
                };
                let entry = groups.entry(sub.id).or_insert_with(|| Contribution {
                    subdistrict_code: sub.id,
                    base_population: 0,
                    village_codes: Vec::new(),
                });
                entry.base_population = add_population(entry.base_population, population, sub.id)?;
            }
        }

        for u in &unresolved {
            warn!(reason = %u.reason, "Selection left out of location scope");
        }

        LocationScope::new(groups.into_values().collect(), unresolved)
    }
}

fn add_population(current: u64, extra: u64, subdistrict_code: u32) -> Result<u64, ForecastError> {
    current.checked_add(extra).ok_or_else(|| {
        ForecastError::InvalidInput(format!(
            "Population of subdistrict {subdistrict_code} exceeds {}",
            u64::MAX
        ))
    })
}

/// Fans projections out over a scope's contributions and sums them per year.
pub struct PopulationAggregator<'a> {
    provider: &'a dyn HistoricalSeriesProvider,
    base_year: i32,
    policy: NegativeValuePolicy,
}

impl<'a> PopulationAggregator<'a> {
    pub fn new(provider: &'a dyn HistoricalSeriesProvider) -> Self {
        Self {
            provider,
            base_year: BASE_YEAR,
            policy: NegativeValuePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: NegativeValuePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Project every contribution under each requested method and sum the results.
    ///
    /// A contribution whose series is missing is dropped from the sums and listed in
    /// `unresolved`. Any other failure aborts the whole aggregate.
    pub fn aggregate(
        &self,
        scope: &LocationScope,
        time: &TimeSpec,
        methods: &[GrowthMethod],
    ) -> Result<AggregateProjection, ForecastError> {
        if methods.is_empty() {
            return Err(ForecastError::InvalidInput(
                "At least one growth method must be requested".to_string(),
            ));
        }

        // One lookup per contribution; scope resolution already merged duplicate subdistricts.
        let outcomes: Vec<_> = scope
            .contributions()
            .par_iter()
            .map(|c| (c, self.project_contribution(c, time, methods)))
            .collect();

        let mut series: BTreeMap<GrowthMethod, BTreeMap<i32, f64>> = BTreeMap::new();
        let mut contributions = Vec::new();
        let mut unresolved = scope.unresolved().to_vec();

        for (contribution, outcome) in outcomes {
            match outcome {
                Ok(per_method) => {
                    for (method, years) in per_method {
                        let total = series.entry(method).or_default();
                        for (year, value) in years {
                            *total.entry(year).or_insert(0.0) += value;
                        }
                    }
                    contributions.push(contribution.clone());
                }
                Err(ForecastError::NotFound(reason)) => {
                    warn!(
                        subdistrict = contribution.subdistrict_code,
                        %reason,
                        "Contribution excluded from aggregate"
                    );
                    unresolved.push(UnresolvedContribution {
                        subdistrict_code: Some(contribution.subdistrict_code),
                        village_codes: contribution.village_codes.clone(),
                        reason,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        if contributions.is_empty() {
            let reasons: Vec<&str> = unresolved.iter().map(|u| u.reason.as_str()).collect();
            return Err(ForecastError::NotFound(format!(
                "No contribution could be resolved: {}",
                reasons.join("; ")
            )));
        }

        Ok(AggregateProjection {
            series,
            contributions,
            unresolved,
        })
    }

    /// Compound the scope's combined base population under vital rates.
    /// No historical series are needed, so every contribution resolves.
    pub fn aggregate_vital(
        &self,
        scope: &LocationScope,
        time: &TimeSpec,
        rates: &VitalRates,
    ) -> VitalProjection {
        let base = scope.total_base_population() as f64;
        debug!(
            base_population = base,
            net_growth = rates.net_growth(),
            "Projecting with vital rates"
        );
        VitalProjection {
            series: project_years(rates, self.base_year, base, time, self.policy),
            rates: *rates,
            contributions: scope.contributions().to_vec(),
            unresolved: scope.unresolved().to_vec(),
        }
    }

    fn project_contribution(
        &self,
        contribution: &Contribution,
        time: &TimeSpec,
        methods: &[GrowthMethod],
    ) -> Result<BTreeMap<GrowthMethod, BTreeMap<i32, f64>>, ForecastError> {
        let series = self.provider.historical_series(contribution.subdistrict_code)?;
        let base = contribution.base_population as f64;
        debug!(
            subdistrict = contribution.subdistrict_code,
            base_population = base,
            "Projecting contribution"
        );

        let mut out = BTreeMap::new();
        for &method in methods {
            let params = GrowthRateEstimator::estimate(&series, method)?;
            out.insert(
                method,
                project_years(&params, self.base_year, base, time, self.policy),
            );
        }
        Ok(out)
    }
}
