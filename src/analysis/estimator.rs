use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::ForecastError;
use crate::models::{HistoricalSeries, CENSUS_YEARS};

use super::projection::{GrowthMethod, GrowthParameters};

/// Parameters for every growth method, fitted to one subdistrict's series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthRates {
    pub subdistrict_code: u32,
    pub arithmetic: GrowthParameters,
    pub geometric: GrowthParameters,
    pub incremental: GrowthParameters,
    pub exponential: GrowthParameters,
}

impl GrowthRates {
    pub fn get(&self, method: GrowthMethod) -> GrowthParameters {
        match method {
            GrowthMethod::Arithmetic => self.arithmetic,
            GrowthMethod::Geometric => self.geometric,
            GrowthMethod::Incremental => self.incremental,
            GrowthMethod::Exponential => self.exponential,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = GrowthParameters> + '_ {
        GrowthMethod::ALL.into_iter().map(|m| self.get(m))
    }
}

/// Derives growth parameters from a decadal census series.
pub struct GrowthRateEstimator;

impl GrowthRateEstimator {
    /// Fit one method's parameters.
    pub fn estimate(
        series: &HistoricalSeries,
        method: GrowthMethod,
    ) -> Result<GrowthParameters, ForecastError> {
        let values = series.values_f64();
        match method {
            GrowthMethod::Arithmetic => Ok(GrowthParameters::Arithmetic {
                mean_increment: increments(&values).iter().mean(),
            }),
            GrowthMethod::Geometric => Ok(GrowthParameters::Geometric {
                mean_ratio: mean_ratio(series.subdistrict_code, &values)?,
            }),
            GrowthMethod::Incremental => {
                let deltas = increments(&values);
                let second: Vec<f64> = deltas.windows(2).map(|w| w[1] - w[0]).collect();
                Ok(GrowthParameters::Incremental {
                    mean_increment: deltas.iter().mean(),
                    mean_incremental_increase: second.iter().mean(),
                })
            }
            GrowthMethod::Exponential => Ok(GrowthParameters::Exponential {
                growth_constant: growth_constant(series.subdistrict_code, &values)?,
            }),
        }
    }

    /// Fit all four methods. Fails if any of them cannot be fitted.
    pub fn estimate_all(series: &HistoricalSeries) -> Result<GrowthRates, ForecastError> {
        Ok(GrowthRates {
            subdistrict_code: series.subdistrict_code,
            arithmetic: Self::estimate(series, GrowthMethod::Arithmetic)?,
            geometric: Self::estimate(series, GrowthMethod::Geometric)?,
            incremental: Self::estimate(series, GrowthMethod::Incremental)?,
            exponential: Self::estimate(series, GrowthMethod::Exponential)?,
        })
    }
}

fn increments(values: &[f64; 7]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

fn mean_ratio(code: u32, values: &[f64; 7]) -> Result<f64, ForecastError> {
    let mut ratios = Vec::with_capacity(6);
    for (i, w) in values.windows(2).enumerate() {
        if w[0] == 0.0 {
            return Err(ForecastError::Arithmetic(format!(
                "Subdistrict {code}: population is zero in {}, growth ratio undefined",
                CENSUS_YEARS[i]
            )));
        }
        ratios.push(w[1] / w[0]);
    }
    Ok(ratios.iter().geometric_mean())
}

fn growth_constant(code: u32, values: &[f64; 7]) -> Result<f64, ForecastError> {
    let (first, last) = (values[0], values[6]);
    if first == 0.0 || last == 0.0 {
        return Err(ForecastError::Arithmetic(format!(
            "Subdistrict {code}: exponential growth constant needs non-zero 1951 and 2011 populations"
        )));
    }
    let span = f64::from(CENSUS_YEARS[6] - CENSUS_YEARS[0]);
    Ok((last / first).ln() / span)
}
