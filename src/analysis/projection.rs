use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ForecastError;
use crate::models::VitalRates;

/// Classical growth method fitted to a decadal census series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GrowthMethod {
    Arithmetic,
    Geometric,
    Incremental,
    Exponential,
}

impl GrowthMethod {
    pub const ALL: [GrowthMethod; 4] = [
        GrowthMethod::Arithmetic,
        GrowthMethod::Geometric,
        GrowthMethod::Incremental,
        GrowthMethod::Exponential,
    ];
}

impl std::fmt::Display for GrowthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrowthMethod::Arithmetic => write!(f, "Arithmetic"),
            GrowthMethod::Geometric => write!(f, "Geometric"),
            GrowthMethod::Incremental => write!(f, "Incremental"),
            GrowthMethod::Exponential => write!(f, "Exponential"),
        }
    }
}

impl std::str::FromStr for GrowthMethod {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "arithmetic" | "arith" => Ok(GrowthMethod::Arithmetic),
            "geometric" | "geo" => Ok(GrowthMethod::Geometric),
            "incremental" | "inc" => Ok(GrowthMethod::Incremental),
            "exponential" | "exp" => Ok(GrowthMethod::Exponential),
            _ => Err(ForecastError::ParseError(format!(
                "Unknown growth method: '{s}'. Use: arithmetic, geometric, incremental, or exponential"
            ))),
        }
    }
}

/// Parameters fitted for one growth method.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GrowthParameters {
    /// P = P0 + X̄·n
    Arithmetic {
        /// Mean absolute decadal increment
        mean_increment: f64,
    },
    /// P = P0 · r̄ⁿ
    Geometric {
        /// Geometric mean of the decadal growth ratios
        mean_ratio: f64,
    },
    /// P = P0 + n·X̄ + n(n+1)/2 · Ȳ
    Incremental {
        mean_increment: f64,
        /// Mean second difference of the decadal series
        mean_incremental_increase: f64,
    },
    /// P = P0 · e^(k·t)
    Exponential {
        /// Continuous growth constant per year
        growth_constant: f64,
    },
}

impl GrowthParameters {
    pub fn method(&self) -> GrowthMethod {
        match self {
            GrowthParameters::Arithmetic { .. } => GrowthMethod::Arithmetic,
            GrowthParameters::Geometric { .. } => GrowthMethod::Geometric,
            GrowthParameters::Incremental { .. } => GrowthMethod::Incremental,
            GrowthParameters::Exponential { .. } => GrowthMethod::Exponential,
        }
    }
}

/// Anything that can carry a base population from one year to another.
pub trait Projector {
    fn project_forward(&self, base_population: f64, from_year: i32, to_year: i32) -> f64;
}

impl Projector for GrowthParameters {
    fn project_forward(&self, base_population: f64, from_year: i32, to_year: i32) -> f64 {
        let years = year_span(from_year, to_year);
        // Fractional decades; sub-decade targets are not rounded.
        let n = years / 10.0;

        match *self {
            GrowthParameters::Arithmetic { mean_increment } => base_population + mean_increment * n,
            GrowthParameters::Geometric { mean_ratio } => base_population * mean_ratio.powf(n),
            GrowthParameters::Incremental {
                mean_increment,
                mean_incremental_increase,
            } => {
                base_population
                    + n * mean_increment
                    + (n * (n + 1.0) / 2.0) * mean_incremental_increase
            }
            GrowthParameters::Exponential { growth_constant } => {
                base_population * (growth_constant * years).exp()
            }
        }
    }
}

impl Projector for VitalRates {
    /// Annual compounding from `from_year`; every target is computed from the base,
    /// never from a previously projected year.
    fn project_forward(&self, base_population: f64, from_year: i32, to_year: i32) -> f64 {
        base_population * (1.0 + self.net_growth()).powf(year_span(from_year, to_year))
    }
}

/// Signed distance between two years, widened so no pair of `i32` years can overflow.
fn year_span(from_year: i32, to_year: i32) -> f64 {
    (i64::from(to_year) - i64::from(from_year)) as f64
}

/// What to do with a projected value below zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeValuePolicy {
    /// Return the extrapolated value unchanged
    #[default]
    Keep,
    /// Floor every projected value at zero
    ClampToZero,
}

impl NegativeValuePolicy {
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            NegativeValuePolicy::Keep => value,
            NegativeValuePolicy::ClampToZero => value.max(0.0),
        }
    }
}

/// Longest range, in years, accepted unless a caller sets its own limit.
pub const DEFAULT_MAX_RANGE_YEARS: u32 = 500;

/// The years a request asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeSpec {
    Single(i32),
    Range { start: i32, end: i32 },
}

impl TimeSpec {
    pub fn range(start: i32, end: i32) -> Result<Self, ForecastError> {
        Self::range_within(start, end, DEFAULT_MAX_RANGE_YEARS)
    }

    /// A range of at most `max_years` years, both ends included.
    pub fn range_within(start: i32, end: i32, max_years: u32) -> Result<Self, ForecastError> {
        if start > end {
            return Err(ForecastError::InvalidInput(format!(
                "start_year ({start}) cannot be greater than end_year ({end})"
            )));
        }
        let span = i64::from(end) - i64::from(start) + 1;
        if span > i64::from(max_years) {
            return Err(ForecastError::InvalidInput(format!(
                "Range {start}..={end} spans {span} years; at most {max_years} are allowed"
            )));
        }
        Ok(TimeSpec::Range { start, end })
    }

    /// Build from optional request fields. A single year wins over a range.
    ///
    /// # Examples
    ///
    /// ```
    /// use population_forecaster::analysis::TimeSpec;
    ///
    /// assert_eq!(TimeSpec::from_parts(Some(2025), None, None).unwrap(), TimeSpec::Single(2025));
    /// assert!(TimeSpec::from_parts(None, Some(2030), None).is_err());
    /// ```
    pub fn from_parts(
        year: Option<i32>,
        start_year: Option<i32>,
        end_year: Option<i32>,
    ) -> Result<Self, ForecastError> {
        Self::from_parts_within(year, start_year, end_year, DEFAULT_MAX_RANGE_YEARS)
    }

    /// As [`TimeSpec::from_parts`], with a caller-chosen cap on the range length.
    pub fn from_parts_within(
        year: Option<i32>,
        start_year: Option<i32>,
        end_year: Option<i32>,
        max_years: u32,
    ) -> Result<Self, ForecastError> {
        match (year, start_year, end_year) {
            (Some(y), _, _) => Ok(TimeSpec::Single(y)),
            (None, Some(start), Some(end)) => TimeSpec::range_within(start, end, max_years),
            _ => Err(ForecastError::InvalidInput(
                "Either 'year' or both 'start_year' and 'end_year' must be provided".to_string(),
            )),
        }
    }

    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        match *self {
            TimeSpec::Single(y) => y..=y,
            TimeSpec::Range { start, end } => start..=end,
        }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.years().contains(&year)
    }

    pub fn is_single(&self) -> bool {
        matches!(self, TimeSpec::Single(_))
    }
}

/// Project `base_population` from `base_year` to `target_year`.
pub fn project<P: Projector + ?Sized>(
    projector: &P,
    base_year: i32,
    base_population: f64,
    target_year: i32,
    policy: NegativeValuePolicy,
) -> f64 {
    policy.apply(projector.project_forward(base_population, base_year, target_year))
}

/// Project every integer year in `[start_year, end_year]`.
pub fn project_range<P: Projector + ?Sized>(
    projector: &P,
    base_year: i32,
    base_population: f64,
    start_year: i32,
    end_year: i32,
    policy: NegativeValuePolicy,
) -> Result<BTreeMap<i32, f64>, ForecastError> {
    let time = TimeSpec::range(start_year, end_year)?;
    Ok(project_years(projector, base_year, base_population, &time, policy))
}

/// Project every year named by `time`.
pub fn project_years<P: Projector + ?Sized>(
    projector: &P,
    base_year: i32,
    base_population: f64,
    time: &TimeSpec,
    policy: NegativeValuePolicy,
) -> BTreeMap<i32, f64> {
    time.years()
        .map(|year| {
            (
                year,
                project(projector, base_year, base_population, year, policy),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    const KEEP: NegativeValuePolicy = NegativeValuePolicy::Keep;

    #[test]
    fn test_arithmetic_one_decade() {
        let p = GrowthParameters::Arithmetic {
            mean_increment: 77.0 / 6.0,
        };
        assert_approx_eq!(project(&p, 2011, 177.0, 2021, KEEP), 189.8333, 1e-3);
    }

    #[test]
    fn test_arithmetic_fractional_decade() {
        let p = GrowthParameters::Arithmetic {
            mean_increment: 10.0,
        };
        assert_approx_eq!(project(&p, 2011, 100.0, 2016, KEEP), 105.0);
    }

    #[test]
    fn test_geometric_one_decade() {
        let p = GrowthParameters::Geometric { mean_ratio: 1.1 };
        assert_approx_eq!(project(&p, 2011, 1000.0, 2031, KEEP), 1210.0, 1e-9);
    }

    #[test]
    fn test_incremental_formula() {
        let p = GrowthParameters::Incremental {
            mean_increment: 10.0,
            mean_incremental_increase: 2.0,
        };
        // n = 2: 100 + 2*10 + 3*2
        assert_approx_eq!(project(&p, 2011, 100.0, 2031, KEEP), 126.0);
    }

    #[test]
    fn test_exponential_uses_years_not_decades() {
        let p = GrowthParameters::Exponential {
            growth_constant: 0.01,
        };
        assert_approx_eq!(
            project(&p, 2011, 100.0, 2021, KEEP),
            100.0 * (0.1f64).exp(),
            1e-9
        );
    }

    #[test]
    fn test_target_before_base_year_extrapolates() {
        let p = GrowthParameters::Arithmetic {
            mean_increment: 50.0,
        };
        assert_approx_eq!(project(&p, 2011, 100.0, 1991, KEEP), 0.0);
        assert_approx_eq!(project(&p, 2011, 100.0, 1981, KEEP), -50.0);
    }

    #[test]
    fn test_clamp_policy() {
        let p = GrowthParameters::Arithmetic {
            mean_increment: -100.0,
        };
        assert!(project(&p, 2011, 50.0, 2031, KEEP) < 0.0);
        assert_eq!(
            project(&p, 2011, 50.0, 2031, NegativeValuePolicy::ClampToZero),
            0.0
        );
    }

    #[test]
    fn test_clamp_leaves_positive_values() {
        assert_eq!(NegativeValuePolicy::ClampToZero.apply(12.5), 12.5);
        assert_eq!(NegativeValuePolicy::Keep.apply(-3.0), -3.0);
    }

    #[test]
    fn test_vital_rates_compounding() {
        let rates = VitalRates::from_per_ten_thousand(2200.0, 700.0, 100.0, 50.0);
        assert_approx_eq!(project(&rates, 2011, 1000.0, 2012, KEEP), 1145.0, 1e-9);
        assert_approx_eq!(
            project(&rates, 2011, 1000.0, 2013, KEEP),
            1000.0 * 1.145 * 1.145,
            1e-9
        );
    }

    #[test]
    fn test_vital_rates_overlapping_ranges_agree() {
        let rates = VitalRates::from_per_ten_thousand(180.0, 70.0, 10.0, 5.0);
        let a = project_range(&rates, 2011, 5000.0, 2015, 2030, KEEP).unwrap();
        let b = project_range(&rates, 2011, 5000.0, 2025, 2040, KEEP).unwrap();
        for year in 2025..=2030 {
            assert_eq!(a[&year], b[&year]);
        }
    }

    #[test]
    fn test_range_length_and_keys() {
        let p = GrowthParameters::Geometric { mean_ratio: 1.05 };
        let out = project_range(&p, 2011, 100.0, 2020, 2025, KEEP).unwrap();
        assert_eq!(out.len(), 6);
        assert_eq!(*out.keys().next().unwrap(), 2020);
        assert_eq!(*out.keys().last().unwrap(), 2025);
    }

    #[test]
    fn test_single_point_range_matches_single_year() {
        let params = [
            GrowthParameters::Arithmetic {
                mean_increment: 12.0,
            },
            GrowthParameters::Geometric { mean_ratio: 1.2 },
            GrowthParameters::Incremental {
                mean_increment: 12.0,
                mean_incremental_increase: 1.5,
            },
            GrowthParameters::Exponential {
                growth_constant: 0.02,
            },
        ];
        for p in &params {
            let single = project(p, 2011, 500.0, 2027, KEEP);
            let range = project_range(p, 2011, 500.0, 2027, 2027, KEEP).unwrap();
            assert_eq!(range.len(), 1);
            assert_eq!(range[&2027], single, "{}", p.method());
        }
    }

    #[test]
    fn test_inverted_range_rejected() {
        let p = GrowthParameters::Geometric { mean_ratio: 1.05 };
        let err = project_range(&p, 2011, 100.0, 2030, 2020, KEEP).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));
    }

    #[test]
    fn test_time_spec_from_parts() {
        assert_eq!(
            TimeSpec::from_parts(Some(2030), Some(2020), Some(2025)).unwrap(),
            TimeSpec::Single(2030)
        );
        assert_eq!(
            TimeSpec::from_parts(None, Some(2020), Some(2025)).unwrap(),
            TimeSpec::Range {
                start: 2020,
                end: 2025
            }
        );
        assert!(TimeSpec::from_parts(None, None, None).is_err());
        assert!(TimeSpec::from_parts(None, Some(2026), Some(2025)).is_err());
    }

    #[test]
    fn test_time_spec_years() {
        assert_eq!(TimeSpec::Single(2025).years().count(), 1);
        let r = TimeSpec::range(2020, 2029).unwrap();
        assert_eq!(r.years().count(), 10);
        assert!(r.contains(2025));
        assert!(!r.contains(2030));
    }

    #[test]
    fn test_extreme_target_years_do_not_overflow() {
        let p = GrowthParameters::Arithmetic {
            mean_increment: 10.0,
        };
        let back = project(&p, 2011, 100.0, i32::MIN, KEEP);
        let decades = (i64::from(i32::MIN) - 2011) as f64 / 10.0;
        assert_approx_eq!(back, 100.0 + 10.0 * decades, 1.0);
        assert!(back < 0.0);
        assert!(project(&p, 2011, 100.0, i32::MAX, KEEP) > 0.0);

        let rates = VitalRates::from_per_ten_thousand(100.0, 0.0, 0.0, 0.0);
        assert!(project(&rates, 2011, 100.0, i32::MIN, KEEP) < 100.0);
    }

    #[test]
    fn test_oversized_range_rejected() {
        let err = TimeSpec::from_parts(None, Some(i32::MIN), Some(i32::MAX)).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));
        assert!(TimeSpec::range_within(2011, 2020, 10).is_ok());
        assert!(TimeSpec::range_within(2011, 2021, 10).is_err());
        assert!(TimeSpec::from_parts_within(None, Some(2011), Some(2111), 50).is_err());
        assert_eq!(
            TimeSpec::from_parts_within(Some(i32::MIN), None, None, 1).unwrap(),
            TimeSpec::Single(i32::MIN)
        );
    }

    #[test]
    fn test_method_parse_and_display() {
        for m in GrowthMethod::ALL {
            assert_eq!(m.to_string().parse::<GrowthMethod>().unwrap(), m);
        }
        assert_eq!("exp".parse::<GrowthMethod>().unwrap(), GrowthMethod::Exponential);
        assert!("logistic".parse::<GrowthMethod>().is_err());
    }

    #[test]
    fn test_parameters_method_tag() {
        let p = GrowthParameters::Incremental {
            mean_increment: 1.0,
            mean_incremental_increase: 0.0,
        };
        assert_eq!(p.method(), GrowthMethod::Incremental);
    }

    #[test]
    fn test_growth_parameters_json_roundtrip() {
        let p = GrowthParameters::Exponential {
            growth_constant: 0.0123,
        };
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("Exponential"));
        let back: GrowthParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_policy_serde_names() {
        let p: NegativeValuePolicy = serde_json::from_str("\"clamp_to_zero\"").unwrap();
        assert_eq!(p, NegativeValuePolicy::ClampToZero);
        assert_eq!(NegativeValuePolicy::default(), NegativeValuePolicy::Keep);
    }
}
