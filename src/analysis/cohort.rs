use std::collections::BTreeMap;

use tracing::warn;

use crate::error::ForecastError;
use crate::models::{CohortRecord, CohortSummary, Gender, GenderCounts, TOTAL_KEY};

use super::projection::TimeSpec;

/// Folds location-filtered cohort records into per-year age/gender breakdowns.
pub struct CohortAggregator;

impl CohortAggregator {
    /// One summary per requested year.
    ///
    /// A single-year request always yields exactly one summary, empty when no record
    /// matches. A range yields summaries only for years that have at least one record.
    pub fn summarize(
        records: &[CohortRecord],
        time: &TimeSpec,
    ) -> Result<Vec<CohortSummary>, ForecastError> {
        let mut by_year: BTreeMap<i32, Vec<&CohortRecord>> = BTreeMap::new();
        for record in records.iter().filter(|r| time.contains(r.year)) {
            by_year.entry(record.year).or_default().push(record);
        }

        match *time {
            TimeSpec::Single(year) => {
                let group = by_year.remove(&year).unwrap_or_default();
                Ok(vec![Self::fold_year(year, group)?])
            }
            TimeSpec::Range { .. } => by_year
                .into_iter()
                .map(|(year, group)| Self::fold_year(year, group))
                .collect(),
        }
    }

    /// Fold every record for `year`.
    pub fn summarize_year(
        records: &[CohortRecord],
        year: i32,
    ) -> Result<CohortSummary, ForecastError> {
        Self::fold_year(year, records.iter().filter(|r| r.year == year))
    }

    fn fold_year<'r>(
        year: i32,
        records: impl IntoIterator<Item = &'r CohortRecord>,
    ) -> Result<CohortSummary, ForecastError> {
        let mut summary = CohortSummary::empty(year);

        for record in records {
            if record.age_group == TOTAL_KEY {
                return Err(ForecastError::InvalidInput(format!(
                    "Age group '{TOTAL_KEY}' is reserved for the grand total (year {year})"
                )));
            }
            match record.gender.parse::<Gender>() {
                Ok(gender) => summary
                    .data
                    .entry(record.age_group.clone())
                    .or_default()
                    .add(gender, record.population)?,
                Err(_) => {
                    warn!(
                        year,
                        age_group = %record.age_group,
                        gender = %record.gender,
                        population = record.population,
                        "Cohort record with unrecognised gender excluded from counts"
                    );
                    summary.unclassified_population = summary
                        .unclassified_population
                        .checked_add(record.population)
                        .ok_or_else(|| overflow(year))?;
                }
            }
        }

        // Grand total goes in after the fold so it is never counted as an age group.
        if !summary.data.is_empty() {
            let mut total = GenderCounts::default();
            for counts in summary.data.values() {
                total.add(Gender::Male, counts.male)?;
                total.add(Gender::Female, counts.female)?;
            }
            summary.data.insert(TOTAL_KEY.to_string(), total);
        }

        Ok(summary)
    }
}

fn overflow(year: i32) -> ForecastError {
    ForecastError::InvalidInput(format!("Cohort population for {year} exceeds {}", u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(age: &str, gender: &str, population: u64, year: i32) -> CohortRecord {
        CohortRecord {
            age_group: age.to_string(),
            gender: gender.to_string(),
            population,
            year,
        }
    }

    fn example() -> Vec<CohortRecord> {
        vec![
            rec("0-4", "Male", 50, 2021),
            rec("0-4", "Female", 48, 2021),
            rec("5-9", "Male", 40, 2021),
        ]
    }

    #[test]
    fn test_example_summary() {
        let s = CohortAggregator::summarize_year(&example(), 2021).unwrap();
        assert_eq!(
            s.data["0-4"],
            GenderCounts {
                male: 50,
                female: 48,
                total: 98
            }
        );
        assert_eq!(
            s.data["5-9"],
            GenderCounts {
                male: 40,
                female: 0,
                total: 40
            }
        );
        assert_eq!(
            s.total().copied(),
            Some(GenderCounts {
                male: 90,
                female: 48,
                total: 138
            })
        );
        assert_eq!(s.data.len(), 3);
    }

    #[test]
    fn test_absent_age_group_not_synthesized() {
        let s = CohortAggregator::summarize_year(&example(), 2021).unwrap();
        assert!(!s.data.contains_key("10-14"));
    }

    #[test]
    fn test_unknown_gender_excluded() {
        let mut records = example();
        records.push(rec("0-4", "", 7, 2021));
        records.push(rec("10-14", "other", 3, 2021));
        let s = CohortAggregator::summarize_year(&records, 2021).unwrap();
        assert_eq!(s.total().unwrap().total, 138);
        assert_eq!(s.unclassified_population, 10);
        assert!(!s.data.contains_key("10-14"));
    }

    #[test]
    fn test_gender_case_insensitive() {
        let records = vec![rec("0-4", "MALE", 1, 2021), rec("0-4", "female", 2, 2021)];
        let s = CohortAggregator::summarize_year(&records, 2021).unwrap();
        assert_eq!(s.data["0-4"].total, 3);
    }

    #[test]
    fn test_single_year_without_records_is_empty() {
        let out = CohortAggregator::summarize(&example(), &TimeSpec::Single(2031)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].year, 2031);
        assert!(out[0].is_empty());
        assert!(out[0].total().is_none());
    }

    #[test]
    fn test_range_skips_years_without_records() {
        let mut records = example();
        records.push(rec("0-4", "Male", 60, 2026));
        let out = CohortAggregator::summarize(&records, &TimeSpec::range(2020, 2030).unwrap()).unwrap();
        let years: Vec<i32> = out.iter().map(|s| s.year).collect();
        assert_eq!(years, vec![2021, 2026]);
    }

    #[test]
    fn test_years_are_independent() {
        let mut records = example();
        records.push(rec("0-4", "Male", 1000, 2026));
        let s = CohortAggregator::summarize_year(&records, 2021).unwrap();
        assert_eq!(s.data["0-4"].male, 50);
    }

    #[test]
    fn test_total_equals_sum_of_groups() {
        let records = vec![
            rec("0-4", "Male", 3, 2021),
            rec("5-9", "Female", 4, 2021),
            rec("80+", "Male", 5, 2021),
            rec("80+", "Female", 6, 2021),
        ];
        let s = CohortAggregator::summarize_year(&records, 2021).unwrap();
        let sum: u64 = s.age_groups().map(|(_, c)| c.total).sum();
        assert_eq!(s.total().unwrap().total, sum);
    }

    #[test]
    fn test_reserved_total_age_group_rejected() {
        let mut records = example();
        records.push(rec(TOTAL_KEY, "Male", 5, 2021));
        let err = CohortAggregator::summarize(&records, &TimeSpec::Single(2021)).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(ref m) if m.contains("reserved")));

        // Other years are unaffected.
        assert!(CohortAggregator::summarize(&records, &TimeSpec::Single(2026)).is_ok());
    }

    #[test]
    fn test_population_overflow_rejected() {
        let records = vec![
            rec("0-4", "Male", u64::MAX, 2021),
            rec("0-4", "Male", 1, 2021),
        ];
        assert!(matches!(
            CohortAggregator::summarize_year(&records, 2021),
            Err(ForecastError::InvalidInput(_))
        ));

        // Fits per group, overflows in the grand total.
        let records = vec![
            rec("0-4", "Male", u64::MAX, 2021),
            rec("5-9", "Male", 1, 2021),
        ];
        assert!(CohortAggregator::summarize_year(&records, 2021).is_err());

        let records = vec![rec("0-4", "other", u64::MAX, 2021), rec("5-9", "x", 1, 2021)];
        assert!(CohortAggregator::summarize_year(&records, 2021).is_err());
    }

    #[test]
    fn test_summarize_ignores_records_outside_range() {
        let mut records = example();
        records.push(rec("0-4", "Male", 7, 1990));
        let out = CohortAggregator::summarize(&records, &TimeSpec::range(2021, 2025).unwrap())
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].year, 2021);
    }
}
