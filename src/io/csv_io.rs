use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ForecastError;
use crate::models::{CohortRow, CohortSummary, HistoricalSeries};

use super::dataset::{CensusDataset, CensusTables};

pub const STATES_FILE: &str = "states.csv";
pub const DISTRICTS_FILE: &str = "districts.csv";
pub const SUBDISTRICTS_FILE: &str = "subdistricts.csv";
pub const VILLAGES_FILE: &str = "villages.csv";
pub const SERIES_FILE: &str = "population_series.csv";
pub const COHORTS_FILE: &str = "cohorts.csv";

/// CSV row for a decadal census series.
#[derive(Debug, serde::Deserialize, serde::Serialize)]
struct SeriesRow {
    subdistrict_code: u32,
    region_name: Option<String>,
    population_1951: u64,
    population_1961: u64,
    population_1971: u64,
    population_1981: u64,
    population_1991: u64,
    population_2001: u64,
    population_2011: u64,
}

impl From<SeriesRow> for HistoricalSeries {
    fn from(row: SeriesRow) -> Self {
        HistoricalSeries {
            subdistrict_code: row.subdistrict_code,
            region_name: row.region_name.filter(|n| !n.is_empty()),
            values: [
                row.population_1951,
                row.population_1961,
                row.population_1971,
                row.population_1981,
                row.population_1991,
                row.population_2001,
                row.population_2011,
            ],
        }
    }
}

impl From<&HistoricalSeries> for SeriesRow {
    fn from(s: &HistoricalSeries) -> Self {
        let [p1951, p1961, p1971, p1981, p1991, p2001, p2011] = s.values;
        SeriesRow {
            subdistrict_code: s.subdistrict_code,
            region_name: s.region_name.clone(),
            population_1951: p1951,
            population_1961: p1961,
            population_1971: p1971,
            population_1981: p1981,
            population_1991: p1991,
            population_2001: p2001,
            population_2011: p2011,
        }
    }
}

fn reader<R: Read>(rdr: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(rdr)
}

fn parse_records<T: DeserializeOwned, R: Read>(rdr: R) -> Result<Vec<T>, ForecastError> {
    let mut rdr = reader(rdr);
    let mut out = Vec::new();
    for result in rdr.deserialize() {
        out.push(result?);
    }
    Ok(out)
}

/// Read one CSV table. A missing file yields an empty table.
fn read_optional_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ForecastError> {
    if !path.exists() {
        debug!(path = %path.display(), "Optional table absent");
        return Ok(Vec::new());
    }
    parse_records(std::fs::File::open(path)?)
}

/// Parse historical series rows from CSV bytes.
pub fn read_series_csv_from_bytes(data: &[u8]) -> Result<Vec<HistoricalSeries>, ForecastError> {
    let rows: Vec<SeriesRow> = parse_records(data)?;
    Ok(rows.into_iter().map(HistoricalSeries::from).collect())
}

/// Read historical series rows from a CSV file.
pub fn read_series_csv(path: impl AsRef<Path>) -> Result<Vec<HistoricalSeries>, ForecastError> {
    let rows: Vec<SeriesRow> = parse_records(std::fs::File::open(path.as_ref())?)?;
    Ok(rows.into_iter().map(HistoricalSeries::from).collect())
}

/// Parse cohort rows from CSV bytes.
pub fn read_cohorts_csv_from_bytes(data: &[u8]) -> Result<Vec<CohortRow>, ForecastError> {
    parse_records(data)
}

/// Read a census dataset from a directory of CSV tables.
///
/// `population_series.csv` is required; the hierarchy and cohort tables are optional.
pub fn read_csv_dir(dir: impl AsRef<Path>) -> Result<CensusDataset, ForecastError> {
    let dir = dir.as_ref();
    let series_path = dir.join(SERIES_FILE);
    if !series_path.exists() {
        return Err(ForecastError::NotFound(format!(
            "{} not found in {}",
            SERIES_FILE,
            dir.display()
        )));
    }

    let tables = CensusTables {
        states: read_optional_table(&dir.join(STATES_FILE))?,
        districts: read_optional_table(&dir.join(DISTRICTS_FILE))?,
        subdistricts: read_optional_table(&dir.join(SUBDISTRICTS_FILE))?,
        villages: read_optional_table(&dir.join(VILLAGES_FILE))?,
        series: read_series_csv(&series_path)?,
        cohorts: read_optional_table(&dir.join(COHORTS_FILE))?,
    };
    debug!(
        series = tables.series.len(),
        villages = tables.villages.len(),
        cohorts = tables.cohorts.len(),
        "Loaded CSV dataset"
    );
    CensusDataset::from_tables(tables)
}

/// Write a dataset's tables as CSV files into `dir`.
pub fn write_csv_dir(dataset: &CensusDataset, dir: impl AsRef<Path>) -> Result<(), ForecastError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let tables = dataset.tables();

    write_table(&tables.states, &dir.join(STATES_FILE))?;
    write_table(&tables.districts, &dir.join(DISTRICTS_FILE))?;
    write_table(&tables.subdistricts, &dir.join(SUBDISTRICTS_FILE))?;
    write_table(&tables.villages, &dir.join(VILLAGES_FILE))?;
    let series: Vec<SeriesRow> = tables.series.iter().map(SeriesRow::from).collect();
    write_table(&series, &dir.join(SERIES_FILE))?;
    write_table(&tables.cohorts, &dir.join(COHORTS_FILE))?;
    Ok(())
}

fn write_table<T: serde::Serialize>(rows: &[T], path: &Path) -> Result<(), ForecastError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write labelled year → population columns as CSV: one `year` column, then one per label.
pub fn write_series_csv<W: Write>(
    columns: &[(String, &BTreeMap<i32, f64>)],
    writer: W,
) -> Result<(), ForecastError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["year".to_string()];
    header.extend(columns.iter().map(|(label, _)| label.clone()));
    wtr.write_record(&header)?;

    let years: std::collections::BTreeSet<i32> = columns
        .iter()
        .flat_map(|(_, series)| series.keys().copied())
        .collect();
    for year in years {
        let mut record = vec![year.to_string()];
        for (_, series) in columns {
            record.push(series.get(&year).map(|v| v.to_string()).unwrap_or_default());
        }
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write cohort summaries as flat `year,age_group,male,female,total` rows.
pub fn write_cohort_csv<W: Write>(summaries: &[CohortSummary], writer: W) -> Result<(), ForecastError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["year", "age_group", "male", "female", "total"])?;
    for summary in summaries {
        for (group, counts) in &summary.data {
            wtr.write_record([
                summary.year.to_string(),
                group.clone(),
                counts.male.to_string(),
                counts.female.to_string(),
                counts.total.to_string(),
            ])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::dataset::tests::sample_dataset;

    const SERIES_CSV: &str = "\
subdistrict_code,region_name,population_1951,population_1961,population_1971,population_1981,population_1991,population_2001,population_2011
900, Pindra ,100,110,121,133,146,161,177
901,,50,50,50,50,50,50,50
";

    #[test]
    fn test_read_series_from_bytes() {
        let series = read_series_csv_from_bytes(SERIES_CSV.as_bytes()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].region_name.as_deref(), Some("Pindra"));
        assert_eq!(series[0].base_population(), 177);
        assert_eq!(series[1].region_name, None);
    }

    #[test]
    fn test_negative_population_rejected() {
        let bad = SERIES_CSV.replace("100,110", "-100,110");
        assert!(matches!(
            read_series_csv_from_bytes(bad.as_bytes()).unwrap_err(),
            ForecastError::Csv(_)
        ));
    }

    #[test]
    fn test_read_cohorts_with_blank_codes() {
        let csv = "\
state_code,district_code,subdistrict_code,village_code,year,age_group,gender,population
9,,,,2021,0-4,Male,50
";
        let rows = read_cohorts_csv_from_bytes(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].state_code, Some(9));
        assert_eq!(rows[0].district_code, None);
        assert_eq!(rows[0].population, 50);
    }

    #[test]
    fn test_dir_roundtrip() {
        let ds = sample_dataset();
        let dir = tempfile::tempdir().unwrap();
        write_csv_dir(&ds, dir.path()).unwrap();
        let loaded = read_csv_dir(dir.path()).unwrap();
        assert_eq!(loaded.tables(), ds.tables());
    }

    #[test]
    fn test_dir_without_series_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_csv_dir(dir.path()).unwrap_err(),
            ForecastError::NotFound(_)
        ));
    }

    #[test]
    fn test_dir_with_only_series() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SERIES_FILE), SERIES_CSV).unwrap();
        let ds = read_csv_dir(dir.path()).unwrap();
        assert!(ds.series(901).is_some());
        assert!(ds.tables().villages.is_empty());
    }

    #[test]
    fn test_write_series_csv() {
        let a: BTreeMap<i32, f64> = [(2021, 1.5), (2022, 2.0)].into_iter().collect();
        let b: BTreeMap<i32, f64> = [(2022, 3.0)].into_iter().collect();
        let mut out = Vec::new();
        write_series_csv(
            &[("Arithmetic".to_string(), &a), ("Geometric".to_string(), &b)],
            &mut out,
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "year,Arithmetic,Geometric\n2021,1.5,\n2022,2,3\n");
    }

    #[test]
    fn test_write_cohort_csv() {
        use crate::models::GenderCounts;
        let mut summary = CohortSummary::empty(2021);
        summary.data.insert(
            "0-4".to_string(),
            GenderCounts {
                male: 50,
                female: 48,
                total: 98,
            },
        );
        let mut out = Vec::new();
        write_cohort_csv(&[summary, CohortSummary::empty(2022)], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "year,age_group,male,female,total\n2021,0-4,50,48,98\n");
    }
}
