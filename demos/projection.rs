//! Projection example: fit growth methods to one subdistrict and project a village scope.
//!
//! Run from the project root:
//!   cargo run --example projection

use population_forecaster::analysis::{GrowthMethod, PopulationAggregator, TimeSpec};
use population_forecaster::io::{CensusDataset, CensusTables};
use population_forecaster::models::{
    District, HistoricalSeries, LocationRequest, LocationScope, State, Subdistrict, Village,
    VitalRates,
};
use population_forecaster::visualization::{
    print_growth_rates_table, print_projection_table, print_vital_table,
};
use population_forecaster::GrowthRateEstimator;

fn village(code: u32, name: &str, population: u64) -> Village {
    Village {
        village_code: code,
        village_name: name.to_string(),
        population_2011: population,
        subdistrict_code: 900,
    }
}

fn main() {
    let tables = CensusTables {
        states: vec![State {
            state_code: 9,
            state_name: "Uttar Pradesh".to_string(),
        }],
        districts: vec![District {
            district_code: 90,
            district_name: "Varanasi".to_string(),
            state_code: 9,
        }],
        subdistricts: vec![Subdistrict {
            subdistrict_code: 900,
            subdistrict_name: "Pindra".to_string(),
            district_code: 90,
        }],
        villages: vec![village(9001, "Rampur", 600), village(9002, "Babatpur", 400)],
        series: vec![HistoricalSeries::new(
            900,
            [100, 110, 121, 133, 146, 161, 177],
        )],
        cohorts: vec![],
    };
    let dataset = CensusDataset::from_tables(tables).expect("Failed to build dataset");

    let series = dataset.series(900).expect("Series for subdistrict 900");
    let rates = GrowthRateEstimator::estimate_all(series).expect("Failed to fit growth rates");
    print_growth_rates_table(&rates);

    let request = LocationRequest {
        villages: dataset
            .village_selections(&[9001, 9002])
            .expect("Unknown village"),
        subdistricts: vec![],
    };
    let scope = LocationScope::resolve(&request, &dataset).expect("Failed to resolve scope");
    let time = TimeSpec::range(2021, 2031).expect("Invalid range");
    let aggregator = PopulationAggregator::new(&dataset);

    println!("\n=== Growth Methods ===");
    match aggregator.aggregate(&scope, &time, &GrowthMethod::ALL) {
        Ok(projection) => print_projection_table(&projection),
        Err(e) => eprintln!("Projection failed: {e}"),
    }

    println!("\n=== Vital Rates ===");
    let vital = VitalRates::from_per_ten_thousand(180.0, 70.0, 15.0, 5.0);
    print_vital_table(&aggregator.aggregate_vital(&scope, &time, &vital));
}
