#![no_main]

use libfuzzer_sys::fuzz_target;
use population_forecaster::{io::read_series_csv_from_bytes, GrowthRateEstimator};

fuzz_target!(|data: &[u8]| {
    if let Ok(series) = read_series_csv_from_bytes(data) {
        for s in &series {
            let _ = GrowthRateEstimator::estimate_all(s);
        }
    }
});
