#![no_main]

use libfuzzer_sys::fuzz_target;
use population_forecaster::io::read_cohorts_csv_from_bytes;

fuzz_target!(|data: &[u8]| {
    let _ = read_cohorts_csv_from_bytes(data);
});
