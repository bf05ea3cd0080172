mod tables;
mod charts;

pub use tables::{
    format_projection_table, print_projection_table,
    format_vital_table, print_vital_table,
    format_cohort_table, print_cohort_table,
    format_growth_rates_table, print_growth_rates_table,
    format_unresolved_warnings, print_unresolved_warnings,
    format_location_table, print_location_table,
};
pub use charts::{format_cohort_pyramid, print_cohort_pyramid};
