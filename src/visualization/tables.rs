use std::collections::BTreeSet;

use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, ContentArrangement, Table};

use crate::analysis::{AggregateProjection, GrowthParameters, GrowthRates, VitalProjection};
use crate::models::{CohortSummary, UnresolvedContribution, TOTAL_KEY};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn heading(output: &mut String, title: &str, width: usize) {
    output.push_str(&format!("\n{}\n", title.bold().green()));
    output.push_str(&format!("{}\n", "=".repeat(width)));
}

/// Format a growth-method projection as a year-by-method table.
pub fn format_projection_table(projection: &AggregateProjection) -> String {
    let mut output = String::new();
    heading(&mut output, "Population Projection", 60);
    output.push_str(&format!(
        "{}\n",
        format!(
            "Base population: {} | Subdistricts: {}",
            projection
                .contributions
                .iter()
                .fold(0u64, |acc, c| acc.saturating_add(c.base_population)),
            projection.contributions.len()
        )
        .dimmed()
    ));

    let mut table = new_table();
    let mut header = vec!["Year".to_string()];
    header.extend(projection.series.keys().map(|m| m.to_string()));
    table.set_header(header);

    let years: BTreeSet<i32> = projection
        .series
        .values()
        .flat_map(|s| s.keys().copied())
        .collect();
    for year in years {
        let mut row = vec![Cell::new(year)];
        for series in projection.series.values() {
            row.push(Cell::new(
                series
                    .get(&year)
                    .map(|v| format!("{v:.1}"))
                    .unwrap_or_default(),
            ));
        }
        table.add_row(row);
    }

    output.push_str(&format!("{table}"));
    output.push_str(&format_unresolved_warnings(&projection.unresolved));
    output
}

/// Print a growth-method projection table.
pub fn print_projection_table(projection: &AggregateProjection) {
    print!("{}", format_projection_table(projection));
}

/// Format a vital-rate projection table.
pub fn format_vital_table(projection: &VitalProjection) -> String {
    let mut output = String::new();
    heading(&mut output, "Demographic Projection", 50);
    output.push_str(&format!(
        "{}\n",
        format!(
            "Net annual growth: {:.4}% (birth {:.4}, death {:.4}, emigration {:.4}, immigration {:.4})",
            projection.rates.net_growth() * 100.0,
            projection.rates.birth,
            projection.rates.death,
            projection.rates.emigration,
            projection.rates.immigration
        )
        .dimmed()
    ));

    let mut table = new_table();
    table.set_header(vec!["Year", "Population"]);
    for (year, value) in &projection.series {
        table.add_row(vec![Cell::new(year), Cell::new(format!("{value:.1}"))]);
    }

    output.push_str(&format!("{table}"));
    output.push_str(&format_unresolved_warnings(&projection.unresolved));
    output
}

/// Print a vital-rate projection table.
pub fn print_vital_table(projection: &VitalProjection) {
    print!("{}", format_vital_table(projection));
}

/// Format one year's cohort breakdown. The total row comes last.
pub fn format_cohort_table(summary: &CohortSummary) -> String {
    let mut output = String::new();
    heading(&mut output, &format!("Cohort Breakdown {}", summary.year), 50);

    if summary.is_empty() {
        output.push_str("  No cohort data for this year.\n");
        return output;
    }

    let mut table = new_table();
    table.set_header(vec!["Age Group", "Male", "Female", "Total"]);
    for (group, counts) in summary.age_groups() {
        table.add_row(vec![
            Cell::new(group),
            Cell::new(counts.male),
            Cell::new(counts.female),
            Cell::new(counts.total),
        ]);
    }
    if let Some(total) = summary.total() {
        table.add_row(vec![
            Cell::new(TOTAL_KEY.to_uppercase()),
            Cell::new(total.male),
            Cell::new(total.female),
            Cell::new(total.total),
        ]);
    }

    output.push_str(&format!("{table}"));
    if summary.unclassified_population > 0 {
        output.push_str(&format!(
            "\n{}\n",
            format!(
                "{} people had an unrecognised gender and are not counted",
                summary.unclassified_population
            )
            .yellow()
        ));
    }
    output
}

/// Print one year's cohort breakdown.
pub fn print_cohort_table(summary: &CohortSummary) {
    print!("{}", format_cohort_table(summary));
}

/// Format the fitted growth parameters of a subdistrict.
pub fn format_growth_rates_table(rates: &GrowthRates) -> String {
    let mut output = String::new();
    heading(
        &mut output,
        &format!("Growth Parameters: Subdistrict {}", rates.subdistrict_code),
        60,
    );

    let mut table = new_table();
    table.set_header(vec!["Method", "Parameter", "Value"]);
    for params in rates.iter() {
        let method = params.method().to_string();
        match params {
            GrowthParameters::Arithmetic { mean_increment } => {
                table.add_row(vec![
                    Cell::new(&method),
                    Cell::new("Mean decadal increment"),
                    Cell::new(format!("{mean_increment:.3}")),
                ]);
            }
            GrowthParameters::Geometric { mean_ratio } => {
                table.add_row(vec![
                    Cell::new(&method),
                    Cell::new("Mean decadal ratio"),
                    Cell::new(format!("{mean_ratio:.5}")),
                ]);
            }
            GrowthParameters::Incremental {
                mean_increment,
                mean_incremental_increase,
            } => {
                table.add_row(vec![
                    Cell::new(&method),
                    Cell::new("Mean decadal increment"),
                    Cell::new(format!("{mean_increment:.3}")),
                ]);
                table.add_row(vec![
                    Cell::new(""),
                    Cell::new("Mean incremental increase"),
                    Cell::new(format!("{mean_incremental_increase:.3}")),
                ]);
            }
            GrowthParameters::Exponential { growth_constant } => {
                table.add_row(vec![
                    Cell::new(&method),
                    Cell::new("Growth constant (per year)"),
                    Cell::new(format!("{growth_constant:.6}")),
                ]);
            }
        }
    }

    output.push_str(&format!("{table}"));
    output
}

/// Print the fitted growth parameters of a subdistrict.
pub fn print_growth_rates_table(rates: &GrowthRates) {
    print!("{}", format_growth_rates_table(rates));
}

/// Format the parts of a request left out of an aggregate. Empty when nothing was dropped.
pub fn format_unresolved_warnings(unresolved: &[UnresolvedContribution]) -> String {
    if unresolved.is_empty() {
        return String::new();
    }
    let mut output = format!(
        "\n{}\n",
        format!("Partial result: {} selection(s) excluded", unresolved.len())
            .yellow()
            .bold()
    );
    for u in unresolved {
        output.push_str(&format!("  {} {}\n", "-".yellow(), u.reason));
    }
    output
}

/// Print the parts of a request left out of an aggregate.
pub fn print_unresolved_warnings(unresolved: &[UnresolvedContribution]) {
    print!("{}", format_unresolved_warnings(unresolved));
}

/// Format a code/name listing of administrative units.
pub fn format_location_table(title: &str, rows: &[(u32, &str)]) -> String {
    let mut output = String::new();
    heading(&mut output, title, 40);

    let mut table = new_table();
    table.set_header(vec!["Code", "Name"]);
    for (code, name) in rows {
        table.add_row(vec![Cell::new(code), Cell::new(name)]);
    }

    output.push_str(&format!("{table}"));
    output
}

/// Print a code/name listing of administrative units.
pub fn print_location_table(title: &str, rows: &[(u32, &str)]) {
    print!("{}", format_location_table(title, rows));
}
