use colored::Colorize;

use crate::models::CohortSummary;

const BAR_WIDTH: usize = 30;

/// Format a text population pyramid: males to the left, females to the right.
pub fn format_cohort_pyramid(summary: &CohortSummary) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "\n{}\n",
        format!("Population Pyramid {}", summary.year).bold().green()
    ));
    output.push_str(&format!("{}\n", "=".repeat(2 * BAR_WIDTH + 14)));

    if summary.is_empty() {
        output.push_str("  No data available.\n");
        return output;
    }

    let max = summary
        .age_groups()
        .map(|(_, c)| c.male.max(c.female))
        .max()
        .unwrap_or(0);

    let scale = |value: u64| -> usize {
        if max == 0 {
            0
        } else {
            ((value as f64 / max as f64) * BAR_WIDTH as f64).round() as usize
        }
    };

    output.push_str(&format!(
        "  {:>width$} {:^10} {:<width$}\n",
        "Male",
        "Age",
        "Female",
        width = BAR_WIDTH
    ));

    for (group, counts) in summary.age_groups() {
        let male = "\u{2588}".repeat(scale(counts.male));
        let female = "\u{2588}".repeat(scale(counts.female));
        output.push_str(&format!(
            "  {}{} {:^10} {}{}\n",
            " ".repeat(BAR_WIDTH - scale(counts.male)),
            male.blue(),
            group,
            female.magenta(),
            " ".repeat(BAR_WIDTH - scale(counts.female)),
        ));
    }

    output.push('\n');
    output
}

/// Print a text population pyramid.
pub fn print_cohort_pyramid(summary: &CohortSummary) {
    print!("{}", format_cohort_pyramid(summary));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GenderCounts;

    fn counts(male: u64, female: u64) -> GenderCounts {
        GenderCounts {
            male,
            female,
            total: male + female,
        }
    }

    #[test]
    fn test_pyramid_has_row_per_age_group() {
        let mut summary = CohortSummary::empty(2021);
        summary.data.insert("0-4".to_string(), counts(50, 48));
        summary.data.insert("5-9".to_string(), counts(20, 0));
        summary.data.insert("total".to_string(), counts(70, 48));
        let output = format_cohort_pyramid(&summary);
        assert!(output.contains("Population Pyramid 2021"));
        assert!(output.contains("0-4"));
        assert!(output.contains("5-9"));
        assert!(!output.contains("total"));
        // widest bar is the 50-person male cohort
        assert!(output.contains(&"\u{2588}".repeat(BAR_WIDTH)));
        assert!(!output.contains(&"\u{2588}".repeat(BAR_WIDTH + 1)));
    }

    #[test]
    fn test_pyramid_empty() {
        let output = format_cohort_pyramid(&CohortSummary::empty(2030));
        assert!(output.contains("No data available"));
    }
}
