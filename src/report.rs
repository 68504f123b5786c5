//! Stability report for a sized unit.
//!
//! Display rounding: loads, levers and factor-of-safety fractions are shown to two
//! decimals, while the minimum weight and every utilisation percentage are truncated
//! toward zero.

use std::fmt::Write;

use serde::Serialize;

use crate::geometry::DesignVariables;
use crate::geotechnics::{load_breakdown, overturning_ratio, sliding_ratio, unit_weight, LoadEntry};
use crate::inputs::DesignInputs;

/// One row of a load table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoadRow {
    /// Load source, or `Total` for the summary row.
    pub name: String,
    /// Load in kN.
    pub load: f64,
    /// Lever arm about the toe in metres.
    pub lever: f64,
    /// Friction factor applied for sliding.
    pub friction: f64,
    /// Load times friction, in kN.
    pub sliding_force: f64,
    /// Load times lever, in kNm.
    pub moment: f64,
}

impl From<&LoadEntry> for LoadRow {
    fn from(entry: &LoadEntry) -> Self {
        Self {
            name: entry.name.to_string(),
            load: entry.load,
            lever: entry.lever,
            friction: entry.friction,
            sliding_force: entry.sliding_force(),
            moment: entry.moment(),
        }
    }
}

/// Load rows followed by their column-wise total.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoadTable {
    /// Individual load sources.
    pub rows: Vec<LoadRow>,
    /// Column-wise sum of `rows`.
    pub total: LoadRow,
}

impl LoadTable {
    /// Tabulate a group of loads.
    fn from_entries(entries: &[LoadEntry]) -> Self {
        let rows: Vec<LoadRow> = entries.iter().map(LoadRow::from).collect();
        let total = rows.iter().fold(
            LoadRow {
                name: "Total".to_string(),
                load: 0.0,
                lever: 0.0,
                friction: 0.0,
                sliding_force: 0.0,
                moment: 0.0,
            },
            |mut total, row| {
                total.load += row.load;
                total.lever += row.lever;
                total.friction += row.friction;
                total.sliding_force += row.sliding_force;
                total.moment += row.moment;
                total
            },
        );
        Self { rows, total }
    }
}

/// Resisting over driving total for one failure mode.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SafetySummary {
    /// Resisting total (sliding force or moment).
    pub resisting: f64,
    /// Driving total (sliding force or moment).
    pub driving: f64,
    /// `resisting / driving`.
    pub factor_of_safety: f64,
    /// Driving over resisting, as evaluated by the stability model.
    pub utilisation: f64,
}

impl SafetySummary {
    /// Utilisation in whole percent, truncated toward zero.
    #[must_use]
    pub fn utilisation_percent(&self) -> i64 {
        (self.utilisation * 100.0).floor() as i64
    }
}

/// Loads, levers and safety factors of a design, recomputed at fixed dimensions.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StabilityReport {
    /// Loading case and materials.
    pub inputs: DesignInputs,
    /// Dimensions being reported.
    pub variables: DesignVariables,
    /// Unit weight in kN including the chamfer allowance.
    pub minimum_weight: f64,
    /// Restoring loads.
    pub stabilising: LoadTable,
    /// Driving loads.
    pub destabilising: LoadTable,
    /// Sliding check.
    pub sliding: SafetySummary,
    /// Overturning check.
    pub overturning: SafetySummary,
}

impl StabilityReport {
    /// Evaluate the stability model at `variables`.
    ///
    /// # Examples
    /// ```
    /// use lunitx::{DesignInputs, DesignVariables, StabilityReport};
    ///
    /// let section = DesignVariables::new(6.5, 0.3, 1.7, 0.3, 0.05, 2.0);
    /// let report = StabilityReport::new(&section, &DesignInputs::default());
    /// assert_eq!(report.stabilising.rows.len(), 2);
    /// assert!(report.sliding.factor_of_safety > 1.0);
    /// ```
    #[must_use]
    pub fn new(variables: &DesignVariables, inputs: &DesignInputs) -> Self {
        let breakdown = load_breakdown(variables, inputs);
        let stabilising = LoadTable::from_entries(&breakdown.stabilising);
        let destabilising = LoadTable::from_entries(&breakdown.destabilising);
        let sliding = SafetySummary {
            resisting: stabilising.total.sliding_force,
            driving: destabilising.total.sliding_force,
            factor_of_safety: stabilising.total.sliding_force
                / destabilising.total.sliding_force,
            utilisation: sliding_ratio(variables, inputs),
        };
        let overturning = SafetySummary {
            resisting: stabilising.total.moment,
            driving: destabilising.total.moment,
            factor_of_safety: stabilising.total.moment / destabilising.total.moment,
            utilisation: overturning_ratio(variables, inputs),
        };
        Self {
            inputs: *inputs,
            variables: *variables,
            minimum_weight: unit_weight(variables, inputs),
            stabilising,
            destabilising,
            sliding,
            overturning,
        }
    }

    /// Minimum weight in whole kN, truncated toward zero.
    #[must_use]
    pub fn minimum_weight_display(&self) -> i64 {
        self.minimum_weight.trunc() as i64
    }
}

/// Render a textual summary of the sized unit.
///
/// The layout follows a hand calculation: the loading, the optimised dimensions, the
/// two load tables and then the sliding and overturning checks.
#[must_use]
pub fn render_report(report: &StabilityReport) -> String {
    let mut output = String::new();

    writeln!(
        &mut output,
        "L-unit optimisation (h = {:.2} m, impact load = {:.1} kN, surcharge = {:.1} kN/m2)",
        report.inputs.h, report.inputs.p_a, report.inputs.q
    )
    .expect("writing to string cannot fail");
    writeln!(
        &mut output,
        "Minimum Weight: {}kN",
        report.minimum_weight_display()
    )
    .expect("writing to string cannot fail");

    output.push_str("\nOptimised parameters\n");
    for (label, value) in report.variables.labelled() {
        writeln!(&mut output, "  {label:<20} {value:>8.3} m")
            .expect("writing to string cannot fail");
    }

    output.push_str("\nRestoring Forces\n");
    render_table(&mut output, &report.stabilising);
    output.push_str("\nDestabilising Forces\n");
    render_table(&mut output, &report.destabilising);

    output.push_str("\nStability Calculation\n");
    render_check(&mut output, "Sliding", &report.sliding);
    render_check(&mut output, "Overturning", &report.overturning);

    output
}

/// Append one load table with its total row.
fn render_table(output: &mut String, table: &LoadTable) {
    writeln!(
        output,
        "  {:<26} {:>10} {:>10} {:>9} {:>19} {:>13}",
        "", "Load (kN)", "Lever (m)", "Friction", "Sliding Force (kN)", "Moment (kNm)"
    )
    .expect("writing to string cannot fail");
    for row in table.rows.iter().chain(std::iter::once(&table.total)) {
        writeln!(
            output,
            "  {:<26} {:>10.2} {:>10.2} {:>9.2} {:>19.2} {:>13.2}",
            row.name, row.load, row.lever, row.friction, row.sliding_force, row.moment
        )
        .expect("writing to string cannot fail");
    }
}

/// Append the factor of safety and utilisation lines for one failure mode.
fn render_check(output: &mut String, mode: &str, summary: &SafetySummary) {
    writeln!(
        output,
        "{mode} Factor of Safety = {:.2}/{:.2} = {:.2}",
        summary.resisting, summary.driving, summary.factor_of_safety
    )
    .expect("writing to string cannot fail");
    writeln!(
        output,
        "{mode} Utilisation = {}% (Unfactored)",
        summary.utilisation_percent()
    )
    .expect("writing to string cannot fail");
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn report() -> StabilityReport {
        let section = DesignVariables::new(6.5, 0.3, 1.7, 0.3, 0.05, 2.0);
        StabilityReport::new(&section, &DesignInputs::default())
    }

    #[test]
    fn totals_are_column_sums() {
        let report = report();
        let table = &report.destabilising;
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.total.name, "Total");
        let load: f64 = table.rows.iter().map(|row| row.load).sum();
        let moment: f64 = table.rows.iter().map(|row| row.moment).sum();
        assert_relative_eq!(table.total.load, load, epsilon = 1.0e-12);
        assert_relative_eq!(table.total.moment, moment, epsilon = 1.0e-12);
        assert_relative_eq!(table.total.friction, 3.0, epsilon = 1.0e-12);
    }

    #[test]
    fn factors_invert_model_utilisation() {
        let report = report();
        assert_relative_eq!(
            report.sliding.factor_of_safety * report.sliding.utilisation,
            1.0,
            epsilon = 1.0e-12
        );
        assert_relative_eq!(
            report.overturning.factor_of_safety * report.overturning.utilisation,
            1.0,
            epsilon = 1.0e-12
        );
    }

    #[test]
    fn percentages_and_weight_truncate() {
        let mut summary = report().sliding;
        summary.utilisation = 0.9499;
        assert_eq!(summary.utilisation_percent(), 94);
        summary.utilisation = 0.95;
        assert_eq!(summary.utilisation_percent(), 95);

        let mut report = report();
        report.minimum_weight = 109.97;
        assert_eq!(report.minimum_weight_display(), 109);
    }

    #[test]
    fn formats_human_readable_report() {
        let report = report();
        let text = render_report(&report);
        assert!(text.contains("L-unit optimisation (h = 2.00 m"));
        assert!(text.contains(&format!(
            "Minimum Weight: {}kN",
            report.minimum_weight_display()
        )));
        assert!(text.contains("Base Width"));
        assert!(text.contains("Restoring Forces"));
        assert!(text.contains("Accidental Impact Load"));
        assert!(text.contains("Sliding Factor of Safety = "));
        assert!(text.contains(&format!(
            "Overturning Utilisation = {}% (Unfactored)",
            report.overturning.utilisation_percent()
        )));
        assert_eq!(text.matches("Total").count(), 2);
    }
}
