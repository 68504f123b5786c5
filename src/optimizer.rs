//! Minimum-weight sizing of the L-unit as a bounded nonlinear program.
//!
//! The six [`DesignVariables`] are handed to the derivative-free COBYLA solver
//! (<https://en.wikipedia.org/wiki/COBYLA>) with one equality and four inequality
//! constraints built from the [`geotechnics`](crate::geotechnics) model. COBYLA only
//! accepts constraints of the form `g(x) >= 0`, so the height equality is passed as a
//! pair of opposing linear inequalities.
//!
//! A single COBYLA run settles on whichever local optimum its start leads to, so each
//! solve runs from several deterministic starts and keeps the lightest design.
//!
//! The solver's own view of feasibility is never trusted: once it returns, the model is
//! re-evaluated at the returned point and that check decides whether the design counts
//! as converged.

use std::cell::Cell;

use cobyla::{minimize, Func, RhoBeg, StopTols};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{InputError, SolveFailure};
use crate::geometry::{initial_guess, DesignVariables, VariableBounds};
use crate::geotechnics::{
    height_length_ratio, height_residual, height_width_ratio, overturning_ratio,
    sliding_ratio, unit_weight,
};
use crate::inputs::DesignInputs;

/// Settings for a single solve.
///
/// A configuration is passed explicitly to every call; nothing is shared between solves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Cap on objective evaluations for each solver run.
    pub max_evaluations: usize,
    /// Initial trust-region radius of each variable, as a fraction of its bound width.
    pub initial_step: f64,
    /// Relative step size below which the solver stops.
    pub xtol_rel: f64,
    /// Relative objective change below which the solver stops, zero to disable.
    pub ftol_rel: f64,
    /// Largest constraint or bound violation accepted at the returned point.
    pub feasibility_tolerance: f64,
    /// Upper limit on the overturning and sliding ratios.
    pub utilisation_limit: f64,
    /// Upper limit on height/width and height/length.
    pub aspect_limit: f64,
    /// Add the constraint `bw - ut >= min_heel_width`.
    pub enforce_heel_width: bool,
    /// Smallest heel width in metres when `enforce_heel_width` is set.
    pub min_heel_width: f64,
    /// Variable bounds.
    pub bounds: VariableBounds,
    /// First starting point.
    pub initial_guess: DesignVariables,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_evaluations: 5000,
            initial_step: 0.25,
            xtol_rel: 1.0e-8,
            ftol_rel: 0.0,
            feasibility_tolerance: 1.0e-6,
            utilisation_limit: 0.95,
            aspect_limit: 1.0,
            enforce_heel_width: false,
            min_heel_width: 0.05,
            bounds: VariableBounds::default(),
            initial_guess: initial_guess(),
        }
    }
}

/// Constraint values re-evaluated at a candidate design.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConstraintCheck {
    /// `bt + uh - h`, zero for a valid design.
    pub height_residual: f64,
    /// Unit height over base width.
    pub height_width_ratio: f64,
    /// Unit height over unit length.
    pub height_length_ratio: f64,
    /// Overturning utilisation.
    pub overturning_ratio: f64,
    /// Sliding utilisation.
    pub sliding_ratio: f64,
    /// Clear heel width `bw - ut`.
    pub heel_width: f64,
    /// Largest distance outside the variable bounds.
    pub bound_violation: f64,
    /// Limit applied to both stability ratios.
    pub utilisation_limit: f64,
    /// Limit applied to both aspect ratios.
    pub aspect_limit: f64,
    /// Minimum heel width, when that constraint is enforced.
    pub min_heel_width: Option<f64>,
}

impl ConstraintCheck {
    /// Evaluate every constraint of the program at `variables`.
    #[must_use]
    pub fn evaluate(
        variables: &DesignVariables,
        inputs: &DesignInputs,
        config: &SolverConfig,
    ) -> Self {
        Self {
            height_residual: height_residual(variables, inputs),
            height_width_ratio: height_width_ratio(variables),
            height_length_ratio: height_length_ratio(variables),
            overturning_ratio: overturning_ratio(variables, inputs),
            sliding_ratio: sliding_ratio(variables, inputs),
            heel_width: variables.heel_width(),
            bound_violation: config.bounds.violation(variables),
            utilisation_limit: config.utilisation_limit,
            aspect_limit: config.aspect_limit,
            min_heel_width: config
                .enforce_heel_width
                .then_some(config.min_heel_width),
        }
    }

    /// Largest violation over all constraints and bounds, infinite when any value is NaN.
    #[must_use]
    pub fn worst_violation(&self) -> f64 {
        let heel = self
            .min_heel_width
            .map_or(0.0, |min_heel_width| min_heel_width - self.heel_width);
        let violations = [
            self.height_residual.abs(),
            self.height_width_ratio - self.aspect_limit,
            self.height_length_ratio - self.aspect_limit,
            self.overturning_ratio - self.utilisation_limit,
            self.sliding_ratio - self.utilisation_limit,
            heel,
            self.bound_violation,
        ];
        if violations.iter().any(|value| value.is_nan()) {
            return f64::INFINITY;
        }
        violations.iter().fold(0.0_f64, |worst, &value| worst.max(value))
    }

    /// Whether every constraint holds within `tolerance`.
    #[must_use]
    pub fn is_satisfied(&self, tolerance: f64) -> bool {
        self.worst_violation() <= tolerance
    }
}

/// Outcome of a solve.
///
/// When `converged` is false the `variables` are the iterate closest to feasibility and
/// must not be used to build or export a unit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptimizationResult {
    /// Final dimensions.
    pub variables: DesignVariables,
    /// Unit weight in kN at `variables`.
    pub objective_value: f64,
    /// Whether the design is a verified feasible local optimum.
    pub converged: bool,
    /// Human-readable solver outcome.
    pub solver_message: String,
    /// Classification of the failure when `converged` is false.
    pub failure: Option<SolveFailure>,
    /// Number of objective evaluations spent over all runs.
    pub evaluations: usize,
    /// Constraints re-evaluated at `variables`.
    pub check: ConstraintCheck,
}

impl OptimizationResult {
    /// Minimum weight in whole kN, truncated toward zero for display.
    #[must_use]
    pub fn minimum_weight_display(&self) -> i64 {
        self.objective_value.trunc() as i64
    }
}

/// Reusable solver front end holding a [`SolverConfig`].
///
/// Each call to [`DesignOptimizer::solve`] builds fresh solver state, so one optimiser
/// can serve many independent designs.
#[derive(Clone, Debug, Default)]
pub struct DesignOptimizer {
    /// Settings applied to every solve.
    config: SolverConfig,
}

impl DesignOptimizer {
    /// Create an optimiser with the given settings.
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Settings applied to every solve.
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Size the unit for `inputs`.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] when `inputs` fail validation; solver failures are
    /// reported inside the result.
    pub fn solve(&self, inputs: &DesignInputs) -> Result<OptimizationResult, InputError> {
        solve(inputs, &self.config)
    }
}

/// Data handed to every objective and constraint evaluation.
#[derive(Clone, Copy, Debug)]
struct Problem {
    /// Loading case and materials.
    inputs: DesignInputs,
    /// Limit on both stability ratios.
    utilisation_limit: f64,
    /// Limit on both aspect ratios.
    aspect_limit: f64,
    /// Minimum heel width for the optional heel constraint.
    min_heel_width: f64,
}

/// Unpack a solver point in `[bw, bt, uh, ut, dc, l]` order.
fn at(x: &[f64]) -> DesignVariables {
    DesignVariables::new(x[0], x[1], x[2], x[3], x[4], x[5])
}

/// `h - (bt + uh) >= 0`
fn height_not_above(x: &[f64], problem: &mut Problem) -> f64 {
    -height_residual(&at(x), &problem.inputs)
}

/// `(bt + uh) - h >= 0`
fn height_not_below(x: &[f64], problem: &mut Problem) -> f64 {
    height_residual(&at(x), &problem.inputs)
}

/// `aspect_limit - H / bw >= 0`
fn width_proportion(x: &[f64], problem: &mut Problem) -> f64 {
    problem.aspect_limit - height_width_ratio(&at(x))
}

/// `aspect_limit - H / l >= 0`
fn length_proportion(x: &[f64], problem: &mut Problem) -> f64 {
    problem.aspect_limit - height_length_ratio(&at(x))
}

/// `utilisation_limit - overturning ratio >= 0`
fn overturning_margin(x: &[f64], problem: &mut Problem) -> f64 {
    problem.utilisation_limit - overturning_ratio(&at(x), &problem.inputs)
}

/// `utilisation_limit - sliding ratio >= 0`
fn sliding_margin(x: &[f64], problem: &mut Problem) -> f64 {
    problem.utilisation_limit - sliding_ratio(&at(x), &problem.inputs)
}

/// `bw - ut - min_heel_width >= 0`, only registered on request
fn heel_margin(x: &[f64], problem: &mut Problem) -> f64 {
    at(x).heel_width() - problem.min_heel_width
}

/// Factor applied to the initial steps when refining the best design found.
const POLISH_STEP_FACTOR: f64 = 0.1;

/// Size the unit for `inputs` with the given solver settings.
///
/// The inputs are validated, then COBYLA is run from a small fixed set of starting
/// points and once more from the lightest feasible design with smaller steps. Every returned point is checked against every bound and
/// constraint; the lightest verified design is reported as converged. When no run
/// verifies, the run closest to feasibility is returned with its failure.
///
/// # Errors
///
/// Returns [`InputError`] when `inputs` fail validation. The solver is not run in that
/// case.
///
/// # Examples
/// ```
/// use lunitx::{solve, DesignInputs, SolverConfig};
///
/// let result = solve(&DesignInputs::default(), &SolverConfig::default())
///     .expect("default inputs are valid");
/// if result.converged {
///     assert!((result.variables.height() - 2.0).abs() < 1.0e-6);
/// }
/// ```
pub fn solve(
    inputs: &DesignInputs,
    config: &SolverConfig,
) -> Result<OptimizationResult, InputError> {
    inputs.validate()?;
    info!(
        "Sizing L-unit: h = {} m, P_a = {} kN, q = {} kN/m2",
        inputs.h, inputs.p_a, inputs.q
    );

    let problem = Problem {
        inputs: *inputs,
        utilisation_limit: config.utilisation_limit,
        aspect_limit: config.aspect_limit,
        min_heel_width: config.min_heel_width,
    };

    let mut constraints: Vec<&dyn Func<Problem>> = Vec::new();
    constraints.push(&height_not_above);
    constraints.push(&height_not_below);
    constraints.push(&width_proportion);
    constraints.push(&length_proportion);
    constraints.push(&overturning_margin);
    constraints.push(&sliding_margin);
    if config.enforce_heel_width {
        constraints.push(&heel_margin);
    }

    let steps = initial_steps(config);
    let mut attempts: Vec<Attempt> = starting_points(inputs, config)
        .iter()
        .map(|start| run_from(start, &steps, &constraints, problem, config))
        .collect();

    let lightest_feasible = attempts
        .iter()
        .filter(|attempt| attempt.check.is_satisfied(config.feasibility_tolerance))
        .min_by(|a, b| a.objective_value.total_cmp(&b.objective_value))
        .map(|attempt| attempt.variables);
    if let Some(start) = lightest_feasible {
        let fine: Vec<f64> = steps.iter().map(|step| step * POLISH_STEP_FACTOR).collect();
        attempts.push(run_from(&start, &fine, &constraints, problem, config));
    }

    let evaluations = attempts.iter().map(|attempt| attempt.evaluations).sum();
    let runs = attempts.len();
    let best = attempts
        .iter()
        .enumerate()
        .filter(|(_, attempt)| attempt.failure.is_none())
        .min_by(|(_, a), (_, b)| a.objective_value.total_cmp(&b.objective_value))
        .or_else(|| {
            attempts
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    a.check
                        .worst_violation()
                        .total_cmp(&b.check.worst_violation())
                })
        })
        .map(|(index, _)| index)
        .unwrap_or_default();
    let Attempt {
        variables,
        objective_value,
        status,
        failure,
        check,
        ..
    } = attempts.swap_remove(best);

    let converged = failure.is_none();
    let solver_message = match &failure {
        None => format!("{status} after {evaluations} evaluations in {runs} runs"),
        Some(failure) => format!("{failure} [{status}]"),
    };
    if converged {
        info!("Minimum weight {objective_value:.3} kN ({solver_message})");
    } else {
        warn!("Design not converged: {solver_message}");
    }

    Ok(OptimizationResult {
        variables,
        objective_value,
        converged,
        solver_message,
        failure,
        evaluations,
        check,
    })
}

/// Deterministic starting points for one solve, without duplicates.
///
/// The configured initial guess comes first. The others sit on the thin section
/// (`bt`, `ut` and `dc` at their lower bounds, `uh` making up the height) at the
/// corners of the `bw`/`l` plane spanned by the proportioned size `h / aspect_limit`
/// and the upper bounds. Optima lie either with `l` on its proportion limit or with
/// `bw` on its upper bound, and the stability ratios fall as `bw` and `l` grow, so the
/// upper corner is feasible whenever any thin section is.
fn starting_points(inputs: &DesignInputs, config: &SolverConfig) -> Vec<DesignVariables> {
    let VariableBounds { lower, upper } = config.bounds;
    let bt = (inputs.h - upper.uh).max(lower.bt).min(upper.bt);
    let uh = (inputs.h - bt).max(lower.uh).min(upper.uh);
    let proportioned = |low: f64, high: f64| (inputs.h / config.aspect_limit).max(low).min(high);
    let short_base = proportioned(lower.bw, upper.bw);
    let short_unit = proportioned(lower.l, upper.l);
    let thin = |bw, l| DesignVariables::new(bw, bt, uh, lower.ut, lower.dc, l);

    let mut starts = vec![config.initial_guess];
    for candidate in [
        thin(upper.bw, short_unit),
        thin(upper.bw, upper.l),
        thin(short_base, upper.l),
        thin(short_base, short_unit),
    ] {
        if !starts.contains(&candidate) {
            starts.push(candidate);
        }
    }
    starts
}

/// Initial step for each variable, `initial_step` times the width of its bounds.
fn initial_steps(config: &SolverConfig) -> Vec<f64> {
    config
        .bounds
        .pairs()
        .iter()
        .map(|&(lower, upper)| config.initial_step * (upper - lower))
        .collect()
}

/// Outcome of a single COBYLA run.
struct Attempt {
    /// Returned dimensions, or the start when the solver returned a malformed point.
    variables: DesignVariables,
    /// Unit weight at `variables`.
    objective_value: f64,
    /// Solver status text.
    status: String,
    /// Classification when the run did not produce a verified design.
    failure: Option<SolveFailure>,
    /// Objective evaluations spent.
    evaluations: usize,
    /// Constraints re-evaluated at `variables`.
    check: ConstraintCheck,
}

/// Run COBYLA once from `start` and classify the returned point.
fn run_from(
    start: &DesignVariables,
    steps: &[f64],
    constraints: &[&dyn Func<Problem>],
    problem: Problem,
    config: &SolverConfig,
) -> Attempt {
    let inputs = problem.inputs;
    let evaluations = Cell::new(0_usize);
    let objective = |x: &[f64], problem: &mut Problem| {
        evaluations.set(evaluations.get() + 1);
        unit_weight(&at(x), &problem.inputs)
    };

    let stop = StopTols {
        ftol_rel: config.ftol_rel,
        xtol_rel: config.xtol_rel,
        ..StopTols::default()
    };
    let outcome = minimize(
        objective,
        start.to_vector().as_slice(),
        &config.bounds.pairs(),
        constraints,
        problem,
        config.max_evaluations,
        RhoBeg::Set(steps.to_vec()),
        Some(stop),
    );
    let evaluations = evaluations.get();

    let (status, x, backend_failed) = match outcome {
        Ok((status, x, _)) => (format!("{status:?}"), x, false),
        Err((status, x, _)) => (format!("{status:?}"), x, true),
    };

    let unpacked = DesignVariables::from_slice(&x);
    let variables = unpacked.unwrap_or(*start);
    let objective_value = unit_weight(&variables, &inputs);
    let check = ConstraintCheck::evaluate(&variables, &inputs, config);
    debug!(
        "COBYLA from {:?}: {status} after {evaluations} evaluations, weight {objective_value:.3} kN, worst violation {:.3e}",
        start.to_vector().as_slice(),
        check.worst_violation()
    );

    let failure = if unpacked.is_none() {
        Some(SolveFailure::NumericFailure {
            detail: format!("solver returned {} values for 6 variables", x.len()),
        })
    } else if !variables.is_finite() || !objective_value.is_finite() {
        Some(SolveFailure::NumericFailure {
            detail: format!("non-finite iterate ({status})"),
        })
    } else if backend_failed {
        Some(SolveFailure::NumericFailure {
            detail: status.clone(),
        })
    } else if !check.is_satisfied(config.feasibility_tolerance) {
        Some(SolveFailure::Infeasible {
            violation: check.worst_violation(),
        })
    } else if evaluations >= config.max_evaluations {
        Some(SolveFailure::IterationLimit { evaluations })
    } else {
        None
    };

    Attempt {
        variables,
        objective_value,
        status,
        failure,
        evaluations,
        check,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::inputs::MaterialParameters;

    #[test]
    fn default_design_is_verified_feasible() {
        let config = SolverConfig::default();
        let result = solve(&DesignInputs::default(), &config).expect("valid inputs");
        assert!(result.converged, "{}", result.solver_message);
        assert!(result.failure.is_none());
        assert!(result.check.is_satisfied(config.feasibility_tolerance));
        assert!(result.evaluations > 0);
        assert_relative_eq!(
            result.objective_value,
            unit_weight(&result.variables, &DesignInputs::default()),
            epsilon = 1.0e-12
        );
    }

    #[test]
    fn invalid_inputs_never_reach_the_solver() {
        let inputs = DesignInputs {
            materials: MaterialParameters {
                phi: 95.0,
                ..MaterialParameters::default()
            },
            ..DesignInputs::default()
        };
        let error = solve(&inputs, &SolverConfig::default()).expect_err("angle rejected");
        assert_eq!(error, InputError::FrictionAngleOutOfRange { angle: 95.0 });
    }

    #[test]
    fn unreachable_height_is_reported_not_converged() {
        let inputs = DesignInputs {
            h: 0.5,
            ..DesignInputs::default()
        };
        let result = solve(&inputs, &SolverConfig::default()).expect("valid inputs");
        assert!(!result.converged);
        assert!(result.failure.is_some());
        assert!(!result.check.is_satisfied(1.0e-6));
    }

    #[test]
    fn tiny_budget_is_flagged() {
        let config = SolverConfig {
            max_evaluations: 5,
            ..SolverConfig::default()
        };
        let result = solve(&DesignInputs::default(), &config).expect("valid inputs");
        assert!(!result.converged);
        assert!(result.failure.is_some());
    }

    #[test]
    fn heel_constraint_is_checked_when_enabled() {
        let config = SolverConfig {
            enforce_heel_width: true,
            min_heel_width: 0.5,
            ..SolverConfig::default()
        };
        let narrow = DesignVariables::new(0.7, 0.3, 1.7, 0.3, 0.05, 2.0);
        let check = ConstraintCheck::evaluate(&narrow, &DesignInputs::default(), &config);
        assert_eq!(check.min_heel_width, Some(0.5));
        assert!(check.worst_violation() >= 0.1 - 1.0e-12);

        let result = solve(&DesignInputs::default(), &config).expect("valid inputs");
        if result.converged {
            assert!(result.variables.heel_width() >= 0.5 - config.feasibility_tolerance);
        }
    }

    #[test]
    fn nan_constraint_values_count_as_violated() {
        let config = SolverConfig::default();
        let broken = DesignVariables::new(f64::NAN, 0.3, 1.7, 0.3, 0.05, 2.0);
        let check = ConstraintCheck::evaluate(&broken, &DesignInputs::default(), &config);
        assert_eq!(check.worst_violation(), f64::INFINITY);
        assert!(!check.is_satisfied(1.0));
    }

    #[test]
    fn display_weight_truncates() {
        let result = solve(&DesignInputs::default(), &SolverConfig::default())
            .expect("valid inputs");
        let display = result.minimum_weight_display();
        assert!(display as f64 <= result.objective_value);
        assert!(result.objective_value - (display as f64) < 1.0);
    }

    #[test]
    fn starts_cover_both_proportion_corners() {
        let inputs = DesignInputs::default();
        let config = SolverConfig::default();
        let starts = starting_points(&inputs, &config);
        assert_eq!(starts[0], config.initial_guess);
        assert_eq!(starts.len(), 5);
        assert!(starts.contains(&DesignVariables::new(10.0, 0.3, 1.7, 0.3, 0.05, 2.0)));
        assert!(starts.contains(&DesignVariables::new(10.0, 0.3, 1.7, 0.3, 0.05, 10.0)));
        assert!(starts.contains(&DesignVariables::new(2.0, 0.3, 1.7, 0.3, 0.05, 2.0)));
        for start in &starts {
            assert_eq!(config.bounds.violation(start), 0.0);
        }

        // Proportioned sizes beyond the bounds collapse onto the upper corner.
        let stretched = SolverConfig {
            aspect_limit: 0.1,
            ..SolverConfig::default()
        };
        assert_eq!(starting_points(&inputs, &stretched).len(), 2);
    }

    #[test]
    fn upper_corner_start_is_feasible_under_heavy_impact() {
        let inputs = DesignInputs {
            h: 1.0,
            p_a: 500.0,
            q: 0.0,
            ..DesignInputs::default()
        };
        let config = SolverConfig::default();
        let corner = DesignVariables::new(10.0, 0.3, 0.7, 0.3, 0.05, 10.0);
        assert!(starting_points(&inputs, &config).contains(&corner));
        let check = ConstraintCheck::evaluate(&corner, &inputs, &config);
        assert!(check.is_satisfied(1.0e-12));

        let result = solve(&inputs, &config).expect("valid inputs");
        assert!(result.converged, "{}", result.solver_message);
        assert!(result.objective_value <= unit_weight(&corner, &inputs));
    }

    #[test]
    fn initial_steps_scale_with_bound_width() {
        let steps = initial_steps(&SolverConfig::default());
        assert_eq!(steps.len(), 6);
        assert_relative_eq!(steps[0], 0.25 * 9.0, epsilon = 1.0e-12);
        assert_relative_eq!(steps[4], 0.25 * 0.15, epsilon = 1.0e-12);
    }
}
