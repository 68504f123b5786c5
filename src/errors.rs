//! Error types produced while validating inputs, solving or building geometry.

use serde::Serialize;
use thiserror::Error;

/// Error returned when a [`DesignInputs`](crate::DesignInputs) field lies outside its
/// physical domain.
///
/// Inputs are checked before the solver is invoked so that nonsensical values never
/// reach the optimisation.
///
/// # Examples
///
/// ```
/// use lunitx::{DesignInputs, InputError, MaterialParameters};
///
/// let error = DesignInputs::new(-1.0, 150.0, 10.0, MaterialParameters::default())
///     .expect_err("negative height is rejected");
/// assert_eq!(error, InputError::NonPositiveHeight { height: -1.0 });
/// ```
#[derive(Clone, Debug, Error, PartialEq)]
pub enum InputError {
    /// Returned when the retained height is zero or negative.
    #[error("retained height must be positive (received {height} m)")]
    NonPositiveHeight {
        /// Rejected retained height in metres.
        height: f64,
    },
    /// Returned when the accidental impact load is negative.
    #[error("impact load must not be negative (received {load} kN)")]
    NegativeImpactLoad {
        /// Rejected impact load in kilonewtons.
        load: f64,
    },
    /// Returned when the surcharge is negative.
    #[error("surcharge must not be negative (received {surcharge} kN/m2)")]
    NegativeSurcharge {
        /// Rejected surcharge in kilonewtons per square metre.
        surcharge: f64,
    },
    /// Returned when the concrete unit weight is zero or negative.
    #[error("concrete unit weight must be positive (received {unit_weight} kN/m3)")]
    NonPositiveConcreteWeight {
        /// Rejected unit weight in kilonewtons per cubic metre.
        unit_weight: f64,
    },
    /// Returned when the soil unit weight is zero or negative.
    #[error("soil unit weight must be positive (received {unit_weight} kN/m3)")]
    NonPositiveSoilWeight {
        /// Rejected unit weight in kilonewtons per cubic metre.
        unit_weight: f64,
    },
    /// Returned when the soil friction angle is outside `[0, 90)` degrees.
    #[error("soil friction angle must lie in [0, 90) degrees (received {angle})")]
    FrictionAngleOutOfRange {
        /// Rejected friction angle in degrees.
        angle: f64,
    },
    /// Returned when the base friction coefficient is outside `(0, 1]`.
    #[error("base friction coefficient must lie in (0, 1] (received {coefficient})")]
    BaseFrictionOutOfRange {
        /// Rejected friction coefficient.
        coefficient: f64,
    },
    /// Returned when the chamfer length is negative.
    #[error("chamfer length must not be negative (received {length} m)")]
    NegativeChamfer {
        /// Rejected chamfer length in metres.
        length: f64,
    },
    /// Returned when a field is NaN or infinite.
    #[error("{field} must be a finite number")]
    NonFinite {
        /// Name of the offending field.
        field: &'static str,
    },
}

/// Reason a solve finished without a usable design.
///
/// Failures are reported inside [`OptimizationResult`](crate::OptimizationResult) rather
/// than returned as errors, so batch callers can inspect `converged` directly.
#[derive(Clone, Debug, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SolveFailure {
    /// The returned point violates a bound or constraint beyond the feasibility tolerance.
    #[error("no feasible design found (worst violation {violation:.3e})")]
    Infeasible {
        /// Largest bound or constraint violation at the returned point.
        violation: f64,
    },
    /// The solver produced non-finite values or reported an internal failure.
    #[error("numerical failure: {detail}")]
    NumericFailure {
        /// Diagnostic text from the solver backend or the verification step.
        detail: String,
    },
    /// The evaluation budget ran out before the solver met its stopping tolerance.
    #[error("evaluation budget exhausted after {evaluations} objective evaluations")]
    IterationLimit {
        /// Number of objective evaluations performed.
        evaluations: usize,
    },
}

/// Error returned when the optimised dimensions cannot form a closed section profile.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GeometryError {
    /// Returned when a dimension is zero, negative or not finite.
    #[error("{dimension} must be positive and finite (received {value} m)")]
    InvalidDimension {
        /// Name of the offending dimension.
        dimension: &'static str,
        /// Rejected value in metres.
        value: f64,
    },
    /// Returned when the upstand is at least as thick as the base is wide.
    #[error("upstand thickness {upstand_thickness} m leaves no heel on a {base_width} m base")]
    NoHeel {
        /// Base width in metres.
        base_width: f64,
        /// Upstand thickness in metres.
        upstand_thickness: f64,
    },
    /// Returned when the chamfer does not fit between the upstand and the heel end or top.
    #[error("chamfer length {chamfer} m does not fit the section (limit {limit} m)")]
    ChamferTooLarge {
        /// Requested chamfer length in metres.
        chamfer: f64,
        /// Largest chamfer the section accepts in metres.
        limit: f64,
    },
}
