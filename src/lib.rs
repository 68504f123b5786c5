#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
#![doc = include_str!("../README.md")]

mod errors;
mod geometry;
pub mod geotechnics;
mod inputs;
mod mesh;
mod optimizer;
mod report;

pub use crate::errors::{GeometryError, InputError, SolveFailure};
pub use crate::geometry::{initial_guess, DesignVariables, VariableBounds, VARIABLE_COUNT};
pub use crate::inputs::{DesignInputs, MaterialParameters};
pub use crate::mesh::{Profile, Solid};
pub use crate::optimizer::{
    solve, ConstraintCheck, DesignOptimizer, OptimizationResult, SolverConfig,
};
pub use crate::report::{render_report, LoadRow, LoadTable, SafetySummary, StabilityReport};
