use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use lunitx::{
    solve, DesignInputs, GeometryError, InputError, OptimizationResult, Profile, Solid,
    SolverConfig, StabilityReport,
};
use serde::Serialize;
use thiserror::Error;

/// Solver outcome and, for a converged design, its stability report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesignSummary {
    /// Raw solver outcome with the post-solve constraint check.
    pub result: OptimizationResult,
    /// Loads and safety factors at the optimum; withheld when the solve failed.
    pub report: Option<StabilityReport>,
}

/// Error raised by the command line workflow.
#[derive(Debug, Error)]
pub enum RunError {
    /// The solver did not produce a usable design.
    #[error("no usable design: {0}")]
    NotConverged(String),
    /// The optimised dimensions do not form a valid profile.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    /// An export file could not be written.
    #[error("cannot write {}: {source}", path.display())]
    Export {
        /// Destination file.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
}

/// Size the unit and, when the design converged, rebuild its stability report from the
/// model at the returned dimensions.
pub fn run_design(
    inputs: &DesignInputs,
    config: &SolverConfig,
) -> Result<DesignSummary, InputError> {
    let result = solve(inputs, config)?;
    let report = result
        .converged
        .then(|| StabilityReport::new(&result.variables, inputs));
    Ok(DesignSummary { result, report })
}

/// Write the converged unit to `path` as ASCII STL.
pub fn export_stl(path: &Path, summary: &DesignSummary, chamfer: f64) -> Result<(), RunError> {
    let solid = Solid::from_design(&converged(summary)?.variables, chamfer)?;
    write_export(path, |writer| solid.write_stl("l_unit", writer))?;
    log::info!("STL written to {}", path.display());
    Ok(())
}

/// Write the converged cross-section to `path` as an ASCII DXF outline.
pub fn export_dxf(path: &Path, summary: &DesignSummary, chamfer: f64) -> Result<(), RunError> {
    let profile = Profile::new(&converged(summary)?.variables, chamfer)?;
    write_export(path, |writer| profile.write_dxf("l_unit", writer))?;
    log::info!("DXF written to {}", path.display());
    Ok(())
}

/// The solver outcome, or an error when it must not be exported.
fn converged(summary: &DesignSummary) -> Result<&OptimizationResult, RunError> {
    if summary.result.converged {
        Ok(&summary.result)
    } else {
        Err(RunError::NotConverged(summary.result.solver_message.clone()))
    }
}

/// Create `path` and fill it through a buffered writer.
fn write_export<F>(path: &Path, write: F) -> Result<(), RunError>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let export_error = |source| RunError::Export {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(export_error)?;
    let mut writer = BufWriter::new(file);
    write(&mut writer).map_err(export_error)?;
    writer.flush().map_err(export_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converged_design_carries_report() {
        let inputs = DesignInputs::default();
        let summary = run_design(&inputs, &SolverConfig::default()).expect("valid inputs");
        assert!(summary.result.converged, "{}", summary.result.solver_message);
        let report = summary.report.expect("report for converged design");
        assert_eq!(report.variables, summary.result.variables);
        assert!(report.sliding.utilisation <= 0.95 + 1.0e-6);
        assert!(report.overturning.utilisation <= 0.95 + 1.0e-6);
    }

    #[test]
    fn failed_design_withholds_report_and_export() {
        let inputs = DesignInputs {
            h: 0.5,
            ..DesignInputs::default()
        };
        let summary = run_design(&inputs, &SolverConfig::default()).expect("valid inputs");
        assert!(summary.report.is_none());

        let path = std::env::temp_dir().join(format!("lunitx-refused-{}.stl", std::process::id()));
        let error = export_stl(&path, &summary, 0.15).expect_err("export refused");
        assert!(matches!(error, RunError::NotConverged(_)));
        assert!(!path.exists());

        let outline = path.with_extension("dxf");
        let error = export_dxf(&outline, &summary, 0.15).expect_err("export refused");
        assert!(matches!(error, RunError::NotConverged(_)));
        assert!(!outline.exists());
    }

    #[test]
    fn converged_design_exports_stl() {
        let summary =
            run_design(&DesignInputs::default(), &SolverConfig::default()).expect("valid inputs");
        let path = std::env::temp_dir().join(format!("lunitx-export-{}.stl", std::process::id()));
        export_stl(&path, &summary, 0.15).expect("export succeeds");
        let text = std::fs::read_to_string(&path).expect("stl readable");
        std::fs::remove_file(&path).ok();
        assert!(text.starts_with("solid l_unit"));
    }

    #[test]
    fn converged_design_exports_dxf() {
        let summary =
            run_design(&DesignInputs::default(), &SolverConfig::default()).expect("valid inputs");
        let path = std::env::temp_dir().join(format!("lunitx-export-{}.dxf", std::process::id()));
        export_dxf(&path, &summary, 0.15).expect("export succeeds");
        let text = std::fs::read_to_string(&path).expect("dxf readable");
        std::fs::remove_file(&path).ok();
        assert!(text.contains("LWPOLYLINE"));
        assert!(text.trim_end().ends_with("EOF"));
    }
}
