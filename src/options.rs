use std::fs;
use std::path::{Path, PathBuf};

use lunitx::{DesignInputs, InputError, MaterialParameters, SolverConfig};
use serde::Deserialize;
use structopt::StructOpt;
use thiserror::Error;

/// Command line options
#[derive(StructOpt, Debug)]
#[structopt(
    name = "lunitx",
    about = "Sizes a minimum-weight L-shaped retaining unit against sliding and overturning"
)]
pub struct Options {
    /// Retained height (m)
    #[structopt(long, default_value = "2.0")]
    pub height: f64,

    /// Accidental impact load (kN)
    #[structopt(long, default_value = "150.0")]
    pub impact_load: f64,

    /// Surcharge on the retained soil (kN/m2)
    #[structopt(long, default_value = "10.0")]
    pub surcharge: f64,

    /// JSON file with "materials" and "solver" sections
    #[structopt(long, parse(from_os_str))]
    pub config: Option<PathBuf>,

    /// Concrete unit weight (kN/m3)
    #[structopt(long)]
    pub concrete_density: Option<f64>,

    /// Soil unit weight (kN/m3)
    #[structopt(long)]
    pub soil_density: Option<f64>,

    /// Soil friction angle (degrees)
    #[structopt(long)]
    pub friction_angle: Option<f64>,

    /// Base friction coefficient
    #[structopt(long)]
    pub base_friction: Option<f64>,

    /// Chamfer length used for the exported profile (m)
    #[structopt(long)]
    pub chamfer: Option<f64>,

    /// Cap on solver objective evaluations
    #[structopt(long)]
    pub max_evaluations: Option<usize>,

    /// Require a positive heel behind the upstand
    #[structopt(long)]
    pub enforce_heel_width: bool,

    /// Print the result and report as JSON
    #[structopt(long)]
    pub json: bool,

    /// Write the optimised unit to this ASCII STL file
    #[structopt(long, parse(from_os_str))]
    pub stl: Option<PathBuf>,

    /// Write the optimised cross-section to this ASCII DXF file
    #[structopt(long, parse(from_os_str))]
    pub dxf: Option<PathBuf>,
}

/// Contents of a `--config` file; every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Soil and concrete properties.
    pub materials: MaterialParameters,
    /// Solver settings.
    pub solver: SolverConfig,
}

/// Error raised while assembling the run from options and files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Returned when the configuration file cannot be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// Returned when the configuration file is not valid JSON for [`RunConfig`].
    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        /// File that was requested.
        path: PathBuf,
        /// Underlying JSON failure.
        source: serde_json::Error,
    },
    /// Returned when the merged inputs are outside their physical domain.
    #[error(transparent)]
    Input(#[from] InputError),
}

impl RunConfig {
    /// Read a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Options {
    /// Merge defaults, the optional config file and command line overrides.
    ///
    /// Command line values win over the file, which wins over the built-in defaults.
    pub fn resolve(&self) -> Result<(DesignInputs, SolverConfig), ConfigError> {
        let RunConfig {
            mut materials,
            mut solver,
        } = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };

        if let Some(p_c) = self.concrete_density {
            materials.p_c = p_c;
        }
        if let Some(p_s) = self.soil_density {
            materials.p_s = p_s;
        }
        if let Some(phi) = self.friction_angle {
            materials.phi = phi;
        }
        if let Some(fr) = self.base_friction {
            materials.fr = fr;
        }
        if let Some(ch) = self.chamfer {
            materials.ch = ch;
        }
        if let Some(max_evaluations) = self.max_evaluations {
            solver.max_evaluations = max_evaluations;
        }
        if self.enforce_heel_width {
            solver.enforce_heel_width = true;
        }

        let inputs = DesignInputs::new(self.height, self.impact_load, self.surcharge, materials)?;
        Ok((inputs, solver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_loading() {
        let options = Options::from_iter(["lunitx"]);
        let (inputs, solver) = options.resolve().expect("defaults are valid");
        assert_eq!(inputs, DesignInputs::default());
        assert_eq!(solver, SolverConfig::default());
        assert!(!options.json);
        assert!(options.stl.is_none());
        assert!(options.dxf.is_none());
    }

    #[test]
    fn flags_override_config_file() {
        let path = std::env::temp_dir().join(format!("lunitx-options-{}.json", std::process::id()));
        fs::write(
            &path,
            r#"{ "materials": { "phi": 30.0, "fr": 0.6 }, "solver": { "max_evaluations": 900 } }"#,
        )
        .expect("temp file writable");

        let options = Options::from_iter([
            "lunitx",
            "--height",
            "3.0",
            "--config",
            path.to_str().expect("utf-8 temp path"),
            "--base-friction",
            "0.4",
            "--enforce-heel-width",
        ]);
        let (inputs, solver) = options.resolve().expect("merged inputs are valid");
        fs::remove_file(&path).ok();

        assert_eq!(inputs.h, 3.0);
        assert_eq!(inputs.materials.phi, 30.0);
        assert_eq!(inputs.materials.fr, 0.4);
        assert_eq!(inputs.materials.p_c, 23.0);
        assert_eq!(solver.max_evaluations, 900);
        assert!(solver.enforce_heel_width);
    }

    #[test]
    fn invalid_values_are_reported() {
        let options = Options::from_iter(["lunitx", "--friction-angle", "120"]);
        assert!(matches!(
            options.resolve(),
            Err(ConfigError::Input(InputError::FrictionAngleOutOfRange { .. }))
        ));

        let missing = Options::from_iter(["lunitx", "--config", "/nonexistent/lunitx.json"]);
        assert!(matches!(missing.resolve(), Err(ConfigError::Read { .. })));
    }
}
