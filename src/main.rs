mod analysis;
mod options;

use analysis::{export_dxf, export_stl, run_design, RunError};
use env_logger::{Builder, Env};
use lunitx::render_report;
use options::Options;
use std::error::Error;
use structopt::StructOpt;

/// Environment variable holding the log filter, e.g. `LUNITX_LOG=debug`.
const LUNITX_LOG: &str = "LUNITX_LOG";

fn main() -> Result<(), Box<dyn Error>> {
    let options = Options::from_args();

    // Logs go to stderr so that `--json` output on stdout stays machine readable.
    let env = Env::new().filter_or(LUNITX_LOG, "info");
    Builder::from_env(env)
        .target(env_logger::Target::Stderr)
        .try_init()
        .ok();

    // Merge the built-in material table, the optional config file and the flags, and
    // reject anything outside its physical range before the solver sees it.
    let (inputs, config) = options.resolve()?;

    // Solve for the lightest section and rebuild the load tables at the optimum.
    let summary = run_design(&inputs, &config)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if let Some(report) = &summary.report {
        println!("{}", render_report(report));
    }

    // A design that failed to converge is never exported.
    if !summary.result.converged {
        return Err(RunError::NotConverged(summary.result.solver_message).into());
    }
    if let Some(path) = &options.stl {
        export_stl(path, &summary, inputs.materials.ch)?;
    }
    if let Some(path) = &options.dxf {
        export_dxf(path, &summary, inputs.materials.ch)?;
    }

    Ok(())
}
