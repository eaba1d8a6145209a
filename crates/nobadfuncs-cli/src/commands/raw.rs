//! Raw pass-through: re-runs this executable in engine mode.

use anyhow::{Context, Result};

/// Runs the engine with `args` and forwards its output and exit code.
pub fn run(args: &[String]) -> Result<()> {
    let program = std::env::current_exe().context("Failed to locate the nobadfuncs executable")?;
    let working_dir = std::env::current_dir().context("Failed to read working directory")?;

    tracing::debug!(program = %program.display(), ?args, "running raw check command");

    let code = {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        nobadfuncs_core::run_raw(&program, args, &working_dir, &mut out)?
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
