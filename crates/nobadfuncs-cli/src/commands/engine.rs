//! Engine mode: the runner protocol on stdout.

use anyhow::{Context, Result};
use nobadfuncs_go::{Invocation, RunnerProtocol};

/// Runs the engine over `pkgs` and exits with the protocol's exit code.
pub fn run(config_json: String, pkgs: Vec<String>) -> Result<()> {
    let working_dir = std::env::current_dir().context("Failed to read working directory")?;
    let invocation = Invocation {
        config_json,
        target_paths: pkgs,
        working_dir,
    };

    let outcome = {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        RunnerProtocol::new()
            .run(&invocation, &mut out)
            .context("Failed to write diagnostics")?
    };

    tracing::debug!(
        state = ?outcome.state,
        diagnostics = outcome.diagnostics,
        "engine finished"
    );

    let code = outcome.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
