//! `upgrade-config` command implementation.

use anyhow::{Context, Result};
use miette::Diagnostic;
use nobadfuncs_core::upgrade::{upgrade_file, ConfigVersion, UpgradeError};
use std::path::Path;

/// Prints `file` upgraded to the current schema.
///
/// On failure nothing is printed on stdout and the process exits 1.
pub fn run(file: &Path, legacy: bool) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read config: {}", file.display()))?;

    let version = if legacy {
        ConfigVersion::Legacy
    } else {
        ConfigVersion::V0
    };

    match upgrade_file(version, &contents) {
        Ok(outcome) => {
            print!("{}", outcome.contents());
            if let Some(notice) = outcome.notice(&file.display().to_string()) {
                eprintln!("{notice}");
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("Error: {err}");
            if let Some(help) = help_of(&err) {
                eprintln!("help: {help}");
            }
            std::process::exit(1);
        }
    }
}

fn help_of(err: &UpgradeError) -> Option<String> {
    if let Some(help) = err.help() {
        return Some(help.to_string());
    }
    match err {
        UpgradeError::Check { source, .. } => help_of(source),
        _ => None,
    }
}
