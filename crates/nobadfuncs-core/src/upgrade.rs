//! Migration of legacy `nobadfuncs` configuration to the current schema.
//!
//! The legacy schema configured the checker through raw command-line
//! arguments:
//!
//! ```yaml
//! checks:
//!   nobadfuncs:
//!     args: ["--config", "{\"func os.Exit(int)\": \"do not call os.Exit\"}"]
//!     filters:
//!       - type: name
//!         value: ".*.pb.go"
//! ```
//!
//! The current schema (version 0) carries the deny-list as structured data:
//!
//! ```yaml
//! checks:
//!   nobadfuncs:
//!     config:
//!       bad-funcs:
//!         "func os.Exit(int)": "do not call os.Exit"
//!     exclude:
//!       names: [".*.pb.go"]
//! ```
//!
//! Upgrades are pure: inputs are never mutated, and a failure leaves nothing
//! half-converted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::{CheckConfig, CheckEntry, Exclude, SignatureTable};

/// Checker type name the upgrade applies to.
pub const CHECK_NAME: &str = "nobadfuncs";

/// Flag that introduced the JSON deny-list in legacy `args`.
const CONFIG_FLAG: &str = "--config";

/// Schema version of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigVersion {
    /// Pre-plugin configuration (`args` + `filters`).
    Legacy,
    /// Current schema.
    V0,
}

/// A legacy output filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyFilter {
    /// Filter kind: `name`, `path`, or absent for a message filter.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Filter value (a regular expression).
    #[serde(default)]
    pub value: String,
}

/// Legacy per-check configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyCheckConfig {
    /// Skip this check entirely.
    #[serde(default)]
    pub skip: bool,
    /// Raw command-line arguments for the checker.
    #[serde(default)]
    pub args: Vec<String>,
    /// Output filters.
    #[serde(default)]
    pub filters: Vec<LegacyFilter>,
}

/// A per-check document tagged with its schema version.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckDocument {
    /// Legacy schema.
    Legacy(LegacyCheckConfig),
    /// Current schema.
    V0(CheckEntry),
}

/// Result of upgrading a whole configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// The document was already current; contents are returned as given.
    Unchanged(String),
    /// The document was converted; contents are the new YAML.
    Upgraded(String),
}

impl UpgradeOutcome {
    /// The resulting file contents.
    #[must_use]
    pub fn contents(&self) -> &str {
        match self {
            Self::Unchanged(s) | Self::Upgraded(s) => s,
        }
    }

    /// Human-readable notice for `file`, if anything changed.
    #[must_use]
    pub fn notice(&self, file: &str) -> Option<String> {
        match self {
            Self::Unchanged(_) => None,
            Self::Upgraded(_) => Some(format!("Upgraded configuration for {file}")),
        }
    }
}

/// Errors produced while upgrading configuration.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum UpgradeError {
    /// `args` does not start with `--config`.
    #[error("nobadfuncs-asset only supports legacy configuration if the first element in \"args\" is \"--config\"")]
    #[diagnostic(
        code(nobadfuncs::upgrade::unsupported_args),
        help("move the deny-list into `config.bad-funcs` by hand")
    )]
    UnsupportedArgs,

    /// `args` starts with `--config` but does not have exactly two elements.
    #[error("nobadfuncs-asset only supports legacy configuration if \"args\" has exactly one element after \"--config\"")]
    #[diagnostic(code(nobadfuncs::upgrade::wrong_args_length))]
    WrongArgsLength,

    /// The element after `--config` is not a JSON map of strings.
    #[error(
        "failed to unmarshal second element of \"args\" in nobadfuncs-asset legacy configuration as JSON map: {source}{}",
        found_suffix(.found)
    )]
    #[diagnostic(code(nobadfuncs::upgrade::malformed_json_map))]
    MalformedJsonMap {
        /// Decoder error.
        source: serde_json::Error,
        /// Character at the reported error position, if any.
        found: Option<char>,
    },

    /// The document is not valid YAML or has the wrong shape.
    #[error("failed to parse configuration YAML: {0}")]
    #[diagnostic(code(nobadfuncs::upgrade::yaml))]
    Yaml(#[source] serde_yaml::Error),

    /// The upgraded document could not be encoded.
    #[error("failed to encode upgraded configuration: {0}")]
    Encode(#[source] serde_yaml::Error),

    /// Failure upgrading a specific check, with its fully-qualified context.
    #[error("failed to upgrade check \"{check}\" legacy configuration: failed to upgrade asset configuration: {source}")]
    Check {
        /// Checker type name.
        check: String,
        /// Underlying failure.
        source: Box<UpgradeError>,
    },
}

fn found_suffix(found: &Option<char>) -> String {
    found.map_or_else(String::new, |c| format!(" (invalid character {c:?})"))
}

/// Returns the character at a 1-based line/column position of `document`.
fn char_at(document: &str, line: usize, column: usize) -> Option<char> {
    let line = document.lines().nth(line.checked_sub(1)?)?;
    line.get(column.checked_sub(1)?..)?.chars().next()
}

/// Converts a per-check document to the current schema.
///
/// Current documents are returned unchanged.
///
/// # Errors
///
/// Returns an [`UpgradeError`] describing why a legacy document cannot be
/// converted.
pub fn upgrade_check(document: &CheckDocument) -> Result<CheckEntry, UpgradeError> {
    match document {
        CheckDocument::V0(entry) => Ok(entry.clone()),
        CheckDocument::Legacy(legacy) => upgrade_legacy(legacy),
    }
}

fn upgrade_legacy(legacy: &LegacyCheckConfig) -> Result<CheckEntry, UpgradeError> {
    let mut entry = CheckEntry {
        skip: legacy.skip,
        ..CheckEntry::default()
    };

    migrate_filters(&legacy.filters, &mut entry)?;

    if legacy.args.is_empty() {
        return Ok(entry);
    }

    if legacy.args[0] != CONFIG_FLAG {
        return Err(UpgradeError::UnsupportedArgs);
    }
    if legacy.args.len() != 2 {
        return Err(UpgradeError::WrongArgsLength);
    }

    let json = &legacy.args[1];
    let table: BTreeMap<String, String> =
        serde_json::from_str(json).map_err(|source| UpgradeError::MalformedJsonMap {
            found: char_at(json, source.line(), source.column()),
            source,
        })?;

    let config = CheckConfig {
        bad_funcs: table.into_iter().collect::<SignatureTable>(),
    };
    entry.config = Some(serde_yaml::to_value(config).map_err(UpgradeError::Encode)?);

    Ok(entry)
}

fn migrate_filters(filters: &[LegacyFilter], entry: &mut CheckEntry) -> Result<(), UpgradeError> {
    let mut exclude = Exclude::default();

    for filter in filters {
        match filter.kind.as_deref() {
            Some("name") => exclude.names.push(filter.value.clone()),
            Some("path") => exclude.paths.push(filter.value.clone()),
            _ => entry
                .filters
                .push(serde_yaml::to_value(filter).map_err(UpgradeError::Encode)?),
        }
    }

    entry.exclude = exclude;
    Ok(())
}

/// Upgrades a whole configuration file of the given version.
///
/// Only the `nobadfuncs` entry under `checks` is converted; every other key
/// is carried over as-is. A current-schema file is returned byte for byte.
///
/// # Errors
///
/// Returns [`UpgradeError::Check`] wrapping the cause when the `nobadfuncs`
/// entry cannot be upgraded, or [`UpgradeError::Yaml`] when the file is not
/// a YAML mapping.
pub fn upgrade_file(version: ConfigVersion, contents: &str) -> Result<UpgradeOutcome, UpgradeError> {
    if version == ConfigVersion::V0 {
        return Ok(UpgradeOutcome::Unchanged(contents.to_owned()));
    }

    let mut root: serde_yaml::Value = if contents.trim().is_empty() {
        serde_yaml::Value::Mapping(serde_yaml::Mapping::new())
    } else {
        serde_yaml::from_str(contents).map_err(UpgradeError::Yaml)?
    };

    let entry = root
        .get_mut("checks")
        .and_then(|checks| checks.get_mut(CHECK_NAME));

    if let Some(entry) = entry {
        let wrap = |source: UpgradeError| UpgradeError::Check {
            check: CHECK_NAME.to_owned(),
            source: Box::new(source),
        };

        let legacy: LegacyCheckConfig = if entry.is_null() {
            LegacyCheckConfig::default()
        } else {
            serde_yaml::from_value(entry.clone())
                .map_err(|e| wrap(UpgradeError::Yaml(e)))?
        };
        let upgraded = upgrade_check(&CheckDocument::Legacy(legacy)).map_err(wrap)?;
        *entry = serde_yaml::to_value(upgraded).map_err(UpgradeError::Encode)?;
        debug!(check = CHECK_NAME, "upgraded legacy check configuration");
    }

    let yaml = serde_yaml::to_string(&root).map_err(UpgradeError::Encode)?;
    Ok(UpgradeOutcome::Upgraded(yaml))
}
