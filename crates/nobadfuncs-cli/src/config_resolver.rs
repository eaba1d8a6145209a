//! Check configuration resolution with global fallback.
//!
//! Resolves the configuration file using a deterministic priority order:
//!
//! 1. `--config` flag (explicit path)
//! 2. `{project}/godel/config/check-plugin.yml`
//! 3. `{project}/godel/config/check.yml` (legacy schema, upgraded in memory)
//! 4. `~/.nobadfuncs/config.yml` (global fallback)
//! 5. No config found → defaults

use anyhow::{Context, Result};
use nobadfuncs_core::upgrade::{upgrade_file, ConfigVersion};
use nobadfuncs_core::ChecksDocument;
use std::path::{Path, PathBuf};

/// Where the configuration was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly specified via `--config` flag.
    Explicit(PathBuf),
    /// Found in the project directory.
    Project(PathBuf),
    /// Legacy configuration found in the project directory.
    Legacy(PathBuf),
    /// Loaded from the global config directory (`~/.nobadfuncs/`).
    Global(PathBuf),
    /// No config found; defaults will be used.
    Default,
}

impl ConfigSource {
    /// Returns the resolved path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Legacy(p) | Self::Global(p) => Some(p),
            Self::Default => None,
        }
    }

    /// Returns `true` if the config was loaded from the global directory.
    #[must_use]
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global(_))
    }
}

const PROJECT_CONFIG: &str = "godel/config/check-plugin.yml";

const LEGACY_CONFIG: &str = "godel/config/check.yml";

/// Config file name within the global config directory.
const GLOBAL_CONFIG_NAME: &str = "config.yml";

/// Resolves the configuration file path.
///
/// See module-level docs for resolution order.
#[must_use]
pub fn resolve(project_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
    resolve_inner(project_dir, explicit, global_config_dir())
}

fn resolve_inner(
    project_dir: &Path,
    explicit: Option<&Path>,
    global_dir: Option<PathBuf>,
) -> ConfigSource {
    if let Some(p) = explicit {
        return ConfigSource::Explicit(p.to_path_buf());
    }

    let candidate = project_dir.join(PROJECT_CONFIG);
    if candidate.exists() {
        tracing::debug!("Found project config: {}", candidate.display());
        return ConfigSource::Project(candidate);
    }

    let candidate = project_dir.join(LEGACY_CONFIG);
    if candidate.exists() {
        tracing::debug!("Found legacy project config: {}", candidate.display());
        return ConfigSource::Legacy(candidate);
    }

    if let Some(dir) = global_dir {
        let candidate = dir.join(GLOBAL_CONFIG_NAME);
        if candidate.exists() {
            tracing::debug!("Found global config: {}", candidate.display());
            return ConfigSource::Global(candidate);
        }
    }

    ConfigSource::Default
}

/// Returns the global config directory path.
///
/// Resolution: `$NOBADFUNCS_CONFIG_DIR` > `~/.nobadfuncs/`
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("NOBADFUNCS_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }
    home::home_dir().map(|h| h.join(".nobadfuncs"))
}

/// Loads the document a [`ConfigSource`] points at.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or upgraded.
pub fn load(source: &ConfigSource) -> Result<ChecksDocument> {
    match source {
        ConfigSource::Default => Ok(ChecksDocument::default()),
        ConfigSource::Legacy(p) => {
            let contents = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read config: {}", p.display()))?;
            let outcome = upgrade_file(ConfigVersion::Legacy, &contents)
                .with_context(|| format!("Failed to upgrade legacy config: {}", p.display()))?;
            tracing::warn!(
                "{} uses the legacy schema; run `nobadfuncs upgrade-config --legacy {}` to migrate it",
                p.display(),
                p.display()
            );
            ChecksDocument::from_yaml(outcome.contents())
                .with_context(|| format!("Failed to load config: {}", p.display()))
        }
        other => {
            let p = other.path().context("resolved config has no path")?;
            if other.is_global() {
                tracing::info!("Using global config: {}", p.display());
            }
            ChecksDocument::from_file(p)
                .with_context(|| format!("Failed to load config: {}", p.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn explicit_takes_priority_over_project() {
        let tmp = TempDir::new().unwrap();
        let explicit = tmp.path().join("custom.yml");
        write(&explicit, "");
        write(&tmp.path().join(PROJECT_CONFIG), "");

        let result = resolve_inner(tmp.path(), Some(&explicit), None);
        assert_eq!(result, ConfigSource::Explicit(explicit));
    }

    #[test]
    fn explicit_does_not_check_existence() {
        let result = resolve_inner(Path::new("/tmp"), Some(Path::new("/nonexistent.yml")), None);
        assert_eq!(result, ConfigSource::Explicit(PathBuf::from("/nonexistent.yml")));
    }

    #[test]
    fn plugin_config_wins_over_legacy() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join(PROJECT_CONFIG), "");
        write(&tmp.path().join(LEGACY_CONFIG), "");

        let result = resolve_inner(tmp.path(), None, None);
        assert_eq!(result, ConfigSource::Project(tmp.path().join(PROJECT_CONFIG)));
    }

    #[test]
    fn legacy_config_found() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join(LEGACY_CONFIG), "");

        let result = resolve_inner(tmp.path(), None, None);
        assert_eq!(result, ConfigSource::Legacy(tmp.path().join(LEGACY_CONFIG)));
    }

    #[test]
    fn global_fallback_when_no_project_config() {
        let project = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        write(&global.path().join(GLOBAL_CONFIG_NAME), "");

        let result = resolve_inner(project.path(), None, Some(global.path().to_path_buf()));
        assert!(result.is_global());
        assert_eq!(result.path(), Some(global.path().join(GLOBAL_CONFIG_NAME).as_path()));
    }

    #[test]
    fn default_when_nothing_found() {
        let project = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();

        let result = resolve_inner(project.path(), None, Some(global.path().to_path_buf()));
        assert_eq!(result, ConfigSource::Default);
        assert!(load(&result).unwrap().checks.is_empty());
    }

    #[test]
    fn legacy_config_is_upgraded_on_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LEGACY_CONFIG);
        write(
            &path,
            r#"checks:
  nobadfuncs:
    args: ["--config", "{\"func os.Exit(int)\": \"no exit\"}"]
    filters:
      - type: name
        value: ".*.pb.go"
"#,
        );

        let doc = load(&ConfigSource::Legacy(path)).unwrap();
        let entry = doc.check("nobadfuncs").unwrap();
        assert_eq!(entry.exclude.names, vec![".*.pb.go".to_owned()]);
        assert!(entry.config_yaml().unwrap().contains("func os.Exit(int)"));
    }

    #[test]
    fn broken_legacy_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LEGACY_CONFIG);
        write(&path, "checks:\n  nobadfuncs:\n    args: [\"-help\"]\n");

        let err = load(&ConfigSource::Legacy(path)).unwrap_err();
        assert!(format!("{err:#}").contains("\"args\" is \"--config\""));
    }
}
