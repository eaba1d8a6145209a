//! Orchestrated check: config file in, filtered issue lines out.

use anyhow::{Context, Result};
use nobadfuncs_core::utils::{normalize, relative_to};
use nobadfuncs_core::{CheckRequest, CheckerRegistry, Issue, IssueSink, LineSink};
use nobadfuncs_go::{Exclusions, TYPE_NAME};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config_resolver;

/// Runs the check command.
///
/// Exits 1 if any located issue survives the configured exclusions.
pub fn run(
    registry: &CheckerRegistry,
    pkg_dir: &Path,
    explicit_config: Option<&Path>,
    pkgs: Vec<String>,
) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    let pkg_dir = normalize(&cwd.join(pkg_dir));

    let source = config_resolver::resolve(&pkg_dir, explicit_config);
    let document = config_resolver::load(&source)?;
    let entry = document.check(TYPE_NAME).cloned().unwrap_or_default();

    if entry.skip {
        tracing::info!("{TYPE_NAME} is skipped by configuration");
        return Ok(());
    }

    let exclusions = Exclusions::from_exclude(&entry.exclude)
        .context("Invalid exclude pattern in check configuration")?;
    let checker = registry.create(TYPE_NAME, &entry.config_yaml()?)?;

    let pkgs = if pkgs.is_empty() {
        vec!["./...".to_owned()]
    } else {
        pkgs
    };
    let request = CheckRequest::new(pkgs, &pkg_dir);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "Running {}...", checker.type_name())?;

    let mut sink = ExcludingSink {
        inner: LineSink::new(&mut out, &cwd),
        exclusions,
        root: pkg_dir,
        reported: 0,
    };
    checker.check(&request, &mut sink)?;
    let reported = sink.reported;

    writeln!(out, "Finished {}", checker.type_name())?;
    out.flush()?;
    drop(out);

    if reported > 0 {
        tracing::debug!(reported, "check produced issues");
        std::process::exit(1);
    }

    Ok(())
}

/// Drops located issues whose file is excluded, relative to `root`.
struct ExcludingSink<S> {
    inner: S,
    exclusions: Exclusions,
    root: PathBuf,
    reported: usize,
}

impl<S: IssueSink> ExcludingSink<S> {
    fn excluded(&self, file: &Path) -> bool {
        let rel = relative_to(file, &self.root);
        rel.ancestors()
            .filter(|a| !a.as_os_str().is_empty())
            .any(|a| self.exclusions.is_excluded(a))
    }
}

impl<S: IssueSink> IssueSink for ExcludingSink<S> {
    fn emit(&mut self, issue: Issue) -> std::io::Result<()> {
        if let Some(diagnostic) = issue.diagnostic() {
            if self.excluded(&diagnostic.location.file) {
                tracing::debug!(file = %diagnostic.location.file.display(), "issue excluded");
                return Ok(());
            }
            self.reported += 1;
        }
        self.inner.emit(issue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nobadfuncs_core::{Diagnostic, Exclude, Location};

    fn sink(exclude: Exclude) -> ExcludingSink<Vec<Issue>> {
        ExcludingSink {
            inner: Vec::new(),
            exclusions: Exclusions::from_exclude(&exclude).unwrap(),
            root: PathBuf::from("/w"),
            reported: 0,
        }
    }

    fn located(file: &str) -> Issue {
        Diagnostic::new(Location::new(file, 1, 1), "bad").into()
    }

    #[test]
    fn excluded_names_are_dropped() {
        let mut sink = sink(Exclude {
            names: vec![r".*\.pb\.go".to_owned()],
            paths: Vec::new(),
        });
        sink.emit(located("/w/api/service.pb.go")).unwrap();
        sink.emit(located("/w/api/service.go")).unwrap();

        assert_eq!(sink.reported, 1);
        assert_eq!(sink.inner, vec![located("/w/api/service.go")]);
    }

    #[test]
    fn excluded_directories_cover_their_files() {
        let mut sink = sink(Exclude {
            names: vec!["generated".to_owned()],
            paths: vec!["internal/legacy".to_owned()],
        });
        sink.emit(located("/w/generated/a.go")).unwrap();
        sink.emit(located("/w/internal/legacy/sub/b.go")).unwrap();
        sink.emit(located("/w/internal/current/c.go")).unwrap();

        assert_eq!(sink.reported, 1);
        assert_eq!(sink.inner.len(), 1);
    }

    #[test]
    fn raw_lines_pass_through_uncounted() {
        let mut sink = sink(Exclude::default());
        sink.emit(Issue::Raw("note".to_owned())).unwrap();

        assert_eq!(sink.reported, 0);
        assert_eq!(sink.inner, vec![Issue::Raw("note".to_owned())]);
    }
}
