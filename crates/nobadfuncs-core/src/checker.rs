//! Checker traits and the explicit checker registry.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::ConfigError;
use crate::types::Issue;

/// Errors that abort a whole check run.
///
/// Per-file problems are not errors: they are reported as diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// Writing output or reading a child pipe failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The checker could not be configured.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A checker process could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// No creator is registered under the requested name.
    #[error("unknown checker type {0:?}")]
    UnknownChecker(String),
}

/// One invocation of a checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRequest {
    /// Package identifiers to check, in order.
    pub pkg_paths: Vec<String>,
    /// Directory package identifiers are resolved against, and that
    /// reported paths are made relative to.
    pub working_dir: PathBuf,
}

impl CheckRequest {
    /// Creates a new request.
    #[must_use]
    pub fn new(pkg_paths: Vec<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            pkg_paths,
            working_dir: working_dir.into(),
        }
    }
}

/// Receives issues as a checker produces them.
pub trait IssueSink {
    /// Accepts one issue.
    ///
    /// # Errors
    ///
    /// Returns an error if the issue cannot be delivered.
    fn emit(&mut self, issue: Issue) -> std::io::Result<()>;
}

impl IssueSink for Vec<Issue> {
    fn emit(&mut self, issue: Issue) -> std::io::Result<()> {
        self.push(issue);
        Ok(())
    }
}

/// Writes issues in the line format, one flushed line per issue.
///
/// This is the only place where a typed issue becomes text.
pub struct LineSink<W: Write> {
    out: W,
    base: PathBuf,
    written: usize,
}

impl<W: Write> LineSink<W> {
    /// Creates a sink rendering located issues relative to `base`.
    pub fn new(out: W, base: impl Into<PathBuf>) -> Self {
        Self {
            out,
            base: base.into(),
            written: 0,
        }
    }

    /// Number of lines written so far.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    /// Directory located issues are rendered relative to.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Consumes the sink, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> IssueSink for LineSink<W> {
    fn emit(&mut self, issue: Issue) -> std::io::Result<()> {
        writeln!(self.out, "{}", issue.render(&self.base))?;
        self.out.flush()?;
        self.written += 1;
        Ok(())
    }
}

/// A checker that reports issues for a set of packages.
///
/// Implemented both in-process and by [`crate::SubprocessChecker`], which
/// marshals the same contract across a pipe.
pub trait Checker: Send + Sync {
    /// Checker type name (e.g. `"nobadfuncs"`).
    fn type_name(&self) -> &'static str;

    /// Ordering hint for orchestrators running several checkers.
    fn priority(&self) -> i32 {
        0
    }

    /// Checks the requested packages, streaming issues into `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures that abort the whole run.
    fn check(&self, request: &CheckRequest, sink: &mut dyn IssueSink) -> Result<(), CheckError>;
}

/// Builds a checker from its configuration YAML.
pub type CheckerCreator =
    Box<dyn Fn(&str) -> Result<Box<dyn Checker>, ConfigError> + Send + Sync>;

struct Registration {
    priority: i32,
    creator: CheckerCreator,
}

/// Maps checker type names to their creators.
///
/// Constructed explicitly at startup and passed by reference to whatever
/// dispatches checks.
#[derive(Default)]
pub struct CheckerRegistry {
    entries: BTreeMap<String, Registration>,
}

impl CheckerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a creator, replacing any previous one with the same name.
    pub fn register(&mut self, name: impl Into<String>, priority: i32, creator: CheckerCreator) {
        let name = name.into();
        tracing::debug!(checker = %name, priority, "registered checker");
        self.entries.insert(name, Registration { priority, creator });
    }

    /// Builder-style variant of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, priority: i32, creator: CheckerCreator) -> Self {
        self.register(name, priority, creator);
        self
    }

    /// Builds the checker registered under `name` from `config_yaml`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError::UnknownChecker`] for an unregistered name, or
    /// the creator's configuration error.
    pub fn create(&self, name: &str, config_yaml: &str) -> Result<Box<dyn Checker>, CheckError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| CheckError::UnknownChecker(name.to_owned()))?;
        Ok((entry.creator)(config_yaml)?)
    }

    /// Registered priority of `name`.
    #[must_use]
    pub fn priority(&self, name: &str) -> Option<i32> {
        self.entries.get(name).map(|e| e.priority)
    }

    /// Registered names, ordered by priority then name.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<(&str, i32)> = self
            .entries
            .iter()
            .map(|(n, e)| (n.as_str(), e.priority))
            .collect();
        names.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(b.0)));
        names.into_iter().map(|(n, _)| n).collect()
    }
}
