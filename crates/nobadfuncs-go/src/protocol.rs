//! Engine side of the line-oriented runner protocol.
//!
//! The engine is invoked with a flat JSON deny-list and a list of package
//! identifiers. It writes one line per diagnostic on stdout, formatted as
//! `<path>:<line>:<column>: <message>` with paths relative to the working
//! directory, and exits non-zero iff it wrote anything.

use std::io::Write;
use std::path::PathBuf;

use nobadfuncs_core::{Diagnostic, IssueSink, LineSink, SignatureTable};

use crate::checker::NoBadFuncs;
use crate::loader::Exclusions;

/// Protocol states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    /// Nothing done yet.
    Idle,
    /// The deny-list was decoded.
    ConfigDecoded,
    /// Packages are being scanned.
    Scanning,
    /// A diagnostic is being written.
    Emitting,
    /// All packages were scanned.
    Done,
    /// The invocation failed before scanning.
    Failed,
}

impl ProtocolState {
    /// Returns true if moving from `self` to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use ProtocolState::{ConfigDecoded, Done, Emitting, Failed, Idle, Scanning};
        matches!(
            (self, next),
            (Idle, ConfigDecoded | Failed)
                | (ConfigDecoded, Scanning)
                | (Scanning, Emitting | Done)
                | (Emitting, Scanning | Done)
        )
    }
}

/// One engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The `--config-json` payload.
    pub config_json: String,
    /// Package identifiers, in order.
    pub target_paths: Vec<String>,
    /// Directory identifiers are resolved against and paths reported
    /// relative to.
    pub working_dir: PathBuf,
}

/// Result of running the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolOutcome {
    /// Terminal state.
    pub state: ProtocolState,
    /// Number of lines written.
    pub diagnostics: usize,
}

impl ProtocolOutcome {
    /// Process exit code: 0 iff the run completed without diagnostics.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.state {
            ProtocolState::Done if self.diagnostics == 0 => 0,
            _ => 1,
        }
    }
}

/// Drives one invocation through the protocol states.
#[derive(Debug)]
pub struct RunnerProtocol {
    state: ProtocolState,
    goroot: Option<PathBuf>,
    exclusions: Exclusions,
}

impl Default for RunnerProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl RunnerProtocol {
    /// Creates a protocol in the [`ProtocolState::Idle`] state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ProtocolState::Idle,
            goroot: None,
            exclusions: Exclusions::default(),
        }
    }

    /// Overrides the Go installation used for standard library imports.
    #[must_use]
    pub fn with_goroot(mut self, goroot: impl Into<PathBuf>) -> Self {
        self.goroot = Some(goroot.into());
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ProtocolState {
        self.state
    }

    fn transition(&mut self, next: ProtocolState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid protocol transition {:?} -> {next:?}",
            self.state
        );
        tracing::debug!(from = ?self.state, to = ?next, "protocol transition");
        self.state = next;
    }

    /// Runs `invocation`, writing result lines to `out`.
    ///
    /// An undecodable configuration is reported as a single line at
    /// `.:1:1` rather than as an error.
    ///
    /// # Errors
    ///
    /// Returns an error only if writing to `out` fails.
    pub fn run(
        &mut self,
        invocation: &Invocation,
        out: &mut dyn Write,
    ) -> std::io::Result<ProtocolOutcome> {
        let mut sink = LineSink::new(out, &invocation.working_dir);

        let table = match SignatureTable::from_json(&invocation.config_json) {
            Ok(table) => table,
            Err(err) => {
                self.transition(ProtocolState::Failed);
                tracing::debug!(error = %err, "configuration rejected");
                sink.emit(Diagnostic::global(err.to_string()).into())?;
                return Ok(ProtocolOutcome {
                    state: self.state,
                    diagnostics: sink.written(),
                });
            }
        };
        self.transition(ProtocolState::ConfigDecoded);

        let mut checker = NoBadFuncs::new(table).with_exclusions(self.exclusions.clone());
        if let Some(goroot) = &self.goroot {
            checker = checker.with_goroot(goroot);
        }

        self.transition(ProtocolState::Scanning);
        checker.run(&invocation.working_dir, &invocation.target_paths, |diagnostic| {
            self.transition(ProtocolState::Emitting);
            sink.emit(diagnostic.into())?;
            self.transition(ProtocolState::Scanning);
            Ok(())
        })?;
        self.transition(ProtocolState::Done);

        Ok(ProtocolOutcome {
            state: self.state,
            diagnostics: sink.written(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        fs::write(root.join("go.mod"), "module example.com/foo\n").expect("write");
        fs::create_dir_all(root.join("goroot/src/os")).expect("mkdir");
        fs::write(root.join("goroot/src/os/proc.go"), "package os\n\nfunc Exit(code int) {}\n")
            .expect("write");
        fs::write(
            root.join("foo.go"),
            "package foo\n\nimport \"os\"\n\nfunc Foo() {\n\tos.Exit(1)\n}\n",
        )
        .expect("write");
        fs::create_dir_all(root.join("inner")).expect("mkdir");
        dir
    }

    fn run(wd: &Path, goroot: &Path, config: &str, targets: &[&str]) -> (ProtocolOutcome, String) {
        let invocation = Invocation {
            config_json: config.to_owned(),
            target_paths: targets.iter().map(|t| (*t).to_owned()).collect(),
            working_dir: wd.to_path_buf(),
        };
        let mut out = Vec::new();
        let outcome = RunnerProtocol::new()
            .with_goroot(goroot)
            .run(&invocation, &mut out)
            .expect("write succeeds");
        (outcome, String::from_utf8(out).expect("utf8"))
    }

    const CONFIG: &str = r#"{"func os.Exit(int)":"do not call os.Exit directly"}"#;

    #[test]
    fn reports_bad_call_relative_to_working_dir() {
        let dir = project();
        let goroot = dir.path().join("goroot");
        let (outcome, out) = run(dir.path(), &goroot, CONFIG, &["."]);
        insta::assert_snapshot!(out.trim_end(), @"foo.go:6:5: do not call os.Exit directly");
        assert_eq!(outcome.state, ProtocolState::Done);
        assert_eq!(outcome.exit_code(), 1);
    }

    #[test]
    fn paths_use_parent_segments_from_inner_directory() {
        let dir = project();
        let goroot = dir.path().join("goroot");
        let (_, out) = run(&dir.path().join("inner"), &goroot, CONFIG, &[".."]);
        assert_eq!(out, "../foo.go:6:5: do not call os.Exit directly\n");
    }

    #[test]
    fn clean_run_exits_zero() {
        let dir = project();
        let goroot = dir.path().join("goroot");
        let (outcome, out) = run(dir.path(), &goroot, r#"{"func os.Getenv(string) string":"no"}"#, &["./..."]);
        assert!(out.is_empty());
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn output_is_deterministic() {
        let dir = project();
        let goroot = dir.path().join("goroot");
        let first = run(dir.path(), &goroot, CONFIG, &["./...", "."]).1;
        let second = run(dir.path(), &goroot, CONFIG, &["./...", "."]).1;
        assert_eq!(first, second);
        assert_eq!(first.lines().count(), 1);
    }

    #[test]
    fn malformed_config_is_a_single_global_line() {
        let dir = project();
        let goroot = dir.path().join("goroot");
        let (outcome, out) = run(dir.path(), &goroot, "{\"a\": 1}", &["."]);
        assert_eq!(outcome.state, ProtocolState::Failed);
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(out.lines().count(), 1);
        assert!(
            out.starts_with(".:1:1: failed to decode configuration JSON \"{\\\"a\\\": 1}\": "),
            "unexpected output: {out}"
        );
    }

    #[test]
    fn transitions_are_validated() {
        use ProtocolState::*;
        assert!(Idle.can_transition_to(ConfigDecoded));
        assert!(Scanning.can_transition_to(Emitting));
        assert!(Emitting.can_transition_to(Scanning));
        assert!(!Idle.can_transition_to(Scanning));
        assert!(!Done.can_transition_to(Scanning));
        assert!(!Failed.can_transition_to(Done));
    }
}
