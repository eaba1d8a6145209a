//! Running checkers as child processes.
//!
//! A [`SubprocessChecker`] marshals the [`Checker`] contract across a pipe:
//! the child prints one issue per line on stdout, and those lines are parsed
//! back into [`Issue`]s. [`run_raw`] forwards a child's output untouched.

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;

use crate::checker::{CheckError, CheckRequest, Checker, IssueSink};
use crate::types::Issue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

enum Event {
    Line(Stream, Vec<u8>),
    Failed(std::io::Error),
}

/// Checker that runs a separate program and parses its output.
#[derive(Debug, Clone)]
pub struct SubprocessChecker {
    type_name: &'static str,
    priority: i32,
    program: PathBuf,
    args: Vec<OsString>,
}

impl SubprocessChecker {
    /// Creates a checker running `program` with `args` followed by the
    /// requested package identifiers.
    pub fn new<I, S>(type_name: &'static str, program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            type_name,
            priority: 0,
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Sets the reported priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Program this checker runs.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn spawn(&self, request: &CheckRequest) -> Result<Child, CheckError> {
        tracing::debug!(
            program = %self.program.display(),
            packages = request.pkg_paths.len(),
            "spawning checker process"
        );
        Command::new(&self.program)
            .args(&self.args)
            .args(&request.pkg_paths)
            .current_dir(&request.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CheckError::Spawn {
                program: self.program.clone(),
                source,
            })
    }
}

impl Checker for SubprocessChecker {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn check(&self, request: &CheckRequest, sink: &mut dyn IssueSink) -> Result<(), CheckError> {
        let mut child = self.spawn(request)?;
        let status = pump(&mut child, &self.program, |stream, bytes| {
            let line = String::from_utf8_lossy(&bytes);
            let line = line.trim_end_matches(['\n', '\r']);
            let issue = match stream {
                Stream::Stdout => Issue::parse_line(line, &request.working_dir),
                Stream::Stderr => Issue::Raw(line.to_owned()),
            };
            sink.emit(issue)
        })?;
        tracing::debug!(program = %self.program.display(), %status, "checker process exited");
        Ok(())
    }
}

/// Drains both output streams of `child` into `on_line` and waits for it.
///
/// One reader thread per stream feeds a channel, so neither pipe can fill up
/// while the other is being read. The child is waited on only after both
/// streams are closed. If `on_line` fails the child is killed, the remaining
/// output is discarded, and the first error is returned.
fn pump(
    child: &mut Child,
    program: &Path,
    mut on_line: impl FnMut(Stream, Vec<u8>) -> std::io::Result<()>,
) -> Result<ExitStatus, CheckError> {
    let (tx, rx) = mpsc::channel();
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(Stream::Stdout, stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(Stream::Stderr, stderr, tx.clone()));
    }
    drop(tx);

    let mut failure = None;
    for event in rx {
        if failure.is_some() {
            continue;
        }
        let result = match event {
            Event::Line(stream, bytes) => on_line(stream, bytes),
            Event::Failed(err) => Err(err),
        };
        if let Err(err) = result {
            if let Err(kill) = child.kill() {
                tracing::warn!(program = %program.display(), error = %kill, "failed to kill child process");
            }
            failure = Some(err);
        }
    }

    for reader in readers {
        if reader.join().is_err() {
            tracing::warn!(program = %program.display(), "output reader thread panicked");
        }
    }
    let status = child.wait()?;
    match failure {
        Some(err) => Err(CheckError::Io(err)),
        None => Ok(status),
    }
}

fn spawn_reader<R>(stream: Stream, pipe: R, tx: mpsc::Sender<Event>) -> thread::JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        loop {
            let mut buf = Vec::new();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(Event::Line(stream, buf)).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    if tx.send(Event::Failed(err)).is_err() {
                        tracing::debug!(?stream, "read error after consumer stopped");
                    }
                    break;
                }
            }
        }
    })
}

/// Runs `program` with `args` in `working_dir` and copies its combined
/// output into `out` without modification.
///
/// Returns the child's exit code; a child killed by a signal reports 1.
///
/// # Errors
///
/// Returns an error if the program cannot be started or `out` rejects a
/// write.
pub fn run_raw<I, S>(
    program: &Path,
    args: I,
    working_dir: &Path,
    out: &mut dyn Write,
) -> Result<i32, CheckError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let mut child = Command::new(program)
        .args(args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| CheckError::Spawn {
            program: program.to_path_buf(),
            source,
        })?;

    let status = pump(&mut child, program, |_, bytes| {
        out.write_all(&bytes)?;
        out.flush()
    })?;
    Ok(status.code().unwrap_or(1))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::types::{Diagnostic, Location};

    fn sh(script: &str) -> (PathBuf, Vec<String>) {
        (PathBuf::from("/bin/sh"), vec!["-c".to_owned(), script.to_owned()])
    }

    #[test]
    fn subprocess_lines_become_issues() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (program, args) = sh("printf 'foo.go:6:5: bad\\nplain text\\n'; echo oops >&2");
        let checker = SubprocessChecker::new("nobadfuncs", program, args);

        let mut issues: Vec<Issue> = Vec::new();
        checker
            .check(&CheckRequest::new(Vec::new(), dir.path()), &mut issues)
            .expect("check runs");

        assert_eq!(issues.len(), 3);
        assert!(issues.contains(&Issue::Located(Diagnostic::new(
            Location::new(dir.path().join("foo.go"), 6, 5),
            "bad",
        ))));
        assert!(issues.contains(&Issue::Raw("plain text".into())));
        assert!(issues.contains(&Issue::Raw("oops".into())));
    }

    #[test]
    fn package_paths_are_appended_to_args() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (program, mut args) = sh("for p in \"$@\"; do echo \"$p\"; done");
        args.push("sh".to_owned());
        let checker = SubprocessChecker::new("nobadfuncs", program, args);

        let mut issues: Vec<Issue> = Vec::new();
        checker
            .check(
                &CheckRequest::new(vec!["./a".into(), "./b/...".into()], dir.path()),
                &mut issues,
            )
            .expect("check runs");
        assert_eq!(
            issues,
            vec![Issue::Raw("./a".into()), Issue::Raw("./b/...".into())]
        );
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let checker = SubprocessChecker::new("nobadfuncs", "/nonexistent/checker", Vec::<String>::new());
        let mut issues: Vec<Issue> = Vec::new();
        let err = checker
            .check(&CheckRequest::new(Vec::new(), dir.path()), &mut issues)
            .unwrap_err();
        assert!(matches!(err, CheckError::Spawn { .. }));
    }

    #[test]
    fn raw_output_is_forwarded_verbatim() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (program, args) = sh("printf 'a:1:1: x\\n  keep spacing  \\nno newline'; exit 3");
        let mut out = Vec::new();
        let code = run_raw(&program, &args, dir.path(), &mut out).expect("runs");
        assert_eq!(code, 3);
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "a:1:1: x\n  keep spacing  \nno newline"
        );
    }

    #[test]
    fn raw_success_exit_code_is_zero() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (program, args) = sh("true");
        let mut out = Vec::new();
        assert_eq!(run_raw(&program, &args, dir.path(), &mut out).expect("runs"), 0);
        assert!(out.is_empty());
    }

    /// Writes far more than a pipe buffer holds on both streams at once.
    const FLOOD: &str = "i=1; while [ $i -le 20000 ]; do \
         echo \"flood.go:$i:1: stdout line $i\"; echo \"stderr line $i\" >&2; \
         i=$((i+1)); done";

    #[test]
    fn large_output_on_both_streams_does_not_block() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (program, args) = sh(FLOOD);
        let checker = SubprocessChecker::new("nobadfuncs", program, args);

        let mut issues: Vec<Issue> = Vec::new();
        checker
            .check(&CheckRequest::new(Vec::new(), dir.path()), &mut issues)
            .expect("check runs");

        assert_eq!(issues.len(), 40_000);
        let located: Vec<&Diagnostic> = issues.iter().filter_map(Issue::diagnostic).collect();
        assert_eq!(located.len(), 20_000);
        assert_eq!(located[0].location.line, 1);
        assert_eq!(located[19_999].location.line, 20_000);
        assert!(issues.contains(&Issue::Raw("stderr line 20000".into())));
    }

    #[test]
    fn large_raw_output_is_forwarded_whole() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (program, args) = sh(FLOOD);
        let mut out = Vec::new();
        assert_eq!(run_raw(&program, &args, dir.path(), &mut out).expect("runs"), 0);

        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text.lines().count(), 40_000);
        assert!(text.len() > 64 * 1024 * 2);
    }
}
