//! The `nobadfuncs` checker.

use std::path::{Path, PathBuf};

use nobadfuncs_core::{
    CheckConfig, CheckError, CheckRequest, Checker, CheckerCreator, Diagnostic, IssueSink,
    SignatureTable, SubprocessChecker,
};

use crate::loader::{Exclusions, FsPackageSource};
use crate::matcher::Matcher;
use crate::scanner::SourceScanner;

/// Checker type name.
pub const TYPE_NAME: &str = "nobadfuncs";

/// Default checker priority.
pub const PRIORITY: i32 = 0;

/// Reports calls to denied functions and methods.
#[derive(Debug, Clone)]
pub struct NoBadFuncs {
    table: SignatureTable,
    goroot: Option<PathBuf>,
    exclusions: Exclusions,
}

impl NoBadFuncs {
    /// Creates a checker denying the signatures in `table`.
    #[must_use]
    pub fn new(table: SignatureTable) -> Self {
        Self {
            table,
            goroot: None,
            exclusions: Exclusions::default(),
        }
    }

    /// Resolves standard library imports under `goroot` instead of the
    /// detected Go installation.
    #[must_use]
    pub fn with_goroot(mut self, goroot: impl Into<PathBuf>) -> Self {
        self.goroot = Some(goroot.into());
        self
    }

    /// Replaces the rules used when expanding `...` targets.
    #[must_use]
    pub fn with_exclusions(mut self, exclusions: Exclusions) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// The configured deny-list.
    #[must_use]
    pub fn table(&self) -> &SignatureTable {
        &self.table
    }

    /// Scans `targets` relative to `base` and passes every diagnostic to
    /// `emit`, in output order.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `emit`.
    pub fn run(
        &self,
        base: &Path,
        targets: &[String],
        mut emit: impl FnMut(Diagnostic) -> std::io::Result<()>,
    ) -> std::io::Result<()> {
        let mut source = FsPackageSource::discover(base);
        if let Some(goroot) = &self.goroot {
            source = source.with_goroot(goroot);
        }
        let scanner =
            SourceScanner::new(Box::new(source)).with_exclusions(self.exclusions.clone());
        let matcher = Matcher::new(&self.table);
        scanner.scan(base, targets, |file| {
            for diagnostic in matcher.match_file(&file) {
                emit(diagnostic)?;
            }
            Ok(())
        })
    }
}

impl Checker for NoBadFuncs {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn check(&self, request: &CheckRequest, sink: &mut dyn IssueSink) -> Result<(), CheckError> {
        tracing::debug!(
            packages = ?request.pkg_paths,
            signatures = self.table.len(),
            "running nobadfuncs in process"
        );
        self.run(&request.working_dir, &request.pkg_paths, |d| sink.emit(d.into()))?;
        Ok(())
    }
}

/// Creator for the in-process checker.
#[must_use]
pub fn creator() -> CheckerCreator {
    Box::new(|config_yaml| {
        let config = CheckConfig::from_yaml(config_yaml)?;
        Ok(Box::new(NoBadFuncs::new(config.bad_funcs)) as Box<dyn Checker>)
    })
}

/// Creator for a checker that runs `program` as the engine process,
/// passing the deny-list as `--config-json`.
#[must_use]
pub fn subprocess_creator(program: PathBuf) -> CheckerCreator {
    Box::new(move |config_yaml| {
        let config = CheckConfig::from_yaml(config_yaml)?;
        let json = config.bad_funcs.to_json()?;
        let checker = SubprocessChecker::new(TYPE_NAME, program.clone(), ["--config-json".to_owned(), json])
            .with_priority(PRIORITY);
        Ok(Box::new(checker) as Box<dyn Checker>)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nobadfuncs_core::{CheckerRegistry, Issue};
    use std::fs;

    #[test]
    fn creator_decodes_bad_funcs() {
        let registry = CheckerRegistry::new().with(TYPE_NAME, PRIORITY, creator());
        let checker = registry
            .create(
                TYPE_NAME,
                "bad-funcs:\n  \"func os.Exit(int)\": \"do not call os.Exit directly\"\n",
            )
            .expect("creates");
        assert_eq!(checker.type_name(), "nobadfuncs");
        assert_eq!(checker.priority(), 0);
    }

    #[test]
    fn creator_rejects_malformed_yaml() {
        assert!(creator()("bad-funcs: [").is_err());
    }

    #[test]
    fn checks_directory_in_process() {
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

        let table = [("func os.Exit(int)", "do not call os.Exit directly")]
            .into_iter()
            .collect();
        let checker = NoBadFuncs::new(table).with_goroot(root.join("goroot"));
        let mut issues: Vec<Issue> = Vec::new();
        checker
            .check(&CheckRequest::new(vec![".".to_owned()], root), &mut issues)
            .expect("check runs");

        let rendered: Vec<String> = issues.iter().map(|i| i.render(root)).collect();
        assert_eq!(rendered, vec!["foo.go:6:5: do not call os.Exit directly"]);
    }
}
