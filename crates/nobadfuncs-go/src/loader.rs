//! Locating Go packages on disk.
//!
//! Package identifiers given on the command line are directories relative to
//! a base directory, optionally with a trailing `/...`. Imports are resolved
//! through a [`PackageSource`], whose default implementation looks in the
//! enclosing module, its `vendor` directory and `$GOROOT/src`.

use std::path::{Path, PathBuf};

use nobadfuncs_core::utils::normalize;
use nobadfuncs_core::Exclude;
use regex::Regex;

/// Resolves import paths to package directories.
pub trait PackageSource {
    /// Directory holding the package with the given import path.
    fn locate(&self, import_path: &str) -> Option<PathBuf>;

    /// Import path of the package in `dir`, if it can be derived.
    fn import_path_of(&self, dir: &Path) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Module {
    root: PathBuf,
    path: String,
}

/// Filesystem-backed [`PackageSource`].
#[derive(Debug, Clone, Default)]
pub struct FsPackageSource {
    module: Option<Module>,
    goroot: Option<PathBuf>,
}

impl FsPackageSource {
    /// Discovers the module enclosing `base` and the Go installation.
    ///
    /// The installation is `$GOROOT` when set, else what `go env GOROOT`
    /// reports, else `/usr/local/go` if it exists.
    #[must_use]
    pub fn discover(base: &Path) -> Self {
        let module = find_module(&normalize(base));
        let goroot = detect_goroot(std::env::var_os("GOROOT"), go_env_goroot);
        if let Some(m) = &module {
            tracing::debug!(module = %m.path, root = %m.root.display(), "found go.mod");
        }
        Self { module, goroot }
    }

    /// Overrides the Go installation directory.
    #[must_use]
    pub fn with_goroot(mut self, goroot: impl Into<PathBuf>) -> Self {
        self.goroot = Some(goroot.into());
        self
    }

    /// Module path declared by the enclosing `go.mod`.
    #[must_use]
    pub fn module_path(&self) -> Option<&str> {
        self.module.as_ref().map(|m| m.path.as_str())
    }
}

impl PackageSource for FsPackageSource {
    fn locate(&self, import_path: &str) -> Option<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(m) = &self.module {
            if import_path == m.path {
                candidates.push(m.root.clone());
            } else if let Some(rest) = import_path
                .strip_prefix(m.path.as_str())
                .and_then(|r| r.strip_prefix('/'))
            {
                candidates.push(m.root.join(rest));
            }
            candidates.push(m.root.join("vendor").join(import_path));
        }
        if let Some(goroot) = &self.goroot {
            candidates.push(goroot.join("src").join(import_path));
        }
        candidates.into_iter().find(|dir| dir.is_dir())
    }

    fn import_path_of(&self, dir: &Path) -> Option<String> {
        let m = self.module.as_ref()?;
        let rel = normalize(dir).strip_prefix(&m.root).ok()?.to_path_buf();
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        if rel.is_empty() {
            Some(m.path.clone())
        } else {
            Some(format!("{}/{rel}", m.path))
        }
    }
}

const FALLBACK_GOROOT: &str = "/usr/local/go";

fn detect_goroot(
    env: Option<std::ffi::OsString>,
    go_env: impl FnOnce() -> Option<PathBuf>,
) -> Option<PathBuf> {
    let goroot = env
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(go_env)
        .or_else(|| Some(PathBuf::from(FALLBACK_GOROOT)).filter(|p| p.is_dir()));
    match &goroot {
        Some(dir) => tracing::debug!(goroot = %dir.display(), "using Go installation"),
        None => tracing::debug!("no Go installation found"),
    }
    goroot
}

/// Asks the `go` tool for its installation directory.
fn go_env_goroot() -> Option<PathBuf> {
    let output = match std::process::Command::new("go")
        .args(["env", "GOROOT"])
        .stdin(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .output()
    {
        Ok(output) => output,
        Err(err) => {
            tracing::debug!(error = %err, "cannot run `go env GOROOT`");
            return None;
        }
    };
    if !output.status.success() {
        tracing::debug!(status = %output.status, "`go env GOROOT` failed");
        return None;
    }
    let dir = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    (!dir.is_empty()).then(|| PathBuf::from(dir))
}

/// Returns true if `import_path` names a standard library package.
///
/// Standard library paths have no dot in their first element.
#[must_use]
pub fn is_std_import(import_path: &str) -> bool {
    import_path
        .split('/')
        .next()
        .is_some_and(|first| !first.is_empty() && !first.contains('.'))
}

fn find_module(base: &Path) -> Option<Module> {
    for dir in base.ancestors() {
        let gomod = dir.join("go.mod");
        let Ok(content) = std::fs::read_to_string(&gomod) else {
            continue;
        };
        let path = content.lines().find_map(|line| {
            let rest = line.trim().strip_prefix("module")?;
            let rest = rest.split("//").next().unwrap_or_default().trim();
            (!rest.is_empty()).then(|| rest.trim_matches('"').to_owned())
        })?;
        return Some(Module {
            root: dir.to_path_buf(),
            path,
        });
    }
    None
}

/// Name and path rules for directories skipped by `...` expansion.
#[derive(Debug, Clone)]
pub struct Exclusions {
    names: Vec<Regex>,
    paths: Vec<Regex>,
}

impl Default for Exclusions {
    /// Skips dot-prefixed names and `vendor`.
    fn default() -> Self {
        Self {
            names: vec![anchored(r"\..+"), anchored("vendor")]
                .into_iter()
                .flatten()
                .collect(),
            paths: Vec::new(),
        }
    }
}

fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

impl Exclusions {
    /// Exclusions that skip nothing.
    #[must_use]
    pub fn none() -> Self {
        Self {
            names: Vec::new(),
            paths: Vec::new(),
        }
    }

    /// Builds exclusions from configured rules.
    ///
    /// Name rules must match a whole file or directory name. Path rules
    /// match a path relative to the base directory, or any of its ancestors.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule is not a valid regular expression.
    pub fn from_exclude(exclude: &Exclude) -> Result<Self, regex::Error> {
        Ok(Self {
            names: exclude
                .names
                .iter()
                .map(|p| anchored(p))
                .collect::<Result<_, _>>()?,
            paths: exclude
                .paths
                .iter()
                .map(|p| Regex::new(&format!("^(?:{p})(?:/|$)")))
                .collect::<Result<_, _>>()?,
        })
    }

    /// Returns true if `rel` (relative to the base directory) is excluded.
    #[must_use]
    pub fn is_excluded(&self, rel: &Path) -> bool {
        let name_hit = rel
            .file_name()
            .map(|n| n.to_string_lossy())
            .is_some_and(|n| self.names.iter().any(|r| r.is_match(&n)));
        if name_hit {
            return true;
        }
        let rel = rel.to_string_lossy().replace('\\', "/");
        self.paths.iter().any(|r| r.is_match(&rel))
    }
}

/// Non-test `.go` files directly in `dir`, sorted by path.
///
/// # Errors
///
/// Returns an error if `dir` cannot be read.
pub fn go_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.ends_with(".go") && !name.ends_with("_test.go") {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Expands package identifiers into package directories.
///
/// Directories appear in the order of `targets`; `<dir>/...` contributes
/// every directory below `<dir>` holding Go files, in lexical order. A
/// directory named by several identifiers is listed once.
#[must_use]
pub fn expand_targets(base: &Path, targets: &[String], exclusions: &Exclusions) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    for target in targets {
        let (prefix, recursive) = match target.strip_suffix("...") {
            Some(p) => (p.trim_end_matches('/'), true),
            None => (target.as_str(), false),
        };
        let prefix = if prefix.is_empty() { "." } else { prefix };
        let root = normalize(&base.join(prefix));
        if !root.is_dir() {
            tracing::debug!(target = %target, "package directory does not exist");
            continue;
        }
        if !recursive {
            push_unique(&mut dirs, root);
            continue;
        }
        for dir in walk_package_dirs(&root, base, exclusions) {
            push_unique(&mut dirs, dir);
        }
    }
    dirs
}

fn push_unique(dirs: &mut Vec<PathBuf>, dir: PathBuf) {
    if !dirs.contains(&dir) {
        dirs.push(dir);
    }
}

fn walk_package_dirs(root: &Path, base: &Path, exclusions: &Exclusions) -> Vec<PathBuf> {
    let filter = exclusions.clone();
    let base = normalize(base);
    let mut builder = ignore::WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let path = normalize(entry.path());
            let rel = path.strip_prefix(&base).unwrap_or(&path);
            !filter.is_excluded(rel)
        });

    let mut dirs = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_dir()) {
            continue;
        }
        let dir = normalize(entry.path());
        match go_files(&dir) {
            Ok(files) if !files.is_empty() => dirs.push(dir),
            Ok(_) => {}
            Err(err) => tracing::warn!(dir = %dir.display(), error = %err, "cannot list directory"),
        }
    }
    dirs
}
