//! Core types for checker findings and their line format.
//!
//! A [`Diagnostic`] is typed from the moment the scanner produces it. It is
//! only turned into text at the process boundary, in the exact form
//! `<path>:<line>:<column>: <message>`, and parsed back into an [`Issue`] on
//! the caller side.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::utils::paths::{normalize, relative_to};

/// Source code location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File path, relative to the working directory it was reported against.
    pub file: PathBuf,
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed, counted in bytes).
    pub column: usize,
}

impl Location {
    /// Creates a new location with explicit values.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

/// A located report of one disallowed call (or of a file-level failure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Where the finding is.
    pub location: Location,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// Creates a new diagnostic.
    #[must_use]
    pub fn new(location: Location, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }

    /// A diagnostic that is not tied to any source file.
    ///
    /// Used for invocation-wide failures such as an undecodable
    /// configuration, so that they still travel over the line protocol.
    #[must_use]
    pub fn global(message: impl Into<String>) -> Self {
        Self::new(Location::new(".", 1, 1), message)
    }

    /// Returns a copy whose path is expressed relative to `base`.
    ///
    /// Both paths are normalized lexically first, so `inner/../foo.go` seen
    /// from `inner` renders as `../foo.go`.
    #[must_use]
    pub fn relative_to(&self, base: &Path) -> Self {
        let mut out = self.clone();
        out.location.file = relative_to(&self.location.file, base);
        out
    }
}

/// Renders as one line: line breaks in the message are written as `\n` and
/// `\r` escapes.
impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: ",
            self.location.file.display(),
            self.location.line,
            self.location.column,
        )?;
        for part in self.message.split_inclusive(['\n', '\r']) {
            match part.strip_suffix('\n') {
                Some(rest) => write!(f, "{rest}\\n")?,
                None => match part.strip_suffix('\r') {
                    Some(rest) => write!(f, "{rest}\\r")?,
                    None => f.write_str(part)?,
                },
            }
        }
        Ok(())
    }
}

/// One line of checker output as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Issue {
    /// A line that matched the diagnostic grammar.
    Located(Diagnostic),
    /// Any other output; passed along as informational text.
    Raw(String),
}

fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"^(.+?):(\d+):(\d+): (.*)$").expect("issue line pattern is valid")
    })
}

impl Issue {
    /// Parses one output line of a checker process.
    ///
    /// Relative paths are resolved against `wd`, the directory the child ran
    /// in, so the result can be re-rendered relative to any other directory.
    /// Lines that do not match `<path>:<line>:<column>: <message>` become
    /// [`Issue::Raw`].
    #[must_use]
    pub fn parse_line(line: &str, wd: &Path) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(caps) = line_pattern().captures(line) else {
            return Self::Raw(line.to_owned());
        };

        let (Ok(line_no), Ok(column)) = (caps[2].parse::<usize>(), caps[3].parse::<usize>())
        else {
            return Self::Raw(line.to_owned());
        };

        let path = Path::new(&caps[1]);
        let file = if path.is_absolute() {
            normalize(path)
        } else {
            normalize(&wd.join(path))
        };

        Self::Located(Diagnostic::new(
            Location::new(file, line_no, column),
            &caps[4],
        ))
    }

    /// Returns the diagnostic, if this issue has a location.
    #[must_use]
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Located(d) => Some(d),
            Self::Raw(_) => None,
        }
    }

    /// Renders the issue for display in `base`.
    #[must_use]
    pub fn render(&self, base: &Path) -> String {
        match self {
            Self::Located(d) => d.relative_to(base).to_string(),
            Self::Raw(text) => text.clone(),
        }
    }
}

impl From<Diagnostic> for Issue {
    fn from(d: Diagnostic) -> Self {
        Self::Located(d)
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Located(d) => d.fmt(f),
            Self::Raw(text) => f.write_str(text),
        }
    }
}
