//! Configuration types for nobadfuncs.
//!
//! Two documents are involved:
//!
//! - the per-check configuration, `{ bad-funcs: { <signature>: <message> } }`,
//!   decoded into a [`CheckConfig`];
//! - the orchestrator-level document, `checks: { <name>: { config: ... } }`,
//!   decoded into a [`ChecksDocument`].
//!
//! On the engine command line the deny-list travels as a flat JSON object,
//! see [`SignatureTable::from_json`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Immutable mapping from canonical signature to the message reported when
/// a call site resolves to that signature.
///
/// Signatures are opaque keys: they are compared byte for byte with the
/// strings the scanner produces and never parsed. A key that can never match
/// is accepted silently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureTable(BTreeMap<String, String>);

impl SignatureTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes the flat JSON object passed via `--config-json`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] carrying the offending document when it
    /// is not a JSON object of strings to strings.
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(document).map_err(|source| ConfigError::Json {
            document: document.to_owned(),
            source,
        })
    }

    /// Encodes the table as the flat JSON object the engine expects.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string(&self.0).map_err(ConfigError::Encode)
    }

    /// Looks up the message configured for `signature`.
    #[must_use]
    pub fn lookup(&self, signature: &str) -> Option<&str> {
        self.0.get(signature).map(String::as_str)
    }

    /// Number of configured signatures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no signature is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(signature, message)` pairs in signature order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SignatureTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Checker-specific configuration: the `config` block of the `nobadfuncs`
/// check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Denied signatures and their messages.
    #[serde(rename = "bad-funcs", default)]
    pub bad_funcs: SignatureTable,
}

impl CheckConfig {
    /// Decodes the checker configuration YAML.
    ///
    /// An empty document yields an empty deny-list.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] carrying the document text when it is
    /// not valid YAML or has non-string keys/values under `bad-funcs`.
    pub fn from_yaml(document: &str) -> Result<Self, ConfigError> {
        if document.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(document).map_err(|source| ConfigError::Yaml {
            document: document.to_owned(),
            source,
        })
    }
}

/// Exclusion rules attached to a check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclude {
    /// Regular expressions matched against file and directory names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    /// Regular expressions matched against paths relative to the project.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
}

impl Exclude {
    /// Returns true if no rule is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.paths.is_empty()
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !*b
}

/// Current-schema configuration of a single check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckEntry {
    /// Skip this check entirely.
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip: bool,

    /// Priority override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,

    /// Checker-specific configuration, handed to the checker's creator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_yaml::Value>,

    /// Output filters the orchestrator applies to reported lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<serde_yaml::Value>,

    /// Files and directories the check ignores.
    #[serde(default, skip_serializing_if = "Exclude::is_empty")]
    pub exclude: Exclude,
}

impl CheckEntry {
    /// Serializes the `config` block back to YAML for a checker creator.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn config_yaml(&self) -> Result<String, ConfigError> {
        match &self.config {
            Some(value) => serde_yaml::to_string(value).map_err(ConfigError::EncodeYaml),
            None => Ok(String::new()),
        }
    }
}

/// Orchestrator-level check configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChecksDocument {
    /// Per-check configuration keyed by checker type name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub checks: BTreeMap<String, CheckEntry>,

    /// Top-level keys this crate does not interpret.
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_yaml::Value>,
}

impl ChecksDocument {
    /// Loads a document from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Parses a document from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn from_yaml(document: &str) -> Result<Self, ConfigError> {
        if document.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(document).map_err(|source| ConfigError::Yaml {
            document: document.to_owned(),
            source,
        })
    }

    /// Serializes the document to YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(ConfigError::EncodeYaml)
    }

    /// Returns the entry for a check, if configured.
    #[must_use]
    pub fn check(&self, name: &str) -> Option<&CheckEntry> {
        self.checks.get(name)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ConfigError {
    /// IO error reading a config file.
    #[error("failed to read config file {path}: {source}")]
    #[diagnostic(code(nobadfuncs::config::io))]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The `--config-json` payload is not a flat JSON map of strings.
    #[error("failed to decode configuration JSON {document:?}: {source}")]
    #[diagnostic(
        code(nobadfuncs::config::json),
        help("expected a JSON object mapping signatures to messages, e.g. {{\"func os.Exit(int)\": \"do not call os.Exit directly\"}}")
    )]
    Json {
        /// The offending document.
        document: String,
        /// Decoder error.
        source: serde_json::Error,
    },

    /// A YAML configuration document could not be decoded.
    #[error("failed to unmarshal configuration YAML {document:?}: {source}")]
    #[diagnostic(code(nobadfuncs::config::yaml))]
    Yaml {
        /// The offending document.
        document: String,
        /// Decoder error.
        source: serde_yaml::Error,
    },

    /// The signature table could not be encoded as JSON.
    #[error("failed to encode signature table: {0}")]
    Encode(#[source] serde_json::Error),

    /// A document could not be encoded as YAML.
    #[error("failed to encode configuration YAML: {0}")]
    EncodeYaml(#[source] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_flat_json_map() {
        let table = SignatureTable::from_json(r#"{"func os.Exit(int)": "do not call os.Exit directly"}"#)
            .expect("valid table");
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.lookup("func os.Exit(int)"),
            Some("do not call os.Exit directly")
        );
        assert_eq!(table.lookup("func os.Exit"), None);
    }

    #[test]
    fn rejects_non_string_values_and_keeps_document() {
        let err = SignatureTable::from_json(r#"{"func os.Exit(int)": 1}"#).unwrap_err();
        match &err {
            ConfigError::Json { document, .. } => assert!(document.contains("os.Exit")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().starts_with("failed to decode configuration JSON"));
    }

    #[test]
    fn rejects_non_object_json() {
        assert!(SignatureTable::from_json("[]").is_err());
        assert!(SignatureTable::from_json("not json").is_err());
    }

    #[test]
    fn unmatchable_signatures_are_accepted() {
        let table = SignatureTable::from_json(r#"{"???": "never matches"}"#).expect("accepted");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn json_encoding_is_sorted() {
        let table: SignatureTable = [("func b.B()", "b"), ("func a.A()", "a")].into_iter().collect();
        assert_eq!(
            table.to_json().expect("encodes"),
            r#"{"func a.A()":"a","func b.B()":"b"}"#
        );
    }

    #[test]
    fn decodes_check_config_yaml() {
        let yaml = r#"
bad-funcs:
  "func os.Exit(int)": "do not call os.Exit directly"
  "func (*net/http.Client).Do(*net/http.Request) (*net/http.Response, error)": "use safehttp.Do"
"#;
        let cfg = CheckConfig::from_yaml(yaml).expect("parse failed");
        assert_eq!(cfg.bad_funcs.len(), 2);
    }

    #[test]
    fn empty_check_config_is_empty_table() {
        assert!(CheckConfig::from_yaml("").expect("empty ok").bad_funcs.is_empty());
    }

    #[test]
    fn check_config_rejects_structured_values() {
        let err = CheckConfig::from_yaml("bad-funcs:\n  sig:\n    - a\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn checks_document_exposes_check_config() {
        let yaml = r#"
checks:
  nobadfuncs:
    config:
      bad-funcs:
        "func os.Exit(int)": "do not call os.Exit directly"
"#;
        let doc = ChecksDocument::from_yaml(yaml).expect("parse failed");
        let entry = doc.check("nobadfuncs").expect("entry");
        let cfg = CheckConfig::from_yaml(&entry.config_yaml().expect("encode")).expect("decode");
        assert_eq!(cfg.bad_funcs.lookup("func os.Exit(int)"), Some("do not call os.Exit directly"));
    }
}
