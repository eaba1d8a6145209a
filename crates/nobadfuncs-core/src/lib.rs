//! # nobadfuncs-core
//!
//! Core framework for the `nobadfuncs` checker.
//!
//! This crate holds everything that does not depend on a particular source
//! language:
//!
//! - [`Diagnostic`] and [`Issue`] for findings and the line-oriented wire format
//! - [`SignatureTable`] and [`CheckConfig`] for the deny-list configuration
//! - [`upgrade`] for migrating legacy configuration documents
//! - [`Checker`] and [`CheckerRegistry`] for pluggable checker dispatch
//! - [`SubprocessChecker`] and [`run_raw`] for running a checker as a child process
//!
//! ## Example
//!
//! ```ignore
//! use nobadfuncs_core::{CheckRequest, CheckerRegistry};
//!
//! let mut registry = CheckerRegistry::new();
//! registry.register("nobadfuncs", 0, nobadfuncs_go::creator());
//!
//! let checker = registry.create("nobadfuncs", "bad-funcs: {}")?;
//! let mut issues = Vec::new();
//! checker.check(&CheckRequest::new(vec!["./...".into()], cwd), &mut issues)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod checker;
mod config;
mod process;
mod types;
pub mod upgrade;

/// Utility modules shared by checker implementations.
pub mod utils;

pub use checker::{
    CheckError, CheckRequest, Checker, CheckerCreator, CheckerRegistry, IssueSink, LineSink,
};
pub use config::{CheckConfig, CheckEntry, ChecksDocument, ConfigError, Exclude, SignatureTable};
pub use process::{run_raw, SubprocessChecker};
pub use types::{Diagnostic, Issue, Location};
