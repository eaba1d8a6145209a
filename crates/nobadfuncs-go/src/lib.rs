//! # nobadfuncs-go
//!
//! Tree-sitter based Go analysis for the `nobadfuncs` checker.
//!
//! Given a set of Go packages and a deny-list of canonical signatures, this
//! crate reports every direct call site that invokes a denied function or
//! method:
//!
//! - [`GoParser`] parses Go sources with `tree-sitter-go`
//! - [`PackageIndex`] records the declarations of one package
//! - [`SourceScanner`] resolves the canonical signature of every call
//! - [`Matcher`] looks signatures up in a [`SignatureTable`](nobadfuncs_core::SignatureTable)
//! - [`RunnerProtocol`] is the engine side of the line-oriented protocol
//! - [`NoBadFuncs`] implements [`Checker`](nobadfuncs_core::Checker) in process
//!
//! ## Signatures
//!
//! ```text
//! func os.Exit(int)
//! func (*net/http.Client).Do(*net/http.Request) (*net/http.Response, error)
//! func (example.com/pkg.Receiver).Name(string, ...int) error
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod checker;
pub mod index;
pub mod loader;
pub mod matcher;
pub mod protocol;
pub mod scanner;
pub mod syntax;
pub mod types;

pub use checker::{creator, subprocess_creator, NoBadFuncs, PRIORITY, TYPE_NAME};
pub use index::PackageIndex;
pub use loader::{Exclusions, FsPackageSource, PackageSource};
pub use matcher::Matcher;
pub use protocol::{Invocation, ProtocolOutcome, ProtocolState, RunnerProtocol};
pub use scanner::{CallSite, FileScan, ScanError, SourceScanner};
pub use syntax::{GoParser, ParsedFile, SyntaxError};
pub use types::{FuncSig, GoType};
