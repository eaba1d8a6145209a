//! Matching resolved call sites against the signature table.

use nobadfuncs_core::{Diagnostic, Location, SignatureTable};

use crate::scanner::FileScan;

/// Looks scanned call sites up in a [`SignatureTable`].
pub struct Matcher<'t> {
    table: &'t SignatureTable,
}

impl<'t> Matcher<'t> {
    /// Creates a matcher over `table`.
    #[must_use]
    pub fn new(table: &'t SignatureTable) -> Self {
        Self { table }
    }

    /// Diagnostics for one scanned file, ordered by position.
    ///
    /// A file that could not be read or parsed yields a single diagnostic
    /// describing the failure.
    #[must_use]
    pub fn match_file(&self, scan: &FileScan) -> Vec<Diagnostic> {
        match &scan.outcome {
            Ok(calls) => calls
                .iter()
                .filter_map(|call| {
                    let message = self.table.lookup(&call.signature)?;
                    Some(Diagnostic::new(
                        Location::new(scan.path.clone(), call.line, call.column),
                        message,
                    ))
                })
                .collect(),
            Err(err) => {
                let (line, column) = err.position();
                vec![Diagnostic::new(
                    Location::new(scan.path.clone(), line, column),
                    err.to_string(),
                )]
            }
        }
    }
}
