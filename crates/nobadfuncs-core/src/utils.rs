//! Utility functions shared by checker implementations.

pub mod paths;

#[doc(inline)]
pub use paths::{normalize, relative_to};
