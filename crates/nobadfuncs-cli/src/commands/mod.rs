//! CLI command implementations.

pub mod check;
pub mod engine;
pub mod info;
pub mod raw;
pub mod upgrade;
