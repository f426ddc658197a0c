//! Error types for stackctl.
//!
//! One thiserror enum with structured kinds, mapped onto process exit codes.

mod types;

pub use types::*;
