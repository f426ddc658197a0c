//! Configuration module.
//!
//! Loads and validates settings from an optional TOML file.

mod settings;

pub use settings::*;
