//! Operations exposed on the command line.
//!
//! Contains the command registry and all command implementations.
//!
//! ## Adding a New Command
//!
//! 1. Create a new file in the appropriate subdirectory (e.g., `vhost/`, `php/`)
//! 2. Implement the `Command` trait
//! 3. Register the command in `CommandRegistry::new()`

mod args;
mod output;
mod registry;
mod traits;
mod types;

pub mod database;
pub mod php;
pub mod platform;
pub mod service;
pub mod ssl;
pub mod vhost;

#[cfg(test)]
pub(crate) mod test_support;

pub use args::{params_from_matches, subcommand};
pub use output::{render_error, render_success, render_value, OutputFormat};
pub use registry::CommandRegistry;
pub use traits::{Command, Flag};
pub use types::{CommandParams, CommandResult, ExecutionContext};
