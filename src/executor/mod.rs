//! Command executor module.
//!
//! Safe subprocess spawning, the [`CommandRunner`] seam, and the shared
//! bounded backoff used by every wait loop.

mod backoff;
mod output;
mod runner;
mod subprocess;

pub use backoff::Backoff;
pub use output::{ensure_success, sanitize_output};
pub use runner::{CommandRunner, DryRunRunner, SystemRunner};
pub use subprocess::{SubprocessBuilder, SubprocessResult};
