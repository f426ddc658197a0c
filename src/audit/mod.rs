//! Audit trail.
//!
//! Every mutating operation appends one JSON line (timestamp, request id,
//! operation, redacted parameters, uid, outcome, duration) when auditing is
//! enabled in the settings.

mod entry;
mod logger;
mod sanitize;

pub use entry::{AuditEntry, AuditResult};
pub use logger::AuditLogger;
pub use sanitize::sanitize_params;
