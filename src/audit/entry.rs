//! One line of the audit trail.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::sanitize::sanitize_params;
use crate::error::StackError;

/// A mutating operation and how it ended.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// RFC 3339 timestamp in UTC.
    pub timestamp: String,
    pub request_id: Uuid,
    pub operation: String,
    /// Parameters with secrets redacted.
    pub params: serde_json::Value,
    /// Effective uid of the caller.
    pub uid: u32,
    pub dry_run: bool,
    pub result: AuditResult,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AuditResult {
    Success,
    Failure { error_code: String, message: String },
}

impl AuditResult {
    pub fn from_outcome<T>(outcome: &Result<T, StackError>) -> Self {
        match outcome {
            Ok(_) => AuditResult::Success,
            Err(e) => AuditResult::Failure {
                error_code: e.code().to_string(),
                message: e.to_string(),
            },
        }
    }
}

impl AuditEntry {
    pub fn new(
        request_id: Uuid,
        operation: &str,
        params: &serde_json::Value,
        uid: u32,
        dry_run: bool,
        result: AuditResult,
        duration_ms: u64,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            request_id,
            operation: operation.to_string(),
            params: sanitize_params(params),
            uid,
            dry_run,
            result,
            duration_ms,
        }
    }
}
