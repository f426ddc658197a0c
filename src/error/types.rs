//! Error types for stackctl.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for every engine operation.
#[derive(Error, Debug)]
pub enum StackError {
    /// Caller supplied a bad argument.
    #[error("Invalid parameters: {kind}")]
    InvalidParameters { kind: ValidationErrorKind },

    /// The caller lacks the privileges for a mutating operation.
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    /// Another process holds the package manager lock.
    #[error("Package manager is locked: {} is held by another process", lock.display())]
    PackageManagerLocked { lock: PathBuf },

    /// The host OS does not map onto a supported family.
    #[error("Unsupported platform: {message}")]
    UnsupportedPlatform { message: String },

    /// A named resource does not exist.
    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },

    /// A PHP version that is not installed was targeted.
    #[error("PHP {version} is not installed")]
    NotInstalled { version: String },

    /// Configuration text could not be parsed structurally.
    #[error("Malformed configuration: {message}")]
    MalformedConfig { message: String },

    /// Database credentials were rejected.
    #[error("Authentication failed: {message}")]
    AuthenticationFailure { message: String },

    /// Every credential recovery strategy was exhausted.
    #[error("Root credential recovery failed: {reason}")]
    TerminalRecoveryFailure {
        reason: String,
        manual_steps: Vec<String>,
    },

    /// A required service or its configuration tree is absent.
    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    /// External command errors.
    #[error("Command error: {kind}")]
    Command { kind: CommandErrorKind },

    /// Configuration file errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Template-related errors.
    #[error("Template error: {message}")]
    Template { message: String },

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Validation error kinds.
#[derive(Error, Debug)]
pub enum ValidationErrorKind {
    #[error("Path traversal detected in: {}", path.display())]
    PathTraversal { path: PathBuf },

    #[error("Path must be absolute: {}", path.display())]
    RelativePath { path: PathBuf },

    #[error("Invalid server name: {name}")]
    InvalidServerName { name: String },

    #[error("Invalid vhost filename: {filename}")]
    InvalidFilename { filename: String },

    #[error("Unsupported PHP version: {version}")]
    UnsupportedPhpVersion { version: String },

    #[error("Service not recognized: {service}")]
    UnknownService { service: String },

    #[error("Unknown operation: {name}")]
    UnknownOperation { name: String },

    #[error("Missing required parameter: {param}")]
    MissingParameter { param: String },

    #[error("Unexpected argument: {argument}")]
    UnexpectedArgument { argument: String },

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },
}

/// External command error kinds.
#[derive(Error, Debug)]
pub enum CommandErrorKind {
    #[error("Command execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("Command timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },
}

impl StackError {
    /// Shorthand for an `InvalidParameters` error on a named parameter.
    pub fn invalid(param: &str, message: impl Into<String>) -> Self {
        StackError::InvalidParameters {
            kind: ValidationErrorKind::InvalidParameter {
                param: param.to_string(),
                message: message.into(),
            },
        }
    }

    /// Shorthand for a failed external command.
    pub fn execution(message: impl Into<String>) -> Self {
        StackError::Command {
            kind: CommandErrorKind::ExecutionFailed {
                message: message.into(),
            },
        }
    }

    /// Process exit code for this error.
    ///
    /// 1 general error, 2 invalid parameters, 3 permission denied,
    /// 4 service or platform unavailable.
    pub fn exit_code(&self) -> u8 {
        match self {
            StackError::InvalidParameters { .. } => 2,
            StackError::PermissionDenied { .. } => 3,
            StackError::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => 3,
            StackError::UnsupportedPlatform { .. }
            | StackError::ServiceUnavailable { .. }
            | StackError::PackageManagerLocked { .. } => 4,
            _ => 1,
        }
    }

    /// Stable identifier used in JSON output and audit entries.
    pub fn code(&self) -> &'static str {
        match self {
            StackError::InvalidParameters { .. } => "INVALID_PARAMETERS",
            StackError::PermissionDenied { .. } => "PERMISSION_DENIED",
            StackError::PackageManagerLocked { .. } => "PACKAGE_MANAGER_LOCKED",
            StackError::UnsupportedPlatform { .. } => "UNSUPPORTED_PLATFORM",
            StackError::NotFound { .. } => "NOT_FOUND",
            StackError::NotInstalled { .. } => "NOT_INSTALLED",
            StackError::MalformedConfig { .. } => "MALFORMED_CONFIG",
            StackError::AuthenticationFailure { .. } => "AUTHENTICATION_FAILURE",
            StackError::TerminalRecoveryFailure { .. } => "TERMINAL_RECOVERY_FAILURE",
            StackError::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
            StackError::Command { kind } => match kind {
                CommandErrorKind::ExecutionFailed { .. } => "EXECUTION_FAILED",
                CommandErrorKind::Timeout { .. } => "TIMEOUT",
            },
            StackError::Config { .. } => "CONFIG_ERROR",
            StackError::Template { .. } => "TEMPLATE_ERROR",
            StackError::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                "PERMISSION_DENIED"
            }
            StackError::Io(_) => "IO_ERROR",
            StackError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

/// Result type alias for engine operations.
pub type StackResult<T> = Result<T, StackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(StackError::invalid("version", "bad").exit_code(), 2);
        assert_eq!(
            StackError::PermissionDenied {
                message: "root required".into()
            }
            .exit_code(),
            3
        );
        assert_eq!(
            StackError::UnsupportedPlatform {
                message: "gentoo".into()
            }
            .exit_code(),
            4
        );
        assert_eq!(
            StackError::NotFound {
                what: "Virtual host",
                name: "x.conf".into()
            }
            .exit_code(),
            1
        );
    }

    #[test]
    fn test_io_permission_denied_maps_to_3() {
        let err = StackError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "nope",
        ));
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.code(), "PERMISSION_DENIED");
    }

    #[test]
    fn test_display_messages() {
        let err = StackError::NotInstalled {
            version: "8.3".into(),
        };
        assert_eq!(err.to_string(), "PHP 8.3 is not installed");
        assert_eq!(err.code(), "NOT_INSTALLED");
    }
}
