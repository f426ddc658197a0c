//! Server name and vhost filename validation.

use crate::error::{StackError, ValidationErrorKind};

/// Maximum length for a server name.
const MAX_NAME_LENGTH: usize = 253;

/// Maximum length for a label (part between dots).
const MAX_LABEL_LENGTH: usize = 63;

/// Suffix every vhost config file carries.
pub const VHOST_SUFFIX: &str = ".conf";

fn invalid_name(name: &str, message: impl Into<String>) -> StackError {
    StackError::invalid("server_name", format!("{} ({})", message.into(), name))
}

/// Validates a virtual-host server name.
///
/// # Rules
///
/// - 1-253 characters, labels of 1-63 characters
/// - Labels start and end with an alphanumeric character
/// - Labels may contain hyphens
/// - No wildcards
/// - Single-label names such as `localhost` are accepted; local development
///   hosts like `myapp` are common
///
/// Returns the name lowercased and without a trailing dot.
pub fn validate_server_name(name: &str) -> Result<String, StackError> {
    if name.is_empty() {
        return Err(StackError::InvalidParameters {
            kind: ValidationErrorKind::InvalidServerName {
                name: name.to_string(),
            },
        });
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(invalid_name(
            name,
            format!("exceeds maximum length of {} characters", MAX_NAME_LENGTH),
        ));
    }

    if name.contains('*') {
        return Err(invalid_name(name, "wildcard names are not allowed"));
    }

    let normalized = name.trim_end_matches('.').to_ascii_lowercase();

    for label in normalized.split('.') {
        validate_label(name, label)?;
    }

    Ok(normalized)
}

fn validate_label(name: &str, label: &str) -> Result<(), StackError> {
    if label.is_empty() {
        return Err(invalid_name(name, "empty label (consecutive dots)"));
    }

    if label.len() > MAX_LABEL_LENGTH {
        return Err(invalid_name(
            name,
            format!(
                "label '{}' exceeds maximum length of {} characters",
                label, MAX_LABEL_LENGTH
            ),
        ));
    }

    let starts_ok = label.starts_with(|c: char| c.is_ascii_alphanumeric());
    let ends_ok = label.ends_with(|c: char| c.is_ascii_alphanumeric());
    if !starts_ok || !ends_ok {
        return Err(invalid_name(
            name,
            format!("label '{}' must start and end with a letter or number", label),
        ));
    }

    if let Some(c) = label.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '-') {
        return Err(invalid_name(
            name,
            format!("label '{}' contains invalid character '{}'", label, c),
        ));
    }

    Ok(())
}

/// Validates a vhost config filename and appends `.conf` when missing.
///
/// # Rules
///
/// - 1-128 characters
/// - Alphanumeric, dots, dashes, and underscores only
/// - Must start with an alphanumeric character
pub fn validate_vhost_filename(filename: &str) -> Result<String, StackError> {
    let invalid = || StackError::InvalidParameters {
        kind: ValidationErrorKind::InvalidFilename {
            filename: filename.to_string(),
        },
    };

    if filename.is_empty() || filename.len() > 128 {
        return Err(invalid());
    }

    if !filename.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(invalid());
    }

    if filename
        .chars()
        .any(|c| !c.is_ascii_alphanumeric() && c != '.' && c != '-' && c != '_')
    {
        return Err(invalid());
    }

    if filename.contains("..") {
        return Err(invalid());
    }

    if filename.ends_with(VHOST_SUFFIX) {
        Ok(filename.to_string())
    } else {
        Ok(format!("{}{}", filename, VHOST_SUFFIX))
    }
}

/// Filename of the vhost for a server name.
pub fn vhost_filename(server_name: &str) -> String {
    format!("{}{}", server_name, VHOST_SUFFIX)
}
