//! Path validation for document roots and other user-supplied paths.

use std::path::{Component, Path, PathBuf};

use crate::error::{StackError, ValidationErrorKind};

/// Characters that would break an unquoted Apache directive argument.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '"', '\'', '<', '>', '\\', '$', '`', '\n', '\r'];

/// Validates a document root.
///
/// # Rules
///
/// - Must be absolute
/// - No `..` components
/// - No whitespace, quotes, angle brackets, backslashes, or `$`
///
/// Returns the path with `.` components and trailing slashes removed.
pub fn validate_document_root(path: &str) -> Result<PathBuf, StackError> {
    if path.is_empty() {
        return Err(StackError::InvalidParameters {
            kind: ValidationErrorKind::MissingParameter {
                param: "document_root".to_string(),
            },
        });
    }

    let raw = Path::new(path);
    if !raw.is_absolute() {
        return Err(StackError::InvalidParameters {
            kind: ValidationErrorKind::RelativePath {
                path: raw.to_path_buf(),
            },
        });
    }

    if raw.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(StackError::InvalidParameters {
            kind: ValidationErrorKind::PathTraversal {
                path: raw.to_path_buf(),
            },
        });
    }

    if let Some(c) = path.chars().find(|c| FORBIDDEN_CHARS.contains(c) || c.is_control()) {
        return Err(StackError::invalid(
            "document_root",
            format!("contains forbidden character {:?}", c),
        ));
    }

    let normalized: PathBuf = raw
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    if normalized == Path::new("/") {
        return Err(StackError::invalid(
            "document_root",
            "the filesystem root cannot be a document root",
        ));
    }

    Ok(normalized)
}
