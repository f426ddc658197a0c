//! PHP extension names, as they appear in package names (`php8.2-<ext>`).

use crate::error::StackError;

const MAX_EXTENSION_LENGTH: usize = 32;

/// Lower-case letters, digits, `_` and `-`, starting with a letter.
pub fn validate_php_extension(name: &str) -> Result<&str, StackError> {
    let starts_with_letter = name
        .chars()
        .next()
        .map(|c| c.is_ascii_lowercase())
        .unwrap_or(false);
    let ok = starts_with_letter
        && name.len() <= MAX_EXTENSION_LENGTH
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if ok {
        Ok(name)
    } else {
        Err(StackError::invalid(
            "extension",
            format!("invalid PHP extension name '{}'", name),
        ))
    }
}
