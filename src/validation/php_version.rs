//! PHP version validation.

use crate::error::{StackError, ValidationErrorKind};

use super::whitelist::is_additional_php_version;

/// PHP versions the engine knows the package and socket naming for.
pub const KNOWN_PHP_VERSIONS: &[&str] = &[
    "5.6", "7.0", "7.1", "7.2", "7.3", "7.4", "8.0", "8.1", "8.2", "8.3", "8.4",
];

fn unsupported(version: &str) -> StackError {
    StackError::InvalidParameters {
        kind: ValidationErrorKind::UnsupportedPhpVersion {
            version: version.to_string(),
        },
    }
}

/// Checks `major.minor` form only.
///
/// Enough for operations on versions that must already be installed; the
/// installed set is the authority there, not the known list.
pub fn validate_php_version_shape(version: &str) -> Result<&str, StackError> {
    let well_formed = match version.split_once('.') {
        Some((major, minor)) => {
            major.len() == 1
                && !minor.is_empty()
                && minor.len() <= 2
                && major.chars().all(|c| c.is_ascii_digit())
                && minor.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    };
    if well_formed {
        Ok(version)
    } else {
        Err(unsupported(version))
    }
}

/// Validates a PHP version in `major.minor` form.
///
/// Accepts the built-in versions plus any configured additional versions.
pub fn validate_php_version(version: &str) -> Result<&str, StackError> {
    validate_php_version_shape(version)?;
    if KNOWN_PHP_VERSIONS.contains(&version) || is_additional_php_version(version) {
        Ok(version)
    } else {
        Err(unsupported(version))
    }
}

/// Parse an optional version argument where `none` (or empty) means "no PHP".
pub fn parse_optional_php_version(value: &str) -> Result<Option<String>, StackError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    validate_php_version(trimmed).map(|v| Some(v.to_string()))
}

/// Every version the engine will consider: built-ins plus configured extras.
pub fn candidate_php_versions() -> Vec<String> {
    let mut versions: Vec<String> = KNOWN_PHP_VERSIONS.iter().map(|v| v.to_string()).collect();
    let mut extra: Vec<String> = super::whitelist::get_whitelists()
        .additional_php_versions
        .iter()
        .filter(|v| !versions.contains(v))
        .cloned()
        .collect();
    extra.sort();
    versions.extend(extra);
    versions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_versions() {
        assert_eq!(validate_php_version("8.2").unwrap(), "8.2");
        assert_eq!(validate_php_version("7.4").unwrap(), "7.4");
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["8", "8.", ".2", "82", "8.2.1", "php8.2", "8.x", "; rm"] {
            assert!(validate_php_version(bad).is_err(), "{} accepted", bad);
        }
    }

    #[test]
    fn test_rejects_unknown() {
        assert!(validate_php_version("9.9").is_err());
        assert_eq!(validate_php_version_shape("9.9").unwrap(), "9.9");
        assert!(validate_php_version_shape("99").is_err());
    }

    #[test]
    fn test_optional_version() {
        assert_eq!(parse_optional_php_version("none").unwrap(), None);
        assert_eq!(parse_optional_php_version("").unwrap(), None);
        assert_eq!(
            parse_optional_php_version("8.3").unwrap(),
            Some("8.3".to_string())
        );
        assert!(parse_optional_php_version("8").is_err());
    }
}
