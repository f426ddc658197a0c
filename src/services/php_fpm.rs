//! PHP-FPM service definition.

use std::path::PathBuf;

use super::traits::ServiceDefinition;
use crate::error::{StackError, StackResult, ValidationErrorKind};
use crate::platform::{OsFamily, PlatformProfile};
use crate::validation::validate_php_version;

/// PHP FastCGI Process Manager; one unit per installed version.
pub struct PhpFpmService;

impl ServiceDefinition for PhpFpmService {
    fn name(&self) -> &'static str {
        "php-fpm"
    }

    fn display_name(&self) -> &'static str {
        "PHP-FPM"
    }

    fn systemd_unit(&self, profile: &PlatformProfile, version: Option<&str>) -> StackResult<String> {
        let version = version.ok_or_else(|| StackError::InvalidParameters {
            kind: ValidationErrorKind::MissingParameter {
                param: "php_version".to_string(),
            },
        })?;
        validate_php_version(version)?;
        Ok(profile.fpm_unit(version))
    }

    fn config_paths(&self, profile: &PlatformProfile) -> Vec<PathBuf> {
        // Pool directories for every known version would be noise; report the
        // version-independent roots.
        let roots: &[&str] = match profile.family {
            OsFamily::Debian => &["/etc/php"],
            OsFamily::Rpm => &["/etc/opt/remi"],
            OsFamily::Arch => &["/etc"],
        };
        roots.iter().map(|r| profile.host_path(r)).collect()
    }
}
