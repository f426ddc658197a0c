//! Apache HTTP server service definition.

use std::path::PathBuf;

use super::traits::ServiceDefinition;
use crate::error::StackResult;
use crate::platform::PlatformProfile;

/// Apache httpd (`apache2` on Debian).
pub struct ApacheService;

impl ServiceDefinition for ApacheService {
    fn name(&self) -> &'static str {
        "apache"
    }

    fn display_name(&self) -> &'static str {
        "Apache HTTP Server"
    }

    fn systemd_unit(&self, profile: &PlatformProfile, _version: Option<&str>) -> StackResult<String> {
        Ok(profile.service_unit_name.clone())
    }

    fn config_paths(&self, profile: &PlatformProfile) -> Vec<PathBuf> {
        vec![profile.main_config.clone(), profile.vhost_dir.clone()]
    }

    fn default_port(&self) -> Option<u16> {
        Some(80)
    }
}
