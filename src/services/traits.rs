//! Service definition traits.

use std::path::PathBuf;

use crate::error::StackResult;
use crate::platform::PlatformProfile;

/// Describes one managed service.
///
/// Unit names and configuration paths differ per distribution family, so
/// every lookup takes the resolved profile.
pub trait ServiceDefinition: Send + Sync {
    /// Service identifier used on the command line (e.g. "apache").
    fn name(&self) -> &'static str;

    /// Human-readable display name.
    fn display_name(&self) -> &'static str;

    /// systemd unit for this platform. `version` selects a PHP-FPM runtime
    /// and is ignored by single-instance services.
    fn systemd_unit(&self, profile: &PlatformProfile, version: Option<&str>) -> StackResult<String>;

    /// Main configuration files on this platform.
    fn config_paths(&self, profile: &PlatformProfile) -> Vec<PathBuf>;

    /// Port the service listens on by default, if any.
    fn default_port(&self) -> Option<u16> {
        None
    }
}
