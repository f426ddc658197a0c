//! State of the web server's SSL module.

use std::fs;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::error::{StackError, StackResult};
use crate::executor::{ensure_success, CommandRunner, SubprocessBuilder};
use crate::files::write_atomic;
use crate::platform::{ensure_package_manager_unlocked, OsFamily, PlatformProfile};
use crate::services::ServiceManager;

/// Result of `ssl-is-enabled` / `ssl-enable`.
#[derive(Debug, Clone, Serialize)]
pub struct SslModuleState {
    pub enabled: bool,
    pub changed: bool,
}

/// Queries and enables the SSL module per family.
pub struct SslModule<'a> {
    profile: &'a PlatformProfile,
    runner: &'a dyn CommandRunner,
    timeout: Duration,
    package_timeout: Duration,
}

/// Modules Arch's stock httpd.conf ships commented out that SSL needs.
const ARCH_SSL_MODULES: &[&str] = &["ssl_module", "socache_shmcb_module"];

fn is_load_line(line: &str, module: &str) -> bool {
    let mut words = line.split_whitespace();
    words.next() == Some("LoadModule") && words.next() == Some(module)
}

/// Uncomment `LoadModule <module>` lines; returns `None` if nothing changed.
fn uncomment_modules(text: &str, modules: &[&str]) -> Option<String> {
    let mut changed = false;
    let lines: Vec<String> = text
        .split('\n')
        .map(|line| {
            let body = line.trim_start().trim_start_matches('#').trim_start();
            if line.trim_start().starts_with('#') && modules.iter().any(|m| is_load_line(body, m)) {
                changed = true;
                body.to_string()
            } else {
                line.to_string()
            }
        })
        .collect();
    changed.then(|| lines.join("\n"))
}

impl<'a> SslModule<'a> {
    pub fn new(
        profile: &'a PlatformProfile,
        runner: &'a dyn CommandRunner,
        timeout: Duration,
        package_timeout: Duration,
    ) -> Self {
        Self {
            profile,
            runner,
            timeout,
            package_timeout,
        }
    }

    pub fn is_enabled(&self) -> StackResult<bool> {
        match self.profile.family {
            OsFamily::Debian | OsFamily::Rpm => Ok(self.profile.ssl_module_marker.exists()),
            OsFamily::Arch => {
                let text = match fs::read_to_string(&self.profile.main_config) {
                    Ok(text) => text,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
                    Err(e) => return Err(e.into()),
                };
                Ok(text.lines().any(|l| is_load_line(l.trim(), "ssl_module")))
            }
        }
    }

    /// Enable the module and restart the web server. No-op when enabled.
    pub fn enable(&self) -> StackResult<SslModuleState> {
        if self.is_enabled()? {
            return Ok(SslModuleState {
                enabled: true,
                changed: false,
            });
        }

        if !self.profile.config_dir.exists() {
            return Err(StackError::ServiceUnavailable {
                message: format!(
                    "Apache configuration directory {} does not exist",
                    self.profile.config_dir.display()
                ),
            });
        }

        match self.profile.family {
            OsFamily::Debian => {
                let cmd = SubprocessBuilder::new("a2enmod")
                    .arg("ssl")
                    .timeout(self.timeout);
                ensure_success(self.runner.run(&cmd)?, "a2enmod ssl")?;
            }
            OsFamily::Rpm => {
                ensure_package_manager_unlocked(self.profile)?;
                let packages = vec!["mod_ssl".to_string()];
                let cmd = SubprocessBuilder::new(self.profile.package_manager.program())
                    .args(self.profile.package_manager.install_args(&packages))
                    .timeout(self.package_timeout);
                ensure_success(self.runner.run(&cmd)?, "install mod_ssl")?;
            }
            OsFamily::Arch => {
                let text = fs::read_to_string(&self.profile.main_config)?;
                if let Some(updated) = uncomment_modules(&text, ARCH_SSL_MODULES) {
                    write_atomic(&self.profile.main_config, &updated, 0o644)?;
                }
            }
        }

        ServiceManager::new(self.runner, self.timeout).restart(&self.profile.service_unit_name)?;
        info!(family = %self.profile.family, "SSL module enabled");

        Ok(SslModuleState {
            enabled: true,
            changed: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::DryRunRunner;

    #[test]
    fn test_uncomment_modules() {
        let conf = "#LoadModule ssl_module modules/mod_ssl.so\n# LoadModule socache_shmcb_module modules/mod_socache_shmcb.so\n#LoadModule foo_module x\n";
        let updated = uncomment_modules(conf, ARCH_SSL_MODULES).unwrap();
        assert!(updated.contains("\nLoadModule socache_shmcb_module"));
        assert!(updated.starts_with("LoadModule ssl_module"));
        assert!(updated.contains("#LoadModule foo_module"));
        assert!(uncomment_modules(&updated, ARCH_SSL_MODULES).is_none());
    }

    #[test]
    fn test_arch_enable_edits_main_config() {
        let dir = tempfile::tempdir().unwrap();
        let profile = PlatformProfile::for_family(OsFamily::Arch).rebased(dir.path());
        fs::create_dir_all(profile.main_config.parent().unwrap()).unwrap();
        fs::write(&profile.main_config, "#LoadModule ssl_module modules/mod_ssl.so\n").unwrap();

        let runner = DryRunRunner::new();
        let module = SslModule::new(&profile, &runner, Duration::from_secs(5), Duration::from_secs(5));
        assert!(!module.is_enabled().unwrap());
        assert!(module.enable().unwrap().changed);
        assert!(module.is_enabled().unwrap());
        assert_eq!(runner.recorded(), vec!["systemctl restart httpd"]);
        assert!(!module.enable().unwrap().changed);
    }

    #[test]
    fn test_debian_marker() {
        let dir = tempfile::tempdir().unwrap();
        let profile = PlatformProfile::for_family(OsFamily::Debian).rebased(dir.path());
        let runner = DryRunRunner::new();
        let module = SslModule::new(&profile, &runner, Duration::from_secs(5), Duration::from_secs(5));
        assert!(!module.is_enabled().unwrap());
        fs::create_dir_all(profile.ssl_module_marker.parent().unwrap()).unwrap();
        fs::write(&profile.ssl_module_marker, "").unwrap();
        assert!(module.is_enabled().unwrap());
    }
}
