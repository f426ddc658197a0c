//! Keeps exactly one PHP variant active per binding.

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use super::variant::{ModuleVariant, VariantBackend};
use crate::error::{StackError, StackResult};
use crate::executor::{ensure_success, CommandRunner, SubprocessBuilder};
use crate::platform::{ensure_package_manager_unlocked, Binding, PlatformProfile};
use crate::services::ServiceManager;
use crate::validation::{validate_php_version, validate_php_version_shape};

/// Non-fatal conditions reported next to a successful result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwitchWarning {
    /// The binding is left with no enabled variant.
    NoActiveVariant,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwitchOutcome {
    pub binding: Binding,
    pub version: String,
    /// Variants that were enabled before and are now disabled.
    pub disabled: Vec<String>,
    pub changed: bool,
    pub restarted_unit: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageOutcome {
    pub binding: Binding,
    pub version: String,
    pub packages: Vec<String>,
    pub warnings: Vec<SwitchWarning>,
}

pub struct SwitchEngine<'a> {
    pub(super) profile: &'a PlatformProfile,
    pub(super) backend: &'a dyn VariantBackend,
    pub(super) runner: &'a dyn CommandRunner,
    pub(super) service_timeout: Duration,
    package_timeout: Duration,
}

fn enabled_versions(variants: &[ModuleVariant]) -> Vec<String> {
    variants
        .iter()
        .filter(|v| v.enabled)
        .map(|v| v.version.clone())
        .collect()
}

impl<'a> SwitchEngine<'a> {
    pub fn new(
        profile: &'a PlatformProfile,
        backend: &'a dyn VariantBackend,
        runner: &'a dyn CommandRunner,
        service_timeout: Duration,
        package_timeout: Duration,
    ) -> Self {
        Self {
            profile,
            backend,
            runner,
            service_timeout,
            package_timeout,
        }
    }

    pub fn list(&self) -> StackResult<Vec<ModuleVariant>> {
        self.backend.variants()
    }

    /// The enabled variant, if any.
    pub fn active(&self) -> StackResult<Option<ModuleVariant>> {
        let mut enabled: Vec<ModuleVariant> = self
            .backend
            .variants()?
            .into_iter()
            .filter(|v| v.enabled)
            .collect();
        if enabled.len() > 1 {
            warn!(
                binding = %self.backend.binding(),
                versions = ?enabled.iter().map(|v| &v.version).collect::<Vec<_>>(),
                "More than one PHP variant is enabled"
            );
        }
        Ok(if enabled.is_empty() {
            None
        } else {
            Some(enabled.remove(enabled.len() - 1))
        })
    }

    /// Make `target` the only enabled variant.
    ///
    /// The target is enabled and confirmed before anything is disabled, so a
    /// failure never leaves the binding with fewer active variants than
    /// before.
    pub fn switch(&self, target: &str) -> StackResult<SwitchOutcome> {
        let target = validate_php_version_shape(target)?.to_string();
        let binding = self.backend.binding();

        let before = self.backend.variants()?;
        if !before.iter().any(|v| v.version == target) {
            return Err(StackError::NotInstalled { version: target });
        }

        let others: Vec<String> = enabled_versions(&before)
            .into_iter()
            .filter(|v| *v != target)
            .collect();
        let target_enabled = before.iter().any(|v| v.version == target && v.enabled);
        if target_enabled && others.is_empty() {
            info!(binding = %binding, version = %target, "Already the active PHP variant");
            return Ok(SwitchOutcome {
                binding,
                version: target,
                disabled: Vec::new(),
                changed: false,
                restarted_unit: None,
            });
        }

        if !target_enabled {
            self.backend.enable(&target)?;
            let now = enabled_versions(&self.backend.variants()?);
            if !now.contains(&target) {
                return Err(StackError::execution(format!(
                    "PHP {} ({}) did not become enabled; nothing was disabled",
                    target, binding
                )));
            }
        }

        for version in &others {
            self.backend.disable(version)?;
        }

        let after = enabled_versions(&self.backend.variants()?);
        if after != [target.clone()] {
            return Err(StackError::execution(format!(
                "expected only PHP {} enabled for {}, found [{}]",
                target,
                binding,
                after.join(", ")
            )));
        }

        let unit = self.backend.bound_unit(&target);
        ServiceManager::new(self.runner, self.service_timeout).restart(&unit)?;
        info!(binding = %binding, version = %target, disabled = ?others, "PHP variant switched");

        Ok(SwitchOutcome {
            binding,
            version: target,
            disabled: others,
            changed: true,
            restarted_unit: Some(unit),
        })
    }

    pub(super) fn package_manager(&self, remove: bool, packages: &[String]) -> StackResult<()> {
        ensure_package_manager_unlocked(self.profile)?;
        let manager = self.profile.package_manager;
        let args = if remove {
            manager.remove_args(packages)
        } else {
            manager.install_args(packages)
        };
        let cmd = SubprocessBuilder::new(manager.program())
            .args(args)
            .timeout(self.package_timeout);
        let what = format!("{} {}", manager.program(), packages.join(" "));
        ensure_success(self.runner.run(&cmd)?, &what)?;
        Ok(())
    }

    pub fn install(&self, version: &str) -> StackResult<PackageOutcome> {
        let version = validate_php_version(version)?.to_string();
        let binding = self.backend.binding();
        let packages = self.profile.php_packages(&version, binding);
        self.package_manager(false, &packages)?;
        info!(binding = %binding, version = %version, "PHP variant installed");
        Ok(PackageOutcome {
            binding,
            version,
            packages,
            warnings: Vec::new(),
        })
    }

    /// Remove a variant. Removing the active one is allowed and reported.
    pub fn uninstall(&self, version: &str) -> StackResult<PackageOutcome> {
        let version = validate_php_version_shape(version)?.to_string();
        let binding = self.backend.binding();
        let before = self.backend.variants()?;
        let Some(variant) = before.iter().find(|v| v.version == version) else {
            return Err(StackError::NotInstalled { version });
        };
        let was_active = variant.enabled;

        let packages = self.profile.php_packages(&version, binding);
        self.package_manager(true, &packages)?;
        info!(binding = %binding, version = %version, "PHP variant removed");

        let mut warnings = Vec::new();
        let remaining_active = before.iter().any(|v| v.enabled && v.version != version);
        if was_active && !remaining_active {
            warn!(binding = %binding, "No PHP variant is active anymore");
            warnings.push(SwitchWarning::NoActiveVariant);
        }

        Ok(PackageOutcome {
            binding,
            version,
            packages,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::DryRunRunner;
    use crate::platform::OsFamily;
    use std::cell::RefCell;

    /// Variants held in memory; `stuck` versions refuse to enable.
    struct MemoryBackend {
        variants: RefCell<Vec<ModuleVariant>>,
        stuck: Vec<&'static str>,
    }

    impl MemoryBackend {
        fn new(spec: &[(&str, bool)]) -> Self {
            Self {
                variants: RefCell::new(
                    spec.iter().map(|(v, e)| ModuleVariant::new(*v, *e)).collect(),
                ),
                stuck: Vec::new(),
            }
        }

        fn set(&self, version: &str, enabled: bool) {
            for v in self.variants.borrow_mut().iter_mut() {
                if v.version == version {
                    v.enabled = enabled;
                }
            }
        }
    }

    impl VariantBackend for MemoryBackend {
        fn binding(&self) -> Binding {
            Binding::Fpm
        }

        fn variants(&self) -> StackResult<Vec<ModuleVariant>> {
            Ok(self.variants.borrow().clone())
        }

        fn enable(&self, version: &str) -> StackResult<()> {
            if !self.stuck.contains(&version) {
                self.set(version, true);
            }
            Ok(())
        }

        fn disable(&self, version: &str) -> StackResult<()> {
            self.set(version, false);
            Ok(())
        }

        fn bound_unit(&self, version: &str) -> String {
            format!("php{}-fpm", version)
        }
    }

    fn engine<'a>(
        profile: &'a PlatformProfile,
        backend: &'a MemoryBackend,
        runner: &'a DryRunRunner,
    ) -> SwitchEngine<'a> {
        SwitchEngine::new(
            profile,
            backend,
            runner,
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_switch_leaves_exactly_target_enabled() {
        let profile = PlatformProfile::for_family(OsFamily::Debian);
        let backend = MemoryBackend::new(&[("7.4", true), ("8.1", true), ("8.2", false)]);
        let runner = DryRunRunner::new();

        let outcome = engine(&profile, &backend, &runner).switch("8.2").unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.disabled, vec!["7.4", "8.1"]);
        assert_eq!(enabled_versions(&backend.variants().unwrap()), vec!["8.2"]);
        assert_eq!(runner.recorded(), vec!["systemctl restart php8.2-fpm"]);
    }

    #[test]
    fn test_switch_to_missing_variant_changes_nothing() {
        let profile = PlatformProfile::for_family(OsFamily::Debian);
        let backend = MemoryBackend::new(&[("8.1", true)]);
        let runner = DryRunRunner::new();

        let err = engine(&profile, &backend, &runner).switch("8.3").unwrap_err();
        assert!(matches!(err, StackError::NotInstalled { .. }));
        let err = engine(&profile, &backend, &runner).switch("9.9").unwrap_err();
        assert!(matches!(err, StackError::NotInstalled { .. }));
        assert_eq!(enabled_versions(&backend.variants().unwrap()), vec!["8.1"]);
        assert!(runner.recorded().is_empty());
    }

    #[test]
    fn test_failed_enable_keeps_previous_variant() {
        let profile = PlatformProfile::for_family(OsFamily::Debian);
        let mut backend = MemoryBackend::new(&[("8.1", true), ("8.2", false)]);
        backend.stuck.push("8.2");
        let runner = DryRunRunner::new();

        assert!(engine(&profile, &backend, &runner).switch("8.2").is_err());
        assert_eq!(enabled_versions(&backend.variants().unwrap()), vec!["8.1"]);
    }

    #[test]
    fn test_switch_is_idempotent() {
        let profile = PlatformProfile::for_family(OsFamily::Debian);
        let backend = MemoryBackend::new(&[("8.2", true)]);
        let runner = DryRunRunner::new();
        assert!(!engine(&profile, &backend, &runner).switch("8.2").unwrap().changed);
        assert!(runner.recorded().is_empty());
    }

    #[test]
    fn test_uninstalling_active_variant_warns() {
        let tmp = tempfile::tempdir().unwrap();
        let profile = PlatformProfile::for_family(OsFamily::Debian).rebased(tmp.path());
        let backend = MemoryBackend::new(&[("8.2", true), ("8.3", false)]);
        let runner = DryRunRunner::new();

        let outcome = engine(&profile, &backend, &runner).uninstall("8.2").unwrap();
        assert_eq!(outcome.warnings, vec![SwitchWarning::NoActiveVariant]);
        assert_eq!(
            runner.recorded(),
            vec!["apt-get remove -y php8.2-cli php8.2-fpm"]
        );

        let outcome = engine(&profile, &backend, &runner).uninstall("8.3").unwrap();
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_install_respects_package_lock() {
        let tmp = tempfile::tempdir().unwrap();
        let profile = PlatformProfile::for_family(OsFamily::Arch).rebased(tmp.path());
        let lock = profile.host_path("/var/lib/pacman/db.lck");
        std::fs::create_dir_all(lock.parent().unwrap()).unwrap();
        std::fs::write(&lock, "").unwrap();

        let backend = MemoryBackend::new(&[]);
        let runner = DryRunRunner::new();
        assert!(matches!(
            engine(&profile, &backend, &runner).install("8.3").unwrap_err(),
            StackError::PackageManagerLocked { .. }
        ));
        assert!(runner.recorded().is_empty());
    }
}
