//! Versions the platform can offer, and the extensions of an installed one.

use serde::Serialize;
use tracing::{debug, info};

use super::switch::SwitchEngine;
use super::variant::{sort_versions, ModuleVariant};
use crate::error::{StackError, StackResult};
use crate::executor::{ensure_success, SubprocessBuilder};
use crate::platform::Binding;
use crate::services::ServiceManager;
use crate::validation::{candidate_php_versions, validate_php_extension, validate_php_version_shape};

#[derive(Debug, Clone, Serialize)]
pub struct ExtensionList {
    pub binding: Binding,
    pub version: String,
    /// Lower-cased names from the `[PHP Modules]` section.
    pub extensions: Vec<String>,
    /// Names from the `[Zend Modules]` section, as printed.
    pub zend_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtensionOutcome {
    pub binding: Binding,
    pub version: String,
    pub extension: String,
    pub package: String,
    pub restarted_unit: Option<String>,
}

/// Split `php -m` output into its PHP and Zend module sections.
pub fn parse_modules(output: &str) -> (Vec<String>, Vec<String>) {
    let mut php = Vec::new();
    let mut zend = Vec::new();
    let mut section = None;
    for line in output.lines().map(str::trim) {
        match line {
            "" => {}
            "[PHP Modules]" => section = Some(false),
            "[Zend Modules]" => section = Some(true),
            name => match section {
                Some(false) => php.push(name.to_ascii_lowercase()),
                Some(true) => zend.push(name.to_string()),
                None => {}
            },
        }
    }
    php.sort();
    php.dedup();
    (php, zend)
}

impl SwitchEngine<'_> {
    /// Every version this host knows how to install, flagged with whether
    /// the binding has it installed and enabled.
    pub fn available(&self) -> StackResult<Vec<ModuleVariant>> {
        let installed = self.backend.variants()?;
        let mut versions: Vec<ModuleVariant> = candidate_php_versions()
            .into_iter()
            .map(|version| {
                installed
                    .iter()
                    .find(|v| v.version == version)
                    .cloned()
                    .unwrap_or(ModuleVariant {
                        version,
                        installed: false,
                        enabled: false,
                    })
            })
            .collect();
        sort_versions(&mut versions);
        Ok(versions)
    }

    /// `version`, or the enabled variant when none is given.
    fn target_variant(&self, version: Option<&str>) -> StackResult<ModuleVariant> {
        let binding = self.backend.binding();
        let Some(version) = version else {
            return self.active()?.ok_or_else(|| {
                StackError::invalid(
                    "version",
                    format!("no PHP version is enabled for {}; pass --version", binding),
                )
            });
        };
        let version = validate_php_version_shape(version)?;
        self.backend
            .variants()?
            .into_iter()
            .find(|v| v.version == version)
            .ok_or_else(|| StackError::NotInstalled {
                version: version.to_string(),
            })
    }

    /// Modules loaded by the CLI interpreter of `version`.
    pub fn extensions(&self, version: Option<&str>) -> StackResult<ExtensionList> {
        let variant = self.target_variant(version)?;
        let binary = self.profile.php_cli_binary(&variant.version);
        if !binary.exists() {
            return Err(StackError::NotInstalled {
                version: variant.version,
            });
        }
        let cmd = SubprocessBuilder::new(&binary.to_string_lossy())
            .arg("-m")
            .timeout(self.service_timeout);
        let result = ensure_success(self.runner.run(&cmd)?, "php -m")?;
        let (extensions, zend_extensions) = parse_modules(&result.stdout);
        debug!(version = %variant.version, count = extensions.len(), "PHP modules listed");
        Ok(ExtensionList {
            binding: self.backend.binding(),
            version: variant.version,
            extensions,
            zend_extensions,
        })
    }

    pub fn install_extension(&self, version: Option<&str>, ext: &str) -> StackResult<ExtensionOutcome> {
        self.change_extension(version, ext, false)
    }

    pub fn uninstall_extension(&self, version: Option<&str>, ext: &str) -> StackResult<ExtensionOutcome> {
        self.change_extension(version, ext, true)
    }

    /// Install or remove the extension's package, then restart the bound
    /// unit when the variant is the enabled one.
    fn change_extension(&self, version: Option<&str>, ext: &str, remove: bool) -> StackResult<ExtensionOutcome> {
        let ext = validate_php_extension(ext)?;
        let variant = self.target_variant(version)?;
        let binding = self.backend.binding();
        let package = self
            .profile
            .family
            .php_extension_package(&variant.version, ext);

        self.package_manager(remove, std::slice::from_ref(&package))?;
        info!(
            binding = %binding,
            version = %variant.version,
            extension = ext,
            removed = remove,
            "PHP extension package changed"
        );

        let restarted_unit = if variant.enabled {
            let unit = self.backend.bound_unit(&variant.version);
            ServiceManager::new(self.runner, self.service_timeout).restart(&unit)?;
            Some(unit)
        } else {
            None
        };

        Ok(ExtensionOutcome {
            binding,
            version: variant.version,
            extension: ext.to_string(),
            package,
            restarted_unit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::DryRunRunner;
    use crate::php::VariantBackend;
    use crate::platform::{OsFamily, PlatformProfile};
    use std::time::Duration;

    /// Fixed variants; toggling is not needed here.
    struct Fixed(Vec<ModuleVariant>);

    impl VariantBackend for Fixed {
        fn binding(&self) -> Binding {
            Binding::Fpm
        }

        fn variants(&self) -> StackResult<Vec<ModuleVariant>> {
            Ok(self.0.clone())
        }

        fn enable(&self, _version: &str) -> StackResult<()> {
            Ok(())
        }

        fn disable(&self, _version: &str) -> StackResult<()> {
            Ok(())
        }

        fn bound_unit(&self, version: &str) -> String {
            format!("php{}-fpm", version)
        }
    }

    fn engine<'a>(profile: &'a PlatformProfile, backend: &'a Fixed, runner: &'a DryRunRunner) -> SwitchEngine<'a> {
        SwitchEngine::new(profile, backend, runner, Duration::from_secs(5), Duration::from_secs(5))
    }

    #[test]
    fn test_parse_modules() {
        let output = "[PHP Modules]\nCore\nctype\nPDO\npdo_mysql\nZend OPcache\n\n[Zend Modules]\nZend OPcache\n\n";
        let (php, zend) = parse_modules(output);
        assert_eq!(php, vec!["core", "ctype", "pdo", "pdo_mysql", "zend opcache"]);
        assert_eq!(zend, vec!["Zend OPcache"]);
        assert_eq!(parse_modules("PHP Warning: nope\n"), (vec![], vec![]));
    }

    #[test]
    fn test_available_marks_installed_and_enabled() {
        let profile = PlatformProfile::for_family(OsFamily::Debian);
        let backend = Fixed(vec![ModuleVariant::new("8.1", false), ModuleVariant::new("8.2", true)]);
        let runner = DryRunRunner::new();

        let available = engine(&profile, &backend, &runner).available().unwrap();
        assert!(available.len() >= candidate_php_versions().len());
        let find = |v: &str| available.iter().find(|m| m.version == v).cloned().unwrap();
        assert!(find("8.2").installed && find("8.2").enabled);
        assert!(find("8.1").installed && !find("8.1").enabled);
        assert!(!find("7.4").installed);
        assert!(runner.recorded().is_empty());
    }

    #[test]
    fn test_install_extension_for_enabled_version_restarts_unit() {
        let tmp = tempfile::tempdir().unwrap();
        let profile = PlatformProfile::for_family(OsFamily::Debian).rebased(tmp.path());
        let backend = Fixed(vec![ModuleVariant::new("8.1", false), ModuleVariant::new("8.2", true)]);
        let runner = DryRunRunner::new();
        let engine = engine(&profile, &backend, &runner);

        let outcome = engine.install_extension(None, "redis").unwrap();
        assert_eq!(outcome.version, "8.2");
        assert_eq!(outcome.package, "php8.2-redis");
        assert_eq!(outcome.restarted_unit.as_deref(), Some("php8.2-fpm"));

        let outcome = engine.uninstall_extension(Some("8.1"), "redis").unwrap();
        assert_eq!(outcome.restarted_unit, None);
        assert_eq!(
            runner.recorded(),
            vec![
                "apt-get install -y php8.2-redis",
                "systemctl restart php8.2-fpm",
                "apt-get remove -y php8.1-redis",
            ]
        );
    }

    #[test]
    fn test_extension_targets_must_exist() {
        let profile = PlatformProfile::for_family(OsFamily::Debian);
        let runner = DryRunRunner::new();

        let none_enabled = Fixed(vec![ModuleVariant::new("8.1", false)]);
        let err = engine(&profile, &none_enabled, &runner)
            .install_extension(None, "gd")
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = engine(&profile, &none_enabled, &runner)
            .install_extension(Some("8.3"), "gd")
            .unwrap_err();
        assert!(matches!(err, StackError::NotInstalled { .. }));

        let err = engine(&profile, &none_enabled, &runner)
            .install_extension(Some("8.1"), "gd;reboot")
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(runner.recorded().is_empty());
    }

    #[test]
    fn test_extensions_need_the_cli_binary() {
        let tmp = tempfile::tempdir().unwrap();
        let profile = PlatformProfile::for_family(OsFamily::Debian).rebased(tmp.path());
        let backend = Fixed(vec![ModuleVariant::new("8.2", true)]);
        let runner = DryRunRunner::new();

        let err = engine(&profile, &backend, &runner).extensions(None).unwrap_err();
        assert!(matches!(err, StackError::NotInstalled { .. }));

        let binary = profile.php_cli_binary("8.2");
        std::fs::create_dir_all(binary.parent().unwrap()).unwrap();
        std::fs::write(&binary, "").unwrap();
        let listed = engine(&profile, &backend, &runner).extensions(None).unwrap();
        assert_eq!(listed.version, "8.2");
        assert!(listed.extensions.is_empty());
        assert_eq!(runner.recorded().len(), 1);
        assert!(runner.recorded()[0].ends_with("/usr/bin/php8.2 -m"));
    }
}
