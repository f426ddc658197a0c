//! The web server's PHP module as a variant backend.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info};

use super::variant::{is_version_shaped, sort_versions, ModuleVariant, VariantBackend};
use crate::error::{StackError, StackResult};
use crate::files::{ensure_symlink, is_symlink, remove_symlink};
use crate::platform::{Binding, ModuleLayout, PlatformProfile};

const DISABLED_SUFFIX: &str = ".disabled";

/// Debian module files: `php<v>.load` plus an optional `php<v>.conf`.
const SYMLINKED_EXTENSIONS: &[&str] = &["load", "conf"];

/// Renamed-layout prefix: `15-php<v>.conf`.
const RENAMED_PREFIX: &str = "15-php";

pub struct ApacheModuleBackend<'a> {
    profile: &'a PlatformProfile,
}

fn file_names(dir: &Path) -> StackResult<Vec<String>> {
    match fs::read_dir(dir) {
        Ok(entries) => Ok(entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

impl<'a> ApacheModuleBackend<'a> {
    pub fn new(profile: &'a PlatformProfile) -> Self {
        Self { profile }
    }

    fn not_installed(version: &str) -> StackError {
        StackError::NotInstalled {
            version: version.to_string(),
        }
    }

    fn symlinked_variants(available: &Path, enabled: &Path) -> StackResult<Vec<ModuleVariant>> {
        Ok(file_names(available)?
            .iter()
            .filter_map(|name| name.strip_prefix("php")?.strip_suffix(".load"))
            .filter(|version| is_version_shaped(version))
            .map(|version| {
                let link = enabled.join(format!("php{}.load", version));
                ModuleVariant::new(version, is_symlink(&link) || link.exists())
            })
            .collect())
    }

    fn renamed_variants(dir: &Path) -> StackResult<Vec<ModuleVariant>> {
        let mut variants: Vec<ModuleVariant> = Vec::new();
        for name in file_names(dir)? {
            let Some(rest) = name.strip_prefix(RENAMED_PREFIX) else {
                continue;
            };
            let (version, enabled) = match rest.strip_suffix(".conf.disabled") {
                Some(version) => (version, false),
                None => match rest.strip_suffix(".conf") {
                    Some(version) => (version, true),
                    None => continue,
                },
            };
            if !is_version_shaped(version) {
                continue;
            }
            // Both spellings present: the live one wins.
            match variants.iter_mut().find(|v| v.version == version) {
                Some(existing) => existing.enabled |= enabled,
                None => variants.push(ModuleVariant::new(version, enabled)),
            }
        }
        Ok(variants)
    }
}

impl VariantBackend for ApacheModuleBackend<'_> {
    fn binding(&self) -> Binding {
        Binding::Apache
    }

    fn variants(&self) -> StackResult<Vec<ModuleVariant>> {
        let mut variants = match &self.profile.php_modules {
            ModuleLayout::Symlinked { available, enabled } => {
                Self::symlinked_variants(available, enabled)?
            }
            ModuleLayout::Renamed { dir } => Self::renamed_variants(dir)?,
        };
        sort_versions(&mut variants);
        Ok(variants)
    }

    fn enable(&self, version: &str) -> StackResult<()> {
        match &self.profile.php_modules {
            ModuleLayout::Symlinked { available, enabled } => {
                let load = available.join(format!("php{}.load", version));
                if !load.exists() {
                    return Err(Self::not_installed(version));
                }
                for ext in SYMLINKED_EXTENSIONS {
                    let file = format!("php{}.{}", version, ext);
                    let target = available.join(&file);
                    if target.exists() {
                        ensure_symlink(&target, &enabled.join(&file))?;
                    }
                }
            }
            ModuleLayout::Renamed { dir } => {
                let live = dir.join(format!("{}{}.conf", RENAMED_PREFIX, version));
                let parked = dir.join(format!("{}{}.conf{}", RENAMED_PREFIX, version, DISABLED_SUFFIX));
                if live.exists() {
                    debug!(version, "Module already live");
                } else if parked.exists() {
                    fs::rename(&parked, &live)?;
                } else {
                    return Err(Self::not_installed(version));
                }
            }
        }
        info!(version, "Apache PHP module enabled");
        Ok(())
    }

    fn disable(&self, version: &str) -> StackResult<()> {
        match &self.profile.php_modules {
            ModuleLayout::Symlinked { enabled, .. } => {
                for ext in SYMLINKED_EXTENSIONS {
                    remove_symlink(&enabled.join(format!("php{}.{}", version, ext)))?;
                }
            }
            ModuleLayout::Renamed { dir } => {
                let live = dir.join(format!("{}{}.conf", RENAMED_PREFIX, version));
                let parked = dir.join(format!("{}{}.conf{}", RENAMED_PREFIX, version, DISABLED_SUFFIX));
                if live.exists() {
                    if parked.exists() {
                        fs::remove_file(&parked)?;
                    }
                    fs::rename(&live, &parked)?;
                }
            }
        }
        info!(version, "Apache PHP module disabled");
        Ok(())
    }

    fn bound_unit(&self, _version: &str) -> String {
        self.profile.service_unit_name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::OsFamily;

    fn debian(root: &Path) -> PlatformProfile {
        PlatformProfile::for_family(OsFamily::Debian).rebased(root)
    }

    fn dirs(profile: &PlatformProfile) -> (std::path::PathBuf, std::path::PathBuf) {
        match &profile.php_modules {
            ModuleLayout::Symlinked { available, enabled } => (available.clone(), enabled.clone()),
            ModuleLayout::Renamed { .. } => unreachable!(),
        }
    }

    #[test]
    fn test_symlinked_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let profile = debian(tmp.path());
        let (available, enabled) = dirs(&profile);
        fs::create_dir_all(&available).unwrap();
        fs::create_dir_all(&enabled).unwrap();
        for v in ["7.4", "8.2"] {
            fs::write(available.join(format!("php{}.load", v)), "LoadModule").unwrap();
            fs::write(available.join(format!("php{}.conf", v)), "<FilesMatch>").unwrap();
        }
        fs::write(available.join("rewrite.load"), "").unwrap();

        let backend = ApacheModuleBackend::new(&profile);
        assert_eq!(
            backend.variants().unwrap(),
            vec![ModuleVariant::new("7.4", false), ModuleVariant::new("8.2", false)]
        );

        backend.enable("8.2").unwrap();
        assert!(is_symlink(&enabled.join("php8.2.load")));
        assert!(is_symlink(&enabled.join("php8.2.conf")));
        assert!(backend.variants().unwrap()[1].enabled);

        backend.disable("8.2").unwrap();
        assert!(!enabled.join("php8.2.conf").exists());
        assert!(matches!(
            backend.enable("5.6").unwrap_err(),
            StackError::NotInstalled { .. }
        ));
    }

    #[test]
    fn test_renamed_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let profile = PlatformProfile::for_family(OsFamily::Rpm).rebased(tmp.path());
        let ModuleLayout::Renamed { dir } = &profile.php_modules else {
            unreachable!()
        };
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("15-php8.1.conf"), "").unwrap();
        fs::write(dir.join("15-php8.3.conf.disabled"), "").unwrap();
        fs::write(dir.join("00-base.conf"), "").unwrap();

        let backend = ApacheModuleBackend::new(&profile);
        assert_eq!(
            backend.variants().unwrap(),
            vec![ModuleVariant::new("8.1", true), ModuleVariant::new("8.3", false)]
        );

        backend.enable("8.3").unwrap();
        backend.disable("8.1").unwrap();
        assert!(dir.join("15-php8.3.conf").exists());
        assert!(dir.join("15-php8.1.conf.disabled").exists());

        // Repeating is harmless.
        backend.disable("8.1").unwrap();
        backend.enable("8.3").unwrap();
        assert_eq!(
            backend.variants().unwrap(),
            vec![ModuleVariant::new("8.1", false), ModuleVariant::new("8.3", true)]
        );
    }
}
