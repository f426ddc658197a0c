//! Platform detection from os-release data.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::family::{OsFamily, PackageManager};
use super::profile::PlatformProfile;
use crate::error::{StackError, StackResult};

/// The fields of an os-release file the resolver cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub id: String,
    pub id_like: Vec<String>,
    pub name: String,
    pub version_id: String,
}

impl OsRelease {
    /// Parse `KEY=value` lines; quotes around values are stripped.
    pub fn parse(content: &str) -> Self {
        let fields: HashMap<&str, String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| {
                let value = value.trim().trim_matches('"').trim_matches('\'');
                (key.trim(), value.to_string())
            })
            .collect();

        Self {
            id: fields.get("ID").cloned().unwrap_or_default().to_ascii_lowercase(),
            id_like: fields
                .get("ID_LIKE")
                .map(|v| v.split_whitespace().map(str::to_ascii_lowercase).collect())
                .unwrap_or_default(),
            name: fields
                .get("PRETTY_NAME")
                .or_else(|| fields.get("NAME"))
                .cloned()
                .unwrap_or_default(),
            version_id: fields.get("VERSION_ID").cloned().unwrap_or_default(),
        }
    }

    /// Family from `ID`, then from each `ID_LIKE` entry in order.
    pub fn family(&self) -> Option<OsFamily> {
        std::iter::once(&self.id)
            .chain(self.id_like.iter())
            .find_map(|id| OsFamily::from_os_id(id))
    }
}

/// Resolves the [`PlatformProfile`] for this invocation.
#[derive(Debug, Clone)]
pub struct PlatformResolver {
    os_release: PathBuf,
    root: Option<PathBuf>,
}

impl PlatformResolver {
    pub fn new(os_release: impl Into<PathBuf>) -> Self {
        Self {
            os_release: os_release.into(),
            root: None,
        }
    }

    /// Resolve paths under a sandbox root. The os-release file is read
    /// from inside the root as well.
    pub fn with_root(mut self, root: Option<PathBuf>) -> Self {
        self.root = root;
        self
    }

    /// Detect the platform. Reads files only; runs no commands.
    pub fn resolve(&self) -> StackResult<PlatformProfile> {
        let os_release_path = match &self.root {
            Some(root) => {
                let relative = self
                    .os_release
                    .strip_prefix("/")
                    .unwrap_or(self.os_release.as_path());
                let sandboxed = root.join(relative);
                if sandboxed.exists() {
                    sandboxed
                } else {
                    self.os_release.clone()
                }
            }
            None => self.os_release.clone(),
        };

        let content = std::fs::read_to_string(&os_release_path).map_err(|e| {
            StackError::UnsupportedPlatform {
                message: format!(
                    "cannot read OS identification from {}: {}",
                    os_release_path.display(),
                    e
                ),
            }
        })?;

        let release = OsRelease::parse(&content);
        let profile = self.profile_for(&release)?;
        info!(
            family = %profile.family,
            distribution = %profile.distribution,
            package_manager = %profile.package_manager,
            "Resolved platform"
        );
        Ok(profile)
    }

    /// Build the profile for already-parsed os-release data.
    pub fn profile_for(&self, release: &OsRelease) -> StackResult<PlatformProfile> {
        let family = release.family().ok_or_else(|| StackError::UnsupportedPlatform {
            message: format!(
                "'{}' (ID={}, ID_LIKE={}) is not a Fedora/RHEL, Debian/Ubuntu or Arch derivative",
                release.name,
                release.id,
                release.id_like.join(" ")
            ),
        })?;

        let mut profile = PlatformProfile::for_family(family);
        if !release.name.is_empty() {
            profile.distribution = release.name.clone();
        }
        profile.version = release.version_id.clone();
        if let Some(root) = &self.root {
            profile = profile.rebased(root);
        }

        if family == OsFamily::Rpm
            && !self.has_program(&profile, "dnf")
            && self.has_program(&profile, "yum")
        {
            debug!("dnf not found, falling back to yum");
            profile.package_manager = PackageManager::Yum;
        }

        Ok(profile)
    }

    fn has_program(&self, profile: &PlatformProfile, name: &str) -> bool {
        if self.root.is_some() {
            return ["/usr/bin", "/bin", "/usr/sbin"]
                .iter()
                .any(|dir| profile.host_path(Path::new(dir).join(name)).exists());
        }
        std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(name).is_file()))
            .unwrap_or(false)
    }
}
