//! The resolved, immutable description of the host platform.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use super::family::{Binding, ModuleLayout, OsFamily, PackageManager};

/// Everything the other components need to know about the host.
///
/// Built once per invocation by the resolver and passed by reference to
/// every component. Filesystem paths are already rebased under the sandbox
/// root when one is configured; runtime endpoints such as sockets are not,
/// since they are what the real services listen on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformProfile {
    pub family: OsFamily,
    pub distribution: String,
    pub version: String,
    pub package_manager: PackageManager,
    pub service_unit_name: String,
    pub config_dir: PathBuf,
    pub main_config: PathBuf,
    pub vhost_dir: PathBuf,
    pub enabled_vhost_dir: Option<PathBuf>,
    pub log_dir: PathBuf,
    pub control_program: String,
    pub socket_path: PathBuf,
    pub database_unit_name: String,
    pub maintenance_credentials: Option<PathBuf>,
    pub hosts_file: PathBuf,
    pub cert_dir: PathBuf,
    pub key_dir: PathBuf,
    pub trust_anchor_dir: PathBuf,
    pub trust_refresh_command: Vec<String>,
    pub php_modules: ModuleLayout,
    pub ssl_module_marker: PathBuf,
    pub web_user: String,
    pub database_user: String,
    pub root: Option<PathBuf>,
}

impl PlatformProfile {
    /// Profile for `family` using the strategy table, rooted at `/`.
    pub fn for_family(family: OsFamily) -> Self {
        let table = family.table();
        let php_modules = match table.module_enabled_dir {
            Some(enabled) => ModuleLayout::Symlinked {
                available: PathBuf::from(table.module_available_dir),
                enabled: PathBuf::from(enabled),
            },
            None => ModuleLayout::Renamed {
                dir: PathBuf::from(table.module_available_dir),
            },
        };

        Self {
            family,
            distribution: family.to_string(),
            version: String::new(),
            package_manager: table.package_manager,
            service_unit_name: table.service_unit.to_string(),
            config_dir: PathBuf::from(table.config_dir),
            main_config: PathBuf::from(table.main_config),
            vhost_dir: PathBuf::from(table.vhost_dir),
            enabled_vhost_dir: table.enabled_vhost_dir.map(PathBuf::from),
            log_dir: PathBuf::from(table.log_dir),
            control_program: table.control_program.to_string(),
            socket_path: PathBuf::from(table.socket_path),
            database_unit_name: table.database_unit.to_string(),
            maintenance_credentials: table.maintenance_credentials.map(PathBuf::from),
            hosts_file: PathBuf::from("/etc/hosts"),
            cert_dir: PathBuf::from(table.cert_dir),
            key_dir: PathBuf::from(table.key_dir),
            trust_anchor_dir: PathBuf::from(table.trust_anchor_dir),
            trust_refresh_command: table.trust_refresh.iter().map(|s| s.to_string()).collect(),
            php_modules,
            ssl_module_marker: PathBuf::from(table.ssl_module_marker),
            web_user: table.web_user.to_string(),
            database_user: table.database_user.to_string(),
            root: None,
        }
    }

    /// Rewrite every filesystem path under `root`.
    ///
    /// Log directories and runtime sockets stay as they are: they are
    /// written into generated configuration and used by live services.
    pub fn rebased(mut self, root: &Path) -> Self {
        let r = |p: &mut PathBuf| {
            let moved = join_under(root, p.as_path());
            *p = moved;
        };
        r(&mut self.config_dir);
        r(&mut self.main_config);
        r(&mut self.vhost_dir);
        if let Some(dir) = self.enabled_vhost_dir.as_mut() {
            r(dir);
        }
        if let Some(file) = self.maintenance_credentials.as_mut() {
            r(file);
        }
        r(&mut self.hosts_file);
        r(&mut self.cert_dir);
        r(&mut self.key_dir);
        r(&mut self.trust_anchor_dir);
        match &mut self.php_modules {
            ModuleLayout::Symlinked { available, enabled } => {
                r(available);
                r(enabled);
            }
            ModuleLayout::Renamed { dir } => r(dir),
        }
        r(&mut self.ssl_module_marker);
        self.root = Some(root.to_path_buf());
        self
    }

    /// Map an absolute host path into the sandbox, if any.
    pub fn host_path(&self, path: impl AsRef<Path>) -> PathBuf {
        match &self.root {
            Some(root) => join_under(root, path.as_ref()),
            None => path.as_ref().to_path_buf(),
        }
    }

    /// Config file path for a vhost filename.
    pub fn vhost_path(&self, filename: &str) -> PathBuf {
        self.vhost_dir.join(filename)
    }

    pub fn fpm_socket(&self, version: &str) -> String {
        self.family.fpm_socket(version)
    }

    pub fn fpm_unit(&self, version: &str) -> String {
        self.family.fpm_unit(version)
    }

    /// FPM binary location, inside the sandbox when rebased.
    pub fn fpm_binary(&self, version: &str) -> PathBuf {
        self.host_path(self.family.fpm_binary(version))
    }

    /// PHP CLI location, inside the sandbox when rebased.
    pub fn php_cli_binary(&self, version: &str) -> PathBuf {
        self.host_path(self.family.php_cli_binary(version))
    }

    pub fn php_packages(&self, version: &str, binding: Binding) -> Vec<String> {
        self.family.php_packages(version, binding)
    }

    /// Unit restarted after a PHP binding change.
    pub fn bound_unit(&self, binding: Binding, version: &str) -> String {
        match binding {
            Binding::Apache => self.service_unit_name.clone(),
            Binding::Fpm => self.fpm_unit(version),
        }
    }
}

/// `root` + `path` with the leading `/` of `path` dropped.
fn join_under(root: &Path, path: &Path) -> PathBuf {
    let relative: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect();
    root.join(relative)
}
