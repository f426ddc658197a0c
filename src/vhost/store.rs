//! The addressable collection of virtual hosts and its side effects.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::certs::CertificateStore;
use super::composer::{bound_php_version, Composer, VhostSpec};
use super::hosts::HostsFileSection;
use crate::error::{StackError, StackResult};
use crate::executor::{ensure_success, CommandRunner, SubprocessBuilder};
use crate::files::{ensure_symlink, is_symlink, remove_symlink, write_atomic};
use crate::platform::PlatformProfile;
use crate::services::ServiceManager;
use crate::templates::TemplateEngine;
use crate::validation::{
    validate_document_root, validate_php_version, validate_server_name, validate_vhost_filename,
    vhost_filename, VHOST_SUFFIX,
};

/// Index pages that count as "site content already present".
const INDEX_FILES: &[&str] = &["index.html", "index.htm", "index.php"];

const PLACEHOLDER_TEMPLATE: &str = "apache/index.html.tera";

/// Parameters of `vhost-create`.
#[derive(Debug, Clone)]
pub struct CreateVhost {
    pub server_name: String,
    pub document_root: String,
    pub ssl: bool,
    pub php_version: Option<String>,
}

/// One row of `vhost-list`. Fields the scan could not find are empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VhostEntry {
    pub filename: String,
    pub server_name: String,
    pub document_root: String,
    pub ssl: bool,
    pub php_version: Option<String>,
    pub enabled: bool,
}

/// Full attribute set of `vhost-details`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VhostDetails {
    #[serde(flatten)]
    pub entry: VhostEntry,
    pub path: PathBuf,
    pub server_alias: Vec<String>,
    pub ssl_certificate: Option<String>,
    pub ssl_certificate_key: Option<String>,
}

/// What `vhost-create` did beyond writing the file.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOutcome {
    #[serde(flatten)]
    pub details: VhostDetails,
    pub placeholder_written: bool,
    pub certificate_created: bool,
    pub hosts_entry_added: bool,
    pub reloaded: bool,
}

/// Result of `vhost-enable` / `vhost-disable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub filename: String,
    pub enabled: bool,
    pub changed: bool,
    pub status: ToggleStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleStatus {
    Enabled,
    Disabled,
    AlreadyEnabled,
    AlreadyDisabled,
    /// No enabled-dir on this family: every vhost file is always loaded.
    AlreadyActive,
    /// Disabling is impossible without an enabled-dir.
    NotSupported,
}

/// Result of `vhost-delete`.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub filename: String,
    pub server_name: String,
    pub hosts_entry_removed: bool,
    pub reloaded: bool,
}

/// Attributes recovered by a line scan. Never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedVhost {
    pub server_name: String,
    pub server_alias: Vec<String>,
    pub document_root: String,
    pub ssl: bool,
    pub php_version: Option<String>,
    pub ssl_certificate: Option<String>,
    pub ssl_certificate_key: Option<String>,
}

fn unquote(value: &str) -> String {
    value.trim().trim_matches('"').trim_matches('\'').to_string()
}

impl ScannedVhost {
    /// First occurrence of each directive wins.
    pub fn scan(text: &str) -> Self {
        let mut scanned = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let (name, args) = match line.split_once(char::is_whitespace) {
                Some((n, a)) => (n.to_ascii_lowercase(), a.trim()),
                None => continue,
            };
            match name.as_str() {
                "servername" if scanned.server_name.is_empty() => {
                    scanned.server_name = unquote(args);
                }
                "serveralias" => scanned
                    .server_alias
                    .extend(args.split_whitespace().map(unquote)),
                "documentroot" if scanned.document_root.is_empty() => {
                    scanned.document_root = unquote(args);
                }
                "sslengine" if args.eq_ignore_ascii_case("on") => scanned.ssl = true,
                "sslcertificatefile" if scanned.ssl_certificate.is_none() => {
                    scanned.ssl_certificate = Some(unquote(args));
                }
                "sslcertificatekeyfile" if scanned.ssl_certificate_key.is_none() => {
                    scanned.ssl_certificate_key = Some(unquote(args));
                }
                "<virtualhost" if args.contains(":443") => scanned.ssl = true,
                _ => {}
            }
        }
        scanned.php_version = bound_php_version(text);
        scanned
    }
}

/// Virtual hosts under the profile's vhost directory.
pub struct VhostStore<'a> {
    profile: &'a PlatformProfile,
    runner: &'a dyn CommandRunner,
    templates: &'a TemplateEngine,
    timeout: Duration,
    service_timeout: Duration,
}

impl<'a> VhostStore<'a> {
    pub fn new(
        profile: &'a PlatformProfile,
        runner: &'a dyn CommandRunner,
        templates: &'a TemplateEngine,
        timeout: Duration,
        service_timeout: Duration,
    ) -> Self {
        Self {
            profile,
            runner,
            templates,
            timeout,
            service_timeout,
        }
    }

    fn composer(&self) -> Composer<'_> {
        Composer::new(self.profile, self.templates)
    }

    fn hosts(&self) -> HostsFileSection {
        HostsFileSection::new(&self.profile.hosts_file)
    }

    fn certificates(&self) -> CertificateStore<'_> {
        CertificateStore::new(self.profile, self.runner, self.timeout)
    }

    fn ensure_web_server(&self) -> StackResult<()> {
        if self.profile.config_dir.is_dir() {
            return Ok(());
        }
        Err(StackError::ServiceUnavailable {
            message: format!(
                "Apache does not appear to be installed ({} is missing)",
                self.profile.config_dir.display()
            ),
        })
    }

    fn enabled_link(&self, filename: &str) -> Option<PathBuf> {
        self.profile
            .enabled_vhost_dir
            .as_ref()
            .map(|dir| dir.join(filename))
    }

    fn is_enabled(&self, filename: &str) -> bool {
        match self.enabled_link(filename) {
            Some(link) => is_symlink(&link) || link.exists(),
            None => true,
        }
    }

    fn existing_path(&self, filename: &str) -> StackResult<(String, PathBuf)> {
        let filename = validate_vhost_filename(filename)?;
        let path = self.profile.vhost_path(&filename);
        if !path.is_file() {
            return Err(StackError::NotFound {
                what: "Virtual host",
                name: filename,
            });
        }
        Ok((filename, path))
    }

    /// Syntax-check the configuration, then reload if the server is running.
    ///
    /// Returns whether a reload was issued.
    pub fn reload(&self) -> StackResult<bool> {
        let services = ServiceManager::new(self.runner, self.service_timeout);
        let unit = &self.profile.service_unit_name;
        if !services.is_active(unit)? {
            debug!(unit = %unit, "Web server not running; configuration is picked up on start");
            return Ok(false);
        }

        let check = SubprocessBuilder::new(&self.profile.control_program)
            .arg("configtest")
            .timeout(self.timeout);
        ensure_success(
            self.runner.run(&check)?,
            &format!("{} configtest", self.profile.control_program),
        )?;

        services.reload(unit)?;
        Ok(true)
    }

    /// Create (or re-create) a virtual host. Running it twice with the same
    /// arguments leaves the system in the same state.
    pub fn create(&self, request: &CreateVhost) -> StackResult<CreateOutcome> {
        let server_name = validate_server_name(&request.server_name)?;
        let document_root = validate_document_root(&request.document_root)?;
        if let Some(version) = &request.php_version {
            validate_php_version(version)?;
        }
        self.ensure_web_server()?;

        let filename = vhost_filename(&server_name);
        let path = self.profile.vhost_path(&filename);

        fs::create_dir_all(&document_root)?;
        let placeholder_written = self.write_placeholder(&server_name, &document_root)?;

        let (certificates, certificate_created) = if request.ssl {
            let (paths, created) = self.certificates().ensure(&server_name)?;
            (Some(paths), created)
        } else {
            (None, false)
        };

        let text = self.composer().compose(&VhostSpec {
            server_name: &server_name,
            document_root: &document_root,
            ssl: certificates.as_ref(),
            php_version: request.php_version.as_deref(),
        })?;
        write_atomic(&path, &text, 0o644)?;
        info!(path = %path.display(), "Virtual host configuration written");

        if let Some(link) = self.enabled_link(&filename) {
            ensure_symlink(&path, &link)?;
        }

        let hosts_entry_added = self.hosts().add(&server_name)?;
        let reloaded = self.reload()?;

        Ok(CreateOutcome {
            details: self.details(&filename)?,
            placeholder_written,
            certificate_created,
            hosts_entry_added,
            reloaded,
        })
    }

    fn write_placeholder(&self, server_name: &str, document_root: &Path) -> StackResult<bool> {
        if INDEX_FILES.iter().any(|f| document_root.join(f).exists()) {
            return Ok(false);
        }
        let page = self.templates.render(
            PLACEHOLDER_TEMPLATE,
            &json!({
                "server_name": server_name,
                "document_root": document_root.display().to_string(),
            }),
        )?;
        write_atomic(&document_root.join("index.html"), &page, 0o644)?;
        Ok(true)
    }

    /// Every `*.conf` in the vhost directory, sorted by filename.
    pub fn list(&self) -> StackResult<Vec<VhostEntry>> {
        let entries = match fs::read_dir(&self.profile.vhost_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut filenames: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(VHOST_SUFFIX))
            .collect();
        filenames.sort();

        Ok(filenames
            .into_iter()
            .map(|filename| {
                let text = fs::read_to_string(self.profile.vhost_path(&filename))
                    .unwrap_or_else(|e| {
                        warn!(filename = %filename, error = %e, "Unreadable vhost file");
                        String::new()
                    });
                self.entry(filename, &ScannedVhost::scan(&text))
            })
            .collect())
    }

    fn entry(&self, filename: String, scanned: &ScannedVhost) -> VhostEntry {
        VhostEntry {
            enabled: self.is_enabled(&filename),
            filename,
            server_name: scanned.server_name.clone(),
            document_root: scanned.document_root.clone(),
            ssl: scanned.ssl,
            php_version: scanned.php_version.clone(),
        }
    }

    pub fn details(&self, filename: &str) -> StackResult<VhostDetails> {
        let (filename, path) = self.existing_path(filename)?;
        let text = fs::read_to_string(&path)?;
        let scanned = ScannedVhost::scan(&text);
        Ok(VhostDetails {
            entry: self.entry(filename, &scanned),
            path,
            server_alias: scanned.server_alias,
            ssl_certificate: scanned.ssl_certificate,
            ssl_certificate_key: scanned.ssl_certificate_key,
        })
    }

    pub fn enable(&self, filename: &str) -> StackResult<ToggleOutcome> {
        let (filename, path) = self.existing_path(filename)?;
        let Some(link) = self.enabled_link(&filename) else {
            return Ok(ToggleOutcome {
                filename,
                enabled: true,
                changed: false,
                status: ToggleStatus::AlreadyActive,
            });
        };

        let changed = ensure_symlink(&path, &link)?;
        if changed {
            self.reload()?;
        }
        Ok(ToggleOutcome {
            filename,
            enabled: true,
            changed,
            status: if changed {
                ToggleStatus::Enabled
            } else {
                ToggleStatus::AlreadyEnabled
            },
        })
    }

    pub fn disable(&self, filename: &str) -> StackResult<ToggleOutcome> {
        let (filename, _) = self.existing_path(filename)?;
        let Some(link) = self.enabled_link(&filename) else {
            return Ok(ToggleOutcome {
                filename,
                enabled: true,
                changed: false,
                status: ToggleStatus::NotSupported,
            });
        };

        let changed = remove_symlink(&link)?;
        if changed {
            self.reload()?;
        }
        Ok(ToggleOutcome {
            filename,
            enabled: false,
            changed,
            status: if changed {
                ToggleStatus::Disabled
            } else {
                ToggleStatus::AlreadyDisabled
            },
        })
    }

    /// Remove the vhost and retract the host entry the engine created for it.
    pub fn delete(&self, filename: &str) -> StackResult<DeleteOutcome> {
        let (filename, path) = self.existing_path(filename)?;
        let scanned = ScannedVhost::scan(&fs::read_to_string(&path)?);

        if let Some(link) = self.enabled_link(&filename) {
            remove_symlink(&link)?;
        }
        fs::remove_file(&path)?;
        info!(path = %path.display(), "Virtual host removed");

        let hosts_entry_removed = if scanned.server_name.is_empty() {
            false
        } else {
            self.hosts().remove(&scanned.server_name)?
        };
        let reloaded = self.reload()?;

        Ok(DeleteOutcome {
            filename,
            server_name: scanned.server_name,
            hosts_entry_removed,
            reloaded,
        })
    }

    /// Bind the vhost to `version`'s FPM socket, or unbind it with `None`.
    pub fn update_php(&self, filename: &str, version: Option<&str>) -> StackResult<VhostDetails> {
        if let Some(version) = version {
            validate_php_version(version)?;
        }
        let (filename, path) = self.existing_path(filename)?;
        let current = fs::read_to_string(&path)?;
        let updated = self.composer().rebind_php(&current, version)?;

        if updated != current {
            write_atomic(&path, &updated, 0o644)?;
            info!(path = %path.display(), php_version = ?version, "PHP handler rebound");
            self.reload()?;
        }
        self.details(&filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_is_best_effort() {
        let scanned = ScannedVhost::scan(
            "<VirtualHost *:443>\n  ServerName \"a.test\"\n  ServerAlias www.a.test b.test\n  DocumentRoot /srv/a\n  SSLCertificateFile /c.crt\n  SetHandler \"proxy:unix:/run/php/php8.1-fpm.sock|fcgi://localhost\"\n",
        );
        assert_eq!(scanned.server_name, "a.test");
        assert_eq!(scanned.server_alias, vec!["www.a.test", "b.test"]);
        assert_eq!(scanned.document_root, "/srv/a");
        assert!(scanned.ssl);
        assert_eq!(scanned.ssl_certificate.as_deref(), Some("/c.crt"));
        assert_eq!(scanned.php_version.as_deref(), Some("8.1"));

        assert_eq!(ScannedVhost::scan("garbage <<<"), ScannedVhost::default());
    }

    #[test]
    fn test_toggle_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(ToggleStatus::AlreadyActive).unwrap(),
            serde_json::json!("already_active")
        );
    }
}
