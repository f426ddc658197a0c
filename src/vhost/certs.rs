//! Self-signed certificates per domain and their trust-store projection.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use super::composer::CertificatePaths;
use crate::error::{StackError, StackResult};
use crate::executor::{ensure_success, CommandRunner, SubprocessBuilder};
use crate::files::write_private;
use crate::platform::PlatformProfile;
use crate::validation::validate_server_name;

/// Validity of generated certificates, in days.
const CERT_VALIDITY_DAYS: &str = "825";

/// Result of an explicit certificate operation.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateOutcome {
    pub domain: String,
    pub certificate: PathBuf,
    pub key: PathBuf,
    pub created: bool,
    pub trusted: bool,
}

/// Creates and trusts certificates under the profile's directories.
pub struct CertificateStore<'a> {
    profile: &'a PlatformProfile,
    runner: &'a dyn CommandRunner,
    timeout: Duration,
}

impl<'a> CertificateStore<'a> {
    pub fn new(profile: &'a PlatformProfile, runner: &'a dyn CommandRunner, timeout: Duration) -> Self {
        Self {
            profile,
            runner,
            timeout,
        }
    }

    /// `<cert_dir>/<domain>.crt` and `<key_dir>/<domain>.key`.
    pub fn paths(&self, domain: &str) -> CertificatePaths {
        CertificatePaths {
            certificate: self.profile.cert_dir.join(format!("{}.crt", domain)),
            key: self.profile.key_dir.join(format!("{}.key", domain)),
        }
    }

    fn trust_anchor(&self, domain: &str) -> PathBuf {
        self.profile.trust_anchor_dir.join(format!("{}.crt", domain))
    }

    pub fn exists(&self, domain: &str) -> bool {
        let paths = self.paths(domain);
        paths.certificate.exists() && paths.key.exists()
    }

    pub fn is_trusted(&self, domain: &str) -> bool {
        self.trust_anchor(domain).exists()
    }

    /// Create the keypair unless both files exist. Returns the paths and
    /// whether anything was generated.
    pub fn ensure(&self, domain: &str) -> StackResult<(CertificatePaths, bool)> {
        let paths = self.paths(domain);
        if self.exists(domain) {
            return Ok((paths, false));
        }

        fs::create_dir_all(&self.profile.cert_dir)?;
        fs::create_dir_all(&self.profile.key_dir)?;

        // openssl truncates an existing key file in place, so its mode is
        // 0600 before any key material is written.
        if paths.key.exists() {
            fs::remove_file(&paths.key)?;
        }
        write_private(&paths.key, "")?;

        let subject = format!("/CN={}", domain);
        let san = format!("subjectAltName=DNS:{},DNS:www.{}", domain, domain);
        let cmd = SubprocessBuilder::new("openssl")
            .args(["req", "-x509", "-nodes", "-newkey", "rsa:2048", "-days", CERT_VALIDITY_DAYS])
            .arg("-keyout")
            .arg(&paths.key.to_string_lossy())
            .arg("-out")
            .arg(&paths.certificate.to_string_lossy())
            .args(["-subj", subject.as_str(), "-addext", san.as_str()])
            .timeout(self.timeout);
        let generated = self
            .runner
            .run(&cmd)
            .and_then(|result| ensure_success(result, "openssl req"));
        if let Err(e) = generated {
            let _ = fs::remove_file(&paths.key);
            return Err(e);
        }

        info!(domain, certificate = %paths.certificate.display(), "Self-signed certificate created");
        Ok((paths, true))
    }

    /// Explicit creation (`ssl-create-cert`).
    pub fn create(&self, domain: &str) -> StackResult<CertificateOutcome> {
        let domain = validate_server_name(domain)?;
        let (paths, created) = self.ensure(&domain)?;
        Ok(self.outcome(&domain, paths, created))
    }

    /// Copy the certificate into the trust-anchor directory and refresh.
    pub fn trust(&self, domain: &str) -> StackResult<CertificateOutcome> {
        let domain = validate_server_name(domain)?;
        let paths = self.paths(&domain);
        if !paths.certificate.exists() {
            return Err(StackError::NotFound {
                what: "Certificate",
                name: paths.certificate.display().to_string(),
            });
        }

        fs::create_dir_all(&self.profile.trust_anchor_dir)?;
        fs::copy(&paths.certificate, self.trust_anchor(&domain))?;
        self.refresh_trust()?;
        info!(domain = %domain, "Certificate added to the trust store");
        Ok(self.outcome(&domain, paths, false))
    }

    /// Remove the certificate from the trust-anchor directory and refresh.
    pub fn untrust(&self, domain: &str) -> StackResult<CertificateOutcome> {
        let domain = validate_server_name(domain)?;
        let anchor = self.trust_anchor(&domain);
        if anchor.exists() {
            fs::remove_file(&anchor)?;
            self.refresh_trust()?;
            info!(domain = %domain, "Certificate removed from the trust store");
        }
        let paths = self.paths(&domain);
        Ok(self.outcome(&domain, paths, false))
    }

    fn refresh_trust(&self) -> StackResult<()> {
        let Some((program, args)) = self.profile.trust_refresh_command.split_first() else {
            return Ok(());
        };
        let cmd = SubprocessBuilder::new(program)
            .args(args)
            .timeout(self.timeout);
        ensure_success(self.runner.run(&cmd)?, program)?;
        Ok(())
    }

    fn outcome(&self, domain: &str, paths: CertificatePaths, created: bool) -> CertificateOutcome {
        CertificateOutcome {
            domain: domain.to_string(),
            trusted: self.is_trusted(domain),
            certificate: paths.certificate,
            key: paths.key,
            created,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use crate::executor::DryRunRunner;
    use crate::platform::OsFamily;

    #[test]
    fn test_paths_follow_profile() {
        let profile = PlatformProfile::for_family(OsFamily::Debian);
        let runner = DryRunRunner::new();
        let store = CertificateStore::new(&profile, &runner, Duration::from_secs(5));
        let paths = store.paths("test.local");
        assert_eq!(paths.certificate, PathBuf::from("/etc/ssl/certs/test.local.crt"));
        assert_eq!(paths.key, PathBuf::from("/etc/ssl/private/test.local.key"));
    }

    #[test]
    fn test_existing_pair_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let profile = PlatformProfile::for_family(OsFamily::Rpm).rebased(dir.path());
        let runner = DryRunRunner::new();
        let store = CertificateStore::new(&profile, &runner, Duration::from_secs(5));
        let paths = store.paths("a.test");
        fs::create_dir_all(paths.certificate.parent().unwrap()).unwrap();
        fs::create_dir_all(paths.key.parent().unwrap()).unwrap();
        fs::write(&paths.certificate, "crt").unwrap();
        fs::write(&paths.key, "key").unwrap();

        let (_, created) = store.ensure("a.test").unwrap();
        assert!(!created);
        assert!(runner.recorded().is_empty());
    }

    #[test]
    fn test_key_is_private_before_generation() {
        let dir = tempfile::tempdir().unwrap();
        let profile = PlatformProfile::for_family(OsFamily::Debian).rebased(dir.path());
        let runner = DryRunRunner::new();
        let store = CertificateStore::new(&profile, &runner, Duration::from_secs(5));
        let paths = store.paths("k.test");
        fs::create_dir_all(paths.key.parent().unwrap()).unwrap();
        fs::write(&paths.key, "stale").unwrap();
        fs::set_permissions(&paths.key, fs::Permissions::from_mode(0o644)).unwrap();

        let (_, created) = store.ensure("k.test").unwrap();
        assert!(created);
        let meta = fs::metadata(&paths.key).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
        assert_eq!(meta.len(), 0);
        assert!(runner.recorded()[0].starts_with("openssl req -x509"));
    }

    #[test]
    fn test_trust_requires_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let profile = PlatformProfile::for_family(OsFamily::Debian).rebased(dir.path());
        let runner = DryRunRunner::new();
        let store = CertificateStore::new(&profile, &runner, Duration::from_secs(5));
        assert!(matches!(
            store.trust("missing.test").unwrap_err(),
            StackError::NotFound { .. }
        ));
    }

    #[test]
    fn test_trust_and_untrust() {
        let dir = tempfile::tempdir().unwrap();
        let profile = PlatformProfile::for_family(OsFamily::Debian).rebased(dir.path());
        let runner = DryRunRunner::new();
        let store = CertificateStore::new(&profile, &runner, Duration::from_secs(5));
        let paths = store.paths("a.test");
        fs::create_dir_all(paths.certificate.parent().unwrap()).unwrap();
        fs::write(&paths.certificate, "crt").unwrap();

        assert!(store.trust("a.test").unwrap().trusted);
        assert!(!store.untrust("a.test").unwrap().trusted);
        assert_eq!(
            runner.recorded(),
            vec!["update-ca-certificates", "update-ca-certificates"]
        );
    }
}
