//! Appends audit entries as JSON lines.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::entry::AuditEntry;
use crate::config::AuditConfig;
use crate::error::StackResult;

pub struct AuditLogger {
    path: PathBuf,
}

impl AuditLogger {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// `None` when auditing is switched off.
    pub fn from_config(config: &AuditConfig) -> Option<Self> {
        config.enabled.then(|| Self::new(&config.log_path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line, creating the log and its directory on first use.
    pub fn log(&self, entry: &AuditEntry) -> StackResult<()> {
        let line = serde_json::to_string(entry)?;

        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                debug!(path = %parent.display(), "Creating audit log directory");
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        if let Err(e) = file.sync_data() {
            warn!(error = %e, "Failed to sync audit log");
        }

        debug!(request_id = %entry.request_id, operation = %entry.operation, "Audit entry logged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditResult;
    use uuid::Uuid;

    fn entry(operation: &str) -> AuditEntry {
        AuditEntry::new(
            Uuid::new_v4(),
            operation,
            &serde_json::json!({}),
            0,
            true,
            AuditResult::Success,
            1,
        )
    }

    #[test]
    fn test_appends_json_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/audit.log");
        let logger = AuditLogger::new(&path);
        logger.log(&entry("vhost-create")).unwrap();
        logger.log(&entry("php-switch")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["operation"], "php-switch");
        assert_eq!(lines[0]["dry_run"], true);
    }

    #[test]
    fn test_disabled_config_yields_none() {
        assert!(AuditLogger::from_config(&AuditConfig::default()).is_none());
    }
}
