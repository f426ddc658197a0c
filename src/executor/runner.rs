//! The seam between the engine and the operating system's programs.
//!
//! Components never spawn processes directly; they hand a
//! [`SubprocessBuilder`] to a [`CommandRunner`]. The binary uses
//! [`SystemRunner`], `--dry-run` uses [`DryRunRunner`], and tests script
//! their own runner to fake systemctl, mysql and friends.

use std::sync::Mutex;

use tracing::info;

use super::subprocess::{SubprocessBuilder, SubprocessResult};
use crate::error::StackResult;

/// Executes external commands.
pub trait CommandRunner {
    /// Run to completion, capturing output.
    fn run(&self, cmd: &SubprocessBuilder) -> StackResult<SubprocessResult>;

    /// Start in the background without waiting.
    fn spawn(&self, cmd: &SubprocessBuilder) -> StackResult<()>;
}

/// Runs commands for real.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &SubprocessBuilder) -> StackResult<SubprocessResult> {
        cmd.execute()
    }

    fn spawn(&self, cmd: &SubprocessBuilder) -> StackResult<()> {
        cmd.spawn_detached().map(|_| ())
    }
}

/// Logs and records commands instead of executing them.
///
/// Every command reports success with empty output.
#[derive(Debug, Default)]
pub struct DryRunRunner {
    recorded: Mutex<Vec<String>>,
}

impl DryRunRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Command lines recorded so far (sensitive ones redacted).
    pub fn recorded(&self) -> Vec<String> {
        self.recorded
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn record(&self, line: String) {
        info!(command = %line, "dry-run: would execute");
        if let Ok(mut recorded) = self.recorded.lock() {
            recorded.push(line);
        }
    }
}

impl CommandRunner for DryRunRunner {
    fn run(&self, cmd: &SubprocessBuilder) -> StackResult<SubprocessResult> {
        self.record(cmd.describe());
        Ok(SubprocessResult::ok(""))
    }

    fn spawn(&self, cmd: &SubprocessBuilder) -> StackResult<()> {
        self.record(format!("{} &", cmd.describe()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_records_without_executing() {
        let runner = DryRunRunner::new();
        let result = runner
            .run(&SubprocessBuilder::new("systemctl").args(["reload", "apache2"]))
            .unwrap();
        assert!(result.success);
        runner
            .spawn(&SubprocessBuilder::new("mysqld_safe").arg("--skip-grant-tables"))
            .unwrap();
        runner
            .run(&SubprocessBuilder::new("mysql").arg("secret").sensitive())
            .unwrap();

        assert_eq!(
            runner.recorded(),
            vec![
                "systemctl reload apache2".to_string(),
                "mysqld_safe --skip-grant-tables &".to_string(),
                "mysql [REDACTED]".to_string(),
            ]
        );
    }

    #[test]
    fn test_system_runner_executes() {
        let result = SystemRunner
            .run(&SubprocessBuilder::new("echo").arg("ok"))
            .unwrap();
        assert_eq!(result.stdout.trim(), "ok");
    }
}
