//! systemctl primitives.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{StackError, StackResult, ValidationErrorKind};
use crate::executor::{ensure_success, CommandRunner, SubprocessBuilder};

/// Lifecycle actions accepted by the `service` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
    Reload,
    Enable,
    Disable,
    Status,
}

impl ServiceAction {
    pub fn parse(value: &str) -> Result<Self, StackError> {
        match value {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "restart" => Ok(Self::Restart),
            "reload" => Ok(Self::Reload),
            "enable" => Ok(Self::Enable),
            "disable" => Ok(Self::Disable),
            "status" => Ok(Self::Status),
            other => Err(StackError::InvalidParameters {
                kind: ValidationErrorKind::InvalidParameter {
                    param: "action".to_string(),
                    message: format!(
                        "'{}' is not one of start, stop, restart, reload, enable, disable, status",
                        other
                    ),
                },
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Reload => "reload",
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drives systemd units through a [`CommandRunner`].
pub struct ServiceManager<'a> {
    runner: &'a dyn CommandRunner,
    timeout: Duration,
}

impl<'a> ServiceManager<'a> {
    pub fn new(runner: &'a dyn CommandRunner, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    fn systemctl(&self, args: &[&str]) -> SubprocessBuilder {
        SubprocessBuilder::new("systemctl")
            .args(args.iter().copied())
            .timeout(self.timeout)
    }

    /// Run a state-changing action; a nonzero exit is an error.
    pub fn control(&self, action: ServiceAction, unit: &str) -> StackResult<()> {
        let args: Vec<&str> = match action {
            ServiceAction::Enable => vec!["enable", "--now", unit],
            ServiceAction::Disable => vec!["disable", "--now", unit],
            ServiceAction::Status => return Ok(()),
            other => vec![other.as_str(), unit],
        };

        debug!(unit, action = %action, "Running systemctl");
        let result = self.runner.run(&self.systemctl(&args))?;
        if !result.success {
            warn!(unit, action = %action, stderr = %result.stderr.trim(), "systemctl failed");
        }
        ensure_success(result, &format!("systemctl {} {}", action, unit))?;
        info!(unit, action = %action, "Service action completed");
        Ok(())
    }

    pub fn start(&self, unit: &str) -> StackResult<()> {
        self.control(ServiceAction::Start, unit)
    }

    pub fn stop(&self, unit: &str) -> StackResult<()> {
        self.control(ServiceAction::Stop, unit)
    }

    pub fn restart(&self, unit: &str) -> StackResult<()> {
        self.control(ServiceAction::Restart, unit)
    }

    pub fn reload(&self, unit: &str) -> StackResult<()> {
        self.control(ServiceAction::Reload, unit)
    }

    /// `systemctl is-active`; any failure counts as inactive.
    pub fn is_active(&self, unit: &str) -> StackResult<bool> {
        let result = self.runner.run(&self.systemctl(&["is-active", unit]))?;
        Ok(result.success && result.stdout.trim() == "active")
    }

    /// `systemctl is-enabled`; only "enabled" counts.
    pub fn is_enabled(&self, unit: &str) -> StackResult<bool> {
        let result = self.runner.run(&self.systemctl(&["is-enabled", unit]))?;
        Ok(result.success && result.stdout.trim() == "enabled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{DryRunRunner, SubprocessResult};
    use std::cell::RefCell;

    struct Scripted {
        calls: RefCell<Vec<String>>,
        reply: SubprocessResult,
    }

    impl CommandRunner for Scripted {
        fn run(&self, cmd: &SubprocessBuilder) -> StackResult<SubprocessResult> {
            self.calls.borrow_mut().push(cmd.describe());
            Ok(self.reply.clone())
        }

        fn spawn(&self, _cmd: &SubprocessBuilder) -> StackResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_action_parse() {
        assert_eq!(ServiceAction::parse("reload").unwrap(), ServiceAction::Reload);
        assert_eq!(ServiceAction::parse("explode").unwrap_err().exit_code(), 2);
    }

    #[test]
    fn test_enable_uses_now() {
        let runner = DryRunRunner::new();
        let manager = ServiceManager::new(&runner, Duration::from_secs(5));
        manager.control(ServiceAction::Enable, "php8.2-fpm").unwrap();
        assert_eq!(runner.recorded(), vec!["systemctl enable --now php8.2-fpm"]);
    }

    #[test]
    fn test_failed_reload_is_error() {
        let runner = Scripted {
            calls: RefCell::new(Vec::new()),
            reply: SubprocessResult::failed(1, "Job for httpd.service failed"),
        };
        let manager = ServiceManager::new(&runner, Duration::from_secs(5));
        assert!(manager.reload("httpd").is_err());
        assert_eq!(runner.calls.borrow().as_slice(), ["systemctl reload httpd"]);
    }

    #[test]
    fn test_is_enabled_reads_stdout() {
        let runner = Scripted {
            calls: RefCell::new(Vec::new()),
            reply: SubprocessResult::ok("enabled\n"),
        };
        let manager = ServiceManager::new(&runner, Duration::from_secs(5));
        assert!(manager.is_enabled("php8.2-fpm").unwrap());
    }
}
