//! `service <action> <name>`: systemd control of the managed services.

use serde_json::json;
use tracing::info;

use crate::error::StackResult;
use crate::services::{ServiceAction, ServiceManager, ServiceRegistry};
use crate::validation::validate_php_version;

use super::traits::{Command, Flag};
use super::types::{CommandParams, CommandResult, ExecutionContext};

pub struct ServiceCommand;

impl Command for ServiceCommand {
    fn name(&self) -> &'static str {
        "service"
    }

    fn summary(&self) -> &'static str {
        "Start, stop, restart, reload, enable, disable or inspect a service"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["action", "service"]
    }

    fn flags(&self) -> &'static [Flag] {
        const FLAGS: &[Flag] = &[Flag::value("php-version", "php_version")];
        FLAGS
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        ServiceAction::parse(&params.get_string("action")?)?;
        ServiceRegistry::new().require(&params.get_string("service")?)?;
        if let Some(version) = params.get_optional_string("php_version") {
            validate_php_version(&version)?;
        }
        Ok(())
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let action = ServiceAction::parse(&params.get_string("action")?)?;
        let service = ServiceRegistry::new().require(&params.get_string("service")?)?;
        let version = params.get_optional_string("php_version");
        let unit = service.systemd_unit(&ctx.profile, version.as_deref())?;

        let manager = ServiceManager::new(ctx.runner(), ctx.service_timeout());
        manager.control(action, &unit)?;
        if action != ServiceAction::Status {
            info!(
                request_id = %ctx.request_id,
                service = service.name(),
                unit = %unit,
                action = %action,
                "Service action applied"
            );
        }

        let active = manager.is_active(&unit)?;
        let enabled = manager.is_enabled(&unit)?;
        let message = format!(
            "{} ({}): {}, {}",
            service.display_name(),
            unit,
            if active { "active" } else { "inactive" },
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(CommandResult::success(json!({
            "service": service.name(),
            "unit": unit,
            "action": action.as_str(),
            "active": active,
            "enabled": enabled,
            "port": service.default_port(),
            "config_paths": service.config_paths(&ctx.profile),
        }))
        .with_message(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use crate::platform::OsFamily;

    #[test]
    fn test_validate() {
        let ok = CommandParams::from_value(json!({"action": "restart", "service": "apache"}));
        assert!(ServiceCommand.validate(&ok).is_ok());

        let bad_action = CommandParams::from_value(json!({"action": "bounce", "service": "apache"}));
        assert_eq!(ServiceCommand.validate(&bad_action).unwrap_err().exit_code(), 2);

        let bad_service = CommandParams::from_value(json!({"action": "start", "service": "nginx"}));
        assert_eq!(ServiceCommand.validate(&bad_service).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn test_restart_uses_family_unit() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, runner) = context(OsFamily::Rpm, tmp.path());
        let params = CommandParams::from_value(json!({"action": "restart", "service": "apache"}));
        let result = ServiceCommand.execute(&ctx, params).unwrap();
        assert_eq!(result.data["unit"], "httpd");
        assert_eq!(runner.recorded()[0], "systemctl restart httpd");
    }

    #[test]
    fn test_php_fpm_needs_version() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, _) = context(OsFamily::Debian, tmp.path());
        let params = CommandParams::from_value(json!({"action": "status", "service": "php-fpm"}));
        assert_eq!(ServiceCommand.execute(&ctx, params).unwrap_err().exit_code(), 2);

        let mut params = CommandParams::from_value(json!({"action": "status", "service": "php-fpm"}));
        params.insert("php_version", "8.2");
        let result = ServiceCommand.execute(&ctx, params).unwrap();
        assert_eq!(result.data["unit"], "php8.2-fpm");
    }
}
