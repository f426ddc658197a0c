//! Command registry for dispatching operations to handlers.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{StackError, StackResult, ValidationErrorKind};

use super::database::{
    DbCreateCommand, DbDropCommand, DbGrantCommand, DbListCommand, DbUserCreateCommand,
    MysqlCheckRootCommand, MysqlResetRootCommand, MysqlStatusCommand,
};
use super::php::{
    PhpActiveCommand, PhpAvailableCommand, PhpExtensionInstallCommand, PhpExtensionListCommand,
    PhpExtensionUninstallCommand, PhpInstallCommand, PhpListCommand, PhpSwitchCommand,
    PhpUninstallCommand,
};
use super::platform::PlatformInfoCommand;
use super::service::ServiceCommand;
use super::ssl::{
    SslCreateCertCommand, SslEnableCommand, SslIsEnabledCommand, SslTrustCommand,
    SslUntrustCommand,
};
use super::traits::Command;
use super::types::{CommandParams, CommandResult, ExecutionContext};
use super::vhost::{
    VhostCreateCommand, VhostDeleteCommand, VhostDetailsCommand, VhostDisableCommand,
    VhostEnableCommand, VhostListCommand, VhostUpdatePhpCommand,
};

/// Registry of all available operations, ordered by name.
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Box<dyn Command>>,
}

impl CommandRegistry {
    /// Create a registry with every built-in operation.
    pub fn new() -> Self {
        let mut registry = Self {
            commands: BTreeMap::new(),
        };

        registry.register(Box::new(PlatformInfoCommand));

        // Virtual hosts
        registry.register(Box::new(VhostCreateCommand));
        registry.register(Box::new(VhostListCommand));
        registry.register(Box::new(VhostDetailsCommand));
        registry.register(Box::new(VhostEnableCommand));
        registry.register(Box::new(VhostDisableCommand));
        registry.register(Box::new(VhostDeleteCommand));
        registry.register(Box::new(VhostUpdatePhpCommand));

        // PHP
        registry.register(Box::new(PhpListCommand));
        registry.register(Box::new(PhpActiveCommand));
        registry.register(Box::new(PhpSwitchCommand));
        registry.register(Box::new(PhpInstallCommand));
        registry.register(Box::new(PhpUninstallCommand));
        registry.register(Box::new(PhpAvailableCommand));
        registry.register(Box::new(PhpExtensionListCommand));
        registry.register(Box::new(PhpExtensionInstallCommand));
        registry.register(Box::new(PhpExtensionUninstallCommand));

        // SSL
        registry.register(Box::new(SslCreateCertCommand));
        registry.register(Box::new(SslTrustCommand));
        registry.register(Box::new(SslUntrustCommand));
        registry.register(Box::new(SslIsEnabledCommand));
        registry.register(Box::new(SslEnableCommand));

        // Database
        registry.register(Box::new(MysqlResetRootCommand));
        registry.register(Box::new(MysqlCheckRootCommand));
        registry.register(Box::new(MysqlStatusCommand));
        registry.register(Box::new(DbListCommand));
        registry.register(Box::new(DbCreateCommand));
        registry.register(Box::new(DbDropCommand));
        registry.register(Box::new(DbUserCreateCommand));
        registry.register(Box::new(DbGrantCommand));

        registry.register(Box::new(ServiceCommand));

        registry
    }

    fn register(&mut self, command: Box<dyn Command>) {
        self.commands.insert(command.name(), command);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|c| c.as_ref())
    }

    /// Like [`CommandRegistry::get`], failing with `UnknownOperation`.
    pub fn require(&self, name: &str) -> StackResult<&dyn Command> {
        self.get(name).ok_or_else(|| StackError::InvalidParameters {
            kind: ValidationErrorKind::UnknownOperation {
                name: name.to_string(),
            },
        })
    }

    /// Every registered command, sorted by name.
    pub fn list(&self) -> impl Iterator<Item = &dyn Command> {
        self.commands.values().map(|c| c.as_ref())
    }

    /// Validate and execute one operation.
    pub fn dispatch(
        &self,
        ctx: &ExecutionContext,
        name: &str,
        params: CommandParams,
    ) -> StackResult<CommandResult> {
        let command = self.require(name)?;
        command.validate(&params)?;
        debug!(request_id = %ctx.request_id, operation = name, "Dispatching");
        command.execute(ctx, params)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use crate::platform::OsFamily;
    use serde_json::json;

    #[test]
    fn test_registry_has_commands() {
        let registry = CommandRegistry::new();
        for name in [
            "platform-info",
            "vhost-create",
            "vhost-list",
            "vhost-details",
            "vhost-enable",
            "vhost-disable",
            "vhost-delete",
            "vhost-update-php",
            "php-list",
            "php-active",
            "php-switch",
            "php-install",
            "php-uninstall",
            "php-available",
            "php-extension-list",
            "php-extension-install",
            "php-extension-uninstall",
            "ssl-create-cert",
            "ssl-trust",
            "ssl-untrust",
            "ssl-is-enabled",
            "ssl-enable",
            "mysql-reset-root",
            "mysql-check-root",
            "mysql-status",
            "db-list",
            "db-create",
            "db-drop",
            "db-user-create",
            "db-grant",
            "service",
        ] {
            assert!(registry.get(name).is_some(), "missing {}", name);
        }
        assert_eq!(registry.list().count(), 31);
        assert!(registry.get("nginx-enable").is_none());
    }

    #[test]
    fn test_dispatch_unknown_operation() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, _) = context(OsFamily::Debian, tmp.path());
        let err = CommandRegistry::new()
            .dispatch(&ctx, "vhost-explode", CommandParams::new())
            .unwrap_err();
        assert!(matches!(
            err,
            StackError::InvalidParameters {
                kind: ValidationErrorKind::UnknownOperation { .. }
            }
        ));
    }

    #[test]
    fn test_dispatch_validates_before_executing() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, runner) = context(OsFamily::Debian, tmp.path());
        let params = CommandParams::from_value(json!({"version": "latest"}));
        let err = CommandRegistry::new()
            .dispatch(&ctx, "php-switch", params)
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(runner.recorded().is_empty());
    }

    #[test]
    fn test_read_only_operations_skip_root() {
        let registry = CommandRegistry::new();
        for name in [
            "platform-info",
            "vhost-list",
            "vhost-details",
            "php-list",
            "php-active",
            "ssl-is-enabled",
            "mysql-check-root",
            "mysql-status",
            "db-list",
            "php-available",
            "php-extension-list",
        ] {
            assert!(!registry.require(name).unwrap().requires_root(), "{}", name);
        }
        assert!(registry.require("vhost-create").unwrap().requires_root());
        assert!(registry.require("db-drop").unwrap().requires_root());
    }
}
