//! `ssl-is-enabled` and `ssl-enable`.

use crate::error::StackResult;
use crate::vhost::SslModule;

use super::super::traits::Command;
use super::super::types::{CommandParams, CommandResult, ExecutionContext};

fn module(ctx: &ExecutionContext) -> SslModule<'_> {
    SslModule::new(
        &ctx.profile,
        ctx.runner(),
        ctx.service_timeout(),
        ctx.package_timeout(),
    )
}

pub struct SslIsEnabledCommand;

impl Command for SslIsEnabledCommand {
    fn name(&self) -> &'static str {
        "ssl-is-enabled"
    }

    fn summary(&self) -> &'static str {
        "Report whether the web server's SSL module is enabled"
    }

    fn validate(&self, _params: &CommandParams) -> StackResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &ExecutionContext, _params: CommandParams) -> StackResult<CommandResult> {
        let enabled = module(ctx).is_enabled()?;
        let message = if enabled {
            "SSL module is enabled"
        } else {
            "SSL module is disabled"
        };
        Ok(CommandResult::success(serde_json::json!({ "enabled": enabled })).with_message(message))
    }

    fn mutates(&self) -> bool {
        false
    }
}

pub struct SslEnableCommand;

impl Command for SslEnableCommand {
    fn name(&self) -> &'static str {
        "ssl-enable"
    }

    fn summary(&self) -> &'static str {
        "Enable the web server's SSL module and restart it"
    }

    fn validate(&self, _params: &CommandParams) -> StackResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &ExecutionContext, _params: CommandParams) -> StackResult<CommandResult> {
        let state = module(ctx).enable()?;
        let message = if state.changed {
            "SSL module enabled"
        } else {
            "SSL module was already enabled"
        };
        Ok(CommandResult::from_serialize(&state)?.with_message(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use crate::platform::OsFamily;
    use std::fs;

    #[test]
    fn test_is_enabled_follows_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, _) = context(OsFamily::Debian, tmp.path());
        let result = SslIsEnabledCommand.execute(&ctx, CommandParams::new()).unwrap();
        assert_eq!(result.data["enabled"], false);

        let marker = &ctx.profile.ssl_module_marker;
        fs::create_dir_all(marker.parent().unwrap()).unwrap();
        fs::write(marker, "").unwrap();
        let result = SslIsEnabledCommand.execute(&ctx, CommandParams::new()).unwrap();
        assert_eq!(result.data["enabled"], true);
    }

    #[test]
    fn test_enable_is_noop_when_enabled() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, runner) = context(OsFamily::Rpm, tmp.path());
        let marker = &ctx.profile.ssl_module_marker;
        fs::create_dir_all(marker.parent().unwrap()).unwrap();
        fs::write(marker, "").unwrap();

        let result = SslEnableCommand.execute(&ctx, CommandParams::new()).unwrap();
        assert_eq!(result.data["changed"], false);
        assert!(runner.recorded().is_empty());
    }
}
