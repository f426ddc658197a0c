//! `platform-info`: the resolved profile.

use crate::error::StackResult;
use crate::platform::lock_paths;

use super::super::traits::Command;
use super::super::types::{CommandParams, CommandResult, ExecutionContext};

pub struct PlatformInfoCommand;

impl Command for PlatformInfoCommand {
    fn name(&self) -> &'static str {
        "platform-info"
    }

    fn summary(&self) -> &'static str {
        "Show the detected distribution family and every path the engine uses"
    }

    fn validate(&self, _params: &CommandParams) -> StackResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &ExecutionContext, _params: CommandParams) -> StackResult<CommandResult> {
        let profile = &ctx.profile;
        let mut data = serde_json::to_value(profile)?;
        data["package_manager_locks"] = serde_json::to_value(lock_paths(profile))?;

        let message = format!(
            "{} {} ({} family, {})",
            profile.distribution, profile.version, profile.family, profile.package_manager
        );
        Ok(CommandResult::success(data).with_message(message))
    }

    fn mutates(&self) -> bool {
        false
    }
}
