//! `vhost-enable` and `vhost-disable`.

use tracing::info;

use crate::error::StackResult;
use crate::validation::validate_vhost_filename;
use crate::vhost::{ToggleOutcome, ToggleStatus};

use super::super::traits::Command;
use super::super::types::{CommandParams, CommandResult, ExecutionContext};
use super::store;

fn summarize(ctx: &ExecutionContext, outcome: &ToggleOutcome) -> StackResult<CommandResult> {
    info!(
        request_id = %ctx.request_id,
        filename = %outcome.filename,
        status = ?outcome.status,
        "Virtual host toggled"
    );
    let message = match outcome.status {
        ToggleStatus::Enabled => format!("{} enabled", outcome.filename),
        ToggleStatus::Disabled => format!("{} disabled", outcome.filename),
        ToggleStatus::AlreadyEnabled => format!("{} is already enabled", outcome.filename),
        ToggleStatus::AlreadyDisabled => format!("{} is already disabled", outcome.filename),
        ToggleStatus::AlreadyActive => format!(
            "{} is always active on this platform (no enabled-sites directory)",
            outcome.filename
        ),
        ToggleStatus::NotSupported => format!(
            "disabling {} is not supported on this platform (no enabled-sites directory)",
            outcome.filename
        ),
    };
    Ok(CommandResult::from_serialize(outcome)?.with_message(message))
}

pub struct VhostEnableCommand;

impl Command for VhostEnableCommand {
    fn name(&self) -> &'static str {
        "vhost-enable"
    }

    fn summary(&self) -> &'static str {
        "Enable a virtual host"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["filename"]
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        validate_vhost_filename(&params.get_string("filename")?).map(|_| ())
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let outcome = store(ctx).enable(&params.get_string("filename")?)?;
        summarize(ctx, &outcome)
    }
}

pub struct VhostDisableCommand;

impl Command for VhostDisableCommand {
    fn name(&self) -> &'static str {
        "vhost-disable"
    }

    fn summary(&self) -> &'static str {
        "Disable a virtual host"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["filename"]
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        validate_vhost_filename(&params.get_string("filename")?).map(|_| ())
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let outcome = store(ctx).disable(&params.get_string("filename")?)?;
        summarize(ctx, &outcome)
    }
}
