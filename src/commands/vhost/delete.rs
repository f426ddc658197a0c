//! `vhost-delete`.

use tracing::info;

use crate::error::StackResult;
use crate::validation::validate_vhost_filename;

use super::super::traits::Command;
use super::super::types::{CommandParams, CommandResult, ExecutionContext};
use super::store;

/// Remove a vhost's configuration and the host entry created for it. The
/// document root is left alone.
pub struct VhostDeleteCommand;

impl Command for VhostDeleteCommand {
    fn name(&self) -> &'static str {
        "vhost-delete"
    }

    fn summary(&self) -> &'static str {
        "Delete a virtual host (document root is kept)"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["filename"]
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        validate_vhost_filename(&params.get_string("filename")?).map(|_| ())
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let outcome = store(ctx).delete(&params.get_string("filename")?)?;
        info!(request_id = %ctx.request_id, filename = %outcome.filename, "Virtual host deleted");
        let message = format!("{} deleted", outcome.filename);
        Ok(CommandResult::from_serialize(&outcome)?.with_message(message))
    }
}
