//! `vhost-details`.

use crate::error::StackResult;
use crate::validation::validate_vhost_filename;

use super::super::traits::Command;
use super::super::types::{CommandParams, CommandResult, ExecutionContext};
use super::store;

pub struct VhostDetailsCommand;

impl Command for VhostDetailsCommand {
    fn name(&self) -> &'static str {
        "vhost-details"
    }

    fn summary(&self) -> &'static str {
        "Show every attribute of one virtual host"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["filename"]
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        validate_vhost_filename(&params.get_string("filename")?).map(|_| ())
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let details = store(ctx).details(&params.get_string("filename")?)?;
        CommandResult::from_serialize(&details)
    }

    fn mutates(&self) -> bool {
        false
    }
}
