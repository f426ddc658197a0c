//! `vhost-list`.

use crate::error::StackResult;

use super::super::traits::Command;
use super::super::types::{CommandParams, CommandResult, ExecutionContext};
use super::store;

pub struct VhostListCommand;

impl Command for VhostListCommand {
    fn name(&self) -> &'static str {
        "vhost-list"
    }

    fn summary(&self) -> &'static str {
        "List virtual hosts"
    }

    fn validate(&self, _params: &CommandParams) -> StackResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &ExecutionContext, _params: CommandParams) -> StackResult<CommandResult> {
        CommandResult::from_serialize(&store(ctx).list()?)
    }

    fn mutates(&self) -> bool {
        false
    }
}
