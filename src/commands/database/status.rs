//! `mysql-status`.

use crate::error::StackResult;

use super::super::traits::{Command, Flag};
use super::super::types::{CommandParams, CommandResult, ExecutionContext};
use super::{with_admin, ROOT_PASSWORD_FLAG};

pub struct MysqlStatusCommand;

impl Command for MysqlStatusCommand {
    fn name(&self) -> &'static str {
        "mysql-status"
    }

    fn summary(&self) -> &'static str {
        "Report the database server's version, state and root access"
    }

    fn flags(&self) -> &'static [Flag] {
        ROOT_PASSWORD_FLAG
    }

    fn validate(&self, _params: &CommandParams) -> StackResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let status = with_admin(ctx, &params, |admin| admin.status())?;
        let message = match (&status.flavor, &status.version, status.running) {
            (_, _, _) if !status.installed => "database server is not installed".to_string(),
            (Some(flavor), Some(version), true) => format!("{} {} running", flavor, version),
            (Some(flavor), _, true) => format!("{} running", flavor),
            _ => "database server is stopped".to_string(),
        };
        Ok(CommandResult::from_serialize(&status)?.with_message(message))
    }

    fn mutates(&self) -> bool {
        false
    }
}
