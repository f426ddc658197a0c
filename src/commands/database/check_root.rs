//! `mysql-check-root`.

use crate::error::StackResult;
use crate::validation::validate_password;

use super::super::traits::Command;
use super::super::types::{CommandParams, CommandResult, ExecutionContext};
use super::engine;

pub struct MysqlCheckRootCommand;

impl Command for MysqlCheckRootCommand {
    fn name(&self) -> &'static str {
        "mysql-check-root"
    }

    fn summary(&self) -> &'static str {
        "Check a database root password without changing anything"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["password"]
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        validate_password("password", &params.get_string("password")?)
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let report = engine(ctx).check_root(&params.get_string("password")?)?;
        let message = if report.tcp {
            "Root password accepted over the socket and TCP"
        } else {
            "Root password accepted over the socket only"
        };
        Ok(CommandResult::from_serialize(&report)?.with_message(message))
    }

    fn mutates(&self) -> bool {
        false
    }
}
