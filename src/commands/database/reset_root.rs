//! `mysql-reset-root`.

use tracing::info;

use crate::error::StackResult;
use crate::validation::validate_password;

use super::super::traits::{Command, Flag};
use super::super::types::{CommandParams, CommandResult, ExecutionContext};
use super::engine;

/// Establish a new root password, recovering access if the current one is
/// unknown.
///
/// # Parameters
///
/// - `new_password` (required): the password root should end up with
/// - `current_password` (optional): a password that may still work
pub struct MysqlResetRootCommand;

impl Command for MysqlResetRootCommand {
    fn name(&self) -> &'static str {
        "mysql-reset-root"
    }

    fn summary(&self) -> &'static str {
        "Set the database root password, recovering access if needed"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["new_password"]
    }

    fn flags(&self) -> &'static [Flag] {
        const FLAGS: &[Flag] = &[Flag::value("current-password", "current_password")];
        FLAGS
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        validate_password("new_password", &params.get_string("new_password")?)
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let target = params.get_string("new_password")?;
        let current = params.get_optional_string("current_password");

        let report = engine(ctx).reset_root(&target, current.as_deref())?;
        info!(
            request_id = %ctx.request_id,
            method = ?report.method,
            transitions = report.trace.len(),
            "Root password reset"
        );

        let message = format!(
            "Root password set ({} states visited)",
            report.trace.len()
        );
        Ok(CommandResult::from_serialize(&report)?.with_message(message))
    }
}
