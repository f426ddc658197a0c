//! `php-switch`.

use tracing::info;

use crate::error::StackResult;
use crate::validation::validate_php_version_shape;

use super::super::traits::{Command, Flag};
use super::super::types::{CommandParams, CommandResult, ExecutionContext};
use super::{with_engine, BINDING_FLAG};

pub struct PhpSwitchCommand;

impl Command for PhpSwitchCommand {
    fn name(&self) -> &'static str {
        "php-switch"
    }

    fn summary(&self) -> &'static str {
        "Make one installed PHP version the only enabled one"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["version"]
    }

    fn flags(&self) -> &'static [Flag] {
        BINDING_FLAG
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        validate_php_version_shape(&params.get_string("version")?)?;
        params.get_binding().map(|_| ())
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let version = params.get_string("version")?;
        let outcome = with_engine(ctx, params.get_binding()?, |engine| engine.switch(&version))?;
        info!(
            request_id = %ctx.request_id,
            binding = %outcome.binding,
            version = %outcome.version,
            changed = outcome.changed,
            "PHP switch finished"
        );

        let message = if outcome.changed {
            format!("PHP {} is now active ({})", outcome.version, outcome.binding)
        } else {
            format!("PHP {} was already active ({})", outcome.version, outcome.binding)
        };
        Ok(CommandResult::from_serialize(&outcome)?.with_message(message))
    }
}
