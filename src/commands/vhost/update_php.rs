//! `vhost-update-php`.

use crate::error::StackResult;
use crate::validation::{parse_optional_php_version, validate_vhost_filename};

use super::super::traits::Command;
use super::super::types::{CommandParams, CommandResult, ExecutionContext};
use super::store;

/// Rebind a vhost to another PHP-FPM version; `none` removes the binding.
pub struct VhostUpdatePhpCommand;

impl Command for VhostUpdatePhpCommand {
    fn name(&self) -> &'static str {
        "vhost-update-php"
    }

    fn summary(&self) -> &'static str {
        "Point a virtual host at another PHP-FPM version, or 'none'"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["filename", "version"]
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        validate_vhost_filename(&params.get_string("filename")?)?;
        parse_optional_php_version(&params.get_string("version")?)?;
        Ok(())
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let version = parse_optional_php_version(&params.get_string("version")?)?;
        let details = store(ctx).update_php(&params.get_string("filename")?, version.as_deref())?;
        let message = match &details.entry.php_version {
            Some(v) => format!("{} now uses PHP {}", details.entry.filename, v),
            None => format!("{} no longer uses PHP-FPM", details.entry.filename),
        };
        Ok(CommandResult::from_serialize(&details)?.with_message(message))
    }
}
