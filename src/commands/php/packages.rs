//! `php-install` and `php-uninstall`.

use crate::error::StackResult;
use crate::php::{PackageOutcome, SwitchWarning};
use crate::validation::{validate_php_version, validate_php_version_shape};

use super::super::traits::{Command, Flag};
use super::super::types::{CommandParams, CommandResult, ExecutionContext};
use super::{with_engine, BINDING_FLAG};

/// Installing needs a version whose package names are known; removing only
/// needs one that is installed.
fn validate(params: &CommandParams, known_only: bool) -> StackResult<()> {
    let version = params.get_string("version")?;
    if known_only {
        validate_php_version(&version)?;
    } else {
        validate_php_version_shape(&version)?;
    }
    params.get_binding().map(|_| ())
}

fn summarize(outcome: &PackageOutcome, verb: &str) -> StackResult<CommandResult> {
    let mut message = format!(
        "PHP {} {} ({}: {})",
        outcome.version,
        verb,
        outcome.binding,
        outcome.packages.join(" ")
    );
    if outcome.warnings.contains(&SwitchWarning::NoActiveVariant) {
        message.push_str("\nwarning: no PHP version is enabled now; run php-switch");
    }
    Ok(CommandResult::from_serialize(outcome)?.with_message(message))
}

pub struct PhpInstallCommand;

impl Command for PhpInstallCommand {
    fn name(&self) -> &'static str {
        "php-install"
    }

    fn summary(&self) -> &'static str {
        "Install a PHP version through the package manager"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["version"]
    }

    fn flags(&self) -> &'static [Flag] {
        BINDING_FLAG
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        validate(params, true)
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let version = params.get_string("version")?;
        let outcome = with_engine(ctx, params.get_binding()?, |engine| engine.install(&version))?;
        summarize(&outcome, "installed")
    }
}

pub struct PhpUninstallCommand;

impl Command for PhpUninstallCommand {
    fn name(&self) -> &'static str {
        "php-uninstall"
    }

    fn summary(&self) -> &'static str {
        "Remove a PHP version through the package manager"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["version"]
    }

    fn flags(&self) -> &'static [Flag] {
        BINDING_FLAG
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        validate(params, false)
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let version = params.get_string("version")?;
        let outcome = with_engine(ctx, params.get_binding()?, |engine| engine.uninstall(&version))?;
        summarize(&outcome, "removed")
    }
}
