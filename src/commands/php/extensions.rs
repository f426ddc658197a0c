//! `php-extension-list`, `php-extension-install` and `php-extension-uninstall`.
//!
//! Each acts on `--php-version`, or on the binding's enabled version.

use crate::error::StackResult;
use crate::php::ExtensionOutcome;
use crate::validation::{validate_php_extension, validate_php_version_shape};

use super::super::traits::{Command, Flag};
use super::super::types::{CommandParams, CommandResult, ExecutionContext};
use super::with_engine;

const FLAGS: &[Flag] = &[
    Flag::value("php-version", "version"),
    Flag::value("binding", "binding"),
];

fn validate_target(params: &CommandParams) -> StackResult<()> {
    if let Some(version) = params.get_optional_string("version") {
        validate_php_version_shape(&version)?;
    }
    params.get_binding().map(|_| ())
}

fn summarize(outcome: &ExtensionOutcome, verb: &str) -> StackResult<CommandResult> {
    let mut message = format!(
        "{} {} for PHP {} ({})",
        outcome.extension, verb, outcome.version, outcome.package
    );
    if let Some(unit) = &outcome.restarted_unit {
        message.push_str(&format!("; restarted {}", unit));
    }
    Ok(CommandResult::from_serialize(outcome)?.with_message(message))
}

pub struct PhpExtensionListCommand;

impl Command for PhpExtensionListCommand {
    fn name(&self) -> &'static str {
        "php-extension-list"
    }

    fn summary(&self) -> &'static str {
        "List the extensions loaded by a PHP version"
    }

    fn flags(&self) -> &'static [Flag] {
        FLAGS
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        validate_target(params)
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let version = params.get_optional_string("version");
        let list = with_engine(ctx, params.get_binding()?, |engine| {
            engine.extensions(version.as_deref())
        })?;
        let message = format!("PHP {}: {}", list.version, list.extensions.join(", "));
        Ok(CommandResult::from_serialize(&list)?.with_message(message))
    }

    fn mutates(&self) -> bool {
        false
    }
}

pub struct PhpExtensionInstallCommand;

impl Command for PhpExtensionInstallCommand {
    fn name(&self) -> &'static str {
        "php-extension-install"
    }

    fn summary(&self) -> &'static str {
        "Install a PHP extension package"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["extension"]
    }

    fn flags(&self) -> &'static [Flag] {
        FLAGS
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        validate_php_extension(&params.get_string("extension")?)?;
        validate_target(params)
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let extension = params.get_string("extension")?;
        let version = params.get_optional_string("version");
        let outcome = with_engine(ctx, params.get_binding()?, |engine| {
            engine.install_extension(version.as_deref(), &extension)
        })?;
        summarize(&outcome, "installed")
    }
}

pub struct PhpExtensionUninstallCommand;

impl Command for PhpExtensionUninstallCommand {
    fn name(&self) -> &'static str {
        "php-extension-uninstall"
    }

    fn summary(&self) -> &'static str {
        "Remove a PHP extension package"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["extension"]
    }

    fn flags(&self) -> &'static [Flag] {
        FLAGS
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        validate_php_extension(&params.get_string("extension")?)?;
        validate_target(params)
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let extension = params.get_string("extension")?;
        let version = params.get_optional_string("version");
        let outcome = with_engine(ctx, params.get_binding()?, |engine| {
            engine.uninstall_extension(version.as_deref(), &extension)
        })?;
        summarize(&outcome, "removed")
    }
}
