//! `php-list`, `php-available` and `php-active`.

use serde_json::json;

use crate::error::StackResult;

use super::super::traits::{Command, Flag};
use super::super::types::{CommandParams, CommandResult, ExecutionContext};
use super::{with_engine, BINDING_FLAG};

pub struct PhpListCommand;

impl Command for PhpListCommand {
    fn name(&self) -> &'static str {
        "php-list"
    }

    fn summary(&self) -> &'static str {
        "List installed PHP versions and which one is enabled"
    }

    fn flags(&self) -> &'static [Flag] {
        BINDING_FLAG
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        params.get_binding().map(|_| ())
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let variants = with_engine(ctx, params.get_binding()?, |engine| engine.list())?;
        CommandResult::from_serialize(&variants)
    }

    fn mutates(&self) -> bool {
        false
    }
}

pub struct PhpAvailableCommand;

impl Command for PhpAvailableCommand {
    fn name(&self) -> &'static str {
        "php-available"
    }

    fn summary(&self) -> &'static str {
        "List PHP versions that can be installed, marking installed ones"
    }

    fn flags(&self) -> &'static [Flag] {
        BINDING_FLAG
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        params.get_binding().map(|_| ())
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let versions = with_engine(ctx, params.get_binding()?, |engine| engine.available())?;
        CommandResult::from_serialize(&versions)
    }

    fn mutates(&self) -> bool {
        false
    }
}

pub struct PhpActiveCommand;

impl Command for PhpActiveCommand {
    fn name(&self) -> &'static str {
        "php-active"
    }

    fn summary(&self) -> &'static str {
        "Show the enabled PHP version"
    }

    fn flags(&self) -> &'static [Flag] {
        BINDING_FLAG
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        params.get_binding().map(|_| ())
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let binding = params.get_binding()?;
        let active = with_engine(ctx, binding, |engine| engine.active())?;
        let version = active.map(|v| v.version);
        let message = match &version {
            Some(v) => format!("PHP {} ({})", v, binding),
            None => format!("no PHP version is enabled ({})", binding),
        };
        Ok(CommandResult::success(json!({
            "binding": binding,
            "version": version,
        }))
        .with_message(message))
    }

    fn mutates(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use crate::platform::{ModuleLayout, OsFamily};
    use std::fs;

    #[test]
    fn test_list_and_active_for_renamed_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, _) = context(OsFamily::Rpm, tmp.path());
        let ModuleLayout::Renamed { dir } = &ctx.profile.php_modules else {
            unreachable!()
        };
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("15-php8.1.conf.disabled"), "").unwrap();
        fs::write(dir.join("15-php8.3.conf"), "").unwrap();

        let listed = PhpListCommand.execute(&ctx, CommandParams::new()).unwrap();
        assert_eq!(listed.data.as_array().unwrap().len(), 2);

        let active = PhpActiveCommand.execute(&ctx, CommandParams::new()).unwrap();
        assert_eq!(active.data["version"], "8.3");
        assert_eq!(active.data["binding"], "apache");

        let available = PhpAvailableCommand.execute(&ctx, CommandParams::new()).unwrap();
        let versions = available.data.as_array().unwrap();
        let installed: Vec<&str> = versions
            .iter()
            .filter(|v| v["installed"] == true)
            .filter_map(|v| v["version"].as_str())
            .collect();
        assert_eq!(installed, vec!["8.1", "8.3"]);
        assert!(versions.iter().any(|v| v["version"] == "7.4" && v["installed"] == false));
    }
}
