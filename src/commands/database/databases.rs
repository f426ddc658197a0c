//! `db-list`, `db-create` and `db-drop`.

use serde_json::json;

use crate::error::{StackError, StackResult};
use crate::validation::{is_system_database, validate_database_name};

use super::super::traits::{Command, Flag};
use super::super::types::{CommandParams, CommandResult, ExecutionContext};
use super::{with_admin, ROOT_PASSWORD_FLAG};

pub struct DbListCommand;

impl Command for DbListCommand {
    fn name(&self) -> &'static str {
        "db-list"
    }

    fn summary(&self) -> &'static str {
        "List databases, without the server's own schemas"
    }

    fn flags(&self) -> &'static [Flag] {
        const FLAGS: &[Flag] = &[
            Flag::value("root-password", "root_password"),
            Flag::switch("all", "all"),
        ];
        FLAGS
    }

    fn validate(&self, _params: &CommandParams) -> StackResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let all = params.get_optional_bool("all", false);
        let databases: Vec<String> = with_admin(ctx, &params, |admin| admin.list_databases())?
            .into_iter()
            .filter(|db| all || !is_system_database(db))
            .collect();
        let message = format!("{} database(s)", databases.len());
        Ok(CommandResult::success(json!(databases)).with_message(message))
    }

    fn mutates(&self) -> bool {
        false
    }
}

pub struct DbCreateCommand;

impl Command for DbCreateCommand {
    fn name(&self) -> &'static str {
        "db-create"
    }

    fn summary(&self) -> &'static str {
        "Create a utf8mb4 database unless it exists"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["database"]
    }

    fn flags(&self) -> &'static [Flag] {
        ROOT_PASSWORD_FLAG
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        validate_database_name(&params.get_string("database")?).map(|_| ())
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let database = params.get_string("database")?;
        let outcome = with_admin(ctx, &params, |admin| admin.create_database(&database))?;
        let message = if outcome.changed {
            format!("Database '{}' created", outcome.database)
        } else {
            format!("Database '{}' already exists", outcome.database)
        };
        Ok(CommandResult::from_serialize(&outcome)?.with_message(message))
    }
}

pub struct DbDropCommand;

impl Command for DbDropCommand {
    fn name(&self) -> &'static str {
        "db-drop"
    }

    fn summary(&self) -> &'static str {
        "Drop a database"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["database"]
    }

    fn flags(&self) -> &'static [Flag] {
        ROOT_PASSWORD_FLAG
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        let database = params.get_string("database")?;
        validate_database_name(&database)?;
        if is_system_database(&database) {
            return Err(StackError::invalid(
                "database",
                format!("'{}' is a system database", database),
            ));
        }
        Ok(())
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let database = params.get_string("database")?;
        let outcome = with_admin(ctx, &params, |admin| admin.drop_database(&database))?;
        let message = format!("Database '{}' dropped", outcome.database);
        Ok(CommandResult::from_serialize(&outcome)?.with_message(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use crate::platform::OsFamily;

    #[test]
    fn test_create_runs_as_root_with_hidden_credentials() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, runner) = context(OsFamily::Debian, tmp.path());
        let params = CommandParams::from_value(json!({
            "database": "shop",
            "root_password": "hunter2",
        }));
        DbCreateCommand.validate(&params).unwrap();
        let result = DbCreateCommand.execute(&ctx, params).unwrap();
        assert_eq!(result.data["changed"], true);

        let recorded = runner.recorded();
        assert_eq!(recorded.len(), 2);
        assert!(recorded.iter().all(|line| line == "mysql [REDACTED]"));
    }

    #[test]
    fn test_validation() {
        let cases: [(&dyn Command, &str); 3] = [
            (&DbCreateCommand, "shop-db"),
            (&DbDropCommand, "mysql"),
            (&DbDropCommand, ""),
        ];
        for (command, database) in cases {
            let params = CommandParams::from_value(json!({ "database": database }));
            assert_eq!(command.validate(&params).unwrap_err().exit_code(), 2, "{}", database);
        }
        assert!(DbListCommand.validate(&CommandParams::new()).is_ok());
    }
}
