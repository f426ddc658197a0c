//! `db-user-create` and `db-grant`.

use crate::error::StackResult;
use crate::validation::{
    validate_database_host, validate_database_name, validate_database_username,
    validate_grant_target, validate_password, validate_privileges,
};

use super::super::traits::{Command, Flag};
use super::super::types::{CommandParams, CommandResult, ExecutionContext};
use super::with_admin;

const DEFAULT_HOST: &str = "localhost";

fn host(params: &CommandParams) -> String {
    params
        .get_optional_string("host")
        .unwrap_or_else(|| DEFAULT_HOST.to_string())
}

/// Create an account, optionally owning one database.
///
/// # Parameters
///
/// - `username`, `password` (required)
/// - `host` (optional): defaults to `localhost`
/// - `database` (optional): granted `ALL PRIVILEGES` on it
pub struct DbUserCreateCommand;

impl Command for DbUserCreateCommand {
    fn name(&self) -> &'static str {
        "db-user-create"
    }

    fn summary(&self) -> &'static str {
        "Create a database user, optionally with full rights on one database"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["username", "password"]
    }

    fn flags(&self) -> &'static [Flag] {
        const FLAGS: &[Flag] = &[
            Flag::value("host", "host"),
            Flag::value("database", "database"),
            Flag::value("root-password", "root_password"),
        ];
        FLAGS
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        validate_database_username(&params.get_string("username")?)?;
        validate_password("password", &params.get_string("password")?)?;
        validate_database_host(&host(params))?;
        if let Some(database) = params.get_optional_string("database") {
            validate_database_name(&database)?;
        }
        Ok(())
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let username = params.get_string("username")?;
        let password = params.get_string("password")?;
        let host = host(&params);
        let database = params.get_optional_string("database");

        let outcome = with_admin(ctx, &params, |admin| {
            admin.create_user(&username, &password, &host, database.as_deref())
        })?;
        let mut message = if outcome.created {
            format!("User '{}'@'{}' created", outcome.username, outcome.host)
        } else {
            format!("User '{}'@'{}' already exists", outcome.username, outcome.host)
        };
        if let Some(db) = &outcome.database {
            message.push_str(&format!(" with all privileges on '{}'", db));
        }
        Ok(CommandResult::from_serialize(&outcome)?.with_message(message))
    }
}

pub struct DbGrantCommand;

impl Command for DbGrantCommand {
    fn name(&self) -> &'static str {
        "db-grant"
    }

    fn summary(&self) -> &'static str {
        "Grant privileges on a database (or * for all) to a user"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["username", "database"]
    }

    fn flags(&self) -> &'static [Flag] {
        const FLAGS: &[Flag] = &[
            Flag::value("host", "host"),
            Flag::value("privileges", "privileges"),
            Flag::value("root-password", "root_password"),
        ];
        FLAGS
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        validate_database_username(&params.get_string("username")?)?;
        validate_grant_target(&params.get_string("database")?)?;
        validate_database_host(&host(params))?;
        if let Some(privileges) = params.get_optional_string("privileges") {
            validate_privileges(&privileges)?;
        }
        Ok(())
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let username = params.get_string("username")?;
        let database = params.get_string("database")?;
        let host = host(&params);
        let privileges = params
            .get_optional_string("privileges")
            .unwrap_or_else(|| "ALL".to_string());

        let outcome = with_admin(ctx, &params, |admin| {
            admin.grant(&username, &host, &database, &privileges)
        })?;
        let message = format!(
            "Granted {} on {} to '{}'@'{}'",
            outcome.privileges, outcome.database, outcome.username, outcome.host
        );
        Ok(CommandResult::from_serialize(&outcome)?.with_message(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_create_validation() {
        let ok = CommandParams::from_value(json!({
            "username": "shop_app",
            "password": "pw",
            "database": "shop",
        }));
        assert!(DbUserCreateCommand.validate(&ok).is_ok());

        for bad in [
            json!({"username": "shop-app", "password": "pw"}),
            json!({"username": "shop_app", "password": ""}),
            json!({"username": "shop_app", "password": "pw", "host": "a'b"}),
            json!({"username": "shop_app", "password": "pw", "database": "x;y"}),
        ] {
            let params = CommandParams::from_value(bad.clone());
            assert_eq!(DbUserCreateCommand.validate(&params).unwrap_err().exit_code(), 2, "{}", bad);
        }
    }

    #[test]
    fn test_grant_validation() {
        let all = CommandParams::from_value(json!({"username": "reader", "database": "*"}));
        assert!(DbGrantCommand.validate(&all).is_ok());
        let bad = CommandParams::from_value(json!({
            "username": "reader",
            "database": "shop",
            "privileges": "SUPER",
        }));
        assert_eq!(DbGrantCommand.validate(&bad).unwrap_err().exit_code(), 2);
    }
}
