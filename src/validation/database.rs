//! Database, account and privilege names.
//!
//! Everything here ends up inside SQL text, so only a narrow alphabet is
//! accepted and identifiers are still backtick-quoted by the caller.

use crate::error::StackError;

const MAX_DATABASE_NAME_LENGTH: usize = 64;
const MAX_DATABASE_USERNAME_LENGTH: usize = 32;

/// Schemas the server itself owns.
pub const SYSTEM_DATABASES: &[&str] = &["information_schema", "mysql", "performance_schema", "sys"];

/// Privileges accepted by `db-grant`, besides `ALL`.
const GRANTABLE: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "ALTER", "INDEX", "REFERENCES",
    "CREATE VIEW", "SHOW VIEW", "TRIGGER", "EVENT", "EXECUTE", "CREATE ROUTINE",
    "ALTER ROUTINE", "LOCK TABLES", "CREATE TEMPORARY TABLES",
];

fn identifier<'a>(param: &str, what: &str, value: &'a str, max: usize) -> Result<&'a str, StackError> {
    let Some(first) = value.chars().next() else {
        return Err(StackError::invalid(param, format!("{} cannot be empty", what)));
    };
    if value.len() > max {
        return Err(StackError::invalid(
            param,
            format!("{} exceeds {} characters", what, max),
        ));
    }
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(StackError::invalid(
            param,
            format!("{} must start with a letter or underscore", what),
        ));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StackError::invalid(
            param,
            format!("{} may only contain letters, digits and underscores", what),
        ));
    }
    Ok(value)
}

/// 1-64 characters of `[A-Za-z0-9_]`, not starting with a digit.
pub fn validate_database_name(name: &str) -> Result<&str, StackError> {
    identifier("database", "Database name", name, MAX_DATABASE_NAME_LENGTH)
}

/// Like [`validate_database_name`], also accepting `*` for "every database".
pub fn validate_grant_target(name: &str) -> Result<&str, StackError> {
    if name == "*" {
        Ok(name)
    } else {
        validate_database_name(name)
    }
}

/// 1-32 characters of `[A-Za-z0-9_]`, not starting with a digit.
pub fn validate_database_username(username: &str) -> Result<&str, StackError> {
    identifier("username", "Database username", username, MAX_DATABASE_USERNAME_LENGTH)
}

/// `localhost`, `%`, or a hostname / IPv4 address.
pub fn validate_database_host(host: &str) -> Result<&str, StackError> {
    let ok = host == "%"
        || (!host.is_empty()
            && host.len() <= 255
            && host
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
            && !host.starts_with('-'));
    if ok {
        Ok(host)
    } else {
        Err(StackError::invalid("host", format!("invalid host '{}'", host)))
    }
}

/// Normalize a comma-separated privilege list to upper case.
///
/// `ALL` stands alone; anything else must be a known privilege.
pub fn validate_privileges(privileges: &str) -> Result<String, StackError> {
    let list: Vec<String> = privileges
        .split(',')
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_uppercase())
        .collect();

    if list.len() == 1 && matches!(list[0].as_str(), "ALL" | "ALL PRIVILEGES") {
        return Ok("ALL PRIVILEGES".to_string());
    }
    for privilege in &list {
        if !GRANTABLE.contains(&privilege.as_str()) {
            return Err(StackError::invalid(
                "privileges",
                format!("unknown privilege '{}'", privilege),
            ));
        }
    }
    Ok(list.join(", "))
}

pub fn is_system_database(name: &str) -> bool {
    SYSTEM_DATABASES.contains(&name.to_ascii_lowercase().as_str())
}
