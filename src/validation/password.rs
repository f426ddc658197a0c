//! Database password validation.

use crate::error::StackError;

/// Longest password accepted for the database root account.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Validates a new root password.
///
/// Passwords travel through `MYSQL_PWD` and into SQL string literals, so NUL
/// and other control characters are rejected; quotes are escaped later.
pub fn validate_password(param: &str, password: &str) -> Result<(), StackError> {
    if password.is_empty() {
        return Err(StackError::invalid(param, "password cannot be empty"));
    }

    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(StackError::invalid(
            param,
            format!("password exceeds {} characters", MAX_PASSWORD_LENGTH),
        ));
    }

    if password.chars().any(char::is_control) {
        return Err(StackError::invalid(
            param,
            "password cannot contain control characters",
        ));
    }

    Ok(())
}
