//! Database root credential management and day-to-day administration.

mod admin;
mod client;
mod recovery;

pub use admin::{
    parse_client_version, DatabaseAdmin, DatabaseOutcome, DatabaseStatus, GrantOutcome, UserOutcome,
};
pub use client::{init_file_script, password_statements, sql_string, Auth, MysqlClient};
pub use recovery::{CheckReport, RecoveryEngine, RecoveryMethod, RecoveryReport, RecoveryState};
