//! Input validation module.
//!
//! Validators for server names, vhost filenames, document roots, PHP
//! versions and extensions, database identifiers, and passwords. Every
//! operation validates its parameters before touching the system.

mod database;
mod domain;
mod password;
mod path;
mod php_extension;
mod php_version;
pub mod whitelist;

pub use database::{
    is_system_database, validate_database_host, validate_database_name,
    validate_database_username, validate_grant_target, validate_privileges, SYSTEM_DATABASES,
};
pub use domain::{validate_server_name, validate_vhost_filename, vhost_filename, VHOST_SUFFIX};
pub use password::validate_password;
pub use path::validate_document_root;
pub use php_extension::validate_php_extension;
pub use php_version::{
    candidate_php_versions, parse_optional_php_version, validate_php_version,
    validate_php_version_shape, KNOWN_PHP_VERSIONS,
};
pub use whitelist::{get_whitelists, init_whitelists};
