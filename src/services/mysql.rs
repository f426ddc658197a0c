//! MySQL / MariaDB service definition.

use std::path::PathBuf;

use super::traits::ServiceDefinition;
use crate::error::StackResult;
use crate::platform::{OsFamily, PlatformProfile};

/// MySQL database service.
///
/// This covers both MySQL and MariaDB installations.
pub struct MysqlService;

impl ServiceDefinition for MysqlService {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn display_name(&self) -> &'static str {
        "MySQL"
    }

    fn systemd_unit(&self, profile: &PlatformProfile, _version: Option<&str>) -> StackResult<String> {
        Ok(profile.database_unit_name.clone())
    }

    fn config_paths(&self, profile: &PlatformProfile) -> Vec<PathBuf> {
        let files: &[&str] = match profile.family {
            OsFamily::Debian => &[
                "/etc/mysql/my.cnf",
                "/etc/mysql/mysql.conf.d/mysqld.cnf",
                "/etc/mysql/mariadb.conf.d/50-server.cnf",
            ],
            OsFamily::Rpm => &["/etc/my.cnf", "/etc/my.cnf.d/mysql-server.cnf"],
            OsFamily::Arch => &["/etc/my.cnf", "/etc/my.cnf.d/server.cnf"],
        };
        files.iter().map(|f| profile.host_path(f)).collect()
    }

    fn default_port(&self) -> Option<u16> {
        Some(3306)
    }
}
