//! Schemas, accounts and grants, managed as root through [`MysqlClient`].

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use super::client::{sql_string, Auth, MysqlClient};
use crate::error::{StackError, StackResult};
use crate::executor::{ensure_success, CommandRunner, SubprocessResult};
use crate::platform::PlatformProfile;
use crate::services::{MysqlService, ServiceDefinition};
use crate::validation::{
    is_system_database, validate_database_host, validate_database_name,
    validate_database_username, validate_grant_target, validate_privileges,
};

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseOutcome {
    pub database: String,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserOutcome {
    pub username: String,
    pub host: String,
    pub created: bool,
    /// Database the account was granted everything on, if requested.
    pub database: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrantOutcome {
    pub username: String,
    pub host: String,
    pub database: String,
    pub privileges: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStatus {
    pub installed: bool,
    pub running: bool,
    /// `mysql` or `mariadb`, from the client banner.
    pub flavor: Option<String>,
    pub version: Option<String>,
    pub root_access: bool,
    /// `password` or `socket`: how root was tried.
    pub auth_method: &'static str,
    pub databases_count: Option<usize>,
    pub port: Option<u16>,
}

/// Server version and flavor from a `mysql --version` banner.
///
/// MariaDB clients report their own version after `Ver` and the server
/// version after `Distrib` (older) or `from` (newer).
pub fn parse_client_version(banner: &str) -> (Option<String>, Option<String>) {
    let flavor = if banner.to_ascii_lowercase().contains("mariadb") {
        "mariadb"
    } else {
        "mysql"
    };
    let after = ["Distrib ", " from ", "Ver "]
        .iter()
        .find_map(|marker| banner.split_once(marker).map(|(_, rest)| rest.trim_start()));
    let version = after.map(|rest| {
        rest.chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect::<String>()
            .trim_end_matches('.')
            .to_string()
    });
    (
        Some(flavor.to_string()),
        version.filter(|v| !v.is_empty()),
    )
}

fn account(username: &str, host: &str) -> String {
    format!("{}@{}", sql_string(username), sql_string(host))
}

/// Runs administrative SQL as root, authenticating with the given password
/// or, without one, through the socket.
pub struct DatabaseAdmin<'a> {
    client: MysqlClient<'a>,
    root_password: Option<&'a str>,
}

impl<'a> DatabaseAdmin<'a> {
    pub fn new(
        profile: &'a PlatformProfile,
        runner: &'a dyn CommandRunner,
        timeout: Duration,
        root_password: Option<&'a str>,
    ) -> Self {
        Self {
            client: MysqlClient::new(profile, runner, timeout),
            root_password,
        }
    }

    fn auth(&self) -> Auth<'a> {
        match self.root_password {
            Some(password) => Auth::Password(password),
            None => Auth::Socket,
        }
    }

    /// Rows of `sql`, one trimmed line each.
    fn query(&self, sql: &str) -> StackResult<Vec<String>> {
        let result = self.checked(self.client.execute(self.auth(), sql)?)?;
        Ok(result
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn checked(&self, result: SubprocessResult) -> StackResult<SubprocessResult> {
        if result.success {
            return Ok(result);
        }
        let stderr = result.stderr.as_str();
        if stderr.contains("ERROR 1045") || stderr.contains("ERROR 1698") || stderr.contains("Access denied") {
            return Err(StackError::AuthenticationFailure {
                message: "the server rejected root's credentials".to_string(),
            });
        }
        if stderr.contains("ERROR 2002") || stderr.contains("Can't connect") {
            return Err(StackError::ServiceUnavailable {
                message: "the database server is not accepting connections".to_string(),
            });
        }
        ensure_success(result, "mysql")
    }

    pub fn list_databases(&self) -> StackResult<Vec<String>> {
        self.query("SHOW DATABASES")
    }

    fn database_exists(&self, name: &str) -> StackResult<bool> {
        Ok(self.list_databases()?.iter().any(|db| db == name))
    }

    fn user_exists(&self, username: &str, host: &str) -> StackResult<bool> {
        let rows = self.query(&format!(
            "SELECT COUNT(*) FROM mysql.user WHERE User = {} AND Host = {}",
            sql_string(username),
            sql_string(host)
        ))?;
        Ok(rows.first().map(|n| n != "0").unwrap_or(false))
    }

    /// Create `name` unless it already exists.
    pub fn create_database(&self, name: &str) -> StackResult<DatabaseOutcome> {
        let name = validate_database_name(name)?;
        if self.database_exists(name)? {
            return Ok(DatabaseOutcome {
                database: name.to_string(),
                changed: false,
            });
        }
        self.query(&format!(
            "CREATE DATABASE `{}` CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci",
            name
        ))?;
        info!(database = name, "Database created");
        Ok(DatabaseOutcome {
            database: name.to_string(),
            changed: true,
        })
    }

    /// Drop `name`. System schemas are refused; a missing one is `NotFound`.
    pub fn drop_database(&self, name: &str) -> StackResult<DatabaseOutcome> {
        let name = validate_database_name(name)?;
        if is_system_database(name) {
            return Err(StackError::invalid(
                "database",
                format!("'{}' is a system database", name),
            ));
        }
        if !self.database_exists(name)? {
            return Err(StackError::NotFound {
                what: "Database",
                name: name.to_string(),
            });
        }
        warn!(database = name, "Dropping database");
        self.query(&format!("DROP DATABASE `{}`", name))?;
        Ok(DatabaseOutcome {
            database: name.to_string(),
            changed: true,
        })
    }

    /// Create an account unless it exists, optionally granting it every
    /// privilege on `database`. An existing account keeps its password.
    pub fn create_user(
        &self,
        username: &str,
        password: &str,
        host: &str,
        database: Option<&str>,
    ) -> StackResult<UserOutcome> {
        let username = validate_database_username(username)?;
        let host = validate_database_host(host)?;
        if let Some(db) = database {
            validate_database_name(db)?;
        }

        let created = !self.user_exists(username, host)?;
        if created {
            self.query(&format!(
                "CREATE USER {} IDENTIFIED BY {}",
                account(username, host),
                sql_string(password)
            ))?;
            info!(username, host, "Database user created");
        }
        if let Some(db) = database {
            self.grant(username, host, db, "ALL")?;
        }

        Ok(UserOutcome {
            username: username.to_string(),
            host: host.to_string(),
            created,
            database: database.map(str::to_string),
        })
    }

    /// `GRANT <privileges> ON <database>.* TO <user>@<host>`; `*` means
    /// every database.
    pub fn grant(
        &self,
        username: &str,
        host: &str,
        database: &str,
        privileges: &str,
    ) -> StackResult<GrantOutcome> {
        let username = validate_database_username(username)?;
        let host = validate_database_host(host)?;
        let database = validate_grant_target(database)?;
        let privileges = validate_privileges(privileges)?;

        if !self.user_exists(username, host)? {
            return Err(StackError::NotFound {
                what: "Database user",
                name: format!("{}@{}", username, host),
            });
        }
        let scope = if database == "*" {
            "*.*".to_string()
        } else {
            if !self.database_exists(database)? {
                return Err(StackError::NotFound {
                    what: "Database",
                    name: database.to_string(),
                });
            }
            format!("`{}`.*", database)
        };

        self.query(&format!(
            "GRANT {} ON {} TO {}; FLUSH PRIVILEGES",
            privileges,
            scope,
            account(username, host)
        ))?;
        info!(username, host, database, privileges = %privileges, "Privileges granted");
        Ok(GrantOutcome {
            username: username.to_string(),
            host: host.to_string(),
            database: database.to_string(),
            privileges,
        })
    }

    /// Installation, process and credential facts. Never fails on a
    /// stopped server or rejected credentials; those are reported.
    pub fn status(&self) -> StackResult<DatabaseStatus> {
        let banner = self.client.client_version();
        let (flavor, version) = match &banner {
            Some(banner) => parse_client_version(banner),
            None => (None, None),
        };
        let running = self.client.server_running()?;

        let mut root_access = false;
        let mut databases_count = None;
        if running {
            match self.list_databases() {
                Ok(databases) => {
                    root_access = true;
                    databases_count = Some(databases.len());
                }
                Err(StackError::AuthenticationFailure { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(DatabaseStatus {
            installed: banner.is_some(),
            running,
            flavor,
            version,
            root_access,
            auth_method: if self.root_password.is_some() {
                "password"
            } else {
                "socket"
            },
            databases_count,
            port: MysqlService.default_port(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::SubprocessBuilder;
    use crate::platform::OsFamily;
    use std::cell::RefCell;

    /// Answers `mysql -e` with canned rows and records every statement.
    struct Server {
        databases: RefCell<Vec<String>>,
        users: RefCell<Vec<String>>,
        password: Option<&'static str>,
        statements: RefCell<Vec<String>>,
    }

    impl Server {
        fn new(databases: &[&str], password: Option<&'static str>) -> Self {
            Self {
                databases: RefCell::new(databases.iter().map(|d| d.to_string()).collect()),
                users: RefCell::new(Vec::new()),
                password,
                statements: RefCell::new(Vec::new()),
            }
        }

        fn answer(&self, sql: &str) -> SubprocessResult {
            self.statements.borrow_mut().push(sql.to_string());
            if sql == "SHOW DATABASES" {
                return SubprocessResult::ok(self.databases.borrow().join("\n"));
            }
            if sql.starts_with("SELECT COUNT(*) FROM mysql.user") {
                let found = self.users.borrow().iter().any(|u| sql.contains(u.as_str()));
                return SubprocessResult::ok(if found { "1" } else { "0" });
            }
            if let Some(rest) = sql.strip_prefix("CREATE DATABASE `") {
                let name = rest.split('`').next().unwrap_or_default();
                self.databases.borrow_mut().push(name.to_string());
            }
            if let Some(rest) = sql.strip_prefix("DROP DATABASE `") {
                let name = rest.trim_end_matches('`');
                self.databases.borrow_mut().retain(|d| d != name);
            }
            if let Some(rest) = sql.strip_prefix("CREATE USER ") {
                let user = rest.split(" IDENTIFIED").next().unwrap_or_default();
                let name = user.split('@').next().unwrap_or_default();
                self.users.borrow_mut().push(format!("User = {}", name));
            }
            SubprocessResult::ok("")
        }
    }

    impl CommandRunner for Server {
        fn run(&self, cmd: &SubprocessBuilder) -> StackResult<SubprocessResult> {
            let args = cmd.get_args();
            if args == ["--version"] {
                return Ok(SubprocessResult::ok(
                    "mysql  Ver 15.1 Distrib 10.11.6-MariaDB, for debian-linux-gnu (x86_64)\n",
                ));
            }
            if cmd.program() == "pgrep" {
                return Ok(SubprocessResult::ok("1234"));
            }
            if cmd.get_env("MYSQL_PWD") != self.password {
                return Ok(SubprocessResult::failed(
                    1,
                    "ERROR 1045 (28000): Access denied for user 'root'@'localhost'",
                ));
            }
            let sql = args
                .iter()
                .position(|a| a == "-e")
                .and_then(|i| args.get(i + 1))
                .map(String::as_str)
                .unwrap_or_default();
            Ok(self.answer(sql))
        }

        fn spawn(&self, _cmd: &SubprocessBuilder) -> StackResult<()> {
            Ok(())
        }
    }

    fn admin<'a>(
        profile: &'a PlatformProfile,
        server: &'a Server,
        password: Option<&'a str>,
    ) -> DatabaseAdmin<'a> {
        DatabaseAdmin::new(profile, server, Duration::from_secs(5), password)
    }

    #[test]
    fn test_parse_client_version() {
        assert_eq!(
            parse_client_version("mysql  Ver 8.0.35-0ubuntu0.22.04.1 for Linux on x86_64"),
            (Some("mysql".to_string()), Some("8.0.35".to_string()))
        );
        assert_eq!(
            parse_client_version("mysql from 11.4.2-MariaDB, client 15.2 for Linux (x86_64)"),
            (Some("mariadb".to_string()), Some("11.4.2".to_string()))
        );
        assert_eq!(parse_client_version("garbage").1, None);
    }

    #[test]
    fn test_create_database_is_idempotent() {
        let profile = PlatformProfile::for_family(OsFamily::Debian);
        let server = Server::new(&["information_schema", "mysql"], None);
        let admin = admin(&profile, &server, None);

        assert!(admin.create_database("shop").unwrap().changed);
        assert!(!admin.create_database("shop").unwrap().changed);
        assert_eq!(
            server
                .statements
                .borrow()
                .iter()
                .filter(|s| s.starts_with("CREATE DATABASE"))
                .count(),
            1
        );
        assert!(admin.list_databases().unwrap().contains(&"shop".to_string()));
    }

    #[test]
    fn test_drop_database_guards() {
        let profile = PlatformProfile::for_family(OsFamily::Debian);
        let server = Server::new(&["mysql", "shop"], None);
        let admin = admin(&profile, &server, None);

        assert_eq!(admin.drop_database("mysql").unwrap_err().exit_code(), 2);
        assert!(matches!(
            admin.drop_database("missing").unwrap_err(),
            StackError::NotFound { .. }
        ));
        assert!(admin.drop_database("shop").unwrap().changed);
        assert_eq!(*server.databases.borrow(), vec!["mysql"]);
    }

    #[test]
    fn test_create_user_with_grant() {
        let profile = PlatformProfile::for_family(OsFamily::Debian);
        let server = Server::new(&["shop"], Some("rootpw"));
        let admin = admin(&profile, &server, Some("rootpw"));

        let outcome = admin
            .create_user("shop_app", "it's secret", "localhost", Some("shop"))
            .unwrap();
        assert!(outcome.created);
        let statements = server.statements.borrow().clone();
        assert!(statements
            .iter()
            .any(|s| s == "CREATE USER 'shop_app'@'localhost' IDENTIFIED BY 'it''s secret'"));
        assert!(statements.iter().any(|s| s
            == "GRANT ALL PRIVILEGES ON `shop`.* TO 'shop_app'@'localhost'; FLUSH PRIVILEGES"));

        let again = admin
            .create_user("shop_app", "other", "localhost", None)
            .unwrap();
        assert!(!again.created);
    }

    #[test]
    fn test_grant_requires_user_and_database() {
        let profile = PlatformProfile::for_family(OsFamily::Debian);
        let server = Server::new(&["shop"], None);
        let admin = admin(&profile, &server, None);

        assert!(matches!(
            admin.grant("ghost", "localhost", "shop", "SELECT").unwrap_err(),
            StackError::NotFound { what: "Database user", .. }
        ));
        admin.create_user("reader", "pw", "localhost", None).unwrap();
        assert!(matches!(
            admin.grant("reader", "localhost", "nope", "SELECT").unwrap_err(),
            StackError::NotFound { what: "Database", .. }
        ));
        let grant = admin.grant("reader", "localhost", "*", "select,show view").unwrap();
        assert_eq!(grant.privileges, "SELECT, SHOW VIEW");
        assert!(server
            .statements
            .borrow()
            .iter()
            .any(|s| s.starts_with("GRANT SELECT, SHOW VIEW ON *.* TO 'reader'@'localhost'")));
    }

    #[test]
    fn test_wrong_root_password() {
        let profile = PlatformProfile::for_family(OsFamily::Debian);
        let server = Server::new(&["shop"], Some("rootpw"));

        assert!(matches!(
            admin(&profile, &server, Some("nope")).list_databases().unwrap_err(),
            StackError::AuthenticationFailure { .. }
        ));

        let status = admin(&profile, &server, Some("nope")).status().unwrap();
        assert!(status.installed && status.running);
        assert!(!status.root_access);
        assert_eq!(status.databases_count, None);
        assert_eq!(status.flavor.as_deref(), Some("mariadb"));
        assert_eq!(status.version.as_deref(), Some("10.11.6"));

        let status = admin(&profile, &server, Some("rootpw")).status().unwrap();
        assert!(status.root_access);
        assert_eq!(status.databases_count, Some(1));
        assert_eq!(status.port, Some(3306));
    }
}
