//! The `mysql` command-line client and server process checks.

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::error::StackResult;
use crate::executor::{CommandRunner, SubprocessBuilder, SubprocessResult};
use crate::platform::PlatformProfile;

/// Server process names, MySQL and MariaDB spellings.
pub const SERVER_PROCESSES: &[&str] = &["mysqld", "mariadbd"];

/// Wrapper scripts that restart the server when it dies.
const SUPERVISOR_PROCESSES: &[&str] = &["mysqld_safe", "mariadbd-safe"];

/// How a client session authenticates.
#[derive(Debug, Clone, Copy)]
pub enum Auth<'p> {
    /// `root` with a password, passed through `MYSQL_PWD`.
    Password(&'p str),
    /// `root` without a password: socket-peer authentication, or any
    /// login while grant tables are skipped.
    Socket,
    /// A client option file holding a maintenance account.
    DefaultsFile(&'p Path),
}

/// Quote `value` as a single-quoted SQL string literal.
pub fn sql_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\'' => quoted.push_str("''"),
            '\\' => quoted.push_str("\\\\"),
            '\0' => quoted.push_str("\\0"),
            other => quoted.push(other),
        }
    }
    quoted.push('\'');
    quoted
}

/// Statements that set root's password with native-password auth, tried in
/// order: MySQL syntax, MariaDB syntax, legacy syntax.
pub fn password_statements(password: &str) -> [String; 3] {
    let pw = sql_string(password);
    [
        format!(
            "ALTER USER 'root'@'localhost' IDENTIFIED WITH mysql_native_password BY {}; FLUSH PRIVILEGES;",
            pw
        ),
        format!(
            "ALTER USER 'root'@'localhost' IDENTIFIED VIA mysql_native_password USING PASSWORD({}); FLUSH PRIVILEGES;",
            pw
        ),
        format!(
            "SET PASSWORD FOR 'root'@'localhost' = PASSWORD({}); FLUSH PRIVILEGES;",
            pw
        ),
    ]
}

/// Body of the one-shot `--init-file` used by safe mode.
pub fn init_file_script(password: &str) -> String {
    format!(
        "FLUSH PRIVILEGES;\nALTER USER 'root'@'localhost' IDENTIFIED BY {};\nFLUSH PRIVILEGES;\n",
        sql_string(password)
    )
}

/// Runs SQL and checks the server through a [`CommandRunner`].
pub struct MysqlClient<'a> {
    profile: &'a PlatformProfile,
    runner: &'a dyn CommandRunner,
    timeout: Duration,
}

impl<'a> MysqlClient<'a> {
    pub fn new(profile: &'a PlatformProfile, runner: &'a dyn CommandRunner, timeout: Duration) -> Self {
        Self {
            profile,
            runner,
            timeout,
        }
    }

    fn socket(&self) -> String {
        self.profile.socket_path.to_string_lossy().to_string()
    }

    fn session(&self, auth: Auth<'_>, tcp: bool) -> SubprocessBuilder {
        // --defaults-file must come first.
        let mut cmd = SubprocessBuilder::new("mysql").sensitive();
        match auth {
            Auth::DefaultsFile(file) => {
                cmd = cmd.arg(&format!("--defaults-file={}", file.display()));
            }
            Auth::Password(password) => {
                cmd = cmd.args(["-u", "root"]);
                if !password.is_empty() {
                    cmd = cmd.env("MYSQL_PWD", password);
                }
            }
            Auth::Socket => cmd = cmd.args(["-u", "root"]),
        }
        if tcp {
            cmd = cmd.args(["--protocol=TCP", "-h", "127.0.0.1"]);
        } else if !matches!(auth, Auth::DefaultsFile(_)) {
            let socket = self.socket();
            cmd = cmd.args(["--protocol=SOCKET", "-S", socket.as_str()]);
        }
        cmd.args(["-N", "-B"]).timeout(self.timeout)
    }

    /// Run `sql` in a fresh client session.
    pub fn execute(&self, auth: Auth<'_>, sql: &str) -> StackResult<SubprocessResult> {
        let cmd = self.session(auth, false).args(["-e", sql]);
        self.runner.run(&cmd)
    }

    /// `SELECT 1` as root with `password` over the socket.
    pub fn verify(&self, password: &str) -> StackResult<bool> {
        Ok(self.execute(Auth::Password(password), "SELECT 1")?.success)
    }

    /// `SELECT 1` as root with `password` over TCP on localhost.
    pub fn verify_tcp(&self, password: &str) -> StackResult<bool> {
        let cmd = self
            .session(Auth::Password(password), true)
            .args(["-e", "SELECT 1"]);
        Ok(self.runner.run(&cmd)?.success)
    }

    /// Set root's password, trying each dialect until one is accepted.
    pub fn set_root_password(&self, auth: Auth<'_>, password: &str) -> StackResult<bool> {
        for (dialect, sql) in password_statements(password).iter().enumerate() {
            let result = self.execute(auth, sql)?;
            if result.success {
                debug!(dialect, "Root password statement accepted");
                return Ok(true);
            }
            debug!(dialect, stderr = %result.stderr.trim(), "Root password statement rejected");
        }
        Ok(false)
    }

    /// First line of `mysql --version`, or `None` when the client is
    /// missing or fails.
    pub fn client_version(&self) -> Option<String> {
        let cmd = SubprocessBuilder::new("mysql")
            .arg("--version")
            .timeout(self.timeout);
        match self.runner.run(&cmd) {
            Ok(result) if result.success => {
                Some(result.stdout.lines().next().unwrap_or_default().trim().to_string())
            }
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "mysql client not runnable");
                None
            }
        }
    }

    /// `mysqladmin ping` over the socket; true once the server answers.
    pub fn ping(&self) -> StackResult<bool> {
        let socket = self.socket();
        let cmd = SubprocessBuilder::new("mysqladmin")
            .args(["--protocol=SOCKET", "-S", socket.as_str(), "ping"])
            .timeout(self.timeout);
        Ok(self.runner.run(&cmd)?.success)
    }

    /// Whether any server process is alive.
    pub fn server_running(&self) -> StackResult<bool> {
        for name in SERVER_PROCESSES {
            let cmd = SubprocessBuilder::new("pgrep")
                .args(["-x", *name])
                .timeout(self.timeout);
            if self.runner.run(&cmd)?.success {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Signal every server and wrapper process. "No process matched" is fine.
    pub fn signal_server(&self, signal: &str) -> StackResult<()> {
        let flag = format!("-{}", signal);
        for name in SUPERVISOR_PROCESSES.iter().chain(SERVER_PROCESSES) {
            let cmd = SubprocessBuilder::new("pkill")
                .args([flag.as_str(), "-x", *name])
                .timeout(self.timeout);
            let result = self.runner.run(&cmd)?;
            debug!(process = *name, signal, matched = result.success, "Signalled");
        }
        Ok(())
    }

    /// Start `mysqld_safe` in the background with extra server options.
    pub fn start_safe_mode(&self, options: &[String]) -> StackResult<()> {
        let user = format!("--user={}", self.profile.database_user);
        let cmd = SubprocessBuilder::new("mysqld_safe")
            .args(options.iter().map(String::as_str))
            .arg(&user);
        self.runner.spawn(&cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::DryRunRunner;
    use crate::platform::OsFamily;

    #[test]
    fn test_sql_string_escapes_quotes() {
        assert_eq!(sql_string("plain"), "'plain'");
        assert_eq!(sql_string("it's"), "'it''s'");
        assert_eq!(sql_string("a\\b"), "'a\\\\b'");
    }

    #[test]
    fn test_password_statements_order() {
        let [mysql, mariadb, legacy] = password_statements("pw");
        assert!(mysql.contains("IDENTIFIED WITH mysql_native_password BY 'pw'"));
        assert!(mariadb.contains("IDENTIFIED VIA mysql_native_password USING PASSWORD('pw')"));
        assert!(legacy.starts_with("SET PASSWORD"));
    }

    #[test]
    fn test_password_never_in_argv() {
        let profile = PlatformProfile::for_family(OsFamily::Debian);
        let runner = DryRunRunner::new();
        let client = MysqlClient::new(&profile, &runner, Duration::from_secs(5));
        let cmd = client.session(Auth::Password("s3cret"), false);
        assert!(cmd.is_sensitive());
        assert_eq!(cmd.get_env("MYSQL_PWD"), Some("s3cret"));
        assert!(!cmd.get_args().iter().any(|a| a.contains("s3cret")));
        assert!(cmd.get_args().contains(&"/var/run/mysqld/mysqld.sock".to_string()));

        client.verify("s3cret").unwrap();
        assert_eq!(runner.recorded(), vec!["mysql [REDACTED]"]);
    }

    #[test]
    fn test_defaults_file_comes_first() {
        let profile = PlatformProfile::for_family(OsFamily::Debian);
        let runner = DryRunRunner::new();
        let client = MysqlClient::new(&profile, &runner, Duration::from_secs(5));
        let cmd = client.session(Auth::DefaultsFile(Path::new("/etc/mysql/debian.cnf")), false);
        assert_eq!(cmd.get_args()[0], "--defaults-file=/etc/mysql/debian.cnf");
    }
}
