//! Root credential recovery.
//!
//! A bounded state machine: try credentials that might already work, then
//! the distribution's maintenance account, then restart the server with
//! grant tables skipped. Every wait is a [`Backoff`] with an explicit
//! attempt count and the machine caps its total transitions, so a run
//! always ends in `Done` or `TerminalFailure`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::unistd::{chown, geteuid, User};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::client::{init_file_script, Auth, MysqlClient};
use crate::config::RecoveryConfig;
use crate::error::{StackError, StackResult};
use crate::executor::{Backoff, CommandRunner};
use crate::files::write_private;
use crate::platform::PlatformProfile;
use crate::services::ServiceManager;
use crate::validation::validate_password;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryState {
    Start,
    TryKnownCredentials,
    TryMaintenanceAccount,
    StopService,
    ForceTerminate,
    SafeModeStart,
    SafeModeWait,
    ForceTerminateSafeMode,
    RestartService,
    Verify,
    EnableTcpAuth,
    AltSafeMode,
    Done,
    TerminalFailure,
}

impl fmt::Display for RecoveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Which strategy produced the final credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryMethod {
    AlreadySet,
    KnownCredentials,
    MaintenanceAccount,
    SafeModeInitFile,
    SafeModeSession,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecoveryReport {
    pub method: RecoveryMethod,
    pub tcp_auth: bool,
    pub trace: Vec<RecoveryState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub valid: bool,
    pub tcp: bool,
}

/// The path that led to the current state; decides where a failure goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Direct,
    SafeMode,
    Alt,
}

/// Mutable bookkeeping for one run.
struct Run<'p> {
    target: &'p str,
    current: Option<&'p str>,
    route: Route,
    method: Option<RecoveryMethod>,
    verified: bool,
    tcp_auth: bool,
    init_file: Option<PathBuf>,
    safe_mode_running: bool,
    failure: Option<String>,
    trace: Vec<RecoveryState>,
}

impl<'p> Run<'p> {
    fn new(target: &'p str, current: Option<&'p str>) -> Self {
        Self {
            target,
            current,
            route: Route::Direct,
            method: None,
            verified: false,
            tcp_auth: false,
            init_file: None,
            safe_mode_running: false,
            failure: None,
            trace: Vec::new(),
        }
    }

    fn fail(&mut self, reason: impl Into<String>) -> RecoveryState {
        self.failure = Some(reason.into());
        RecoveryState::TerminalFailure
    }

    fn trace_text(&self) -> String {
        self.trace
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

pub struct RecoveryEngine<'a> {
    profile: &'a PlatformProfile,
    client: MysqlClient<'a>,
    services: ServiceManager<'a>,
    config: RecoveryConfig,
    init_file_dir: PathBuf,
}

impl<'a> RecoveryEngine<'a> {
    pub fn new(
        profile: &'a PlatformProfile,
        runner: &'a dyn CommandRunner,
        config: &RecoveryConfig,
        init_file_dir: &Path,
        command_timeout: Duration,
        service_timeout: Duration,
    ) -> Self {
        Self {
            profile,
            client: MysqlClient::new(profile, runner, command_timeout),
            services: ServiceManager::new(runner, service_timeout),
            config: config.clone(),
            init_file_dir: init_file_dir.to_path_buf(),
        }
    }

    fn unit(&self) -> &str {
        &self.profile.database_unit_name
    }

    /// `mysql-check-root`: one authenticated attempt, no state change.
    pub fn check_root(&self, password: &str) -> StackResult<CheckReport> {
        if !self.client.verify(password)? {
            return Err(StackError::AuthenticationFailure {
                message: "the root password was rejected".to_string(),
            });
        }
        Ok(CheckReport {
            valid: true,
            tcp: self.client.verify_tcp(password)?,
        })
    }

    /// Establish `target` as root's password.
    pub fn reset_root(&self, target: &str, current: Option<&str>) -> StackResult<RecoveryReport> {
        validate_password("new_password", target)?;
        let mut run = Run::new(target, current);
        let mut state = RecoveryState::Start;

        loop {
            let terminal = matches!(state, RecoveryState::Done | RecoveryState::TerminalFailure);
            if !terminal && run.trace.len() as u32 >= self.config.max_transitions {
                warn!(transitions = run.trace.len(), "Recovery transition limit reached");
                state = run.fail(format!(
                    "gave up after {} transitions",
                    self.config.max_transitions
                ));
            }
            run.trace.push(state);
            debug!(state = %state, "Recovery state");

            match state {
                RecoveryState::Done => {
                    let method = run.method.unwrap_or(RecoveryMethod::KnownCredentials);
                    info!(method = ?method, trace = %run.trace_text(), "Root credential established");
                    return Ok(RecoveryReport {
                        method,
                        tcp_auth: run.tcp_auth,
                        trace: run.trace,
                    });
                }
                RecoveryState::TerminalFailure => return Err(self.terminal(&mut run)),
                other => {
                    state = match self.step(other, &mut run) {
                        Ok(next) => next,
                        Err(e) => run.fail(format!("{} failed: {}", other, e)),
                    };
                }
            }
        }
    }

    fn step(&self, state: RecoveryState, run: &mut Run<'_>) -> StackResult<RecoveryState> {
        use RecoveryState::*;

        Ok(match state {
            Start => TryKnownCredentials,

            TryKnownCredentials => {
                if self.client.verify(run.target)? {
                    run.method = Some(RecoveryMethod::AlreadySet);
                    run.verified = true;
                    EnableTcpAuth
                } else if self.try_known(run)? {
                    run.method = Some(RecoveryMethod::KnownCredentials);
                    EnableTcpAuth
                } else {
                    TryMaintenanceAccount
                }
            }

            TryMaintenanceAccount => {
                let applied = match &self.profile.maintenance_credentials {
                    Some(file) if file.exists() => self
                        .client
                        .set_root_password(Auth::DefaultsFile(file), run.target)?,
                    _ => {
                        debug!("No maintenance credential file");
                        false
                    }
                };
                if applied {
                    run.method = Some(RecoveryMethod::MaintenanceAccount);
                    EnableTcpAuth
                } else {
                    StopService
                }
            }

            StopService => {
                run.verified = false;
                if let Err(e) = self.services.stop(self.unit()) {
                    warn!(error = %e, "Stopping the database service failed; terminating directly");
                }
                ForceTerminate
            }

            ForceTerminate => {
                if self.terminate()? {
                    SafeModeStart
                } else {
                    run.fail("database server processes would not terminate")
                }
            }

            SafeModeStart => {
                let init_file = self.write_init_file(run.target)?;
                run.init_file = Some(init_file.clone());
                run.route = Route::SafeMode;
                self.client.start_safe_mode(&[
                    "--skip-grant-tables".to_string(),
                    format!("--init-file={}", init_file.display()),
                ])?;
                run.safe_mode_running = true;
                SafeModeWait
            }

            SafeModeWait => {
                let up = self
                    .backoff(self.config.safe_mode_attempts)
                    .wait_until("safe-mode startup", || self.client.ping())?;
                if !up {
                    warn!("Safe-mode server never answered");
                }
                ForceTerminateSafeMode
            }

            ForceTerminateSafeMode => {
                self.client.signal_server("TERM")?;
                let stopped = self.terminate()?;
                self.remove_init_file(run);
                if !stopped {
                    return Ok(run.fail("safe-mode server would not terminate"));
                }
                run.safe_mode_running = false;
                RestartService
            }

            RestartService => {
                if let Err(e) = self.services.start(self.unit()) {
                    warn!(error = %e, "Database service did not start");
                }
                Verify
            }

            Verify => {
                let ok = self
                    .backoff(self.config.verify_attempts)
                    .wait_until("root login", || self.client.verify(run.target))?;
                if ok {
                    run.verified = true;
                    if run.method.is_none() {
                        run.method = Some(match run.route {
                            Route::Alt => RecoveryMethod::SafeModeSession,
                            _ => RecoveryMethod::SafeModeInitFile,
                        });
                    }
                    if run.tcp_auth {
                        Done
                    } else {
                        EnableTcpAuth
                    }
                } else {
                    match run.route {
                        Route::Direct => StopService,
                        Route::SafeMode => AltSafeMode,
                        Route::Alt => run.fail("the new root password could not be verified"),
                    }
                }
            }

            EnableTcpAuth => {
                if self.enable_tcp_auth(run.target)? {
                    run.tcp_auth = true;
                    if run.verified {
                        Done
                    } else {
                        Verify
                    }
                } else if run.route == Route::Direct {
                    run.method = None;
                    StopService
                } else {
                    run.fail("root could not log in over TCP with the new password")
                }
            }

            AltSafeMode => {
                run.route = Route::Alt;
                if let Err(e) = self.services.stop(self.unit()) {
                    debug!(error = %e, "Database service already stopped");
                }
                if !self.terminate()? {
                    return Ok(run.fail("database server processes would not terminate"));
                }
                self.client.start_safe_mode(&[
                    "--skip-grant-tables".to_string(),
                    "--skip-networking".to_string(),
                ])?;
                run.safe_mode_running = true;

                let up = self
                    .backoff(self.config.safe_mode_attempts)
                    .wait_until("safe-mode startup", || self.client.ping())?;
                if !up {
                    return Ok(run.fail("the safe-mode server did not start"));
                }
                let applied = self
                    .client
                    .execute(Auth::Socket, &init_file_script(run.target))?;
                if !applied.success {
                    warn!(stderr = %applied.stderr.trim(), "Safe-mode session rejected the new password");
                }

                self.client.signal_server("TERM")?;
                if !self.terminate()? {
                    return Ok(run.fail("safe-mode server would not terminate"));
                }
                run.safe_mode_running = false;
                RestartService
            }

            Done | TerminalFailure => state,
        })
    }

    /// Caller-supplied current password first, then passwordless socket login.
    fn try_known(&self, run: &Run<'_>) -> StackResult<bool> {
        if let Some(current) = run.current.filter(|c| *c != run.target) {
            if self.client.set_root_password(Auth::Password(current), run.target)? {
                return Ok(true);
            }
            debug!("Supplied current password did not work");
        }
        self.client.set_root_password(Auth::Socket, run.target)
    }

    /// Re-issue the credential with native-password auth and prove a TCP login.
    fn enable_tcp_auth(&self, target: &str) -> StackResult<bool> {
        if !self
            .client
            .set_root_password(Auth::Password(target), target)?
        {
            return Ok(false);
        }
        self.client.verify_tcp(target)
    }

    fn backoff(&self, attempts: u32) -> Backoff {
        Backoff::from_config(&self.config, attempts)
    }

    /// Bounded wait for exit, then SIGKILL and a second bounded wait.
    fn terminate(&self) -> StackResult<bool> {
        let attempts = self.config.terminate_attempts;
        let gone = |label: &str| {
            self.backoff(attempts)
                .wait_until(label, || Ok(!self.client.server_running()?))
        };

        if gone("server exit")? {
            return Ok(true);
        }
        warn!("Database server still running; sending SIGKILL");
        self.client.signal_server("KILL")?;
        gone("server exit after SIGKILL")
    }

    fn write_init_file(&self, target: &str) -> StackResult<PathBuf> {
        let path = self
            .init_file_dir
            .join(format!(".stackctl-init-{}.sql", Uuid::new_v4().simple()));
        write_private(&path, &init_file_script(target))?;
        self.hand_to_database_user(&path);
        Ok(path)
    }

    /// The server reads the init file as the database user.
    fn hand_to_database_user(&self, path: &Path) {
        if !geteuid().is_root() {
            return;
        }
        match User::from_name(&self.profile.database_user) {
            Ok(Some(user)) => {
                if let Err(errno) = chown(path, Some(user.uid), Some(user.gid)) {
                    warn!(path = %path.display(), error = %errno, "chown of init file failed");
                }
            }
            Ok(None) => debug!(user = %self.profile.database_user, "Database user does not exist"),
            Err(errno) => warn!(error = %errno, "User lookup failed"),
        }
    }

    fn remove_init_file(&self, run: &mut Run<'_>) {
        if let Some(path) = run.init_file.take() {
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    error!(path = %path.display(), error = %e, "Could not delete the init file");
                }
            }
        }
    }

    /// Clean up what a failed run left behind and build the error.
    fn terminal(&self, run: &mut Run<'_>) -> StackError {
        self.remove_init_file(run);
        if run.safe_mode_running {
            let stopped = self
                .client
                .signal_server("TERM")
                .and_then(|_| self.terminate())
                .unwrap_or(false);
            if stopped {
                run.safe_mode_running = false;
            }
        }
        if run.route != Route::Direct && !run.safe_mode_running {
            if let Err(e) = self.services.start(self.unit()) {
                warn!(error = %e, "Could not restart the database service after a failed recovery");
            }
        }

        let reason = format!(
            "{} (states: {})",
            run.failure
                .take()
                .unwrap_or_else(|| "recovery failed".to_string()),
            run.trace_text()
        );
        error!(reason = %reason, "Root credential recovery failed");
        StackError::TerminalRecoveryFailure {
            reason,
            manual_steps: self.manual_steps(),
        }
    }

    fn manual_steps(&self) -> Vec<String> {
        let unit = self.unit();
        vec![
            format!("sudo systemctl stop {}", unit),
            "sudo mysqld_safe --skip-grant-tables --skip-networking &".to_string(),
            "mysql -u root -e \"FLUSH PRIVILEGES; ALTER USER 'root'@'localhost' IDENTIFIED BY '<new password>';\"".to_string(),
            "sudo pkill -x mysqld_safe; sudo pkill -x mysqld; sudo pkill -x mariadbd".to_string(),
            format!("sudo systemctl start {}", unit),
        ]
    }
}
