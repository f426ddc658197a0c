//! Safe subprocess execution.
//!
//! Commands are exec'd directly (no shell), with captured output, a
//! poll-and-kill timeout, and argument redaction for secrets.

use std::collections::BTreeMap;
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{CommandErrorKind, StackError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exit status and captured output of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubprocessResult {
    pub success: bool,
    /// `None` when the process died from a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl SubprocessResult {
    fn from_output(output: Output) -> Self {
        let text = |bytes: &[u8]| String::from_utf8_lossy(bytes).into_owned();
        Self {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: text(&output.stdout),
            stderr: text(&output.stderr),
        }
    }

    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// One external program invocation: argv, extra environment and deadline.
#[derive(Debug, Clone)]
pub struct SubprocessBuilder {
    program: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    timeout: Duration,
    sensitive: bool,
}

impl SubprocessBuilder {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_owned(),
            args: Vec::new(),
            env: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
            sensitive: false,
        }
    }

    /// Keep the argument list out of logs and [`describe`](Self::describe).
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_owned());
        }
        self
    }

    pub fn arg(self, arg: &str) -> Self {
        self.args([arg])
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    /// Command line as shown to humans and recorded by dry runs.
    pub fn describe(&self) -> String {
        match (self.sensitive, self.args.is_empty()) {
            (true, _) => format!("{} [REDACTED]", self.program),
            (false, true) => self.program.clone(),
            (false, false) => format!("{} {}", self.program, self.args.join(" ")),
        }
    }

    fn trace_start(&self, message: &'static str) {
        let args = if self.sensitive {
            "[REDACTED]".to_owned()
        } else {
            format!("{:?}", self.args)
        };
        debug!(
            program = %self.program,
            args = %args,
            timeout_ms = self.timeout.as_millis() as u64,
            "{}", message
        );
    }

    fn command(&self, output: fn() -> Stdio) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(output())
            .stderr(output());
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> StackError {
        StackError::execution(format!("cannot start {}: {}", self.program, e))
    }

    /// Run to completion. A process still alive at the deadline is killed
    /// and reported as a timeout.
    pub fn execute(&self) -> Result<SubprocessResult, StackError> {
        self.trace_start("Running subprocess");
        let started = Instant::now();
        let mut child = self
            .command(Stdio::piped)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if !self.wait_with_deadline(&mut child, started)? {
            warn!(program = %self.program, "Subprocess exceeded its deadline; killing it");
            if let Err(e) = child.kill() {
                warn!(error = %e, "Kill failed");
            }
            let _ = child.wait();
            return Err(StackError::Command {
                kind: CommandErrorKind::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                },
            });
        }

        let output = child
            .wait_with_output()
            .map_err(|e| StackError::execution(format!("reading output of {}: {}", self.program, e)))?;
        let result = SubprocessResult::from_output(output);
        debug!(
            exit_code = ?result.exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Subprocess finished"
        );
        Ok(result)
    }

    /// `true` once the child has exited, `false` if the deadline passed first.
    fn wait_with_deadline(&self, child: &mut Child, started: Instant) -> Result<bool, StackError> {
        loop {
            let exited = child
                .try_wait()
                .map_err(|e| StackError::execution(format!("waiting on {}: {}", self.program, e)))?;
            if exited.is_some() {
                return Ok(true);
            }
            if started.elapsed() > self.timeout {
                return Ok(false);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Start without waiting; output is discarded. Returns the pid.
    pub fn spawn_detached(&self) -> Result<u32, StackError> {
        self.trace_start("Spawning detached subprocess");
        let child = self
            .command(Stdio::null)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;
        Ok(child.id())
    }
}
