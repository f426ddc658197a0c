//! Configuration settings for stackctl.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::StackError;

/// Location of the configuration file when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/stackctl/stackctl.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub recovery: RecoveryConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub whitelists: WhitelistsConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Paths configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// OS identification file consulted by the platform resolver.
    #[serde(default = "default_os_release")]
    pub os_release: PathBuf,
    /// Optional sandbox root every profile path is rebased under.
    pub root: Option<PathBuf>,
    /// Optional directory of `*.tera` templates overriding the built-ins.
    pub templates_dir: Option<PathBuf>,
    /// Directory the one-shot database init file is written to.
    #[serde(default = "default_init_file_dir")]
    pub init_file_dir: PathBuf,
}

/// Timeouts for external commands, in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Default command timeout in seconds.
    #[serde(default = "default_timeout")]
    pub default_timeout_seconds: u64,
    /// Timeout for package installs and removals.
    #[serde(default = "default_package_timeout")]
    pub package_timeout_seconds: u64,
    /// Timeout for systemctl calls.
    #[serde(default = "default_service_timeout")]
    pub service_timeout_seconds: u64,
}

/// Bounds for the credential recovery state machine.
#[derive(Debug, Clone, Deserialize)]
pub struct RecoveryConfig {
    /// Polls while waiting for a database process to exit.
    #[serde(default = "default_terminate_attempts")]
    pub terminate_attempts: u32,
    /// Polls while waiting for the safe-mode server to accept connections.
    #[serde(default = "default_safe_mode_attempts")]
    pub safe_mode_attempts: u32,
    /// Attempts at the final authenticated login.
    #[serde(default = "default_verify_attempts")]
    pub verify_attempts: u32,
    /// First backoff delay in milliseconds; doubled on every attempt.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Upper bound for a single backoff delay in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Hard cap on state transitions per run.
    #[serde(default = "default_max_transitions")]
    pub max_transitions: u32,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Whether audit logging is enabled.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Path to the audit log file.
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Refuse mutating operations unless running as root.
    #[serde(default = "default_require_root")]
    pub require_root: bool,
}

/// Configurable whitelists for extending default allowed values.
///
/// These lists are *additional* to the built-in defaults, not replacements.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WhitelistsConfig {
    /// Additional allowed PHP versions (beyond 5.6 and 7.0-8.4).
    #[serde(default)]
    pub additional_php_versions: Vec<String>,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_os_release() -> PathBuf {
    PathBuf::from("/etc/os-release")
}

fn default_init_file_dir() -> PathBuf {
    PathBuf::from("/var/lib/mysql")
}

fn default_timeout() -> u64 {
    60
}

fn default_package_timeout() -> u64 {
    900
}

fn default_service_timeout() -> u64 {
    120
}

fn default_terminate_attempts() -> u32 {
    10
}

fn default_safe_mode_attempts() -> u32 {
    15
}

fn default_verify_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    250
}

fn default_max_backoff_ms() -> u64 {
    4_000
}

fn default_max_transitions() -> u32 {
    32
}

fn default_audit_enabled() -> bool {
    false
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("/var/log/stackctl/audit.log")
}

fn default_require_root() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            os_release: default_os_release(),
            root: None,
            templates_dir: None,
            init_file_dir: default_init_file_dir(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default_timeout_seconds: default_timeout(),
            package_timeout_seconds: default_package_timeout(),
            service_timeout_seconds: default_service_timeout(),
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            terminate_attempts: default_terminate_attempts(),
            safe_mode_attempts: default_safe_mode_attempts(),
            verify_attempts: default_verify_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_transitions: default_max_transitions(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            log_path: default_audit_log_path(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            require_root: default_require_root(),
        }
    }
}

impl LimitsConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_seconds)
    }

    pub fn package_timeout(&self) -> Duration {
        Duration::from_secs(self.package_timeout_seconds)
    }

    pub fn service_timeout(&self) -> Duration {
        Duration::from_secs(self.service_timeout_seconds)
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StackError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| StackError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            StackError::Config { message } => StackError::Config {
                message: format!("{} ({})", message, path.display()),
            },
            other => other,
        })
    }

    /// Load the explicitly requested file, or the default location.
    ///
    /// A missing default file yields built-in defaults; a missing explicit
    /// file is an error.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, StackError> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, StackError> {
        let settings: Settings = toml::from_str(content).map_err(|e| StackError::Config {
            message: format!("Failed to parse config: {}", e),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings.
    fn validate(&self) -> Result<(), StackError> {
        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(StackError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        // Validate log format
        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(StackError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        if self.recovery.max_transitions == 0 {
            return Err(StackError::Config {
                message: "recovery.max_transitions must be at least 1".to_string(),
            });
        }

        if self.recovery.initial_backoff_ms > self.recovery.max_backoff_ms {
            return Err(StackError::Config {
                message: format!(
                    "recovery.initial_backoff_ms ({}) exceeds recovery.max_backoff_ms ({})",
                    self.recovery.initial_backoff_ms, self.recovery.max_backoff_ms
                ),
            });
        }

        if let Some(root) = &self.paths.root {
            if !root.is_absolute() {
                return Err(StackError::Config {
                    message: format!("paths.root must be absolute: {}", root.display()),
                });
            }
        }

        Ok(())
    }
}
