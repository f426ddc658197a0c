//! Command types: parameters, results, and execution context.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::config::Settings;
use crate::error::{StackError, StackResult, ValidationErrorKind};
use crate::executor::CommandRunner;
use crate::platform::{Binding, PlatformProfile};
use crate::templates::TemplateEngine;

/// Wrapper around operation parameters with typed accessors.
#[derive(Debug, Clone, Default)]
pub struct CommandParams {
    inner: serde_json::Map<String, serde_json::Value>,
}

fn missing(key: &str) -> StackError {
    StackError::InvalidParameters {
        kind: ValidationErrorKind::MissingParameter {
            param: key.to_string(),
        },
    }
}

impl CommandParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object; anything else yields empty parameters.
    pub fn from_value(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(inner) => Self { inner },
            _ => Self::default(),
        }
    }

    pub fn insert(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.inner.insert(key.to_string(), value.into());
    }

    pub fn as_value(&self) -> serde_json::Value {
        serde_json::Value::Object(self.inner.clone())
    }

    pub fn get_string(&self, key: &str) -> StackResult<String> {
        self.get_optional_string(key).ok_or_else(|| missing(key))
    }

    pub fn get_optional_string(&self, key: &str) -> Option<String> {
        self.inner
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    pub fn get_optional_bool(&self, key: &str, default: bool) -> bool {
        self.inner
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn require_string(&self, key: &str) -> StackResult<()> {
        self.get_string(key).map(|_| ())
    }

    /// The `binding` parameter; the web server's module when absent.
    pub fn get_binding(&self) -> StackResult<Binding> {
        match self.get_optional_string("binding") {
            None => Ok(Binding::Apache),
            Some(value) => Binding::parse(&value).ok_or_else(|| {
                StackError::invalid("binding", format!("'{}' is not one of apache, fpm", value))
            }),
        }
    }
}

/// Successful outcome of an operation.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Printed as-is in JSON mode.
    pub data: serde_json::Value,
    /// One-line summary for human output.
    pub message: Option<String>,
}

impl CommandResult {
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            data,
            message: None,
        }
    }

    /// Serialize any result type into the data value.
    pub fn from_serialize<T: Serialize>(value: &T) -> StackResult<Self> {
        Ok(Self::success(serde_json::to_value(value)?))
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Everything an operation needs, built once per invocation.
pub struct ExecutionContext {
    pub request_id: Uuid,
    pub profile: PlatformProfile,
    pub settings: Settings,
    pub runner: Arc<dyn CommandRunner>,
    pub templates: TemplateEngine,
    /// Effective uid of the caller.
    pub uid: u32,
    pub dry_run: bool,
}

impl ExecutionContext {
    pub fn new(
        profile: PlatformProfile,
        settings: Settings,
        runner: Arc<dyn CommandRunner>,
        templates: TemplateEngine,
        uid: u32,
        dry_run: bool,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            profile,
            settings,
            runner,
            templates,
            uid,
            dry_run,
        }
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn command_timeout(&self) -> Duration {
        self.settings.limits.default_timeout()
    }

    pub fn service_timeout(&self) -> Duration {
        self.settings.limits.service_timeout()
    }

    pub fn package_timeout(&self) -> Duration {
        self.settings.limits.package_timeout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_accessors() {
        let params = CommandParams::from_value(serde_json::json!({
            "server_name": "a.test",
            "ssl": true,
        }));
        assert_eq!(params.get_string("server_name").unwrap(), "a.test");
        assert!(params.get_optional_bool("ssl", false));
        assert!(!params.get_optional_bool("missing", false));
        assert_eq!(params.get_string("missing").unwrap_err().exit_code(), 2);
    }

    #[test]
    fn test_binding_param() {
        let mut params = CommandParams::new();
        assert_eq!(params.get_binding().unwrap(), Binding::Apache);
        params.insert("binding", "fpm");
        assert_eq!(params.get_binding().unwrap(), Binding::Fpm);
        params.insert("binding", "cgi");
        assert!(params.get_binding().is_err());
    }

    #[test]
    fn test_result_with_message() {
        let result = CommandResult::success(serde_json::json!({"ok": true})).with_message("done");
        assert_eq!(result.message.as_deref(), Some("done"));
    }
}
