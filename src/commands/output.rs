//! Rendering of results and errors for the terminal.

use serde_json::{json, Value};

use crate::error::StackError;

use super::types::CommandResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    /// Exactly one JSON value per invocation.
    Json,
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) if s.is_empty() => "-".to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(scalar).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

fn object_lines(map: &serde_json::Map<String, Value>, out: &mut Vec<String>) {
    let width = map.keys().map(|k| k.len()).max().unwrap_or(0);
    for (key, value) in map {
        match value {
            Value::Object(inner) => {
                out.push(format!("{}:", key));
                let mut nested = Vec::new();
                object_lines(inner, &mut nested);
                out.extend(nested.into_iter().map(|l| format!("  {}", l)));
            }
            _ => out.push(format!("{:width$}  {}", key, scalar(value), width = width)),
        }
    }
}

/// Plain-text view of a data value.
pub fn render_value(value: &Value) -> String {
    let mut out = Vec::new();
    match value {
        Value::Array(rows) if rows.is_empty() => out.push("(none)".to_string()),
        Value::Array(rows) => {
            for row in rows {
                match row {
                    Value::Object(map) => out.push(
                        map.iter()
                            .map(|(k, v)| format!("{}={}", k, scalar(v)))
                            .collect::<Vec<_>>()
                            .join("  "),
                    ),
                    other => out.push(scalar(other)),
                }
            }
        }
        Value::Object(map) => object_lines(map, &mut out),
        other => out.push(scalar(other)),
    }
    out.join("\n")
}

pub fn render_success(result: &CommandResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => result.data.to_string(),
        OutputFormat::Human => match &result.message {
            Some(message) if result.data.is_null() => message.clone(),
            Some(message) => format!("{}\n{}", message, render_value(&result.data)),
            None => render_value(&result.data),
        },
    }
}

fn manual_steps(err: &StackError) -> Option<&[String]> {
    match err {
        StackError::TerminalRecoveryFailure { manual_steps, .. } => Some(manual_steps),
        _ => None,
    }
}

pub fn render_error(err: &StackError, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let mut value = json!({"error": err.code(), "message": err.to_string()});
            if let Some(steps) = manual_steps(err) {
                value["manual_steps"] = json!(steps);
            }
            value.to_string()
        }
        OutputFormat::Human => {
            let mut text = format!("error: {}", err);
            if let Some(steps) = manual_steps(err) {
                text.push_str("\n\nTo reset the password by hand:");
                for (i, step) in steps.iter().enumerate() {
                    text.push_str(&format!("\n  {}. {}", i + 1, step));
                }
            }
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_shape() {
        let err = StackError::NotFound {
            what: "Virtual host",
            name: "x.conf".into(),
        };
        let value: Value = serde_json::from_str(&render_error(&err, OutputFormat::Json)).unwrap();
        assert_eq!(value["error"], "NOT_FOUND");
        assert_eq!(value["message"], "Virtual host not found: x.conf");
    }

    #[test]
    fn test_human_rows() {
        let rendered = render_value(&json!([
            {"filename": "a.test.conf", "php_version": null, "enabled": true}
        ]));
        assert_eq!(rendered, "enabled=true  filename=a.test.conf  php_version=-");
        assert_eq!(render_value(&json!([])), "(none)");
    }

    #[test]
    fn test_terminal_failure_lists_steps() {
        let err = StackError::TerminalRecoveryFailure {
            reason: "nope".into(),
            manual_steps: vec!["step one".into(), "step two".into()],
        };
        let text = render_error(&err, OutputFormat::Human);
        assert!(text.contains("  2. step two"));
        let json: Value = serde_json::from_str(&render_error(&err, OutputFormat::Json)).unwrap();
        assert_eq!(json["manual_steps"][0], "step one");
    }
}
