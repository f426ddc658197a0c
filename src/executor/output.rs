//! Helpers for turning subprocess output into error messages.

use super::subprocess::SubprocessResult;
use crate::error::StackError;

/// Sanitize command output for inclusion in error messages.
///
/// Truncates long lines, limits the number of lines, and caps the total
/// length.
pub fn sanitize_output(output: &str, max_lines: usize) -> String {
    const MAX_LINE_LENGTH: usize = 200;
    const MAX_TOTAL_LENGTH: usize = 1000;

    let mut result = String::new();

    for line in output.lines().take(max_lines) {
        let truncated = match line.char_indices().nth(MAX_LINE_LENGTH) {
            Some((cut, _)) => format!("{}...", &line[..cut]),
            None => line.to_string(),
        };

        if result.len() + truncated.len() > MAX_TOTAL_LENGTH {
            result.push_str("...[truncated]");
            break;
        }

        if !result.is_empty() {
            result.push('\n');
        }
        result.push_str(&truncated);
    }

    if output.lines().count() > max_lines {
        result.push_str("\n...[additional output truncated]");
    }

    result
}

/// Turn a failed result into a `Command` error naming what was attempted.
pub fn ensure_success(result: SubprocessResult, what: &str) -> Result<SubprocessResult, StackError> {
    if result.success {
        return Ok(result);
    }
    let detail = if result.stderr.trim().is_empty() {
        sanitize_output(&result.stdout, 5)
    } else {
        sanitize_output(&result.stderr, 5)
    };
    Err(StackError::execution(format!(
        "{} failed (exit {}): {}",
        what,
        result
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string()),
        detail.trim()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_output_short() {
        assert_eq!(sanitize_output("Hello\nWorld", 10), "Hello\nWorld");
    }

    #[test]
    fn test_sanitize_output_truncates_lines() {
        let sanitized = sanitize_output("Line 1\nLine 2\nLine 3\nLine 4\nLine 5", 3);
        assert!(sanitized.contains("Line 3"));
        assert!(!sanitized.contains("Line 4"));
        assert!(sanitized.contains("[additional output truncated]"));
    }

    #[test]
    fn test_sanitize_output_truncates_long_lines() {
        let sanitized = sanitize_output(&"x".repeat(300), 10);
        assert!(sanitized.len() < 300);
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn test_ensure_success_reports_stderr() {
        let err = ensure_success(
            SubprocessResult::failed(1, "Job for apache2.service failed"),
            "systemctl reload apache2",
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("systemctl reload apache2 failed (exit 1)"));
        assert!(message.contains("Job for apache2.service failed"));
    }
}
