//! Tera template engine wrapper.

use std::path::Path;
use std::sync::Arc;

use tera::{Context, Tera};
use tracing::{debug, info};

use super::builtin;
use crate::error::StackError;

/// Template engine for rendering configuration files.
///
/// Wraps Tera and provides a simplified interface for template operations.
#[derive(Clone)]
pub struct TemplateEngine {
    tera: Arc<Tera>,
}

impl TemplateEngine {
    /// Engine holding only the built-in templates.
    pub fn builtin() -> Result<Self, StackError> {
        let mut tera = Tera::default();
        register_builtins(&mut tera)?;
        Ok(Self {
            tera: Arc::new(tera),
        })
    }

    /// Load `*.tera` files from `template_dir`, then fill in any built-in
    /// template the directory does not override.
    pub fn with_overrides(template_dir: &Path) -> Result<Self, StackError> {
        let pattern = template_dir.join("**/*.tera");
        let pattern_str = pattern.to_string_lossy();

        debug!(pattern = %pattern_str, "Loading templates");

        let mut tera = Tera::new(&pattern_str).map_err(|e| StackError::Template {
            message: format!(
                "Failed to load templates from '{}': {}",
                template_dir.display(),
                e
            ),
        })?;
        let overridden = tera.get_template_names().count();
        register_builtins(&mut tera)?;

        info!(
            directory = %template_dir.display(),
            overridden,
            "Template engine initialized"
        );

        Ok(Self {
            tera: Arc::new(tera),
        })
    }

    /// Render a template with the given context.
    pub fn render(
        &self,
        template_name: &str,
        context: &serde_json::Value,
    ) -> Result<String, StackError> {
        let tera_context = Context::from_serialize(context).map_err(|e| StackError::Template {
            message: format!("Invalid template context: {}", e),
        })?;

        self.tera
            .render(template_name, &tera_context)
            .map_err(|e| StackError::Template {
                message: format!("Failed to render template '{}': {}", template_name, e),
            })
    }

    /// Check if a template exists.
    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }
}

fn register_builtins(tera: &mut Tera) -> Result<(), StackError> {
    let existing: Vec<String> = tera.get_template_names().map(str::to_string).collect();
    let missing: Vec<(&str, &str)> = builtin::TEMPLATES
        .iter()
        .filter(|(name, _)| !existing.iter().any(|e| e == name))
        .copied()
        .collect();

    tera.add_raw_templates(missing)
        .map_err(|e| StackError::Template {
            message: format!("Failed to register built-in templates: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_templates_present() {
        let engine = TemplateEngine::builtin().unwrap();
        assert!(engine.has_template("apache/vhost.conf.tera"));
        assert!(engine.has_template("apache/index.html.tera"));
    }

    #[test]
    fn test_render_vhost_without_ssl() {
        let engine = TemplateEngine::builtin().unwrap();
        let text = engine
            .render(
                "apache/vhost.conf.tera",
                &serde_json::json!({
                    "server_name": "test.local",
                    "document_root": "/var/www/test",
                    "log_dir": "/var/log/apache2",
                    "ssl": false,
                }),
            )
            .unwrap();
        assert!(text.contains("ServerName test.local"));
        assert!(text.contains("DocumentRoot /var/www/test"));
        assert_eq!(text.matches("<VirtualHost").count(), 1);
        assert!(!text.contains("SSLEngine"));
    }

    #[test]
    fn test_override_dir_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("apache")).unwrap();
        std::fs::write(
            dir.path().join("apache/index.html.tera"),
            "custom {{ server_name }}\n",
        )
        .unwrap();

        let engine = TemplateEngine::with_overrides(dir.path()).unwrap();
        let page = engine
            .render(
                "apache/index.html.tera",
                &serde_json::json!({"server_name": "a.test", "document_root": "/srv"}),
            )
            .unwrap();
        assert_eq!(page, "custom a.test\n");
        assert!(engine.has_template("apache/vhost.conf.tera"));
    }

    #[test]
    fn test_missing_template() {
        let engine = TemplateEngine::builtin().unwrap();
        assert!(engine
            .render("nonexistent.tera", &serde_json::json!({}))
            .is_err());
    }
}
