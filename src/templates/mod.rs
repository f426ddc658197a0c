//! Configuration templates.

mod builtin;
mod engine;

pub use engine::TemplateEngine;
