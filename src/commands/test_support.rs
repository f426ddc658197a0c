//! Shared fixtures for command tests.

use std::path::Path;
use std::sync::Arc;

use crate::config::Settings;
use crate::executor::DryRunRunner;
use crate::platform::{OsFamily, PlatformProfile};
use crate::templates::TemplateEngine;

use super::types::ExecutionContext;

/// A dry-run context whose profile lives under `root`.
pub(crate) fn context(family: OsFamily, root: &Path) -> (ExecutionContext, Arc<DryRunRunner>) {
    let runner = Arc::new(DryRunRunner::new());
    let profile = PlatformProfile::for_family(family).rebased(root);
    let ctx = ExecutionContext::new(
        profile,
        Settings::default(),
        runner.clone(),
        TemplateEngine::builtin().unwrap(),
        0,
        true,
    );
    (ctx, runner)
}
