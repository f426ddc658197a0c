//! The variant abstraction shared by every PHP binding.

use serde::Serialize;

use crate::error::StackResult;
use crate::platform::Binding;

/// One PHP version as seen by a binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleVariant {
    pub version: String,
    pub installed: bool,
    pub enabled: bool,
}

impl ModuleVariant {
    pub fn new(version: impl Into<String>, enabled: bool) -> Self {
        Self {
            version: version.into(),
            installed: true,
            enabled,
        }
    }
}

/// Where a binding keeps its variants and how it toggles them.
///
/// `variants` is the single query function: every decision the switch
/// engine takes is based on what it returns right now.
pub trait VariantBackend {
    fn binding(&self) -> Binding;

    /// Installed variants, sorted by version.
    fn variants(&self) -> StackResult<Vec<ModuleVariant>>;

    fn enable(&self, version: &str) -> StackResult<()>;

    fn disable(&self, version: &str) -> StackResult<()>;

    /// Unit restarted once the binding changed.
    fn bound_unit(&self, version: &str) -> String;
}

/// Numeric ordering for `major.minor` strings ("8.10" after "8.9").
pub(crate) fn sort_versions(versions: &mut [ModuleVariant]) {
    versions.sort_by_key(|v| version_key(&v.version));
}

fn version_key(version: &str) -> (u32, u32) {
    let mut parts = version.split('.').map(|p| p.parse::<u32>().unwrap_or(0));
    (parts.next().unwrap_or(0), parts.next().unwrap_or(0))
}

/// `digits.digits`, the only shape a discovered module name may carry.
pub(crate) fn is_version_shaped(version: &str) -> bool {
    match version.split_once('.') {
        Some((major, minor)) => {
            !major.is_empty()
                && !minor.is_empty()
                && major.chars().all(|c| c.is_ascii_digit())
                && minor.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}
