//! PHP versions accepted on top of the built-in list.
//!
//! Set once from the `[whitelists]` settings table before any operation
//! validates its parameters.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::config::WhitelistsConfig;

static EXTRA_VERSIONS: OnceLock<RuntimeWhitelists> = OnceLock::new();

#[derive(Debug, Clone, Default)]
pub struct RuntimeWhitelists {
    pub additional_php_versions: BTreeSet<String>,
}

impl RuntimeWhitelists {
    /// Blank entries are dropped; surrounding whitespace is ignored.
    pub fn from_config(config: &WhitelistsConfig) -> Self {
        let additional_php_versions = config
            .additional_php_versions
            .iter()
            .map(|entry| entry.trim())
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            additional_php_versions,
        }
    }
}

/// First call wins; the binary calls this right after loading settings.
pub fn init_whitelists(config: &WhitelistsConfig) {
    if EXTRA_VERSIONS.set(RuntimeWhitelists::from_config(config)).is_err() {
        tracing::debug!("Whitelists already initialized");
    }
}

pub fn get_whitelists() -> &'static RuntimeWhitelists {
    EXTRA_VERSIONS.get_or_init(RuntimeWhitelists::default)
}

pub fn is_additional_php_version(version: &str) -> bool {
    get_whitelists().additional_php_versions.contains(version)
}
