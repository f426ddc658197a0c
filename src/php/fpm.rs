//! Per-version PHP-FPM units as a variant backend.

use std::time::Duration;

use super::variant::{sort_versions, ModuleVariant, VariantBackend};
use crate::error::{StackError, StackResult};
use crate::executor::CommandRunner;
use crate::platform::{Binding, PlatformProfile};
use crate::services::{ServiceAction, ServiceManager};
use crate::validation::candidate_php_versions;

pub struct FpmBackend<'a> {
    profile: &'a PlatformProfile,
    services: ServiceManager<'a>,
}

impl<'a> FpmBackend<'a> {
    pub fn new(profile: &'a PlatformProfile, runner: &'a dyn CommandRunner, timeout: Duration) -> Self {
        Self {
            profile,
            services: ServiceManager::new(runner, timeout),
        }
    }

    fn is_installed(&self, version: &str) -> bool {
        self.profile.fpm_binary(version).exists()
    }
}

impl VariantBackend for FpmBackend<'_> {
    fn binding(&self) -> Binding {
        Binding::Fpm
    }

    fn variants(&self) -> StackResult<Vec<ModuleVariant>> {
        let mut variants = Vec::new();
        for version in candidate_php_versions() {
            if !self.is_installed(&version) {
                continue;
            }
            let enabled = self.services.is_enabled(&self.profile.fpm_unit(&version))?;
            variants.push(ModuleVariant::new(version, enabled));
        }
        sort_versions(&mut variants);
        Ok(variants)
    }

    fn enable(&self, version: &str) -> StackResult<()> {
        if !self.is_installed(version) {
            return Err(StackError::NotInstalled {
                version: version.to_string(),
            });
        }
        self.services
            .control(ServiceAction::Enable, &self.profile.fpm_unit(version))
    }

    fn disable(&self, version: &str) -> StackResult<()> {
        self.services
            .control(ServiceAction::Disable, &self.profile.fpm_unit(version))
    }

    fn bound_unit(&self, version: &str) -> String {
        self.profile.fpm_unit(version)
    }
}
