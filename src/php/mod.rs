//! PHP module/version switching.
//!
//! Each binding (the web server's PHP module, or standalone PHP-FPM units)
//! is a [`VariantBackend`]; [`SwitchEngine`] keeps exactly one of its
//! variants active and manages the extensions of each one.

mod apache;
mod extensions;
mod fpm;
mod switch;
mod variant;

use std::time::Duration;

pub use apache::ApacheModuleBackend;
pub use extensions::{parse_modules, ExtensionList, ExtensionOutcome};
pub use fpm::FpmBackend;
pub use switch::{PackageOutcome, SwitchEngine, SwitchOutcome, SwitchWarning};
pub use variant::{ModuleVariant, VariantBackend};

use crate::executor::CommandRunner;
use crate::platform::{Binding, PlatformProfile};

/// The backend for a binding chosen at runtime.
pub enum BindingBackend<'a> {
    Apache(ApacheModuleBackend<'a>),
    Fpm(FpmBackend<'a>),
}

impl<'a> BindingBackend<'a> {
    pub fn new(
        binding: Binding,
        profile: &'a PlatformProfile,
        runner: &'a dyn CommandRunner,
        timeout: Duration,
    ) -> Self {
        match binding {
            Binding::Apache => Self::Apache(ApacheModuleBackend::new(profile)),
            Binding::Fpm => Self::Fpm(FpmBackend::new(profile, runner, timeout)),
        }
    }

    pub fn as_backend(&self) -> &dyn VariantBackend {
        match self {
            Self::Apache(backend) => backend,
            Self::Fpm(backend) => backend,
        }
    }
}
