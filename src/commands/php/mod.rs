//! PHP variant operations.
//!
//! Every operation takes `--binding apache|fpm` and defaults to the web
//! server's PHP module.

mod extensions;
mod packages;
mod query;
mod switch;

pub use extensions::{
    PhpExtensionInstallCommand, PhpExtensionListCommand, PhpExtensionUninstallCommand,
};
pub use packages::{PhpInstallCommand, PhpUninstallCommand};
pub use query::{PhpActiveCommand, PhpAvailableCommand, PhpListCommand};
pub use switch::PhpSwitchCommand;

use crate::error::StackResult;
use crate::php::{BindingBackend, SwitchEngine};
use crate::platform::Binding;

use super::traits::Flag;
use super::types::ExecutionContext;

const BINDING_FLAG: &[Flag] = &[Flag::value("binding", "binding")];

fn with_engine<T>(
    ctx: &ExecutionContext,
    binding: Binding,
    f: impl FnOnce(&SwitchEngine<'_>) -> StackResult<T>,
) -> StackResult<T> {
    let backend = BindingBackend::new(binding, &ctx.profile, ctx.runner(), ctx.service_timeout());
    let engine = SwitchEngine::new(
        &ctx.profile,
        backend.as_backend(),
        ctx.runner(),
        ctx.service_timeout(),
        ctx.package_timeout(),
    );
    f(&engine)
}
