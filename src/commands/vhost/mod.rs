//! Virtual host operations.

mod create;
mod delete;
mod details;
mod list;
mod toggle;
mod update_php;

pub use create::VhostCreateCommand;
pub use delete::VhostDeleteCommand;
pub use details::VhostDetailsCommand;
pub use list::VhostListCommand;
pub use toggle::{VhostDisableCommand, VhostEnableCommand};
pub use update_php::VhostUpdatePhpCommand;

use crate::vhost::VhostStore;

use super::types::ExecutionContext;

fn store(ctx: &ExecutionContext) -> VhostStore<'_> {
    VhostStore::new(
        &ctx.profile,
        ctx.runner(),
        &ctx.templates,
        ctx.command_timeout(),
        ctx.service_timeout(),
    )
}
