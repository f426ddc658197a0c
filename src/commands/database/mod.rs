//! Database operations: root credential recovery, plus schemas, users and
//! grants administered as root.
//!
//! Administrative commands take `--root-password`; without it root
//! authenticates through the server socket.

mod check_root;
mod databases;
mod reset_root;
mod status;
mod users;

pub use check_root::MysqlCheckRootCommand;
pub use databases::{DbCreateCommand, DbDropCommand, DbListCommand};
pub use reset_root::MysqlResetRootCommand;
pub use status::MysqlStatusCommand;
pub use users::{DbGrantCommand, DbUserCreateCommand};

use crate::database::{DatabaseAdmin, RecoveryEngine};
use crate::error::StackResult;

use super::traits::Flag;
use super::types::{CommandParams, ExecutionContext};

const ROOT_PASSWORD_FLAG: &[Flag] = &[Flag::value("root-password", "root_password")];

fn with_admin<T>(
    ctx: &ExecutionContext,
    params: &CommandParams,
    f: impl FnOnce(&DatabaseAdmin<'_>) -> StackResult<T>,
) -> StackResult<T> {
    let root_password = params.get_optional_string("root_password");
    let admin = DatabaseAdmin::new(
        &ctx.profile,
        ctx.runner(),
        ctx.command_timeout(),
        root_password.as_deref(),
    );
    f(&admin)
}

fn engine(ctx: &ExecutionContext) -> RecoveryEngine<'_> {
    RecoveryEngine::new(
        &ctx.profile,
        ctx.runner(),
        &ctx.settings.recovery,
        &ctx.settings.paths.init_file_dir,
        ctx.command_timeout(),
        ctx.service_timeout(),
    )
}
