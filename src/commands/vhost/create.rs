//! `vhost-create`.

use tracing::info;

use crate::error::StackResult;
use crate::validation::{validate_document_root, validate_php_version, validate_server_name};
use crate::vhost::CreateVhost;

use super::super::traits::{Command, Flag};
use super::super::types::{CommandParams, CommandResult, ExecutionContext};
use super::store;

/// Create a virtual host, its document root, and its host entry.
///
/// # Parameters
///
/// - `server_name` (required): host name, also the config filename stem
/// - `document_root` (required): absolute directory served by the vhost
/// - `ssl` (optional): add an HTTPS block with a self-signed certificate
/// - `php_version` (optional): bind `.php` files to that version's FPM socket
pub struct VhostCreateCommand;

impl Command for VhostCreateCommand {
    fn name(&self) -> &'static str {
        "vhost-create"
    }

    fn summary(&self) -> &'static str {
        "Create a virtual host (idempotent)"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["server_name", "document_root"]
    }

    fn flags(&self) -> &'static [Flag] {
        const FLAGS: &[Flag] = &[
            Flag::switch("ssl", "ssl"),
            Flag::value("php-version", "php_version"),
        ];
        FLAGS
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        validate_server_name(&params.get_string("server_name")?)?;
        validate_document_root(&params.get_string("document_root")?)?;
        if let Some(version) = params.get_optional_string("php_version") {
            validate_php_version(&version)?;
        }
        Ok(())
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let request = CreateVhost {
            server_name: params.get_string("server_name")?,
            document_root: params.get_string("document_root")?,
            ssl: params.get_optional_bool("ssl", false),
            php_version: params.get_optional_string("php_version"),
        };

        let outcome = store(ctx).create(&request)?;
        info!(
            request_id = %ctx.request_id,
            filename = %outcome.details.entry.filename,
            "Virtual host created"
        );

        let message = format!(
            "Virtual host {} ready at {}",
            outcome.details.entry.server_name,
            outcome.details.path.display()
        );
        Ok(CommandResult::from_serialize(&outcome)?.with_message(message))
    }
}
