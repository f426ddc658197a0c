//! `ssl-create-cert`, `ssl-trust`, `ssl-untrust`.

use tracing::info;

use crate::error::StackResult;
use crate::validation::validate_server_name;
use crate::vhost::{CertificateOutcome, CertificateStore};

use super::super::traits::Command;
use super::super::types::{CommandParams, CommandResult, ExecutionContext};

fn certificates(ctx: &ExecutionContext) -> CertificateStore<'_> {
    CertificateStore::new(&ctx.profile, ctx.runner(), ctx.command_timeout())
}

fn validate_domain(params: &CommandParams) -> StackResult<()> {
    validate_server_name(&params.get_string("domain")?).map(|_| ())
}

fn respond(ctx: &ExecutionContext, outcome: &CertificateOutcome, message: String) -> StackResult<CommandResult> {
    info!(
        request_id = %ctx.request_id,
        domain = %outcome.domain,
        created = outcome.created,
        trusted = outcome.trusted,
        "Certificate operation finished"
    );
    Ok(CommandResult::from_serialize(outcome)?.with_message(message))
}

pub struct SslCreateCertCommand;

impl Command for SslCreateCertCommand {
    fn name(&self) -> &'static str {
        "ssl-create-cert"
    }

    fn summary(&self) -> &'static str {
        "Create a self-signed certificate for a domain (kept if present)"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["domain"]
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        validate_domain(params)
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let outcome = certificates(ctx).create(&params.get_string("domain")?)?;
        let message = if outcome.created {
            format!("Certificate created at {}", outcome.certificate.display())
        } else {
            format!("Certificate already exists at {}", outcome.certificate.display())
        };
        respond(ctx, &outcome, message)
    }
}

pub struct SslTrustCommand;

impl Command for SslTrustCommand {
    fn name(&self) -> &'static str {
        "ssl-trust"
    }

    fn summary(&self) -> &'static str {
        "Add a domain's certificate to the system trust store"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["domain"]
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        validate_domain(params)
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let outcome = certificates(ctx).trust(&params.get_string("domain")?)?;
        let message = format!("{} is now trusted", outcome.domain);
        respond(ctx, &outcome, message)
    }
}

pub struct SslUntrustCommand;

impl Command for SslUntrustCommand {
    fn name(&self) -> &'static str {
        "ssl-untrust"
    }

    fn summary(&self) -> &'static str {
        "Remove a domain's certificate from the system trust store"
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["domain"]
    }

    fn validate(&self, params: &CommandParams) -> StackResult<()> {
        validate_domain(params)
    }

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
        let outcome = certificates(ctx).untrust(&params.get_string("domain")?)?;
        let message = format!("{} is no longer trusted", outcome.domain);
        respond(ctx, &outcome, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use crate::platform::OsFamily;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_trust_requires_certificate() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, _) = context(OsFamily::Debian, tmp.path());
        let params = CommandParams::from_value(json!({"domain": "site.test"}));
        let err = SslTrustCommand.execute(&ctx, params).unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_trust_and_untrust_existing_certificate() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, runner) = context(OsFamily::Debian, tmp.path());
        fs::create_dir_all(&ctx.profile.cert_dir).unwrap();
        fs::write(ctx.profile.cert_dir.join("site.test.crt"), "CERT").unwrap();

        let params = CommandParams::from_value(json!({"domain": "site.test"}));
        SslTrustCommand.execute(&ctx, params.clone()).unwrap();
        let anchor = ctx.profile.trust_anchor_dir.join("site.test.crt");
        assert_eq!(fs::read_to_string(&anchor).unwrap(), "CERT");

        SslUntrustCommand.execute(&ctx, params).unwrap();
        assert!(!anchor.exists());
        assert_eq!(runner.recorded().len(), 2);
    }

    #[test]
    fn test_create_keeps_existing_pair() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, runner) = context(OsFamily::Debian, tmp.path());
        fs::create_dir_all(&ctx.profile.cert_dir).unwrap();
        fs::create_dir_all(&ctx.profile.key_dir).unwrap();
        fs::write(ctx.profile.cert_dir.join("site.test.crt"), "CERT").unwrap();
        fs::write(ctx.profile.key_dir.join("site.test.key"), "KEY").unwrap();

        let params = CommandParams::from_value(json!({"domain": "site.test"}));
        let result = SslCreateCertCommand.execute(&ctx, params).unwrap();
        assert_eq!(result.data["created"], false);
        assert!(runner.recorded().is_empty());
    }
}
