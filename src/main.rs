//! stackctl: configure the web server, PHP runtimes and database of a local
//! development stack.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{ArgMatches, Args, FromArgMatches};
use nix::unistd::geteuid;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stackctl::audit::{AuditEntry, AuditLogger, AuditResult};
use stackctl::commands::{
    params_from_matches, render_error, render_success, subcommand, CommandRegistry,
    ExecutionContext, OutputFormat,
};
use stackctl::config::Settings;
use stackctl::error::{StackError, StackResult, ValidationErrorKind};
use stackctl::executor::{CommandRunner, DryRunRunner, SystemRunner};
use stackctl::platform::PlatformResolver;
use stackctl::templates::TemplateEngine;
use stackctl::validation::init_whitelists;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

/// Options accepted before or after the operation name.
#[derive(Debug, Default, Args)]
struct GlobalOptions {
    /// Path to configuration file [default: /etc/stackctl/stackctl.toml]
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print exactly one JSON value
    #[arg(long, global = true)]
    json: bool,

    /// Record external commands instead of running them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Resolve every system path under DIR
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,
}

/// The whole command line: global options plus one subcommand per
/// registered operation.
fn cli(registry: &CommandRegistry) -> clap::Command {
    let root = clap::Command::new(NAME)
        .version(VERSION)
        .about("Configure the web server, PHP runtimes and database of a local development stack")
        .subcommand_required(true)
        .arg_required_else_help(true);
    registry
        .list()
        .fold(GlobalOptions::augment_args(root), |cli, command| {
            cli.subcommand(subcommand(command))
        })
}

/// Parsing failures that are really requests for help or the version are
/// printed and reported as `None`.
fn parse_cli(registry: &CommandRegistry, args: &[String]) -> StackResult<Option<ArgMatches>> {
    let argv = std::iter::once(NAME.to_string()).chain(args.iter().cloned());
    match cli(registry).try_get_matches_from(argv) {
        Ok(matches) => Ok(Some(matches)),
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = e.print();
                Ok(None)
            }
            ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                let _ = e.print();
                Err(StackError::invalid("operation", "no operation given"))
            }
            ErrorKind::InvalidSubcommand => {
                let name = match e.get(ContextKind::InvalidSubcommand) {
                    Some(ContextValue::String(name)) => name.clone(),
                    _ => String::new(),
                };
                Err(StackError::InvalidParameters {
                    kind: ValidationErrorKind::UnknownOperation { name },
                })
            }
            _ => Err(StackError::invalid("arguments", e.render().to_string().trim_end())),
        },
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let json = args.iter().any(|a| a == "--json");
    let format = if json { OutputFormat::Json } else { OutputFormat::Human };

    match run(&args, format) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let rendered = render_error(&e, format);
            match format {
                OutputFormat::Json => println!("{}", rendered),
                OutputFormat::Human => eprintln!("{}", rendered),
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(args: &[String], format: OutputFormat) -> StackResult<()> {
    let registry = CommandRegistry::new();
    let Some(matches) = parse_cli(&registry, args)? else {
        return Ok(());
    };
    let Some((operation, op_matches)) = matches.subcommand() else {
        return Err(StackError::invalid("operation", "no operation given"));
    };
    let command = registry.require(operation)?;
    let options = GlobalOptions::from_arg_matches(op_matches)
        .map_err(|e| StackError::invalid("arguments", e.to_string()))?;

    let settings = Settings::load_or_default(options.config.as_deref())?;
    init_whitelists(&settings.whitelists);
    init_logging(&settings);

    let params = params_from_matches(command, op_matches);
    command.validate(&params)?;

    let root = options.root.clone().or_else(|| settings.paths.root.clone());
    let profile = PlatformResolver::new(&settings.paths.os_release)
        .with_root(root)
        .resolve()?;

    let templates = match &settings.paths.templates_dir {
        Some(dir) => TemplateEngine::with_overrides(dir)?,
        None => TemplateEngine::builtin()?,
    };

    let runner: Arc<dyn CommandRunner> = if options.dry_run {
        Arc::new(DryRunRunner::new())
    } else {
        Arc::new(SystemRunner)
    };

    let uid = geteuid().as_raw();
    if command.requires_root() && uid != 0 && !options.dry_run && settings.security.require_root {
        return Err(StackError::PermissionDenied {
            message: format!("{} must run as root (try sudo)", command.name()),
        });
    }

    let audit = if command.mutates() {
        AuditLogger::from_config(&settings.audit)
    } else {
        None
    };

    let ctx = ExecutionContext::new(profile, settings, runner, templates, uid, options.dry_run);
    info!(
        request_id = %ctx.request_id,
        operation = command.name(),
        dry_run = ctx.dry_run,
        "Running operation"
    );

    let audited_params = params.as_value();
    let started = Instant::now();
    let outcome = command.execute(&ctx, params);
    let duration_ms = started.elapsed().as_millis() as u64;

    if let Some(audit) = audit {
        let entry = AuditEntry::new(
            ctx.request_id,
            command.name(),
            &audited_params,
            uid,
            ctx.dry_run,
            AuditResult::from_outcome(&outcome),
            duration_ms,
        );
        if let Err(e) = audit.log(&entry) {
            warn!(error = %e, path = %audit.path().display(), "Failed to write audit entry");
        }
    }

    match outcome {
        Ok(result) => {
            println!("{}", render_success(&result, format));
            Ok(())
        }
        Err(e) => {
            error!(request_id = %ctx.request_id, code = e.code(), error = %e, "Operation failed");
            Err(e)
        }
    }
}

/// Logs go to stderr; stdout carries only the operation's output.
fn init_logging(settings: &Settings) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    match settings.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
