//! Maps operations onto clap subcommands and their matches back onto
//! [`CommandParams`].

use clap::{Arg, ArgAction, ArgMatches};

use super::traits::Command;
use super::types::CommandParams;

/// Positionals come from `arguments()` and are all required; `flags()`
/// become `--name` switches or `--name VALUE` options.
pub fn subcommand(command: &dyn Command) -> clap::Command {
    let mut sub = clap::Command::new(command.name()).about(command.summary());
    for key in command.arguments() {
        sub = sub.arg(
            Arg::new(*key)
                .required(true)
                .value_name(key.to_uppercase()),
        );
    }
    for flag in command.flags() {
        let arg = Arg::new(flag.param).long(flag.name);
        sub = sub.arg(if flag.takes_value {
            arg.value_name(flag.param.to_uppercase()).action(ArgAction::Set)
        } else {
            arg.action(ArgAction::SetTrue)
        });
    }
    sub
}

/// Parameters of one parsed subcommand. Switches appear only when given.
pub fn params_from_matches(command: &dyn Command, matches: &ArgMatches) -> CommandParams {
    let mut params = CommandParams::new();
    for key in command.arguments() {
        if let Some(value) = matches.get_one::<String>(key) {
            params.insert(key, value.as_str());
        }
    }
    for flag in command.flags() {
        if flag.takes_value {
            if let Some(value) = matches.get_one::<String>(flag.param) {
                params.insert(flag.param, value.as_str());
            }
        } else if matches.get_flag(flag.param) {
            params.insert(flag.param, true);
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::traits::Flag;
    use crate::commands::types::{CommandResult, ExecutionContext};
    use crate::error::StackResult;

    struct CreateLike;

    impl Command for CreateLike {
        fn name(&self) -> &'static str {
            "create-like"
        }

        fn summary(&self) -> &'static str {
            "test"
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

        fn validate(&self, _params: &CommandParams) -> StackResult<()> {
            Ok(())
        }

        fn execute(&self, _ctx: &ExecutionContext, _params: CommandParams) -> StackResult<CommandResult> {
            unreachable!()
        }
    }

    fn parse(args: &[&str]) -> Result<CommandParams, clap::Error> {
        let matches = subcommand(&CreateLike)
            .try_get_matches_from(std::iter::once("create-like").chain(args.iter().copied()))?;
        Ok(params_from_matches(&CreateLike, &matches))
    }

    #[test]
    fn test_positionals_and_flags() {
        let params = parse(&["site.test", "--ssl", "/srv/site", "--php-version", "8.2"]).unwrap();
        assert_eq!(params.get_string("server_name").unwrap(), "site.test");
        assert_eq!(params.get_string("document_root").unwrap(), "/srv/site");
        assert!(params.get_optional_bool("ssl", false));
        assert_eq!(params.get_string("php_version").unwrap(), "8.2");

        let params = parse(&["a", "b", "--php-version=7.4"]).unwrap();
        assert_eq!(params.get_string("php_version").unwrap(), "7.4");
        assert!(!params.has("ssl"));
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let missing = parse(&["a"]).unwrap_err();
        assert_eq!(missing.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        assert!(parse(&["a", "b", "c"]).is_err());
        assert!(parse(&["a", "b", "--force"]).is_err());
        assert!(parse(&["a", "b", "--php-version"]).is_err());
        assert!(parse(&["a", "b", "--ssl=yes"]).is_err());
    }
}
