//! Command trait definition.

use crate::error::StackResult;

use super::types::{CommandParams, CommandResult, ExecutionContext};

/// A `--flag` an operation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flag {
    /// Spelling on the command line, without the leading dashes.
    pub name: &'static str,
    /// Parameter key it fills.
    pub param: &'static str,
    /// Whether it is followed by a value; otherwise it sets `true`.
    pub takes_value: bool,
}

impl Flag {
    pub const fn switch(name: &'static str, param: &'static str) -> Self {
        Self {
            name,
            param,
            takes_value: false,
        }
    }

    pub const fn value(name: &'static str, param: &'static str) -> Self {
        Self {
            name,
            param,
            takes_value: true,
        }
    }
}

/// One operation of the engine.
///
/// # Example
///
/// ```ignore
/// pub struct MyCommand;
///
/// impl Command for MyCommand {
///     fn name(&self) -> &'static str {
///         "my-operation"
///     }
///
///     fn summary(&self) -> &'static str {
///         "Do the thing"
///     }
///
///     fn arguments(&self) -> &'static [&'static str] {
///         &["target"]
///     }
///
///     fn validate(&self, params: &CommandParams) -> StackResult<()> {
///         params.require_string("target")
///     }
///
///     fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult> {
///         let target = params.get_string("target")?;
///         Ok(CommandResult::success(serde_json::json!({"target": target})))
///     }
/// }
/// ```
pub trait Command {
    /// Name used on the command line (e.g. `vhost-create`).
    fn name(&self) -> &'static str;

    /// One-line description for `--help`.
    fn summary(&self) -> &'static str;

    /// Positional parameter keys, in order. All are required.
    fn arguments(&self) -> &'static [&'static str] {
        &[]
    }

    fn flags(&self) -> &'static [Flag] {
        &[]
    }

    /// Check parameters before anything touches the system.
    fn validate(&self, params: &CommandParams) -> StackResult<()>;

    fn execute(&self, ctx: &ExecutionContext, params: CommandParams) -> StackResult<CommandResult>;

    /// Whether the operation changes the system. Mutating operations are
    /// audited and need root.
    fn mutates(&self) -> bool {
        true
    }

    fn requires_root(&self) -> bool {
        self.mutates()
    }
}
