//! CLI argument parsing for stack operations.
//!
//! The CLI is intentionally thin: each command collects raw tokens and
//! flags, and all naming heuristics live in the resolver so the same core
//! logic can be reused elsewhere.
use clap::{Parser, Subcommand};

/// Root CLI entrypoint for stack management.
#[derive(Parser, Debug)]
#[command(
    name = "stackctl",
    version,
    about = "Manage cloud infrastructure stacks by naming convention",
    after_help = "A single argument may be a stack name, template path, or params path;\nthe other artifacts are inferred from naming convention. Pass an explicit\n`stack template [params]` list to skip inference.\n\nExamples:\n  stackctl create mywebsite-test\n  stackctl create mywebsite-test mywebsite.yml mywebsite-params-test.json\n  stackctl update vpc.json --capabilities CAPABILITY_IAM\n  stackctl delete mywebsite-test mywebsite-dev\n  stackctl tail mywebsite-test\n  stackctl diff mywebsite-test\n  stackctl status mywebsite-test",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub(crate) struct RootArgs {
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Top-level stack commands.
#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Create a stack and tail its events to completion
    Create(CreateArgs),
    /// Update a stack and tail its events to completion
    Update(UpdateArgs),
    /// Delete one or more stacks
    Delete(DeleteArgs),
    /// Tail events of an in-flight stack operation
    Tail(TailArgs),
    /// Print the current event history of a stack
    Events(EventsArgs),
    /// Show live stack status, parameters, tags, and capabilities
    Status(StatusArgs),
    /// Diff local template/params against the live stack
    Diff(DiffArgs),
}

/// Create command inputs.
#[derive(Parser, Debug)]
#[command(about = "Create a stack from its template and optional params")]
pub(crate) struct CreateArgs {
    /// Stack name, template path, or params path; or `stack template [params]`
    #[arg(value_name = "ARG", required = true, num_args = 1..=3)]
    pub(crate) args: Vec<String>,

    /// IAM capability to acknowledge (repeatable)
    #[arg(long, value_name = "CAP")]
    pub(crate) capabilities: Vec<String>,

    /// Service role assumed by the remote service for this operation
    #[arg(long, value_name = "ARN")]
    pub(crate) role_arn: Option<String>,

    /// Submit without waiting for a terminal status
    #[arg(long)]
    pub(crate) no_wait: bool,
}

/// Update command inputs.
#[derive(Parser, Debug)]
#[command(about = "Update a stack from its template and optional params")]
pub(crate) struct UpdateArgs {
    /// Stack name, template path, or params path; or `stack template [params]`
    #[arg(value_name = "ARG", required = true, num_args = 1..=3)]
    pub(crate) args: Vec<String>,

    /// IAM capability to acknowledge (repeatable)
    #[arg(long, value_name = "CAP")]
    pub(crate) capabilities: Vec<String>,

    /// Submit without waiting for a terminal status
    #[arg(long)]
    pub(crate) no_wait: bool,
}

/// Delete command inputs. Each stack is processed independently; one
/// failure does not abort the rest.
#[derive(Parser, Debug)]
#[command(about = "Delete one or more stacks")]
pub(crate) struct DeleteArgs {
    /// Stack names (or template/params paths to infer them from)
    #[arg(value_name = "STACK", required = true)]
    pub(crate) stacks: Vec<String>,

    /// Submit without waiting for each stack to disappear
    #[arg(long)]
    pub(crate) no_wait: bool,
}

/// Tail command inputs.
#[derive(Parser, Debug)]
#[command(about = "Tail stack events until a terminal status")]
pub(crate) struct TailArgs {
    /// Stack name, template path, or params path
    #[arg(value_name = "STACK")]
    pub(crate) token: String,
}

/// Events command inputs.
#[derive(Parser, Debug)]
#[command(about = "Print the stack's full event history once")]
pub(crate) struct EventsArgs {
    /// Stack name, template path, or params path
    #[arg(value_name = "STACK")]
    pub(crate) token: String,
}

/// Status command inputs.
#[derive(Parser, Debug)]
#[command(about = "Show live stack status and settings")]
pub(crate) struct StatusArgs {
    /// Stack name, template path, or params path
    #[arg(value_name = "STACK")]
    pub(crate) token: String,
}

/// Diff command inputs.
#[derive(Parser, Debug)]
#[command(about = "Diff local artifacts against the live stack")]
pub(crate) struct DiffArgs {
    /// Stack name, template path, or params path; or `stack template [params]`
    #[arg(value_name = "ARG", required = true, num_args = 1..=3)]
    pub(crate) args: Vec<String>,
}
