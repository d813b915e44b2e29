//! stackctl: manage cloud infrastructure stacks by naming convention.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod artifact;
mod cli;
mod compare;
mod diff;
mod error;
mod remote;
mod resolve;
mod tail;

use cli::{
    Command, CreateArgs, DeleteArgs, DiffArgs, EventsArgs, RootArgs, StatusArgs, TailArgs,
    UpdateArgs,
};
use remote::{AwsCli, DeployRequest, StackClient};
use resolve::{partial_from_args, ArtifactTriple, Needs, Resolver};
use tail::Tailer;

fn main() {
    init_logging();
    let args = RootArgs::parse();
    if let Err(err) = run(args) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(args: RootArgs) -> Result<()> {
    let client = AwsCli::from_env()?;
    let resolver = Resolver::current_dir()?;
    match args.command {
        Command::Create(args) => cmd_create(&client, &resolver, args),
        Command::Update(args) => cmd_update(&client, &resolver, args),
        Command::Delete(args) => cmd_delete(&client, &resolver, args),
        Command::Tail(args) => cmd_tail(&client, &resolver, args),
        Command::Events(args) => cmd_events(&client, &resolver, args),
        Command::Status(args) => cmd_status(&client, &resolver, args),
        Command::Diff(args) => cmd_diff(&client, &resolver, args),
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stackctl=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn cmd_create(client: &dyn StackClient, resolver: &Resolver, args: CreateArgs) -> Result<()> {
    let triple = resolver.resolve(partial_from_args(&args.args)?, Needs::Template)?;
    let request = deploy_request(&triple, &args.capabilities, args.role_arn.as_deref())?;
    let stack_id = client.create_stack(&request)?;
    println!("{stack_id}");
    tracing::info!(stack = %triple.stack, "create submitted");
    if args.no_wait {
        return Ok(());
    }
    tail_to_end(client, &triple.stack)
}

fn cmd_update(client: &dyn StackClient, resolver: &Resolver, args: UpdateArgs) -> Result<()> {
    let triple = resolver.resolve(partial_from_args(&args.args)?, Needs::Template)?;
    let request = deploy_request(&triple, &args.capabilities, None)?;
    let stack_id = client.update_stack(&request)?;
    println!("{stack_id}");
    tracing::info!(stack = %triple.stack, "update submitted");
    if args.no_wait {
        return Ok(());
    }
    tail_to_end(client, &triple.stack)
}

fn cmd_delete(client: &dyn StackClient, resolver: &Resolver, args: DeleteArgs) -> Result<()> {
    let mut failures = 0usize;
    for token in &args.stacks {
        if let Err(err) = delete_one(client, resolver, token, args.no_wait) {
            failures += 1;
            eprintln!("delete {token}: {err:#}");
        }
    }
    if failures > 0 {
        return Err(anyhow!(
            "{failures} of {} delete operations failed",
            args.stacks.len()
        ));
    }
    Ok(())
}

fn delete_one(
    client: &dyn StackClient,
    resolver: &Resolver,
    token: &str,
    no_wait: bool,
) -> Result<()> {
    let tokens = [token.to_string()];
    let triple = resolver.resolve(partial_from_args(&tokens)?, Needs::StackOnly)?;
    client.delete_stack(&triple.stack)?;
    tracing::info!(stack = %triple.stack, "delete submitted");
    if no_wait {
        return Ok(());
    }
    let mut tailer = Tailer::new(client, triple.stack.as_str());
    for line in &mut tailer {
        match line {
            Ok(line) => println!("{line}"),
            // The stack dropping out of the service is how a delete
            // normally finishes.
            Err(err) if err.is_not_found() => {
                tracing::info!(stack = %triple.stack, "stack no longer reported; delete finished");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn cmd_tail(client: &dyn StackClient, resolver: &Resolver, args: TailArgs) -> Result<()> {
    let triple = resolve_single(resolver, &args.token, Needs::StackOnly)?;
    tail_to_end(client, &triple.stack)
}

fn cmd_events(client: &dyn StackClient, resolver: &Resolver, args: EventsArgs) -> Result<()> {
    let triple = resolve_single(resolver, &args.token, Needs::StackOnly)?;
    for event in client.describe_events(&triple.stack)? {
        println!("{}", tail::render_event(&event));
    }
    Ok(())
}

fn cmd_status(client: &dyn StackClient, resolver: &Resolver, args: StatusArgs) -> Result<()> {
    let triple = resolve_single(resolver, &args.token, Needs::StackOnly)?;
    let description = client.describe_stack(&triple.stack)?;
    println!("Stack:  {}", triple.stack);
    println!("Status: {}", description.stack_status);
    if !description.parameters.is_empty() {
        println!("Parameters:");
        for parameter in &description.parameters {
            println!("  {}: {}", parameter.parameter_key, parameter.parameter_value);
        }
    }
    if !description.tags.is_empty() {
        println!("Tags:");
        for tag in &description.tags {
            println!("  {}: {}", tag.key, tag.value);
        }
    }
    if !description.capabilities.is_empty() {
        println!("Capabilities: {}", description.capabilities.join(", "));
    }
    Ok(())
}

fn cmd_diff(client: &dyn StackClient, resolver: &Resolver, args: DiffArgs) -> Result<()> {
    let triple = resolver.resolve(partial_from_args(&args.args)?, Needs::Template)?;
    let sections = compare::compare_stack(client, &triple)?;
    let mut differs = false;
    for section in &sections {
        if section.is_empty() {
            continue;
        }
        differs = true;
        println!("{}:", section.section);
        for line in &section.remote_only {
            println!("- {line}");
        }
        for line in &section.local_only {
            println!("+ {line}");
        }
    }
    if !differs {
        println!("no differences");
    }
    Ok(())
}

fn resolve_single(resolver: &Resolver, token: &str, needs: Needs) -> Result<ArtifactTriple> {
    let tokens = [token.to_string()];
    Ok(resolver.resolve(partial_from_args(&tokens)?, needs)?)
}

fn deploy_request<'a>(
    triple: &'a ArtifactTriple,
    capabilities: &'a [String],
    role_arn: Option<&'a str>,
) -> Result<DeployRequest<'a>> {
    let template = triple
        .template
        .as_ref()
        .ok_or_else(|| anyhow!("no template resolved for {}", triple.stack))?;
    let template_body = fs::read_to_string(template)
        .with_context(|| format!("read template {}", template.display()))?;
    let parameters = match &triple.params {
        Some(params) => Some(
            fs::read_to_string(params)
                .with_context(|| format!("read parameters {}", params.display()))?,
        ),
        None => None,
    };
    Ok(DeployRequest {
        stack: &triple.stack,
        template_body,
        parameters,
        capabilities,
        role_arn,
    })
}

fn tail_to_end(client: &dyn StackClient, stack: &str) -> Result<()> {
    let mut tailer = Tailer::new(client, stack);
    for line in &mut tailer {
        println!("{}", line?);
    }
    if let Some(status) = tailer.outcome() {
        tracing::info!(stack, status, "stack reached terminal status");
    }
    Ok(())
}
