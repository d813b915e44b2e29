//! Remote stack-orchestration client, driven through the `aws` CLI.
//!
//! The orchestration service is an external collaborator: this module only
//! wraps its call-response surface. The production client shells out to
//! `aws cloudformation <op> --output json` and parses the JSON reply; the
//! argv prefix can be overridden with `STACKCTL_AWS_COMMAND` (a
//! shell-quoted string), which is also how tests substitute a stub
//! service. Nothing here retries: the service enforces its own
//! idempotency and locking.

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::env;
use std::process::Command;

use crate::error::RemoteError;

/// Environment variable holding a shell-quoted argv prefix that replaces
/// the default `aws` program.
pub(crate) const COMMAND_ENV: &str = "STACKCTL_AWS_COMMAND";

/// One event from a stack's history.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct EventRecord {
    pub(crate) timestamp: String,
    pub(crate) logical_resource_id: String,
    pub(crate) resource_type: String,
    pub(crate) resource_status: String,
    #[serde(default)]
    pub(crate) physical_resource_id: Option<String>,
    #[serde(default, rename = "ResourceStatusReason")]
    pub(crate) status_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct StackParameter {
    pub(crate) parameter_key: String,
    pub(crate) parameter_value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StackTag {
    #[serde(rename = "Key")]
    pub(crate) key: String,
    #[serde(rename = "Value")]
    pub(crate) value: String,
}

/// Live stack state as reported by describe-stacks.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct StackDescription {
    pub(crate) stack_status: String,
    #[serde(default)]
    pub(crate) parameters: Vec<StackParameter>,
    #[serde(default)]
    pub(crate) tags: Vec<StackTag>,
    #[serde(default)]
    pub(crate) capabilities: Vec<String>,
}

/// Inputs for a create or update submission. `parameters` is the raw
/// parameters document (a JSON array of key/value entries) passed through
/// verbatim; `role_arn` only applies to create.
#[derive(Debug)]
pub(crate) struct DeployRequest<'a> {
    pub(crate) stack: &'a str,
    pub(crate) template_body: String,
    pub(crate) parameters: Option<String>,
    pub(crate) capabilities: &'a [String],
    pub(crate) role_arn: Option<&'a str>,
}

/// Control operations the CLI consumes. `describe_events` returns the
/// full history ordered by timestamp ascending, service return order
/// breaking ties.
pub(crate) trait StackClient {
    fn create_stack(&self, request: &DeployRequest) -> Result<String, RemoteError>;
    fn update_stack(&self, request: &DeployRequest) -> Result<String, RemoteError>;
    fn delete_stack(&self, stack: &str) -> Result<(), RemoteError>;
    fn describe_events(&self, stack: &str) -> Result<Vec<EventRecord>, RemoteError>;
    fn get_template(&self, stack: &str) -> Result<Value, RemoteError>;
    fn describe_stack(&self, stack: &str) -> Result<StackDescription, RemoteError>;
}

pub(crate) struct AwsCli {
    argv: Vec<String>,
}

impl AwsCli {
    /// Build the client from `STACKCTL_AWS_COMMAND`, falling back to an
    /// `aws` binary located on PATH.
    pub(crate) fn from_env() -> Result<Self> {
        if let Ok(raw) = env::var(COMMAND_ENV) {
            let argv =
                shell_words::split(&raw).with_context(|| format!("parse {COMMAND_ENV}"))?;
            if argv.is_empty() {
                return Err(anyhow!("{COMMAND_ENV} is empty"));
            }
            return Ok(Self { argv });
        }
        let aws = which::which("aws").context("aws CLI not found on PATH")?;
        Ok(Self {
            argv: vec![aws.display().to_string()],
        })
    }

    fn invoke(&self, op: &str, stack: &str, args: &[String]) -> Result<Vec<u8>, RemoteError> {
        let mut argv = self.argv.clone();
        let program = argv.remove(0);
        tracing::debug!(op, stack, "invoking remote service");
        let output = Command::new(&program)
            .args(&argv)
            .arg("cloudformation")
            .arg(op)
            .args(args)
            .args(["--output", "json"])
            .output()
            .map_err(|err| RemoteError::ServiceFailure {
                message: format!("spawn {program}: {err}"),
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(stack, &stderr));
        }
        Ok(output.stdout)
    }

    fn invoke_parsed<T: DeserializeOwned>(
        &self,
        op: &str,
        stack: &str,
        args: &[String],
    ) -> Result<T, RemoteError> {
        let stdout = self.invoke(op, stack, args)?;
        serde_json::from_slice(&stdout).map_err(|err| RemoteError::ServiceFailure {
            message: format!("parse {op} response: {err}"),
        })
    }

    fn deploy_args(request: &DeployRequest) -> Vec<String> {
        let mut args = vec![
            "--stack-name".to_string(),
            request.stack.to_string(),
            "--template-body".to_string(),
            request.template_body.clone(),
        ];
        if let Some(parameters) = &request.parameters {
            args.push("--parameters".to_string());
            args.push(parameters.clone());
        }
        for capability in request.capabilities {
            args.push("--capabilities".to_string());
            args.push(capability.clone());
        }
        if let Some(role_arn) = request.role_arn {
            args.push("--role-arn".to_string());
            args.push(role_arn.to_string());
        }
        args
    }
}

impl StackClient for AwsCli {
    fn create_stack(&self, request: &DeployRequest) -> Result<String, RemoteError> {
        let response: StackIdResponse =
            self.invoke_parsed("create-stack", request.stack, &Self::deploy_args(request))?;
        Ok(response.stack_id)
    }

    fn update_stack(&self, request: &DeployRequest) -> Result<String, RemoteError> {
        let response: StackIdResponse =
            self.invoke_parsed("update-stack", request.stack, &Self::deploy_args(request))?;
        Ok(response.stack_id)
    }

    fn delete_stack(&self, stack: &str) -> Result<(), RemoteError> {
        self.invoke(
            "delete-stack",
            stack,
            &["--stack-name".to_string(), stack.to_string()],
        )?;
        Ok(())
    }

    fn describe_events(&self, stack: &str) -> Result<Vec<EventRecord>, RemoteError> {
        let response: DescribeEventsResponse = self.invoke_parsed(
            "describe-stack-events",
            stack,
            &["--stack-name".to_string(), stack.to_string()],
        )?;
        Ok(order_events(response.stack_events))
    }

    fn get_template(&self, stack: &str) -> Result<Value, RemoteError> {
        let response: GetTemplateResponse = self.invoke_parsed(
            "get-template",
            stack,
            &["--stack-name".to_string(), stack.to_string()],
        )?;
        Ok(response.template_body)
    }

    fn describe_stack(&self, stack: &str) -> Result<StackDescription, RemoteError> {
        let response: DescribeStacksResponse = self.invoke_parsed(
            "describe-stacks",
            stack,
            &["--stack-name".to_string(), stack.to_string()],
        )?;
        response
            .stacks
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::NotFound {
                stack: stack.to_string(),
                message: "describe-stacks returned no entries".to_string(),
            })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StackIdResponse {
    stack_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeEventsResponse {
    #[serde(default)]
    stack_events: Vec<EventRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetTemplateResponse {
    template_body: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStacksResponse {
    #[serde(default)]
    stacks: Vec<StackDescription>,
}

/// Normalize a history to timestamp-ascending order. The service returns
/// newest-first, so reverse before the stable sort to keep its return
/// order for equal timestamps.
fn order_events(mut events: Vec<EventRecord>) -> Vec<EventRecord> {
    events.reverse();
    events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    events
}

fn classify_failure(stack: &str, stderr: &str) -> RemoteError {
    let message = stderr.trim().to_string();
    if matches_pattern(r"(?i)does not exist|no such stack|NotFound", &message) {
        return RemoteError::NotFound {
            stack: stack.to_string(),
            message,
        };
    }
    if matches_pattern(r"(?i)throttl|rate exceeded", &message) {
        return RemoteError::Throttled { message };
    }
    RemoteError::ServiceFailure { message }
}

fn matches_pattern(pattern: &str, text: &str) -> bool {
    Regex::new(pattern)
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}
