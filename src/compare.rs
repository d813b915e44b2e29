//! Compare local template/parameter artifacts against the live stack.
//!
//! Both sides are canonicalized (JSON value round-trip, which sorts object
//! keys) and the same snapshot difference used by the tailer reports the
//! blocks present on only one side. YAML templates that use non-plain
//! syntax fall back to raw-text lines.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::diff::snapshot_delta;
use crate::remote::{StackClient, StackParameter};
use crate::resolve::ArtifactTriple;

/// One compared section, with the lines unique to each side.
pub(crate) struct Comparison {
    pub(crate) section: &'static str,
    pub(crate) local_only: Vec<String>,
    pub(crate) remote_only: Vec<String>,
}

impl Comparison {
    pub(crate) fn is_empty(&self) -> bool {
        self.local_only.is_empty() && self.remote_only.is_empty()
    }
}

/// Diff the resolved local artifacts against the remote template and
/// parameters. The template must already be resolved; params may be absent
/// on either side.
pub(crate) fn compare_stack(
    client: &dyn StackClient,
    triple: &ArtifactTriple,
) -> Result<Vec<Comparison>> {
    let mut sections = Vec::new();

    if let Some(template) = &triple.template {
        let text = fs::read_to_string(template)
            .with_context(|| format!("read template {}", template.display()))?;
        let local = canonical_template_lines(template, &text)?;
        let remote = canonical_remote_template_lines(&client.get_template(&triple.stack)?)?;
        sections.push(Comparison {
            section: "template",
            local_only: snapshot_delta(&remote, &local),
            remote_only: snapshot_delta(&local, &remote),
        });
    }

    let local_params = match &triple.params {
        Some(params) => {
            let text = fs::read_to_string(params)
                .with_context(|| format!("read parameters {}", params.display()))?;
            let parsed: Vec<StackParameter> = serde_json::from_str(&text)
                .with_context(|| format!("parse parameters {}", params.display()))?;
            parsed
        }
        None => Vec::new(),
    };
    let remote_params = client.describe_stack(&triple.stack)?.parameters;
    let local = canonical_parameter_lines(local_params);
    let remote = canonical_parameter_lines(remote_params);
    sections.push(Comparison {
        section: "parameters",
        local_only: snapshot_delta(&remote, &local),
        remote_only: snapshot_delta(&local, &remote),
    });

    Ok(sections)
}

/// Canonical lines for a local template document. JSON and plain YAML both
/// round-trip through a JSON value for stable key ordering.
fn canonical_template_lines(path: &Path, text: &str) -> Result<Vec<String>> {
    let parsed: Option<Value> = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(text).ok()
    } else {
        serde_yaml::from_str(text).ok()
    };
    match parsed {
        Some(value) => canonical_json_lines(&value),
        None => Ok(raw_lines(text)),
    }
}

/// The service returns JSON templates as a document and YAML templates as
/// the original text.
fn canonical_remote_template_lines(body: &Value) -> Result<Vec<String>> {
    match body {
        Value::String(text) => {
            let parsed: Option<Value> = serde_json::from_str(text)
                .ok()
                .or_else(|| serde_yaml::from_str(text).ok());
            match parsed {
                Some(value) => canonical_json_lines(&value),
                None => Ok(raw_lines(text)),
            }
        }
        value => canonical_json_lines(value),
    }
}

fn canonical_json_lines(value: &Value) -> Result<Vec<String>> {
    let text = serde_json::to_string_pretty(value).context("canonicalize document")?;
    Ok(text.lines().map(str::to_string).collect())
}

fn raw_lines(text: &str) -> Vec<String> {
    text.lines().map(|line| line.trim_end().to_string()).collect()
}

fn canonical_parameter_lines(mut parameters: Vec<StackParameter>) -> Vec<String> {
    parameters.sort_by(|a, b| a.parameter_key.cmp(&b.parameter_key));
    parameters
        .into_iter()
        .map(|parameter| format!("{}: {}", parameter.parameter_key, parameter.parameter_value))
        .collect()
}
