//! Convention-based resolution of {stack, template, params} triples.
//!
//! Given any one of a stack name, template path, or parameters path, the
//! resolver derives the other two by probing a base directory and its
//! `params/` sibling (current directory first, then `params/`; inverted to
//! the parent when the base directory is itself named `params`). Stack
//! names strip their `-<env>` suffixes one token at a time until a
//! matching template file turns up.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::artifact::{
    self, file_stem, stack_from_params, stack_from_template, strip_last_suffix,
    template_slug_from_params, TEMPLATE_EXTENSIONS,
};
use crate::error::ResolutionError;

/// Artifacts already known before resolution. Built from classified or
/// explicit CLI arguments, never persisted.
#[derive(Debug, Default, Clone)]
pub(crate) struct PartialTriple {
    pub(crate) stack: Option<String>,
    pub(crate) template: Option<PathBuf>,
    pub(crate) params: Option<PathBuf>,
}

/// Fully resolved artifact set for one invocation.
///
/// `params` stays `None` when no parameters file exists; that is a valid
/// outcome, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ArtifactTriple {
    pub(crate) stack: String,
    pub(crate) template: Option<PathBuf>,
    pub(crate) params: Option<PathBuf>,
}

/// Whether the invocation mutates the stack and therefore needs an
/// existing template on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Needs {
    StackOnly,
    Template,
}

pub(crate) struct Resolver {
    base: PathBuf,
}

impl Resolver {
    pub(crate) fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub(crate) fn current_dir() -> Result<Self> {
        let base = env::current_dir().context("resolve working directory")?;
        Ok(Self::new(base))
    }

    /// Fill in the unknown artifacts, then run the three checks in order:
    /// stack, template (mutating operations only), explicit params.
    pub(crate) fn resolve(
        &self,
        known: PartialTriple,
        needs: Needs,
    ) -> Result<ArtifactTriple, ResolutionError> {
        let explicit_params = known.params.clone();

        let stack = match known.stack {
            Some(stack) => stack,
            None => match (&known.params, &known.template) {
                (Some(params), _) => stack_from_params(params),
                (None, Some(template)) => stack_from_template(template),
                (None, None) => return Err(ResolutionError::MissingStack),
            },
        };
        if stack.is_empty() {
            return Err(ResolutionError::MissingStack);
        }

        let template = match known.template {
            Some(template) => Some(template),
            None => match &known.params {
                Some(params) => self.template_from_params(params),
                None => self.template_from_stack(&stack),
            },
        };

        if needs == Needs::Template {
            let found = template
                .as_ref()
                .is_some_and(|template| self.exists(template));
            if !found {
                return Err(ResolutionError::MissingTemplate { stack });
            }
        }

        let params = match explicit_params {
            Some(params) => {
                if !self.exists(&params) {
                    return Err(ResolutionError::MissingParams { path: params });
                }
                Some(params)
            }
            None => template
                .as_ref()
                .and_then(|template| self.params_from_stack_and_template(&stack, template)),
        };

        tracing::debug!(stack = %stack, ?template, ?params, "resolved artifact triple");
        Ok(ArtifactTriple {
            stack,
            template,
            params,
        })
    }

    /// Search roots relative to the base directory: the base itself, then
    /// `params/` (or the parent when the base is a `params` directory).
    fn search_roots(&self) -> [PathBuf; 2] {
        if self.base.file_name().is_some_and(|name| name == "params") {
            [PathBuf::new(), PathBuf::from("..")]
        } else {
            [PathBuf::new(), PathBuf::from("params")]
        }
    }

    fn exists(&self, path: &Path) -> bool {
        if path.is_absolute() {
            path.is_file()
        } else {
            self.base.join(path).is_file()
        }
    }

    fn find_in_roots(&self, filename: &str) -> Option<PathBuf> {
        for root in self.search_roots() {
            let candidate = root.join(filename);
            if self.exists(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// Probe `<candidate>.{json,yml,yaml}` in the search roots, stripping
    /// the trailing `-<suffix>` token between rounds. At most one round per
    /// dash-separated segment of the stack name.
    fn template_from_stack(&self, stack: &str) -> Option<PathBuf> {
        let mut candidate = stack.to_string();
        loop {
            if let Some(found) = self.find_template_stem(&candidate) {
                return Some(found);
            }
            match strip_last_suffix(&candidate) {
                Some(shorter) => candidate = shorter.to_string(),
                None => return None,
            }
        }
    }

    fn find_template_stem(&self, stem: &str) -> Option<PathBuf> {
        for root in self.search_roots() {
            for ext in TEMPLATE_EXTENSIONS {
                let candidate = root.join(format!("{stem}.{ext}"));
                if self.exists(&candidate) {
                    return Some(candidate);
                }
            }
        }
        None
    }

    fn template_from_params(&self, params: &Path) -> Option<PathBuf> {
        self.find_template_stem(&template_slug_from_params(params))
    }

    /// Params candidate from the template slug plus whatever the stack name
    /// carries beyond it. Absence is not an error.
    fn params_from_stack_and_template(&self, stack: &str, template: &Path) -> Option<PathBuf> {
        let slug = file_stem(template);
        let candidate = if stack == slug {
            format!("{slug}-params.json")
        } else if let Some(suffix) = stack.strip_prefix(&format!("{slug}-")) {
            format!("{slug}-params-{suffix}.json")
        } else {
            format!("{slug}-params-{stack}.json")
        };
        self.find_in_roots(&candidate)
    }
}

/// Build a partial triple from positional CLI arguments. A single token is
/// classified by shape; two or three tokens are an explicit ordered
/// `stack template [params]` list.
pub(crate) fn partial_from_args(args: &[String]) -> Result<PartialTriple, ResolutionError> {
    match args {
        [token] => match artifact::classify(token) {
            artifact::ArgKind::Stack(stack) => Ok(PartialTriple {
                stack: Some(stack),
                ..PartialTriple::default()
            }),
            artifact::ArgKind::Template(template) => Ok(PartialTriple {
                template: Some(template),
                ..PartialTriple::default()
            }),
            artifact::ArgKind::Params(params) => Ok(PartialTriple {
                params: Some(params),
                ..PartialTriple::default()
            }),
            artifact::ArgKind::Ambiguous(token) => Err(ResolutionError::Ambiguous { token }),
        },
        [stack, template, rest @ ..] => Ok(PartialTriple {
            stack: Some(stack.clone()),
            template: Some(PathBuf::from(template)),
            params: rest.first().map(PathBuf::from),
        }),
        [] => Err(ResolutionError::MissingStack),
    }
}
