//! Error taxonomy for resolution, remote calls, and tailing.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to complete an artifact triple from the filesystem.
///
/// Resolution is deterministic over the filesystem state at call time, so
/// these are never retried. Checks run in a fixed order (stack, template,
/// params) and the first failing one is reported.
#[derive(Debug, Error)]
pub(crate) enum ResolutionError {
    #[error("no stack name could be determined from the supplied arguments")]
    MissingStack,

    #[error("no template found for stack {stack} (searched the working directory and params/)")]
    MissingTemplate { stack: String },

    #[error("parameters file {} does not exist", path.display())]
    MissingParams { path: PathBuf },

    #[error("cannot classify argument {token}; pass an explicit `stack template [params]` list")]
    Ambiguous { token: String },
}

/// Failure reported by the remote orchestration service.
///
/// One-shot operations surface these immediately; the service owns its own
/// idempotency and locking, so nothing is retried here.
#[derive(Debug, Error)]
pub(crate) enum RemoteError {
    #[error("stack {stack} not found: {message}")]
    NotFound { stack: String, message: String },

    #[error("request throttled by the remote service: {message}")]
    Throttled { message: String },

    #[error("remote call failed: {message}")]
    ServiceFailure { message: String },
}

/// Failure that ended a tail loop before a terminal stack status.
#[derive(Debug, Error)]
pub(crate) enum TailError {
    #[error("event fetch failed: {0}")]
    FetchFailed(#[from] RemoteError),
}

impl TailError {
    /// True when the tail stopped because the stack is gone from the
    /// remote service, the expected end state after a delete completes.
    pub(crate) fn is_not_found(&self) -> bool {
        matches!(self, TailError::FetchFailed(RemoteError::NotFound { .. }))
    }
}
