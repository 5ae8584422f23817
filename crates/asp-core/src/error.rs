//! The orchestrator's error type: mostly a thin wrapper that names
//! which subject (target, space, harness) a lower-level crate's error
//! happened against, per the propagation policy in §5.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("i/o error at {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}")]
    TomlParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("no target named {target:?} in the project manifest")]
    UnknownTarget { target: String },
    #[error("failed to resolve the dependency closure for target {target:?}: {source}")]
    Closure {
        target: String,
        #[source]
        source: asp_closure::ClosureError,
    },
    #[error("failed to snapshot {space_id}@{commit}: {source}")]
    Store {
        space_id: String,
        commit: String,
        #[source]
        source: asp_store::StoreError,
    },
    #[error("lock validation failed: {0}")]
    LockValidation(#[from] asp_lock::LockValidationError),
    #[error("failed to serialize lock: {0}")]
    LockSerialize(#[from] serde_json::Error),
    #[error(transparent)]
    LockTimeout(#[from] asp_lock::LockTimeoutError),
    #[error("failed to remove a reference: {0}")]
    Remove(#[from] asp_lock::RemoveError),
    #[error("failed to materialize space {space_id} for harness {harness_id}: {source}")]
    Materialize {
        harness_id: String,
        space_id: String,
        #[source]
        source: asp_harness::HarnessError,
    },
    #[error(transparent)]
    Harness(#[from] asp_harness::HarnessError),
    #[error("{harness_id} exited with status {exit_code}")]
    HarnessExit { harness_id: String, exit_code: i32 },
    #[error("operation cancelled")]
    Cancelled,
    #[error("timed out after {timeout:?} waiting on {subject}")]
    Timeout { subject: String, timeout: Duration },
    #[error("gc home directory {path} is unavailable")]
    GcHome { path: PathBuf },
    #[error("garbage collection failed: {0}")]
    Gc(#[from] asp_store::StoreError),
}

impl CoreError {
    pub fn io(path: impl std::fmt::Display, source: std::io::Error) -> Self {
        CoreError::Io { path: path.to_string(), source }
    }
}
