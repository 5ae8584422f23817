//! Harness adapters (C10) and the target composer (C9): one
//! `HarnessAdapter` implementation per supported coding-agent harness,
//! dispatched through a registry so shared code never branches on a
//! harness id.

pub mod adapter;
pub mod bundle;
pub mod claude;
pub mod codex;
pub mod pi;
pub mod quoting;
pub mod registry;

pub use adapter::{mcp_merge_warning, ComposeOutcome, ComposeTargetInput, DetectResult, HarnessAdapter, MaterializeSpaceInput, ValidateResult};
pub use bundle::{Bundle, RunOptions};
pub use claude::ClaudeAdapter;
pub use codex::CodexAdapter;
pub use pi::PiAdapter;
pub use quoting::{posix_quote, render_command};
pub use registry::{HarnessRegistry, DEFAULT_HARNESS_ID};

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("i/o error at {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to materialize space {space_id}")]
    Materialize {
        space_id: String,
        #[source]
        source: asp_materialize::MaterializeError,
    },
    #[error("failed to serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to assemble bundle at {path}")]
    Bundle {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
    #[error("unknown harness {id:?}; known harnesses: {known_ids:?}")]
    NotFound { id: String, known_ids: Vec<String> },
    #[error("{harness_id} exited with status {exit_code}: {stderr}")]
    Invocation {
        harness_id: String,
        exit_code: i32,
        stderr: String,
    },
}

impl HarnessError {
    pub fn io(path: impl std::fmt::Display, source: std::io::Error) -> Self {
        HarnessError::Io { path: path.to_string(), source }
    }
}
