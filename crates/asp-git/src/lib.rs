//! # asp-git
//!
//! A thin safe-exec layer over a `git` executable on `PATH`. Every call is
//! an explicit subprocess invocation with explicit cwd/env/timeout; a
//! non-zero exit raises [`GitError::NonZeroExit`] with both stderr streams
//! verbatim unless the caller opts to ignore failures. There is no
//! in-process git library here by design (spec Non-goal): the registry's
//! wire protocol and object model are whatever the local `git` binary
//! understands.
//!
//! ## Modules
//!
//! - [`exec`] — subprocess execution with a pollable timeout
//! - [`adapter`] — the `GitAdapter` surface: `show`, `ls_tree`, `archive`
//!   extraction, tag enumeration/dereference, `rev_parse`, `status`,
//!   `remote`, and the write operations (`init`, `add`, `commit`, tag
//!   create/push/delete, `clone`).

pub mod adapter;
pub mod exec;

pub use adapter::{GitAdapter, RemoteEntry, TreeEntry, TreeEntryType};

use std::time::Duration;

/// Default timeout for clone/fetch/push; everything else uses
/// [`DEFAULT_TIMEOUT`].
pub const CLONE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Default timeout for all other git subcommands.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2 * 60);

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {subcommand} failed (exit {exit_code}): {stderr}")]
    NonZeroExit {
        subcommand: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("git {subcommand} timed out after {timeout:?}")]
    Timeout { subcommand: String, timeout: Duration },

    #[error("git {subcommand}: unexpected output: {detail}")]
    UnexpectedOutput { subcommand: String, detail: String },

    #[error("tar extraction failed: {0}")]
    TarFailure(String),
}
