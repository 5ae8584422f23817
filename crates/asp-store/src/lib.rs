//! The content-addressed snapshot store, the per-harness build cache
//! layered on top of it, and the garbage collector that sweeps both.

pub mod cache;
pub mod gc;
pub mod home;
pub mod snapshot;
pub mod stage;

pub use home::AspHome;
pub use gc::{sweep, GcReport};
pub use snapshot::{
    create_snapshot, delete_snapshot, list_snapshots, snapshot_exists, snapshot_size,
    verify_snapshot, SnapshotMetadata,
};

use std::fmt;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("i/o error at {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: malformed json")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot store a snapshot for a non-content-addressed commit (dev/project)")]
    NotContentAddressed,

    #[error("failed to hash tree for {space_id}@{commit}")]
    Integrity {
        space_id: String,
        commit: String,
        #[source]
        source: asp_integrity::IntegrityError,
    },

    #[error("failed to materialize snapshot for {space_id}@{commit}")]
    Snapshot {
        space_id: String,
        commit: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to populate cache entry for harness {harness_id}, integrity {integrity_hex}")]
    Cache {
        harness_id: String,
        integrity_hex: String,
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    pub fn io(path: impl fmt::Display, source: std::io::Error) -> Self {
        StoreError::Io { path: path.to_string(), source }
    }
}
