//! `ASP_HOME` layout: the root of the content-addressed store.

use std::path::{Path, PathBuf};

/// Root of the content-addressed store and global lock, threaded
/// through explicitly (design note: no global mutable state) rather
/// than read from the environment deep inside the store.
#[derive(Debug, Clone)]
pub struct AspHome {
    root: PathBuf,
}

impl AspHome {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `ASP_HOME`, falling back to the platform user-data directory.
    pub fn from_env() -> Self {
        if let Ok(home) = std::env::var("ASP_HOME") {
            return Self::new(home);
        }
        let base = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        Self::new(base.join("asp"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.root.join("snapshots")
    }

    pub fn snapshot_dir(&self, integrity_hex: &str) -> PathBuf {
        self.snapshots_dir().join(integrity_hex)
    }

    pub fn cache_dir(&self, harness_id: &str, env_hash: &str, integrity_hex: &str) -> PathBuf {
        self.root.join("cache").join(harness_id).join(env_hash).join(integrity_hex)
    }

    pub fn cache_root(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn global_lock_path(&self) -> PathBuf {
        self.root.join("locks").join("global.lock.json")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.snapshots_dir())?;
        std::fs::create_dir_all(self.cache_root())?;
        std::fs::create_dir_all(self.root.join("locks"))?;
        std::fs::create_dir_all(self.tmp_dir())?;
        Ok(())
    }
}
