//! Garbage collection: sweep snapshots and cache entries that aren't
//! reachable from any known lock file, freeing space reclaimed by
//! removed or upgraded dependencies.

use std::collections::HashSet;

use asp_types::Integrity;

use crate::cache::{delete_cache_entry, list_cache_entries};
use crate::home::AspHome;
use crate::snapshot::{delete_snapshot, list_snapshots, snapshot_size};
use crate::StoreError;

#[derive(Debug, Clone, Default)]
pub struct GcReport {
    pub removed_snapshots: Vec<String>,
    pub removed_cache_entries: Vec<(String, String, String)>,
    pub bytes_freed: u64,
    pub dry_run: bool,
}

/// A cache key is `(harness_id, env_hash, integrity_hex)`. `reachable`
/// names every snapshot integrity still referenced by a lock file
/// anywhere asp knows about; entries outside it are swept. Cache
/// entries are reachable only if their snapshot integrity is also
/// reachable — a cache entry for a dangling snapshot is itself
/// dangling.
pub fn sweep(
    home: &AspHome,
    reachable_snapshot_hex: &HashSet<String>,
    reachable_cache_keys: &HashSet<(String, String, String)>,
    dry_run: bool,
) -> Result<GcReport, StoreError> {
    let mut report = GcReport { dry_run, ..Default::default() };

    for hex in list_snapshots(home)? {
        if reachable_snapshot_hex.contains(&hex) {
            continue;
        }
        let integrity = Integrity::of_hex(hex.clone());
        report.bytes_freed += snapshot_size(home, &integrity).unwrap_or(0);
        if !dry_run {
            delete_snapshot(home, &integrity)?;
        }
        tracing::debug!(integrity = %hex, dry_run, "sweeping unreachable snapshot");
        report.removed_snapshots.push(hex);
    }

    for (harness_id, env_hash, integrity_hex) in list_cache_entries(home)? {
        let key = (harness_id.clone(), env_hash.clone(), integrity_hex.clone());
        if reachable_cache_keys.contains(&key) && reachable_snapshot_hex.contains(&integrity_hex) {
            continue;
        }
        let dir = home.cache_dir(&harness_id, &env_hash, &integrity_hex);
        report.bytes_freed += dir_size(&dir);
        if !dry_run {
            delete_cache_entry(home, &harness_id, &env_hash, &integrity_hex)?;
        }
        tracing::debug!(harness = %harness_id, env_hash = %env_hash, integrity = %integrity_hex, dry_run, "sweeping unreachable cache entry");
        report.removed_cache_entries.push(key);
    }

    Ok(report)
}

fn dir_size(dir: &std::path::Path) -> u64 {
    let Ok(read_dir) = std::fs::read_dir(dir) else { return 0 };
    let mut total = 0u64;
    for entry in read_dir.flatten() {
        let path = entry.path();
        if let Ok(file_type) = entry.file_type() {
            if file_type.is_dir() {
                total += dir_size(&path);
            } else if let Ok(meta) = entry.metadata() {
                total += meta.len();
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ensure_cached;
    use crate::snapshot::SnapshotMetadata;

    fn fake_snapshot(home: &AspHome, hex: &str) {
        let dir = home.snapshot_dir(hex);
        std::fs::create_dir_all(&dir).unwrap();
        let meta = SnapshotMetadata {
            space_id: "example".into(),
            commit: hex.to_string(),
            integrity: format!("sha256:{hex}"),
            created_at: chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().into(),
            source_path: "spaces/example".into(),
        };
        std::fs::write(dir.join(".asp-snapshot.json"), serde_json::to_vec(&meta).unwrap()).unwrap();
    }

    #[test]
    fn dry_run_reports_without_deleting() {
        let td = tempfile::tempdir().unwrap();
        let home = AspHome::new(td.path());
        home.ensure_dirs().unwrap();
        let keep = "a".repeat(64);
        let gone = "b".repeat(64);
        fake_snapshot(&home, &keep);
        fake_snapshot(&home, &gone);

        let reachable: HashSet<String> = [keep.clone()].into_iter().collect();
        let report = sweep(&home, &reachable, &HashSet::new(), true).unwrap();

        assert_eq!(report.removed_snapshots, vec![gone.clone()]);
        assert!(home.snapshot_dir(&gone).is_dir(), "dry run must not delete");
        assert!(home.snapshot_dir(&keep).is_dir());
    }

    #[test]
    fn real_sweep_deletes_unreachable_entries_only() {
        let td = tempfile::tempdir().unwrap();
        let home = AspHome::new(td.path());
        home.ensure_dirs().unwrap();
        let keep = "c".repeat(64);
        let gone = "d".repeat(64);
        fake_snapshot(&home, &keep);
        fake_snapshot(&home, &gone);
        ensure_cached(&home, "claude", "env1", &gone, |staging| {
            std::fs::write(staging.join("marker"), b"x")
                .map_err(|e| StoreError::io(staging.display(), e))
        })
        .unwrap();

        let reachable: HashSet<String> = [keep.clone()].into_iter().collect();
        let report = sweep(&home, &reachable, &HashSet::new(), false).unwrap();

        assert!(!home.snapshot_dir(&gone).is_dir());
        assert!(home.snapshot_dir(&keep).is_dir());
        assert!(!home.cache_dir("claude", "env1", &gone).is_dir());
        assert_eq!(report.removed_cache_entries, vec![("claude".to_string(), "env1".to_string(), gone)]);
    }
}
