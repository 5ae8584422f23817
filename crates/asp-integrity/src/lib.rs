//! # asp-integrity
//!
//! Canonical content hash of a space tree `<id>@<commit>:<path>`. The hash
//! rides on git's own blob OIDs (already content digests) rather than
//! re-reading file bytes, so it is stable across platforms and
//! re-extraction: any two checkouts of the same commit/path produce the
//! same `sha256:<hex>`.

use asp_git::{GitAdapter, TreeEntry, TreeEntryType};
use asp_types::Integrity;
use sha2::{Digest, Sha256};

pub const EXCLUDED_NAMES: &[&str] = &[".git", ".asp", "node_modules", "dist"];

#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    #[error("failed to enumerate tree at {commit}:{path}: {source}")]
    Git {
        commit: String,
        path: String,
        #[source]
        source: asp_git::GitError,
    },
    #[error("integrity mismatch at {path}: expected {expected}, got {actual}")]
    Mismatch {
        path: String,
        expected: String,
        actual: String,
    },
}

/// Whether a tree-relative path falls under one of the excluded names
/// (`.git`, `.asp`, `node_modules`, `dist`), at any depth.
pub fn is_excluded(path: &str) -> bool {
    path.split('/').any(|segment| EXCLUDED_NAMES.contains(&segment))
}

fn mode_label(mode: &str) -> &'static str {
    // Any execute bit (owner/group/other) normalizes to 100755.
    let has_exec = mode
        .chars()
        .rev()
        .take(3)
        .any(|c| matches!(c, '1' | '3' | '5' | '7'));
    if has_exec { "100755" } else { "100644" }
}

/// Compute the canonical integrity hash for `<commit>:<path>` in the
/// registry at `git.cwd()`.
pub fn hash_tree(git: &GitAdapter, commit: &str, path: &str) -> Result<Integrity, IntegrityError> {
    let entries = git
        .ls_tree(commit, Some(path), true)
        .map_err(|source| IntegrityError::Git { commit: commit.to_string(), path: path.to_string(), source })?;
    Ok(hash_entries(&entries))
}

/// Pure function over already-enumerated blob entries; the §4.3 algorithm.
pub fn hash_entries(entries: &[TreeEntry]) -> Integrity {
    let mut blobs: Vec<&TreeEntry> = entries
        .iter()
        .filter(|e| e.entry_type == TreeEntryType::Blob && !is_excluded(&e.path))
        .collect();
    blobs.sort_by(|a, b| a.path.as_bytes().cmp(b.path.as_bytes()));

    let mut hasher = Sha256::new();
    hasher.update(b"v1\0");
    for entry in blobs {
        hasher.update(entry.path.as_bytes());
        hasher.update(b"\0blob\0");
        hasher.update(entry.oid.as_bytes());
        hasher.update(b"\0");
        hasher.update(mode_label(&entry.mode).as_bytes());
        hasher.update(b"\n");
    }
    Integrity::of_hex(hex::encode(hasher.finalize()))
}

/// Recompute a git-style blob OID (`sha1("blob <size>\0<content>")`) for a
/// file extracted to disk, used by the snapshot verifier to agree with
/// the `ls-tree`-based hash without needing the original git object
/// database.
pub fn blob_oid(content: &[u8]) -> String {
    use sha1::{Digest as Sha1Digest, Sha1};
    let header = format!("blob {}\0", content.len());
    let mut hasher = Sha1::new();
    hasher.update(header.as_bytes());
    hasher.update(content);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, oid: &str, mode: &str) -> TreeEntry {
        TreeEntry {
            mode: mode.to_string(),
            entry_type: TreeEntryType::Blob,
            oid: oid.to_string(),
            path: path.to_string(),
        }
    }

    #[test]
    fn purity_across_repeated_calls() {
        let entries = vec![entry("b.txt", "b".repeat(40).as_str(), "100644"), entry("a.txt", "a".repeat(40).as_str(), "100644")];
        let h1 = hash_entries(&entries);
        let h2 = hash_entries(&entries);
        assert_eq!(h1, h2);
    }

    #[test]
    fn excludes_reserved_directories() {
        let entries = vec![
            entry("space.toml", "a".repeat(40).as_str(), "100644"),
            entry("node_modules/x/index.js", "b".repeat(40).as_str(), "100644"),
            entry(".git/HEAD", "c".repeat(40).as_str(), "100644"),
            entry("dist/bundle.js", "d".repeat(40).as_str(), "100644"),
        ];
        let with_junk = hash_entries(&entries);
        let without_junk = hash_entries(&entries[..1]);
        assert_eq!(with_junk, without_junk);
    }

    #[test]
    fn execute_bit_changes_mode_label() {
        let exec = vec![entry("run.sh", "a".repeat(40).as_str(), "100755")];
        let noexec = vec![entry("run.sh", "a".repeat(40).as_str(), "100644")];
        assert_ne!(hash_entries(&exec), hash_entries(&noexec));
    }

    #[test]
    fn order_of_input_entries_does_not_matter() {
        let a = vec![entry("a.txt", "a".repeat(40).as_str(), "100644"), entry("b.txt", "b".repeat(40).as_str(), "100644")];
        let b = vec![entry("b.txt", "b".repeat(40).as_str(), "100644"), entry("a.txt", "a".repeat(40).as_str(), "100644")];
        assert_eq!(hash_entries(&a), hash_entries(&b));
    }
}
