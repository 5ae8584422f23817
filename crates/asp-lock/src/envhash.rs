//! `envHash` (I6): a pure function of `loadOrder` plus each space's
//! `integrity`, with a per-harness variant that folds in harness
//! identity.

use sha2::{Digest, Sha256};

use asp_types::{Integrity, SpaceKey};

use crate::model::LockedSpace;

/// `sha256("v1\0" || for key in loadOrder: key || "\0" || integrity || "\n")`.
pub fn compute_env_hash<'a>(
    load_order: &[SpaceKey],
    lookup: impl Fn(&SpaceKey) -> Option<&'a Integrity>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"v1\0");
    for key in load_order {
        let integrity = lookup(key).expect("every loadOrder key must resolve to an integrity (I1)");
        hasher.update(key.to_string().as_bytes());
        hasher.update(b"\0");
        hasher.update(integrity.to_string().as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

pub fn env_hash_from_locked_spaces(
    load_order: &[SpaceKey],
    spaces: &std::collections::BTreeMap<SpaceKey, LockedSpace>,
) -> String {
    compute_env_hash(load_order, |key| spaces.get(key).map(|s| &s.integrity))
}

/// Appends a second, stable field block naming the harness before the
/// final newline so distinct harnesses never collide on one env hash
/// even for an identical space set.
pub fn compute_harness_env_hash(base_env_hash: &str, harness_id: &str, harness_version: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"v1\0");
    hasher.update(base_env_hash.as_bytes());
    hasher.update(b"\0harness\0");
    hasher.update(harness_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(harness_version.as_bytes());
    hasher.update(b"\n");
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use asp_types::{CommitSha, SpaceId};
    use std::collections::BTreeMap;

    fn key(id: &str) -> SpaceKey {
        SpaceKey::new(SpaceId::parse(id).unwrap(), CommitSha::parse("dev").unwrap())
    }

    #[test]
    fn is_deterministic_given_the_same_inputs() {
        let load_order = vec![key("base"), key("top")];
        let mut integrities = BTreeMap::new();
        integrities.insert(key("base"), Integrity::of_hex("a".repeat(64)));
        integrities.insert(key("top"), Integrity::of_hex("b".repeat(64)));

        let h1 = compute_env_hash(&load_order, |k| integrities.get(k));
        let h2 = compute_env_hash(&load_order, |k| integrities.get(k));
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn changes_when_load_order_changes() {
        let mut integrities = BTreeMap::new();
        integrities.insert(key("base"), Integrity::of_hex("a".repeat(64)));
        integrities.insert(key("top"), Integrity::of_hex("b".repeat(64)));

        let forward = compute_env_hash(&[key("base"), key("top")], |k| integrities.get(k));
        let backward = compute_env_hash(&[key("top"), key("base")], |k| integrities.get(k));
        assert_ne!(forward, backward);
    }

    #[test]
    fn harness_subhash_differs_by_harness_identity() {
        let base = "a".repeat(64);
        let claude = compute_harness_env_hash(&base, "claude", "2.1.0");
        let codex = compute_harness_env_hash(&base, "codex", "2.1.0");
        assert_ne!(claude, codex);
    }
}
