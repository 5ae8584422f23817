//! The `asp-lock.json` document: schema, per-space and per-target
//! entries, and the validation a freshly parsed document must pass
//! before anything downstream trusts it (I1-I7).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use asp_types::{CommitSha, Integrity, SpaceKey, Warning};

pub const LOCKFILE_VERSION: u32 = 1;
pub const RESOLVER_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockDocument {
    pub lockfile_version: u32,
    pub resolver_version: u32,
    pub generated_at: DateTime<Utc>,
    pub registry: RegistryRef,
    pub spaces: BTreeMap<SpaceKey, LockedSpace>,
    pub targets: BTreeMap<String, LockedTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockedPlugin {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockedDeps {
    #[serde(default)]
    pub spaces: Vec<SpaceKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFromLock {
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semver: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedSpace {
    pub id: String,
    pub commit: CommitSha,
    pub path: String,
    pub integrity: Integrity,
    pub plugin: LockedPlugin,
    pub deps: LockedDeps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_from: Option<ResolvedFromLock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarnessEnv {
    pub env_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<Warning>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedTarget {
    pub compose: Vec<String>,
    pub roots: Vec<SpaceKey>,
    pub load_order: Vec<SpaceKey>,
    pub env_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<Warning>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harnesses: Option<BTreeMap<String, HarnessEnv>>,
}

#[derive(Debug, thiserror::Error)]
pub enum LockValidationError {
    #[error("unsupported lockfileVersion {found}, expected {LOCKFILE_VERSION}")]
    LockfileVersion { found: u32 },
    #[error("unsupported resolverVersion {found}, expected {RESOLVER_VERSION}")]
    ResolverVersion { found: u32 },
    #[error("unsupported registry.type {found:?}, expected \"git\"")]
    RegistryType { found: String },
    #[error("target {target:?} references {key} in loadOrder but it has no entry in spaces")]
    MissingSpaceEntry { target: String, key: SpaceKey },
    #[error("target {target:?} loadOrder is not a topological order: {dep} appears after {key}")]
    LoadOrderNotTopological { target: String, key: SpaceKey, dep: SpaceKey },
    #[error("target {target:?} loadOrder contains a duplicate entry {key}")]
    DuplicateLoadOrderEntry { target: String, key: SpaceKey },
}

/// I1-I3: every invariant checkable purely from the document's own
/// shape, without re-reading the registry. I4 (integrity matches the
/// tree) and I7 (resolution monotonicity) require git access and are
/// checked by the orchestrator, not here.
pub fn validate(doc: &LockDocument) -> Result<(), LockValidationError> {
    if doc.lockfile_version != LOCKFILE_VERSION {
        return Err(LockValidationError::LockfileVersion { found: doc.lockfile_version });
    }
    if doc.resolver_version != RESOLVER_VERSION {
        return Err(LockValidationError::ResolverVersion { found: doc.resolver_version });
    }
    if doc.registry.kind != "git" {
        return Err(LockValidationError::RegistryType { found: doc.registry.kind.clone() });
    }

    for (target_name, target) in &doc.targets {
        let mut seen: Vec<&SpaceKey> = Vec::with_capacity(target.load_order.len());
        for key in &target.load_order {
            if seen.contains(&key) {
                return Err(LockValidationError::DuplicateLoadOrderEntry {
                    target: target_name.clone(),
                    key: key.clone(),
                });
            }
            let entry = doc.spaces.get(key).ok_or_else(|| LockValidationError::MissingSpaceEntry {
                target: target_name.clone(),
                key: key.clone(),
            })?;
            for dep in &entry.deps.spaces {
                if !seen.contains(&dep) {
                    return Err(LockValidationError::LoadOrderNotTopological {
                        target: target_name.clone(),
                        key: key.clone(),
                        dep: dep.clone(),
                    });
                }
            }
            seen.push(key);
        }
    }
    Ok(())
}

/// 2-space indent, trailing newline — the one on-disk byte format every
/// writer must agree on so `install` run twice produces an identical
/// file (modulo `generatedAt`).
pub fn to_json_string(doc: &LockDocument) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"  ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    doc.serialize(&mut ser)?;
    let mut text = String::from_utf8(buf).expect("serde_json always emits valid utf-8");
    text.push('\n');
    Ok(text)
}

pub fn from_json_str(text: &str) -> Result<LockDocument, serde_json::Error> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use asp_types::{SpaceId, SpaceKey};

    fn doc_with_one_space() -> LockDocument {
        let key = SpaceKey::new(SpaceId::parse("base").unwrap(), CommitSha::parse("dev").unwrap());
        let mut spaces = BTreeMap::new();
        spaces.insert(
            key.clone(),
            LockedSpace {
                id: "base".into(),
                commit: CommitSha::parse("dev").unwrap(),
                path: "spaces/base".into(),
                integrity: Integrity::Dev,
                plugin: LockedPlugin { name: "base".into(), version: None },
                deps: LockedDeps::default(),
                resolved_from: None,
            },
        );
        let mut targets = BTreeMap::new();
        targets.insert(
            "default".into(),
            LockedTarget {
                compose: vec!["space:base@dev".into()],
                roots: vec![key.clone()],
                load_order: vec![key],
                env_hash: "deadbeef".into(),
                warnings: None,
                harnesses: None,
            },
        );
        LockDocument {
            lockfile_version: LOCKFILE_VERSION,
            resolver_version: RESOLVER_VERSION,
            generated_at: DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().into(),
            registry: RegistryRef { kind: "git".into(), url: "https://example.invalid/registry".into(), default_branch: None },
            spaces,
            targets,
        }
    }

    #[test]
    fn round_trips_through_json() {
        let doc = doc_with_one_space();
        let text = to_json_string(&doc).unwrap();
        assert!(text.ends_with('\n'));
        assert!(text.starts_with('{'));
        let parsed = from_json_str(&text).unwrap();
        validate(&parsed).unwrap();
    }

    #[test]
    fn rejects_wrong_lockfile_version() {
        let mut doc = doc_with_one_space();
        doc.lockfile_version = 2;
        assert!(matches!(validate(&doc), Err(LockValidationError::LockfileVersion { found: 2 })));
    }

    #[test]
    fn rejects_non_git_registry() {
        let mut doc = doc_with_one_space();
        doc.registry.kind = "http".into();
        assert!(matches!(validate(&doc), Err(LockValidationError::RegistryType { .. })));
    }

    #[test]
    fn rejects_load_order_missing_space_entry() {
        let mut doc = doc_with_one_space();
        let ghost = SpaceKey::new(SpaceId::parse("ghost").unwrap(), CommitSha::parse("dev").unwrap());
        doc.targets.get_mut("default").unwrap().load_order.push(ghost);
        assert!(matches!(validate(&doc), Err(LockValidationError::MissingSpaceEntry { .. })));
    }

    #[test]
    fn rejects_duplicate_load_order_entries() {
        let mut doc = doc_with_one_space();
        let key = doc.targets["default"].load_order[0].clone();
        doc.targets.get_mut("default").unwrap().load_order.push(key);
        assert!(matches!(validate(&doc), Err(LockValidationError::DuplicateLoadOrderEntry { .. })));
    }
}
