//! Turns an `asp-closure::Closure` plus per-space integrities into the
//! lock-document fragments for one target (C12's assembly step).

use std::collections::BTreeMap;

use asp_closure::{Closure, ResolvedSpace};
use asp_types::{Integrity, SpaceKey};

use crate::envhash::env_hash_from_locked_spaces;
use crate::model::{LockedDeps, LockedPlugin, LockedSpace, LockedTarget, ResolvedFromLock};

pub fn locked_space_from_resolved(resolved: &ResolvedSpace, integrity: Integrity) -> LockedSpace {
    let manifest = &resolved.manifest;
    LockedSpace {
        id: resolved.key.id.to_string(),
        commit: resolved.key.commit.clone(),
        path: format!("spaces/{}", resolved.key.id),
        integrity,
        plugin: LockedPlugin {
            name: manifest.plugin_name(),
            version: manifest.plugin.version.clone().or_else(|| Some(manifest.plugin_version())),
        },
        deps: LockedDeps { spaces: resolved.deps.clone() },
        resolved_from: Some(ResolvedFromLock {
            selector: resolved.resolved_from.selector_text.clone(),
            tag: resolved.resolved_from.tag.clone(),
            semver: resolved.resolved_from.semver.clone(),
        }),
    }
}

/// Builds the `LockedTarget` plus the space entries it and its
/// transitive deps need. `integrities` must already contain an entry
/// for every non-`dev`/non-`project` key reachable from `closure`.
pub fn assemble_target(
    compose: &[String],
    closure: &Closure,
    integrities: &BTreeMap<SpaceKey, Integrity>,
) -> (LockedTarget, BTreeMap<SpaceKey, LockedSpace>) {
    let mut spaces = BTreeMap::new();
    for (key, resolved) in &closure.resolved {
        let integrity = match &key.commit {
            asp_types::CommitSha::Dev => Integrity::Dev,
            asp_types::CommitSha::Project => Integrity::Project,
            asp_types::CommitSha::Sha(_) => integrities
                .get(key)
                .cloned()
                .unwrap_or_else(|| panic!("missing integrity for resolved space {key}")),
        };
        spaces.insert(key.clone(), locked_space_from_resolved(resolved, integrity));
    }

    let env_hash = env_hash_from_locked_spaces(&closure.load_order, &spaces);

    let target = LockedTarget {
        compose: compose.to_vec(),
        roots: closure.roots.clone(),
        load_order: closure.load_order.clone(),
        env_hash,
        warnings: None,
        harnesses: None,
    };
    (target, spaces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use asp_closure::{Registry, build_closure};
    use asp_git::GitAdapter;
    use std::fs;

    fn write_space(dir: &std::path::Path, id: &str) {
        let space_dir = dir.join("spaces").join(id);
        fs::create_dir_all(&space_dir).unwrap();
        fs::write(space_dir.join("space.toml"), format!("schema = 1\nid = \"{id}\"\nversion = \"1.0.0\"\n")).unwrap();
    }

    #[test]
    fn dev_spaces_get_dev_integrity_without_a_lookup_table() {
        let td = tempfile::tempdir().unwrap();
        write_space(td.path(), "base");
        let registry = Registry::new(GitAdapter::new(td.path()), td.path());
        let closure = build_closure(&registry, &["space:base@dev".to_string()], None).unwrap();

        let (target, spaces) = assemble_target(&["space:base@dev".to_string()], &closure, &BTreeMap::new());
        assert_eq!(spaces.len(), 1);
        let entry = spaces.values().next().unwrap();
        assert_eq!(entry.integrity, Integrity::Dev);
        assert_eq!(target.load_order.len(), 1);
        assert_eq!(target.env_hash.len(), 64);
    }
}
