//! # asp-closure
//!
//! DFS transitive dependency resolution over `space.toml` `deps.spaces`
//! lists, producing a deterministic postorder `loadOrder` and detecting
//! cycles (`P3`-`P5`). Diamonds collapse: a shared dependency is resolved
//! once and appears at its earliest postorder position.
//!
//! Filesystem-vs-git dispatch (per the "tree source" design note): a
//! `dev` selector, a `space:project:` ref, and a `space:path:` ref all
//! read straight from a working directory rather than a git commit;
//! everything else reads through the git adapter at a pinned commit.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use asp_git::GitAdapter;
use asp_refs::RefParseError;
use asp_resolver::SelectorResolutionError;
use asp_types::selector::RefKind;
use asp_types::{CommitSha, SpaceId, SpaceKey, SpaceManifest, SpaceRef};

#[derive(Debug, thiserror::Error)]
pub enum ClosureError {
    #[error(transparent)]
    RefParse(#[from] RefParseError),
    #[error(transparent)]
    SelectorResolution(#[from] SelectorResolutionError),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest at {path}: {source}")]
    TomlParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("manifest missing at {path}")]
    ManifestMissing { path: String },
    #[error("cyclic dependency: {path}")]
    Cyclic { path: String },
}

/// Where the registry lives and where filesystem-backed refs
/// (`dev`/`project`/`path`) resolve their base directory from.
pub struct Registry {
    pub git: GitAdapter,
    /// Root that `space:project:<id>` and `space:path:<p>` refs are
    /// relative to — typically the consuming project's directory.
    pub base_dir: PathBuf,
    /// Commit to read `registry/dist-tags.json` at; `None` means `HEAD`.
    pub dist_tags_at: Option<String>,
}

impl Registry {
    pub fn new(git: GitAdapter, base_dir: impl Into<PathBuf>) -> Self {
        Self { git, base_dir: base_dir.into(), dist_tags_at: None }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedFrom {
    pub selector_text: String,
    pub tag: Option<String>,
    pub semver: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedSpace {
    pub key: SpaceKey,
    pub manifest: SpaceManifest,
    pub deps: Vec<SpaceKey>,
    pub resolved_from: ResolvedFrom,
}

#[derive(Debug, Clone)]
pub struct Closure {
    pub resolved: BTreeMap<SpaceKey, ResolvedSpace>,
    /// Dependencies before dependents (`P3`), no duplicates (`P4`).
    pub load_order: Vec<SpaceKey>,
    /// Each declared root's key, in declared order.
    pub roots: Vec<SpaceKey>,
}

/// Build the transitive closure over `roots` (reference strings), reusing
/// `pinned` commits for non-`dev` selectors where an id already has one.
pub fn build_closure(
    registry: &Registry,
    roots: &[String],
    pinned: Option<&BTreeMap<SpaceId, CommitSha>>,
) -> Result<Closure, ClosureError> {
    let mut resolved = BTreeMap::new();
    let mut load_order = Vec::new();
    let mut root_keys = Vec::new();
    for root in roots {
        let mut visiting = Vec::new();
        let key = visit(root, registry, pinned, &mut resolved, &mut load_order, &mut visiting)?;
        root_keys.push(key);
    }
    Ok(Closure { resolved, load_order, roots: root_keys })
}

fn visit(
    ref_str: &str,
    registry: &Registry,
    pinned: Option<&BTreeMap<SpaceId, CommitSha>>,
    resolved: &mut BTreeMap<SpaceKey, ResolvedSpace>,
    load_order: &mut Vec<SpaceKey>,
    visiting: &mut Vec<SpaceKey>,
) -> Result<SpaceKey, ClosureError> {
    let parsed = asp_refs::parse(ref_str)?;
    let (commit, resolved_from) = determine_commit(&parsed, registry, pinned)?;
    let key = SpaceKey::new(parsed.id.clone(), commit);

    if resolved.contains_key(&key) {
        return Ok(key);
    }
    if visiting.contains(&key) {
        let mut cycle: Vec<String> = visiting.iter().map(|k| k.to_string()).collect();
        cycle.push(key.to_string());
        return Err(ClosureError::Cyclic { path: cycle.join(" → ") });
    }

    visiting.push(key.clone());
    let manifest = read_manifest(&parsed, &key, registry)?;

    let mut deps = Vec::new();
    for dep_ref in &manifest.deps.spaces {
        let dep_key = visit(dep_ref, registry, pinned, resolved, load_order, visiting)?;
        deps.push(dep_key);
    }
    visiting.pop();

    resolved.insert(
        key.clone(),
        ResolvedSpace { key: key.clone(), manifest, deps, resolved_from },
    );
    load_order.push(key.clone());
    Ok(key)
}

fn determine_commit(
    parsed: &SpaceRef,
    registry: &Registry,
    pinned: Option<&BTreeMap<SpaceId, CommitSha>>,
) -> Result<(CommitSha, ResolvedFrom), ClosureError> {
    let selector_text = parsed.selector_text.clone().unwrap_or_else(|| "dev".to_string());

    match &parsed.kind {
        RefKind::Path(_) => {
            return Ok((
                CommitSha::Dev,
                ResolvedFrom { selector_text, tag: None, semver: None },
            ));
        }
        RefKind::Project => {
            return Ok((
                CommitSha::Project,
                ResolvedFrom { selector_text, tag: None, semver: None },
            ));
        }
        RefKind::Plain => {}
    }

    if parsed.selector.is_dev() {
        return Ok((CommitSha::Dev, ResolvedFrom { selector_text, tag: None, semver: None }));
    }

    if let Some(pinned) = pinned {
        if let Some(commit) = pinned.get(&parsed.id) {
            return Ok((commit.clone(), ResolvedFrom { selector_text, tag: None, semver: None }));
        }
    }

    let resolution = asp_resolver::resolve(&registry.git, &parsed.id, &parsed.selector, registry.dist_tags_at.as_deref())?;
    Ok((
        resolution.commit,
        ResolvedFrom { selector_text, tag: resolution.tag, semver: resolution.semver },
    ))
}

fn read_manifest(parsed: &SpaceRef, key: &SpaceKey, registry: &Registry) -> Result<SpaceManifest, ClosureError> {
    let bytes = match &parsed.kind {
        RefKind::Path(path) => read_fs_manifest(&registry.base_dir.join(path))?,
        RefKind::Project => read_fs_manifest(&registry.base_dir.join("spaces").join(parsed.id.as_str()))?,
        RefKind::Plain if matches!(key.commit, CommitSha::Dev) => {
            read_fs_manifest(&registry.git.cwd().join("spaces").join(parsed.id.as_str()))?
        }
        RefKind::Plain => {
            let rel = format!("spaces/{}/space.toml", parsed.id);
            registry
                .git
                .show(key.commit.as_str(), &rel)
                .map_err(|e| ClosureError::Io {
                    path: rel.clone(),
                    source: std::io::Error::other(e.to_string()),
                })?
                .ok_or_else(|| ClosureError::ManifestMissing { path: rel })?
        }
    };
    let text = String::from_utf8_lossy(&bytes);
    toml::from_str(&text).map_err(|source| ClosureError::TomlParse {
        path: format!("{}/space.toml", parsed.id),
        source,
    })
}

fn read_fs_manifest(space_dir: &Path) -> Result<Vec<u8>, ClosureError> {
    let path = space_dir.join("space.toml");
    std::fs::read(&path).map_err(|source| ClosureError::Io { path: path.display().to_string(), source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_space(dir: &Path, id: &str, deps: &[&str]) {
        let space_dir = dir.join("spaces").join(id);
        fs::create_dir_all(&space_dir).unwrap();
        let deps_toml = deps
            .iter()
            .map(|d| format!("\"{d}\""))
            .collect::<Vec<_>>()
            .join(", ");
        fs::write(
            space_dir.join("space.toml"),
            format!(
                "schema = 1\nid = \"{id}\"\nversion = \"1.0.0\"\n\n[deps]\nspaces = [{deps_toml}]\n"
            ),
        )
        .unwrap();
    }

    fn dev_registry(dir: &Path) -> Registry {
        Registry::new(GitAdapter::new(dir), dir)
    }

    #[test]
    fn diamond_dependency_collapses_to_one_entry() {
        let td = tempfile::tempdir().unwrap();
        write_space(td.path(), "c", &[]);
        write_space(td.path(), "a", &["space:c@dev"]);
        write_space(td.path(), "b", &["space:c@dev"]);
        let registry = dev_registry(td.path());

        let closure = build_closure(&registry, &["space:a@dev".to_string(), "space:b@dev".to_string()], None).unwrap();
        assert_eq!(closure.resolved.len(), 3);
        let order: Vec<&str> = closure.load_order.iter().map(|k| k.id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn cycle_is_detected() {
        let td = tempfile::tempdir().unwrap();
        write_space(td.path(), "a", &["space:b@dev"]);
        write_space(td.path(), "b", &["space:a@dev"]);
        let registry = dev_registry(td.path());

        let err = build_closure(&registry, &["space:a@dev".to_string()], None).unwrap_err();
        match err {
            ClosureError::Cyclic { path } => assert!(path.contains("→")),
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn load_order_has_no_duplicates_and_respects_topology() {
        let td = tempfile::tempdir().unwrap();
        write_space(td.path(), "base", &[]);
        write_space(td.path(), "mid", &["space:base@dev"]);
        write_space(td.path(), "top", &["space:mid@dev", "space:base@dev"]);
        let registry = dev_registry(td.path());

        let closure = build_closure(&registry, &["space:top@dev".to_string()], None).unwrap();
        let order: Vec<&str> = closure.load_order.iter().map(|k| k.id.as_str()).collect();
        let mut seen = std::collections::HashSet::new();
        assert!(order.iter().all(|id| seen.insert(*id)));
        assert!(order.iter().position(|&i| i == "base").unwrap() < order.iter().position(|&i| i == "mid").unwrap());
        assert!(order.iter().position(|&i| i == "mid").unwrap() < order.iter().position(|&i| i == "top").unwrap());
    }
}
