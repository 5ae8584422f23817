//! # asp-resolver
//!
//! Maps `(spaceId, Selector)` to a pinned commit against a git registry,
//! using the committed dist-tags file and `space/<id>/v<semver>` tags.
//! Dist-tag and semver resolution are monotone for a fixed registry
//! commit (`P7`/I7): repeated calls against the same registry state
//! yield identical results.

use std::collections::BTreeMap;

use asp_git::GitAdapter;
use asp_types::{CommitSha, Selector, SpaceId};

#[derive(Debug, thiserror::Error)]
#[error("failed to resolve {space_id}@{selector_text}: {message}")]
pub struct SelectorResolutionError {
    pub space_id: String,
    pub selector_text: String,
    pub message: String,
}

impl SelectorResolutionError {
    fn new(space_id: &SpaceId, selector: &Selector, message: impl Into<String>) -> Self {
        Self {
            space_id: space_id.to_string(),
            selector_text: describe_selector(selector),
            message: message.into(),
        }
    }
}

fn describe_selector(selector: &Selector) -> String {
    match selector {
        Selector::Dev => "dev".to_string(),
        Selector::Head => "HEAD".to_string(),
        Selector::DistTag(name) => name.clone(),
        Selector::Semver { range, .. } => range.clone(),
        Selector::GitPin(sha) => format!("git:{sha}"),
    }
}

/// The outcome of resolving a selector: a pinned commit plus, when
/// applicable, the tag and semver version it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub commit: CommitSha,
    pub tag: Option<String>,
    pub semver: Option<String>,
}

impl Resolution {
    fn commit_only(commit: CommitSha) -> Self {
        Self { commit, tag: None, semver: None }
    }
}

/// Resolve `(space_id, selector)` against the registry rooted at
/// `git.cwd()`. `dist_tags_at` names the commit to read
/// `registry/dist-tags.json` at; `None` means `HEAD`.
pub fn resolve(
    git: &GitAdapter,
    space_id: &SpaceId,
    selector: &Selector,
    dist_tags_at: Option<&str>,
) -> Result<Resolution, SelectorResolutionError> {
    match selector {
        Selector::Dev => Ok(Resolution::commit_only(CommitSha::Dev)),
        Selector::Head => {
            let commit = git
                .rev_parse("HEAD")
                .map_err(|e| SelectorResolutionError::new(space_id, selector, e.to_string()))?;
            let commit = CommitSha::parse(&commit)
                .map_err(|e| SelectorResolutionError::new(space_id, selector, e.to_string()))?;
            Ok(Resolution::commit_only(commit))
        }
        Selector::GitPin(sha) => Ok(Resolution::commit_only(CommitSha::Sha(sha.clone()))),
        Selector::DistTag(name) => resolve_dist_tag(git, space_id, selector, name, dist_tags_at),
        Selector::Semver { range, exact } => {
            if *exact {
                resolve_exact_semver(git, space_id, selector, range)
            } else {
                resolve_semver_range(git, space_id, selector, range)
            }
        }
    }
}

fn dist_tags(
    git: &GitAdapter,
    space_id: &SpaceId,
    selector: &Selector,
    at: Option<&str>,
) -> Result<BTreeMap<String, String>, SelectorResolutionError> {
    let commit = at.unwrap_or("HEAD");
    let bytes = git
        .show(commit, "registry/dist-tags.json")
        .map_err(|e| SelectorResolutionError::new(space_id, selector, e.to_string()))?
        .ok_or_else(|| SelectorResolutionError::new(space_id, selector, "registry/dist-tags.json not found"))?;
    let doc: BTreeMap<String, BTreeMap<String, String>> = serde_json::from_slice(&bytes)
        .map_err(|e| SelectorResolutionError::new(space_id, selector, format!("malformed dist-tags.json: {e}")))?;
    doc.get(space_id.as_str())
        .cloned()
        .ok_or_else(|| SelectorResolutionError::new(space_id, selector, "no dist-tags entry for this space"))
}

fn resolve_dist_tag(
    git: &GitAdapter,
    space_id: &SpaceId,
    selector: &Selector,
    name: &str,
    dist_tags_at: Option<&str>,
) -> Result<Resolution, SelectorResolutionError> {
    let tags = dist_tags(git, space_id, selector, dist_tags_at)?;
    let value = tags
        .get(name)
        .ok_or_else(|| SelectorResolutionError::new(space_id, selector, format!("dist-tag {name:?} is not set")))?;
    let version_text = value
        .strip_prefix('v')
        .ok_or_else(|| SelectorResolutionError::new(space_id, selector, format!("dist-tag value {value:?} must be of the form v<semver>")))?;
    semver::Version::parse(version_text)
        .map_err(|e| SelectorResolutionError::new(space_id, selector, format!("dist-tag value {value:?} is not valid semver: {e}")))?;

    let tag = format!("space/{}/v{}", space_id, version_text);
    let commit = git
        .deref_tag(&tag)
        .map_err(|e| SelectorResolutionError::new(space_id, selector, format!("tag {tag:?} not found: {e}")))?;
    let commit = CommitSha::parse(&commit)
        .map_err(|e| SelectorResolutionError::new(space_id, selector, e.to_string()))?;
    Ok(Resolution {
        commit,
        tag: Some(tag),
        semver: Some(version_text.to_string()),
    })
}

struct TagVersion {
    tag: String,
    version: semver::Version,
}

fn enumerate_tag_versions(
    git: &GitAdapter,
    space_id: &SpaceId,
    selector: &Selector,
) -> Result<Vec<TagVersion>, SelectorResolutionError> {
    let pattern = format!("space/{space_id}/v*");
    let tags = git
        .tag_list(&pattern)
        .map_err(|e| SelectorResolutionError::new(space_id, selector, e.to_string()))?;
    let prefix = format!("space/{space_id}/v");
    let mut out = Vec::new();
    for tag in tags {
        if let Some(version_text) = tag.strip_prefix(&prefix) {
            if let Ok(version) = semver::Version::parse(version_text) {
                out.push(TagVersion { tag, version });
            }
        }
    }
    Ok(out)
}

fn resolve_exact_semver(
    git: &GitAdapter,
    space_id: &SpaceId,
    selector: &Selector,
    range: &str,
) -> Result<Resolution, SelectorResolutionError> {
    let wanted = semver::Version::parse(range)
        .map_err(|e| SelectorResolutionError::new(space_id, selector, format!("{range:?} is not valid semver: {e}")))?;
    let candidates = enumerate_tag_versions(git, space_id, selector)?;
    let found = candidates
        .into_iter()
        .find(|c| c.version == wanted)
        .ok_or_else(|| SelectorResolutionError::new(space_id, selector, format!("no tag for version {range}")))?;
    finish_from_tag(git, space_id, selector, found)
}

fn resolve_semver_range(
    git: &GitAdapter,
    space_id: &SpaceId,
    selector: &Selector,
    range: &str,
) -> Result<Resolution, SelectorResolutionError> {
    let req = semver::VersionReq::parse(range)
        .map_err(|e| SelectorResolutionError::new(space_id, selector, format!("{range:?} is not a valid semver range: {e}")))?;
    let candidates = enumerate_tag_versions(git, space_id, selector)?;
    let best = candidates
        .into_iter()
        .filter(|c| req.matches(&c.version))
        .max_by(|a, b| a.version.cmp(&b.version))
        .ok_or_else(|| SelectorResolutionError::new(space_id, selector, format!("no tag satisfies range {range}")))?;
    finish_from_tag(git, space_id, selector, best)
}

fn finish_from_tag(
    git: &GitAdapter,
    space_id: &SpaceId,
    selector: &Selector,
    found: TagVersion,
) -> Result<Resolution, SelectorResolutionError> {
    let commit = git
        .deref_tag(&found.tag)
        .map_err(|e| SelectorResolutionError::new(space_id, selector, format!("tag {:?} not found: {e}", found.tag)))?;
    let commit = CommitSha::parse(&commit)
        .map_err(|e| SelectorResolutionError::new(space_id, selector, e.to_string()))?;
    Ok(Resolution {
        commit,
        tag: Some(found.tag),
        semver: Some(found.version.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_never_touches_git() {
        let git = GitAdapter::new("/nonexistent/path/that/must/not/be/read");
        let resolution = resolve(&git, &SpaceId::parse("base").unwrap(), &Selector::Dev, None).unwrap();
        assert_eq!(resolution.commit, CommitSha::Dev);
        assert!(resolution.tag.is_none());
    }

    #[test]
    fn git_pin_is_verbatim() {
        let git = GitAdapter::new("/nonexistent/path/that/must/not/be/read");
        let sha = "a".repeat(40);
        let resolution = resolve(&git, &SpaceId::parse("base").unwrap(), &Selector::GitPin(sha.clone()), None).unwrap();
        assert_eq!(resolution.commit, CommitSha::Sha(sha));
    }

    #[test]
    fn caret_range_picks_semver_maximum() {
        let versions = ["1.0.0", "1.0.1", "1.1.0", "2.0.0"];
        let req = semver::VersionReq::parse("^1.0.0").unwrap();
        let best = versions
            .iter()
            .map(|v| semver::Version::parse(v).unwrap())
            .filter(|v| req.matches(v))
            .max()
            .unwrap();
        assert_eq!(best.to_string(), "1.1.0");
    }

    #[test]
    fn tilde_range_picks_patch_maximum() {
        let versions = ["1.0.0", "1.0.1", "1.1.0"];
        let req = semver::VersionReq::parse("~1.0.0").unwrap();
        let best = versions
            .iter()
            .map(|v| semver::Version::parse(v).unwrap())
            .filter(|v| req.matches(v))
            .max()
            .unwrap();
        assert_eq!(best.to_string(), "1.0.1");
    }
}
