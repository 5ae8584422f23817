//! Branded primitives: [`SpaceId`], [`CommitSha`], [`Integrity`], [`SpaceKey`].
//!
//! Each type validates its invariant at construction so downstream code
//! never re-checks the pattern once it holds one of these values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved commit marker for a space read straight from the working copy.
pub const COMMIT_DEV: &str = "dev";
/// Reserved commit marker for a project-local space.
pub const COMMIT_PROJECT: &str = "project";

/// Kebab-case space identifier, 1-64 chars, `[a-z0-9]+(-[a-z0-9]+)*`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SpaceId(String);

impl SpaceId {
    pub fn parse(s: &str) -> Result<Self, InvalidSpaceId> {
        if s.is_empty() || s.len() > 64 {
            return Err(InvalidSpaceId {
                value: s.to_string(),
                reason: "length must be 1..=64",
            });
        }
        let mut segments = s.split('-');
        let all_valid = segments.all(|seg| {
            !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        });
        if !all_valid {
            return Err(InvalidSpaceId {
                value: s.to_string(),
                reason: "must match [a-z0-9]+(-[a-z0-9]+)*",
            });
        }
        Ok(Self(s.to_string()))
    }

    /// Derive a synthetic id from the last path segment of a path reference.
    /// Falls back to `path-ref` when the segment kebab-normalizes to nothing.
    pub fn from_path_segment(segment: &str) -> Self {
        let normalized: String = segment
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect();
        let collapsed = normalized
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        Self::parse(&collapsed).unwrap_or_else(|_| Self("path-ref".to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SpaceId {
    type Error = InvalidSpaceId;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SpaceId> for String {
    fn from(value: SpaceId) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid space id {value:?}: {reason}")]
pub struct InvalidSpaceId {
    pub value: String,
    pub reason: &'static str,
}

/// A git commit SHA (7-64 lowercase hex chars), or one of the `dev`/`project`
/// markers used by non-content-addressed spaces.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CommitSha {
    Sha(String),
    Dev,
    Project,
}

impl CommitSha {
    pub fn parse(s: &str) -> Result<Self, InvalidCommitSha> {
        match s {
            COMMIT_DEV => Ok(Self::Dev),
            COMMIT_PROJECT => Ok(Self::Project),
            _ => {
                let len_ok = (7..=64).contains(&s.len());
                let hex_ok = !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase());
                if len_ok && hex_ok {
                    Ok(Self::Sha(s.to_string()))
                } else {
                    Err(InvalidCommitSha { value: s.to_string() })
                }
            }
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Sha(s) => s,
            Self::Dev => COMMIT_DEV,
            Self::Project => COMMIT_PROJECT,
        }
    }

    pub fn is_content_addressed(&self) -> bool {
        matches!(self, Self::Sha(_))
    }
}

impl fmt::Display for CommitSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for CommitSha {
    type Error = InvalidCommitSha;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CommitSha> for String {
    fn from(value: CommitSha) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid commit sha {value:?}: must be 7..=64 lowercase hex chars, or `dev`/`project`")]
pub struct InvalidCommitSha {
    pub value: String,
}

/// `sha256:<64-hex>`, or one of the two reserved non-hex markers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Integrity {
    Sha256(String),
    Dev,
    Project,
}

impl Integrity {
    pub const PREFIX: &'static str = "sha256:";

    pub fn parse(s: &str) -> Result<Self, InvalidIntegrity> {
        let rest = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| InvalidIntegrity { value: s.to_string() })?;
        match rest {
            "dev" => Ok(Self::Dev),
            "project" => Ok(Self::Project),
            hex if hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()) => {
                Ok(Self::Sha256(hex.to_string()))
            }
            _ => Err(InvalidIntegrity { value: s.to_string() }),
        }
    }

    pub fn of_hex(hex: impl Into<String>) -> Self {
        Self::Sha256(hex.into())
    }
}

impl fmt::Display for Integrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256(hex) => write!(f, "sha256:{hex}"),
            Self::Dev => write!(f, "sha256:dev"),
            Self::Project => write!(f, "sha256:project"),
        }
    }
}

impl TryFrom<String> for Integrity {
    type Error = InvalidIntegrity;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Integrity> for String {
    fn from(value: Integrity) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid integrity {value:?}: expected sha256:<64-hex> or sha256:dev/sha256:project")]
pub struct InvalidIntegrity {
    pub value: String,
}

/// `<id>@<commit-or-marker>`, uniquely identifying a materialization input.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SpaceKey {
    pub id: SpaceId,
    pub commit: CommitSha,
}

impl SpaceKey {
    pub fn new(id: SpaceId, commit: CommitSha) -> Self {
        Self { id, commit }
    }

    pub fn parse(s: &str) -> Result<Self, InvalidSpaceKey> {
        let (id, commit) = s
            .split_once('@')
            .ok_or_else(|| InvalidSpaceKey { value: s.to_string() })?;
        let id = SpaceId::parse(id).map_err(|_| InvalidSpaceKey { value: s.to_string() })?;
        let commit = CommitSha::parse(commit).map_err(|_| InvalidSpaceKey { value: s.to_string() })?;
        Ok(Self { id, commit })
    }
}

impl fmt::Display for SpaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.commit)
    }
}

impl TryFrom<String> for SpaceKey {
    type Error = InvalidSpaceKey;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SpaceKey> for String {
    fn from(value: SpaceKey) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid space key {value:?}: expected <id>@<commit-or-marker>")]
pub struct InvalidSpaceKey {
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_id_boundary_lengths() {
        assert!(SpaceId::parse(&"a".repeat(1)).is_ok());
        assert!(SpaceId::parse(&"a".repeat(64)).is_ok());
        assert!(SpaceId::parse("").is_err());
        assert!(SpaceId::parse(&"a".repeat(65)).is_err());
    }

    #[test]
    fn space_id_rejects_bad_pattern() {
        assert!(SpaceId::parse("Foo").is_err());
        assert!(SpaceId::parse("-foo").is_err());
        assert!(SpaceId::parse("foo-").is_err());
        assert!(SpaceId::parse("foo--bar").is_err());
    }

    #[test]
    fn commit_sha_boundary_lengths() {
        assert!(CommitSha::parse(&"a".repeat(7)).is_ok());
        assert!(CommitSha::parse(&"a".repeat(64)).is_ok());
        assert!(CommitSha::parse(&"a".repeat(6)).is_err());
        assert!(CommitSha::parse(&"a".repeat(65)).is_err());
        assert!(matches!(CommitSha::parse("dev"), Ok(CommitSha::Dev)));
        assert!(matches!(CommitSha::parse("project"), Ok(CommitSha::Project)));
    }

    #[test]
    fn integrity_round_trips() {
        let i = Integrity::of_hex("a".repeat(64));
        let s = i.to_string();
        assert_eq!(Integrity::parse(&s).unwrap(), i);
        assert_eq!(Integrity::parse("sha256:dev").unwrap(), Integrity::Dev);
    }

    #[test]
    fn space_key_round_trips() {
        let key = SpaceKey::new(SpaceId::parse("base").unwrap(), CommitSha::parse("dev").unwrap());
        assert_eq!(SpaceKey::parse(&key.to_string()).unwrap(), key);
    }

    #[test]
    fn path_segment_fallback() {
        let id = SpaceId::from_path_segment("___");
        assert_eq!(id.as_str(), "path-ref");
        let id = SpaceId::from_path_segment("My Cool Space!");
        assert_eq!(id.as_str(), "my-cool-space");
    }
}
