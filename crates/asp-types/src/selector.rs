//! Selector and space-reference data model (parsing lives in `asp-refs`).

use serde::{Deserialize, Serialize};

use crate::ids::SpaceId;

/// How a selector string resolves a space to a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selector {
    /// Read the source from the working copy; never hashed.
    Dev,
    /// Current tip of the registry.
    Head,
    /// A named channel resolved via the committed dist-tags file.
    DistTag(String),
    /// A semver range (`exact=false`) or an exact `X.Y.Z[-pre]` (`exact=true`).
    Semver { range: String, exact: bool },
    /// Use this commit literally, unvalidated until the tree is read.
    GitPin(String),
}

impl Selector {
    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }
}

/// The three syntactic shapes a `space:` reference can take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefKind {
    Plain,
    Project,
    Path(String),
}

/// A parsed `space:` reference, still carrying the original selector text
/// for traceability (error messages, `lock.spaces[..].resolvedFrom`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceRef {
    pub kind: RefKind,
    pub id: SpaceId,
    pub selector: Selector,
    /// The selector text as written, or `None` when it was omitted.
    pub selector_text: Option<String>,
    /// True when no selector was written and `dev` was assumed.
    pub defaulted_to_dev: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_is_dev() {
        assert!(Selector::Dev.is_dev());
        assert!(!Selector::Head.is_dev());
    }
}
