//! Read-only input to every rule: the set of spaces composed into one
//! target, each with the manifest used to build it and the path its
//! artifact landed at.

use std::path::PathBuf;

use asp_types::{SpaceKey, SpaceManifest};

pub struct LintSpace {
    pub key: SpaceKey,
    pub manifest: SpaceManifest,
    pub plugin_path: PathBuf,
}

pub struct LintContext {
    pub spaces: Vec<LintSpace>,
    /// Whether a lock file exists for the project being linted (W101).
    pub lock_present: bool,
    /// The harness id the target was (or will be) composed for, if
    /// lint runs in the context of one build (drives W301).
    pub harness_id: Option<String>,
}

impl LintContext {
    pub fn new(spaces: Vec<LintSpace>) -> Self {
        Self { spaces, lock_present: true, harness_id: None }
    }
}
