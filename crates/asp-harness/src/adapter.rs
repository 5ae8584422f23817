//! The `HarnessAdapter` contract (C10): the single extension seam.
//! Shared code dispatches by id into the registry; it never branches on
//! a harness id itself (the "harness plugins" design note).

use std::path::{Path, PathBuf};

use asp_types::{SpaceKey, SpaceManifest, Severity, Warning};

use crate::bundle::{Bundle, RunOptions};

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
    pub available: bool,
    pub version: Option<String>,
    pub path: Option<PathBuf>,
    pub capabilities: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ValidateResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidateResult {
    pub fn ok() -> Self {
        Self { valid: true, errors: Vec::new(), warnings: Vec::new() }
    }
}

pub struct MaterializeSpaceInput<'a> {
    pub space_dir: &'a Path,
    pub manifest: &'a SpaceManifest,
    pub use_hardlinks: bool,
}

pub struct ComposeTargetInput<'a> {
    pub target_name: &'a str,
    /// Keys, in `loadOrder`, parallel to `artifact_dirs`/`manifests`.
    pub keys: &'a [SpaceKey],
    /// Per-space artifact directories, in `loadOrder`.
    pub artifact_dirs: &'a [PathBuf],
    pub manifests: &'a [&'a SpaceManifest],
    pub output_dir: &'a Path,
}

/// A composed bundle plus any non-fatal warnings raised while assembling
/// it (e.g. an MCP server name collision across spaces).
pub struct ComposeOutcome {
    pub bundle: Bundle,
    pub warnings: Vec<Warning>,
}

/// `W401`: not a static lint rule (see `asp-lint`), but the same
/// `Warning` shape so compose-time and lint-time diagnostics render and
/// serialize identically wherever a target's warnings are collected.
pub fn mcp_merge_warning(warning: asp_materialize::McpMergeWarning) -> Warning {
    let owners = warning.owners.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(", ");
    Warning::new(
        "W401",
        Severity::Warning,
        format!("mcp server {:?} declared by more than one space ({owners}); the later entry in load order wins", warning.server_name),
    )
    .with_details(serde_json::json!({ "server_name": warning.server_name, "owners": warning.owners }))
}

pub trait HarnessAdapter: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn models(&self) -> &'static [&'static str];

    /// The executable to spawn, honoring whatever environment override
    /// this harness documents (e.g. `ASP_CLAUDE_PATH`).
    fn program(&self) -> String;

    fn detect(&self) -> DetectResult;

    fn validate_space(&self, manifest: &SpaceManifest) -> ValidateResult;

    fn materialize_space(&self, input: &MaterializeSpaceInput, cache_dir: &Path) -> Result<asp_materialize::MaterializedArtifact, crate::HarnessError>;

    fn compose_target(&self, input: &ComposeTargetInput) -> Result<ComposeOutcome, crate::HarnessError>;

    fn build_run_args(&self, bundle: &Bundle, options: &RunOptions) -> Vec<String>;

    /// Environment variables the child process needs beyond the parent's
    /// own environment. Most shapes need none; agent-home harnesses point
    /// their home-directory variable at the composed bundle root.
    fn build_run_env(&self, _bundle: &Bundle) -> Vec<(String, String)> {
        Vec::new()
    }

    /// `<aspModulesDir>/<target>/<harnessId>`.
    fn target_output_path(&self, asp_modules_dir: &Path, target_name: &str) -> PathBuf {
        asp_modules_dir.join(target_name).join(self.id())
    }
}
