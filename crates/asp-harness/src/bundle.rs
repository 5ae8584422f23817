//! The composer's output (C9): a discriminated record keyed by harness
//! id, carrying only the file layout the invoker needs. Environment
//! variables and argv are the adapter's contract, not the bundle's.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum Bundle {
    /// `--plugin-dir` style: ordered per-space artifact paths.
    PluginDir {
        plugin_dirs: Vec<PathBuf>,
        mcp_config_path: Option<PathBuf>,
        settings_path: Option<PathBuf>,
    },
    /// Agent-home style: one directory, `AGENTS.md` + generated config +
    /// `prompts/`/`skills/` + optional `mcp.json`.
    AgentHome { root: PathBuf },
    /// Extension-bundle style: bundled scripts plus a run manifest.
    ExtensionBundle { dir: PathBuf },
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub model: Option<String>,
    pub permission_mode: Option<String>,
    pub setting_sources: Option<String>,
    pub settings: Option<String>,
    pub debug_hooks: bool,
    pub prompt: Option<String>,
    pub extra_args: Vec<String>,
}
