//! Plugin-dir harness shape: a flag-list launcher taking one
//! `--plugin-dir` per space in load order.

use std::path::{Path, PathBuf};

use asp_git::exec::run_with_timeout;
use asp_materialize::MaterializedArtifact;
use asp_types::SpaceManifest;

use crate::adapter::{mcp_merge_warning, ComposeOutcome, ComposeTargetInput, DetectResult, HarnessAdapter, MaterializeSpaceInput, ValidateResult};
use crate::bundle::{Bundle, RunOptions};
use crate::HarnessError;

pub const ENV_PATH_OVERRIDE: &str = "ASP_CLAUDE_PATH";
const DEFAULT_PROGRAM: &str = "claude";
const DETECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

pub struct ClaudeAdapter;

impl ClaudeAdapter {
    fn program() -> String {
        std::env::var(ENV_PATH_OVERRIDE).unwrap_or_else(|_| DEFAULT_PROGRAM.to_string())
    }
}

impl HarnessAdapter for ClaudeAdapter {
    fn id(&self) -> &'static str {
        "claude"
    }

    fn name(&self) -> &'static str {
        "Claude Code"
    }

    fn models(&self) -> &'static [&'static str] {
        &["default", "fast", "reasoning"]
    }

    fn program(&self) -> String {
        Self::program()
    }

    fn detect(&self) -> DetectResult {
        let program = Self::program();
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        match run_with_timeout(&program, &["--version"], &cwd, DETECT_TIMEOUT) {
            Ok(output) if output.exit_code == 0 => DetectResult {
                available: true,
                version: Some(output.stdout_string().trim().to_string()),
                path: Some(PathBuf::from(&program)),
                capabilities: vec!["plugin-dir".to_string(), "hooks".to_string(), "mcp".to_string()],
                error: None,
            },
            Ok(output) => DetectResult { available: false, error: Some(output.stderr_string()), ..Default::default() },
            Err(e) => DetectResult { available: false, error: Some(e.to_string()), ..Default::default() },
        }
    }

    fn validate_space(&self, _manifest: &SpaceManifest) -> ValidateResult {
        ValidateResult::ok()
    }

    fn materialize_space(&self, input: &MaterializeSpaceInput, cache_dir: &Path) -> Result<MaterializedArtifact, HarnessError> {
        let (plugin, _hooks, artifact) = asp_materialize::materialize_space(input.space_dir, cache_dir, input.manifest, input.use_hardlinks)
            .map_err(|source| HarnessError::Materialize { space_id: input.manifest.id.to_string(), source })?;

        let plugin_dir = cache_dir.join(".claude-plugin");
        std::fs::create_dir_all(&plugin_dir).map_err(|e| HarnessError::io(plugin_dir.display(), e))?;
        let json = serde_json::to_string_pretty(&plugin).map_err(HarnessError::from)?;
        std::fs::write(plugin_dir.join("plugin.json"), json).map_err(|e| HarnessError::io(plugin_dir.display(), e))?;

        Ok(artifact)
    }

    fn compose_target(&self, input: &ComposeTargetInput) -> Result<ComposeOutcome, HarnessError> {
        let mut mcp_sources = Vec::new();
        for (key, dir) in input.keys.iter().zip(input.artifact_dirs) {
            let mcp_path = dir.join("mcp").join("mcp.json");
            if mcp_path.is_file() {
                let text = std::fs::read_to_string(&mcp_path).map_err(|e| HarnessError::io(mcp_path.display(), e))?;
                let config: asp_materialize::McpConfig = serde_json::from_str(&text).map_err(HarnessError::from)?;
                mcp_sources.push((key.clone(), config));
            }
        }
        let (merged, mcp_warnings) = asp_materialize::merge_mcp_servers(&mcp_sources);
        let warnings = mcp_warnings.into_iter().map(mcp_merge_warning).collect();

        std::fs::create_dir_all(input.output_dir).map_err(|e| HarnessError::io(input.output_dir.display(), e))?;
        let mcp_config_path = if merged.is_empty() {
            None
        } else {
            let path = input.output_dir.join("mcp.json");
            let doc = serde_json::json!({ "mcpServers": merged });
            std::fs::write(&path, serde_json::to_string_pretty(&doc).map_err(HarnessError::from)?)
                .map_err(|e| HarnessError::io(path.display(), e))?;
            Some(path)
        };

        let bundle = Bundle::PluginDir {
            plugin_dirs: input.artifact_dirs.to_vec(),
            mcp_config_path,
            settings_path: None,
        };
        Ok(ComposeOutcome { bundle, warnings })
    }

    fn build_run_args(&self, bundle: &Bundle, options: &RunOptions) -> Vec<String> {
        let Bundle::PluginDir { plugin_dirs, mcp_config_path, settings_path } = bundle else {
            panic!("claude adapter received a non-plugin-dir bundle");
        };
        let settings = options.settings.clone().or_else(|| settings_path.as_ref().map(|p| p.display().to_string()));

        let mut argv = Vec::new();
        for dir in plugin_dirs {
            argv.push("--plugin-dir".to_string());
            argv.push(dir.display().to_string());
        }
        if let Some(path) = mcp_config_path {
            argv.push("--mcp-config".to_string());
            argv.push(path.display().to_string());
        }
        if let Some(model) = &options.model {
            argv.push("--model".to_string());
            argv.push(model.clone());
        }
        if let Some(mode) = &options.permission_mode {
            argv.push("--permission-mode".to_string());
            argv.push(mode.clone());
        }
        if let Some(sources) = &options.setting_sources {
            argv.push("--setting-sources".to_string());
            argv.push(sources.clone());
        }
        if let Some(settings) = settings {
            argv.push("--settings".to_string());
            argv.push(settings);
        }
        if options.debug_hooks {
            argv.push("--debug".to_string());
            argv.push("hooks".to_string());
        }
        if let Some(prompt) = &options.prompt {
            argv.push(prompt.clone());
        }
        argv.extend(options.extra_args.iter().cloned());
        argv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_run_args_orders_plugin_dirs_then_flags_then_prompt() {
        let bundle = Bundle::PluginDir {
            plugin_dirs: vec![PathBuf::from("/store/a"), PathBuf::from("/store/b")],
            mcp_config_path: Some(PathBuf::from("/out/mcp.json")),
            settings_path: None,
        };
        let options = RunOptions {
            model: Some("default".to_string()),
            prompt: Some("hello".to_string()),
            extra_args: vec!["--no-interactive".to_string()],
            ..Default::default()
        };
        let argv = ClaudeAdapter.build_run_args(&bundle, &options);
        assert_eq!(
            argv,
            vec![
                "--plugin-dir", "/store/a",
                "--plugin-dir", "/store/b",
                "--mcp-config", "/out/mcp.json",
                "--model", "default",
                "hello",
                "--no-interactive",
            ]
        );
    }
}
