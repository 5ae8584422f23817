//! Agent-home harness shape: a single directory pointed at by an
//! environment variable, holding concatenated instructions, a generated
//! config file, and component directories renamed to the harness's
//! conventions.

use std::path::{Path, PathBuf};

use asp_git::exec::run_with_timeout;
use asp_materialize::MaterializedArtifact;
use asp_types::SpaceManifest;

use crate::adapter::{mcp_merge_warning, ComposeOutcome, ComposeTargetInput, DetectResult, HarnessAdapter, MaterializeSpaceInput, ValidateResult};
use crate::bundle::{Bundle, RunOptions};
use crate::HarnessError;

pub const ENV_HOME_VAR: &str = "CODEX_HOME";
pub const ENV_PATH_OVERRIDE: &str = "ASP_CODEX_PATH";
const DEFAULT_PROGRAM: &str = "codex";
const DETECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

pub struct CodexAdapter;

impl CodexAdapter {
    fn program() -> String {
        std::env::var(ENV_PATH_OVERRIDE).unwrap_or_else(|_| DEFAULT_PROGRAM.to_string())
    }
}

impl HarnessAdapter for CodexAdapter {
    fn id(&self) -> &'static str {
        "codex"
    }

    fn name(&self) -> &'static str {
        "Codex"
    }

    fn models(&self) -> &'static [&'static str] {
        &["default"]
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
                capabilities: vec!["agent-home".to_string(), "mcp".to_string()],
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
        let (_plugin, _hooks, artifact) = asp_materialize::materialize_space(input.space_dir, cache_dir, input.manifest, input.use_hardlinks)
            .map_err(|source| HarnessError::Materialize { space_id: input.manifest.id.to_string(), source })?;
        Ok(artifact)
    }

    fn compose_target(&self, input: &ComposeTargetInput) -> Result<ComposeOutcome, HarnessError> {
        std::fs::create_dir_all(input.output_dir).map_err(|e| HarnessError::io(input.output_dir.display(), e))?;

        let mut agents_md = String::new();
        let mut mcp_sources = Vec::new();
        let prompts_dir = input.output_dir.join("prompts");
        let skills_dir = input.output_dir.join("skills");
        std::fs::create_dir_all(&prompts_dir).map_err(|e| HarnessError::io(prompts_dir.display(), e))?;
        std::fs::create_dir_all(&skills_dir).map_err(|e| HarnessError::io(skills_dir.display(), e))?;

        for ((key, dir), manifest) in input.keys.iter().zip(input.artifact_dirs.iter()).zip(input.manifests.iter()) {
            if let Some(description) = &manifest.description {
                agents_md.push_str(&format!("## {}\n\n{}\n\n", manifest.id, description));
            }

            let commands_dir = dir.join("commands");
            if commands_dir.is_dir() {
                asp_materialize::link::link_or_copy_tree(&commands_dir, &prompts_dir, true)
                    .map_err(|source| HarnessError::Bundle { path: commands_dir.display().to_string(), source: Box::new(source) })?;
            }
            let skills_src = dir.join("skills");
            if skills_src.is_dir() {
                asp_materialize::link::link_or_copy_tree(&skills_src, &skills_dir, true)
                    .map_err(|source| HarnessError::Bundle { path: skills_src.display().to_string(), source: Box::new(source) })?;
            }
            let mcp_path = dir.join("mcp").join("mcp.json");
            if mcp_path.is_file() {
                let text = std::fs::read_to_string(&mcp_path).map_err(|e| HarnessError::io(mcp_path.display(), e))?;
                let config: asp_materialize::McpConfig = serde_json::from_str(&text).map_err(HarnessError::from)?;
                mcp_sources.push((key.clone(), config));
            }
        }

        std::fs::write(input.output_dir.join("AGENTS.md"), agents_md).map_err(|e| HarnessError::io(input.output_dir.display(), e))?;

        let (merged, mcp_warnings) = asp_materialize::merge_mcp_servers(&mcp_sources);
        let warnings = mcp_warnings.into_iter().map(mcp_merge_warning).collect();

        let config = serde_json::json!({
            "sandbox_mode": "workspace-write",
            "approval_policy": "on-request",
            "project_doc_fallback_filenames": ["AGENTS.md", "AGENT.md"],
            "mcp_servers": merged,
        });
        let config_toml = toml::to_string_pretty(&config).map_err(|e| HarnessError::Bundle {
            path: input.output_dir.join("config.toml").display().to_string(),
            source: Box::new(e),
        })?;
        std::fs::write(input.output_dir.join("config.toml"), config_toml).map_err(|e| HarnessError::io(input.output_dir.display(), e))?;

        Ok(ComposeOutcome { bundle: Bundle::AgentHome { root: input.output_dir.to_path_buf() }, warnings })
    }

    fn build_run_args(&self, bundle: &Bundle, options: &RunOptions) -> Vec<String> {
        let Bundle::AgentHome { .. } = bundle else {
            panic!("codex adapter received a non-agent-home bundle");
        };
        let mut argv = Vec::new();
        if let Some(model) = &options.model {
            argv.push("--model".to_string());
            argv.push(model.clone());
        }
        if let Some(prompt) = &options.prompt {
            argv.push(prompt.clone());
        }
        argv.extend(options.extra_args.iter().cloned());
        argv
    }

    fn build_run_env(&self, bundle: &Bundle) -> Vec<(String, String)> {
        let Bundle::AgentHome { root } = bundle else {
            panic!("codex adapter received a non-agent-home bundle");
        };
        vec![(ENV_HOME_VAR.to_string(), root.display().to_string())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_run_env_points_codex_home_at_bundle_root() {
        let bundle = Bundle::AgentHome { root: PathBuf::from("/home/.codex") };
        let env = CodexAdapter.build_run_env(&bundle);
        assert_eq!(env, vec![(ENV_HOME_VAR.to_string(), "/home/.codex".to_string())]);
    }

    #[test]
    fn build_run_args_passes_model_and_prompt() {
        let bundle = Bundle::AgentHome { root: PathBuf::from("/home/.codex") };
        let options = RunOptions { model: Some("default".to_string()), prompt: Some("hi".to_string()), ..Default::default() };
        let argv = CodexAdapter.build_run_args(&bundle, &options);
        assert_eq!(argv, vec!["--model", "default", "hi"]);
    }
}
