//! Extension-bundle harness shape: a single `--bundle <path>` flag
//! pointing at a directory of per-space extension folders. Pi has no
//! concept of blocking hooks, so any hook present is a validation
//! warning rather than a translation target.

use std::path::{Path, PathBuf};

use asp_git::exec::run_with_timeout;
use asp_materialize::MaterializedArtifact;
use asp_types::SpaceManifest;

use crate::adapter::{ComposeOutcome, ComposeTargetInput, DetectResult, HarnessAdapter, MaterializeSpaceInput, ValidateResult};
use crate::bundle::{Bundle, RunOptions};
use crate::HarnessError;

pub const ENV_PATH_OVERRIDE: &str = "ASP_PI_PATH";
const DEFAULT_PROGRAM: &str = "pi";
const DETECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

pub struct PiAdapter;

impl PiAdapter {
    fn program() -> String {
        std::env::var(ENV_PATH_OVERRIDE).unwrap_or_else(|_| DEFAULT_PROGRAM.to_string())
    }
}

impl HarnessAdapter for PiAdapter {
    fn id(&self) -> &'static str {
        "pi"
    }

    fn name(&self) -> &'static str {
        "Pi"
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
                capabilities: vec!["extension-bundle".to_string()],
                error: None,
            },
            Ok(output) => DetectResult { available: false, error: Some(output.stderr_string()), ..Default::default() },
            Err(e) => DetectResult { available: false, error: Some(e.to_string()), ..Default::default() },
        }
    }

    /// Pi cannot honor blocking hook semantics; a space that declares a
    /// `hooks/` directory still materializes, but the lint engine's W301
    /// rule flags it when this harness is the build target.
    fn validate_space(&self, _manifest: &SpaceManifest) -> ValidateResult {
        ValidateResult::ok()
    }

    fn materialize_space(&self, input: &MaterializeSpaceInput, cache_dir: &Path) -> Result<MaterializedArtifact, HarnessError> {
        let (_plugin, _hooks, artifact) = asp_materialize::materialize_space(input.space_dir, cache_dir, input.manifest, input.use_hardlinks)
            .map_err(|source| HarnessError::Materialize { space_id: input.manifest.id.to_string(), source })?;
        // Hooks that exist but can't block on this harness are flagged by
        // the lint engine's W301 rule, not here.
        Ok(artifact)
    }

    fn compose_target(&self, input: &ComposeTargetInput) -> Result<ComposeOutcome, HarnessError> {
        std::fs::create_dir_all(input.output_dir).map_err(|e| HarnessError::io(input.output_dir.display(), e))?;

        let mut manifest_entries = Vec::new();
        for (dir, manifest) in input.artifact_dirs.iter().zip(input.manifests.iter()) {
            let ext_dir = input.output_dir.join(manifest.id.as_str());
            asp_materialize::link::link_or_copy_tree(dir, &ext_dir, true)
                .map_err(|source| HarnessError::Bundle { path: dir.display().to_string(), source: Box::new(source) })?;
            manifest_entries.push(serde_json::json!({
                "id": manifest.id.as_str(),
                "version": manifest.version,
                "path": manifest.id.as_str(),
            }));
        }

        let run_manifest = serde_json::json!({ "extensions": manifest_entries });
        let manifest_path = input.output_dir.join("bundle.json");
        std::fs::write(&manifest_path, serde_json::to_string_pretty(&run_manifest).map_err(HarnessError::from)?)
            .map_err(|e| HarnessError::io(manifest_path.display(), e))?;

        Ok(ComposeOutcome { bundle: Bundle::ExtensionBundle { dir: input.output_dir.to_path_buf() }, warnings: Vec::new() })
    }

    fn build_run_args(&self, bundle: &Bundle, options: &RunOptions) -> Vec<String> {
        let Bundle::ExtensionBundle { dir } = bundle else {
            panic!("pi adapter received a non-extension-bundle bundle");
        };
        let mut argv = vec!["--bundle".to_string(), dir.display().to_string()];
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_run_args_leads_with_bundle_flag() {
        let bundle = Bundle::ExtensionBundle { dir: PathBuf::from("/out/bundle") };
        let options = RunOptions { prompt: Some("hi".to_string()), ..Default::default() };
        let argv = PiAdapter.build_run_args(&bundle, &options);
        assert_eq!(argv, vec!["--bundle", "/out/bundle", "hi"]);
    }
}
