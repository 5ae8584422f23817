//! One function per warning code. Each rule reads the `LintContext` and
//! returns the warnings it finds; it never touches another rule's
//! state, so the engine can run them in any order.

use std::collections::BTreeMap;

use asp_materialize::{build_plugin_manifest, read_hooks, COMPONENT_DIRS};
use asp_types::{Severity, Warning};

use crate::context::LintContext;

/// Harness ids whose launch contract has no way to block on a hook.
const NO_HOOK_SUPPORT_HARNESSES: &[&str] = &["pi"];

/// Command/agent base names reserved by the harnesses themselves; a
/// space exposing one unnamespaced would shadow a built-in.
const RESERVED_NAMES: &[&str] = &["help", "exit", "clear", "config", "version", "login", "logout"];

pub fn w101_lock_absent(ctx: &LintContext) -> Vec<Warning> {
    if ctx.lock_present {
        return Vec::new();
    }
    vec![Warning::new("W101", Severity::Info, "no lock file found for this project; lint is reporting against an unpinned resolution")]
}

pub fn w201_command_name_collisions(ctx: &LintContext) -> Vec<Warning> {
    let mut base_name_owners: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, space) in ctx.spaces.iter().enumerate() {
        let commands_dir = space.plugin_path.join("commands");
        let Ok(entries) = std::fs::read_dir(&commands_dir) else { continue };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Some(base) = path.file_stem().and_then(|s| s.to_str()) else { continue };
            base_name_owners.entry(base.to_string()).or_default().push(i);
        }
    }

    base_name_owners
        .into_iter()
        .filter(|(_, owners)| owners.len() > 1)
        .map(|(base, owners)| {
            let plugin_names: Vec<String> = owners
                .iter()
                .map(|&i| build_plugin_manifest(&ctx.spaces[i].manifest).name)
                .collect();
            let suggestions = plugin_names.iter().map(|name| format!("/{name}:{base}")).collect::<Vec<_>>().join(", ");
            let mut warning = Warning::new(
                "W201",
                Severity::Warning,
                format!("commands/{base}.md is provided by more than one space; consider invoking it as one of: {suggestions}"),
            )
            .with_path(format!("commands/{base}.md"));
            if let Some(&first) = owners.first() {
                warning = warning.with_space_key(ctx.spaces[first].key.clone());
            }
            warning
        })
        .collect()
}

pub fn w202_reserved_name(ctx: &LintContext) -> Vec<Warning> {
    let mut warnings = Vec::new();
    for space in &ctx.spaces {
        for component in ["commands", "agents"] {
            let dir = space.plugin_path.join(component);
            let Ok(entries) = std::fs::read_dir(&dir) else { continue };
            for entry in entries.flatten() {
                let path = entry.path();
                let Some(base) = path.file_stem().and_then(|s| s.to_str()) else { continue };
                if RESERVED_NAMES.contains(&base) {
                    warnings.push(
                        Warning::new("W202", Severity::Warning, format!("{component}/{base} uses a reserved non-namespaced name"))
                            .with_space_key(space.key.clone())
                            .with_path(format!("{component}/{base}")),
                    );
                }
            }
        }
    }
    warnings
}

pub fn w203_hook_path_traversal(ctx: &LintContext) -> Vec<Warning> {
    let mut warnings = Vec::new();
    for space in &ctx.spaces {
        let hooks_dir = space.plugin_path.join("hooks");
        let Ok(hooks) = read_hooks(&hooks_dir) else { continue };
        for entries in hooks.values() {
            for entry in entries {
                let suspicious = entry.command.split('/').any(|seg| seg == "..") || entry.args.iter().any(|a| a.split('/').any(|seg| seg == ".."));
                if suspicious {
                    warnings.push(
                        Warning::new("W203", Severity::Warning, format!("hook command {:?} escapes the space root", entry.command))
                            .with_space_key(space.key.clone())
                            .with_path("hooks"),
                    );
                }
            }
        }
    }
    warnings
}

pub fn w204_malformed_or_missing_hooks_config(ctx: &LintContext) -> Vec<Warning> {
    let mut warnings = Vec::new();
    for space in &ctx.spaces {
        let hooks_dir = space.plugin_path.join("hooks");
        if !hooks_dir.is_dir() {
            continue;
        }
        let toml_present = hooks_dir.join("hooks.toml").is_file();
        let json_present = hooks_dir.join("hooks.json").is_file();
        if !toml_present && !json_present {
            warnings.push(
                Warning::new("W204", Severity::Warning, "hooks/ is present but neither hooks.toml nor hooks.json exists")
                    .with_space_key(space.key.clone())
                    .with_path("hooks"),
            );
            continue;
        }
        if read_hooks(&hooks_dir).is_err() {
            warnings.push(
                Warning::new("W204", Severity::Warning, "hooks/ is present but its hook configuration failed to parse")
                    .with_space_key(space.key.clone())
                    .with_path("hooks"),
            );
        }
    }
    warnings
}

pub fn w205_duplicate_plugin_name(ctx: &LintContext) -> Vec<Warning> {
    let mut owners: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, space) in ctx.spaces.iter().enumerate() {
        let name = build_plugin_manifest(&space.manifest).name;
        owners.entry(name).or_default().push(i);
    }
    owners
        .into_iter()
        .filter(|(_, owners)| owners.len() > 1)
        .map(|(name, owners)| {
            let mut warning = Warning::new("W205", Severity::Warning, format!("plugin name {name:?} is used by more than one space"));
            if let Some(&first) = owners.first() {
                warning = warning.with_space_key(ctx.spaces[first].key.clone());
            }
            warning
        })
        .collect()
}

#[cfg(unix)]
pub fn w206_hook_script_not_executable(ctx: &LintContext) -> Vec<Warning> {
    use std::os::unix::fs::PermissionsExt;
    let mut warnings = Vec::new();
    for space in &ctx.spaces {
        let hooks_dir = space.plugin_path.join("hooks");
        let Ok(hooks) = read_hooks(&hooks_dir) else { continue };
        for entries in hooks.values() {
            for entry in entries {
                if entry.command.starts_with('/') || !entry.command.contains('/') {
                    continue;
                }
                let script_path = space.plugin_path.join(&entry.command);
                let Ok(meta) = std::fs::metadata(&script_path) else { continue };
                if meta.permissions().mode() & 0o111 == 0 {
                    warnings.push(
                        Warning::new("W206", Severity::Warning, format!("hook script {} lacks the user-execute bit", entry.command))
                            .with_space_key(space.key.clone())
                            .with_path(entry.command.clone()),
                    );
                }
            }
        }
    }
    warnings
}

#[cfg(not(unix))]
pub fn w206_hook_script_not_executable(_ctx: &LintContext) -> Vec<Warning> {
    Vec::new()
}

pub fn w207_component_dir_inside_plugin_dir(ctx: &LintContext) -> Vec<Warning> {
    let mut warnings = Vec::new();
    for space in &ctx.spaces {
        let nested_root = space.plugin_path.join(".claude-plugin");
        for component in COMPONENT_DIRS {
            if nested_root.join(component).is_dir() {
                warnings.push(
                    Warning::new("W207", Severity::Warning, format!(".claude-plugin/{component} is nested inside the plugin manifest directory"))
                        .with_space_key(space.key.clone())
                        .with_path(format!(".claude-plugin/{component}")),
                );
            }
        }
    }
    warnings
}

pub fn w301_harness_cannot_block_hooks(ctx: &LintContext) -> Vec<Warning> {
    let Some(harness_id) = &ctx.harness_id else { return Vec::new() };
    if !NO_HOOK_SUPPORT_HARNESSES.contains(&harness_id.as_str()) {
        return Vec::new();
    }
    let mut warnings = Vec::new();
    for space in &ctx.spaces {
        let hooks_dir = space.plugin_path.join("hooks");
        if let Ok(hooks) = read_hooks(&hooks_dir) {
            if !hooks.is_empty() {
                warnings.push(
                    Warning::new("W301", Severity::Warning, format!("harness {harness_id} cannot honor blocking hook semantics declared by this space"))
                        .with_space_key(space.key.clone())
                        .with_path("hooks"),
                );
            }
        }
    }
    warnings
}
