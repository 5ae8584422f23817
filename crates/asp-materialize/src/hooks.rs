//! Canonical abstract-event hook format, `hooks.toml`, and normalization
//! of the legacy `hooks.json` shape into the same in-memory model so the
//! rest of the materializer never special-cases which one a space ships.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::MaterializeError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HookEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matcher: Option<String>,
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

/// Abstract event name (e.g. `pre_tool_use`) to its ordered hook entries.
pub type AbstractHooks = BTreeMap<String, Vec<HookEntry>>;

pub fn parse_hooks_toml(text: &str) -> Result<AbstractHooks, toml::de::Error> {
    toml::from_str(text)
}

#[derive(Debug, Deserialize)]
struct LegacyMatcherGroup {
    #[serde(default)]
    matcher: Option<String>,
    #[serde(default)]
    hooks: Vec<LegacyHookCommand>,
}

#[derive(Debug, Deserialize)]
struct LegacyHookCommand {
    #[serde(default, rename = "type")]
    #[allow(dead_code)]
    kind: Option<String>,
    command: String,
    #[serde(default)]
    timeout: Option<u64>,
}

/// `hooks.json` groups events under PascalCase harness event names
/// (`PreToolUse`); each event is a list of matcher groups, each holding
/// one or more command hooks. Normalizes event names to `snake_case` so
/// they line up with `hooks.toml`'s keys.
pub fn normalize_legacy_hooks_json(text: &str) -> Result<AbstractHooks, serde_json::Error> {
    let legacy: BTreeMap<String, Vec<LegacyMatcherGroup>> = serde_json::from_str(text)?;
    let mut out = AbstractHooks::new();
    for (event, groups) in legacy {
        let key = to_snake_case(&event);
        let entries = out.entry(key).or_default();
        for group in groups {
            for hook in group.hooks {
                entries.push(HookEntry {
                    matcher: group.matcher.clone(),
                    command: hook.command,
                    args: Vec::new(),
                    timeout_seconds: hook.timeout,
                });
            }
        }
    }
    Ok(out)
}

/// Renders the canonical abstract-event hook set into the grouped
/// `hooks.json` shape harnesses like Claude expect: PascalCase event
/// names, one matcher group per distinct matcher (`*` when a hook
/// declares none), each holding its ordered `command` hooks.
pub fn render_hooks_json(hooks: &AbstractHooks) -> serde_json::Value {
    let mut events = serde_json::Map::new();
    for (event, entries) in hooks {
        let mut groups: BTreeMap<String, Vec<serde_json::Value>> = BTreeMap::new();
        for entry in entries {
            let matcher = entry.matcher.clone().unwrap_or_else(|| "*".to_string());
            let mut hook = serde_json::json!({
                "type": "command",
                "command": entry.command,
            });
            if let Some(timeout) = entry.timeout_seconds {
                hook["timeout"] = serde_json::json!(timeout);
            }
            groups.entry(matcher).or_default().push(hook);
        }
        let event_groups: Vec<serde_json::Value> = groups
            .into_iter()
            .map(|(matcher, hooks)| serde_json::json!({ "matcher": matcher, "hooks": hooks }))
            .collect();
        events.insert(to_pascal_case(event), serde_json::Value::Array(event_groups));
    }
    serde_json::Value::Object(events)
}

fn to_pascal_case(name: &str) -> String {
    name.split('_')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Reads `hooks.toml` if present, else falls back to legacy
/// `hooks.json`, else an empty hook set (no `hooks/` content at all is
/// not an error here; lint's W204 flags a `hooks/` dir with neither).
pub fn read_hooks(hooks_dir: &Path) -> Result<AbstractHooks, MaterializeError> {
    let toml_path = hooks_dir.join("hooks.toml");
    if toml_path.is_file() {
        let text = std::fs::read_to_string(&toml_path).map_err(|e| MaterializeError::io(toml_path.display(), e))?;
        return parse_hooks_toml(&text).map_err(|source| MaterializeError::HooksToml { path: toml_path.display().to_string(), source });
    }
    let json_path = hooks_dir.join("hooks.json");
    if json_path.is_file() {
        let text = std::fs::read_to_string(&json_path).map_err(|e| MaterializeError::io(json_path.display(), e))?;
        return normalize_legacy_hooks_json(&text).map_err(|source| MaterializeError::HooksJson { path: json_path.display().to_string(), source });
    }
    Ok(AbstractHooks::new())
}

/// chmods every referenced, relative-path script to `ugo+x` before the
/// artifact is sealed. Scripts already executable, missing, or
/// referenced by absolute/PATH-relative command are left alone (the
/// latter two aren't this materializer's to fix).
#[cfg(unix)]
pub fn ensure_hook_scripts_executable(space_dir: &Path, hooks: &AbstractHooks) -> Vec<String> {
    use std::os::unix::fs::PermissionsExt;
    let mut warnings = Vec::new();
    for entries in hooks.values() {
        for entry in entries {
            if entry.command.starts_with('/') || !entry.command.contains('/') {
                continue;
            }
            let script_path = space_dir.join(&entry.command);
            match std::fs::metadata(&script_path) {
                Ok(meta) => {
                    let mut perms = meta.permissions();
                    let mode = perms.mode();
                    if mode & 0o111 == 0 {
                        perms.set_mode(mode | 0o111);
                        if std::fs::set_permissions(&script_path, perms).is_err() {
                            warnings.push(format!("could not chmod +x {}", script_path.display()));
                        }
                    }
                }
                Err(_) => warnings.push(format!("hook script not found: {}", script_path.display())),
            }
        }
    }
    warnings
}

#[cfg(not(unix))]
pub fn ensure_hook_scripts_executable(_space_dir: &Path, _hooks: &AbstractHooks) -> Vec<String> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hooks_toml_into_abstract_events() {
        let text = r#"
[[pre_tool_use]]
matcher = "Bash"
command = "scripts/check.sh"
args = ["--flag"]
timeout_seconds = 30
"#;
        let hooks = parse_hooks_toml(text).unwrap();
        let entries = &hooks["pre_tool_use"];
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].command, "scripts/check.sh");
        assert_eq!(entries[0].timeout_seconds, Some(30));
    }

    #[test]
    fn normalizes_legacy_hooks_json_event_names() {
        let text = r#"{
            "PreToolUse": [
                { "matcher": "Bash", "hooks": [{ "type": "command", "command": "scripts/check.sh", "timeout": 10 }] }
            ]
        }"#;
        let hooks = normalize_legacy_hooks_json(text).unwrap();
        assert!(hooks.contains_key("pre_tool_use"));
        assert_eq!(hooks["pre_tool_use"][0].command, "scripts/check.sh");
    }

    #[test]
    fn renders_grouped_hooks_json_with_pascal_case_events_and_default_matcher() {
        let text = r#"
[[pre_tool_use]]
matcher = "Bash"
command = "scripts/check.sh"

[[post_tool_use]]
command = "scripts/log.sh"
"#;
        let hooks = parse_hooks_toml(text).unwrap();
        let rendered = render_hooks_json(&hooks);
        assert_eq!(rendered["PreToolUse"][0]["matcher"], "Bash");
        assert_eq!(rendered["PreToolUse"][0]["hooks"][0]["command"], "scripts/check.sh");
        assert_eq!(rendered["PostToolUse"][0]["matcher"], "*");
        assert_eq!(rendered["PostToolUse"][0]["hooks"][0]["command"], "scripts/log.sh");
    }

    #[test]
    fn read_hooks_prefers_toml_over_legacy_json() {
        let td = tempfile::tempdir().unwrap();
        std::fs::write(td.path().join("hooks.toml"), "[[pre_tool_use]]\ncommand = \"a.sh\"\n").unwrap();
        std::fs::write(td.path().join("hooks.json"), "{}").unwrap();
        let hooks = read_hooks(td.path()).unwrap();
        assert!(hooks.contains_key("pre_tool_use"));
    }

    #[test]
    fn read_hooks_is_empty_when_neither_file_exists() {
        let td = tempfile::tempdir().unwrap();
        let hooks = read_hooks(td.path()).unwrap();
        assert!(hooks.is_empty());
    }
}
