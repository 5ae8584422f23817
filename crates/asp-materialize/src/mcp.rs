//! Merges each space's `mcp/mcp.json` across `loadOrder` into one
//! target-level MCP server map, warning (not failing) on name clashes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use asp_types::SpaceKey;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default)]
    pub mcp_servers: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct McpMergeWarning {
    pub server_name: String,
    pub owners: Vec<SpaceKey>,
}

/// `sources` is in `loadOrder`; the later entry wins a duplicate name,
/// mirroring how later-loaded spaces override earlier settings
/// elsewhere in the composer.
pub fn merge_mcp_servers(
    sources: &[(SpaceKey, McpConfig)],
) -> (BTreeMap<String, serde_json::Value>, Vec<McpMergeWarning>) {
    let mut merged = BTreeMap::new();
    let mut owners: BTreeMap<String, Vec<SpaceKey>> = BTreeMap::new();

    for (key, config) in sources {
        for (name, value) in &config.mcp_servers {
            merged.insert(name.clone(), value.clone());
            owners.entry(name.clone()).or_default().push(key.clone());
        }
    }

    let warnings = owners
        .into_iter()
        .filter(|(_, keys)| keys.len() > 1)
        .map(|(server_name, owners)| McpMergeWarning { server_name, owners })
        .collect();

    (merged, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use asp_types::{CommitSha, SpaceId};

    fn key(id: &str) -> SpaceKey {
        SpaceKey::new(SpaceId::parse(id).unwrap(), CommitSha::parse("dev").unwrap())
    }

    fn config(servers: &[(&str, &str)]) -> McpConfig {
        let mut mcp_servers = BTreeMap::new();
        for (name, command) in servers {
            mcp_servers.insert(name.to_string(), serde_json::json!({ "command": command }));
        }
        McpConfig { mcp_servers }
    }

    #[test]
    fn later_load_order_entry_wins_duplicate_name() {
        let sources = vec![
            (key("base"), config(&[("search", "base-search")])),
            (key("top"), config(&[("search", "top-search")])),
        ];
        let (merged, warnings) = merge_mcp_servers(&sources);
        assert_eq!(merged["search"]["command"], "top-search");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].server_name, "search");
        assert_eq!(warnings[0].owners.len(), 2);
    }

    #[test]
    fn empty_when_no_space_declares_servers() {
        let sources = vec![(key("base"), config(&[]))];
        let (merged, warnings) = merge_mcp_servers(&sources);
        assert!(merged.is_empty());
        assert!(warnings.is_empty());
    }
}
