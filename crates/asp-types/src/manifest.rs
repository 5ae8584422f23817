//! Typed `space.toml` / `asp-targets.toml` manifests.
//!
//! These are the only path into the data: callers parse TOML into these
//! structs once, then every downstream consumer works with validated
//! records instead of re-walking a loosely typed document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::SpaceId;

/// `space.toml` at the root of a space's tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceManifest {
    /// Schema version; must currently be `1`.
    pub schema: u32,
    pub id: SpaceId,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub plugin: PluginOverrides,
    #[serde(default)]
    pub deps: SpaceDeps,
    #[serde(default)]
    pub settings: SpaceSettings,
    #[serde(default)]
    pub harness: HarnessSupport,
    /// Per-harness sections, keyed by harness id, opaque beyond that.
    #[serde(default, flatten)]
    pub harness_sections: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginOverrides {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub homepage: Option<String>,
    pub repository: Option<String>,
    pub license: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpaceDeps {
    #[serde(default)]
    pub spaces: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpaceSettings {
    #[serde(default)]
    pub permissions: PermissionSettings,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionSettings {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessSupport {
    #[serde(default)]
    pub supports: Vec<String>,
}

impl SpaceManifest {
    /// Deterministic plugin identity: `name = plugin.name ?? id`,
    /// `version = plugin.version ?? manifest.version`.
    pub fn plugin_name(&self) -> String {
        self.plugin.name.clone().unwrap_or_else(|| self.id.to_string())
    }

    pub fn plugin_version(&self) -> String {
        self.plugin.version.clone().unwrap_or_else(|| self.version.clone())
    }
}

/// `asp-targets.toml` at the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectManifest {
    pub schema: u32,
    pub targets: BTreeMap<String, Target>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub compose: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_identity_falls_back_to_id_and_version() {
        let manifest = SpaceManifest {
            schema: 1,
            id: SpaceId::parse("base").unwrap(),
            version: "1.2.3".to_string(),
            description: None,
            plugin: PluginOverrides::default(),
            deps: SpaceDeps::default(),
            settings: SpaceSettings::default(),
            harness: HarnessSupport::default(),
            harness_sections: BTreeMap::new(),
        };
        assert_eq!(manifest.plugin_name(), "base");
        assert_eq!(manifest.plugin_version(), "1.2.3");
    }
}
