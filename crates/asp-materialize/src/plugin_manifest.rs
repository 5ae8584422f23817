//! Deterministic plugin-identity derivation and the `plugin.json`
//! (or equivalent) document built from a resolved manifest.

use serde::{Deserialize, Serialize};

use asp_types::SpaceManifest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

/// `name = plugin.name ?? id`, `version = plugin.version ?? manifest.version`;
/// every other field copies through verbatim.
pub fn build_plugin_manifest(manifest: &SpaceManifest) -> PluginManifest {
    PluginManifest {
        name: manifest.plugin_name(),
        version: manifest.plugin_version(),
        description: manifest.plugin.description.clone().or_else(|| manifest.description.clone()),
        author: manifest.plugin.author.clone(),
        homepage: manifest.plugin.homepage.clone(),
        repository: manifest.plugin.repository.clone(),
        license: manifest.plugin.license.clone(),
        keywords: manifest.plugin.keywords.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asp_types::SpaceId;
    use std::collections::BTreeMap;

    #[test]
    fn falls_back_to_id_and_manifest_version_and_description() {
        let manifest = SpaceManifest {
            schema: 1,
            id: SpaceId::parse("base").unwrap(),
            version: "2.0.0".to_string(),
            description: Some("base space".to_string()),
            plugin: Default::default(),
            deps: Default::default(),
            settings: Default::default(),
            harness: Default::default(),
            harness_sections: BTreeMap::new(),
        };
        let plugin = build_plugin_manifest(&manifest);
        assert_eq!(plugin.name, "base");
        assert_eq!(plugin.version, "2.0.0");
        assert_eq!(plugin.description.as_deref(), Some("base space"));
    }
}
