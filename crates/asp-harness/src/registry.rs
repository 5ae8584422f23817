//! Keyed lookup over the registered `HarnessAdapter`s. The only place
//! that knows the full set of harness ids; everything else asks the
//! registry.

use std::collections::BTreeMap;

use crate::adapter::HarnessAdapter;
use crate::claude::ClaudeAdapter;
use crate::codex::CodexAdapter;
use crate::pi::PiAdapter;
use crate::HarnessError;

pub const DEFAULT_HARNESS_ID: &str = "claude";

pub struct HarnessRegistry {
    adapters: BTreeMap<&'static str, Box<dyn HarnessAdapter>>,
}

impl HarnessRegistry {
    pub fn new() -> Self {
        Self { adapters: BTreeMap::new() }
    }

    pub fn register(&mut self, adapter: Box<dyn HarnessAdapter>) {
        self.adapters.insert(adapter.id(), adapter);
    }

    pub fn get(&self, id: &str) -> Result<&dyn HarnessAdapter, HarnessError> {
        self.adapters
            .get(id)
            .map(|a| a.as_ref())
            .ok_or_else(|| HarnessError::NotFound { id: id.to_string(), known_ids: self.ids() })
    }

    pub fn ids(&self) -> Vec<String> {
        self.adapters.keys().map(|id| id.to_string()).collect()
    }

    pub fn default_adapter(&self) -> &dyn HarnessAdapter {
        self.get(DEFAULT_HARNESS_ID).expect("default harness is always registered")
    }
}

impl Default for HarnessRegistry {
    /// Pre-registers the three built-in adapters in a known order.
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ClaudeAdapter));
        registry.register(Box::new(CodexAdapter));
        registry.register(Box::new(PiAdapter));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_knows_all_three_harnesses() {
        let registry = HarnessRegistry::default();
        assert_eq!(registry.ids(), vec!["claude", "codex", "pi"]);
        assert_eq!(registry.default_adapter().id(), "claude");
    }

    #[test]
    fn unknown_id_lists_registered_ids() {
        let registry = HarnessRegistry::default();
        let err = registry.get("nonexistent").unwrap_err();
        match err {
            HarnessError::NotFound { id, known_ids } => {
                assert_eq!(id, "nonexistent");
                assert_eq!(known_ids, vec!["claude", "codex", "pi"]);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
