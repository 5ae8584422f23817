//! Lint engine (C11): independent rules over a materialized target,
//! concatenated and sorted into one stable, always-non-fatal result.

pub mod context;
pub mod engine;
pub mod rules;

pub use context::{LintContext, LintSpace};
pub use engine::run;

#[cfg(test)]
mod tests {
    use super::*;
    use asp_types::manifest::{PluginOverrides, SpaceDeps, SpaceSettings};
    use asp_types::{CommitSha, SpaceId, SpaceKey, SpaceManifest};
    use std::collections::BTreeMap;

    fn manifest(id: &str) -> SpaceManifest {
        SpaceManifest {
            schema: 1,
            id: SpaceId::parse(id).unwrap(),
            version: "1.0.0".to_string(),
            description: None,
            plugin: PluginOverrides::default(),
            deps: SpaceDeps::default(),
            settings: SpaceSettings::default(),
            harness: Default::default(),
            harness_sections: BTreeMap::new(),
        }
    }

    fn space(id: &str, plugin_path: std::path::PathBuf) -> LintSpace {
        LintSpace {
            key: SpaceKey::new(SpaceId::parse(id).unwrap(), CommitSha::parse("dev").unwrap()),
            manifest: manifest(id),
            plugin_path,
        }
    }

    #[test]
    fn reports_w101_when_lock_absent() {
        let ctx = LintContext { spaces: Vec::new(), lock_present: false, harness_id: None };
        let warnings = run(&ctx);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, "W101");
    }

    #[test]
    fn clean_context_produces_no_warnings() {
        let ctx = LintContext::new(Vec::new());
        assert!(run(&ctx).is_empty());
    }

    #[test]
    fn flags_command_base_name_collision_across_spaces() {
        let td = tempfile::tempdir().unwrap();
        let a = td.path().join("a");
        let b = td.path().join("b");
        std::fs::create_dir_all(a.join("commands")).unwrap();
        std::fs::create_dir_all(b.join("commands")).unwrap();
        std::fs::write(a.join("commands").join("build.md"), "# build").unwrap();
        std::fs::write(b.join("commands").join("build.md"), "# build").unwrap();

        let ctx = LintContext::new(vec![space("a", a), space("b", b)]);
        let warnings = run(&ctx);
        assert!(warnings.iter().any(|w| w.code == "W201"));
    }

    #[test]
    fn flags_hooks_dir_with_neither_config_file() {
        let td = tempfile::tempdir().unwrap();
        let a = td.path().join("a");
        std::fs::create_dir_all(a.join("hooks")).unwrap();

        let ctx = LintContext::new(vec![space("a", a)]);
        let warnings = run(&ctx);
        assert!(warnings.iter().any(|w| w.code == "W204"));
    }

    #[test]
    fn flags_pi_harness_unable_to_honor_hooks() {
        let td = tempfile::tempdir().unwrap();
        let a = td.path().join("a");
        std::fs::create_dir_all(a.join("hooks")).unwrap();
        std::fs::write(a.join("hooks").join("hooks.toml"), "[[pre_tool_use]]\ncommand = \"check.sh\"\n").unwrap();

        let mut ctx = LintContext::new(vec![space("a", a)]);
        ctx.harness_id = Some("pi".to_string());
        let warnings = run(&ctx);
        assert!(warnings.iter().any(|w| w.code == "W301"));
    }
}
