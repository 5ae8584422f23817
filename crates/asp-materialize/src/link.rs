//! Links (or copies) a space's component directories into a build
//! destination. Hardlinks are attempted first since the source tree is
//! immutable once snapshotted; copy is the cross-filesystem fallback.

use std::path::Path;

use walkdir::WalkDir;

use crate::MaterializeError;

pub const COMPONENT_DIRS: &[&str] = &["commands", "skills", "agents", "hooks", "mcp"];

/// Links every `COMPONENT_DIRS` entry present directly under `source`
/// into the matching subdirectory of `dest`. Never mutates `source`.
pub fn link_components(source: &Path, dest: &Path, use_hardlinks: bool) -> Result<Vec<String>, MaterializeError> {
    let mut linked = Vec::new();
    for component in COMPONENT_DIRS {
        let src_dir = source.join(component);
        if !src_dir.is_dir() {
            continue;
        }
        let dest_dir = dest.join(component);
        let files = link_or_copy_tree(&src_dir, &dest_dir, use_hardlinks)?;
        linked.extend(files);
    }
    Ok(linked)
}

/// Recursively mirrors `src` into `dest`, hardlinking each file when
/// possible and falling back to a copy (different filesystem, or
/// `use_hardlinks=false`). Returns the list of files written, relative
/// to `dest`'s parent.
pub fn link_or_copy_tree(src: &Path, dest: &Path, use_hardlinks: bool) -> Result<Vec<String>, MaterializeError> {
    let mut written = Vec::new();
    for entry in WalkDir::new(src).into_iter() {
        let entry = entry.map_err(|e| MaterializeError::Walk { path: src.display().to_string(), source: e })?;
        let rel = entry.path().strip_prefix(src).expect("WalkDir yields children of src");
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)
                .map_err(|e| MaterializeError::io(target.display(), e))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MaterializeError::io(parent.display(), e))?;
        }
        if target.exists() {
            std::fs::remove_file(&target).map_err(|e| MaterializeError::io(target.display(), e))?;
        }
        if use_hardlinks {
            if std::fs::hard_link(entry.path(), &target).is_err() {
                std::fs::copy(entry.path(), &target).map_err(|e| MaterializeError::io(target.display(), e))?;
            }
        } else {
            std::fs::copy(entry.path(), &target).map_err(|e| MaterializeError::io(target.display(), e))?;
        }
        written.push(target.display().to_string());
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_only_recognized_component_directories() {
        let td = tempfile::tempdir().unwrap();
        let source = td.path().join("source");
        let dest = td.path().join("dest");
        std::fs::create_dir_all(source.join("commands")).unwrap();
        std::fs::write(source.join("commands").join("hello.md"), b"# hi").unwrap();
        std::fs::create_dir_all(source.join("not-a-component")).unwrap();
        std::fs::write(source.join("not-a-component").join("x.txt"), b"x").unwrap();

        link_components(&source, &dest, true).unwrap();
        assert!(dest.join("commands").join("hello.md").is_file());
        assert!(!dest.join("not-a-component").exists());
    }

    #[test]
    fn copy_fallback_produces_independent_file_when_hardlinks_disabled() {
        let td = tempfile::tempdir().unwrap();
        let source = td.path().join("source");
        let dest = td.path().join("dest");
        std::fs::create_dir_all(source.join("skills")).unwrap();
        std::fs::write(source.join("skills").join("s.md"), b"content").unwrap();

        link_components(&source, &dest, false).unwrap();
        let copied = dest.join("skills").join("s.md");
        assert_eq!(std::fs::read(&copied).unwrap(), b"content");
    }
}
