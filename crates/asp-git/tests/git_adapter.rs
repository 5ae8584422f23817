use std::fs;

use asp_git::GitAdapter;
use tempfile::tempdir;

fn init_repo_with_commit(dir: &std::path::Path) {
    let git = GitAdapter::new(dir);
    git.init().expect("init");
    fs::write(dir.join("space.toml"), "schema = 1\n").expect("write");
    git.add(".").expect("add");
    // commit identity is required in CI sandboxes with no global config
    std::process::Command::new("git")
        .args(["config", "user.email", "asp@example.com"])
        .current_dir(dir)
        .output()
        .expect("config email");
    std::process::Command::new("git")
        .args(["config", "user.name", "asp"])
        .current_dir(dir)
        .output()
        .expect("config name");
    git.commit("initial").expect("commit");
}

#[test]
fn is_clean_reflects_working_tree() {
    let dir = tempdir().expect("tempdir");
    init_repo_with_commit(dir.path());
    let git = GitAdapter::new(dir.path());
    assert!(git.is_clean().expect("status"));

    fs::write(dir.path().join("space.toml"), "schema = 2\n").expect("write");
    assert!(!git.is_clean().expect("status"));
}

#[test]
fn show_returns_none_for_missing_path() {
    let dir = tempdir().expect("tempdir");
    init_repo_with_commit(dir.path());
    let git = GitAdapter::new(dir.path());
    let head = git.rev_parse("HEAD").expect("rev-parse");
    assert!(git.show(&head, "does-not-exist.toml").unwrap().is_none());
    assert!(git.show(&head, "space.toml").unwrap().is_some());
}

#[test]
fn ls_tree_lists_committed_files() {
    let dir = tempdir().expect("tempdir");
    init_repo_with_commit(dir.path());
    let git = GitAdapter::new(dir.path());
    let entries = git.ls_tree("HEAD", None, true).expect("ls-tree");
    assert!(entries.iter().any(|e| e.path == "space.toml"));
}
