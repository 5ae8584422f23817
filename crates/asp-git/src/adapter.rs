use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::exec::{run_with_timeout, CommandOutput};
use crate::{GitError, CLONE_TIMEOUT, DEFAULT_TIMEOUT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntryType {
    Blob,
    Tree,
    Commit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: String,
    pub entry_type: TreeEntryType,
    pub oid: String,
    /// Path relative to the `ls-tree` root, NOT re-rooted under the
    /// requested subpath.
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub url: String,
    pub kind: String,
}

/// A handle bound to one working directory. Every operation shells out
/// to the `git` binary named by `ASP_GIT_BIN` (default `git`).
#[derive(Debug, Clone)]
pub struct GitAdapter {
    cwd: PathBuf,
}

impl GitAdapter {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    fn program() -> String {
        env::var("ASP_GIT_BIN").unwrap_or_else(|_| "git".to_string())
    }

    fn run(&self, subcommand: &str, args: &[&str], timeout: Duration) -> Result<CommandOutput, GitError> {
        let program = Self::program();
        tracing::debug!(subcommand, ?args, "git exec");
        let out = run_with_timeout(&program, args, &self.cwd, timeout)?;
        if out.timed_out {
            return Err(GitError::Timeout {
                subcommand: subcommand.to_string(),
                timeout,
            });
        }
        Ok(out)
    }

    fn run_ok(&self, subcommand: &str, args: &[&str], timeout: Duration) -> Result<CommandOutput, GitError> {
        let out = self.run(subcommand, args, timeout)?;
        if out.exit_code != 0 {
            return Err(GitError::NonZeroExit {
                subcommand: subcommand.to_string(),
                exit_code: out.exit_code,
                stderr: out.stderr_string().trim().to_string(),
            });
        }
        Ok(out)
    }

    /// `git show <commit>:<path>` → file bytes, or `None` if missing.
    pub fn show(&self, commit: &str, path: &str) -> Result<Option<Vec<u8>>, GitError> {
        let spec = format!("{commit}:{path}");
        let out = self.run("show", &["show", &spec], DEFAULT_TIMEOUT)?;
        if out.exit_code == 0 {
            Ok(Some(out.stdout))
        } else if out.stderr_string().contains("does not exist")
            || out.stderr_string().contains("exists on disk, but not in")
            || out.stderr_string().contains("Not a valid object name")
        {
            Ok(None)
        } else {
            Err(GitError::NonZeroExit {
                subcommand: "show".to_string(),
                exit_code: out.exit_code,
                stderr: out.stderr_string().trim().to_string(),
            })
        }
    }

    /// `git ls-tree -r -t <commit>[:<path>]`. Tab-delimited parsing
    /// tolerates spaces in paths.
    pub fn ls_tree(&self, commit: &str, path: Option<&str>, recursive: bool) -> Result<Vec<TreeEntry>, GitError> {
        let spec = match path {
            Some(p) if !p.is_empty() => format!("{commit}:{p}"),
            _ => commit.to_string(),
        };
        let mut args = vec!["ls-tree"];
        if recursive {
            args.push("-r");
        }
        args.push("-t");
        args.push(&spec);
        let out = self.run_ok("ls-tree", &args, DEFAULT_TIMEOUT)?;
        parse_ls_tree(&out.stdout_string())
    }

    /// `git archive --format=tar <commit> [<path>]` piped into `tar -x`
    /// under `dest`, stripping the subpath's depth so the extracted
    /// files land directly under `dest`.
    pub fn archive_extract(&self, commit: &str, path: Option<&str>, dest: &Path) -> Result<(), GitError> {
        std::fs::create_dir_all(dest).map_err(|e| GitError::TarFailure(e.to_string()))?;

        let program = Self::program();
        let mut archive_args = vec!["archive".to_string(), "--format=tar".to_string(), commit.to_string()];
        let strip_components = path.map(|p| p.trim_matches('/').split('/').filter(|s| !s.is_empty()).count()).unwrap_or(0);
        if let Some(p) = path {
            archive_args.push(p.to_string());
        }

        let mut archive = Command::new(&program)
            .args(&archive_args)
            .current_dir(&self.cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GitError::Spawn { program: program.clone(), source: e })?;

        let archive_stdout = archive.stdout.take().expect("piped stdout");

        let mut tar_args = vec!["-x".to_string()];
        if strip_components > 0 {
            tar_args.push(format!("--strip-components={strip_components}"));
        }
        tar_args.push("-C".to_string());
        tar_args.push(dest.display().to_string());

        let mut tar = Command::new("tar")
            .args(&tar_args)
            .stdin(Stdio::from(archive_stdout))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GitError::Spawn { program: "tar".to_string(), source: e })?;

        // Drain both stderr streams concurrently so neither side blocks
        // on a full pipe while the other is still writing.
        let archive_stderr = archive.stderr.take();
        let tar_stderr_handle = tar.stderr.take();
        let archive_err_thread = std::thread::spawn(move || read_all(archive_stderr));
        let tar_err_thread = std::thread::spawn(move || read_all(tar_stderr_handle));

        let archive_status = archive.wait().map_err(|e| GitError::Spawn { program: program.clone(), source: e })?;
        let tar_status = tar.wait().map_err(|e| GitError::Spawn { program: "tar".to_string(), source: e })?;
        let archive_stderr = archive_err_thread.join().unwrap_or_default();
        let tar_stderr = tar_err_thread.join().unwrap_or_default();

        if !archive_status.success() || !tar_status.success() {
            return Err(GitError::TarFailure(format!(
                "git archive: {} | tar: {}",
                String::from_utf8_lossy(&archive_stderr).trim(),
                String::from_utf8_lossy(&tar_stderr).trim()
            )));
        }
        Ok(())
    }

    /// `git tag -l <pattern> --format=%(refname:short)`.
    pub fn tag_list(&self, pattern: &str) -> Result<Vec<String>, GitError> {
        let out = self.run_ok(
            "tag",
            &["tag", "-l", pattern, "--format=%(refname:short)"],
            DEFAULT_TIMEOUT,
        )?;
        Ok(out
            .stdout_string()
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }

    /// Dereference an annotated (or lightweight) tag to a commit via `<tag>^{}`.
    pub fn deref_tag(&self, tag: &str) -> Result<String, GitError> {
        let spec = format!("{tag}^{{}}");
        let out = self.run_ok("rev-parse", &["rev-parse", &spec], DEFAULT_TIMEOUT)?;
        Ok(out.stdout_string().trim().to_string())
    }

    pub fn rev_parse(&self, rev: &str) -> Result<String, GitError> {
        let out = self.run_ok("rev-parse", &["rev-parse", rev], DEFAULT_TIMEOUT)?;
        Ok(out.stdout_string().trim().to_string())
    }

    pub fn symbolic_ref(&self, name: &str) -> Result<String, GitError> {
        let out = self.run_ok("symbolic-ref", &["symbolic-ref", name], DEFAULT_TIMEOUT)?;
        Ok(out.stdout_string().trim().to_string())
    }

    pub fn status_porcelain_b(&self) -> Result<String, GitError> {
        let out = self.run_ok("status", &["status", "--porcelain", "-b"], DEFAULT_TIMEOUT)?;
        Ok(out.stdout_string())
    }

    pub fn is_clean(&self) -> Result<bool, GitError> {
        let out = self.run_ok("status", &["status", "--porcelain"], DEFAULT_TIMEOUT)?;
        Ok(out.stdout_string().trim().is_empty())
    }

    pub fn remote_v(&self) -> Result<Vec<RemoteEntry>, GitError> {
        let out = self.run_ok("remote", &["remote", "-v"], DEFAULT_TIMEOUT)?;
        let mut remotes = Vec::new();
        for line in out.stdout_string().lines() {
            let mut parts = line.split_whitespace();
            let (Some(name), Some(url), Some(kind)) = (parts.next(), parts.next(), parts.next()) else {
                continue;
            };
            remotes.push(RemoteEntry {
                name: name.to_string(),
                url: url.to_string(),
                kind: kind.trim_matches(['(', ')']).to_string(),
            });
        }
        Ok(remotes)
    }

    pub fn init(&self) -> Result<(), GitError> {
        std::fs::create_dir_all(&self.cwd).map_err(|e| GitError::TarFailure(e.to_string()))?;
        self.run_ok("init", &["init"], DEFAULT_TIMEOUT)?;
        Ok(())
    }

    pub fn add(&self, pathspec: &str) -> Result<(), GitError> {
        self.run_ok("add", &["add", pathspec], DEFAULT_TIMEOUT)?;
        Ok(())
    }

    pub fn commit(&self, message: &str) -> Result<(), GitError> {
        self.run_ok("commit", &["commit", "-m", message], DEFAULT_TIMEOUT)?;
        Ok(())
    }

    pub fn tag_create(&self, name: &str, annotated: bool, message: Option<&str>) -> Result<(), GitError> {
        if annotated {
            let message = message.unwrap_or(name);
            self.run_ok("tag", &["tag", "-a", name, "-m", message], DEFAULT_TIMEOUT)?;
        } else {
            self.run_ok("tag", &["tag", name], DEFAULT_TIMEOUT)?;
        }
        Ok(())
    }

    pub fn tag_push(&self, remote: &str, name: &str) -> Result<(), GitError> {
        self.run_ok("push", &["push", remote, name], DEFAULT_TIMEOUT)?;
        Ok(())
    }

    pub fn tag_delete(&self, name: &str) -> Result<(), GitError> {
        self.run_ok("tag", &["tag", "-d", name], DEFAULT_TIMEOUT)?;
        Ok(())
    }

    pub fn clone(
        &self,
        url: &str,
        dest: &Path,
        branch: Option<&str>,
        depth: Option<u32>,
    ) -> Result<(), GitError> {
        let mut args = vec!["clone".to_string()];
        if let Some(b) = branch {
            args.push("--branch".to_string());
            args.push(b.to_string());
        }
        if let Some(d) = depth {
            args.push("--depth".to_string());
            args.push(d.to_string());
        }
        args.push(url.to_string());
        args.push(dest.display().to_string());

        let program = Self::program();
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = run_with_timeout(&program, &arg_refs, &self.cwd, CLONE_TIMEOUT)?;
        if out.timed_out {
            return Err(GitError::Timeout {
                subcommand: "clone".to_string(),
                timeout: CLONE_TIMEOUT,
            });
        }
        if out.exit_code != 0 {
            return Err(GitError::NonZeroExit {
                subcommand: "clone".to_string(),
                exit_code: out.exit_code,
                stderr: out.stderr_string().trim().to_string(),
            });
        }
        Ok(())
    }
}

fn read_all(stream: Option<impl std::io::Read>) -> Vec<u8> {
    use std::io::Read as _;
    let mut buf = Vec::new();
    if let Some(mut s) = stream {
        let _ = s.read_to_end(&mut buf);
    }
    buf
}

fn parse_ls_tree(stdout: &str) -> Result<Vec<TreeEntry>, GitError> {
    let mut entries = Vec::new();
    for line in stdout.lines() {
        if line.is_empty() {
            continue;
        }
        // "<mode> <type> <oid>\t<path>"
        let (meta, path) = line.split_once('\t').ok_or_else(|| GitError::UnexpectedOutput {
            subcommand: "ls-tree".to_string(),
            detail: format!("missing tab delimiter in {line:?}"),
        })?;
        let mut meta_parts = meta.split_whitespace();
        let mode = meta_parts.next().ok_or_else(|| GitError::UnexpectedOutput {
            subcommand: "ls-tree".to_string(),
            detail: format!("missing mode in {line:?}"),
        })?;
        let kind = meta_parts.next().ok_or_else(|| GitError::UnexpectedOutput {
            subcommand: "ls-tree".to_string(),
            detail: format!("missing type in {line:?}"),
        })?;
        let oid = meta_parts.next().ok_or_else(|| GitError::UnexpectedOutput {
            subcommand: "ls-tree".to_string(),
            detail: format!("missing oid in {line:?}"),
        })?;
        let entry_type = match kind {
            "blob" => TreeEntryType::Blob,
            "tree" => TreeEntryType::Tree,
            "commit" => TreeEntryType::Commit,
            other => {
                return Err(GitError::UnexpectedOutput {
                    subcommand: "ls-tree".to_string(),
                    detail: format!("unknown entry type {other:?}"),
                });
            }
        };
        entries.push(TreeEntry {
            mode: mode.to_string(),
            entry_type,
            oid: oid.to_string(),
            path: path.to_string(),
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ls_tree_output_with_spaces_in_path() {
        let stdout = "100644 blob abc123\tcommands/my command.md\n100755 blob def456\thooks/run.sh\n";
        let entries = parse_ls_tree(stdout).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "commands/my command.md");
        assert_eq!(entries[0].mode, "100644");
        assert_eq!(entries[1].entry_type, TreeEntryType::Blob);
    }

    #[test]
    fn parse_ls_tree_rejects_missing_tab() {
        assert!(parse_ls_tree("100644 blob abc123 no-tab-path\n").is_err());
    }
}
