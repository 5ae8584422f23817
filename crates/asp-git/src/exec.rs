//! Process execution with an explicit, pollable timeout.
//!
//! Spawn, poll `try_wait` on a short interval, and kill on deadline
//! rather than blocking forever on `Child::wait`.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::GitError;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub timed_out: bool,
    pub duration: Duration,
}

impl CommandOutput {
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

pub fn run_with_timeout(
    program: &str,
    args: &[&str],
    cwd: &Path,
    timeout: Duration,
) -> Result<CommandOutput, GitError> {
    let start = Instant::now();
    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|e| GitError::Spawn {
        program: program.to_string(),
        source: e,
    })?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait().map_err(|e| GitError::Spawn {
            program: program.to_string(),
            source: e,
        })? {
            Some(status) => {
                let (stdout, stderr) = drain(&mut child);
                return Ok(CommandOutput {
                    exit_code: status.code().unwrap_or(-1),
                    stdout,
                    stderr,
                    timed_out: false,
                    duration: start.elapsed(),
                });
            }
            None => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    let (stdout, mut stderr) = drain(&mut child);
                    stderr.extend_from_slice(
                        format!("\ncommand timed out after {timeout:?}").as_bytes(),
                    );
                    return Ok(CommandOutput {
                        exit_code: -1,
                        stdout,
                        stderr,
                        timed_out: true,
                        duration: start.elapsed(),
                    });
                }
                std::thread::sleep(Duration::from_millis(25));
            }
        }
    }
}

fn drain(child: &mut std::process::Child) -> (Vec<u8>, Vec<u8>) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    if let Some(mut out) = child.stdout.take() {
        let _ = out.read_to_end(&mut stdout);
    }
    if let Some(mut err) = child.stderr.take() {
        let _ = err.read_to_end(&mut stderr);
    }
    (stdout, stderr)
}
