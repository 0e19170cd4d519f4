// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Process seam for the external Git binary.
//!
//! Every git interaction in gitrig funnels through [`Gitcall`]: an
//! executable invoked with an explicit argument vector inside a chosen
//! working directory. No shell sits in between, so there is no quoting
//! ambiguity to worry about when a config value contains spaces.
//!
//! The seam exists because tracked config files are edited by running
//! `git config --local` inside their tracking repositories. Going through
//! the binary rather than a library binding keeps git's own config parsing
//! and locking behavior, which is what makes the symlinked `.git/config`
//! trick work at all.

use std::{ffi::OsStr, path::Path, process::Command};

/// Invoke version-control commands inside a working directory.
pub trait Gitcall {
    /// Run a git subcommand, capturing combined output.
    ///
    /// Blocks until the command finishes. A non-zero exit status is an
    /// error carrying the captured output.
    fn call(&self, cur_dir: &Path, args: &[&str]) -> Result<String>;
}

/// [`Gitcall`] through the system's `git` executable.
#[derive(Clone, Copy, Debug, Default)]
pub struct GitBinary;

impl Gitcall for GitBinary {
    fn call(&self, cur_dir: &Path, args: &[&str]) -> Result<String> {
        syscall_non_interactive("git", cur_dir, args)
    }
}

fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    cur_dir: &Path,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let output = Command::new(cmd.as_ref())
        .current_dir(cur_dir)
        .args(args)
        .output()?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();
    let mut message = String::new();

    if !stdout.is_empty() {
        message.push_str(format!("stdout: {stdout}").as_str());
    }

    if !stderr.is_empty() {
        message.push_str(format!("stderr: {stderr}").as_str());
    }

    // INVARIANT: Chomp trailing newlines.
    let message = message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message);

    if !output.status.success() {
        return Err(GitcallError::Syscall(std::io::Error::other(format!(
            "command {:?} failed:\n{message}",
            cmd.as_ref()
        ))));
    }

    Ok(message)
}

/// Process invocation error types.
#[derive(Debug, thiserror::Error)]
pub enum GitcallError {
    /// Command could not be spawned, or exited unsuccessfully.
    #[error(transparent)]
    Syscall(#[from] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = GitcallError> = std::result::Result<T, E>;
