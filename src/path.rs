// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevant path information for the config files, tracking
//! directories, and includeIf rules that gitrig needs to interact with, or
//! manage in some way.

use std::path::{Path, PathBuf};

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Expand leading tilde notation to the user's home directory.
///
/// A path without tilde notation passes through unchanged. Does not check if
/// the path returned actually exists.
pub fn expand_tilde(path: impl AsRef<str>) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path.as_ref()).into_owned())
}

/// Derive the tracking directory for a raw config path.
///
/// The __raw__ (unexpanded) path string is joined onto the invocation
/// directory, so `~/.gitconfig` derives to `<root>/~/.gitconfig` and every
/// tracking repository nests under the literal `~` subtree that cleanup
/// removes at the end of a run. The derivation never touches the user's
/// actual home directory, so the invocation directory stays self-contained.
///
/// # Invariant
///
/// - Tracking initialization and settings application resolve the same raw
///   path to the same directory. Both call here.
pub fn tracking_dir(root: impl AsRef<Path>, raw_path: impl AsRef<str>) -> PathBuf {
    root.as_ref().join(raw_path.as_ref())
}

/// Create a symbolic link at `link` pointing to `original`.
///
/// On Windows this may require administrator privilege or developer mode.
#[cfg(unix)]
pub fn symlink_file(original: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}
#[cfg(windows)]
pub fn symlink_file(original: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(original, link)
}

/// Path convention of the host platform.
///
/// Git for Windows wants includeIf paths in drive-letter notation, while
/// shells on the same machine often hand out POSIX-style `/c/...` paths.
/// The convention is selected once at startup and passed to whatever
/// normalization needs it, instead of scattering platform conditionals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PathStyle {
    /// Forward-slash paths, no drive prefixes.
    #[default]
    Posix,

    /// Drive-letter paths of the `C:/...` form.
    Windows,
}

impl PathStyle {
    /// Determine path convention of the current host.
    pub fn host() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Posix
        }
    }

    /// Normalize a gitdir pattern for an includeIf rule.
    ///
    /// Tilde notation is expanded, backslashes become forward slashes, a
    /// leading single-letter `/x/` prefix is rewritten to `X:/` on the
    /// Windows convention, and a trailing separator is appended when missing
    /// so that prefix-glob matching works.
    pub fn normalize_gitdir(&self, gitdir: impl AsRef<str>) -> String {
        // Backslashes first, so tilde notation written as `~\` still expands.
        let slashed = gitdir.as_ref().replace('\\', "/");
        let mut gitdir = shellexpand::tilde(slashed.as_str()).into_owned();
        if let Self::Windows = self {
            gitdir = rewrite_drive_prefix(gitdir);
        }
        if !gitdir.ends_with('/') {
            gitdir.push('/');
        }

        gitdir
    }

    /// Normalize an include path for an includeIf rule.
    ///
    /// Tilde notation is expanded, and backslashes become forward slashes.
    pub fn normalize_include_path(&self, path: impl AsRef<str>) -> String {
        let slashed = path.as_ref().replace('\\', "/");
        shellexpand::tilde(slashed.as_str()).into_owned()
    }
}

/// Rewrite a leading `/x/` POSIX drive prefix to `X:/` notation.
fn rewrite_drive_prefix(path: String) -> String {
    let mut chars = path.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('/'), Some(drive), Some('/')) if drive.is_ascii_alphabetic() => {
            format!("{}:/{}", drive.to_ascii_uppercase(), chars.as_str())
        }
        _ => path,
    }
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
