// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Git profile configuration management.
//!
//! A __profile__ is a git configuration file the user wants under
//! independent version control: the primary `~/.gitconfig`, plus one config
//! file per identity pulled in through conditional includes.
//!
//! # Tracking Repositories
//!
//! Git offers no direct command for editing an arbitrary config file with
//! `git config --local` semantics. gitrig works around that with a
//! __tracking repository__: a scratch repository whose `.git/config` is
//! replaced by a symbolic link to the real target file. Running
//! `git config --local` inside the tracking repository then edits the
//! target file directly, with git's own parsing and locking rules applied
//! to it.
//!
//! Tracking repositories are transient. Each raw config path is joined onto
//! the invocation directory, so a path like `~/.gitconfig` nests its
//! tracking repository under a literal `~` subtree of wherever gitrig runs.
//! The whole subtree is removed at the end of a run; the target files keep
//! every change made through the links.
//!
//! # Failure Policy
//!
//! Every operation here is best-effort per item. A path whose symlink
//! cannot be created (a known environmental failure on Windows without
//! elevated privilege) is logged and skipped; the remaining paths still
//! process. Item results surface as [`Outcome`] values through logging,
//! never as errors returned to the caller.
//!
//! # See Also
//!
//! - [git-config documentation](https://git-scm.com/docs/git-config)

pub mod gitcall;
pub mod include;

use crate::{
    config::{Setting, SettingState},
    path::{expand_tilde, symlink_file, tracking_dir},
    profile::gitcall::{GitBinary, Gitcall},
};

use std::{
    collections::BTreeSet,
    fs::{remove_dir_all, remove_file, OpenOptions},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// A git config file tracked through a transient repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedConfig {
    raw: String,
    target: PathBuf,
    tracking_dir: PathBuf,
}

impl TrackedConfig {
    /// Derive tracking state for a raw config path.
    pub fn new(root: impl AsRef<Path>, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let target = expand_tilde(raw.as_str());
        let tracking_dir = tracking_dir(root, raw.as_str());

        Self {
            raw,
            target,
            tracking_dir,
        }
    }

    /// Raw path string as written in the manifest.
    pub fn raw(&self) -> &str {
        self.raw.as_str()
    }

    /// Expanded location of the real config file.
    pub fn target(&self) -> &Path {
        self.target.as_path()
    }

    /// Location of the transient tracking repository.
    pub fn tracking_dir(&self) -> &Path {
        self.tracking_dir.as_path()
    }
}

/// Per-item result of a best-effort operation.
///
/// Surfaced through logging and end-of-stage counts only; item failures
/// never abort a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The item took effect.
    Applied,

    /// The item was an expected no-op.
    Skipped,

    /// The item failed; the run continues.
    Failed(String),
}

/// Manager for the full set of tracked profiles.
///
/// Generic over the process seam so command sequences can be asserted in
/// tests without spawning git.
pub struct Workbench<G = GitBinary>
where
    G: Gitcall,
{
    root: PathBuf,
    runner: G,
}

impl Workbench<GitBinary> {
    /// Construct a workbench rooted at the invocation directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_runner(root, GitBinary)
    }
}

impl<G> Workbench<G>
where
    G: Gitcall,
{
    /// Construct a workbench with a custom process seam.
    pub fn with_runner(root: impl AsRef<Path>, runner: G) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            runner,
        }
    }

    /// Initialize tracking repositories for every unique raw path.
    ///
    /// Re-running over paths that are already tracked reproduces the same
    /// end-state: re-initialization is a no-op and the link is recreated in
    /// place.
    #[instrument(skip(self, paths), level = "debug")]
    pub fn init_tracking(&self, paths: &BTreeSet<String>) {
        info!("initializing tracking for {} config paths", paths.len());
        for raw in paths {
            let tracked = TrackedConfig::new(self.root.as_path(), raw.as_str());
            match self.init_one(&tracked) {
                Outcome::Applied => info!("tracking ready for {raw}"),
                Outcome::Skipped => debug!("tracking already in place for {raw}"),
                Outcome::Failed(reason) => warn!("cannot track {raw}: {reason}"),
            }
        }
    }

    fn init_one(&self, tracked: &TrackedConfig) -> Outcome {
        if let Err(err) = mkdirp::mkdirp(tracked.tracking_dir()) {
            return Outcome::Failed(format!(
                "create {:?}: {err}",
                tracked.tracking_dir().display()
            ));
        }

        if let Err(err) = self.runner.call(tracked.tracking_dir(), &["init"]) {
            return Outcome::Failed(format!("git init: {err}"));
        }

        if let Err(err) = touch_with_parents(tracked.target()) {
            return Outcome::Failed(format!("create {:?}: {err}", tracked.target().display()));
        }

        // The default config produced by git-init gives way to the link.
        let link = tracked.tracking_dir().join(".git").join("config");
        if let Err(err) = remove_file(link.as_path()) {
            if err.kind() != std::io::ErrorKind::NotFound {
                return Outcome::Failed(format!("remove {:?}: {err}", link.display()));
            }
        }

        match symlink_file(tracked.target(), link.as_path()) {
            Ok(()) => Outcome::Applied,
            Err(err) => Outcome::Failed(format!("link {:?}: {err}", link.display())),
        }
    }

    /// Apply declarative settings strictly in order.
    ///
    /// Ordering is the layering mechanism: a later entry for the same key
    /// overwrites an earlier one. Command failures are swallowed and
    /// logged, so one bad item never blocks the rest.
    #[instrument(skip(self, items), level = "debug")]
    pub fn apply_settings<'a>(&self, items: impl IntoIterator<Item = &'a Setting>) {
        let mut applied = 0usize;
        let mut failed = 0usize;
        for item in items {
            match self.apply_one(item) {
                Outcome::Applied => applied += 1,
                Outcome::Skipped => debug!("nothing to do for {}", item.name),
                Outcome::Failed(reason) => {
                    failed += 1;
                    warn!("cannot apply {}: {reason}", item.name);
                }
            }
        }
        info!("applied {applied} settings, {failed} failed");
    }

    fn apply_one(&self, item: &Setting) -> Outcome {
        // INVARIANT: Same derivation as init_tracking for the same raw path.
        let cur_dir = tracking_dir(self.root.as_path(), item.path.as_str());
        let result = match item.state {
            SettingState::Present => {
                debug!("set {} = {} in {}", item.name, item.value, item.path);
                self.runner.call(
                    cur_dir.as_path(),
                    &["config", "--local", item.name.as_str(), item.value.as_str()],
                )
            }
            SettingState::Absent => {
                debug!("unset {} in {}", item.name, item.path);
                self.runner.call(
                    cur_dir.as_path(),
                    &["config", "--local", "--unset", item.name.as_str()],
                )
            }
        };

        match result {
            Ok(_) => Outcome::Applied,
            // Unsetting a key that was never set is an expected no-op.
            Err(err) if item.state == SettingState::Absent => {
                debug!("unset of {} reported: {err}", item.name);
                Outcome::Skipped
            }
            Err(err) => Outcome::Failed(err.to_string()),
        }
    }

    /// Remove the transient tracking tree.
    ///
    /// Runs after settings application and block synchronization; the
    /// tracking repositories are only needed to carry the config commands.
    #[instrument(skip(self), level = "debug")]
    pub fn cleanup_tracking(&self) {
        let tree = self.root.join("~");
        if !tree.exists() {
            debug!("no tracking tree to remove");
            return;
        }

        match remove_dir_all(tree.as_path()) {
            Ok(()) => info!("removed tracking tree at {:?}", tree.display()),
            Err(err) => warn!("cannot remove tracking tree at {:?}: {err}", tree.display()),
        }
    }
}

/// Create an empty file along with any missing parent directories.
///
/// An existing file is left untouched.
fn touch_with_parents(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        mkdirp::mkdirp(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)?;

    Ok(())
}
