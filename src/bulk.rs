// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Bulk repository maintenance.
//!
//! Clone, configure, and synchronize the sibling repositories listed in
//! the manifest. The sweep walks the parent of the invocation directory:
//! configured repositories that are missing get cloned, then every direct
//! subdirectory that holds a `.git` gets its identity set and, depending
//! on the requested sub-operations, committed, pulled, or pushed.
//!
//! The whole feature is disabled unless explicitly requested on the
//! command line, and every step in it is best-effort: a repository that
//! fails to clone or push is logged and the sweep moves on.

use crate::{config::Bulk, profile::gitcall::Gitcall};

use std::{
    fs,
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{debug, info, instrument, warn};

/// Sub-operations to run over every sibling repository.
#[derive(Clone, Copy, Debug, Default)]
pub struct BulkOptions {
    /// Stage and commit local changes.
    pub commit: bool,

    /// Pull with rebase.
    pub pull: bool,

    /// Stage, commit, and push local changes.
    pub push: bool,
}

/// Run bulk maintenance over the parent of the invocation directory.
#[instrument(skip(root, bulk, opts, runner), level = "debug")]
pub fn run(root: impl AsRef<Path>, bulk: &Bulk, opts: BulkOptions, runner: &impl Gitcall) {
    let Some(parent) = root.as_ref().parent() else {
        warn!("invocation directory has no parent, skipping bulk maintenance");
        return;
    };

    info!("running bulk maintenance under {:?}", parent.display());
    clone_missing(parent, bulk, runner);
    sweep_repositories(parent, bulk, opts, runner);
}

/// Clone every configured repository that is not present yet.
///
/// A directory that exists without being a repository is moved aside
/// before the clone, and its contents are restored into the fresh clone
/// afterwards, so stray files collected before provisioning survive.
fn clone_missing(parent: &Path, bulk: &Bulk, runner: &impl Gitcall) {
    for repo in &bulk.repos {
        let repo_dir = parent.join(repo.name.as_str());
        if repo_dir.join(".git").exists() {
            debug!("{} already cloned", repo.name);
            continue;
        }

        let mut stash_dir = None;
        if repo_dir.exists() {
            let stash = parent.join(format!("{}.{}", repo.name, timestamp()));
            match fs::rename(repo_dir.as_path(), stash.as_path()) {
                Ok(()) => stash_dir = Some(stash),
                Err(err) => {
                    warn!("cannot move aside {:?}: {err}", repo_dir.display());
                    continue;
                }
            }
        }

        info!("cloning {} from {}", repo.name, repo.url);
        if let Err(err) = runner.call(parent, &["clone", repo.url.as_str(), repo.name.as_str()]) {
            warn!("cannot clone {}: {err}", repo.name);
        }

        if let Some(stash) = stash_dir {
            restore_stash(stash.as_path(), repo_dir.as_path());
        }
    }
}

/// Move stashed files back into the freshly cloned repository.
///
/// The stash directory is only removed once every entry made it back;
/// otherwise it stays behind for the user to pick through.
fn restore_stash(stash: &Path, repo_dir: &Path) {
    if let Err(err) = mkdirp::mkdirp(repo_dir) {
        warn!("cannot recreate {:?}: {err}", repo_dir.display());
        return;
    }

    let entries = match fs::read_dir(stash) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("cannot read stash {:?}: {err}", stash.display());
            return;
        }
    };

    let mut leftover = false;
    for entry in entries.flatten() {
        let destination = repo_dir.join(entry.file_name());
        if let Err(err) = fs::rename(entry.path(), destination.as_path()) {
            warn!("cannot restore {:?}: {err}", entry.path().display());
            leftover = true;
        }
    }

    if leftover {
        warn!("stash {:?} kept, some entries did not restore", stash.display());
        return;
    }

    if let Err(err) = fs::remove_dir_all(stash) {
        warn!("cannot remove stash {:?}: {err}", stash.display());
    }
}

/// Configure and synchronize every repository under the parent directory.
fn sweep_repositories(parent: &Path, bulk: &Bulk, opts: BulkOptions, runner: &impl Gitcall) {
    let entries = match fs::read_dir(parent) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("cannot read {:?}: {err}", parent.display());
            return;
        }
    };

    for entry in entries.flatten() {
        let work_dir = entry.path();
        if !work_dir.is_dir() || !work_dir.join(".git").exists() {
            continue;
        }

        debug!("maintaining {:?}", work_dir.display());
        set_identity(work_dir.as_path(), bulk, runner);
        synchronize(work_dir.as_path(), opts, runner);
    }
}

fn set_identity(work_dir: &Path, bulk: &Bulk, runner: &impl Gitcall) {
    if let Some(email) = &bulk.email {
        log_failure(runner.call(work_dir, &["config", "--local", "user.email", email.as_str()]));
    }
    if let Some(name) = &bulk.name {
        log_failure(runner.call(work_dir, &["config", "--local", "user.name", name.as_str()]));
    }
}

fn synchronize(work_dir: &Path, opts: BulkOptions, runner: &impl Gitcall) {
    let message = format!("auto_{}", timestamp());

    if opts.commit {
        log_failure(runner.call(work_dir, &["add", "."]));
        log_failure(runner.call(work_dir, &["commit", "-m", message.as_str()]));
    }

    if opts.pull {
        log_failure(runner.call(work_dir, &["pull", "--rebase"]));
    }

    if opts.push {
        log_failure(runner.call(work_dir, &["add", "."]));
        log_failure(runner.call(work_dir, &["commit", "-m", message.as_str()]));
        log_failure(runner.call(work_dir, &["push"]));
    }
}

/// Log a failed command without interrupting the sweep.
///
/// Committing with nothing staged fails by design; every other failure is
/// equally non-fatal here.
fn log_failure<T>(result: crate::profile::gitcall::Result<T>) {
    if let Err(err) = result {
        debug!("bulk command reported: {err}");
    }
}

fn timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
