// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dotfile linking.
//!
//! Symlink dotfiles from a central dotfiles directory into their usual
//! locations. Whatever a link would replace is moved into a backup
//! directory first, so a re-run against an already linked machine only
//! refreshes the links, and nothing the user had in place is ever lost.

use crate::{
    config::{DotfileLink, Dotfiles},
    path::{expand_tilde, symlink_file},
    profile::Outcome,
};

use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{debug, info, instrument, warn};

/// Link every configured dotfile into place.
///
/// A link whose source file is missing is skipped. An existing target is
/// moved into `<dotfiles dir>/backup` before the link is created. Item
/// failures are logged and never stop the remaining links.
#[instrument(skip(dotfiles), level = "debug")]
pub fn link_all(dotfiles: &Dotfiles) {
    info!("linking {} dotfiles", dotfiles.links.len());
    let dir = expand_tilde(dotfiles.dir.as_str());
    for link in &dotfiles.links {
        match link_one(dir.as_path(), link) {
            Outcome::Applied => info!("linked {}", link.name),
            Outcome::Skipped => debug!("skipped {}", link.name),
            Outcome::Failed(reason) => warn!("cannot link {}: {reason}", link.name),
        }
    }
}

fn link_one(dir: &Path, link: &DotfileLink) -> Outcome {
    let source = dir.join(link.source.as_str());
    if !source.exists() {
        debug!("source {:?} does not exist", source.display());
        return Outcome::Skipped;
    }

    let target = expand_tilde(link.target.as_str());
    // symlink_metadata instead of exists: a dangling link still needs to
    // give way.
    if target.symlink_metadata().is_ok() {
        match back_up(dir, target.as_path()) {
            Ok(backup) => debug!("moved {:?} to {:?}", target.display(), backup.display()),
            Err(err) => {
                return Outcome::Failed(format!("back up {:?}: {err}", target.display()))
            }
        }
    }

    if let Some(parent) = target.parent() {
        if let Err(err) = mkdirp::mkdirp(parent) {
            return Outcome::Failed(format!("create {:?}: {err}", parent.display()));
        }
    }

    match symlink_file(source.as_path(), target.as_path()) {
        Ok(()) => Outcome::Applied,
        Err(err) => Outcome::Failed(format!("link {:?}: {err}", target.display())),
    }
}

/// Move an existing target into the backup directory.
///
/// The backup name carries a timestamp suffix so repeated runs never
/// clobber an earlier backup of the same file.
fn back_up(dir: &Path, target: &Path) -> std::io::Result<PathBuf> {
    let backup_dir = dir.join("backup");
    mkdirp::mkdirp(backup_dir.as_path())?;

    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("unnamed"));
    let backup = backup_dir.join(format!("{name}.{stamp}"));
    fs::rename(target, backup.as_path())?;

    Ok(backup)
}
