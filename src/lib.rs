// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Declarative git profile and dotfile provisioning.
//!
//! gitrig reads a TOML manifest describing git config files to track,
//! settings to apply to them, conditional include rules for the primary
//! git configuration, and dotfiles to link into place. A run is short and
//! strictly sequential: initialize tracking repositories, apply settings,
//! synchronize the managed includeIf block, clean up, link dotfiles, and
//! optionally sweep sibling repositories with bulk maintenance.
//!
//! Item failures are logged and never abort a run; only a missing or
//! malformed manifest is fatal.

pub mod bulk;
pub mod config;
pub mod dotfile;
pub mod path;
pub mod profile;
