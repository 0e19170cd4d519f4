// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for the manifest that gitrig reads to simplify the
//! process of serialization and deserialization. File I/O is left to the
//! caller to figure out.
//!
//! # General Layout
//!
//! A manifest is composed of three basic parts: the git profile section,
//! the dotfiles section, and the bulk section. The git profile section
//! lists the config paths to place under tracking, the settings to apply
//! to them, and the includeIf rules destined for the managed block of the
//! primary git configuration. The dotfiles section describes symlinks to
//! place, and the bulk section describes the sibling repositories touched
//! by bulk maintenance.
//!
//! # Local Overrides
//!
//! A second manifest of identical shape can be merged on top of the first
//! through [`Manifest::merge`]. The git lists concatenate; dotfile links
//! match by name and replace. Machine-local identity settings typically
//! live in the override manifest, which stays out of version control.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Manifest layout.
///
/// The full declarative description of one provisioning run. Every section
/// is optional; an empty manifest describes a run that does nothing.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Manifest {
    /// Config file paths to place under tracking.
    #[serde(default)]
    pub git_global_config_paths: Vec<String>,

    /// User-specific config file paths to place under tracking.
    #[serde(default)]
    pub git_user_global_config_paths: Vec<String>,

    /// Settings to apply to tracked config files, in order.
    #[serde(default)]
    pub git_global_config: Vec<Setting>,

    /// User-specific settings to apply to tracked config files, in order.
    #[serde(default)]
    pub git_user_global_config: Vec<Setting>,

    /// Conditional include rules for the managed block.
    #[serde(default)]
    pub git_include_if_configs: Vec<IncludeRule>,

    /// Dotfile linking section.
    pub dotfiles: Option<Dotfiles>,

    /// Bulk repository maintenance section.
    pub bulk: Option<Bulk>,
}

impl Manifest {
    /// Merge a local override manifest into this one.
    ///
    /// The git path and setting lists concatenate with the primary entries
    /// first, preserving the layering order that makes a later setting for
    /// the same key win. Dotfile links merge by name: a local link replaces
    /// the primary link with the same name, otherwise it is appended. Bulk
    /// identity fields replace when the override sets them.
    pub fn merge(&mut self, local: Manifest) {
        self.git_global_config_paths
            .extend(local.git_global_config_paths);
        self.git_user_global_config_paths
            .extend(local.git_user_global_config_paths);
        self.git_global_config.extend(local.git_global_config);
        self.git_user_global_config.extend(local.git_user_global_config);
        self.git_include_if_configs
            .extend(local.git_include_if_configs);

        if let Some(local_dotfiles) = local.dotfiles {
            match &mut self.dotfiles {
                Some(dotfiles) => dotfiles.merge(local_dotfiles),
                None => self.dotfiles = Some(local_dotfiles),
            }
        }

        if let Some(local_bulk) = local.bulk {
            match &mut self.bulk {
                Some(bulk) => bulk.merge(local_bulk),
                None => self.bulk = Some(local_bulk),
            }
        }
    }

    /// Unique raw config paths across every path source.
    ///
    /// Duplicates collapse through set semantics; iteration order is
    /// deterministic.
    pub fn tracked_paths(&self) -> BTreeSet<String> {
        self.git_global_config_paths
            .iter()
            .chain(self.git_user_global_config_paths.iter())
            .cloned()
            .collect()
    }

    /// Every setting in application order.
    ///
    /// Global settings first, then user-specific settings, each list in the
    /// order produced by [`Manifest::merge`].
    pub fn settings(&self) -> impl Iterator<Item = &Setting> {
        self.git_global_config
            .iter()
            .chain(self.git_user_global_config.iter())
    }
}

impl FromStr for Manifest {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        Ok(toml::de::from_str(data).map_err(ConfigError::Deserialize)?)
    }
}

impl Display for Manifest {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// A desired key/value pair for one tracked config file.
///
/// Entries for the same key are deliberately not deduplicated: they apply
/// in order, so the last writer wins. That is the layering mechanism for
/// default + override configuration sources.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Setting {
    /// Dotted config key, e.g. `user.name`.
    pub name: String,

    /// Value to set. Ignored when state is `absent`.
    #[serde(default)]
    pub value: String,

    /// Whether the key should be set or removed.
    #[serde(default)]
    pub state: SettingState,

    /// Raw path of the tracked config file the setting belongs to.
    #[serde(default = "default_setting_path")]
    pub path: String,
}

fn default_setting_path() -> String {
    "~/.gitconfig".into()
}

/// Desired state of a [`Setting`].
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingState {
    /// Set the key to the given value.
    #[default]
    Present,

    /// Remove the key.
    Absent,
}

/// A conditional include rule destined for the managed block.
///
/// # Invariant
///
/// - The rendered gitdir always carries a trailing separator so that
///   prefix-glob matching works; normalization enforces this.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct IncludeRule {
    /// Working directory prefix pattern to match.
    pub gitdir: String,

    /// Config file to include when the pattern matches.
    pub path: String,
}

/// Dotfile linking section.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Dotfiles {
    /// Directory that houses the dotfile sources.
    #[serde(default)]
    pub dir: String,

    /// Links to place.
    #[serde(default, rename = "link")]
    pub links: Vec<DotfileLink>,
}

impl Dotfiles {
    /// Merge a local override section: links match by name and replace.
    fn merge(&mut self, local: Dotfiles) {
        if !local.dir.is_empty() {
            self.dir = local.dir;
        }

        for link in local.links {
            match self.links.iter_mut().find(|have| have.name == link.name) {
                Some(have) => *have = link,
                None => self.links.push(link),
            }
        }
    }
}

/// One dotfile symlink to place.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct DotfileLink {
    /// Name identifying the link for override merging.
    pub name: String,

    /// Source file, relative to the dotfiles directory.
    pub source: String,

    /// Target location of the symlink. May use tilde notation.
    pub target: String,
}

/// Bulk repository maintenance section.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Bulk {
    /// Identity email to set in every sibling repository.
    pub email: Option<String>,

    /// Identity name to set in every sibling repository.
    pub name: Option<String>,

    /// Sibling repositories to clone when missing.
    #[serde(default, rename = "repo")]
    pub repos: Vec<BulkRepo>,
}

impl Bulk {
    /// Merge a local override section: identity fields replace when set,
    /// repositories match by name and replace.
    fn merge(&mut self, local: Bulk) {
        if local.email.is_some() {
            self.email = local.email;
        }
        if local.name.is_some() {
            self.name = local.name;
        }

        for repo in local.repos {
            match self.repos.iter_mut().find(|have| have.name == repo.name) {
                Some(have) => *have = repo,
                None => self.repos.push(repo),
            }
        }
    }
}

/// A sibling repository touched by bulk maintenance.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct BulkRepo {
    /// Directory name of the repository under the parent directory.
    pub name: String,

    /// Remote URL to clone from when the repository is missing.
    pub url: String,
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn deserialize_manifest() -> anyhow::Result<()> {
        let result: Manifest = indoc! {r#"
            git_global_config_paths = ["~/.gitconfig"]
            git_user_global_config_paths = ["~/.gitconfig_user"]

            [[git_global_config]]
            name = "core.autocrlf"
            value = "input"

            [[git_user_global_config]]
            name = "user.name"
            value = "Jane Doe"
            path = "~/.gitconfig_user"

            [[git_include_if_configs]]
            gitdir = "~/work/"
            path = "~/work.gitconfig"

            [dotfiles]
            dir = "~/dotfiles"

            [[dotfiles.link]]
            name = "vimrc"
            source = "vim/vimrc"
            target = "~/.vimrc"

            [bulk]
            email = "jane@doe.com"
            name = "Jane Doe"

            [[bulk.repo]]
            name = "wiki"
            url = "https://blah.org/wiki.git"
        "#}
        .parse()?;

        let expect = Manifest {
            git_global_config_paths: vec!["~/.gitconfig".into()],
            git_user_global_config_paths: vec!["~/.gitconfig_user".into()],
            git_global_config: vec![Setting {
                name: "core.autocrlf".into(),
                value: "input".into(),
                state: SettingState::Present,
                path: "~/.gitconfig".into(),
            }],
            git_user_global_config: vec![Setting {
                name: "user.name".into(),
                value: "Jane Doe".into(),
                state: SettingState::Present,
                path: "~/.gitconfig_user".into(),
            }],
            git_include_if_configs: vec![IncludeRule {
                gitdir: "~/work/".into(),
                path: "~/work.gitconfig".into(),
            }],
            dotfiles: Some(Dotfiles {
                dir: "~/dotfiles".into(),
                links: vec![DotfileLink {
                    name: "vimrc".into(),
                    source: "vim/vimrc".into(),
                    target: "~/.vimrc".into(),
                }],
            }),
            bulk: Some(Bulk {
                email: Some("jane@doe.com".into()),
                name: Some("Jane Doe".into()),
                repos: vec![BulkRepo {
                    name: "wiki".into(),
                    url: "https://blah.org/wiki.git".into(),
                }],
            }),
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn deserialize_setting_defaults() -> anyhow::Result<()> {
        let result: Manifest = indoc! {r#"
            [[git_global_config]]
            name = "pull.rebase"
            value = "true"

            [[git_global_config]]
            name = "push.gpgSign"
            state = "absent"
        "#}
        .parse()?;

        assert_eq!(result.git_global_config[0].state, SettingState::Present);
        assert_eq!(result.git_global_config[0].path, "~/.gitconfig");
        assert_eq!(result.git_global_config[1].state, SettingState::Absent);
        assert_eq!(result.git_global_config[1].value, "");

        Ok(())
    }

    #[test]
    fn merge_concatenates_git_lists() -> anyhow::Result<()> {
        let mut manifest: Manifest = indoc! {r#"
            git_global_config_paths = ["~/.gitconfig"]

            [[git_global_config]]
            name = "user.name"
            value = "Default"
        "#}
        .parse()?;

        let local: Manifest = indoc! {r#"
            git_global_config_paths = ["~/.gitconfig", "~/.gitconfig_local"]

            [[git_global_config]]
            name = "user.name"
            value = "Override"

            [[git_include_if_configs]]
            gitdir = "~/work/"
            path = "~/work.gitconfig"
        "#}
        .parse()?;

        manifest.merge(local);

        // Lists concatenate; no key-based override for git config merging.
        assert_eq!(
            manifest.git_global_config_paths,
            vec![
                String::from("~/.gitconfig"),
                String::from("~/.gitconfig"),
                String::from("~/.gitconfig_local"),
            ]
        );
        let values: Vec<_> = manifest
            .settings()
            .map(|setting| setting.value.as_str())
            .collect();
        assert_eq!(values, vec!["Default", "Override"]);
        assert_eq!(manifest.git_include_if_configs.len(), 1);

        Ok(())
    }

    #[test]
    fn merge_replaces_dotfile_links_by_name() -> anyhow::Result<()> {
        let mut manifest: Manifest = indoc! {r#"
            [dotfiles]
            dir = "~/dotfiles"

            [[dotfiles.link]]
            name = "vimrc"
            source = "vim/vimrc"
            target = "~/.vimrc"

            [[dotfiles.link]]
            name = "bashrc"
            source = "bash/bashrc"
            target = "~/.bashrc"
        "#}
        .parse()?;

        let local: Manifest = indoc! {r#"
            [dotfiles]

            [[dotfiles.link]]
            name = "vimrc"
            source = "vim/vimrc.local"
            target = "~/.vimrc"

            [[dotfiles.link]]
            name = "tmux"
            source = "tmux/tmux.conf"
            target = "~/.tmux.conf"
        "#}
        .parse()?;

        manifest.merge(local);

        let dotfiles = manifest.dotfiles.unwrap();
        assert_eq!(dotfiles.dir, "~/dotfiles");
        assert_eq!(dotfiles.links.len(), 3);
        assert_eq!(dotfiles.links[0].source, "vim/vimrc.local");
        assert_eq!(dotfiles.links[1].name, "bashrc");
        assert_eq!(dotfiles.links[2].name, "tmux");

        Ok(())
    }

    #[test]
    fn tracked_paths_collapse_duplicates() -> anyhow::Result<()> {
        let mut manifest: Manifest = indoc! {r#"
            git_global_config_paths = ["~/.gitconfig"]
            git_user_global_config_paths = ["~/.gitconfig_user"]
        "#}
        .parse()?;

        let local: Manifest = indoc! {r#"
            git_global_config_paths = ["~/.gitconfig"]
        "#}
        .parse()?;

        manifest.merge(local);

        let paths: Vec<_> = manifest.tracked_paths().into_iter().collect();
        assert_eq!(
            paths,
            vec![
                String::from("~/.gitconfig"),
                String::from("~/.gitconfig_user"),
            ]
        );

        Ok(())
    }

    #[test]
    fn empty_manifest_parses() -> anyhow::Result<()> {
        let result: Manifest = "".parse()?;
        assert_eq!(result, Manifest::default());

        Ok(())
    }
}
