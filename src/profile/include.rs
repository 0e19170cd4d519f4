// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Managed includeIf block handling.
//!
//! Utilities to maintain the block of conditional include directives that
//! gitrig owns inside the user's primary git configuration file.
//!
//! # Why a Managed Block?
//!
//! The primary git configuration file is shared space: the user edits it by
//! hand, and gitrig needs a region it can regenerate wholesale on every run
//! without disturbing anything else. A pair of textual markers delimits that
//! region. On each run the old block is excised in full and a fresh one is
//! rendered from the configured rules, so re-running with identical rules
//! reproduces the file byte for byte, and stale rules never linger.
//!
//! # Block Layout
//!
//! ```text
//! # BEGIN GITRIG MANAGED BLOCK
//! [includeIf "gitdir:C:/data/work/"]
//!     path = C:/data/work.gitconfig
//! # END GITRIG MANAGED BLOCK
//! ```
//!
//! Each rule renders as one `includeIf` section with a single `path` key.
//! Git evaluates the gitdir pattern itself; gitrig only normalizes the
//! pattern text for the host's path convention.
//!
//! # See Also
//!
//! - [git-config conditional includes](https://git-scm.com/docs/git-config#_conditional_includes)

use crate::{config::IncludeRule, path::PathStyle};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// First line of the managed region.
pub const MARKER_START: &str = "# BEGIN GITRIG MANAGED BLOCK";

/// Last line of the managed region.
pub const MARKER_END: &str = "# END GITRIG MANAGED BLOCK";

/// Synchronize the managed block in a primary configuration file.
///
/// No-op when `rules` is empty. A missing file is treated as empty content.
/// Any existing managed block is excised, a fresh block is rendered from
/// the rules and appended, and the result is written back in full.
///
/// # Errors
///
/// - Return [`Error::UnterminatedBlock`] if the file carries a start marker
///   without an end marker after it.
/// - Return [`Error::ReadConfigFile`] if the file exists but cannot be read.
/// - Return [`Error::WriteConfigFile`] if the result cannot be written.
#[instrument(skip(config_path, rules, style), level = "debug")]
pub fn sync_include_block(
    config_path: impl AsRef<Path>,
    rules: &[IncludeRule],
    style: PathStyle,
) -> Result<()> {
    if rules.is_empty() {
        info!("no includeIf rules to manage");
        return Ok(());
    }

    let config_path = config_path.as_ref();
    let content = match read_to_string(config_path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!("no file at {:?}, starting empty", config_path.display());
            String::new()
        }
        Err(err) => {
            return Err(Error::ReadConfigFile {
                source: err,
                config_path: config_path.to_path_buf(),
            })
        }
    };

    let mut edit = BlockEdit::from(content);
    edit.excise_block()?;
    edit.append_block(rules, style);

    write(config_path, edit.to_string().as_bytes()).map_err(|err| Error::WriteConfigFile {
        source: err,
        config_path: config_path.to_path_buf(),
    })?;
    info!(
        "synchronized {} includeIf rules in {:?}",
        rules.len(),
        config_path.display()
    );

    Ok(())
}

/// Editor over the text of a primary configuration file.
///
/// # Invariant
///
/// - At most one managed block exists in the text.
/// - Content outside the markers is never modified.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BlockEdit {
    content: String,
}

impl BlockEdit {
    /// Excise the managed block, markers included.
    ///
    /// Removes from the start marker through the end of the line the end
    /// marker sits on. Everything around the block is preserved byte for
    /// byte. No-op when no block exists.
    ///
    /// # Errors
    ///
    /// - Return [`Error::UnterminatedBlock`] if the start marker is present
    ///   without an end marker after it.
    pub fn excise_block(&mut self) -> Result<()> {
        let Some(start_idx) = self.content.find(MARKER_START) else {
            return Ok(());
        };

        // INVARIANT: End marker must follow the start marker.
        let end_idx = match self.content[start_idx..].find(MARKER_END) {
            Some(offset) => start_idx + offset,
            None => return Err(Error::UnterminatedBlock),
        };

        let cut_end = match self.content[end_idx..].find('\n') {
            Some(offset) => end_idx + offset + 1,
            None => self.content.len(),
        };
        self.content.replace_range(start_idx..cut_end, "");

        Ok(())
    }

    /// Append a freshly rendered block for the given rules.
    ///
    /// A newline is inserted first when the existing content does not
    /// already end with one, so the start marker always begins a line.
    pub fn append_block(&mut self, rules: &[IncludeRule], style: PathStyle) {
        if !self.content.is_empty() && !self.content.ends_with('\n') {
            self.content.push('\n');
        }
        self.content.push_str(render_block(rules, style).as_str());
    }
}

impl Display for BlockEdit {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.content.as_str())
    }
}

impl From<String> for BlockEdit {
    fn from(content: String) -> Self {
        Self { content }
    }
}

impl From<&str> for BlockEdit {
    fn from(content: &str) -> Self {
        Self {
            content: content.to_owned(),
        }
    }
}

/// Render a managed block for the given rules.
fn render_block(rules: &[IncludeRule], style: PathStyle) -> String {
    let mut block = String::from(MARKER_START);
    block.push('\n');
    for rule in rules {
        let gitdir = style.normalize_gitdir(rule.gitdir.as_str());
        let path = style.normalize_include_path(rule.path.as_str());
        block.push_str(format!("[includeIf \"gitdir:{gitdir}\"]\n").as_str());
        block.push_str(format!("    path = {path}\n").as_str());
    }
    block.push_str(MARKER_END);
    block.push('\n');

    block
}

/// Managed block error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Start marker found without a terminating end marker after it.
    #[error("managed block start marker has no end marker after it")]
    UnterminatedBlock,

    /// Primary configuration file cannot be read from.
    #[error("failed to read primary config file at {:?}", config_path.display())]
    ReadConfigFile {
        #[source]
        source: std::io::Error,
        config_path: PathBuf,
    },

    /// Primary configuration file cannot be written to.
    #[error("failed to write primary config file at {:?}", config_path.display())]
    WriteConfigFile {
        #[source]
        source: std::io::Error,
        config_path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[test]
    fn append_block_after_existing_content() {
        let mut edit = BlockEdit::from("[user]\n  name = a\n");
        edit.append_block(
            &[IncludeRule {
                gitdir: "/c/data/work".into(),
                path: "/c/data/work.gitconfig".into(),
            }],
            PathStyle::Windows,
        );

        let expect = indoc! {r#"
            [user]
              name = a
            # BEGIN GITRIG MANAGED BLOCK
            [includeIf "gitdir:C:/data/work/"]
                path = C:/data/work.gitconfig
            # END GITRIG MANAGED BLOCK
        "#};
        assert_eq!(edit.to_string(), expect);
    }

    #[test]
    fn append_block_separates_unterminated_line() {
        let mut edit = BlockEdit::from("[user]\n  name = a");
        edit.append_block(
            &[IncludeRule {
                gitdir: "/home/dev/work".into(),
                path: "/home/dev/work.gitconfig".into(),
            }],
            PathStyle::Posix,
        );

        let expect = indoc! {r#"
            [user]
              name = a
            # BEGIN GITRIG MANAGED BLOCK
            [includeIf "gitdir:/home/dev/work/"]
                path = /home/dev/work.gitconfig
            # END GITRIG MANAGED BLOCK
        "#};
        assert_eq!(edit.to_string(), expect);
    }

    #[test]
    fn excise_block_preserves_surrounding_content() -> Result<()> {
        let mut edit = BlockEdit::from(indoc! {r#"
            [user]
              name = a
            # BEGIN GITRIG MANAGED BLOCK
            [includeIf "gitdir:/home/dev/work/"]
                path = /home/dev/work.gitconfig
            # END GITRIG MANAGED BLOCK
            [core]
              autocrlf = input
        "#});

        edit.excise_block()?;
        let expect = indoc! {r#"
            [user]
              name = a
            [core]
              autocrlf = input
        "#};
        assert_eq!(edit.to_string(), expect);

        Ok(())
    }

    #[test]
    fn excise_block_without_block_is_noop() -> Result<()> {
        let mut edit = BlockEdit::from("[user]\n  name = a\n");
        edit.excise_block()?;
        assert_eq!(edit.to_string(), "[user]\n  name = a\n");

        Ok(())
    }

    #[test]
    fn excise_block_missing_end_marker_is_data_error() {
        let mut edit = BlockEdit::from(indoc! {r#"
            [user]
              name = a
            # BEGIN GITRIG MANAGED BLOCK
            [includeIf "gitdir:/home/dev/work/"]
                path = /home/dev/work.gitconfig
        "#});

        let result = edit.excise_block();
        assert!(matches!(result, Err(Error::UnterminatedBlock)));
    }

    #[sealed_test]
    fn sync_include_block_is_idempotent() -> anyhow::Result<()> {
        let config_path = Path::new("gitconfig");
        std::fs::write(config_path, "[user]\n  name = a\n")?;
        let rules = vec![IncludeRule {
            gitdir: "/home/dev/work".into(),
            path: "/home/dev/work.gitconfig".into(),
        }];

        sync_include_block(config_path, &rules, PathStyle::Posix)?;
        let first = std::fs::read_to_string(config_path)?;
        let expect = indoc! {r#"
            [user]
              name = a
            # BEGIN GITRIG MANAGED BLOCK
            [includeIf "gitdir:/home/dev/work/"]
                path = /home/dev/work.gitconfig
            # END GITRIG MANAGED BLOCK
        "#};
        assert_eq!(first, expect);

        // Second run replaces the block instead of duplicating it.
        sync_include_block(config_path, &rules, PathStyle::Posix)?;
        let second = std::fs::read_to_string(config_path)?;
        assert_eq!(second, first);

        Ok(())
    }

    #[sealed_test]
    fn sync_include_block_starts_from_missing_file() -> anyhow::Result<()> {
        let config_path = Path::new("gitconfig");
        let rules = vec![IncludeRule {
            gitdir: "/home/dev/work".into(),
            path: "/home/dev/work.gitconfig".into(),
        }];

        sync_include_block(config_path, &rules, PathStyle::Posix)?;
        let result = std::fs::read_to_string(config_path)?;
        let expect = indoc! {r#"
            # BEGIN GITRIG MANAGED BLOCK
            [includeIf "gitdir:/home/dev/work/"]
                path = /home/dev/work.gitconfig
            # END GITRIG MANAGED BLOCK
        "#};
        assert_eq!(result, expect);

        Ok(())
    }

    #[sealed_test]
    fn sync_include_block_empty_rules_is_noop() -> anyhow::Result<()> {
        let config_path = Path::new("gitconfig");
        sync_include_block(config_path, &[], PathStyle::Posix)?;
        assert!(!config_path.exists());

        Ok(())
    }
}
