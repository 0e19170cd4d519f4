// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use gitrig::{
    bulk::{self, BulkOptions},
    config::Manifest,
    dotfile,
    path::{home_dir, PathStyle},
    profile::{gitcall::GitBinary, include, Workbench},
};

use anyhow::{Context, Result};
use clap::Parser;
use std::{
    env, fs,
    path::{Path, PathBuf},
    process::exit,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  gitrig [options]\n  gitrig [options] --enable-bulk-operations [--git-commit] [--git-pull] [--git-push]",
    version
)]
struct Cli {
    /// Path to the primary manifest.
    #[arg(short, long, value_name = "path", default_value = "gitrig.toml")]
    pub config: PathBuf,

    /// Path to the local override manifest; skipped when absent.
    #[arg(short, long, value_name = "path", default_value = "gitrig.local.toml")]
    pub local_config: PathBuf,

    /// Enable bulk clone/commit/pull/push over sibling repositories.
    #[arg(long)]
    pub enable_bulk_operations: bool,

    /// Commit changes in every sibling repository (bulk mode only).
    #[arg(long)]
    pub git_commit: bool,

    /// Pull with rebase in every sibling repository (bulk mode only).
    #[arg(long)]
    pub git_pull: bool,

    /// Commit and push changes in every sibling repository (bulk mode only).
    #[arg(long)]
    pub git_push: bool,
}

impl Cli {
    fn run(self) -> Result<()> {
        let manifest = load_manifests(self.config.as_path(), self.local_config.as_path())?;
        debug!("effective manifest:\n{manifest}");

        let root = env::current_dir().context("cannot determine invocation directory")?;
        let style = PathStyle::host();
        let primary = home_dir()?.join(".gitconfig");
        let bench = Workbench::new(root.as_path());

        bench.init_tracking(&manifest.tracked_paths());
        bench.apply_settings(manifest.settings());

        if let Err(error) = include::sync_include_block(
            primary.as_path(),
            &manifest.git_include_if_configs,
            style,
        ) {
            warn!("cannot synchronize includeIf block: {error}");
        }

        bench.cleanup_tracking();

        if let Some(dotfiles) = &manifest.dotfiles {
            dotfile::link_all(dotfiles);
        }

        if self.enable_bulk_operations {
            match &manifest.bulk {
                Some(bulk) => {
                    let opts = BulkOptions {
                        commit: self.git_commit,
                        pull: self.git_pull,
                        push: self.git_push,
                    };
                    bulk::run(root.as_path(), bulk, opts, &GitBinary);
                }
                None => warn!("bulk operations requested, but manifest has no [bulk] table"),
            }
        }

        info!("provisioning run complete");

        Ok(())
    }
}

fn load_manifests(config: &Path, local_config: &Path) -> Result<Manifest> {
    let data = fs::read_to_string(config)
        .with_context(|| format!("cannot read manifest at {:?}", config.display()))?;
    let mut manifest: Manifest = data
        .parse()
        .with_context(|| format!("cannot parse manifest at {:?}", config.display()))?;

    match fs::read_to_string(local_config) {
        Ok(data) => {
            let local: Manifest = data
                .parse()
                .with_context(|| format!("cannot parse manifest at {:?}", local_config.display()))?;
            manifest.merge(local);
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!("no local override manifest at {:?}", local_config.display());
        }
        Err(err) => {
            return Err(err).with_context(|| {
                format!("cannot read manifest at {:?}", local_config.display())
            })
        }
    }

    Ok(manifest)
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}
