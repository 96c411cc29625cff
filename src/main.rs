// src/main.rs

use anyhow::{Context, Result};
use aptsync::Config;
use clap::Parser;
use tracing::debug;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Upload {
            files,
            repo,
            signing,
            arch,
            preserve_versions,
            fail_if_exists,
            skip_package_upload,
        } => {
            commands::apply_overrides(&mut config, &repo, Some(&signing));
            if fail_if_exists {
                config.repository.fail_if_exists = true;
            }
            let store = open_store(&config)?;
            let options = commands::UploadOptions {
                arch,
                preserve_versions,
                skip_package_upload,
            };
            commands::cmd_upload(store.as_ref(), &config, &files, &options)
        }
        Commands::Delete {
            name,
            arch,
            versions,
            repo,
            signing,
        } => {
            commands::apply_overrides(&mut config, &repo, Some(&signing));
            let store = open_store(&config)?;
            commands::cmd_delete(store.as_ref(), &config, &name, &arch, &versions)
        }
        Commands::List { arch, repo } => {
            commands::apply_overrides(&mut config, &repo, None);
            let store = open_store(&config)?;
            commands::cmd_list(store.as_ref(), &config, arch.as_deref())
        }
        Commands::Verify {
            fix_manifests,
            keyring,
            repo,
            signing,
        } => {
            commands::apply_overrides(&mut config, &repo, Some(&signing));
            let store = open_store(&config)?;
            commands::cmd_verify(store.as_ref(), &config, fix_manifests, keyring.as_deref())
        }
    }
}

fn open_store(config: &Config) -> Result<Box<dyn aptsync::ObjectStore>> {
    let store = config.open_store().context("Failed to open object store")?;
    debug!(
        "Using {} store for {}/{}",
        store.name(),
        config.repository.codename,
        config.repository.component
    );
    Ok(store)
}
