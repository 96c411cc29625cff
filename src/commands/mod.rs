// src/commands/mod.rs
//! Command handlers for the aptsync CLI

mod delete;
mod list;
mod upload;
mod verify;

pub use delete::cmd_delete;
pub use list::cmd_list;
pub use upload::{UploadOptions, cmd_upload};
pub use verify::cmd_verify;

use crate::cli::{RepoArgs, SignArgs};
use anyhow::{Context, Result};
use aptsync::{
    CliProgress, Config, GpgSigner, LogProgress, ObjectStore, ProgressTracker, Release, Signer,
};
use std::io::IsTerminal;

/// Apply command line overrides on top of the configuration file
pub fn apply_overrides(config: &mut Config, repo: &RepoArgs, signing: Option<&SignArgs>) {
    if let Some(codename) = &repo.codename {
        config.repository.codename = codename.clone();
    }
    if let Some(component) = &repo.component {
        config.repository.component = component.clone();
    }
    if let Some(signing) = signing {
        if let Some(key) = &signing.sign {
            config.signing.key = Some(key.clone());
        }
        if signing.inrelease {
            config.signing.inrelease = true;
        }
    }
}

/// Spinner on a terminal, log lines otherwise
pub(crate) fn progress(label: &str) -> Box<dyn ProgressTracker> {
    if std::io::stderr().is_terminal() {
        Box::new(CliProgress::new(label))
    } else {
        Box::new(LogProgress::new(label))
    }
}

/// Sign (when configured) and write the Release as the final step
pub(crate) fn publish_release(
    release: &mut Release,
    store: &dyn ObjectStore,
    config: &Config,
    progress: &dyn ProgressTracker,
) -> Result<()> {
    let signer = config.signing.signing_config().map(GpgSigner::new);
    let target = if config.signing.inrelease {
        release.inrelease_key()
    } else {
        release.release_key()
    };

    release
        .publish(
            store,
            signer.as_ref().map(|s| s as &dyn Signer),
            config.signing.inrelease,
            progress,
        )
        .with_context(|| format!("Failed to publish {}", target))
}
