// src/commands/delete.rs
//! Package deletion command

use super::{progress, publish_release};
use anyhow::{Context, Result, bail};
use aptsync::{Config, Manifest, ObjectStore, ProgressTracker, Release};
use tracing::info;

/// Remove a package from one architecture index and republish
///
/// `versions` names the versions to keep; an empty list removes every
/// version. Package files stay in the pool.
pub fn cmd_delete(
    store: &dyn ObjectStore,
    config: &Config,
    name: &str,
    arch: &str,
    versions: &[String],
) -> Result<()> {
    let progress = progress("delete");
    let result = delete(store, config, name, arch, versions, progress.as_ref());
    match &result {
        Ok(removed) => progress.finish_with_message(&format!("Removed {} record(s)", removed)),
        Err(e) => progress.finish_with_error(&e.to_string()),
    }
    result.map(|_| ())
}

fn delete(
    store: &dyn ObjectStore,
    config: &Config,
    name: &str,
    arch: &str,
    versions: &[String],
    progress: &dyn ProgressTracker,
) -> Result<usize> {
    let repo = &config.repository;
    let mut release = Release::retrieve(store, &repo.codename, config.release_options())
        .with_context(|| format!("Failed to load release '{}'", repo.codename))?;
    let mut manifest = Manifest::retrieve(
        store,
        &repo.codename,
        &repo.component,
        arch,
        config.manifest_options(true),
    )?;

    let keep = (!versions.is_empty()).then_some(versions);
    let removed = manifest.delete_package(name, keep);
    if removed.is_empty() {
        bail!(
            "No packages named '{}' to remove from {}/{} ({})",
            name,
            repo.codename,
            repo.component,
            arch
        );
    }
    for record in &removed {
        info!("Deleting {} version {}", record.name(), record.full_version());
    }

    manifest.publish(store, progress)?;
    release.update_manifest(&manifest);
    publish_release(&mut release, store, config, progress)?;

    Ok(removed.len())
}
