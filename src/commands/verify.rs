// src/commands/verify.rs
//! Repository verification command

use super::{progress, publish_release};
use anyhow::{Context, Result, anyhow, bail};
use aptsync::hash::hash_bytes;
use aptsync::{
    Config, HashAlgorithm, Manifest, ObjectStore, PackageRecord, ProgressTracker, Release,
    ReleaseVerifier,
};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

/// Outcome of a verification pass
#[derive(Debug, Default, PartialEq, Eq)]
struct VerifyReport {
    checked: usize,
    /// Target paths of records whose package file is missing or corrupt
    broken: Vec<String>,
    fixed: bool,
}

/// Check every indexed package file, optionally dropping broken records,
/// and optionally check the Release signature
pub fn cmd_verify(
    store: &dyn ObjectStore,
    config: &Config,
    fix_manifests: bool,
    keyring: Option<&Path>,
) -> Result<()> {
    let progress = progress("verify");
    let report = verify(store, config, fix_manifests, progress.as_ref());
    let report = match report {
        Ok(report) => report,
        Err(e) => {
            progress.finish_with_error(&e.to_string());
            return Err(e);
        }
    };
    progress.finish_with_message(&format!(
        "Checked {} package(s), {} broken",
        report.checked,
        report.broken.len()
    ));

    if let Some(keyring) = keyring {
        verify_signature(store, config, keyring)?;
        println!("Release signature OK");
    }

    if !report.broken.is_empty() && !report.fixed {
        for path in &report.broken {
            println!("broken: {}", path);
        }
        bail!(
            "{} package file(s) missing or corrupt; rerun with --fix-manifests to drop them",
            report.broken.len()
        );
    }
    Ok(())
}

fn verify(
    store: &dyn ObjectStore,
    config: &Config,
    fix_manifests: bool,
    progress: &dyn ProgressTracker,
) -> Result<VerifyReport> {
    let repo = &config.repository;
    let mut release = Release::retrieve(store, &repo.codename, config.release_options())
        .with_context(|| format!("Failed to load release '{}'", repo.codename))?;
    let mut report = VerifyReport::default();
    let mut republish = false;

    for component in release.components.clone() {
        for arch in release.architectures.clone() {
            let mut manifest = Manifest::retrieve(
                store,
                &release.codename,
                &component,
                &arch,
                config.manifest_options(true),
            )?;

            let mut broken = BTreeSet::new();
            for record in manifest.packages() {
                report.checked += 1;
                if !package_intact(store, record)? {
                    broken.insert(record.url_filename().to_string());
                }
            }
            if broken.is_empty() {
                continue;
            }
            report.broken.extend(broken.iter().cloned());

            if fix_manifests {
                let removed = manifest.remove_where(|p| broken.contains(p.url_filename()));
                info!(
                    "Removing {} broken record(s) from {}/binary-{}",
                    removed.len(),
                    component,
                    arch
                );
                manifest.publish(store, progress)?;
                release.update_manifest(&manifest);
                republish = true;
            }
        }
    }

    if republish {
        publish_release(&mut release, store, config, progress)?;
        report.fixed = true;
    }
    Ok(report)
}

/// The package file exists and matches the index's MD5sum
fn package_intact(store: &dyn ObjectStore, record: &PackageRecord) -> Result<bool> {
    let Some(data) = store.read(record.url_filename())? else {
        warn!("{} is missing", record.url_filename());
        return Ok(false);
    };
    match record.checksum(HashAlgorithm::Md5) {
        Some(expected) if hash_bytes(HashAlgorithm::Md5, &data) != expected => {
            warn!("{} does not match its MD5sum", record.url_filename());
            Ok(false)
        }
        _ => Ok(true),
    }
}

fn verify_signature(store: &dyn ObjectStore, config: &Config, keyring: &Path) -> Result<()> {
    let dist = format!("dists/{}", config.repository.codename);
    let release = store
        .read(&format!("{}/Release", dist))?
        .ok_or_else(|| anyhow!("{}/Release not found", dist))?;
    let signature = store
        .read(&format!("{}/Release.gpg", dist))?
        .ok_or_else(|| anyhow!("{}/Release.gpg not found", dist))?;

    let verifier = ReleaseVerifier::from_file(keyring)?;
    verifier
        .verify_detached(&release, &signature)
        .with_context(|| format!("{}/Release.gpg does not verify", dist))?;
    Ok(())
}
