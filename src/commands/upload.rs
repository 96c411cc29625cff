// src/commands/upload.rs
//! Package upload command

use super::{progress, publish_release};
use anyhow::{Context, Result, bail};
use aptsync::{Config, Manifest, ObjectStore, PackageRecord, ProgressTracker, Release};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

/// Flags of `aptsync upload`
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub arch: Option<String>,
    pub preserve_versions: bool,
    pub skip_package_upload: bool,
}

/// Upload packages, republish the affected indexes and the Release
pub fn cmd_upload(
    store: &dyn ObjectStore,
    config: &Config,
    files: &[PathBuf],
    options: &UploadOptions,
) -> Result<()> {
    let progress = progress("upload");
    let result = upload(store, config, files, options, progress.as_ref());
    match &result {
        Ok(count) => progress.finish_with_message(&format!("Uploaded {} package(s)", count)),
        Err(e) => progress.finish_with_error(&e.to_string()),
    }
    result.map(|_| ())
}

fn upload(
    store: &dyn ObjectStore,
    config: &Config,
    files: &[PathBuf],
    options: &UploadOptions,
    progress: &dyn ProgressTracker,
) -> Result<usize> {
    let repo = &config.repository;
    let preserve_versions = options.preserve_versions || repo.preserve_versions;

    let mut release = Release::retrieve(store, &repo.codename, config.release_options())
        .with_context(|| format!("Failed to load release '{}'", repo.codename))?;
    let manifest_options = config.manifest_options(options.skip_package_upload);
    let mut manifests: BTreeMap<String, Manifest> = BTreeMap::new();

    for file in files {
        let record = PackageRecord::from_deb_file(file, &repo.codename)
            .with_context(|| format!("Failed to read package {}", file.display()))?;
        let arch = options
            .arch
            .clone()
            .unwrap_or_else(|| record.architecture().to_string());

        // Architecture-independent packages go into every index, uploaded once
        let targets = if arch == "all" {
            if release.architectures.is_empty() {
                bail!(
                    "Package {} is architecture 'all' but no architectures are known for '{}'; \
                     pass --arch or set repository.architectures",
                    record.name(),
                    repo.codename
                );
            }
            release.architectures.clone()
        } else {
            vec![arch]
        };

        for (i, target) in targets.iter().enumerate() {
            if !manifests.contains_key(target) {
                let manifest = Manifest::retrieve(
                    store,
                    &repo.codename,
                    &repo.component,
                    target,
                    manifest_options.clone(),
                )?;
                manifests.insert(target.clone(), manifest);
            }
            if let Some(manifest) = manifests.get_mut(target) {
                manifest.add(record.clone(), preserve_versions, i == 0)?;
            }
        }

        info!(
            "Added {} {} ({}) to {}/{}",
            record.name(),
            record.full_version(),
            targets.join(", "),
            repo.codename,
            repo.component
        );
    }

    for manifest in manifests.values_mut() {
        manifest.publish(store, progress)?;
        release.update_manifest(manifest);
    }
    publish_release(&mut release, store, config, progress)?;

    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aptsync::{MemoryStore, SilentProgress};
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;

    /// Minimal .deb holding debian-binary and control.tar.gz
    fn build_deb(dir: &TempDir, name: &str, version: &str, arch: &str) -> PathBuf {
        let control = format!(
            "Package: {}\nVersion: {}\nArchitecture: {}\n\
             Maintainer: Test <t@example.org>\nDescription: test\n",
            name, version, arch
        );
        let mut tar = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(control.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        tar.append_data(&mut header, "./control", control.as_bytes()).unwrap();
        let tar = tar.into_inner().unwrap();
        let mut gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        gz.write_all(&tar).unwrap();
        let control_tar = gz.finish().unwrap();

        let path = dir.path().join(format!("{}_{}_{}.deb", name, version, arch));
        let mut ar = ar::Builder::new(fs::File::create(&path).unwrap());
        ar.append(&ar::Header::new(b"debian-binary".to_vec(), 4), &b"2.0\n"[..]).unwrap();
        ar.append(
            &ar::Header::new(b"control.tar.gz".to_vec(), control_tar.len() as u64),
            &control_tar[..],
        )
        .unwrap();
        path
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.repository.architectures = vec!["amd64".into(), "arm64".into()];
        config.repository.acquire_by_hash = false;
        config
    }

    #[test]
    fn test_upload_all_arch_goes_everywhere_uploaded_once() {
        let dir = TempDir::new().unwrap();
        let deb = build_deb(&dir, "docs", "1.0", "all");
        let store = MemoryStore::new();

        upload(&store, &test_config(), &[deb], &UploadOptions::default(), &SilentProgress::new())
            .unwrap();

        let pool = "pool/stable/d/do/docs_1.0_all.deb";
        let writes = store.written_keys().iter().filter(|k| *k == pool).count();
        assert_eq!(writes, 1);
        for arch in ["amd64", "arm64"] {
            let key = format!("dists/stable/main/binary-{}/Packages", arch);
            let text = String::from_utf8(store.get(&key).unwrap().data).unwrap();
            assert!(text.contains("Package: docs\n"), "{} missing docs", arch);
        }
        assert_eq!(
            store.written_keys().last().map(String::as_str),
            Some("dists/stable/Release")
        );
    }

    #[test]
    fn test_upload_all_without_architectures_fails() {
        let dir = TempDir::new().unwrap();
        let deb = build_deb(&dir, "docs", "1.0", "all");
        let store = MemoryStore::new();
        let mut config = test_config();
        config.repository.architectures.clear();

        let err = upload(&store, &config, &[deb], &UploadOptions::default(), &SilentProgress::new())
            .unwrap_err();
        assert!(err.to_string().contains("architecture 'all'"));
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_upload_arch_override() {
        let dir = TempDir::new().unwrap();
        let deb = build_deb(&dir, "tool", "2.0-1", "amd64");
        let store = MemoryStore::new();
        let options = UploadOptions {
            arch: Some("i386".into()),
            ..Default::default()
        };

        upload(&store, &test_config(), &[deb], &options, &SilentProgress::new()).unwrap();

        assert!(store.contains("dists/stable/main/binary-i386/Packages"));
        let release = String::from_utf8(store.get("dists/stable/Release").unwrap().data).unwrap();
        assert!(release.contains("Architectures: amd64 arm64 i386\n"));
    }
}
