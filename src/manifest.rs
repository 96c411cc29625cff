// src/manifest.rs

//! Package index for one `(codename, component, architecture)` triple
//!
//! A [`Manifest`] is the in-memory form of
//! `dists/<codename>/<component>/binary-<arch>/Packages`. It is either
//! parsed back from the store or created empty, mutated with
//! [`Manifest::add`] and [`Manifest::delete_package`], and then published:
//! new package files first, then `Packages` and `Packages.gz` together
//! with their by-hash copies. After publishing, [`Manifest::files`] holds
//! the checksums that the Release folds in.
//!
//! Records keep insertion order. Nothing sorts them; `generate` reflects
//! the live sequence.

use crate::compression;
use crate::error::{Error, Result};
use crate::hash::ChecksumFile;
use crate::package::PackageRecord;
use crate::progress::ProgressTracker;
use crate::store::{
    CONTENT_TYPE_GZIP, CONTENT_TYPE_PACKAGE, CONTENT_TYPE_TEXT, ObjectStore, Visibility,
    WriteOptions,
};
use std::collections::BTreeMap;
use std::fs;
use tracing::{debug, info};

/// Publication policy for a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestOptions {
    pub cache_control: Option<String>,
    /// Refuse to replace a package version published under another file
    /// name, and refuse to overwrite package objects with other content
    pub fail_if_exists: bool,
    /// Regenerate indexes without uploading package files
    pub skip_package_upload: bool,
    /// Also publish index files under `by-hash/<label>/<digest>`
    pub acquire_by_hash: bool,
    pub visibility: Visibility,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        Self {
            cache_control: None,
            fail_if_exists: false,
            skip_package_upload: false,
            acquire_by_hash: true,
            visibility: Visibility::default(),
        }
    }
}

/// Package index for one component and architecture
#[derive(Debug, Clone)]
pub struct Manifest {
    codename: String,
    component: String,
    architecture: String,
    packages: Vec<PackageRecord>,
    /// Records added in this session whose files still need uploading
    pending: Vec<PackageRecord>,
    /// Published index files, keyed relative to `dists/<codename>/`
    files: BTreeMap<String, ChecksumFile>,
    options: ManifestOptions,
}

impl Manifest {
    /// Create an empty manifest
    pub fn new(
        codename: impl Into<String>,
        component: impl Into<String>,
        architecture: impl Into<String>,
    ) -> Self {
        Self {
            codename: codename.into(),
            component: component.into(),
            architecture: architecture.into(),
            packages: Vec::new(),
            pending: Vec::new(),
            files: BTreeMap::new(),
            options: ManifestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ManifestOptions) -> Self {
        self.options = options;
        self
    }

    /// Load the published index, or start empty when there is none
    pub fn retrieve(
        store: &dyn ObjectStore,
        codename: &str,
        component: &str,
        architecture: &str,
        options: ManifestOptions,
    ) -> Result<Self> {
        let mut manifest = Self::new(codename, component, architecture).with_options(options);
        let key = manifest.packages_key();

        match store.read(&key)? {
            Some(data) => {
                let text = String::from_utf8(data)
                    .map_err(|e| Error::ParseError(format!("{} is not UTF-8: {}", key, e)))?;
                manifest.packages = Self::parse_packages(&text)?;
                debug!("Loaded {} packages from {}", manifest.packages.len(), key);
            }
            None => debug!("{} not found, starting empty", key),
        }

        Ok(manifest)
    }

    /// Parse the records of a `Packages` index, in file order
    ///
    /// Stanzas are separated by blank lines; empty stanzas are skipped.
    pub fn parse_packages(text: &str) -> Result<Vec<PackageRecord>> {
        let mut records = Vec::new();
        let mut stanza = String::new();

        for line in text.lines() {
            if line.trim().is_empty() {
                if !stanza.is_empty() {
                    records.push(PackageRecord::from_control(&stanza)?);
                    stanza.clear();
                }
                continue;
            }
            stanza.push_str(line);
            stanza.push('\n');
        }
        if !stanza.is_empty() {
            records.push(PackageRecord::from_control(&stanza)?);
        }

        Ok(records)
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn architecture(&self) -> &str {
        &self.architecture
    }

    /// Records in index order
    pub fn packages(&self) -> &[PackageRecord] {
        &self.packages
    }

    /// Records whose package files will be uploaded by the next publish
    pub fn pending_uploads(&self) -> &[PackageRecord] {
        &self.pending
    }

    /// Checksums of the index files written by the last publish
    pub fn files(&self) -> &BTreeMap<String, ChecksumFile> {
        &self.files
    }

    /// `<component>/binary-<arch>`
    fn component_path(&self) -> String {
        format!("{}/binary-{}", self.component, self.architecture)
    }

    /// `dists/<codename>/<component>/binary-<arch>`
    fn dist_path(&self) -> String {
        format!("dists/{}/{}", self.codename, self.component_path())
    }

    fn packages_key(&self) -> String {
        format!("{}/Packages", self.dist_path())
    }

    /// Add a record, replacing what it supersedes
    ///
    /// Without `preserve_versions` every record with the same name is
    /// replaced. With it only a record with the same name and full version
    /// is replaced, so older versions stay listed.
    ///
    /// With `fail_if_exists`, a record with the same name and full version
    /// but a different file name is a [`Error::ConflictError`] and the
    /// manifest is left untouched.
    pub fn add(
        &mut self,
        record: PackageRecord,
        preserve_versions: bool,
        needs_upload: bool,
    ) -> Result<&PackageRecord> {
        if self.options.fail_if_exists
            && let Some(existing) = self.packages.iter().find(|p| {
                p.name() == record.name()
                    && p.full_version() == record.full_version()
                    && p.file_name() != record.file_name()
            })
        {
            return Err(Error::ConflictError(format!(
                "package {}_{} already exists with different filename ({})",
                record.name(),
                record.full_version(),
                existing.url_filename()
            )));
        }

        if preserve_versions {
            let version = record.full_version();
            self.packages
                .retain(|p| !(p.name() == record.name() && p.full_version() == version));
        } else {
            self.packages.retain(|p| p.name() != record.name());
        }

        debug!(
            "Adding {} {} to {}",
            record.name(),
            record.full_version(),
            self.component_path()
        );
        if needs_upload {
            self.pending.push(record.clone());
        }
        self.packages.push(record);

        // The vector is non-empty after the push
        Ok(&self.packages[self.packages.len() - 1])
    }

    /// Remove records of package `name`, returning the removed ones
    ///
    /// **`versions` lists the versions to KEEP, not the ones to delete.**
    /// With `None` every record named `name` is removed. With `Some(list)`
    /// a record named `name` survives when its upstream version, its
    /// `upstream-revision` or its full version appears in `list`; every
    /// other record of that name is removed. Records of other packages are
    /// never touched.
    pub fn delete_package(
        &mut self,
        name: &str,
        versions: Option<&[String]>,
    ) -> Vec<PackageRecord> {
        let keep = |p: &PackageRecord| match versions {
            None => false,
            Some(list) => {
                let version = p.version();
                list.iter().any(|v| {
                    *v == version.upstream
                        || *v == version.version_iteration()
                        || *v == version.full_version()
                })
            }
        };

        let (removed, kept): (Vec<_>, Vec<_>) = self
            .packages
            .drain(..)
            .partition(|p| p.name() == name && !keep(p));
        self.packages = kept;

        if !removed.is_empty() {
            info!(
                "Removed {} record(s) of {} from {}",
                removed.len(),
                name,
                self.component_path()
            );
        }
        removed
    }

    /// Remove every record matching `predicate`, returning the removed ones
    pub fn remove_where<F>(&mut self, mut predicate: F) -> Vec<PackageRecord>
    where
        F: FnMut(&PackageRecord) -> bool,
    {
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.packages.drain(..).partition(|p| predicate(p));
        self.packages = kept;
        removed
    }

    /// Render the `Packages` index text
    pub fn generate(&self) -> String {
        self.packages
            .iter()
            .map(PackageRecord::generate)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Upload pending package files, then write `Packages`, `Packages.gz`
    /// and their by-hash copies
    ///
    /// Every key is reported to `progress` before it is written. A failed
    /// write aborts the remaining steps; earlier writes stay in place.
    pub fn publish(
        &mut self,
        store: &dyn ObjectStore,
        progress: &dyn ProgressTracker,
    ) -> Result<()> {
        let text = self.generate();

        if self.options.skip_package_upload {
            debug!("Skipping upload of {} package file(s)", self.pending.len());
        } else {
            self.upload_packages(store, progress)?;
        }

        let gzipped = compression::gzip(text.as_bytes())?;
        self.write_index(store, progress, "Packages", text.as_bytes(), CONTENT_TYPE_TEXT)?;
        self.write_index(store, progress, "Packages.gz", &gzipped, CONTENT_TYPE_GZIP)?;

        info!(
            "Published {} ({} packages) to {}",
            self.packages_key(),
            self.packages.len(),
            store.name()
        );
        Ok(())
    }

    fn upload_packages(
        &mut self,
        store: &dyn ObjectStore,
        progress: &dyn ProgressTracker,
    ) -> Result<()> {
        let options = WriteOptions::new(CONTENT_TYPE_PACKAGE)
            .cache_control(self.options.cache_control.as_deref())
            .fail_if_exists(self.options.fail_if_exists)
            .visibility(self.options.visibility);

        while let Some(record) = self.pending.first() {
            let source = record.source_path().ok_or_else(|| {
                Error::NotFoundError(format!(
                    "no local file for {} {}",
                    record.name(),
                    record.full_version()
                ))
            })?;
            let data = fs::read(source).map_err(|e| {
                Error::IoError(format!("Failed to read {}: {}", source.display(), e))
            })?;

            progress.uploading(record.url_filename());
            store.write(record.url_filename(), &data, &options)?;
            self.pending.remove(0);
        }
        Ok(())
    }

    /// Write one index file plus its by-hash copies and record its checksums
    fn write_index(
        &mut self,
        store: &dyn ObjectStore,
        progress: &dyn ProgressTracker,
        file_name: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<()> {
        let dist_path = self.dist_path();
        let key = format!("{}/{}", dist_path, file_name);
        let checksums = ChecksumFile::compute(data);
        let options = WriteOptions::new(content_type)
            .cache_control(self.options.cache_control.as_deref())
            .visibility(self.options.visibility);

        progress.uploading(&key);
        store.write(&key, data, &options)?;

        if self.options.acquire_by_hash {
            for (algo, digest) in checksums.digests() {
                let by_hash = format!("{}/by-hash/{}/{}", dist_path, algo.release_label(), digest);
                store.write(&by_hash, data, &options)?;
            }
        }

        self.files
            .insert(format!("{}/{}", self.component_path(), file_name), checksums);
        Ok(())
    }
}
