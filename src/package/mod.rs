// src/package/mod.rs

//! Package records as they appear in a `Packages` index
//!
//! A [`PackageRecord`] is built either from control text (an existing
//! index stanza) or from a local `.deb` file, and is immutable afterwards.

mod control;
mod deb;
mod version;

pub use control::ControlStanza;
pub use version::DebVersion;

use crate::error::{Error, Result};
use crate::hash::{ChecksumFile, HashAlgorithm};
use std::path::{Path, PathBuf};

/// One binary package entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    name: String,
    version: DebVersion,
    architecture: String,
    /// Local file to upload; absent for records read back from an index
    source_path: Option<PathBuf>,
    /// Target path relative to the repository root (the `Filename` field)
    url_filename: String,
    control: ControlStanza,
}

impl PackageRecord {
    /// Build a record from one control stanza
    ///
    /// `Package`, `Version` and `Architecture` are required. `Filename` is
    /// optional so a bare `DEBIAN/control` also parses.
    pub fn from_control(text: &str) -> Result<Self> {
        Self::from_stanza(ControlStanza::parse(text)?)
    }

    /// Build a record from an already parsed stanza
    pub fn from_stanza(control: ControlStanza) -> Result<Self> {
        let required = |field: &str| {
            control
                .get(field)
                .map(str::to_string)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::ParseError(format!("missing required field '{}'", field)))
        };

        let name = required("Package")?;
        let version = DebVersion::parse(&required("Version")?)?;
        let architecture = required("Architecture")?;
        let url_filename = control.get("Filename").unwrap_or_default().to_string();

        Ok(Self {
            name,
            version,
            architecture,
            source_path: None,
            url_filename,
            control,
        })
    }

    /// Read a local `.deb` and build the record that will be published
    ///
    /// The stanza gains `Filename` (pool path under `codename`), `Size`,
    /// `MD5sum`, `SHA1` and `SHA256` fields describing the archive.
    pub fn from_deb_file(path: &Path, codename: &str) -> Result<Self> {
        let (control, checksums) = deb::read_deb(path)?;
        let mut record = Self::from_stanza(control)?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::ParseError(format!("invalid package path {:?}", path)))?;

        let url_filename = pool_path(codename, &record.name, file_name);
        record.set_file_fields(url_filename, &checksums);
        record.source_path = Some(path.to_path_buf());
        Ok(record)
    }

    /// Attach the local file to upload for this record
    #[cfg(test)]
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    fn set_file_fields(&mut self, url_filename: String, checksums: &ChecksumFile) {
        self.control.set("Filename", url_filename.clone());
        self.control.set("Size", checksums.size.to_string());
        for (algo, digest) in checksums.digests() {
            self.control.set(algo.control_field(), digest);
        }
        self.url_filename = url_filename;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &DebVersion {
        &self.version
    }

    pub fn architecture(&self) -> &str {
        &self.architecture
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn url_filename(&self) -> &str {
        &self.url_filename
    }

    /// Final path component of the target path
    pub fn file_name(&self) -> &str {
        self.url_filename
            .rsplit('/')
            .next()
            .unwrap_or(&self.url_filename)
    }

    /// `[epoch:]upstream[-revision]`
    pub fn full_version(&self) -> String {
        self.version.full_version()
    }

    /// `upstream-revision`
    pub fn version_iteration(&self) -> String {
        self.version.version_iteration()
    }

    /// Checksum recorded in the stanza for the package file
    pub fn checksum(&self, algorithm: HashAlgorithm) -> Option<&str> {
        self.control.get(algorithm.control_field())
    }

    pub fn control(&self) -> &ControlStanza {
        &self.control
    }

    /// Render the stanza as it appears in a `Packages` index
    pub fn generate(&self) -> String {
        self.control.render()
    }
}

/// Pool location for a package file: `pool/<codename>/<n>/<na>/<file>`
///
/// `<n>` and `<na>` are the first one and two characters of the package
/// name, spreading the pool over many prefixes.
pub fn pool_path(codename: &str, name: &str, file_name: &str) -> String {
    let first: String = name.chars().take(1).collect();
    let first_two: String = name.chars().take(2).collect();
    format!("pool/{}/{}/{}/{}", codename, first, first_two, file_name)
}
