// src/release.rs

//! Top-level `dists/<codename>/Release` descriptor
//!
//! The Release lists every component and architecture of a codename and
//! the checksums of every index file below it. APT clients fetch it first
//! and trust an index only when its checksums match, so publishing follows
//! a fixed order:
//! 1. backfill an empty index for every declared component/architecture
//!    pair that has none
//! 2. render, and sign when a signer is configured
//! 3. write the signature (detached mode), then the Release or InRelease
//!    object itself, last
//!
//! Until step 3 completes, clients keep seeing the previous Release, which
//! only references objects that already exist.

use crate::error::{Error, Result};
use crate::hash::{ChecksumFile, HashAlgorithm};
use crate::manifest::{Manifest, ManifestOptions};
use crate::progress::ProgressTracker;
use crate::signing::{SignMode, Signer, artifact_path};
use crate::store::{
    CONTENT_TYPE_SIGNATURE, CONTENT_TYPE_TEXT, ObjectStore, Visibility, WriteOptions,
};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

/// Indented checksum line: `<hex> <size> <path>`
static CHECKSUM_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]+(\S+)[ \t]+(\d+)[ \t]+(.+)$").unwrap());

const SIGNED_MESSAGE_HEADER: &str = "-----BEGIN PGP SIGNED MESSAGE-----";
const SIGNATURE_HEADER: &str = "-----BEGIN PGP SIGNATURE-----";

/// Settings applied when loading a Release for publication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOptions {
    /// Origin for a Release created from scratch
    pub origin: Option<String>,
    /// Suite for a Release created from scratch; defaults to the codename
    pub suite: Option<String>,
    pub cache_control: Option<String>,
    pub acquire_by_hash: bool,
    pub visibility: Visibility,
    /// Architectures that must be present, appended when missing
    pub architectures: Vec<String>,
}

impl Default for ReleaseOptions {
    fn default() -> Self {
        Self {
            origin: None,
            suite: None,
            cache_control: None,
            acquire_by_hash: true,
            visibility: Visibility::default(),
            architectures: Vec::new(),
        }
    }
}

/// In-memory Release for one codename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub codename: String,
    pub origin: Option<String>,
    pub suite: Option<String>,
    /// Insertion order, no duplicates
    pub architectures: Vec<String>,
    /// Insertion order, no duplicates
    pub components: Vec<String>,
    /// Index checksums keyed relative to `dists/<codename>/`
    pub files: BTreeMap<String, ChecksumFile>,
    pub acquire_by_hash: bool,
    pub cache_control: Option<String>,
    pub visibility: Visibility,
}

impl Release {
    /// Create an empty Release whose suite is the codename
    pub fn new(codename: impl Into<String>) -> Self {
        let codename = codename.into();
        Self {
            suite: Some(codename.clone()),
            codename,
            origin: None,
            architectures: Vec::new(),
            components: Vec::new(),
            files: BTreeMap::new(),
            acquire_by_hash: true,
            cache_control: None,
            visibility: Visibility::default(),
        }
    }

    /// Load the published Release for `codename`, or start a new one
    ///
    /// Reads `Release`, falling back to the signed body of `InRelease` for
    /// repositories published in clearsign mode.
    pub fn retrieve(
        store: &dyn ObjectStore,
        codename: &str,
        options: ReleaseOptions,
    ) -> Result<Self> {
        let key = format!("dists/{}/Release", codename);
        let inrelease_key = format!("dists/{}/InRelease", codename);

        let published = match store.read(&key)? {
            Some(data) => Some((key.as_str(), data)),
            None => store.read(&inrelease_key)?.map(|data| (inrelease_key.as_str(), data)),
        };

        let mut release = match published {
            Some((key, data)) => {
                let text = String::from_utf8(data)
                    .map_err(|e| Error::ParseError(format!("{} is not UTF-8: {}", key, e)))?;
                let text = clearsigned_body(&text).unwrap_or(text);
                let mut release = Self::parse(&text);
                if release.codename.is_empty() {
                    release.codename = codename.to_string();
                }
                debug!(
                    "Loaded {} ({} components, {} files)",
                    key,
                    release.components.len(),
                    release.files.len()
                );
                release
            }
            None => {
                debug!("{} not found, creating a new release", key);
                let mut release = Self::new(codename);
                release.origin = options.origin;
                if options.suite.is_some() {
                    release.suite = options.suite;
                }
                release
            }
        };

        release.cache_control = options.cache_control;
        release.acquire_by_hash = options.acquire_by_hash;
        release.visibility = options.visibility;
        for arch in options.architectures {
            release.add_architecture(&arch);
        }
        Ok(release)
    }

    /// Parse Release text
    ///
    /// Missing fields are left empty. Checksum lines carry no algorithm
    /// tag, so the algorithm is taken from the digest length (32, 40 or 64
    /// hex characters). A future 64-character digest that is not SHA-256
    /// would be misfiled; lines of other lengths only record the size.
    pub fn parse(text: &str) -> Self {
        let field = |name: &str| {
            text.lines().find_map(|line| {
                line.strip_prefix(name)
                    .and_then(|rest| rest.strip_prefix(": "))
                    .map(|v| v.trim_end().to_string())
            })
        };
        let list = |name: &str| -> Vec<String> {
            field(name)
                .map(|v| v.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default()
        };

        let mut release = Self {
            codename: field("Codename").unwrap_or_default(),
            origin: field("Origin"),
            suite: field("Suite"),
            architectures: Vec::new(),
            components: Vec::new(),
            files: BTreeMap::new(),
            acquire_by_hash: field("Acquire-By-Hash")
                .is_some_and(|v| v.eq_ignore_ascii_case("yes")),
            cache_control: None,
            visibility: Visibility::default(),
        };
        for arch in list("Architectures") {
            release.add_architecture(&arch);
        }
        for comp in list("Components") {
            release.add_component(&comp);
        }

        for caps in CHECKSUM_LINE.captures_iter(text) {
            let digest = &caps[1];
            let path = caps[3].trim_end();
            let Ok(size) = caps[2].parse::<u64>() else {
                warn!("Ignoring checksum line for {} with invalid size", path);
                continue;
            };

            let entry = release
                .files
                .entry(path.to_string())
                .or_insert_with(|| ChecksumFile {
                    size,
                    ..Default::default()
                });
            match HashAlgorithm::from_hex_len(digest.len()) {
                Some(algo) => entry.set_digest(algo, digest),
                None => warn!(
                    "Unrecognised {}-character checksum for {}, keeping size only",
                    digest.len(),
                    path
                ),
            }
        }

        release
    }

    /// `dists/<codename>`
    pub fn dist_path(&self) -> String {
        format!("dists/{}", self.codename)
    }

    pub fn release_key(&self) -> String {
        format!("{}/Release", self.dist_path())
    }

    pub fn inrelease_key(&self) -> String {
        format!("{}/InRelease", self.dist_path())
    }

    pub fn add_architecture(&mut self, arch: &str) {
        if !self.architectures.iter().any(|a| a == arch) {
            self.architectures.push(arch.to_string());
        }
    }

    pub fn add_component(&mut self, component: &str) {
        if !self.components.iter().any(|c| c == component) {
            self.components.push(component.to_string());
        }
    }

    /// Options for manifests published under this Release
    pub fn manifest_options(&self) -> ManifestOptions {
        ManifestOptions {
            cache_control: self.cache_control.clone(),
            acquire_by_hash: self.acquire_by_hash,
            visibility: self.visibility,
            ..Default::default()
        }
    }

    /// Render the Release text, dated now
    pub fn generate(&self) -> String {
        self.generate_at(Utc::now())
    }

    /// Render the Release text with the given `Date`
    pub fn generate_at(&self, date: DateTime<Utc>) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.render(&mut out, date);
        out
    }

    fn render(&self, out: &mut String, date: DateTime<Utc>) -> fmt::Result {
        if let Some(origin) = &self.origin {
            writeln!(out, "Origin: {}", origin)?;
            writeln!(out, "Label: {}", origin)?;
        }
        if let Some(suite) = &self.suite {
            writeln!(out, "Suite: {}", suite)?;
        }
        writeln!(out, "Codename: {}", self.codename)?;
        writeln!(out, "Date: {}", date.format("%a, %d %b %Y %H:%M:%S UTC"))?;
        writeln!(out, "Architectures: {}", self.architectures.join(" "))?;
        writeln!(out, "Components: {}", self.components.join(" "))?;
        if self.acquire_by_hash {
            writeln!(out, "Acquire-By-Hash: yes")?;
        }

        for algo in HashAlgorithm::ALL {
            let mut lines = self
                .files
                .iter()
                .filter_map(|(path, sums)| sums.digest(algo).map(|d| (path, sums.size, d)))
                .peekable();
            if lines.peek().is_none() {
                continue;
            }
            writeln!(out, "{}:", algo.release_label())?;
            for (path, size, digest) in lines {
                writeln!(out, " {} {:>16} {}", digest, size, path)?;
            }
        }
        Ok(())
    }

    /// Fold a published manifest into this Release
    ///
    /// Adds its component and architecture when missing and merges its
    /// file checksums; entries for the same path are replaced.
    pub fn update_manifest(&mut self, manifest: &Manifest) {
        self.add_component(manifest.component());
        self.add_architecture(manifest.architecture());
        for (path, sums) in manifest.files() {
            self.files.insert(path.clone(), sums.clone());
        }
    }

    /// Publish an empty index for every component/architecture pair that
    /// has no `Packages` entry yet, then fold them in
    pub fn validate_others(
        &mut self,
        store: &dyn ObjectStore,
        progress: &dyn ProgressTracker,
    ) -> Result<()> {
        let mut backfilled = Vec::new();

        for component in &self.components {
            for arch in &self.architectures {
                let key = format!("{}/binary-{}/Packages", component, arch);
                if self.files.contains_key(&key) {
                    continue;
                }

                info!("Backfilling empty index for {}/{}", self.codename, key);
                let mut manifest = Manifest::new(&self.codename, component, arch)
                    .with_options(self.manifest_options());
                manifest.publish(store, progress)?;
                backfilled.push(manifest);
            }
        }

        for manifest in &backfilled {
            self.update_manifest(manifest);
        }
        Ok(())
    }

    /// Write the Release (or InRelease with `inrelease`) and its signature
    ///
    /// With a signer, detached mode writes `Release.gpg` before `Release`,
    /// and clearsign mode writes the signer's output as `InRelease`. Without
    /// a signer, detached mode removes a stale `Release.gpg`. A signing
    /// failure aborts before anything is written, leaving the previous
    /// Release in place. Temporary files are removed on every path.
    pub fn publish(
        &mut self,
        store: &dyn ObjectStore,
        signer: Option<&dyn Signer>,
        inrelease: bool,
        progress: &dyn ProgressTracker,
    ) -> Result<()> {
        self.validate_others(store, progress)?;

        let target = if inrelease {
            self.inrelease_key()
        } else {
            self.release_key()
        };
        let signature_key = format!("{}.gpg", target);

        let text = self.generate();
        let mut rendered = tempfile::NamedTempFile::new()?;
        rendered.write_all(text.as_bytes())?;
        rendered.flush()?;

        let mut body = text.into_bytes();
        let mut content_type = CONTENT_TYPE_TEXT;

        match signer {
            Some(signer) => {
                let artifact = RemoveOnDrop(artifact_path(rendered.path()));
                let mode = if inrelease {
                    SignMode::Clearsign
                } else {
                    SignMode::Detached
                };
                let produced = signer.sign(rendered.path(), mode)?;
                let _produced = RemoveOnDrop(produced.clone());

                let signed = fs::read(&produced).map_err(|e| {
                    Error::SigningError(format!(
                        "Unable to read signature for {} at {}: {}",
                        target,
                        artifact.0.display(),
                        e
                    ))
                })?;

                if inrelease {
                    body = signed;
                    content_type = CONTENT_TYPE_SIGNATURE;
                } else {
                    progress.uploading(&signature_key);
                    let options = self.write_options(CONTENT_TYPE_SIGNATURE);
                    store.write(&signature_key, &signed, &options)?;
                }
            }
            None if !inrelease => store.remove(&signature_key)?,
            None => {}
        }

        progress.uploading(&target);
        store.write(&target, &body, &self.write_options(content_type))?;

        info!(
            "Published {} ({} components, {} architectures, {} files)",
            target,
            self.components.len(),
            self.architectures.len(),
            self.files.len()
        );
        Ok(())
    }

    fn write_options(&self, content_type: &'static str) -> WriteOptions<'_> {
        WriteOptions::new(content_type)
            .cache_control(self.cache_control.as_deref())
            .visibility(self.visibility)
    }
}

/// Body of a clearsigned message, `None` when `text` is not clearsigned
///
/// Drops the armor header block and the trailing signature, and undoes
/// dash-escaping.
fn clearsigned_body(text: &str) -> Option<String> {
    let rest = text.strip_prefix(SIGNED_MESSAGE_HEADER)?;
    let mut lines = rest.lines().skip(1);

    // Armor headers (`Hash: SHA256`) end at the first empty line
    for line in lines.by_ref() {
        if line.trim().is_empty() {
            break;
        }
    }

    let mut body = String::new();
    for line in lines {
        if line.trim_end() == SIGNATURE_HEADER {
            return Some(body);
        }
        body.push_str(line.strip_prefix("- ").unwrap_or(line));
        body.push('\n');
    }
    warn!("Clearsigned message has no signature block");
    Some(body)
}

/// Deletes a local signer artifact when dropped
struct RemoveOnDrop(PathBuf);

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.0)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!("Failed to remove {}: {}", self.0.display(), e);
        }
    }
}
