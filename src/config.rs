// src/config.rs
//! Configuration file parsing
//!
//! Supports TOML configuration files with the following sections:
//! - [store] - Storage backend (S3 bucket or local directory)
//! - [repository] - Codename, component, architectures, publish policy
//! - [signing] - GPG key and invocation settings
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration. Command line flags override file values.

use crate::error::{Error, Result};
use crate::manifest::ManifestOptions;
use crate::release::ReleaseOptions;
use crate::signing::SigningConfig;
use crate::store::{FsStore, ObjectStore, Visibility};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "aptsync.toml";

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub repository: RepositorySection,

    #[serde(default)]
    pub signing: SigningSection,
}

/// Storage backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    S3,
    Fs,
}

/// Storage configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    #[serde(default)]
    pub backend: Backend,

    /// Bucket name (s3)
    #[serde(default)]
    pub bucket: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint for S3-compatible services (s3)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Key prefix inside the bucket (s3)
    #[serde(default)]
    pub prefix: Option<String>,

    #[serde(default)]
    pub path_style: bool,

    #[serde(default)]
    pub access_key_id: Option<String>,

    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Repository root directory (fs)
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            bucket: None,
            region: default_region(),
            endpoint: None,
            prefix: None,
            path_style: false,
            access_key_id: None,
            secret_access_key: None,
            root: default_root(),
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_root() -> PathBuf {
    PathBuf::from("./public")
}

/// Repository configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositorySection {
    #[serde(default = "default_codename")]
    pub codename: String,

    #[serde(default = "default_component")]
    pub component: String,

    /// Origin (and Label) of a newly created Release
    #[serde(default)]
    pub origin: Option<String>,

    /// Suite of a newly created Release; defaults to the codename
    #[serde(default)]
    pub suite: Option<String>,

    /// Architectures every component must publish an index for
    #[serde(default)]
    pub architectures: Vec<String>,

    #[serde(default)]
    pub cache_control: Option<String>,

    #[serde(default)]
    pub visibility: Visibility,

    #[serde(default = "default_true")]
    pub acquire_by_hash: bool,

    #[serde(default)]
    pub fail_if_exists: bool,

    #[serde(default)]
    pub preserve_versions: bool,
}

impl Default for RepositorySection {
    fn default() -> Self {
        Self {
            codename: default_codename(),
            component: default_component(),
            origin: None,
            suite: None,
            architectures: Vec::new(),
            cache_control: None,
            visibility: Visibility::default(),
            acquire_by_hash: true,
            fail_if_exists: false,
            preserve_versions: false,
        }
    }
}

fn default_codename() -> String {
    "stable".to_string()
}

fn default_component() -> String {
    "main".to_string()
}

fn default_true() -> bool {
    true
}

/// Signing configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SigningSection {
    /// Key to sign with; `""` uses the default key, absent disables signing
    #[serde(default)]
    pub key: Option<String>,

    #[serde(default = "default_gpg_binary")]
    pub gpg_binary: String,

    #[serde(default)]
    pub gpg_options: Vec<String>,

    /// Publish a clearsigned InRelease instead of Release + Release.gpg
    #[serde(default)]
    pub inrelease: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SigningSection {
    fn default() -> Self {
        Self {
            key: None,
            gpg_binary: default_gpg_binary(),
            gpg_options: Vec::new(),
            inrelease: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_gpg_binary() -> String {
    "gpg".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl SigningSection {
    /// Signer settings, or `None` when no key is configured
    pub fn signing_config(&self) -> Option<SigningConfig> {
        self.key.as_ref().map(|key| SigningConfig {
            key: key.clone(),
            gpg_binary: self.gpg_binary.clone(),
            gpg_options: self.gpg_options.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::parse(&content)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load an explicit file, or `aptsync.toml` when present, or defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigError(format!("invalid config: {}", e)))
    }

    /// Options for loading the Release
    pub fn release_options(&self) -> ReleaseOptions {
        let repo = &self.repository;
        ReleaseOptions {
            origin: repo.origin.clone(),
            suite: repo.suite.clone(),
            cache_control: repo.cache_control.clone(),
            acquire_by_hash: repo.acquire_by_hash,
            visibility: repo.visibility,
            architectures: repo.architectures.clone(),
        }
    }

    /// Options for manifests touched by an upload or delete
    pub fn manifest_options(&self, skip_package_upload: bool) -> ManifestOptions {
        let repo = &self.repository;
        ManifestOptions {
            cache_control: repo.cache_control.clone(),
            fail_if_exists: repo.fail_if_exists,
            skip_package_upload,
            acquire_by_hash: repo.acquire_by_hash,
            visibility: repo.visibility,
        }
    }

    /// Open the configured object store
    pub fn open_store(&self) -> Result<Box<dyn ObjectStore>> {
        match self.store.backend {
            Backend::Fs => Ok(Box::new(FsStore::new(&self.store.root)?)),
            Backend::S3 => self.open_s3(),
        }
    }

    #[cfg(feature = "s3")]
    fn open_s3(&self) -> Result<Box<dyn ObjectStore>> {
        let store = &self.store;
        let bucket = store
            .bucket
            .clone()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| {
                Error::ConfigError("store.bucket is required for the s3 backend".into())
            })?;
        let s3 = crate::store::S3Config {
            bucket,
            region: store.region.clone(),
            endpoint: store.endpoint.clone(),
            prefix: store.prefix.clone(),
            path_style: store.path_style,
            access_key_id: store.access_key_id.clone(),
            secret_access_key: store.secret_access_key.clone(),
        };
        Ok(Box::new(crate::store::S3Store::new(&s3)?))
    }

    #[cfg(not(feature = "s3"))]
    fn open_s3(&self) -> Result<Box<dyn ObjectStore>> {
        Err(Error::ConfigError(
            "the s3 backend requires building with the 's3' feature".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.store.backend, Backend::S3);
        assert_eq!(config.store.region, "us-east-1");
        assert_eq!(config.repository.codename, "stable");
        assert_eq!(config.repository.component, "main");
        assert!(config.repository.acquire_by_hash);
        assert_eq!(config.repository.visibility, Visibility::PublicRead);
        assert!(config.signing.signing_config().is_none());
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
[store]
backend = "fs"
root = "/srv/apt"

[repository]
codename = "bookworm"
component = "contrib"
origin = "Example"
architectures = ["amd64", "arm64"]
cache_control = "max-age=300"
visibility = "private"
acquire_by_hash = false
fail_if_exists = true

[signing]
key = "ABCD1234"
gpg_options = ["--batch", "--yes"]
inrelease = true
timeout_secs = 30
"#,
        )
        .unwrap();

        assert_eq!(config.store.backend, Backend::Fs);
        assert_eq!(config.store.root, PathBuf::from("/srv/apt"));

        let release = config.release_options();
        assert_eq!(release.origin.as_deref(), Some("Example"));
        assert_eq!(release.architectures, vec!["amd64", "arm64"]);
        assert!(!release.acquire_by_hash);
        assert_eq!(release.visibility, Visibility::Private);

        let manifest = config.manifest_options(true);
        assert!(manifest.fail_if_exists);
        assert!(manifest.skip_package_upload);
        assert_eq!(manifest.cache_control.as_deref(), Some("max-age=300"));

        let signing = config.signing.signing_config().unwrap();
        assert_eq!(signing.key, "ABCD1234");
        assert_eq!(signing.gpg_binary, "gpg");
        assert_eq!(signing.timeout, Duration::from_secs(30));
        assert!(config.signing.inrelease);
    }

    #[test]
    fn test_empty_key_means_default_key() {
        let config = Config::parse("[signing]\nkey = \"\"\n").unwrap();
        assert_eq!(config.signing.signing_config().unwrap().key, "");
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            Config::parse("[repository]\nvisibility = \"world\"\n"),
            Err(Error::ConfigError(_))
        ));
        assert!(matches!(
            Config::parse("[store]\nbucket_name = \"x\"\n"),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_load_and_open_fs_store() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("repo");
        let path = temp_dir.path().join("aptsync.toml");
        fs::write(
            &path,
            format!("[store]\nbackend = \"fs\"\nroot = {:?}\n", root.to_str().unwrap()),
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        let store = config.open_store().unwrap();
        assert_eq!(store.name(), "fs");
        assert!(root.is_dir());

        assert!(Config::load(&temp_dir.path().join("missing.toml")).is_err());
    }

    #[cfg(feature = "s3")]
    #[test]
    fn test_s3_requires_bucket() {
        let config = Config::default();
        assert!(matches!(config.open_store(), Err(Error::ConfigError(_))));
    }
}
