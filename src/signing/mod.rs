// src/signing/mod.rs

//! Release signing and signature verification
//!
//! Signing is delegated to an external OpenPGP tool through the
//! [`Signer`] trait. Given a rendered Release file on disk, a signer
//! leaves an ASCII-armored artifact next to it at `<path>.asc`:
//! - [`SignMode::Detached`]: a detached signature, published as
//!   `Release.gpg`
//! - [`SignMode::Clearsign`]: the clearsigned text, published as
//!   `InRelease`
//!
//! Verification of published signatures uses sequoia, see
//! [`ReleaseVerifier`].

mod gpg;
mod verify;

pub use gpg::GpgSigner;
pub use verify::ReleaseVerifier;

use crate::error::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Kind of signature to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignMode {
    Detached,
    Clearsign,
}

/// Signing settings, passed explicitly into the Release publish step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningConfig {
    /// Key to sign with; an empty string selects the tool's default key
    pub key: String,
    pub gpg_binary: String,
    /// Extra arguments inserted before the mode flag
    pub gpg_options: Vec<String>,
    pub timeout: Duration,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            gpg_binary: "gpg".to_string(),
            gpg_options: Vec::new(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Produces signature artifacts for files on disk
pub trait Signer {
    /// Sign `path`, returning the path of the artifact (`<path>.asc`)
    ///
    /// Fails with [`crate::Error::SigningError`] when the tool fails or no
    /// artifact appears.
    fn sign(&self, path: &Path, mode: SignMode) -> Result<PathBuf>;
}

/// Path a signer is expected to write its artifact to
pub fn artifact_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".asc");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_path() {
        assert_eq!(
            artifact_path(Path::new("/tmp/.tmpAbc123")),
            PathBuf::from("/tmp/.tmpAbc123.asc")
        );
        assert_eq!(
            artifact_path(Path::new("dir/Release")),
            PathBuf::from("dir/Release.asc")
        );
    }

    #[test]
    fn test_default_config() {
        let config = SigningConfig::default();
        assert_eq!(config.gpg_binary, "gpg");
        assert!(config.key.is_empty());
        assert_eq!(config.timeout, Duration::from_secs(120));
    }
}
