// src/store/mod.rs

//! Object storage backends
//!
//! The repository lives entirely in an object store with plain
//! GET/PUT/DELETE semantics: no transactions, no locking. Publishing code
//! only talks to the [`ObjectStore`] trait; backends are:
//! - [`MemoryStore`]: in-process map that also records every operation,
//!   used by tests to assert write ordering
//! - [`FsStore`]: a local directory tree, e.g. a web server document root
//! - `S3Store` (feature `s3`): any S3-compatible bucket

mod fs;
mod memory;
#[cfg(feature = "s3")]
mod s3;

pub use fs::FsStore;
pub use memory::{MemoryStore, StoreOp, StoredObject};
#[cfg(feature = "s3")]
pub use s3::{S3Config, S3Store};

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Content type of package files
pub const CONTENT_TYPE_PACKAGE: &str = "application/octet-stream";
/// Content type of plain-text indexes and the Release file
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=UTF-8";
/// Content type of gzip-compressed indexes
pub const CONTENT_TYPE_GZIP: &str = "application/x-gzip; charset=binary";
/// Content type of detached signatures and clearsigned InRelease files
pub const CONTENT_TYPE_SIGNATURE: &str = "application/pgp-signature; charset=UTF-8";

/// Access policy applied to every written object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    #[default]
    PublicRead,
    Private,
    AuthenticatedRead,
    BucketOwnerFullControl,
}

impl Visibility {
    /// S3 canned ACL name
    pub const fn canned_acl(&self) -> &'static str {
        match self {
            Self::PublicRead => "public-read",
            Self::Private => "private",
            Self::AuthenticatedRead => "authenticated-read",
            Self::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canned_acl())
    }
}

impl FromStr for Visibility {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "public" | "public-read" => Ok(Self::PublicRead),
            "private" => Ok(Self::Private),
            "authenticated" | "authenticated-read" => Ok(Self::AuthenticatedRead),
            "bucket-owner" | "bucket-owner-full-control" => Ok(Self::BucketOwnerFullControl),
            other => Err(Error::ConfigError(format!("unknown visibility '{}'", other))),
        }
    }
}

/// Per-write metadata
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions<'a> {
    pub content_type: &'a str,
    pub cache_control: Option<&'a str>,
    /// Refuse to replace an existing object whose content differs
    pub fail_if_exists: bool,
    pub visibility: Visibility,
}

impl<'a> WriteOptions<'a> {
    pub fn new(content_type: &'a str) -> Self {
        Self {
            content_type,
            cache_control: None,
            fail_if_exists: false,
            visibility: Visibility::default(),
        }
    }

    pub fn cache_control(mut self, cache_control: Option<&'a str>) -> Self {
        self.cache_control = cache_control.filter(|c| !c.is_empty());
        self
    }

    pub fn fail_if_exists(mut self, fail_if_exists: bool) -> Self {
        self.fail_if_exists = fail_if_exists;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

/// Minimal object storage contract
///
/// Every call is independent and non-atomic with respect to the others.
/// Implementations do not retry.
pub trait ObjectStore {
    /// Read an object; `Ok(None)` when the key does not exist
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write an object
    ///
    /// With `fail_if_exists`, an existing object with identical content is
    /// left alone and one with different content fails with
    /// [`Error::ConflictError`].
    fn write(&self, key: &str, data: &[u8], options: &WriteOptions<'_>) -> Result<()>;

    /// Delete an object; deleting a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Outcome of comparing a write against what is already stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExistingObject {
    Absent,
    Identical,
}

/// Apply the fail-if-exists rule for backends that can read the old bytes
pub(crate) fn check_existing(
    key: &str,
    existing: Option<&[u8]>,
    data: &[u8],
) -> Result<ExistingObject> {
    match existing {
        None => Ok(ExistingObject::Absent),
        Some(old) if old == data => Ok(ExistingObject::Identical),
        Some(_) => Err(Error::ConflictError(format!(
            "object {} already exists with different content",
            key
        ))),
    }
}
