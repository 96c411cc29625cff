// src/lib.rs

//! aptsync
//!
//! Publishes and incrementally updates APT repositories kept in an object
//! store with no transactions and no locking.
//!
//! # Architecture
//!
//! - Manifest: one `Packages` index per codename, component and
//!   architecture, with by-hash copies
//! - Release: the per-codename descriptor listing every index checksum,
//!   optionally signed
//! - Ordering: package files, then indexes, then signature, then Release;
//!   the Release write is the commit point
//! - Stores: S3-compatible buckets, local directories, in-memory (tests)

pub mod compression;
pub mod config;
mod error;
pub mod hash;
pub mod manifest;
pub mod package;
pub mod progress;
pub mod release;
pub mod signing;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use hash::{ChecksumFile, HashAlgorithm};
pub use manifest::{Manifest, ManifestOptions};
pub use package::{ControlStanza, DebVersion, PackageRecord};
pub use progress::{
    CallbackProgress, CliProgress, LogProgress, ProgressEvent, ProgressTracker, SilentProgress,
};
pub use release::{Release, ReleaseOptions};
pub use signing::{GpgSigner, ReleaseVerifier, SignMode, Signer, SigningConfig};
pub use store::{FsStore, MemoryStore, ObjectStore, Visibility, WriteOptions};
