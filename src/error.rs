// src/error.rs

//! Error types shared by the whole crate

use crate::compression::CompressionError;
use thiserror::Error;

/// Errors raised while building or publishing repository metadata
#[derive(Error, Debug)]
pub enum Error {
    /// An object (package or index) already exists with different content,
    /// or a package version is already published under another filename
    #[error("Conflict: {0}")]
    ConflictError(String),

    /// The signing subprocess failed or produced no signature artifact
    #[error("Signing failed: {0}")]
    SigningError(String),

    /// Malformed control text, Release text or package archive
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The object store rejected or failed an operation
    #[error("Storage error: {0}")]
    StoreError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Not found: {0}")]
    NotFoundError(String),

    #[error("GPG verification failed: {0}")]
    GpgVerificationFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Compression(#[from] CompressionError),
}

/// Result type used across the crate
pub type Result<T> = std::result::Result<T, Error>;
