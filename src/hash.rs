// src/hash.rs

//! Checksums for published repository artifacts
//!
//! APT repositories describe every index file with three digests plus a
//! size. This module provides:
//! - **HashAlgorithm**: the three digest algorithms, with the field labels
//!   APT expects in Release files, control stanzas and by-hash paths
//! - **ChecksumFile**: the `{size, md5, sha1, sha256}` tuple recorded for
//!   every artifact written
//! - **MultiHasher**: incremental hashing of all three at once, for
//!   streaming package files
//!
//! | Algorithm | Release block | by-hash directory | Control field |
//! |-----------|---------------|-------------------|---------------|
//! | MD5       | `MD5Sum:`     | `MD5Sum`          | `MD5sum`      |
//! | SHA-1     | `SHA1:`       | `SHA1`            | `SHA1`        |
//! | SHA-256   | `SHA256:`     | `SHA256`          | `SHA256`      |

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Read};

/// Digest algorithms used in APT metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    /// All algorithms, in the order their blocks appear in a Release file
    pub const ALL: [HashAlgorithm; 3] = [Self::Md5, Self::Sha1, Self::Sha256];

    /// Get the hash output length in bytes
    #[inline]
    pub const fn output_len(&self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }

    /// Get the hash output length as a hex string
    #[inline]
    pub const fn hex_len(&self) -> usize {
        self.output_len() * 2
    }

    /// Infer the algorithm from the length of a hex digest
    ///
    /// Release files carry no per-line algorithm tag, so the digest length
    /// is the only signal. Any future 64-character digest that is not
    /// SHA-256 would be misclassified here.
    pub fn from_hex_len(len: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|algo| algo.hex_len() == len)
    }

    /// Get the algorithm name as a string
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }

    /// Label used both for the Release checksum block and the by-hash
    /// directory. MD5 is irregular (`MD5Sum`), the others are plain.
    #[inline]
    pub const fn release_label(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5Sum",
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
        }
    }

    /// Field name used inside a package control stanza
    #[inline]
    pub const fn control_field(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5sum",
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Compute the hex digest of a byte slice
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> String {
    match algorithm {
        HashAlgorithm::Md5 => format!("{:x}", Md5::digest(data)),
        HashAlgorithm::Sha1 => format!("{:x}", Sha1::digest(data)),
        HashAlgorithm::Sha256 => format!("{:x}", Sha256::digest(data)),
    }
}

/// Size and digests of one published artifact
///
/// Digests are optional because a parsed Release may list a file under
/// only some of the checksum blocks. Freshly computed values always carry
/// all three.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumFile {
    pub size: u64,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub sha256: Option<String>,
}

impl ChecksumFile {
    /// Compute size and all digests of a buffer
    pub fn compute(data: &[u8]) -> Self {
        Self {
            size: data.len() as u64,
            md5: Some(hash_bytes(HashAlgorithm::Md5, data)),
            sha1: Some(hash_bytes(HashAlgorithm::Sha1, data)),
            sha256: Some(hash_bytes(HashAlgorithm::Sha256, data)),
        }
    }

    /// Get the digest for one algorithm
    pub fn digest(&self, algorithm: HashAlgorithm) -> Option<&str> {
        match algorithm {
            HashAlgorithm::Md5 => self.md5.as_deref(),
            HashAlgorithm::Sha1 => self.sha1.as_deref(),
            HashAlgorithm::Sha256 => self.sha256.as_deref(),
        }
    }

    /// Set the digest for one algorithm
    pub fn set_digest(&mut self, algorithm: HashAlgorithm, value: impl Into<String>) {
        let value = Some(value.into());
        match algorithm {
            HashAlgorithm::Md5 => self.md5 = value,
            HashAlgorithm::Sha1 => self.sha1 = value,
            HashAlgorithm::Sha256 => self.sha256 = value,
        }
    }

    /// Iterate over the digests that are present, in Release block order
    pub fn digests(&self) -> impl Iterator<Item = (HashAlgorithm, &str)> {
        HashAlgorithm::ALL
            .into_iter()
            .filter_map(move |algo| self.digest(algo).map(|d| (algo, d)))
    }
}

/// Incremental hasher computing every APT digest in one pass
#[derive(Default)]
pub struct MultiHasher {
    size: u64,
    md5: Md5,
    sha1: Sha1,
    sha256: Sha256,
}

impl MultiHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the hasher with more data
    pub fn update(&mut self, data: &[u8]) {
        self.size += data.len() as u64;
        self.md5.update(data);
        self.sha1.update(data);
        self.sha256.update(data);
    }

    /// Finalize and return the checksums
    pub fn finalize(self) -> ChecksumFile {
        ChecksumFile {
            size: self.size,
            md5: Some(format!("{:x}", self.md5.finalize())),
            sha1: Some(format!("{:x}", self.sha1.finalize())),
            sha256: Some(format!("{:x}", self.sha256.finalize())),
        }
    }
}

/// Compute checksums of data from a reader
pub fn hash_reader<R: Read>(reader: &mut R) -> io::Result<ChecksumFile> {
    let mut hasher = MultiHasher::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_digests() {
        let sums = ChecksumFile::compute(b"");
        assert_eq!(sums.size, 0);
        assert_eq!(sums.md5.as_deref(), Some("d41d8cd98f00b204e9800998ecf8427e"));
        assert_eq!(
            sums.sha1.as_deref(),
            Some("da39a3ee5e6b4b0d3255bfef95601890afd80709")
        );
        assert_eq!(
            sums.sha256.as_deref(),
            Some("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
    }

    #[test]
    fn test_hex_lengths_match_inference() {
        for algo in HashAlgorithm::ALL {
            let digest = hash_bytes(algo, b"Hello, World!");
            assert_eq!(digest.len(), algo.hex_len());
            assert_eq!(HashAlgorithm::from_hex_len(digest.len()), Some(algo));
        }
        assert_eq!(HashAlgorithm::from_hex_len(12), None);
    }

    #[test]
    fn test_labels() {
        assert_eq!(HashAlgorithm::Md5.release_label(), "MD5Sum");
        assert_eq!(HashAlgorithm::Sha1.release_label(), "SHA1");
        assert_eq!(HashAlgorithm::Sha256.release_label(), "SHA256");
        assert_eq!(HashAlgorithm::Md5.control_field(), "MD5sum");
    }

    #[test]
    fn test_multi_hasher_incremental() {
        let mut hasher = MultiHasher::new();
        hasher.update(b"Hello, ");
        hasher.update(b"World!");
        assert_eq!(hasher.finalize(), ChecksumFile::compute(b"Hello, World!"));
    }

    #[test]
    fn test_hash_reader() {
        let data = b"Hello, World!";
        let mut cursor = std::io::Cursor::new(data);
        let sums = hash_reader(&mut cursor).unwrap();
        assert_eq!(sums, ChecksumFile::compute(data));
        assert_eq!(
            sums.sha256.as_deref(),
            Some("dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f")
        );
    }

    #[test]
    fn test_partial_digests() {
        let mut sums = ChecksumFile {
            size: 10,
            ..Default::default()
        };
        sums.set_digest(HashAlgorithm::Sha1, "abc");
        let present: Vec<_> = sums.digests().collect();
        assert_eq!(present, vec![(HashAlgorithm::Sha1, "abc")]);
        assert_eq!(sums.digest(HashAlgorithm::Md5), None);
    }
}
