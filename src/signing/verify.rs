// src/signing/verify.rs

//! Detached signature verification for published Release files
//!
//! Uses sequoia-openpgp, so checking `Release.gpg` needs no external
//! `gpg` installation.

use crate::error::{Error, Result};
use openpgp::parse::Parse;
use openpgp::policy::StandardPolicy;
use sequoia_openpgp as openpgp;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Verifies detached signatures against one public key
pub struct ReleaseVerifier {
    cert: openpgp::Cert,
    policy: StandardPolicy<'static>,
}

impl ReleaseVerifier {
    /// Load a public key (armored or binary)
    pub fn from_bytes(key_data: &[u8]) -> Result<Self> {
        let cert = openpgp::Cert::from_bytes(key_data)
            .map_err(|e| Error::ParseError(format!("Failed to parse GPG key: {}", e)))?;
        debug!("Loaded GPG key with fingerprint: {}", cert.fingerprint());
        Ok(Self {
            cert,
            policy: StandardPolicy::new(),
        })
    }

    /// Load a public key from a file
    pub fn from_file(key_path: &Path) -> Result<Self> {
        let key_data = fs::read(key_path)
            .map_err(|e| Error::IoError(format!("Failed to read GPG key file: {}", e)))?;
        Self::from_bytes(&key_data)
    }

    /// Fingerprint of the loaded key
    pub fn fingerprint(&self) -> String {
        self.cert.fingerprint().to_string()
    }

    /// Check that `signature` is a valid detached signature over `message`
    pub fn verify_detached(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        let signature_pile = openpgp::PacketPile::from_bytes(signature)
            .map_err(|e| Error::ParseError(format!("Failed to parse signature: {}", e)))?;

        let valid = signature_pile.descendants().any(|packet| match packet {
            openpgp::Packet::Signature(sig) => self
                .cert
                .keys()
                .with_policy(&self.policy, None)
                .filter(|key| key.for_signing())
                .any(|key| sig.verify_message(key.key(), message).is_ok()),
            _ => false,
        });

        if !valid {
            return Err(Error::GpgVerificationFailed(
                "No valid signatures found or verification failed".to_string(),
            ));
        }

        info!("Signature verified with key {}", self.fingerprint());
        Ok(())
    }
}
