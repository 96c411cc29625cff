// src/package/deb.rs

//! Reading control metadata out of `.deb` archives
//!
//! A `.deb` is an ar archive with three members: `debian-binary`,
//! `control.tar[.gz|.xz|.zst]` and `data.tar[...]`. Only the control
//! member is opened; the package checksums come from hashing the archive
//! file itself.

use super::ControlStanza;
use crate::compression::{self, CompressionFormat};
use crate::error::{Error, Result};
use crate::hash::{self, ChecksumFile};
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path};
use tracing::debug;

/// Extract the control stanza and compute archive checksums
pub(super) fn read_deb(path: &Path) -> Result<(ControlStanza, ChecksumFile)> {
    let text = read_control_text(path)?;
    let control = ControlStanza::parse(&text)?;

    let mut file = File::open(path)
        .map_err(|e| Error::IoError(format!("Failed to open {}: {}", path.display(), e)))?;
    let checksums = hash::hash_reader(&mut file)?;

    debug!(
        "Read {} ({} bytes, sha256 {})",
        path.display(),
        checksums.size,
        checksums.sha256.as_deref().unwrap_or("-")
    );
    Ok((control, checksums))
}

fn read_control_text(path: &Path) -> Result<String> {
    let file = File::open(path)
        .map_err(|e| Error::IoError(format!("Failed to open {}: {}", path.display(), e)))?;
    let mut archive = ar::Archive::new(file);

    while let Some(entry) = archive.next_entry() {
        let mut entry = entry.map_err(|e| {
            Error::ParseError(format!("{} is not a valid deb archive: {}", path.display(), e))
        })?;

        let name = String::from_utf8_lossy(entry.header().identifier()).to_string();
        // GNU ar terminates member names with '/'
        let name = name.trim_end_matches('/');
        if !name.starts_with("control.tar") {
            continue;
        }

        let mut member = Vec::new();
        entry.read_to_end(&mut member).map_err(|e| {
            Error::ParseError(format!("Failed to read {} of {}: {}", name, path.display(), e))
        })?;

        // Trust the content over the member name
        let format = match CompressionFormat::from_magic_bytes(&member) {
            CompressionFormat::None => CompressionFormat::from_extension(name),
            detected => detected,
        };
        debug!("Found {} ({}) in {}", name, format, path.display());
        let tar = compression::decompress(&member, format)?;
        return extract_control_file(tar.as_slice(), path);
    }

    Err(Error::ParseError(format!(
        "{} has no control.tar member",
        path.display()
    )))
}

fn extract_control_file<R: Read>(reader: R, path: &Path) -> Result<String> {
    let mut tar = tar::Archive::new(reader);
    let entries = tar.entries().map_err(|e| {
        Error::ParseError(format!("Failed to read control.tar of {}: {}", path.display(), e))
    })?;

    for entry in entries {
        let mut entry = entry.map_err(|e| {
            Error::ParseError(format!("Corrupt control.tar in {}: {}", path.display(), e))
        })?;

        let is_control = {
            let entry_path = entry.path().map_err(|e| {
                Error::ParseError(format!("Bad entry path in {}: {}", path.display(), e))
            })?;
            let parts: Vec<Component> = entry_path
                .components()
                .filter(|c| !matches!(c, Component::CurDir))
                .collect();
            matches!(parts.as_slice(), [Component::Normal(n)] if *n == "control")
        };

        if is_control {
            let mut text = String::new();
            entry.read_to_string(&mut text).map_err(|e| {
                Error::ParseError(format!(
                    "control file of {} is not UTF-8 text: {}",
                    path.display(),
                    e
                ))
            })?;
            return Ok(text);
        }
    }

    Err(Error::ParseError(format!(
        "control.tar of {} has no control file",
        path.display()
    )))
}
