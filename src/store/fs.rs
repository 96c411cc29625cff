// src/store/fs.rs

//! Local directory object store
//!
//! Keys map to paths below a root directory. Writes go to a temporary
//! file in the destination directory which is then renamed into place, so
//! a reader never observes a half-written index.

use super::{ExistingObject, ObjectStore, WriteOptions, check_existing};
use crate::error::{Error, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Object store rooted at a local directory
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store rooted at `root`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            Error::IoError(format!("Failed to create store root {}: {}", root.display(), e))
        })?;
        Ok(Self { root })
    }

    /// Resolve a key to a path, rejecting keys that escape the root
    fn key_to_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if key.is_empty() || escapes {
            return Err(Error::StoreError(format!("invalid object key '{}'", key)));
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for FsStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.key_to_path(key)?;
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::StoreError(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn write(&self, key: &str, data: &[u8], options: &WriteOptions<'_>) -> Result<()> {
        let path = self.key_to_path(key)?;

        if options.fail_if_exists {
            let existing = self.read(key)?;
            if check_existing(key, existing.as_deref(), data)? == ExistingObject::Identical {
                debug!("{} already present with identical content", key);
                return Ok(());
            }
        }

        let parent = path
            .parent()
            .ok_or_else(|| Error::StoreError(format!("invalid object key '{}'", key)))?;
        fs::create_dir_all(parent)?;

        // Write content atomically (write to temp, then rename)
        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        temp.write_all(data)?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| {
            Error::StoreError(format!("Failed to move object into {}: {}", path.display(), e))
        })?;

        debug!(
            "Stored {} ({} bytes, {})",
            path.display(),
            data.len(),
            options.content_type
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_to_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::StoreError(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "fs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CONTENT_TYPE_TEXT;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsStore::new(temp_dir.path()).unwrap();
        let opts = WriteOptions::new(CONTENT_TYPE_TEXT);

        store
            .write("dists/stable/main/binary-amd64/Packages", b"Package: a\n", &opts)
            .unwrap();

        let on_disk = temp_dir.path().join("dists/stable/main/binary-amd64/Packages");
        assert_eq!(fs::read(on_disk).unwrap(), b"Package: a\n");
        assert_eq!(
            store.read("dists/stable/main/binary-amd64/Packages").unwrap().unwrap(),
            b"Package: a\n"
        );
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsStore::new(temp_dir.path()).unwrap();
        store
            .write("dists/stable/Release", b"x", &WriteOptions::new(CONTENT_TYPE_TEXT))
            .unwrap();

        let entries: Vec<_> = fs::read_dir(temp_dir.path().join("dists/stable"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("Release")]);
    }

    #[test]
    fn test_missing_object() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsStore::new(temp_dir.path()).unwrap();
        assert_eq!(store.read("dists/none/Release").unwrap(), None);
        store.remove("dists/none/Release.gpg").unwrap();
    }

    #[test]
    fn test_fail_if_exists() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsStore::new(temp_dir.path()).unwrap();
        let opts = WriteOptions::new(CONTENT_TYPE_TEXT).fail_if_exists(true);

        store.write("pool/a.deb", b"one", &opts).unwrap();
        store.write("pool/a.deb", b"one", &opts).unwrap();
        assert!(matches!(
            store.write("pool/a.deb", b"two", &opts),
            Err(Error::ConflictError(_))
        ));
    }

    #[test]
    fn test_rejects_escaping_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsStore::new(temp_dir.path()).unwrap();
        assert!(store.read("../etc/passwd").is_err());
        assert!(store.read("/etc/passwd").is_err());
        assert!(store.read("").is_err());
    }
}
