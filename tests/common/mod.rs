// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use aptsync::MemoryStore;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Build a `.deb` with the given control fields in `dir`.
///
/// The archive holds `debian-binary`, `control.tar.gz` and an empty
/// `data.tar.gz`, the same layout dpkg-deb produces. Returns the path of
/// the written file, named `<name>_<version>_<arch>.deb`.
pub fn build_deb(dir: &Path, name: &str, version: &str, arch: &str) -> PathBuf {
    let control = format!(
        "Package: {name}\n\
Version: {version}\n\
Architecture: {arch}\n\
Maintainer: Test Maintainer <test@example.org>\n\
Installed-Size: 12\n\
Description: {name} test package\n \
 Second line of the description.\n"
    );

    let control_tar = gzip_tar(&[("./control", control.as_bytes())]);
    let data_tar = gzip_tar(&[]);

    let path = dir.join(format!("{name}_{version}_{arch}.deb"));
    let mut builder = ar::Builder::new(File::create(&path).unwrap());
    for (member, data) in [
        ("debian-binary", &b"2.0\n"[..]),
        ("control.tar.gz", &control_tar[..]),
        ("data.tar.gz", &data_tar[..]),
    ] {
        let header = ar::Header::new(member.as_bytes().to_vec(), data.len() as u64);
        builder.append(&header, data).unwrap();
    }
    path
}

fn gzip_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut tar = tar::Builder::new(Vec::new());
    for (path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        tar.append_data(&mut header, path, *data).unwrap();
    }
    let tar = tar.into_inner().unwrap();

    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    gz.write_all(&tar).unwrap();
    gz.finish().unwrap()
}

/// Read an object as UTF-8 text, panicking when absent.
pub fn read_text(store: &MemoryStore, key: &str) -> String {
    let object = store
        .get(key)
        .unwrap_or_else(|| panic!("{key} was not written"));
    String::from_utf8(object.data).unwrap()
}

/// Position of the first write to `key` in the store's operation log.
pub fn write_position(store: &MemoryStore, key: &str) -> usize {
    store
        .written_keys()
        .iter()
        .position(|k| k == key)
        .unwrap_or_else(|| panic!("{key} was never written"))
}
