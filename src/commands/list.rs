// src/commands/list.rs
//! Package listing command

use anyhow::Result;
use aptsync::{Config, Manifest, ObjectStore, PackageRecord, Release};

/// Print every package of the configured component
pub fn cmd_list(store: &dyn ObjectStore, config: &Config, arch: Option<&str>) -> Result<()> {
    for record in collect(store, config, arch)? {
        println!(
            "{:<30} {:<20} {}",
            record.name(),
            record.full_version(),
            record.architecture()
        );
    }
    Ok(())
}

fn collect(
    store: &dyn ObjectStore,
    config: &Config,
    arch: Option<&str>,
) -> Result<Vec<PackageRecord>> {
    let repo = &config.repository;
    let architectures = match arch {
        Some(arch) => vec![arch.to_string()],
        None => Release::retrieve(store, &repo.codename, config.release_options())?.architectures,
    };

    let mut records = Vec::new();
    for arch in &architectures {
        let manifest = Manifest::retrieve(
            store,
            &repo.codename,
            &repo.component,
            arch,
            config.manifest_options(true),
        )?;
        records.extend(manifest.packages().iter().cloned());
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aptsync::{MemoryStore, SilentProgress};

    #[test]
    fn test_collect_by_architecture() {
        let store = MemoryStore::new();
        let mut release = Release::new("stable");
        for (arch, name) in [("amd64", "a"), ("arm64", "b")] {
            let mut manifest = Manifest::new("stable", "main", arch);
            let record = PackageRecord::from_control(&format!(
                "Package: {name}\nVersion: 1.0\nArchitecture: {arch}\n"
            ))
            .unwrap();
            manifest.add(record, false, false).unwrap();
            manifest.publish(&store, &SilentProgress::new()).unwrap();
            release.update_manifest(&manifest);
        }
        release.publish(&store, None, false, &SilentProgress::new()).unwrap();

        let config = Config::default();
        let all: Vec<_> = collect(&store, &config, None)
            .unwrap()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(all, vec!["a", "b"]);

        let arm: Vec<_> = collect(&store, &config, Some("arm64")).unwrap();
        assert_eq!(arm.len(), 1);
        assert_eq!(arm[0].name(), "b");

        assert!(collect(&store, &config, Some("s390x")).unwrap().is_empty());
    }
}
