// src/cli/mod.rs
//! CLI definitions for aptsync
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aptsync")]
#[command(version)]
#[command(about = "Publish APT repositories to S3-compatible object storage", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./aptsync.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Repository selection shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct RepoArgs {
    /// Codename of the distribution (overrides repository.codename)
    #[arg(short, long)]
    pub codename: Option<String>,

    /// Component of the distribution (overrides repository.component)
    #[arg(short = 'm', long)]
    pub component: Option<String>,
}

/// Release signing flags
#[derive(Args, Debug, Clone, Default)]
pub struct SignArgs {
    /// Sign the Release with this GPG key; without a value the default key
    /// is used
    #[arg(long, value_name = "KEY", num_args = 0..=1, default_missing_value = "")]
    pub sign: Option<String>,

    /// Publish a clearsigned InRelease instead of Release + Release.gpg
    #[arg(long)]
    pub inrelease: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload .deb packages and republish the indexes
    Upload {
        /// Package files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        repo: RepoArgs,

        #[command(flatten)]
        signing: SignArgs,

        /// Publish under this architecture instead of the package's own
        #[arg(short, long)]
        arch: Option<String>,

        /// Keep other versions of the same package in the index
        #[arg(short, long)]
        preserve_versions: bool,

        /// Refuse to replace a published version or package file
        #[arg(long)]
        fail_if_exists: bool,

        /// Only regenerate the indexes, do not upload package files
        #[arg(long)]
        skip_package_upload: bool,
    },

    /// Remove a package from an index
    Delete {
        /// Package name
        name: String,

        /// Architecture index to remove the package from
        #[arg(short, long, required = true)]
        arch: String,

        /// Versions to KEEP; every other version of the package is removed.
        /// Without this flag all versions are removed.
        #[arg(long = "versions", value_name = "VERSION", num_args = 1..)]
        versions: Vec<String>,

        #[command(flatten)]
        repo: RepoArgs,

        #[command(flatten)]
        signing: SignArgs,
    },

    /// List packages in the repository
    List {
        /// Only list this architecture
        #[arg(short, long)]
        arch: Option<String>,

        #[command(flatten)]
        repo: RepoArgs,
    },

    /// Check that every indexed package file exists and matches its checksum
    Verify {
        /// Remove broken entries from the indexes and republish
        #[arg(short, long)]
        fix_manifests: bool,

        /// Also verify Release.gpg against this public key
        #[arg(long, value_name = "KEYFILE")]
        keyring: Option<PathBuf>,

        #[command(flatten)]
        repo: RepoArgs,

        #[command(flatten)]
        signing: SignArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_upload() {
        let cli = Cli::try_parse_from([
            "aptsync",
            "upload",
            "a.deb",
            "b.deb",
            "-c",
            "bookworm",
            "--sign",
            "--preserve-versions",
        ])
        .unwrap();
        match cli.command {
            Commands::Upload {
                files,
                repo,
                signing,
                preserve_versions,
                ..
            } => {
                assert_eq!(files.len(), 2);
                assert_eq!(repo.codename.as_deref(), Some("bookworm"));
                assert_eq!(signing.sign.as_deref(), Some(""));
                assert!(preserve_versions);
            }
            _ => panic!("expected upload"),
        }
    }

    #[test]
    fn test_parse_delete_versions() {
        let cli = Cli::try_parse_from([
            "aptsync", "delete", "tool", "--arch", "amd64", "--versions", "1.2.0", "1.3.0",
        ])
        .unwrap();
        match cli.command {
            Commands::Delete { name, arch, versions, .. } => {
                assert_eq!(name, "tool");
                assert_eq!(arch, "amd64");
                assert_eq!(versions, vec!["1.2.0", "1.3.0"]);
            }
            _ => panic!("expected delete"),
        }
    }

    #[test]
    fn test_delete_requires_arch() {
        assert!(Cli::try_parse_from(["aptsync", "delete", "tool"]).is_err());
    }
}
