// src/package/version.rs

//! Debian package versions
//!
//! Format: `[epoch:]upstream_version[-debian_revision]`. The revision is
//! everything after the *last* hyphen, so upstream versions may contain
//! hyphens themselves.

use crate::error::{Error, Result};
use std::fmt;

/// A parsed Debian version with epoch, upstream version and revision
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DebVersion {
    /// Epoch, kept only when written explicitly (`0:1.0` keeps `Some(0)`)
    pub epoch: Option<u64>,
    pub upstream: String,
    /// Debian revision, sometimes called the iteration
    pub revision: Option<String>,
}

impl DebVersion {
    /// Parse a Debian version string
    ///
    /// Examples:
    /// - "1.2.3" → epoch=None, upstream="1.2.3", revision=None
    /// - "2:1.2.3" → epoch=Some(2), upstream="1.2.3", revision=None
    /// - "1.2.3-4ubuntu1" → epoch=None, upstream="1.2.3", revision=Some("4ubuntu1")
    /// - "1:2.0-rc1-2" → epoch=Some(1), upstream="2.0-rc1", revision=Some("2")
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        let (epoch, rest) = match s.split_once(':') {
            Some((e, r)) => {
                let epoch = e.parse::<u64>().map_err(|err| {
                    Error::ParseError(format!("Invalid epoch in version '{}': {}", s, err))
                })?;
                (Some(epoch), r)
            }
            None => (None, s),
        };

        let (upstream, revision) = match rest.rsplit_once('-') {
            Some((u, r)) if !r.is_empty() => (u, Some(r.to_string())),
            _ => (rest, None),
        };

        if upstream.is_empty() {
            return Err(Error::ParseError(format!(
                "Empty upstream version in '{}'",
                s
            )));
        }

        if upstream.contains(char::is_whitespace) {
            return Err(Error::ParseError(format!(
                "Whitespace in version '{}'",
                s
            )));
        }

        Ok(Self {
            epoch,
            upstream: upstream.to_string(),
            revision,
        })
    }

    /// `upstream-revision`, or just `upstream` without a revision
    pub fn version_iteration(&self) -> String {
        match &self.revision {
            Some(rev) => format!("{}-{}", self.upstream, rev),
            None => self.upstream.clone(),
        }
    }

    /// The complete version string, `[epoch:]upstream[-revision]`
    pub fn full_version(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DebVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(epoch) = self.epoch {
            write!(f, "{}:", epoch)?;
        }
        write!(f, "{}", self.upstream)?;
        if let Some(rev) = &self.revision {
            write!(f, "-{}", rev)?;
        }
        Ok(())
    }
}
