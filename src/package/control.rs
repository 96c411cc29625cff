// src/package/control.rs

//! Debian control stanza parsing and rendering
//!
//! A stanza is an ordered list of `Field: value` entries. Values may span
//! several lines: continuation lines begin with a space or a tab and are
//! kept verbatim, so a parsed stanza renders back to the same text.

use crate::error::{Error, Result};
use std::fmt;

/// One paragraph of a Debian control file or Packages index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlStanza {
    fields: Vec<(String, String)>,
}

impl ControlStanza {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a single stanza
    ///
    /// Leading and trailing blank lines are ignored. A blank line inside the
    /// text means the caller passed more than one stanza and is rejected.
    pub fn parse(text: &str) -> Result<Self> {
        let mut fields: Vec<(String, String)> = Vec::new();
        let body = text.trim_matches(|c| c == '\n' || c == '\r');

        for (lineno, raw) in body.lines().enumerate() {
            let line = raw.trim_end_matches('\r');

            if line.trim().is_empty() {
                return Err(Error::ParseError(format!(
                    "unexpected blank line {} inside control stanza",
                    lineno + 1
                )));
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                let Some((_, value)) = fields.last_mut() else {
                    return Err(Error::ParseError(format!(
                        "continuation line {} before any field",
                        lineno + 1
                    )));
                };
                value.push('\n');
                value.push_str(line);
                continue;
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(Error::ParseError(format!(
                    "line {} is not a 'Field: value' pair: {:?}",
                    lineno + 1,
                    line
                )));
            };

            let name = name.trim();
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(Error::ParseError(format!(
                    "invalid field name on line {}: {:?}",
                    lineno + 1,
                    name
                )));
            }

            fields.push((name.to_string(), value.trim().to_string()));
        }

        if fields.is_empty() {
            return Err(Error::ParseError("empty control stanza".to_string()));
        }

        Ok(Self { fields })
    }

    /// Look up a field value (field names are case-insensitive)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace a field in place, or append it when absent
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// Render the stanza; every line, including the last, ends in `\n`
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ControlStanza {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.fields {
            if value.is_empty() || value.starts_with('\n') {
                writeln!(f, "{}:{}", name, value)?;
            } else {
                writeln!(f, "{}: {}", name, value)?;
            }
        }
        Ok(())
    }
}
