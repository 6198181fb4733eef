//! Per-entry `config.ini` descriptor.
//!
//! The descriptor is owned by the game, not by us: it is read once, never
//! written, and a broken descriptor must never fail a container load.  Every
//! lookup therefore returns a [`DescriptorReadError`] that the [`Entry`]
//! accessors turn into a sentinel value.
//!
//! [`Entry`]: crate::entry::Entry

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ini::{Ini, ParseOption};
use thiserror::Error;
use tracing::{debug, warn};

pub const DESCRIPTOR_FILE: &str = "config.ini";
pub const GENERAL_SECTION: &str = "general";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorReadError {
    #[error("descriptor not found: {0}")]
    NotFound(PathBuf),
    #[error("descriptor {path} could not be parsed: {reason}")]
    Malformed { path: PathBuf, reason: String },
    #[error("descriptor has no [general] section")]
    MissingSection,
    #[error("descriptor has no `{0}` key")]
    MissingKey(String),
    #[error("descriptor key `{key}` is not a number: {value:?}")]
    InvalidNumber { key: String, value: String },
}

/// Parsed `[general]` section, or the reason it is unavailable.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    general: Result<HashMap<String, String>, DescriptorReadError>,
}

impl Descriptor {
    /// Read `<dir>/config.ini`.  Never fails; problems are kept for the accessors.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(DESCRIPTOR_FILE);
        let general = read_general(&path);
        if let Err(e) = &general {
            warn!("{e}");
        }
        Descriptor { general }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let general = pairs
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_lowercase(), v.into()))
            .collect();
        Descriptor { general: Ok(general) }
    }

    /// Raw value with surrounding quotes removed.
    pub fn property(&self, key: &str) -> Result<&str, DescriptorReadError> {
        let general = self.general.as_ref().map_err(Clone::clone)?;
        general
            .get(&key.to_lowercase())
            .map(|v| unquote(v))
            .ok_or_else(|| DescriptorReadError::MissingKey(key.to_owned()))
    }

    pub fn float(&self, key: &str) -> Result<f64, DescriptorReadError> {
        let raw = self.property(key)?;
        raw.trim().parse::<f64>().map_err(|_| DescriptorReadError::InvalidNumber {
            key:   key.to_owned(),
            value: raw.to_owned(),
        })
    }
}

fn read_general(path: &Path) -> Result<HashMap<String, String>, DescriptorReadError> {
    if !path.is_file() {
        return Err(DescriptorReadError::NotFound(path.to_owned()));
    }

    // Values are taken verbatim: quotes are stripped by `unquote`, and
    // backslashes in Windows paths are not escapes.
    let opt = ParseOption {
        enabled_quote:  false,
        enabled_escape: false,
        ..ParseOption::default()
    };
    let ini = Ini::load_from_file_opt(path, opt).map_err(|e| DescriptorReadError::Malformed {
        path:   path.to_owned(),
        reason: e.to_string(),
    })?;

    let (_, props) = ini
        .iter()
        .find(|(name, _)| name.is_some_and(|n| n.eq_ignore_ascii_case(GENERAL_SECTION)))
        .ok_or(DescriptorReadError::MissingSection)?;

    debug!("read descriptor {}", path.display());
    Ok(props.iter().map(|(k, v)| (k.to_lowercase(), v.to_owned())).collect())
}

/// Strip one pair of matching surrounding quotes, if present.
pub fn unquote(raw: &str) -> &str {
    let raw = raw.trim();
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &raw[1..raw.len() - 1];
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn unquote_only_strips_matching_pairs() {
        assert_eq!(unquote("\"Kragg\""), "Kragg");
        assert_eq!(unquote("'Kragg'"), "Kragg");
        assert_eq!(unquote("Kragg"), "Kragg");
        assert_eq!(unquote("\"Kragg"), "\"Kragg");
        assert_eq!(unquote("\""), "\"");
    }

    #[test]
    fn reads_general_section() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(DESCRIPTOR_FILE),
            "[general]\nName=\"Sandbert\"\nauthor=\"Dan\"\nversion=\"1.5\"\ntype=\"0\"\n",
        )
        .unwrap();

        let d = Descriptor::load(dir.path());
        assert_eq!(d.property("name").unwrap(), "Sandbert");
        assert_eq!(d.property("AUTHOR").unwrap(), "Dan");
        assert_eq!(d.float("version").unwrap(), 1.5);
        assert_eq!(d.property("type").unwrap(), "0");
    }

    #[test]
    fn missing_file_and_section() {
        let dir = tempfile::tempdir().unwrap();
        let d = Descriptor::load(dir.path());
        assert!(matches!(d.property("name"), Err(DescriptorReadError::NotFound(_))));

        fs::write(dir.path().join(DESCRIPTOR_FILE), "[other]\nname=x\n").unwrap();
        let d = Descriptor::load(dir.path());
        assert_eq!(d.property("name"), Err(DescriptorReadError::MissingSection));
    }

    #[test]
    fn non_numeric_version() {
        let d = Descriptor::from_pairs([("version", "\"beta\"")]);
        assert!(matches!(d.float("version"), Err(DescriptorReadError::InvalidNumber { .. })));
        assert_eq!(d.property("author"), Err(DescriptorReadError::MissingKey("author".into())));
    }
}
