//! One installed add-on, identified by its directory path.
//!
//! An [`Entry`] is a value: two entries are equal (and hash equal) exactly
//! when their raw path bytes are equal.  Display metadata comes from the
//! entry's `config.ini`, which is parsed at most once per entry and then
//! queried by pure accessors.  Metadata failures degrade to sentinels; only
//! [`Entry::category_type`] can fail, because a wrong group would corrupt the
//! order file.

pub mod descriptor;

use std::cell::OnceCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::group::GroupKind;
pub use descriptor::{Descriptor, DescriptorReadError};

/// Returned for a text field when the descriptor, its section or the key is absent.
pub const UNDEFINED: &str = "<UNDEFINED>";
/// Returned for a text field when the descriptor exists but cannot be parsed.
pub const INI_ERROR: &str = "ERROR";
/// Returned by [`Entry::version`] when no usable version is present.
pub const UNKNOWN_VERSION: f64 = -1.0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    #[error("unknown entry type {code:?} for {path}")]
    UnknownEntryType { path: PathBuf, code: String },
}

#[derive(Clone)]
pub struct Entry {
    value:      Vec<u8>,
    /// Group the entry was decoded from, when known.
    group:      Option<GroupKind>,
    descriptor: OnceCell<Descriptor>,
}

impl Entry {
    pub fn new(value: Vec<u8>) -> Self {
        Self { value, group: None, descriptor: OnceCell::new() }
    }

    pub fn in_group(value: Vec<u8>, group: GroupKind) -> Self {
        Self { value, group: Some(group), descriptor: OnceCell::new() }
    }

    pub fn from_path(path: &Path) -> Self {
        Self::new(path.to_string_lossy().into_owned().into_bytes())
    }

    /// Attach an already-parsed descriptor instead of reading `config.ini`.
    pub fn with_descriptor(self, descriptor: Descriptor) -> Self {
        Self { descriptor: OnceCell::from(descriptor), ..self }
    }

    /// Raw path bytes exactly as stored in the order file.
    pub fn value(&self) -> &[u8] { &self.value }

    pub fn directory(&self) -> PathBuf {
        PathBuf::from(String::from_utf8_lossy(&self.value).into_owned())
    }

    /// Final path component (the workshop item id).
    pub fn id(&self) -> String {
        self.directory()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn descriptor(&self) -> &Descriptor {
        self.descriptor.get_or_init(|| Descriptor::load(&self.directory()))
    }

    fn text_field(&self, key: &str) -> String {
        match self.descriptor().property(key) {
            Ok(v) => v.to_owned(),
            Err(DescriptorReadError::Malformed { .. }) => INI_ERROR.to_owned(),
            Err(_) => UNDEFINED.to_owned(),
        }
    }

    pub fn name(&self) -> String { self.text_field("name") }

    pub fn author(&self) -> String { self.text_field("author") }

    pub fn version(&self) -> f64 {
        self.descriptor().float("version").unwrap_or(UNKNOWN_VERSION)
    }

    /// The group this entry belongs in: the group it was decoded from, or the
    /// descriptor's numeric `type` field.
    pub fn category_type(&self) -> Result<GroupKind, EntryError> {
        if let Some(group) = self.group {
            return Ok(group);
        }
        let code = match self.descriptor().property("type") {
            Ok(v) => v.to_owned(),
            Err(DescriptorReadError::Malformed { .. }) => INI_ERROR.to_owned(),
            Err(_) => UNDEFINED.to_owned(),
        };
        GroupKind::from_type_code(&code).ok_or_else(|| EntryError::UnknownEntryType {
            path: self.directory(),
            code,
        })
    }

    /// Preview image path, or `None` when the entry type is unknown.
    pub fn image_path(&self) -> Option<PathBuf> {
        self.category_type()
            .ok()
            .map(|kind| self.directory().join(kind.image_file()))
    }

    /// Human-readable key used by the sort file: `<"name" id by "author">`.
    pub fn repr(&self) -> String {
        format!("<{:?} {} by {:?}>", self.name(), self.id(), self.author())
    }

    /// Upper-cased display name; the sort key for alphabetical ordering.
    pub fn sort_name(&self) -> String {
        self.name().to_uppercase()
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool { self.value == other.value }
}

impl Eq for Entry {}

impl Hash for Entry {
    fn hash<H: Hasher>(&self, state: &mut H) { self.value.hash(state) }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entry({})", String::from_utf8_lossy(&self.value))
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}
