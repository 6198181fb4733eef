//! `categories.roa`: named boundaries over the `characters` group.
//!
//! # Layout
//! ```text
//! u16 pair_count
//! pair_count × { u16 index, label bytes, 0x00 }
//! ```
//!
//! `index` is the position in the `characters` list where the named segment
//! begins.  The codec does not check ordering or range; that is left to the
//! projection in [`crate::view`].

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::order::first_difference;
use crate::primitive::{BinReader, BinWriter, PrimitiveError};

#[derive(Error, Debug)]
pub enum CategoryError {
    #[error("re-encoded categories file differs from its source at byte offset {offset}")]
    IntegrityMismatch { offset: usize },
    #[error(transparent)]
    Primitive(#[from] PrimitiveError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category {
    pub index: u16,
    pub label: Vec<u8>,
}

impl Category {
    pub fn new(index: u16, label: impl Into<Vec<u8>>) -> Self {
        Self { index, label: label.into() }
    }

    pub fn label_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.label)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoriesFile {
    categories: Vec<Category>,
    on_disk:    Vec<Category>,
}

impl CategoriesFile {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { on_disk: categories.clone(), categories }
    }

    pub fn decode(data: &[u8]) -> Result<Self, CategoryError> {
        let mut reader = BinReader::new(data);
        let count = reader.read_u16le()?;

        let mut categories = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let index = reader.read_u16le()?;
            let label = reader.read_cstring()?.to_vec();
            reader.read_null(1)?;
            categories.push(Category { index, label });
        }
        Ok(Self::new(categories))
    }

    pub fn encode(&self) -> Result<Vec<u8>, CategoryError> {
        let mut writer = BinWriter::new();
        writer.write_count(self.categories.len())?;
        for c in &self.categories {
            writer.write_u16le(c.index);
            writer.write_cstring(&c.label);
        }
        Ok(writer.into_bytes())
    }

    /// Read and decode `path`, then verify the byte-exact round trip.
    pub fn load(path: &Path) -> Result<Self, CategoryError> {
        let data = fs::read(path)?;
        let file = Self::decode(&data)?;
        let encoded = file.encode()?;
        if let Some(offset) = first_difference(&data, &encoded) {
            return Err(CategoryError::IntegrityMismatch { offset });
        }
        Ok(file)
    }

    pub fn save(&mut self, path: &Path) -> Result<(), CategoryError> {
        let encoded = self.encode()?;
        info!("writing {}", path.display());
        fs::write(path, &encoded)?;
        self.mark_clean();
        Ok(())
    }

    pub fn categories(&self) -> &[Category] { &self.categories }

    pub fn replace(&mut self, categories: Vec<Category>) {
        self.categories = categories;
    }

    pub fn is_dirty(&self) -> bool { self.categories != self.on_disk }

    pub fn mark_clean(&mut self) {
        self.on_disk = self.categories.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"\x02\x00\x00\x00Favs\0\x03\x00Other\0";

    #[test]
    fn decodes_pairs() {
        let file = CategoriesFile::decode(SAMPLE).unwrap();
        assert_eq!(
            file.categories(),
            &[Category::new(0, "Favs"), Category::new(3, "Other")]
        );
        assert_eq!(file.encode().unwrap(), SAMPLE);
    }

    #[test]
    fn empty_file_has_zero_pairs() {
        let file = CategoriesFile::decode(b"\x00\x00").unwrap();
        assert!(file.categories().is_empty());
        assert_eq!(file.encode().unwrap(), b"\x00\x00");
    }

    #[test]
    fn truncated_pair() {
        let err = CategoriesFile::decode(b"\x02\x00\x00\x00Favs\0").unwrap_err();
        assert!(matches!(
            err,
            CategoryError::Primitive(PrimitiveError::TruncatedInput { offset: 9, .. })
        ));
    }

    #[test]
    fn missing_terminator() {
        let err = CategoriesFile::decode(b"\x01\x00\x00\x00Favs").unwrap_err();
        assert!(matches!(
            err,
            CategoryError::Primitive(PrimitiveError::UnterminatedString { offset: 4 })
        ));
    }

    #[test]
    fn dirty_after_replace() {
        let mut file = CategoriesFile::decode(SAMPLE).unwrap();
        assert!(!file.is_dirty());
        file.replace(vec![Category::new(0, "Favs")]);
        assert!(file.is_dirty());
        file.mark_clean();
        assert!(!file.is_dirty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.roa");
        let mut file = CategoriesFile::new(vec![Category::new(0, ""), Category::new(7, "Zeta")]);
        file.save(&path).unwrap();
        let back = CategoriesFile::load(&path).unwrap();
        assert_eq!(back.categories(), file.categories());
    }
}
