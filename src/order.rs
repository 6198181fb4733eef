//! `order.roa`: the ordered list of installed entries.
//!
//! # Layout
//! Four groups back-to-back, in [`GroupKind::ALL`] order:
//!
//! ```text
//! "order.roa"          9 bytes, no terminator
//! 0x00 0x01            group marker
//! u16 expected_count   little-endian, advisory only
//! 0x00 0x00            padding
//! path\0 path\0 ...    entries
//! ```
//!
//! The decoder scans terminated tokens; a token equal to the magic opens a
//! new group.  The declared count is only compared against what was actually
//! read, and a mismatch is reported as a [`CountMismatch`] rather than an error.
//!
//! Every load re-encodes the decoded file and requires the result to match
//! the disk bytes exactly.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::entry::Entry;
use crate::group::{GroupKind, Groups};
use crate::primitive::{BinReader, BinWriter, PrimitiveError};

pub const MAGIC:        &[u8; 9] = b"order.roa";
pub const GROUP_MARKER: [u8; 2]  = [0x00, 0x01];
pub const GROUP_COUNT:  usize    = GroupKind::ALL.len();

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum OrderError {
    #[error("bad magic at byte offset 0: expected {expected}, found {found}")]
    BadMagic { expected: String, found: String },
    #[error("expected at least 4 groups but found {found}")]
    TooFewGroups { found: usize },
    #[error("re-encoded order file differs from its source at byte offset {offset}")]
    IntegrityMismatch { offset: usize },
    #[error(transparent)]
    Primitive(#[from] PrimitiveError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A group whose declared count disagreed with its actual contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountMismatch {
    /// Byte offset of the group's magic token.
    pub offset:   usize,
    pub expected: u16,
    pub actual:   usize,
}

// ── OrderFile ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct OrderFile {
    groups:   Groups,
    on_disk:  Groups,
    warnings: Vec<CountMismatch>,
}

/// Group being accumulated during the scan.
struct OpenGroup {
    offset:   usize,
    expected: u16,
    items:    Vec<Vec<u8>>,
}

impl OpenGroup {
    fn close(self, warnings: &mut Vec<CountMismatch>) -> Vec<Vec<u8>> {
        if self.items.len() != self.expected as usize {
            warn!(
                "order group at offset {}: expected {} entries but got {}",
                self.offset, self.expected, self.items.len()
            );
            warnings.push(CountMismatch {
                offset:   self.offset,
                expected: self.expected,
                actual:   self.items.len(),
            });
        }
        self.items
    }
}

impl OrderFile {
    pub fn new(groups: Groups) -> Self {
        Self { on_disk: groups.clone(), groups, warnings: Vec::new() }
    }

    pub fn has_magic(data: &[u8]) -> bool {
        data.starts_with(MAGIC)
    }

    pub fn decode(data: &[u8]) -> Result<Self, OrderError> {
        if !Self::has_magic(data) {
            let head = &data[..data.len().min(MAGIC.len())];
            return Err(OrderError::BadMagic {
                expected: hex::encode(MAGIC),
                found:    hex::encode(head),
            });
        }

        let mut reader   = BinReader::new(data);
        let mut warnings = Vec::new();
        let mut closed: Vec<Vec<Vec<u8>>> = Vec::new();
        // Implicit group before the first header; dropped below when empty.
        let mut current = OpenGroup { offset: 0, expected: 0, items: Vec::new() };

        while reader.remaining() > 1 {
            let offset = reader.position();
            let token  = reader.read_cstring()?;

            if token == MAGIC {
                closed.push(current.close(&mut warnings));
                reader.expect_raw(&GROUP_MARKER)?;
                let expected = reader.read_u16le()?;
                reader.read_null(2)?;
                current = OpenGroup { offset, expected, items: Vec::new() };
            } else {
                current.items.push(token.to_vec());
                reader.read_null(1)?;
            }
        }
        closed.push(current.close(&mut warnings));

        if closed.first().is_some_and(Vec::is_empty) {
            closed.remove(0);
        }
        if closed.len() < GROUP_COUNT {
            return Err(OrderError::TooFewGroups { found: closed.len() });
        }
        if closed.len() > GROUP_COUNT {
            warn!("order file has {} groups; ignoring all past the first {}", closed.len(), GROUP_COUNT);
        }

        let mut groups = Groups::default();
        for (kind, items) in GroupKind::ALL.into_iter().zip(closed) {
            groups[kind] = items.into_iter().map(|v| Entry::in_group(v, kind)).collect();
        }
        debug!("decoded order file: {} entries", groups.total_len());

        Ok(Self { on_disk: groups.clone(), groups, warnings })
    }

    pub fn encode(&self) -> Result<Vec<u8>, OrderError> {
        let mut writer = BinWriter::new();
        for (_, entries) in self.groups.iter() {
            writer.write_raw(MAGIC);
            writer.write_raw(&GROUP_MARKER);
            writer.write_cstring_list(entries.iter().map(Entry::value))?;
        }
        Ok(writer.into_bytes())
    }

    /// Read and decode `path`, then verify the byte-exact round trip.
    pub fn load(path: &Path) -> Result<Self, OrderError> {
        let data = fs::read(path)?;
        let file = Self::decode(&data)?;
        let encoded = file.encode()?;
        if let Some(offset) = first_difference(&data, &encoded) {
            return Err(OrderError::IntegrityMismatch { offset });
        }
        Ok(file)
    }

    /// Overwrite `path` with the current state and mark it clean.
    pub fn save(&mut self, path: &Path) -> Result<(), OrderError> {
        let encoded = self.encode()?;
        info!("writing {}", path.display());
        fs::write(path, &encoded)?;
        self.mark_clean();
        Ok(())
    }

    pub fn groups(&self) -> &Groups { &self.groups }

    pub fn group(&self, kind: GroupKind) -> &[Entry] { &self.groups[kind] }

    pub fn group_mut(&mut self, kind: GroupKind) -> &mut Vec<Entry> { &mut self.groups[kind] }

    pub fn set_group(&mut self, kind: GroupKind, entries: Vec<Entry>) {
        self.groups[kind] = entries;
    }

    pub fn characters(&self) -> &[Entry] { self.group(GroupKind::Characters) }

    /// Count mismatches seen by the last decode.
    pub fn warnings(&self) -> &[CountMismatch] { &self.warnings }

    /// True when the groups differ from the last loaded or saved state.
    pub fn is_dirty(&self) -> bool { self.groups != self.on_disk }

    pub fn mark_clean(&mut self) {
        self.on_disk = self.groups.clone();
    }
}

/// Offset of the first differing byte, or `None` when `a == b`.
pub(crate) fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    if a == b {
        return None;
    }
    Some(a.iter().zip(b).position(|(x, y)| x != y).unwrap_or(a.len().min(b.len())))
}
