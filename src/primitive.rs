//! Shared binary primitives for both `.roa` containers.
//!
//! # Layout rules
//! - Integers are unsigned 16-bit, strictly little-endian.
//! - Strings are raw bytes terminated by a single `0x00`.  No encoding is
//!   assumed; labels and paths are carried verbatim.
//! - A string list is `u16 count`, two `0x00` padding bytes, then every item
//!   as a terminated string with no separator.
//!
//! [`BinReader::read_cstring`] stops *on* the terminator without consuming it;
//! the caller decides whether the next byte is a terminator ([`BinReader::read_null`])
//! or the start of a fixed marker ([`BinReader::read_raw`]).

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    #[error("truncated input at byte offset {offset}: needed {needed} byte(s), {available} available")]
    TruncatedInput { offset: usize, needed: usize, available: usize },
    #[error("unterminated string starting at byte offset {offset}")]
    UnterminatedString { offset: usize },
    #[error("malformed input at byte offset {offset}: expected {expected}, found {found}")]
    MalformedInput { offset: usize, expected: String, found: String },
    #[error("count {count} does not fit in a 16-bit field")]
    CountOverflow { count: usize },
}

// ── Reader ───────────────────────────────────────────────────────────────────

/// Cursor over an in-memory container.  The cursor only moves forward.
#[derive(Debug)]
pub struct BinReader<'a> {
    data: &'a [u8],
    pos:  usize,
}

impl<'a> BinReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize { self.pos }

    pub fn remaining(&self) -> usize { self.data.len() - self.pos }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], PrimitiveError> {
        if self.remaining() < needed {
            return Err(PrimitiveError::TruncatedInput {
                offset:    self.pos,
                needed,
                available: self.remaining(),
            });
        }
        let span = &self.data[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(span)
    }

    pub fn read_u16le(&mut self) -> Result<u16, PrimitiveError> {
        self.take(2).map(LittleEndian::read_u16)
    }

    /// Consume `count` bytes that must all be `0x00`.
    pub fn read_null(&mut self, count: usize) -> Result<(), PrimitiveError> {
        let start = self.pos;
        let span = self.take(count)?;
        if let Some(i) = span.iter().position(|&b| b != 0x00) {
            return Err(PrimitiveError::MalformedInput {
                offset:   start + i,
                expected: "null byte".into(),
                found:    format!("{:#04x}", span[i]),
            });
        }
        Ok(())
    }

    pub fn read_raw(&mut self, length: usize) -> Result<&'a [u8], PrimitiveError> {
        self.take(length)
    }

    /// Read a fixed marker and fail unless it matches exactly.
    pub fn expect_raw(&mut self, marker: &[u8]) -> Result<(), PrimitiveError> {
        let start = self.pos;
        let found = self.read_raw(marker.len())?;
        if found != marker {
            return Err(PrimitiveError::MalformedInput {
                offset:   start,
                expected: hex::encode(marker),
                found:    hex::encode(found),
            });
        }
        Ok(())
    }

    /// Bytes up to (not including) the next `0x00`.  The terminator stays unread.
    pub fn read_cstring(&mut self) -> Result<&'a [u8], PrimitiveError> {
        let start = self.pos;
        let len = self.data[start..]
            .iter()
            .position(|&b| b == 0x00)
            .ok_or(PrimitiveError::UnterminatedString { offset: start })?;
        self.pos += len;
        Ok(&self.data[start..start + len])
    }
}

// ── Writer ───────────────────────────────────────────────────────────────────

/// Append-only output accumulator; the mirror of [`BinReader`].
#[derive(Debug, Default)]
pub struct BinWriter {
    buf: Vec<u8>,
}

impl BinWriter {
    pub fn new() -> Self { Self::default() }

    pub fn into_bytes(self) -> Vec<u8> { self.buf }

    pub fn len(&self) -> usize { self.buf.len() }

    pub fn is_empty(&self) -> bool { self.buf.is_empty() }

    pub fn write_u16le(&mut self, v: u16) {
        let mut raw = [0u8; 2];
        LittleEndian::write_u16(&mut raw, v);
        self.buf.extend_from_slice(&raw);
    }

    /// Like [`write_u16le`](Self::write_u16le) for a length that must fit.
    pub fn write_count(&mut self, count: usize) -> Result<(), PrimitiveError> {
        let v = u16::try_from(count).map_err(|_| PrimitiveError::CountOverflow { count })?;
        self.write_u16le(v);
        Ok(())
    }

    pub fn write_null(&mut self) {
        self.buf.push(0x00);
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_cstring(&mut self, s: &[u8]) {
        self.buf.extend_from_slice(s);
        self.write_null();
    }

    /// `u16 count`, two padding nulls, then each item terminated.
    pub fn write_cstring_list<I, S>(&mut self, items: I) -> Result<(), PrimitiveError>
    where
        I: IntoIterator<Item = S>,
        I::IntoIter: ExactSizeIterator,
        S: AsRef<[u8]>,
    {
        let items = items.into_iter();
        self.write_count(items.len())?;
        self.write_null();
        self.write_null();
        for item in items {
            self.write_cstring(item.as_ref());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u16_is_little_endian() {
        let mut r = BinReader::new(&[0x34, 0x12, 0xff]);
        assert_eq!(r.read_u16le().unwrap(), 0x1234);
        assert_eq!(r.position(), 2);
        assert_eq!(
            r.read_u16le(),
            Err(PrimitiveError::TruncatedInput { offset: 2, needed: 2, available: 1 })
        );
    }

    #[test]
    fn cstring_stops_on_terminator() {
        let mut r = BinReader::new(b"abc\0def\0");
        assert_eq!(r.read_cstring().unwrap(), b"abc");
        assert_eq!(r.position(), 3);
        r.read_null(1).unwrap();
        assert_eq!(r.read_cstring().unwrap(), b"def");
    }

    #[test]
    fn unterminated_string_reports_start() {
        let mut r = BinReader::new(b"ab\0xyz");
        r.read_cstring().unwrap();
        r.read_null(1).unwrap();
        assert_eq!(r.read_cstring(), Err(PrimitiveError::UnterminatedString { offset: 3 }));
    }

    #[test]
    fn read_null_rejects_non_zero() {
        let mut r = BinReader::new(&[0x00, 0x07]);
        let err = r.read_null(2).unwrap_err();
        assert!(matches!(err, PrimitiveError::MalformedInput { offset: 1, .. }));
    }

    #[test]
    fn expect_raw_checks_marker() {
        let mut r = BinReader::new(&[0x00, 0x01, 0x00, 0x02]);
        r.expect_raw(&[0x00, 0x01]).unwrap();
        assert!(r.expect_raw(&[0x00, 0x01]).is_err());
    }

    #[test]
    fn cstring_list_layout() {
        let mut w = BinWriter::new();
        w.write_cstring_list([b"a".as_slice(), b"bc".as_slice()]).unwrap();
        assert_eq!(w.into_bytes(), b"\x02\x00\x00\x00a\0bc\0");
    }

    #[test]
    fn count_overflow_is_rejected() {
        let mut w = BinWriter::new();
        assert_eq!(
            w.write_count(70_000),
            Err(PrimitiveError::CountOverflow { count: 70_000 })
        );
        assert!(w.is_empty());
    }
}
