//! Decoding of raw inotify records
//!
//! A read from an inotify descriptor returns a packed sequence of records:
//!
//! ```text
//! wd: i32 | mask: u32 | cookie: u32 | len: u32 | name: [u8; len]
//! ```
//!
//! All integers are native-endian and `name` is NUL-padded. A read can end
//! in the middle of a record, so the buffer keeps the unconsumed tail and
//! the next read appends to it.

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use thiserror::Error;

/// Size of the fixed record header
pub const HEADER_LEN: usize = 16;

/// Longest file name the kernel reports
pub const NAME_MAX: usize = 255;

/// Largest name field the kernel emits (NUL included, already aligned)
const MAX_NAME_FIELD: usize = NAME_MAX + 1;

/// Largest possible record
pub const MAX_RECORD_LEN: usize = HEADER_LEN + MAX_NAME_FIELD;

/// Event mask bits, from `<sys/inotify.h>`
pub mod mask {
    pub const MODIFY: u32 = 0x0000_0002;
    pub const MOVED_FROM: u32 = 0x0000_0040;
    pub const MOVED_TO: u32 = 0x0000_0080;
    pub const CREATE: u32 = 0x0000_0100;
    pub const DELETE: u32 = 0x0000_0200;
    pub const Q_OVERFLOW: u32 = 0x0000_4000;
    pub const IGNORED: u32 = 0x0000_8000;
    pub const ONLYDIR: u32 = 0x0100_0000;
    pub const ISDIR: u32 = 0x4000_0000;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("record declares a {len} byte name, the limit is {}", MAX_NAME_FIELD)]
    NameTooLong { len: usize },
}

/// One decoded kernel record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub wd: i32,
    pub mask: u32,
    pub cookie: u32,
    /// Entry name relative to the watched dir, empty for events on the dir itself
    pub name: OsString,
}

impl RawRecord {
    pub fn has(&self, bits: u32) -> bool {
        self.mask & bits != 0
    }
}

/// Decode the record at the start of `buf`
///
/// Returns the number of bytes consumed together with the record, or
/// `None` when `buf` holds only part of a record.
pub fn decode_record(buf: &[u8]) -> Result<Option<(usize, RawRecord)>, DecodeError> {
    if buf.len() < HEADER_LEN {
        return Ok(None);
    }

    let wd = i32::from_ne_bytes(word(buf, 0));
    let mask = u32::from_ne_bytes(word(buf, 4));
    let cookie = u32::from_ne_bytes(word(buf, 8));
    let len = u32::from_ne_bytes(word(buf, 12)) as usize;

    if len > MAX_NAME_FIELD {
        return Err(DecodeError::NameTooLong { len });
    }

    let total = HEADER_LEN + len;
    if buf.len() < total {
        return Ok(None);
    }

    let field = &buf[HEADER_LEN..total];
    let name_len = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    let name = OsStr::from_bytes(&field[..name_len]).to_os_string();

    Ok(Some((
        total,
        RawRecord {
            wd,
            mask,
            cookie,
            name,
        },
    )))
}

fn word(buf: &[u8], at: usize) -> [u8; 4] {
    let mut out = [0u8; 4];
    out.copy_from_slice(&buf[at..at + 4]);
    out
}

/// Read buffer that carries partial records across reads
pub struct EventBuffer {
    buf: Box<[u8]>,
    filled: usize,
}

impl EventBuffer {
    /// Buffer with room for `records` maximum-size records
    pub fn with_records(records: usize) -> Self {
        Self {
            buf: vec![0u8; MAX_RECORD_LEN * records.max(2)].into_boxed_slice(),
            filled: 0,
        }
    }

    /// Unfilled space to read into
    pub fn spare(&mut self) -> &mut [u8] {
        &mut self.buf[self.filled..]
    }

    /// Mark `n` bytes of the spare space as filled
    pub fn commit(&mut self, n: usize) {
        self.filled = (self.filled + n).min(self.buf.len());
    }

    /// Bytes waiting to be decoded
    pub fn pending(&self) -> usize {
        self.filled
    }

    /// Decode every complete record, keeping a trailing partial one
    pub fn drain(&mut self) -> Result<Vec<RawRecord>, DecodeError> {
        let mut records = Vec::new();
        let mut offset = 0;
        while let Some((used, record)) = decode_record(&self.buf[offset..self.filled])? {
            offset += used;
            records.push(record);
        }

        self.buf.copy_within(offset..self.filled, 0);
        self.filled -= offset;
        Ok(records)
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::with_records(10)
    }
}
