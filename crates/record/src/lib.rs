//! # Record - BitcaskDB on-disk record codec
//!
//! Serializes and deserializes the fixed record format every data file is
//! made of. Records are only ever **appended**; readers locate them by byte
//! offset and replay files front to back.
//!
//! ## Binary Record Format
//!
//! ```text
//! [crc: u32 LE][del_flag: u32 LE][time_sec: u32 LE][time_nsec: u32 LE]
//! [version: u64 LE][key_size: u32 LE][value_size: u32 LE][key][value]
//! ```
//!
//! The header is a fixed 32 bytes (six `u32` fields plus one `u64`).
//! `del_flag` is `1` for a live record and `2` for a tombstone. `crc` is a
//! CRC32 over the **value bytes only**; the header fields are instead
//! bounds-checked during decode before any payload allocation.
//!
//! ## Limits
//!
//! Keys are capped at 1024 bytes and the combined key + value payload at
//! 10 MiB. Both limits are enforced on encode (before any bytes are
//! produced) and again on decode (before any buffer is allocated, so a
//! corrupt header cannot trigger a huge allocation).
//!
//! ## End-of-file semantics
//!
//! [`read_record`] distinguishes a *clean* end of file from a torn record:
//! a zero-byte read at the header boundary yields `Ok(None)` ("no more
//! records"), while any other short read (a partial header or a payload
//! shorter than the header promised) is [`RecordError::Truncated`]. A
//! record cut short by a crash mid-append therefore surfaces as an error,
//! never as silent data loss.
//!
//! ## Example
//!
//! ```rust,no_run
//! use record::{read_record, write_record, DelFlag, Record};
//!
//! let rec = Record {
//!     del_flag: DelFlag::Live,
//!     time_sec: 1700000000,
//!     time_nsec: 42,
//!     version: 1,
//!     key: b"hello".to_vec(),
//!     value: b"world".to_vec(),
//! };
//! let mut file = std::fs::File::options()
//!     .create(true)
//!     .append(true)
//!     .read(true)
//!     .open("data.00000000000000001")
//!     .unwrap();
//! let pos = write_record(&mut file, &rec).unwrap();
//! assert_eq!(pos, 0);
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

use thiserror::Error;

/// Size of the fixed record header in bytes.
pub const HEADER_SIZE: usize = 32;

/// Maximum key length in bytes.
pub const MAX_KEY_SIZE: usize = 1024;

/// Maximum combined key + value payload per record (10 MiB).
pub const MAX_RECORD_SIZE: usize = 10 * 1024 * 1024;

/// Errors that can occur while encoding, decoding, or transferring records.
#[derive(Debug, Error)]
pub enum RecordError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A record failed CRC validation or carried an impossible header.
    #[error("corrupt record: {0}")]
    Corrupt(&'static str),

    /// A record cut short: a partial header or a payload shorter than the
    /// header promised. Distinct from the clean end-of-file case.
    #[error("truncated record at end of input")]
    Truncated,

    /// The key exceeds [`MAX_KEY_SIZE`].
    #[error("key too large: {len} bytes (max {max})")]
    KeyTooLarge { len: usize, max: usize },

    /// The combined key + value payload exceeds [`MAX_RECORD_SIZE`].
    #[error("record too large: {len} bytes (max {max})")]
    RecordTooLarge { len: usize, max: usize },
}

/// Liveness marker stored in every record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DelFlag {
    /// The record carries a live value for its key.
    Live = 1,
    /// The record marks its key deleted; the value bytes are empty.
    Tombstone = 2,
}

impl DelFlag {
    /// Returns the on-disk `u32` encoding of the flag.
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Parses the on-disk encoding; `None` for anything but `1` or `2`.
    #[must_use]
    pub fn from_u32(v: u32) -> Option<DelFlag> {
        match v {
            1 => Some(DelFlag::Live),
            2 => Some(DelFlag::Tombstone),
            _ => None,
        }
    }

    /// `true` for [`DelFlag::Live`].
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, DelFlag::Live)
    }
}

/// The fixed 32-byte header preceding every record payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub crc: u32,
    pub del_flag: u32,
    pub time_sec: u32,
    pub time_nsec: u32,
    pub version: u64,
    pub key_size: u32,
    pub value_size: u32,
}

impl RecordHeader {
    /// Writes the header fields in wire order.
    pub fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.crc)?;
        w.write_u32::<LittleEndian>(self.del_flag)?;
        w.write_u32::<LittleEndian>(self.time_sec)?;
        w.write_u32::<LittleEndian>(self.time_nsec)?;
        w.write_u64::<LittleEndian>(self.version)?;
        w.write_u32::<LittleEndian>(self.key_size)?;
        w.write_u32::<LittleEndian>(self.value_size)?;
        Ok(())
    }

    /// Parses a header from exactly [`HEADER_SIZE`] bytes.
    pub fn decode(buf: &[u8; HEADER_SIZE]) -> io::Result<RecordHeader> {
        let mut r = &buf[..];
        Ok(RecordHeader {
            crc: r.read_u32::<LittleEndian>()?,
            del_flag: r.read_u32::<LittleEndian>()?,
            time_sec: r.read_u32::<LittleEndian>()?,
            time_nsec: r.read_u32::<LittleEndian>()?,
            version: r.read_u64::<LittleEndian>()?,
            key_size: r.read_u32::<LittleEndian>()?,
            value_size: r.read_u32::<LittleEndian>()?,
        })
    }
}

/// A single decoded record: header metadata plus owned key and value bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub del_flag: DelFlag,
    pub time_sec: u32,
    pub time_nsec: u32,
    pub version: u64,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Record {
    /// CRC32 over the value bytes (the checksum stored in the header).
    #[must_use]
    pub fn crc(&self) -> u32 {
        value_crc(&self.value)
    }

    /// The header this record serializes with.
    #[must_use]
    pub fn header(&self) -> RecordHeader {
        RecordHeader {
            crc: self.crc(),
            del_flag: self.del_flag.as_u32(),
            time_sec: self.time_sec,
            time_nsec: self.time_nsec,
            version: self.version,
            key_size: self.key.len() as u32,
            value_size: self.value.len() as u32,
        }
    }

    /// Total encoded size in bytes: header plus key plus value.
    ///
    /// Replay advances the file offset by exactly this amount per record.
    #[must_use]
    pub fn encoded_len(&self) -> u64 {
        (HEADER_SIZE + self.key.len() + self.value.len()) as u64
    }

    /// Serializes the record into a fresh buffer.
    ///
    /// # Errors
    ///
    /// [`RecordError::KeyTooLarge`] / [`RecordError::RecordTooLarge`] if the
    /// limits are exceeded; nothing is produced in that case.
    pub fn encode(&self) -> Result<Vec<u8>, RecordError> {
        if self.key.len() > MAX_KEY_SIZE {
            return Err(RecordError::KeyTooLarge {
                len: self.key.len(),
                max: MAX_KEY_SIZE,
            });
        }
        let payload = self.key.len() + self.value.len();
        if payload > MAX_RECORD_SIZE {
            return Err(RecordError::RecordTooLarge {
                len: payload,
                max: MAX_RECORD_SIZE,
            });
        }

        let mut buf = Vec::with_capacity(HEADER_SIZE + payload);
        self.header().encode(&mut buf)?;
        buf.extend_from_slice(&self.key);
        buf.extend_from_slice(&self.value);
        Ok(buf)
    }

    /// Deserializes one record from a byte slice.
    ///
    /// # Errors
    ///
    /// [`RecordError::Truncated`] if the slice ends mid-record, otherwise
    /// the same errors as [`read_record`].
    pub fn decode(buf: &[u8]) -> Result<Record, RecordError> {
        let mut r = buf;
        read_record(&mut r)?.ok_or(RecordError::Truncated)
    }
}

/// CRC32 over a byte slice, as stored in record headers.
#[must_use]
pub fn value_crc(value: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(value);
    hasher.finalize()
}

/// Reads the next record from `r`, or `Ok(None)` at a clean end of file.
///
/// # Termination
///
/// - **Clean EOF** (zero bytes read at the header boundary) -> `Ok(None)`.
/// - **Partial header or short payload** -> [`RecordError::Truncated`].
/// - **Unknown `del_flag` or out-of-range sizes** -> [`RecordError::Corrupt`]
///   (checked before the payload buffer is allocated).
/// - **CRC mismatch over the value bytes** -> [`RecordError::Corrupt`].
/// - **I/O error** -> [`RecordError::Io`].
pub fn read_record<R: Read>(r: &mut R) -> Result<Option<Record>, RecordError> {
    // Fill the header by hand so that "zero bytes at the boundary" and
    // "partial header" stay distinguishable.
    let mut header_buf = [0u8; HEADER_SIZE];
    let mut filled = 0usize;
    while filled < HEADER_SIZE {
        let n = r.read(&mut header_buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    if filled == 0 {
        return Ok(None);
    }
    if filled < HEADER_SIZE {
        return Err(RecordError::Truncated);
    }

    let header = RecordHeader::decode(&header_buf)?;
    let del_flag =
        DelFlag::from_u32(header.del_flag).ok_or(RecordError::Corrupt("unknown del_flag"))?;

    let key_size = header.key_size as usize;
    let value_size = header.value_size as usize;
    if key_size > MAX_KEY_SIZE {
        return Err(RecordError::Corrupt("key_size exceeds maximum"));
    }
    if key_size + value_size > MAX_RECORD_SIZE {
        return Err(RecordError::Corrupt("payload size exceeds maximum"));
    }

    let mut payload = vec![0u8; key_size + value_size];
    match r.read_exact(&mut payload) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(RecordError::Truncated);
        }
        Err(e) => return Err(RecordError::Io(e)),
    }

    let value = payload.split_off(key_size);
    let key = payload;

    if value_crc(&value) != header.crc {
        return Err(RecordError::Corrupt("value crc mismatch"));
    }

    Ok(Some(Record {
        del_flag,
        time_sec: header.time_sec,
        time_nsec: header.time_nsec,
        version: header.version,
        key,
        value,
    }))
}

/// Appends `record` to `file`, returning the offset it was written at.
///
/// The offset equals the file's size immediately before the append, so an
/// index entry built from the return value points at the record's first
/// header byte. The write is followed by flush + fsync; when this returns
/// `Ok`, the record is durable.
pub fn write_record(file: &mut File, record: &Record) -> Result<u64, RecordError> {
    let buf = record.encode()?;
    let pos = file.seek(SeekFrom::End(0))?;
    file.write_all(&buf)?;
    file.flush()?;
    file.sync_all()?;
    Ok(pos)
}

#[cfg(test)]
mod tests;
