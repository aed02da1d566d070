// SPDX-License-Identifier: Apache-2.0
//! Minimal tagged little-endian TLV encoding.
//!
//! Records are `tag: u32, len: u32, payload` with no alignment. The save
//! identity chunk and AI trace records use this framing; both sides of a
//! record stream must agree on tags out of band.

use thiserror::Error;

/// Errors produced while decoding a TLV stream.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TlvError {
    /// A record header or payload ran past the end of the buffer.
    #[error("truncated TLV record")]
    Truncated,
    /// A fixed-width payload had the wrong length for its reader.
    #[error("TLV payload width mismatch")]
    WidthMismatch,
}

/// Appends TLV records to a byte vector.
#[derive(Debug, Default)]
pub struct TlvWriter {
    buf: Vec<u8>,
}

impl TlvWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a raw-bytes record.
    pub fn add_bytes(&mut self, tag: u32, payload: &[u8]) {
        self.buf.extend_from_slice(&tag.to_le_bytes());
        self.buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(payload);
    }

    /// Appends a u32 record.
    pub fn add_u32(&mut self, tag: u32, value: u32) {
        self.add_bytes(tag, &value.to_le_bytes());
    }

    /// Appends a u64 record.
    pub fn add_u64(&mut self, tag: u32, value: u64) {
        self.add_bytes(tag, &value.to_le_bytes());
    }

    /// Appends a UTF-8 string record (no terminator).
    pub fn add_string(&mut self, tag: u32, value: &str) {
        self.add_bytes(tag, value.as_bytes());
    }

    /// Returns the encoded stream.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the writer, returning the encoded stream.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// One decoded record borrowed from the input stream.
#[derive(Debug, Clone, Copy)]
pub struct TlvRecord<'a> {
    /// Record tag.
    pub tag: u32,
    /// Raw payload bytes.
    pub payload: &'a [u8],
}

impl TlvRecord<'_> {
    /// Reads the payload as a little-endian u32.
    pub fn as_u32(&self) -> Result<u32, TlvError> {
        let arr: [u8; 4] = self
            .payload
            .try_into()
            .map_err(|_| TlvError::WidthMismatch)?;
        Ok(u32::from_le_bytes(arr))
    }

    /// Reads the payload as a little-endian u64.
    pub fn as_u64(&self) -> Result<u64, TlvError> {
        let arr: [u8; 8] = self
            .payload
            .try_into()
            .map_err(|_| TlvError::WidthMismatch)?;
        Ok(u64::from_le_bytes(arr))
    }
}

/// Iterates records off a TLV byte stream.
#[derive(Debug)]
pub struct TlvReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> TlvReader<'a> {
    /// Creates a reader over the full stream.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Returns the next record, `Ok(None)` at a clean end of stream.
    pub fn next_record(&mut self) -> Result<Option<TlvRecord<'a>>, TlvError> {
        if self.offset == self.data.len() {
            return Ok(None);
        }
        if self.data.len() - self.offset < 8 {
            return Err(TlvError::Truncated);
        }
        let tag = u32::from_le_bytes(
            self.data[self.offset..self.offset + 4]
                .try_into()
                .map_err(|_| TlvError::Truncated)?,
        );
        let len = u32::from_le_bytes(
            self.data[self.offset + 4..self.offset + 8]
                .try_into()
                .map_err(|_| TlvError::Truncated)?,
        ) as usize;
        let start = self.offset + 8;
        let end = start.checked_add(len).ok_or(TlvError::Truncated)?;
        if end > self.data.len() {
            return Err(TlvError::Truncated);
        }
        self.offset = end;
        Ok(Some(TlvRecord {
            tag,
            payload: &self.data[start..end],
        }))
    }
}
