// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Little-endian CDR cursors for the graph messages.
//!
//! Offsets (and therefore alignment) are relative to the first byte after
//! the encapsulation header.

use crate::error::{Error, Result};

macro_rules! impl_read_le {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> Result<$type> {
            let bytes = self.read_bytes($size)?;
            let mut raw = [0u8; $size];
            raw.copy_from_slice(bytes);
            Ok(<$type>::from_le_bytes(raw))
        }
    };
}

fn failed(offset: usize, reason: &str) -> Error {
    Error::Serialization {
        offset,
        reason: reason.into(),
    }
}

/// Growable writer; the buffer is reserved fallibly.
pub struct CdrWriter {
    buffer: Vec<u8>,
    base: usize,
}

impl CdrWriter {
    /// Start a body after `header`.
    pub fn with_header(header: &[u8], capacity_hint: usize) -> Result<Self> {
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(header.len() + capacity_hint)?;
        buffer.extend_from_slice(header);
        Ok(Self {
            buffer,
            base: header.len(),
        })
    }

    pub fn offset(&self) -> usize {
        self.buffer.len() - self.base
    }

    pub fn align(&mut self, alignment: usize) -> Result<()> {
        if alignment <= 1 {
            return Ok(());
        }
        let pad = (alignment - self.offset() % alignment) % alignment;
        self.buffer.try_reserve(pad)?;
        self.buffer.resize(self.buffer.len() + pad, 0);
        Ok(())
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.buffer.try_reserve(data.len())?;
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    pub fn write_u32_le(&mut self, value: u32) -> Result<()> {
        self.align(4)?;
        self.write_bytes(&value.to_le_bytes())
    }

    /// Sequence or string length prefix.
    pub fn write_len(&mut self, len: usize) -> Result<()> {
        let len = u32::try_from(len).map_err(|_| failed(self.offset(), "length exceeds u32"))?;
        self.write_u32_le(len)
    }

    /// CDR string: u32 length (terminator included), bytes, NUL.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        if value.as_bytes().contains(&0) {
            return Err(failed(self.offset(), "string contains NUL"));
        }
        self.write_len(value.len() + 1)?;
        self.write_bytes(value.as_bytes())?;
        self.write_bytes(&[0])
    }

    pub fn finish(self) -> Vec<u8> {
        self.buffer
    }
}

/// Bounds-checked reader over a message body.
pub struct CdrReader<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> CdrReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    pub fn align(&mut self, alignment: usize) -> Result<()> {
        if alignment <= 1 {
            return Ok(());
        }
        let aligned = self.offset.div_ceil(alignment) * alignment;
        if aligned > self.buffer.len() {
            return Err(failed(self.offset, "unexpected end of buffer"));
        }
        self.offset = aligned;
        Ok(())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.buffer.len())
            .ok_or_else(|| failed(self.offset, "unexpected end of buffer"))?;
        let slice = &self.buffer[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    impl_read_le!(read_u32_raw, u32, 4);

    pub fn read_u32_le(&mut self) -> Result<u32> {
        self.align(4)?;
        self.read_u32_raw()
    }

    /// Sequence length, rejected early if the body cannot hold
    /// `len * min_element_size` more bytes.
    pub fn read_len(&mut self, min_element_size: usize) -> Result<usize> {
        let at = self.offset;
        let len = self.read_u32_le()? as usize;
        if len.saturating_mul(min_element_size) > self.remaining() {
            return Err(failed(at, "sequence length exceeds buffer"));
        }
        Ok(len)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let at = self.offset;
        let len = self.read_len(1)?;
        if len == 0 {
            return Err(failed(at, "string length must include terminator"));
        }
        let raw = self.read_bytes(len)?;
        let (body, nul) = raw.split_at(len - 1);
        if nul != [0] {
            return Err(failed(at, "string is not NUL terminated"));
        }
        String::from_utf8(body.to_vec()).map_err(|_| failed(at, "string is not valid UTF-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_aligns_relative_to_body() {
        let mut w = CdrWriter::with_header(&[0, 1, 0, 0], 16).expect("writer");
        w.write_bytes(&[0xAA]).expect("byte");
        w.write_u32_le(0x0102_0304).expect("u32");
        assert_eq!(w.offset(), 8);
        assert_eq!(
            w.finish(),
            vec![0, 1, 0, 0, 0xAA, 0, 0, 0, 0x04, 0x03, 0x02, 0x01]
        );
    }

    #[test]
    fn string_layout_includes_terminator() {
        let mut w = CdrWriter::with_header(&[], 0).expect("writer");
        w.write_string("ab").expect("string");
        assert_eq!(w.finish(), vec![3, 0, 0, 0, b'a', b'b', 0]);
    }

    #[test]
    fn reader_reports_offset_on_truncation() {
        let body = [3u8, 0, 0, 0, b'a'];
        let mut r = CdrReader::new(&body);
        match r.read_string() {
            Err(Error::Serialization { offset, .. }) => assert_eq!(offset, 0),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn reader_rejects_oversized_sequence_length() {
        let body = [0xFFu8, 0xFF, 0xFF, 0x7F];
        let mut r = CdrReader::new(&body);
        assert!(matches!(
            r.read_len(16),
            Err(Error::Serialization { offset: 0, .. })
        ));
    }

    #[test]
    fn reader_rejects_missing_terminator() {
        let body = [2u8, 0, 0, 0, b'a', b'b'];
        let mut r = CdrReader::new(&body);
        assert!(r.read_string().is_err());
    }
}
