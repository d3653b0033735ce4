//! Little-endian cursor over an in-memory byte buffer.

use crate::error::{DecodeError, DecodeResult};

/// Sequential little-endian reader.
///
/// The reader knows nothing about record layouts; it only decodes integers
/// and fixed-length strings and keeps track of its position. Every read that
/// would run past the end of the buffer fails with
/// [`DecodeError::TruncatedInput`] and leaves the position unchanged.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the buffer.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[must_use]
    pub fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Consume the next `len` bytes and return them as a slice.
    pub fn read_bytes(&mut self, len: usize) -> DecodeResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(DecodeError::TruncatedInput {
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            })?;

        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut out = [0; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn skip(&mut self, len: usize) -> DecodeResult<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Skip `count` records of `record_size` bytes each.
    pub fn skip_records(&mut self, count: u32, record_size: usize) -> DecodeResult<()> {
        let len = (count as usize)
            .checked_mul(record_size)
            .ok_or(DecodeError::TruncatedInput {
                offset: self.pos,
                needed: usize::MAX,
                available: self.remaining(),
            })?;
        self.skip(len)
    }

    /// Read a `u32` record count and skip that many records.
    pub fn skip_counted(&mut self, record_size: usize) -> DecodeResult<u32> {
        let count = self.read_u32()?;
        self.skip_records(count, record_size)?;
        Ok(count)
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> DecodeResult<i8> {
        Ok(i8::from_le_bytes(self.read_array()?))
    }

    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> DecodeResult<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> DecodeResult<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Read a zero-terminated string stored in a field of exactly `len` bytes.
    ///
    /// All `len` bytes are consumed. The text ends at the first zero byte, or
    /// at the end of the field when the terminator is missing. Bytes are
    /// decoded as Latin-1, so distinct names stay distinct.
    pub fn read_fixed_string(&mut self, len: usize) -> DecodeResult<String> {
        let field = self.read_bytes(len)?;
        let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
        Ok(field[..end].iter().map(|&b| char::from(b)).collect())
    }
}
