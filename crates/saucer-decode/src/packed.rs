//! The archive's packed data blob and the palette stored at its start.

use crate::error::{DecodeError, DecodeResult};
use crate::reader::ByteReader;

/// Number of palette entries.
pub const PALETTE_SIZE: usize = 256;

/// Immutable blob holding palette, bitmap pixels and model tables.
///
/// Everything inside is addressed by byte offsets taken from the archive
/// header tables. Views are bounds-checked at the point of access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedData(Box<[u8]>);

impl PackedData {
    #[must_use]
    pub fn new(bytes: impl Into<Box<[u8]>>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn view(&self, offset: usize, len: usize) -> DecodeResult<&[u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.0.get(offset..end))
            .ok_or(DecodeError::TruncatedInput {
                offset,
                needed: len,
                available: self.0.len().saturating_sub(offset),
            })
    }

    /// A reader over `len` bytes starting at `offset`.
    pub fn reader_at(&self, offset: usize, len: usize) -> DecodeResult<ByteReader<'_>> {
        self.view(offset, len).map(ByteReader::new)
    }

    /// Decode the 256-entry palette at the start of the blob.
    pub fn palette(&self) -> DecodeResult<Palette> {
        Palette::from_bytes(self.view(0, PALETTE_SIZE * 4)?)
    }
}

/// 256 RGBA colors. Entry 0 is transparent, all others are opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette([[u8; 4]; PALETTE_SIZE]);

impl Palette {
    /// Build a palette from 1024 bytes of `r, g, b, pad` quadruples.
    pub fn from_bytes(bytes: &[u8]) -> DecodeResult<Self> {
        if bytes.len() < PALETTE_SIZE * 4 {
            return Err(DecodeError::TruncatedInput {
                offset: 0,
                needed: PALETTE_SIZE * 4,
                available: bytes.len(),
            });
        }

        let mut colors = [[0; 4]; PALETTE_SIZE];
        for (i, (color, raw)) in colors.iter_mut().zip(bytes.chunks_exact(4)).enumerate() {
            *color = [raw[0], raw[1], raw[2], if i == 0 { 0 } else { 255 }];
        }

        Ok(Self(colors))
    }

    /// Color for a palette index, with the transparency rule applied.
    #[must_use]
    pub fn color(&self, index: u8) -> [u8; 4] {
        self.0[usize::from(index)]
    }

    /// Color for a palette index, always opaque.
    #[must_use]
    pub fn opaque_color(&self, index: u8) -> [u8; 4] {
        let [r, g, b, _] = self.color(index);
        [r, g, b, 255]
    }
}
