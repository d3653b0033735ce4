//! Texture definition records shared by archives and maps.

use crate::error::DecodeResult;
use crate::reader::ByteReader;

/// Size of a texture definition record without the origin pair.
pub const TEXTURE_DEF_SIZE: usize = 16;

/// Texel coordinate within a 256×256 texture page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UvPair {
    pub u: u8,
    pub v: u8,
}

/// Which flavor of texture definition record a table holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextureDefFormat {
    /// Plain 16-byte record.
    #[default]
    Standard,
    /// Record followed by a signed billboard pivot.
    WithOrigin,
}

/// A textured area on one bitmap page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureDef {
    /// Corners in top-left, top-right, bottom-right, bottom-left order.
    pub uvs: [UvPair; 4],
    pub bitmap_index: u16,
    /// Faces using this texture need alpha-tested rendering.
    pub is_masked: bool,
    /// Billboard pivot in fine units. Zero for [`TextureDefFormat::Standard`].
    pub origin: (i16, i16),
}

impl TextureDef {
    /// Decode one record.
    ///
    /// Layout: `uv0, page:u16, uv1, pad:2, uv2, pad:2, uv3, flags:u16`,
    /// optionally followed by `origin_x:i16, origin_y:i16`.
    pub fn read(reader: &mut ByteReader<'_>, format: TextureDefFormat) -> DecodeResult<Self> {
        let mut def = Self::default();

        def.uvs[0] = read_uv(reader)?;
        def.bitmap_index = reader.read_u16()?;
        def.uvs[1] = read_uv(reader)?;
        reader.skip(2)?;
        def.uvs[2] = read_uv(reader)?;
        reader.skip(2)?;
        def.uvs[3] = read_uv(reader)?;

        let flags = reader.read_u16()?;
        def.is_masked = flags & 1 != 0;

        if format == TextureDefFormat::WithOrigin {
            def.origin = (reader.read_i16()?, reader.read_i16()?);
        }

        Ok(def)
    }

    /// Read a table of `count` records.
    pub fn read_table(
        reader: &mut ByteReader<'_>,
        count: u32,
        format: TextureDefFormat,
    ) -> DecodeResult<Vec<Self>> {
        (0..count).map(|_| Self::read(reader, format)).collect()
    }

    /// Width and height of the area covered, in texels.
    #[must_use]
    pub fn texel_extent(&self) -> (u8, u8) {
        (
            self.uvs[2].u.abs_diff(self.uvs[0].u),
            self.uvs[2].v.abs_diff(self.uvs[0].v),
        )
    }
}

fn read_uv(reader: &mut ByteReader<'_>) -> DecodeResult<UvPair> {
    Ok(UvPair {
        u: reader.read_u8()?,
        v: reader.read_u8()?,
    })
}
