//! World archive (`.wad`) decoding.
//!
//! The archive starts with a long run of tables the viewer has no use for
//! (color lookup tables, language strings, sound headers and so on). They
//! are consumed only to keep the cursor in step with the format. What is
//! kept: the bitmap catalog, exported texture page names, texture
//! definitions, the model catalog and the packed data blob those tables
//! point into.

use std::collections::HashMap;
use std::path::Path;

use image::RgbaImage;

use crate::error::{DecodeError, DecodeResult, InvalidFormat, ReferenceKind};
use crate::packed::{PackedData, Palette};
use crate::reader::ByteReader;
use crate::texture_def::{TextureDef, TextureDefFormat};

/// The only archive version this decoder understands.
pub const ARCHIVE_VERSION: u32 = 1;

/// Combined size of the distance and blend color lookup tables.
pub const COLOR_LUT_SIZE: usize = 256 * 64 * 16 + 256 * 256 * 16;

const NUM_LANGUAGES: usize = 7;
const LANGUAGE_HEADER_SIZE: usize = 12;
const NAME_SIZE: usize = 16;

/// Location and size of one bitmap inside the packed data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitmapInfo {
    pub offset: u32,
    pub width: u16,
    pub height: u16,
}

/// Offsets of a model's data tables inside the packed data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelInfo {
    pub offset_data: u32,
    pub offset_params: u32,
}

/// A decoded world archive. Read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct Archive {
    /// Palette index of the scene clear color.
    pub background_color_index: u8,
    pub bitmaps: Vec<BitmapInfo>,
    /// Exported texture page names, mapped to bitmap indices.
    pub texture_pages: HashMap<String, u32>,
    pub texture_defs: Vec<TextureDef>,
    pub models: HashMap<String, ModelInfo>,
    pub packed_data: PackedData,
}

impl Archive {
    /// Read and decode an archive file.
    pub fn open(path: impl AsRef<Path>) -> DecodeResult<Self> {
        let path = path.as_ref();
        tracing::debug!("Reading archive {}", path.display());
        Self::decode(&std::fs::read(path)?)
    }

    /// Decode an archive from memory.
    pub fn decode(data: &[u8]) -> DecodeResult<Self> {
        let mut r = ByteReader::new(data);

        r.skip(COLOR_LUT_SIZE)?;

        let info = r.read_u32()?;
        let version = info >> 24;
        let packed_size = (info & 0x00FF_FFFF) as usize;

        if version != ARCHIVE_VERSION {
            return Err(DecodeError::UnsupportedVersion {
                found: version,
                expected: ARCHIVE_VERSION,
            });
        }

        let background_color_index = r.read_u32()? as u8;

        // Depth range, unused.
        r.skip(8)?;

        r.skip_counted(1)?;
        r.skip_counted(1)?;

        skip_language_tables(&mut r)?;

        r.skip_counted(1)?;
        r.skip_counted(1)?;
        r.skip(4)?;
        r.skip_counted(4)?;

        let bitmaps = read_bitmap_catalog(&mut r)?;
        let texture_pages = read_texture_pages(&mut r)?;

        let num_texture_defs = r.read_u32()?;
        let texture_defs =
            TextureDef::read_table(&mut r, num_texture_defs, TextureDefFormat::Standard)?;

        r.skip_counted(28)?;

        let models = read_model_catalog(&mut r)?;

        skip_trailing_tables(&mut r)?;

        let packed_data = PackedData::new(r.read_bytes(packed_size)?);

        tracing::info!(
            "Loaded archive: {} bitmaps, {} texture pages, {} texture defs, {} models, {} bytes packed data",
            bitmaps.len(),
            texture_pages.len(),
            texture_defs.len(),
            models.len(),
            packed_data.len()
        );

        Ok(Self {
            background_color_index,
            bitmaps,
            texture_pages,
            texture_defs,
            models,
            packed_data,
        })
    }

    /// Decode the palette stored at the start of the packed data.
    pub fn palette(&self) -> DecodeResult<Palette> {
        self.packed_data.palette()
    }

    /// Opaque RGBA color for a palette index.
    pub fn lookup_color(&self, index: u8) -> DecodeResult<[u8; 4]> {
        let raw = self.packed_data.view(usize::from(index) * 4, 4)?;
        Ok([raw[0], raw[1], raw[2], 255])
    }

    /// The scene clear color.
    pub fn background_color(&self) -> DecodeResult<[u8; 4]> {
        self.lookup_color(self.background_color_index)
    }

    /// A texture definition whose page refers to an existing bitmap.
    ///
    /// Definitions pointing at a missing bitmap are unusable and resolve to
    /// an [`DecodeError::UnresolvedReference`].
    pub fn texture_def(&self, index: u32) -> DecodeResult<&TextureDef> {
        let def = self
            .texture_defs
            .get(index as usize)
            .ok_or(DecodeError::unresolved(ReferenceKind::TextureDef, index))?;

        if usize::from(def.bitmap_index) >= self.bitmaps.len() {
            return Err(DecodeError::unresolved(
                ReferenceKind::Bitmap,
                def.bitmap_index,
            ));
        }

        Ok(def)
    }

    /// Palette-indexed pixels of a bitmap, row-major.
    pub fn bitmap_pixels(&self, index: u32) -> DecodeResult<&[u8]> {
        let info = self
            .bitmaps
            .get(index as usize)
            .ok_or(DecodeError::unresolved(ReferenceKind::Bitmap, index))?;

        self.packed_data.view(
            info.offset as usize,
            usize::from(info.width) * usize::from(info.height),
        )
    }

    /// Expand a bitmap to RGBA using the archive palette.
    pub fn bitmap_image(&self, index: u32) -> DecodeResult<RgbaImage> {
        let palette = self.palette()?;
        let pixels = self.bitmap_pixels(index)?;
        let info = self.bitmaps[index as usize];

        let rgba = pixels.iter().flat_map(|&p| palette.color(p)).collect();

        // The buffer length always matches the dimensions.
        RgbaImage::from_raw(u32::from(info.width), u32::from(info.height), rgba)
            .ok_or(DecodeError::unresolved(ReferenceKind::Bitmap, index))
    }
}

fn skip_language_tables(r: &mut ByteReader<'_>) -> DecodeResult<()> {
    let mut total_entries = 0usize;

    for _ in 0..NUM_LANGUAGES {
        let header = r.read_bytes(LANGUAGE_HEADER_SIZE)?;
        total_entries += usize::from(u16::from_le_bytes([header[2], header[3]]));
    }

    r.skip(total_entries * 2)
}

fn read_bitmap_catalog(r: &mut ByteReader<'_>) -> DecodeResult<Vec<BitmapInfo>> {
    let count = r.read_u32()?;
    tracing::debug!("Reading {count} bitmap headers");

    (0..count)
        .map(|_| {
            let offset = r.read_u32()?;
            r.skip(4)?;
            Ok(BitmapInfo {
                offset,
                width: r.read_u16()?,
                height: r.read_u16()?,
            })
        })
        .collect()
}

fn read_texture_pages(r: &mut ByteReader<'_>) -> DecodeResult<HashMap<String, u32>> {
    let count = r.read_u32()?;
    let mut pages = HashMap::with_capacity(count.min(1024) as usize);

    for _ in 0..count {
        let index = r.read_u32()?;
        let name = r.read_fixed_string(NAME_SIZE)?;
        pages.insert(name, index);
    }

    Ok(pages)
}

fn read_model_catalog(r: &mut ByteReader<'_>) -> DecodeResult<HashMap<String, ModelInfo>> {
    let count = r.read_u32()?;

    let names = (0..count)
        .map(|_| r.read_fixed_string(NAME_SIZE))
        .collect::<DecodeResult<Vec<_>>>()?;

    let mut models = HashMap::with_capacity(names.len());

    for name in names {
        let offset_data = r.read_u32()?;
        r.skip(8)?;
        let offset_params = r.read_u32()?;
        r.skip(20)?;

        models.insert(
            name,
            ModelInfo {
                offset_data,
                offset_params,
            },
        );
    }

    Ok(models)
}

fn skip_trailing_tables(r: &mut ByteReader<'_>) -> DecodeResult<()> {
    // Sound names and headers share one count.
    r.skip_counted(16 + 116)?;

    // Palette table
    r.skip(5 * 4)?;

    // Named textures
    r.skip_counted(24)?;

    let num_debug_names = r.read_u32()?;
    r.skip_records(num_debug_names, 16)?;

    let count = r.read_u32()?;
    let rest = num_debug_names
        .checked_sub(count)
        .ok_or(InvalidFormat::DebugTableCount {
            count,
            total: num_debug_names,
        })?;
    r.skip_records(rest, 4)?;
    r.skip(8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ArchiveBuilder, page_pixels};
    use proptest::prelude::*;

    #[test]
    fn minimal_archive_round_trip() {
        let builder = ArchiveBuilder::new()
            .background(7)
            .page("SKY", page_pixels(3))
            .texture_def(ArchiveBuilder::def(0, [(0, 0), (63, 0), (63, 63), (0, 63)], true));
        let bytes = builder.build();

        let archive = Archive::decode(&bytes).unwrap();

        assert_eq!(archive.background_color_index, 7);
        assert_eq!(archive.bitmaps.len(), 1);
        assert_eq!(archive.bitmaps[0].offset, builder.bitmap_offset(0));
        assert_eq!(archive.bitmaps[0].width, 256);
        assert_eq!(archive.bitmaps[0].height, 256);
        assert_eq!(archive.texture_pages.get("SKY"), Some(&0));
        assert_eq!(archive.texture_defs.len(), 1);
        assert_eq!(archive.texture_defs[0].uvs[2].u, 63);
        assert_eq!(archive.texture_defs[0].uvs[3].v, 63);
        assert!(archive.texture_defs[0].is_masked);
        assert!(archive.models.is_empty());
    }

    #[test]
    fn model_catalog_zips_names_and_offsets() {
        let bytes = ArchiveBuilder::new()
            .page("P0", page_pixels(1))
            .raw_model("UFO", 0x100, 0x200)
            .raw_model("COW", 0x300, 0x400)
            .build();

        let archive = Archive::decode(&bytes).unwrap();

        assert_eq!(
            archive.models["UFO"],
            ModelInfo {
                offset_data: 0x100,
                offset_params: 0x200
            }
        );
        assert_eq!(archive.models["COW"].offset_params, 0x400);
    }

    #[test]
    fn wrong_version_is_rejected() {
        let bytes = ArchiveBuilder::new().version(2).build();
        assert!(matches!(
            Archive::decode(&bytes),
            Err(DecodeError::UnsupportedVersion {
                found: 2,
                expected: 1
            })
        ));
    }

    #[test]
    fn truncated_packed_data_is_rejected() {
        let mut bytes = ArchiveBuilder::new().page("P0", page_pixels(1)).build();
        bytes.truncate(bytes.len() - 1);
        assert!(matches!(
            Archive::decode(&bytes),
            Err(DecodeError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn background_color_is_opaque() {
        let bytes = ArchiveBuilder::new().background(0).build();
        let archive = Archive::decode(&bytes).unwrap();
        assert_eq!(archive.background_color().unwrap()[3], 255);
        assert_eq!(archive.palette().unwrap().color(0)[3], 0);
    }

    #[test]
    fn bitmap_image_expands_palette() {
        let bytes = ArchiveBuilder::new().page("P0", page_pixels(5)).build();
        let archive = Archive::decode(&bytes).unwrap();

        let image = archive.bitmap_image(0).unwrap();
        assert_eq!(image.dimensions(), (256, 256));
        assert_eq!(image.get_pixel(0, 0).0, archive.palette().unwrap().color(5));
        assert!(archive.bitmap_image(1).is_err());
    }

    #[test]
    fn texture_def_with_missing_page_is_unusable() {
        let bytes = ArchiveBuilder::new()
            .page("P0", page_pixels(1))
            .texture_def(ArchiveBuilder::def(0, [(0, 0); 4], false))
            .texture_def(ArchiveBuilder::def(9, [(0, 0); 4], false))
            .build();
        let archive = Archive::decode(&bytes).unwrap();

        assert!(archive.texture_def(0).is_ok());
        assert!(archive.texture_def(1).unwrap_err().is_recoverable());
        assert!(archive.texture_def(2).unwrap_err().is_recoverable());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn header_shorter_than_lut_is_truncated(len in 0usize..(COLOR_LUT_SIZE + 4)) {
            let data = vec![0u8; len];
            let truncated = matches!(
                Archive::decode(&data),
                Err(DecodeError::TruncatedInput { .. })
            );
            prop_assert!(truncated);
        }

        #[test]
        fn any_prefix_of_valid_archive_is_truncated(cut in 1usize..2048) {
            let bytes = ArchiveBuilder::new()
                .page("P0", page_pixels(1))
                .texture_def(ArchiveBuilder::def(0, [(0, 0); 4], false))
                .raw_model("UFO", 0, 0)
                .build();
            let len = bytes.len().saturating_sub(cut * 37);
            let truncated = matches!(
                Archive::decode(&bytes[..len]),
                Err(DecodeError::TruncatedInput { .. })
            );
            prop_assert!(truncated);
        }
    }
}
