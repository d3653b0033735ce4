//! Combining texture pages into a single horizontal atlas.

use std::collections::BTreeMap;

use image::RgbaImage;

use crate::archive::Archive;
use crate::error::DecodeResult;
use crate::TEXTURE_PAGE_SIZE;

/// Several texture pages laid out side by side in one image.
///
/// Page `i` of the sorted page set occupies columns
/// `i * 256 .. (i + 1) * 256`; its U offset is `i / page_count`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureAtlas {
    pub image: RgbaImage,
    u_offsets: BTreeMap<u32, f32>,
}

impl TextureAtlas {
    /// Atlas width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Number of pages in the atlas.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.u_offsets.len()
    }

    /// U offset to add to coordinates computed against `page`.
    ///
    /// Returns `None` for pages that are not part of the atlas.
    #[must_use]
    pub fn u_offset(&self, page: u32) -> Option<f32> {
        self.u_offsets.get(&page).copied()
    }

    /// Page indices and their offsets, in layout order.
    pub fn pages(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.u_offsets.iter().map(|(&page, &offset)| (page, offset))
    }
}

impl Archive {
    /// Build an atlas from a set of bitmap page indices.
    ///
    /// Order and duplicates in `pages` do not affect the result. Indices that
    /// do not name a bitmap are left out.
    pub fn build_texture_atlas(
        &self,
        pages: impl IntoIterator<Item = u32>,
    ) -> DecodeResult<TextureAtlas> {
        let mut pages: Vec<u32> = pages.into_iter().collect();
        pages.sort_unstable();
        pages.dedup();
        pages.retain(|&page| {
            let valid = (page as usize) < self.bitmaps.len();
            if !valid {
                tracing::debug!("Skipping atlas page {page}: no such bitmap");
            }
            valid
        });

        let palette = self.palette()?;
        let page_size = TEXTURE_PAGE_SIZE as usize;
        let count = pages.len();

        let mut image = RgbaImage::new(TEXTURE_PAGE_SIZE * count as u32, TEXTURE_PAGE_SIZE);
        let mut u_offsets = BTreeMap::new();

        for (slot, &page) in pages.iter().enumerate() {
            let offset = self.bitmaps[page as usize].offset as usize;
            let pixels = self.packed_data.view(offset, page_size * page_size)?;

            let x0 = (slot * page_size) as u32;
            for (i, &index) in pixels.iter().enumerate() {
                let x = x0 + (i % page_size) as u32;
                let y = (i / page_size) as u32;
                image.put_pixel(x, y, image::Rgba(palette.color(index)));
            }

            u_offsets.insert(page, slot as f32 / count as f32);
        }

        tracing::debug!("Built texture atlas with {count} pages");

        Ok(TextureAtlas { image, u_offsets })
    }
}
