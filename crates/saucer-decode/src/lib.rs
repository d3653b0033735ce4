//! Decode Attack of the Saucerman world archives and level maps.
//!
//! This crate provides pure synchronous decoders for the game's world
//! archive (`.wad`) and map (`SUCK`) files, plus the texture atlas builder
//! and model decoder that work on a loaded archive. The caller decides when
//! and on which thread decoding happens.
//!
//! # Design principles
//!
//! - **Synchronous**: No async, no threading primitives
//! - **All or nothing**: A failed archive or map decode returns no value
//! - **Per-row recovery**: Rows with unresolved references are dropped and
//!   logged instead of failing the load
//!
//! # Key functions
//!
//! - [`Archive::decode`]: Parse a world archive
//! - [`Map::decode`]: Parse a map against its archive
//! - [`Archive::build_texture_atlas`]: Combine texture pages into one image
//! - [`Archive::load_model`]: Decode a model from the archive catalog
//! - [`Archive::bitmap_image`]: Expand a bitmap to RGBA

mod error;

pub mod archive;
pub mod atlas;
pub mod map;
pub mod model;
pub mod packed;
pub mod reader;
pub mod texture_def;

#[cfg(test)]
mod test_support;

pub use archive::{Archive, BitmapInfo, ModelInfo};
pub use atlas::TextureAtlas;
pub use error::{DecodeError, DecodeResult, InvalidFormat, ReferenceKind};
pub use map::{
    Billboard, BlockDef, BlockFaces, BlockInstance, ExtraTerrainTile, MAP_SIZE, Map,
    MapDecodeOptions, MapItem, MapVariant, ModelInstance, TerrainGrid, TerrainTile, TextureTable,
    TileFlags,
};
pub use model::{FaceKind, ModelData, ModelFace, VertexView};
pub use packed::{PackedData, Palette};
pub use reader::ByteReader;
pub use texture_def::{TextureDef, TextureDefFormat, UvPair};

/// Width and height of a texture page in pixels.
pub const TEXTURE_PAGE_SIZE: u32 = 256;
