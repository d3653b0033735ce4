//! Map file (`.map`) decoding.
//!
//! A map references an already decoded [`Archive`]: its texture definitions
//! point at texture pages by the map's own numbering, which is translated
//! to archive bitmap indices while decoding, and its model instances name
//! models from the archive's catalog.

use std::path::Path;

use crate::archive::Archive;
use crate::error::{DecodeError, DecodeResult, InvalidFormat, ReferenceKind};
use crate::reader::ByteReader;
use crate::texture_def::{TextureDef, TextureDefFormat};

/// Width and height of the terrain grid, in cells.
pub const MAP_SIZE: usize = 64;

/// Magic bytes at the start of every map file.
pub const MAP_SIGNATURE: [u8; 4] = *b"SUCK";

/// The only map version this decoder understands.
pub const MAP_VERSION: u32 = 40;

/// Hard upper bound for sentinel-terminated tables.
pub const MAX_TABLE_ENTRIES: usize = 4096;

/// Entries a table may carry beyond the archive records it refers to.
pub const TABLE_SLACK: usize = 64;

/// Position, type flags and tag word shared by every item record.
const ITEM_PREFIX_SIZE: usize = 12;

const TEXTURE_PAGE_NAME_SIZE: usize = 14;
const NAME_SIZE: usize = 16;
const TEXTURE_ANIMATION_SIZE: usize = 40;
const UNKNOWN_RECORD_SIZE: usize = 8;

/// Which record layout variant a map file uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MapVariant {
    /// Tag `0x1000` records are model instances.
    #[default]
    Standard,
    /// Texture definitions carry a pivot and tag `0x1000` records are
    /// billboards referencing a texture definition directly.
    Billboard,
}

/// Options controlling map decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapDecodeOptions {
    pub variant: MapVariant,
}

/// Texture indices for the six faces of a block, one set per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockFaces {
    pub front: u16,
    pub top: u16,
    pub left: u16,
    pub back: u16,
    pub right: u16,
    pub bottom: u16,
}

/// Prototype for a 1×1 cell cuboid, shared by terrain and blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockDef {
    pub textures_inside: BlockFaces,
    pub textures_outside: BlockFaces,
    /// Per-corner height offsets: four bottom corners, then four top corners.
    pub vertex_heights: [i16; 8],
}

impl BlockDef {
    fn read(r: &mut ByteReader<'_>) -> DecodeResult<Self> {
        let textures_inside = BlockFaces {
            front: r.read_u16()?,
            top: r.read_u16()?,
            left: r.read_u16()?,
            back: r.read_u16()?,
            right: r.read_u16()?,
            bottom: r.read_u16()?,
        };
        let textures_outside = BlockFaces {
            back: r.read_u16()?,
            top: r.read_u16()?,
            left: r.read_u16()?,
            front: r.read_u16()?,
            right: r.read_u16()?,
            bottom: r.read_u16()?,
        };

        let mut vertex_heights = [0; 8];
        for height in &mut vertex_heights {
            *height = r.read_i16()?;
        }
        r.skip(20)?;

        Ok(Self {
            textures_inside,
            textures_outside,
            vertex_heights,
        })
    }
}

/// Per-item flag byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileFlags(pub u8);

impl TileFlags {
    /// Quarter turns applied to the prototype, 0-3.
    #[must_use]
    pub fn rotation(self) -> usize {
        usize::from((self.0 & 0x30) >> 4)
    }
}

/// One cell of the fixed terrain grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerrainTile {
    pub block_def_index: u32,
    pub flags: TileFlags,
    pub vertical_offset: i16,
}

/// A terrain patch with its own corner heights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtraTerrainTile {
    pub x: u16,
    pub y: u16,
    pub block_def_index: u32,
    pub flags: TileFlags,
    pub vertex_heights: [i16; 4],
}

/// A cuboid placed from a block prototype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockInstance {
    pub x: u16,
    pub y: u16,
    pub block_def_index: u32,
    pub flags: TileFlags,
    pub vertical_offset: i16,
    /// Fine per-corner adjustments, in units of 4.
    pub vertex_offsets: [i8; 8],
}

/// A placed archive model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelInstance {
    pub x: u16,
    pub y: u16,
    pub model_name: String,
    pub x_offset: u8,
    pub y_offset: u8,
    pub vertical_offset: i16,
    pub rotation_x: u16,
    pub rotation_y: u16,
    pub rotation_z: u16,
    /// 256 = unscaled.
    pub scale: u16,
}

/// A camera-facing sprite using one of the map's texture definitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Billboard {
    pub x: u16,
    pub y: u16,
    pub texture: u32,
    pub x_offset: u8,
    pub y_offset: u8,
    pub vertical_offset: i16,
    pub scale: u16,
}

/// Anything placed on the map apart from the terrain grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapItem {
    ExtraTerrain(ExtraTerrainTile),
    Block(BlockInstance),
    Model(ModelInstance),
    Billboard(Billboard),
}

/// The 64×64 terrain grid, indexed `x + y * MAP_SIZE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainGrid(Box<[TerrainTile]>);

impl Default for TerrainGrid {
    fn default() -> Self {
        Self(vec![TerrainTile::default(); MAP_SIZE * MAP_SIZE].into_boxed_slice())
    }
}

impl TerrainGrid {
    #[must_use]
    pub fn at(&self, x: usize, y: usize) -> &TerrainTile {
        &self.0[x + y * MAP_SIZE]
    }

    pub fn at_mut(&mut self, x: usize, y: usize) -> &mut TerrainTile {
        &mut self.0[x + y * MAP_SIZE]
    }

    /// All cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[TerrainTile] {
        &self.0
    }
}

/// The map's texture definitions, indexed as block definitions expect.
///
/// Definitions that could not be mapped to an archive bitmap are dropped;
/// their slot stays vacant so that later indices keep their meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureTable(Vec<Option<TextureDef>>);

impl TextureTable {
    /// Number of slots, including vacant ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TextureDef> {
        self.0.get(index).and_then(Option::as_ref)
    }

    /// Present definitions, in index order.
    pub fn iter(&self) -> impl Iterator<Item = &TextureDef> {
        self.0.iter().flatten()
    }

    /// Number of definitions that survived remapping.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.iter().count()
    }
}

impl FromIterator<Option<TextureDef>> for TextureTable {
    fn from_iter<I: IntoIterator<Item = Option<TextureDef>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A decoded map. Read-only once loaded; owns all of its data.
#[derive(Debug, Clone, Default)]
pub struct Map {
    pub texture_defs: TextureTable,
    pub block_defs: Vec<BlockDef>,
    pub terrain: TerrainGrid,
    pub items: Vec<MapItem>,
}

/// Record layout selected by the type flags of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemKind {
    TerrainCell,
    ExtraTerrain,
    Block,
    Instance,
    Unmodeled { size: usize },
}

impl ItemKind {
    fn from_tag(tag: u32) -> Option<Self> {
        Some(match tag {
            0x4 => Self::TerrainCell,
            0x8 => Self::ExtraTerrain,
            0x10 => Self::Unmodeled { size: 12 },
            0x20 | 0x100 => Self::Unmodeled { size: 8 },
            0x40 => Self::Block,
            0x200 => Self::Unmodeled { size: 32 },
            0x800 => Self::Unmodeled { size: 24 },
            0x1000 => Self::Instance,
            _ => return None,
        })
    }
}

/// Derive the record type tag from an item's type flags.
#[must_use]
pub fn item_tag(type_flags: u32) -> u32 {
    (type_flags & 0x1BFC_0000) >> 16
}

struct Header {
    num_texture_defs: u32,
    num_block_defs: u32,
    num_unknown: u32,
    num_items: u32,
    num_texture_animations: u32,
}

impl Map {
    /// Read and decode a map file.
    pub fn open(
        path: impl AsRef<Path>,
        archive: &Archive,
        options: &MapDecodeOptions,
    ) -> DecodeResult<Self> {
        let path = path.as_ref();
        tracing::debug!("Reading map {}", path.display());
        Self::decode(&std::fs::read(path)?, archive, options)
    }

    /// Decode a map from memory against the archive it belongs to.
    pub fn decode(
        data: &[u8],
        archive: &Archive,
        options: &MapDecodeOptions,
    ) -> DecodeResult<Self> {
        let mut r = ByteReader::new(data);

        let header = read_header(&mut r)?;

        let page_remap = read_page_remap_table(&mut r, archive)?;

        let block_defs = (0..header.num_block_defs)
            .map(|_| BlockDef::read(&mut r))
            .collect::<DecodeResult<Vec<_>>>()?;

        let def_format = match options.variant {
            MapVariant::Standard => TextureDefFormat::Standard,
            MapVariant::Billboard => TextureDefFormat::WithOrigin,
        };
        let texture_defs = TextureDef::read_table(&mut r, header.num_texture_defs, def_format)?
            .into_iter()
            .enumerate()
            .map(|(i, def)| remap_texture_def(i, def, &page_remap, archive))
            .collect::<TextureTable>();

        r.skip_records(header.num_texture_animations, TEXTURE_ANIMATION_SIZE)?;

        // Strat names
        read_sentinel_table(&mut r, "strat name", MAX_TABLE_ENTRIES, |r, _| {
            r.skip(NAME_SIZE)
        })?;

        let model_names = read_model_name_table(&mut r, archive)?;

        r.skip_records(header.num_unknown, UNKNOWN_RECORD_SIZE)?;

        let mut map = Self {
            texture_defs,
            block_defs,
            terrain: TerrainGrid::default(),
            items: Vec::with_capacity(
                (header.num_items as usize)
                    .saturating_sub(MAP_SIZE * MAP_SIZE)
                    .min(r.remaining() / ITEM_PREFIX_SIZE),
            ),
        };

        let num_terrain_cells = read_items(
            &mut r,
            &header,
            archive,
            &model_names,
            options.variant,
            &mut map,
        )?;

        if num_terrain_cells < MAP_SIZE * MAP_SIZE {
            tracing::warn!(
                "Map has only {num_terrain_cells} terrain cells, remaining cells stay empty"
            );
        }

        tracing::info!(
            "Loaded map: {} of {} texture defs resolved, {} block defs, {} items",
            map.texture_defs.resolved_count(),
            map.texture_defs.len(),
            map.block_defs.len(),
            map.items.len()
        );

        Ok(map)
    }

    #[must_use]
    pub fn terrain_at(&self, x: usize, y: usize) -> &TerrainTile {
        self.terrain.at(x, y)
    }

    /// Distinct model names referenced by model instances, in first-use order.
    #[must_use]
    pub fn model_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for item in &self.items {
            if let MapItem::Model(model) = item {
                if !names.contains(&model.model_name.as_str()) {
                    names.push(&model.model_name);
                }
            }
        }
        names
    }
}

fn read_header(r: &mut ByteReader<'_>) -> DecodeResult<Header> {
    let signature: [u8; 4] = r
        .read_bytes(4)?
        .try_into()
        .map_err(|_| InvalidFormat::Signature([0; 4]))?;
    if signature != MAP_SIGNATURE {
        return Err(InvalidFormat::Signature(signature).into());
    }

    let version = r.read_u32()?;
    if version != MAP_VERSION {
        return Err(InvalidFormat::MapVersion {
            found: version,
            expected: MAP_VERSION,
        }
        .into());
    }

    let header = Header {
        num_texture_defs: r.read_u32()?,
        num_block_defs: r.read_u32()?,
        num_unknown: r.read_u32()?,
        num_items: r.read_u32()?,
        num_texture_animations: r.read_u32()?,
    };
    r.skip(4 + 2 * 2)?;

    Ok(header)
}

/// Walk a table of `{index: i32, payload}` entries ending in index `-1`.
///
/// Running out of input before the terminator also ends the table. More than
/// `max` entries is an error.
fn read_sentinel_table<'a, F>(
    r: &mut ByteReader<'a>,
    table: &'static str,
    max: usize,
    mut read_entry: F,
) -> DecodeResult<()>
where
    F: FnMut(&mut ByteReader<'a>, i32) -> DecodeResult<()>,
{
    for _ in 0..=max {
        if r.at_end() {
            return Ok(());
        }

        let index = r.read_i32()?;
        if index == -1 {
            return Ok(());
        }

        read_entry(r, index)?;
    }

    Err(InvalidFormat::UnterminatedTable { table, max }.into())
}

/// Entry limit for a table indexed by `count` archive records.
fn table_limit(count: usize) -> usize {
    count.saturating_add(TABLE_SLACK).min(MAX_TABLE_ENTRIES)
}

/// Map-side texture page number to archive bitmap index.
fn read_page_remap_table(
    r: &mut ByteReader<'_>,
    archive: &Archive,
) -> DecodeResult<Vec<Option<u32>>> {
    let expected = archive.texture_pages.len();
    let mut remap = vec![None; expected];
    let mut position = 0usize;

    read_sentinel_table(r, "texture page", table_limit(expected), |r, _| {
        let name = r.read_fixed_string(TEXTURE_PAGE_NAME_SIZE)?;

        if let Some(slot) = remap.get_mut(position) {
            *slot = archive.texture_pages.get(&name).copied();
            if slot.is_none() {
                tracing::debug!("Texture page '{name}' is not exported by the archive");
            }
        }

        position += 1;
        Ok(())
    })?;

    if position != expected {
        tracing::warn!(
            "Map imports {position} texture pages, archive exports {expected}; matching by position"
        );
    }

    Ok(remap)
}

fn remap_texture_def(
    index: usize,
    mut def: TextureDef,
    page_remap: &[Option<u32>],
    archive: &Archive,
) -> Option<TextureDef> {
    let resolved = page_remap
        .get(usize::from(def.bitmap_index))
        .copied()
        .flatten()
        .filter(|&bitmap| (bitmap as usize) < archive.bitmaps.len())
        .and_then(|bitmap| u16::try_from(bitmap).ok());

    if let Some(bitmap) = resolved {
        def.bitmap_index = bitmap;
        Some(def)
    } else {
        tracing::debug!(
            "Dropping texture def {index}: {}",
            DecodeError::unresolved(ReferenceKind::TexturePage, def.bitmap_index)
        );
        None
    }
}

fn read_model_name_table(r: &mut ByteReader<'_>, archive: &Archive) -> DecodeResult<Vec<String>> {
    let mut names = vec![String::new(); archive.models.len()];

    let max = table_limit(names.len());
    read_sentinel_table(r, "model name", max, |r, index| {
        let name = r.read_fixed_string(NAME_SIZE)?;

        match usize::try_from(index).ok().and_then(|i| names.get_mut(i)) {
            Some(slot) => *slot = name,
            None => tracing::debug!("Ignoring model name '{name}' at index {index}"),
        }

        Ok(())
    })?;

    Ok(names)
}

fn read_items(
    r: &mut ByteReader<'_>,
    header: &Header,
    archive: &Archive,
    model_names: &[String],
    variant: MapVariant,
    map: &mut Map,
) -> DecodeResult<usize> {
    let mut num_terrain_cells = 0usize;

    for record in 0..header.num_items {
        let x = (r.read_u32()? & 0xFFFF) as u16;
        let y = (r.read_u32()? & 0xFFFF) as u16;
        let tag = item_tag(r.read_u32()?);

        let kind =
            ItemKind::from_tag(tag).ok_or(InvalidFormat::UnknownItemTag { tag, record })?;

        match kind {
            ItemKind::TerrainCell => {
                if num_terrain_cells >= MAP_SIZE * MAP_SIZE {
                    return Err(InvalidFormat::TooManyTerrainCells {
                        max: MAP_SIZE * MAP_SIZE,
                    }
                    .into());
                }

                r.skip(4)?;
                let block_def_index = r.read_u32()?;
                let flags = TileFlags(r.read_u8()?);
                r.skip(5)?;
                let vertical_offset = r.read_i16()?;
                r.skip(4)?;

                map.terrain.0[num_terrain_cells] = TerrainTile {
                    block_def_index,
                    flags,
                    vertical_offset,
                };
                num_terrain_cells += 1;
            }

            ItemKind::ExtraTerrain => {
                r.skip(4)?;
                let block_def_index = r.read_u32()?;
                let flags = TileFlags(r.read_u8()?);
                r.skip(5)?;
                let mut vertex_heights = [0; 4];
                for height in &mut vertex_heights {
                    *height = r.read_i16()?;
                }
                r.skip(2)?;

                map.items.push(MapItem::ExtraTerrain(ExtraTerrainTile {
                    x,
                    y,
                    block_def_index,
                    flags,
                    vertex_heights,
                }));
            }

            ItemKind::Block => {
                r.skip(4)?;
                let block_def_index = r.read_u32()?;
                let flags = TileFlags(r.read_u8()?);
                r.skip(5)?;
                let vertical_offset = r.read_i16()?;
                let mut vertex_offsets = [0; 8];
                for offset in &mut vertex_offsets {
                    *offset = r.read_i8()?;
                }

                map.items.push(MapItem::Block(BlockInstance {
                    x,
                    y,
                    block_def_index,
                    flags,
                    vertical_offset,
                    vertex_offsets,
                }));
            }

            ItemKind::Instance => match variant {
                MapVariant::Standard => {
                    if let Some(model) = read_model_instance(r, x, y, archive, model_names)? {
                        map.items.push(MapItem::Model(model));
                    }
                }
                MapVariant::Billboard => {
                    map.items
                        .push(MapItem::Billboard(read_billboard(r, x, y)?));
                }
            },

            ItemKind::Unmodeled { size } => r.skip(size)?,
        }
    }

    Ok(num_terrain_cells)
}

fn read_model_instance(
    r: &mut ByteReader<'_>,
    x: u16,
    y: u16,
    archive: &Archive,
    model_names: &[String],
) -> DecodeResult<Option<ModelInstance>> {
    let x_offset = r.read_u8()?;
    let y_offset = r.read_u8()?;
    let vertical_offset = r.read_i16()?;
    let rotation_x = r.read_u16()?;
    let rotation_y = r.read_u16()?;
    let rotation_z = r.read_u16()?;
    let name_index = r.read_u32()?;
    let scale = r.read_u16()?;

    let Some(name) = model_names.get(name_index as usize) else {
        tracing::debug!(
            "Dropping model instance at {x},{y}: {}",
            DecodeError::unresolved(ReferenceKind::ModelName, name_index)
        );
        return Ok(None);
    };

    if !archive.models.contains_key(name) {
        tracing::debug!(
            "Dropping model instance at {x},{y}: {}",
            DecodeError::MissingAsset(name.clone())
        );
        return Ok(None);
    }

    Ok(Some(ModelInstance {
        x,
        y,
        model_name: name.clone(),
        x_offset,
        y_offset,
        vertical_offset,
        rotation_x,
        rotation_y,
        rotation_z,
        scale,
    }))
}

fn read_billboard(r: &mut ByteReader<'_>, x: u16, y: u16) -> DecodeResult<Billboard> {
    let x_offset = r.read_u8()?;
    let y_offset = r.read_u8()?;
    let vertical_offset = r.read_i16()?;
    // Rotation fields have no meaning for a camera-facing sprite.
    r.skip(3 * 2)?;
    let texture = r.read_u32()?;
    let scale = r.read_u16()?;

    Ok(Billboard {
        x,
        y,
        texture,
        x_offset,
        y_offset,
        vertical_offset,
        scale,
    })
}
