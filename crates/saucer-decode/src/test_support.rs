//! Encoders for small synthetic archives and maps used by the tests.

use crate::archive::COLOR_LUT_SIZE;
use crate::map::{MAP_SIGNATURE, MAP_VERSION};
use crate::packed::PALETTE_SIZE;
use crate::texture_def::{TextureDef, TextureDefFormat, UvPair};

const PAGE_BYTES: usize = 256 * 256;
const MODEL_HEADER_SIZE: usize = 56;

/// A full 256×256 page filled with one palette index.
pub fn page_pixels(fill: u8) -> Vec<u8> {
    vec![fill; PAGE_BYTES]
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_i16(out: &mut Vec<u8>, value: i16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_name(out: &mut Vec<u8>, name: &str, len: usize) {
    let mut field = vec![0u8; len];
    field[..name.len()].copy_from_slice(name.as_bytes());
    out.extend_from_slice(&field);
}

pub fn push_texture_def(out: &mut Vec<u8>, def: &TextureDef, format: TextureDefFormat) {
    let uv = |out: &mut Vec<u8>, uv: UvPair| out.extend_from_slice(&[uv.u, uv.v]);

    uv(out, def.uvs[0]);
    push_u16(out, def.bitmap_index);
    uv(out, def.uvs[1]);
    push_u16(out, 0);
    uv(out, def.uvs[2]);
    push_u16(out, 0);
    uv(out, def.uvs[3]);
    push_u16(out, u16::from(def.is_masked));

    if format == TextureDefFormat::WithOrigin {
        push_i16(out, def.origin.0);
        push_i16(out, def.origin.1);
    }
}

/// A model encoded into the packed data.
#[derive(Debug, Clone, Default)]
pub struct ModelFixture {
    pub vertices: Vec<[i16; 3]>,
    /// Texture index, vertex indices, quad flag.
    pub faces: Vec<(u32, [u16; 4], bool)>,
    pub matrix: [i16; 12],
}

enum ModelEntry {
    Raw { offset_data: u32, offset_params: u32 },
    Encoded(ModelFixture),
}

pub struct ArchiveBuilder {
    version: u32,
    background: u8,
    pages: Vec<(String, Vec<u8>)>,
    texture_defs: Vec<TextureDef>,
    models: Vec<(String, ModelEntry)>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            version: 1,
            background: 0,
            pages: Vec::new(),
            texture_defs: Vec::new(),
            models: Vec::new(),
        }
    }

    pub fn def(page: u16, uvs: [(u8, u8); 4], masked: bool) -> TextureDef {
        TextureDef {
            uvs: uvs.map(|(u, v)| UvPair { u, v }),
            bitmap_index: page,
            is_masked: masked,
            origin: (0, 0),
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn background(mut self, index: u8) -> Self {
        self.background = index;
        self
    }

    pub fn page(mut self, name: &str, pixels: Vec<u8>) -> Self {
        assert_eq!(pixels.len(), PAGE_BYTES);
        self.pages.push((name.to_string(), pixels));
        self
    }

    pub fn texture_def(mut self, def: TextureDef) -> Self {
        self.texture_defs.push(def);
        self
    }

    pub fn raw_model(mut self, name: &str, offset_data: u32, offset_params: u32) -> Self {
        self.models.push((
            name.to_string(),
            ModelEntry::Raw {
                offset_data,
                offset_params,
            },
        ));
        self
    }

    pub fn model(mut self, name: &str, model: ModelFixture) -> Self {
        self.models.push((name.to_string(), ModelEntry::Encoded(model)));
        self
    }

    /// Offset of a page inside the packed data.
    pub fn bitmap_offset(&self, index: usize) -> u32 {
        (PALETTE_SIZE * 4 + index * PAGE_BYTES) as u32
    }

    /// Palette entry `i` is `[i, 255 - i, i / 2]`.
    pub fn palette_color(index: u8) -> [u8; 3] {
        [index, 255 - index, index / 2]
    }

    fn packed_data(&self) -> (Vec<u8>, Vec<(u32, u32)>) {
        let mut packed = Vec::new();
        for i in 0..PALETTE_SIZE {
            let [r, g, b] = Self::palette_color(i as u8);
            packed.extend_from_slice(&[r, g, b, 0]);
        }
        for (_, pixels) in &self.pages {
            packed.extend_from_slice(pixels);
        }

        let mut model_offsets = Vec::new();
        for (_, entry) in &self.models {
            match entry {
                ModelEntry::Raw {
                    offset_data,
                    offset_params,
                } => model_offsets.push((*offset_data, *offset_params)),
                ModelEntry::Encoded(model) => {
                    model_offsets.push(encode_model(&mut packed, model));
                }
            }
        }

        (packed, model_offsets)
    }

    pub fn build(&self) -> Vec<u8> {
        let (packed, model_offsets) = self.packed_data();

        let mut out = vec![0u8; COLOR_LUT_SIZE];
        push_u32(&mut out, (self.version << 24) | packed.len() as u32);
        push_u32(&mut out, u32::from(self.background));
        out.extend_from_slice(&[0; 8]);

        // Two unknown blobs
        push_u32(&mut out, 0);
        push_u32(&mut out, 0);

        // Language headers with one entry each in the first table
        for i in 0..7 {
            push_u16(&mut out, 0);
            push_u16(&mut out, u16::from(i == 0));
            push_u32(&mut out, 0);
            push_u32(&mut out, 0);
        }
        push_u16(&mut out, 0xBEEF);

        push_u32(&mut out, 3);
        out.extend_from_slice(&[1, 2, 3]);
        push_u32(&mut out, 0);
        push_u32(&mut out, 0);
        push_u32(&mut out, 1);
        push_u32(&mut out, 0xDEAD_BEEF);

        push_u32(&mut out, self.pages.len() as u32);
        for i in 0..self.pages.len() {
            push_u32(&mut out, self.bitmap_offset(i));
            push_u32(&mut out, 0);
            push_u16(&mut out, 256);
            push_u16(&mut out, 256);
        }

        push_u32(&mut out, self.pages.len() as u32);
        for (i, (name, _)) in self.pages.iter().enumerate() {
            push_u32(&mut out, i as u32);
            push_name(&mut out, name, 16);
        }

        push_u32(&mut out, self.texture_defs.len() as u32);
        for def in &self.texture_defs {
            push_texture_def(&mut out, def, TextureDefFormat::Standard);
        }

        push_u32(&mut out, 1);
        out.extend_from_slice(&[0; 28]);

        push_u32(&mut out, self.models.len() as u32);
        for (name, _) in &self.models {
            push_name(&mut out, name, 16);
        }
        for (offset_data, offset_params) in &model_offsets {
            push_u32(&mut out, *offset_data);
            out.extend_from_slice(&[0; 8]);
            push_u32(&mut out, *offset_params);
            out.extend_from_slice(&[0; 20]);
        }

        // Sounds, palette table, named textures
        push_u32(&mut out, 1);
        out.extend_from_slice(&[0; 16 + 116]);
        out.extend_from_slice(&[0; 20]);
        push_u32(&mut out, 0);

        // Debug names: two names, one counted
        push_u32(&mut out, 2);
        out.extend_from_slice(&[0; 32]);
        push_u32(&mut out, 1);
        out.extend_from_slice(&[0; 4 + 8]);

        out.extend_from_slice(&packed);
        out
    }
}

fn encode_model(packed: &mut Vec<u8>, model: &ModelFixture) -> (u32, u32) {
    let offset_data = packed.len() as u32;
    let vertex_start = offset_data + MODEL_HEADER_SIZE as u32;
    let face_start = vertex_start + model.vertices.len() as u32 * 6;

    packed.extend_from_slice(&[0; 40]);
    push_u32(packed, model.vertices.len() as u32);
    push_u32(packed, vertex_start);
    push_u32(packed, model.faces.len() as u32);
    push_u32(packed, face_start);

    for vertex in &model.vertices {
        for c in vertex {
            push_i16(packed, *c);
        }
    }

    for (texture, indices, is_quad) in &model.faces {
        push_u32(packed, *texture);
        for index in indices {
            push_u16(packed, *index);
        }
        push_u16(packed, if *is_quad { 0x8000 } else { 0x1000 });
        packed.extend_from_slice(&[0; 18]);
    }

    let offset_params = packed.len() as u32;
    for value in model.matrix {
        push_i16(packed, value);
    }
    packed.extend_from_slice(&[0; 36]);

    (offset_data, offset_params)
}

pub struct MapBuilder {
    version: u32,
    format: TextureDefFormat,
    pages: Vec<String>,
    block_defs: Vec<Vec<u8>>,
    texture_defs: Vec<TextureDef>,
    model_names: Vec<(i32, String)>,
    model_name_terminator: bool,
    items: Vec<Vec<u8>>,
}

impl MapBuilder {
    pub fn new() -> Self {
        Self {
            version: MAP_VERSION,
            format: TextureDefFormat::Standard,
            pages: Vec::new(),
            block_defs: Vec::new(),
            texture_defs: Vec::new(),
            model_names: Vec::new(),
            model_name_terminator: true,
            items: Vec::new(),
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn format(mut self, format: TextureDefFormat) -> Self {
        self.format = format;
        self
    }

    pub fn texture_page(mut self, name: &str) -> Self {
        self.pages.push(name.to_string());
        self
    }

    pub fn texture_def(mut self, def: TextureDef) -> Self {
        self.texture_defs.push(def);
        self
    }

    pub fn block_def(mut self, inside: [u16; 6], outside: [u16; 6], heights: [i16; 8]) -> Self {
        let mut record = Vec::new();
        for texture in inside.iter().chain(&outside) {
            push_u16(&mut record, *texture);
        }
        for height in heights {
            push_i16(&mut record, height);
        }
        record.extend_from_slice(&[0; 20]);
        self.block_defs.push(record);
        self
    }

    pub fn model_name(mut self, index: i32, name: &str) -> Self {
        self.model_names.push((index, name.to_string()));
        self
    }

    pub fn without_model_name_terminator(mut self) -> Self {
        self.model_name_terminator = false;
        self
    }

    fn item(mut self, x: u16, y: u16, tag: u32, body: Vec<u8>) -> Self {
        let mut record = Vec::new();
        // High bits of the coordinate words are ignored.
        push_u32(&mut record, 0xAB00_0000 | u32::from(x));
        push_u32(&mut record, 0xCD00_0000 | u32::from(y));
        push_u32(&mut record, (tag << 16) | 0x0000_0123);
        record.extend_from_slice(&body);
        self.items.push(record);
        self
    }

    pub fn terrain(self, block_def: u32, flags: u8, vertical_offset: i16) -> Self {
        let mut body = vec![0; 4];
        push_u32(&mut body, block_def);
        body.push(flags);
        body.extend_from_slice(&[0; 5]);
        push_i16(&mut body, vertical_offset);
        body.extend_from_slice(&[0; 4]);
        self.item(0, 0, 0x4, body)
    }

    pub fn extra_terrain(self, x: u16, y: u16, block_def: u32, flags: u8, heights: [i16; 4]) -> Self {
        let mut body = vec![0; 4];
        push_u32(&mut body, block_def);
        body.push(flags);
        body.extend_from_slice(&[0; 5]);
        for height in heights {
            push_i16(&mut body, height);
        }
        body.extend_from_slice(&[0; 2]);
        self.item(x, y, 0x8, body)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn block(
        self,
        x: u16,
        y: u16,
        block_def: u32,
        flags: u8,
        vertical_offset: i16,
        offsets: [i8; 8],
    ) -> Self {
        let mut body = vec![0; 4];
        push_u32(&mut body, block_def);
        body.push(flags);
        body.extend_from_slice(&[0; 5]);
        push_i16(&mut body, vertical_offset);
        body.extend(offsets.iter().map(|&o| o as u8));
        self.item(x, y, 0x40, body)
    }

    /// Tag `0x1000` record; `index` is a model name index or, in the
    /// billboard variant, a texture index.
    #[allow(clippy::too_many_arguments)]
    pub fn model_instance(
        self,
        x: u16,
        y: u16,
        index: u32,
        x_offset: u8,
        y_offset: u8,
        vertical_offset: i16,
        rotation: [u16; 3],
        scale: u16,
    ) -> Self {
        let mut body = vec![x_offset, y_offset];
        push_i16(&mut body, vertical_offset);
        for angle in rotation {
            push_u16(&mut body, angle);
        }
        push_u32(&mut body, index);
        push_u16(&mut body, scale);
        self.item(x, y, 0x1000, body)
    }

    pub fn unmodeled(self, tag: u32, size: usize) -> Self {
        self.item(0, 0, tag, vec![0xEE; size])
    }

    pub fn build(&self) -> Vec<u8> {
        // A file ending inside the model name table has nothing after it.
        let num_unknown: u32 = if self.model_name_terminator { 2 } else { 0 };

        let mut out = MAP_SIGNATURE.to_vec();
        push_u32(&mut out, self.version);
        push_u32(&mut out, self.texture_defs.len() as u32);
        push_u32(&mut out, self.block_defs.len() as u32);
        push_u32(&mut out, num_unknown);
        push_u32(&mut out, self.items.len() as u32);
        push_u32(&mut out, 1); // texture animations
        out.extend_from_slice(&[0; 8]);

        for (i, name) in self.pages.iter().enumerate() {
            push_i32(&mut out, i as i32);
            push_name(&mut out, name, 14);
        }
        push_i32(&mut out, -1);

        for record in &self.block_defs {
            out.extend_from_slice(record);
        }

        for def in &self.texture_defs {
            push_texture_def(&mut out, def, self.format);
        }

        out.extend_from_slice(&[0; 40]);

        // One strat name
        push_i32(&mut out, 0);
        push_name(&mut out, "STRAT", 16);
        push_i32(&mut out, -1);

        for (index, name) in &self.model_names {
            push_i32(&mut out, *index);
            push_name(&mut out, name, 16);
        }
        if !self.model_name_terminator {
            return out;
        }
        push_i32(&mut out, -1);

        out.extend(std::iter::repeat_n(0, num_unknown as usize * 8));

        for item in &self.items {
            out.extend_from_slice(item);
        }

        out
    }
}
