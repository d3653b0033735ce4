//! Model decoding from the archive's packed data.

use glam::I16Vec3;

use crate::archive::Archive;
use crate::error::{DecodeError, DecodeResult};

/// Bytes in the model header that precede the table locations.
const MODEL_HEADER_SKIP: usize = 40;
const VERTEX_SIZE: usize = 6;
const FACE_SIZE: usize = 32;
const MATRIX_SIZE: usize = 12 * 2;
const QUAD_MARKER: u16 = 0x8000;

/// Zero-copy view over a model's vertex table.
///
/// Each vertex is three little-endian `i16` in raw model units.
#[derive(Debug, Clone, Copy)]
pub struct VertexView<'a>(&'a [u8]);

impl<'a> VertexView<'a> {
    /// Wrap raw vertex bytes. A trailing partial vertex is ignored.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len() / VERTEX_SIZE
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<I16Vec3> {
        let raw = self.0.get(index * VERTEX_SIZE..(index + 1) * VERTEX_SIZE)?;
        let c = |i: usize| i16::from_le_bytes([raw[i], raw[i + 1]]);
        Some(I16Vec3::new(c(0), c(2), c(4)))
    }

    pub fn iter(&self) -> impl Iterator<Item = I16Vec3> + 'a {
        let view = *self;
        (0..view.len()).filter_map(move |i| view.get(i))
    }
}

/// Whether a face uses three or four of its vertex indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceKind {
    Triangle,
    Quad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelFace {
    /// Index into the archive's texture definitions.
    pub texture: u32,
    pub kind: FaceKind,
    indices: [u16; 4],
}

impl ModelFace {
    #[must_use]
    pub fn new(texture: u32, kind: FaceKind, indices: [u16; 4]) -> Self {
        Self {
            texture,
            kind,
            indices,
        }
    }

    /// The vertex indices actually used by the face.
    #[must_use]
    pub fn indices(&self) -> &[u16] {
        match self.kind {
            FaceKind::Triangle => &self.indices[..3],
            FaceKind::Quad => &self.indices,
        }
    }
}

/// A decoded model. Borrows its vertices from the archive.
#[derive(Debug, Clone)]
pub struct ModelData<'a> {
    pub vertices: VertexView<'a>,
    pub faces: Vec<ModelFace>,
    /// Three basis columns followed by a translation, in fixed point.
    pub transform: [i16; 12],
}

impl Archive {
    /// Decode a model from the catalog by name.
    pub fn load_model(&self, name: &str) -> DecodeResult<ModelData<'_>> {
        let info = self
            .models
            .get(name)
            .ok_or_else(|| DecodeError::MissingAsset(name.to_string()))?;

        let mut header = self
            .packed_data
            .reader_at(info.offset_data as usize, MODEL_HEADER_SKIP + 16)?;
        header.skip(MODEL_HEADER_SKIP)?;

        let num_vertices = header.read_u32()? as usize;
        let vertex_start = header.read_u32()? as usize;
        let num_faces = header.read_u32()? as usize;
        let face_start = header.read_u32()? as usize;

        let vertices = VertexView::new(self.packed_data.view(
            vertex_start,
            num_vertices.saturating_mul(VERTEX_SIZE),
        )?);

        let mut reader = self
            .packed_data
            .reader_at(face_start, num_faces.saturating_mul(FACE_SIZE))?;
        let mut faces = Vec::with_capacity(num_faces);

        for _ in 0..num_faces {
            let texture = reader.read_u32()?;
            let mut indices = [0; 4];
            for index in &mut indices {
                *index = reader.read_u16()?;
            }
            let kind = if reader.read_u16()? == QUAD_MARKER {
                FaceKind::Quad
            } else {
                FaceKind::Triangle
            };
            reader.skip(18)?;

            faces.push(ModelFace {
                texture,
                kind,
                indices,
            });
        }

        let mut params = self
            .packed_data
            .reader_at(info.offset_params as usize, MATRIX_SIZE)?;
        let mut transform = [0; 12];
        for value in &mut transform {
            *value = params.read_i16()?;
        }

        tracing::debug!(
            "Loaded model '{name}': {} vertices, {} faces",
            vertices.len(),
            faces.len()
        );

        Ok(ModelData {
            vertices,
            faces,
            transform,
        })
    }
}
