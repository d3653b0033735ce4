//! Renderer-agnostic vertex and index buffers.

use std::ops::Range;

/// Vertex of a regular world or model face.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

const _: () = assert!(std::mem::size_of::<MeshVertex>() == 20);

/// Vertex of a camera-facing sprite.
///
/// `position` is in the quad's local plane; the renderer rotates it toward
/// the viewer and adds `anchor`, a world X/Z position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct BillboardVertex {
    pub position: [f32; 2],
    pub anchor: [f32; 2],
    pub uv: [f32; 2],
}

const _: () = assert!(std::mem::size_of::<BillboardVertex>() == 24);

/// Triangle indices for a quad given as top-left, top-right, bottom-right,
/// bottom-left.
const QUAD_INDICES: [u32; 6] = [0, 3, 1, 1, 3, 2];
const TRIANGLE_INDICES: [u32; 3] = [0, 2, 1];

/// A vertex stream with a triangle list over it.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBuffer<V> {
    pub vertices: Vec<V>,
    pub indices: Vec<u32>,
}

impl<V> Default for MeshBuffer<V> {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }
}

impl<V: Copy> MeshBuffer<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_quad(&mut self, corners: [V; 4]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&corners);
        self.indices.extend(QUAD_INDICES.iter().map(|i| base + i));
    }

    pub fn add_triangle(&mut self, corners: [V; 3]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&corners);
        self.indices.extend(TRIANGLE_INDICES.iter().map(|i| base + i));
    }

    /// Append another buffer, rebasing its indices.
    pub fn append(&mut self, other: &Self) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| base + i));
    }

    #[must_use]
    pub fn has_data(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty()
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Faces split by whether they need alpha-tested rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedMeshes {
    pub solid: MeshBuffer<MeshVertex>,
    pub masked: MeshBuffer<MeshVertex>,
}

impl Default for MaskedMeshes {
    fn default() -> Self {
        Self {
            solid: MeshBuffer::new(),
            masked: MeshBuffer::new(),
        }
    }
}

impl MaskedMeshes {
    /// Routes a quad to the masked or solid buffer.
    pub fn add_quad(&mut self, masked: bool, corners: [MeshVertex; 4]) {
        self.buffer_mut(masked).add_quad(corners);
    }

    pub fn add_triangle(&mut self, masked: bool, corners: [MeshVertex; 3]) {
        self.buffer_mut(masked).add_triangle(corners);
    }

    fn buffer_mut(&mut self, masked: bool) -> &mut MeshBuffer<MeshVertex> {
        if masked { &mut self.masked } else { &mut self.solid }
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.solid.vertex_count() + self.masked.vertex_count()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.solid.triangle_count() + self.masked.triangle_count()
    }

    /// One buffer with the masked faces after the solid ones.
    ///
    /// The range covers the masked part of the index buffer and is `None`
    /// when there are no masked faces.
    #[must_use]
    pub fn merged(&self) -> (MeshBuffer<MeshVertex>, Option<Range<u32>>) {
        let mut merged = self.solid.clone();

        if !self.masked.has_data() {
            return (merged, None);
        }

        let start = merged.indices.len() as u32;
        merged.append(&self.masked);
        let end = merged.indices.len() as u32;

        (merged, Some(start..end))
    }
}
