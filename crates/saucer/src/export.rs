//! Standalone exports of archive contents: every bitmap as an image file and
//! every catalog model as a self-contained mesh with its own atlas.

use std::collections::HashMap;
use std::path::PathBuf;

use glam::Mat4;
use saucer_decode::{Archive, ModelData, TextureAtlas};

use crate::error::Result;
use crate::geometry::{OmissionStats, append_model_faces, model_local_transform};
use crate::mesh::{MaskedMeshes, MeshBuffer, MeshVertex};
use crate::scene::model_pages;

/// Relative output path for every bitmap in the archive, by bitmap index.
///
/// Bitmaps exported as named texture pages go to
/// `textures/t{index}_{name}.png`, the rest are numbered in order under
/// `bitmaps/bitmap_{n}.png`.
#[must_use]
pub fn bitmap_export_paths(archive: &Archive) -> Vec<PathBuf> {
    let names: HashMap<u32, &str> = archive
        .texture_pages
        .iter()
        .map(|(name, &index)| (index, name.as_str()))
        .collect();

    let mut unnamed = 0usize;
    (0..archive.bitmaps.len() as u32)
        .map(|index| match names.get(&index) {
            Some(name) => PathBuf::from("textures").join(format!("t{index}_{name}.png")),
            None => {
                let path = PathBuf::from("bitmaps").join(format!("bitmap_{unnamed}.png"));
                unnamed += 1;
                path
            }
        })
        .collect()
}

/// One model's geometry in its own coordinate space.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelExport {
    pub meshes: MaskedMeshes,
    /// Atlas of the pages the model's faces use.
    pub atlas: TextureAtlas,
    /// The model's local matrix, to be applied by the consumer.
    pub node_matrix: Mat4,
    pub omissions: OmissionStats,
}

/// Where one primitive's data sits in [`ModelExport::buffer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimitiveLayout {
    pub masked: bool,
    /// Byte offset into the vertex section.
    pub vertex_offset: usize,
    pub vertex_count: usize,
    /// Byte offset into the index section.
    pub index_offset: usize,
    pub index_count: usize,
    pub min_position: [f32; 3],
    pub max_position: [f32; 3],
}

/// Byte size of one interleaved position + UV vertex.
pub const VERTEX_STRIDE: usize = std::mem::size_of::<MeshVertex>();

impl ModelExport {
    pub fn new(archive: &Archive, model: &ModelData<'_>) -> Result<Self> {
        let atlas = archive.build_texture_atlas(model_pages([model], archive))?;

        let mut meshes = MaskedMeshes::default();
        let mut omissions = OmissionStats::default();
        append_model_faces(
            archive,
            &atlas,
            model,
            Mat4::IDENTITY,
            &mut meshes,
            &mut omissions,
        );

        Ok(Self {
            meshes,
            atlas,
            node_matrix: model_local_transform(&model.transform),
            omissions,
        })
    }

    fn parts(&self) -> impl Iterator<Item = (bool, &MeshBuffer<MeshVertex>)> {
        [(false, &self.meshes.solid), (true, &self.meshes.masked)]
            .into_iter()
            .filter(|(_, mesh)| mesh.has_data())
    }

    /// Layout of the non-empty solid and masked parts, solid first.
    #[must_use]
    pub fn primitives(&self) -> Vec<PrimitiveLayout> {
        let mut vertex_offset = 0;
        let mut index_offset = 0;

        self.parts()
            .map(|(masked, mesh)| {
                let mut min_position = [f32::MAX; 3];
                let mut max_position = [f32::MIN; 3];
                for vertex in &mesh.vertices {
                    for axis in 0..3 {
                        min_position[axis] = min_position[axis].min(vertex.position[axis]);
                        max_position[axis] = max_position[axis].max(vertex.position[axis]);
                    }
                }

                let layout = PrimitiveLayout {
                    masked,
                    vertex_offset,
                    vertex_count: mesh.vertex_count(),
                    index_offset,
                    index_count: mesh.indices.len(),
                    min_position,
                    max_position,
                };
                vertex_offset += mesh.vertex_count() * VERTEX_STRIDE;
                index_offset += mesh.indices.len() * 4;
                layout
            })
            .collect()
    }

    /// Little-endian vertex section followed by the `u32` index section.
    ///
    /// Indices are local to their primitive.
    #[must_use]
    pub fn buffer(&self) -> (Vec<u8>, usize) {
        let mut out = Vec::new();
        for (_, mesh) in self.parts() {
            for vertex in &mesh.vertices {
                for value in vertex.position.iter().chain(&vertex.uv) {
                    out.extend_from_slice(&value.to_le_bytes());
                }
            }
        }

        let vertex_bytes = out.len();
        for (_, mesh) in self.parts() {
            for index in &mesh.indices {
                out.extend_from_slice(&index.to_le_bytes());
            }
        }

        (out, vertex_bytes)
    }
}

/// Decode every catalog model, sorted by name.
pub fn export_models(archive: &Archive) -> Result<Vec<(String, ModelExport)>> {
    let mut names: Vec<&String> = archive.models.keys().collect();
    names.sort();

    names
        .into_iter()
        .map(|name| {
            let model = archive.load_model(name)?;
            Ok((name.clone(), ModelExport::new(archive, &model)?))
        })
        .collect()
}
