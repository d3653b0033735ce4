//! Reconstruction of world-space meshes from a decoded map.
//!
//! The map stores positions on a 64×64 grid with vertical offsets in fixed
//! point, 256 units per cell height, growing downwards. World space puts the
//! map center at the origin with one unit per cell and Y pointing up.

use std::collections::HashMap;

use glam::{Mat4, Vec3, Vec4};
use saucer_decode::{
    Archive, Billboard, BlockDef, BlockInstance, ExtraTerrainTile, FaceKind, MAP_SIZE, Map,
    MapItem, ModelData, ModelInstance, TEXTURE_PAGE_SIZE, TextureAtlas, TextureDef,
};

use crate::mesh::{BillboardVertex, MaskedMeshes, MeshBuffer, MeshVertex};

const MAP_CENTER: f32 = (MAP_SIZE / 2) as f32;
const HEIGHT_UNITS: f32 = 256.0;
const BILLBOARD_TEXELS_PER_UNIT: f32 = 64.0;

/// Convert a grid position and vertical offset to world space.
#[must_use]
pub fn world_position(x: f32, y: f32, vertical_offset: i32) -> Vec3 {
    Vec3::new(
        x - MAP_CENTER,
        vertical_offset as f32 / -HEIGHT_UNITS,
        y - MAP_CENTER,
    )
}

/// Turn a raw 16-bit angle into radians.
#[must_use]
pub fn decode_angle(raw: u16) -> f32 {
    (f32::from(raw) / 65536.0 * 360.0).to_radians()
}

/// Convert a model's fixed-point local matrix.
///
/// The first nine values are three basis columns scaled by 512, the last
/// three a translation in model units.
#[must_use]
pub fn model_local_transform(matrix: &[i16; 12]) -> Mat4 {
    let m = |i: usize| f32::from(matrix[i]) / 512.0;
    Mat4::from_cols(
        Vec4::new(m(0), m(1), m(2), 0.0),
        Vec4::new(m(3), m(4), m(5), 0.0),
        Vec4::new(m(6), m(7), m(8), 0.0),
        Vec4::new(
            f32::from(matrix[9]) / -HEIGHT_UNITS,
            f32::from(matrix[10]) / -HEIGHT_UNITS,
            f32::from(matrix[11]) / HEIGHT_UNITS,
            1.0,
        ),
    )
}

/// Atlas texture coordinates for the four corners of a texture definition.
///
/// Returns `None` when the definition's page is not in the atlas.
#[must_use]
pub fn atlas_tex_coords(def: &TextureDef, atlas: &TextureAtlas) -> Option<[[f32; 2]; 4]> {
    let u_offset = atlas.u_offset(u32::from(def.bitmap_index))?;
    let width = atlas.width() as f32;
    let height = TEXTURE_PAGE_SIZE as f32;

    Some(def.uvs.map(|uv| {
        [
            (f32::from(uv.u) + 0.5) / width + u_offset,
            (f32::from(uv.v) + 0.5) / height,
        ]
    }))
}

/// Transform a model's faces and append them to `meshes`.
///
/// Faces whose texture is missing from `atlas` or whose indices run past the
/// vertex table are counted in `omissions` and skipped.
pub fn append_model_faces(
    archive: &Archive,
    atlas: &TextureAtlas,
    model: &ModelData<'_>,
    transform: Mat4,
    meshes: &mut MaskedMeshes,
    omissions: &mut OmissionStats,
) {
    for face in &model.faces {
        let resolved = archive.texture_def(face.texture).ok().and_then(|def| {
            atlas_tex_coords(def, atlas).map(|uvs| (def.is_masked, uvs))
        });
        let Some((masked, uvs)) = resolved else {
            tracing::debug!("Model face texture {} is not available", face.texture);
            omissions.unresolved_textures += 1;
            continue;
        };

        let positions: Option<Vec<Vec3>> = face
            .indices()
            .iter()
            .map(|&index| {
                let v = model.vertices.get(usize::from(index))?;
                let local = Vec3::new(
                    f32::from(v.x) / -HEIGHT_UNITS,
                    f32::from(v.y) / -HEIGHT_UNITS,
                    f32::from(v.z) / HEIGHT_UNITS,
                );
                Some(transform.transform_point3(local))
            })
            .collect();

        let Some(positions) = positions else {
            omissions.invalid_model_faces += 1;
            continue;
        };

        let vertex = |i: usize| MeshVertex {
            position: positions[i].to_array(),
            uv: uvs[i],
        };

        match face.kind {
            FaceKind::Quad => {
                meshes.add_quad(masked, [vertex(0), vertex(1), vertex(2), vertex(3)]);
            }
            FaceKind::Triangle => {
                meshes.add_triangle(masked, [vertex(0), vertex(1), vertex(2)]);
            }
        }
    }
}

/// Rows and faces left out of the meshes because a reference did not
/// resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OmissionStats {
    /// Terrain cells, patches or blocks naming a missing block definition.
    pub missing_block_defs: usize,
    /// Faces whose texture definition is vacant or absent from the atlas.
    pub unresolved_textures: usize,
    /// Model instances whose model was not loaded.
    pub missing_models: usize,
    /// Model faces pointing past the model's vertex table.
    pub invalid_model_faces: usize,
}

impl OmissionStats {
    #[must_use]
    pub fn total(&self) -> usize {
        self.missing_block_defs
            + self.unresolved_textures
            + self.missing_models
            + self.invalid_model_faces
    }
}

/// All meshes making up a scene, by category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneMeshes {
    pub terrain: MeshBuffer<MeshVertex>,
    pub blocks: MaskedMeshes,
    pub models: MaskedMeshes,
    pub billboards: MeshBuffer<BillboardVertex>,
}

/// Inputs shared by every reconstruction step.
pub struct GeometryBuilder<'a> {
    map: &'a Map,
    archive: &'a Archive,
    world_atlas: &'a TextureAtlas,
    model_atlas: &'a TextureAtlas,
    models: &'a HashMap<String, ModelData<'a>>,
    meshes: SceneMeshes,
    omissions: OmissionStats,
}

impl<'a> GeometryBuilder<'a> {
    #[must_use]
    pub fn new(
        map: &'a Map,
        archive: &'a Archive,
        world_atlas: &'a TextureAtlas,
        model_atlas: &'a TextureAtlas,
        models: &'a HashMap<String, ModelData<'a>>,
    ) -> Self {
        Self {
            map,
            archive,
            world_atlas,
            model_atlas,
            models,
            meshes: SceneMeshes::default(),
            omissions: OmissionStats::default(),
        }
    }

    /// Reconstruct the terrain grid and every placed item.
    #[must_use]
    pub fn build(mut self) -> (SceneMeshes, OmissionStats) {
        self.add_terrain_grid();

        let map = self.map;
        for item in &map.items {
            match item {
                MapItem::ExtraTerrain(tile) => self.add_extra_terrain(tile),
                MapItem::Block(block) => self.add_block(block),
                MapItem::Model(model) => self.add_model(model),
                MapItem::Billboard(billboard) => self.add_billboard(billboard),
            }
        }

        tracing::debug!(
            "Reconstructed {} terrain, {} block, {} model and {} billboard triangles",
            self.meshes.terrain.triangle_count(),
            self.meshes.blocks.triangle_count(),
            self.meshes.models.triangle_count(),
            self.meshes.billboards.triangle_count()
        );

        (self.meshes, self.omissions)
    }

    fn block_def(&mut self, index: u32) -> Option<&'a BlockDef> {
        let map = self.map;
        let def = map.block_defs.get(index as usize);
        if def.is_none() {
            tracing::debug!("Block definition {index} does not exist");
            self.omissions.missing_block_defs += 1;
        }
        def
    }

    /// Resolve a non-zero map texture index to its definition and UVs.
    fn world_texture(&mut self, index: u16) -> Option<(&'a TextureDef, [[f32; 2]; 4])> {
        let (map, atlas) = (self.map, self.world_atlas);
        let resolved = map
            .texture_defs
            .get(usize::from(index))
            .and_then(|def| atlas_tex_coords(def, atlas).map(|uvs| (def, uvs)));
        if resolved.is_none() {
            tracing::debug!("Texture definition {index} is not available");
            self.omissions.unresolved_textures += 1;
        }
        resolved
    }

    fn add_terrain_grid(&mut self) {
        let map = self.map;
        let terrain = &map.terrain;
        let last = MAP_SIZE - 1;

        for y in 0..MAP_SIZE {
            for x in 0..MAP_SIZE {
                let tile = terrain.at(x, y);
                let offset = |x: usize, y: usize| i32::from(terrain.at(x, y).vertical_offset);

                let own = i32::from(tile.vertical_offset);
                let right = if x < last { offset(x + 1, y) } else { own };
                let down = if y < last { offset(x, y + 1) } else { own };
                let diagonal = if x < last && y < last {
                    offset(x + 1, y + 1)
                } else {
                    own
                };

                self.add_terrain_quad(
                    tile.block_def_index,
                    tile.flags.rotation(),
                    (x as f32, y as f32),
                    [own, right, diagonal, down],
                );
            }
        }
    }

    fn add_extra_terrain(&mut self, tile: &ExtraTerrainTile) {
        let [h0, h1, h2, h3] = tile.vertex_heights.map(i32::from);
        self.add_terrain_quad(
            tile.block_def_index,
            tile.flags.rotation(),
            (f32::from(tile.x), f32::from(tile.y)),
            [h0, h1, h2, h3],
        );
    }

    /// Heights are given clockwise from the cell's top-left corner.
    fn add_terrain_quad(
        &mut self,
        block_def_index: u32,
        rotation: usize,
        (x, y): (f32, f32),
        heights: [i32; 4],
    ) {
        let Some(block_def) = self.block_def(block_def_index) else {
            return;
        };

        let texture = block_def.textures_inside.bottom;
        if texture == 0 {
            return;
        }

        let Some((_, uvs)) = self.world_texture(texture) else {
            return;
        };

        let uv_rotation = 4 - rotation;
        let corners = [(x, y), (x + 1.0, y), (x + 1.0, y + 1.0), (x, y + 1.0)];
        let quad = std::array::from_fn(|i| MeshVertex {
            position: world_position(corners[i].0, corners[i].1, heights[i]).to_array(),
            uv: uvs[(i + uv_rotation) % 4],
        });

        self.meshes.terrain.add_quad(quad);
    }

    fn add_block(&mut self, block: &BlockInstance) {
        let Some(def) = self.block_def(block.block_def_index) else {
            return;
        };

        let rotation = block.flags.rotation();
        let x = f32::from(block.x);
        let y = f32::from(block.y);
        let footprint = [(x, y), (x + 1.0, y), (x + 1.0, y + 1.0), (x, y + 1.0)];
        let base = i32::from(block.vertical_offset);

        // Bottom ring first, then the top ring.
        let corners: [Vec3; 8] = std::array::from_fn(|i| {
            let corner = i % 4;
            let ring = i - corner;
            let height = base
                + i32::from(def.vertex_heights[(corner + rotation) % 4 + ring])
                + i32::from(block.vertex_offsets[i]) * 4;
            let (cx, cy) = footprint[corner];
            world_position(cx, cy, height)
        });

        let outside = def.textures_outside;
        let inside = def.textures_inside;

        self.add_block_face(outside.top, &corners, [4, 5, 6, 7], rotation);
        self.add_block_face(inside.top, &corners, [7, 6, 5, 4], rotation);
        self.add_block_face(outside.bottom, &corners, [3, 2, 1, 0], 4 - rotation);
        self.add_block_face(inside.bottom, &corners, [0, 1, 2, 3], 4 - rotation);

        let sides = [
            outside.left,
            outside.front,
            outside.right,
            outside.back,
            inside.left,
            inside.front,
            inside.right,
            inside.back,
        ];
        let side_rotation = 4 - rotation;
        let outside_faces = [[4, 7, 3, 0], [7, 6, 2, 3], [6, 5, 1, 2], [5, 4, 0, 1]];
        let inside_faces = [[7, 4, 0, 3], [6, 7, 3, 2], [5, 6, 2, 1], [4, 5, 1, 0]];

        for (i, face) in outside_faces.into_iter().enumerate() {
            self.add_block_face(sides[(i + side_rotation) % 4], &corners, face, 0);
        }
        for (i, face) in inside_faces.into_iter().enumerate() {
            self.add_block_face(sides[(i + side_rotation) % 4 + 4], &corners, face, 0);
        }
    }

    fn add_block_face(
        &mut self,
        texture: u16,
        corners: &[Vec3; 8],
        face: [usize; 4],
        uv_rotation: usize,
    ) {
        if texture == 0 || usize::from(texture) >= self.map.texture_defs.len() {
            return;
        }

        let Some((def, uvs)) = self.world_texture(texture) else {
            return;
        };

        let quad = std::array::from_fn(|i| MeshVertex {
            position: corners[face[i]].to_array(),
            uv: uvs[(i + uv_rotation) % 4],
        });

        self.meshes.blocks.add_quad(def.is_masked, quad);
    }

    fn add_model(&mut self, instance: &ModelInstance) {
        let models = self.models;
        let Some(model) = models.get(&instance.model_name) else {
            tracing::debug!("Model '{}' was not loaded", instance.model_name);
            self.omissions.missing_models += 1;
            return;
        };

        let translation = world_position(
            f32::from(instance.x) + f32::from(instance.x_offset) / HEIGHT_UNITS,
            f32::from(instance.y) + f32::from(instance.y_offset) / HEIGHT_UNITS,
            i32::from(instance.vertical_offset),
        );
        let scale = f32::from(instance.scale) / 256.0;

        let transform = Mat4::from_translation(translation)
            * Mat4::from_scale(Vec3::splat(scale))
            * Mat4::from_axis_angle(Vec3::NEG_Y, decode_angle(instance.rotation_y))
            * Mat4::from_axis_angle(Vec3::Z, decode_angle(instance.rotation_z))
            * Mat4::from_axis_angle(Vec3::NEG_X, decode_angle(instance.rotation_x))
            * model_local_transform(&model.transform);

        append_model_faces(
            self.archive,
            self.model_atlas,
            model,
            transform,
            &mut self.meshes.models,
            &mut self.omissions,
        );
    }

    fn add_billboard(&mut self, billboard: &Billboard) {
        let Ok(index) = u16::try_from(billboard.texture) else {
            self.omissions.unresolved_textures += 1;
            return;
        };
        let Some((def, uvs)) = self.world_texture(index) else {
            return;
        };

        let (width_px, height_px) = def.texel_extent();
        let scale = f32::from(billboard.scale) / 256.0;
        let width = f32::from(width_px) / BILLBOARD_TEXELS_PER_UNIT * scale;
        let height = f32::from(height_px) / BILLBOARD_TEXELS_PER_UNIT * scale;

        let base = world_position(
            f32::from(billboard.x),
            f32::from(billboard.y) + 1.0,
            i32::from(billboard.vertical_offset),
        );
        let left = f32::from(def.origin.0) / BILLBOARD_TEXELS_PER_UNIT * scale;
        let top = base.y - f32::from(def.origin.1) / BILLBOARD_TEXELS_PER_UNIT * scale;

        let anchor = [
            base.x + f32::from(billboard.x_offset) / 255.0,
            base.z - f32::from(billboard.y_offset) / 255.0,
        ];

        let corners = [
            [left, top],
            [left + width, top],
            [left + width, top - height],
            [left, top - height],
        ];

        self.meshes
            .billboards
            .add_quad(std::array::from_fn(|i| BillboardVertex {
                position: corners[i],
                anchor,
                uv: uvs[i],
            }));
    }
}
