//! Build renderer-ready scenes from Attack of the Saucerman levels.
//!
//! This crate pairs a map file with its world archive, decodes both with
//! [`saucer_decode`], combines the used texture pages into atlases and
//! reconstructs world-space meshes for terrain, blocks, models and
//! billboards. The result is a [`Scene`]: plain vertex and index buffers plus
//! RGBA atlas images, ready to be uploaded by any renderer.
//!
//! The [`export`] module covers whole archives instead of single levels: it
//! names every bitmap for extraction and turns every catalog model into a
//! standalone mesh.
//!
//! # Example
//!
//! ```no_run
//! use saucer::{Scene, SceneConfig};
//!
//! # fn main() -> saucer::Result<()> {
//! let scene = Scene::load("MAPS/LEVEL1.MAP", &SceneConfig::default())?;
//! println!("{} terrain triangles", scene.meshes.terrain.triangle_count());
//! # Ok(())
//! # }
//! ```

mod config;
mod error;

pub mod export;
pub mod geometry;
pub mod mesh;
pub mod scene;

pub use config::{ARCHIVE_DIR, SceneConfig};
pub use error::{Error, Result};
pub use export::{ModelExport, PrimitiveLayout, bitmap_export_paths, export_models};
pub use geometry::{GeometryBuilder, OmissionStats, SceneMeshes};
pub use mesh::{BillboardVertex, MaskedMeshes, MeshBuffer, MeshVertex};
pub use scene::Scene;

pub use saucer_decode as decode;
pub use saucer_decode::{DecodeError, MapDecodeOptions, MapVariant};
