//! Scene assembly: pairing a map with its archive and building everything a
//! renderer needs.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use saucer_decode::{Archive, Map, ModelData, TextureAtlas};

use crate::config::SceneConfig;
use crate::error::{Error, Result};
use crate::geometry::{GeometryBuilder, OmissionStats, SceneMeshes};

/// An immutable snapshot of a fully reconstructed level.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub world_atlas: TextureAtlas,
    pub model_atlas: TextureAtlas,
    pub meshes: SceneMeshes,
    /// Opaque clear color.
    pub background_color: [u8; 4],
    pub omissions: OmissionStats,
}

impl Scene {
    /// Load a map file and its archive and build the scene.
    ///
    /// Any decode failure aborts the whole load.
    pub fn load(map_path: impl AsRef<Path>, config: &SceneConfig) -> Result<Self> {
        let map_path = map_path.as_ref();
        let archive_path = config.archive_path_for(map_path);

        if !archive_path.is_file() {
            return Err(Error::ArchiveNotFound { path: archive_path });
        }

        let archive = Archive::open(&archive_path)?;
        let map = Map::open(map_path, &archive, &config.map_options)?;

        let scene = Self::build(&map, &archive)?;

        tracing::info!(
            "Loaded scene {} with archive {}",
            map_path.display(),
            archive_path.display()
        );

        Ok(scene)
    }

    /// Build atlases and meshes for a decoded map.
    pub fn build(map: &Map, archive: &Archive) -> Result<Self> {
        let world_atlas = archive.build_texture_atlas(world_pages(map))?;

        let models = load_used_models(map, archive)?;
        let model_atlas = archive.build_texture_atlas(model_pages(models.values(), archive))?;

        let (meshes, omissions) =
            GeometryBuilder::new(map, archive, &world_atlas, &model_atlas, &models).build();

        if omissions.total() > 0 {
            tracing::debug!("Left out {} unresolved rows and faces", omissions.total());
        }

        Ok(Self {
            world_atlas,
            model_atlas,
            meshes,
            background_color: archive.background_color()?,
            omissions,
        })
    }
}

/// Bitmap pages used by the map's texture definitions.
#[must_use]
pub fn world_pages(map: &Map) -> BTreeSet<u32> {
    map.texture_defs
        .iter()
        .map(|def| u32::from(def.bitmap_index))
        .collect()
}

/// Bitmap pages used by the faces of the given models.
#[must_use]
pub fn model_pages<'m, 'a: 'm>(
    models: impl IntoIterator<Item = &'m ModelData<'a>>,
    archive: &Archive,
) -> BTreeSet<u32> {
    models
        .into_iter()
        .flat_map(|model| &model.faces)
        .filter_map(|face| archive.texture_def(face.texture).ok())
        .map(|def| u32::from(def.bitmap_index))
        .collect()
}

/// Decode every model the map places, once per name.
///
/// Names missing from the catalog are skipped; any other failure is fatal.
pub fn load_used_models<'a>(
    map: &Map,
    archive: &'a Archive,
) -> Result<HashMap<String, ModelData<'a>>> {
    let mut models = HashMap::new();

    for name in map.model_names() {
        match archive.load_model(name) {
            Ok(model) => {
                models.insert(name.to_string(), model);
            }
            Err(err) if err.is_recoverable() => {
                tracing::debug!("Skipping model '{name}': {err}");
            }
            Err(err) => return Err(err.into()),
        }
    }

    tracing::debug!("Loaded {} distinct models", models.len());

    Ok(models)
}
