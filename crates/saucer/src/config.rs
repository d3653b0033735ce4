//! Scene loading configuration.

use std::path::{Path, PathBuf};

use saucer_decode::{MapDecodeOptions, MapVariant};

/// Directory, next to the map directory, holding the world archives.
pub const ARCHIVE_DIR: &str = "LEVELS";

/// How a scene is assembled from files on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneConfig {
    /// Use this archive instead of the one derived from the map path.
    pub archive_path: Option<PathBuf>,
    pub map_options: MapDecodeOptions,
}

impl SceneConfig {
    #[must_use]
    pub fn with_archive(mut self, path: impl Into<PathBuf>) -> Self {
        self.archive_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_variant(mut self, variant: MapVariant) -> Self {
        self.map_options.variant = variant;
        self
    }

    /// The archive that belongs to `map_path`.
    ///
    /// Without an override this is `<map dir>/../LEVELS/<stem>.wad` with the
    /// map's file stem lower-cased.
    #[must_use]
    pub fn archive_path_for(&self, map_path: &Path) -> PathBuf {
        if let Some(path) = &self.archive_path {
            return path.clone();
        }

        let stem = map_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        map_path
            .parent()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new(""))
            .join(ARCHIVE_DIR)
            .join(format!("{stem}.wad"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_lives_in_sibling_levels_directory() {
        let config = SceneConfig::default();
        assert_eq!(
            config.archive_path_for(Path::new("/game/MAPS/LEVEL1.MAP")),
            PathBuf::from("/game/LEVELS/level1.wad")
        );
    }

    #[test]
    fn bare_file_name_resolves_relative() {
        let config = SceneConfig::default();
        assert_eq!(
            config.archive_path_for(Path::new("Farm.map")),
            PathBuf::from("LEVELS/farm.wad")
        );
    }

    #[test]
    fn override_wins() {
        let config = SceneConfig::default()
            .with_archive("/tmp/custom.wad")
            .with_variant(MapVariant::Billboard);
        assert_eq!(
            config.archive_path_for(Path::new("/game/MAPS/LEVEL1.MAP")),
            PathBuf::from("/tmp/custom.wad")
        );
        assert_eq!(config.map_options.variant, MapVariant::Billboard);
    }
}
