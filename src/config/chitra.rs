//! Main ChitraConfig and file helpers.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::colors::ColorSection;
use super::decompress::DecompressSection;
use super::image::ImageSection;
use super::persistence::{ObstacleSection, PersistenceSection};
use crate::error::{Error, Result};
use crate::resize::AspectRatio;

/// Full ChitraMap configuration loaded from TOML
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ChitraConfig {
    /// Palette
    #[serde(default)]
    pub colors: ColorSection,

    /// Image layout
    #[serde(default)]
    pub image: ImageSection,

    /// Decompression manager
    #[serde(default)]
    pub decompress: DecompressSection,

    /// Crop box storage
    #[serde(default)]
    pub persistence: PersistenceSection,

    /// Obstacle downloads
    #[serde(default)]
    pub obstacle: ObstacleSection,
}

impl ChitraConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load from default config path (configs/chitra.toml), falling back to
    /// built-in defaults when the file is absent.
    pub fn load_default() -> Result<Self> {
        let path = Path::new("configs/chitra.toml");
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: ChitraConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Parsed aspect ratio, `None` when disabled
    pub fn aspect_ratio(&self) -> Result<Option<AspectRatio>> {
        AspectRatio::parse(&self.image.aspect_ratio)
    }

    /// Reject values the renderer cannot honor.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.image.rotation, 0 | 90 | 180 | 270) {
            return Err(Error::Config(format!(
                "rotation must be 0, 90, 180 or 270, got {}",
                self.image.rotation
            )));
        }
        if self.colors.rooms.is_empty() {
            return Err(Error::Config("room palette is empty".into()));
        }
        if self.decompress.max_concurrent == 0 || self.decompress.queue_capacity == 0 {
            return Err(Error::Config(
                "max_concurrent and queue_capacity must be positive".into(),
            ));
        }
        self.aspect_ratio()
            .map_err(|e| Error::Config(format!("aspect_ratio: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChitraConfig::default();
        assert_eq!(config.image.margin, 100);
        assert_eq!(config.decompress.json_sync_threshold, 100 * 1024);
        assert_eq!(config.decompress.binary_sync_threshold, 150 * 1024);
        assert_eq!(config.decompress.cache_ttl_secs, 600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_content = r#"
[colors]
wall = [10, 20, 30, 255]

[image]
margin = 150
rotation = 90
aspect_ratio = "16,9"
auto_zoom = true

[decompress]
workers = 3
max_concurrent = 2

[persistence]
storage_dir = "/tmp/chitra"
"#;

        let config = ChitraConfig::from_toml(toml_content).unwrap();
        assert_eq!(config.colors.wall, [10, 20, 30, 255]);
        assert_eq!(config.colors.background, [0, 125, 255, 255]);
        assert_eq!(config.image.margin, 150);
        assert_eq!(config.image.rotation, 90);
        assert!(config.image.auto_zoom);
        assert_eq!(config.decompress.worker_count(), 3);
        assert_eq!(config.persistence.storage_dir, "/tmp/chitra");
        assert_eq!(config.obstacle.download_timeout_secs, 6);
        let ratio = config.aspect_ratio().unwrap().unwrap();
        assert_eq!((ratio.width, ratio.height), (16, 9));
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = ChitraConfig::from_toml(include_str!("../../configs/chitra.toml")).unwrap();
        let defaults = ChitraConfig::default();
        assert_eq!(config.colors.no_go, defaults.colors.no_go);
        assert_eq!(config.image.max_empty_frames, defaults.image.max_empty_frames);
        assert_eq!(config.decompress.cache_min_size, defaults.decompress.cache_min_size);
        assert_eq!(config.decompress.worker_count(), defaults.decompress.worker_count());
        assert!(config.aspect_ratio().unwrap().is_none());
    }

    #[test]
    fn test_invalid_rotation_rejected() {
        let result = ChitraConfig::from_toml("[image]\nrotation = 45\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chitra.toml");
        let mut config = ChitraConfig::default();
        config.image.margin = 42;
        config.to_file(&path).unwrap();

        let loaded = ChitraConfig::load(&path).unwrap();
        assert_eq!(loaded.image.margin, 42);
        assert_eq!(loaded.colors.rooms.len(), 16);
    }
}
