//! Persistence and obstacle download sections.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;

/// Persistence settings section
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceSection {
    /// Directory holding `auto_crop_<device>.json` files
    #[serde(default = "defaults::storage_dir")]
    pub storage_dir: String,
}

impl PersistenceSection {
    /// Storage directory as a path
    pub fn storage_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_dir)
    }
}

impl Default for PersistenceSection {
    fn default() -> Self {
        Self {
            storage_dir: defaults::storage_dir(),
        }
    }
}

/// Obstacle image download settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObstacleSection {
    /// Fetch timeout handed to the downloader (seconds)
    #[serde(default = "defaults::download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Extra wait before the download is abandoned (seconds)
    #[serde(default = "defaults::download_grace_secs")]
    pub download_grace_secs: u64,
}

impl ObstacleSection {
    /// Fetch timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Hard deadline: timeout plus grace
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs.saturating_add(self.download_grace_secs))
    }
}

impl Default for ObstacleSection {
    fn default() -> Self {
        Self {
            download_timeout_secs: defaults::download_timeout_secs(),
            download_grace_secs: defaults::download_grace_secs(),
        }
    }
}
