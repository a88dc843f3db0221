//! On-disk crop box, one JSON file per device.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::core::{CropBox, DeviceId};
use crate::error::Result;

/// Persisted crop box at `<dir>/auto_crop_<device>.json`.
///
/// Written at most once; only [`reset`](Self::reset) removes it.
#[derive(Clone, Debug)]
pub struct CropStore {
    path: PathBuf,
}

impl CropStore {
    /// Store for one device under `dir`
    pub fn new(dir: impl AsRef<Path>, device: &DeviceId) -> Self {
        let path = dir
            .as_ref()
            .join(format!("auto_crop_{}.json", device.file_stem()));
        Self { path }
    }

    /// File location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when a crop box has been saved
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the saved crop box, `None` when there is none.
    pub fn load(&self) -> Result<Option<CropBox>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `crop` unless a file already exists.
    ///
    /// Returns `true` when the file was written.
    pub fn save_if_absent(&self, crop: &CropBox) -> Result<bool> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        file.write_all(serde_json::to_string_pretty(crop)?.as_bytes())?;
        log::info!("Saved crop box to {}", self.path.display());
        Ok(true)
    }

    /// Delete the saved crop box. Returns `true` when a file was removed.
    pub fn reset(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::info!("Removed crop box {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
