//! Explicit registry of per-device state.
//!
//! Owns the shared [`DecompressionManager`] and one [`DeviceHandle`] per
//! vacuum. Devices are created on first use and torn down explicitly.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::ChitraConfig;
use crate::core::{DeviceId, FormatTag};
use crate::decompress::DecompressionManager;
use crate::error::Result;
use crate::obstacle::{ImageFetcher, ObstacleView};
use crate::render::{RenderContext, RenderPipeline, RenderedFrame};

/// State owned by one vacuum.
pub struct DeviceHandle {
    /// Frame renderer
    pub pipeline: RenderPipeline,
    /// Obstacle photo view, when a fetcher is configured
    pub obstacles: Option<ObstacleView>,
}

/// All known devices plus the decoder they share.
pub struct DeviceRegistry {
    config: ChitraConfig,
    manager: Arc<DecompressionManager>,
    fetcher: Option<Arc<dyn ImageFetcher>>,
    devices: RwLock<HashMap<DeviceId, Arc<DeviceHandle>>>,
}

impl DeviceRegistry {
    pub fn new(config: ChitraConfig) -> Self {
        let manager = Arc::new(DecompressionManager::new(config.decompress.clone()));
        Self {
            config,
            manager,
            fetcher: None,
            devices: RwLock::new(HashMap::new()),
        }
    }

    /// Give new devices an obstacle view backed by `fetcher`
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn config(&self) -> &ChitraConfig {
        &self.config
    }

    pub fn manager(&self) -> &Arc<DecompressionManager> {
        &self.manager
    }

    /// Handle of a known device
    pub fn get(&self, device: &DeviceId) -> Option<Arc<DeviceHandle>> {
        self.devices.read().get(device).cloned()
    }

    /// Handle of `device`, created on first use.
    pub fn get_or_create(&self, device: &DeviceId) -> Arc<DeviceHandle> {
        if let Some(handle) = self.get(device) {
            return handle;
        }
        let mut devices = self.devices.write();
        let handle = devices.entry(device.clone()).or_insert_with(|| {
            log::info!("Registered device {device}");
            Arc::new(DeviceHandle {
                pipeline: RenderPipeline::new(
                    device.clone(),
                    self.config.persistence.storage_path(),
                    self.config.image.max_empty_frames,
                ),
                obstacles: self
                    .fetcher
                    .as_ref()
                    .map(|f| {
                        ObstacleView::new(Arc::clone(f), &self.config.obstacle).for_device(device)
                    }),
            })
        });
        Arc::clone(handle)
    }

    /// Registered device ids, sorted
    pub fn devices(&self) -> Vec<DeviceId> {
        let mut ids: Vec<_> = self.devices.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Decode and render a payload for the device named by `topic`.
    pub fn handle_payload(
        &self,
        topic: &str,
        payload: &[u8],
        format: FormatTag,
        ctx: &RenderContext,
    ) -> Result<Option<Arc<RenderedFrame>>> {
        let device = DeviceId::from_topic(topic);
        let handle = self.get_or_create(&device);
        handle
            .pipeline
            .process(&self.manager, topic, payload, format, ctx)
    }

    /// Drop a device and stop its worker pool.
    ///
    /// Returns `false` when the device was not registered.
    pub fn remove(&self, device: &DeviceId) -> bool {
        let removed = self.devices.write().remove(device).is_some();
        if removed {
            self.manager.remove_device(device);
            log::info!("Removed device {device}");
        }
        removed
    }

    /// Remove every device and shut the manager down.
    pub fn shutdown(&self) {
        self.devices.write().clear();
        self.manager.shutdown();
    }
}
