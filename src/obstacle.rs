//! Obstacle photo view.
//!
//! A tap on the map picks the nearest camera-detected obstacle; its photo
//! is downloaded on a worker thread with a hard deadline and shown in place
//! of the map until the next tap.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use parking_lot::Mutex;

use crate::config::ObstacleSection;
use crate::core::{DeviceId, FormatTag, ImageSize, Obstacle, PoolKey, PoolKind};
use crate::draw::RasterBuffer;
use crate::error::{Error, Result};
use crate::resize::{AspectRatio, OffsetResizer};

/// Search radius factor: `round(65 · width / height)` pixels
const SEARCH_RADIUS: f64 = 65.0;

/// Downloads obstacle photos.
pub trait ImageFetcher: Send + Sync {
    /// Fetch `url`, giving up after `timeout`
    fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>>;
}

/// What the camera currently shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CameraMode {
    /// The rendered map
    #[default]
    MapView,
    /// Looking up the tapped obstacle
    ObstacleSearch,
    /// Downloading its photo
    ObstacleDownload,
    /// Showing the photo
    ObstacleView,
}

/// Nearest obstacle to `(x, y)` within `round(65 · width / height)`.
pub fn find_nearest(
    x: i32,
    y: i32,
    obstacles: &[Obstacle],
    width: u32,
    height: u32,
) -> Option<&Obstacle> {
    if height == 0 {
        return None;
    }
    let mut best = (SEARCH_RADIUS * width as f64 / height as f64).round();
    log::debug!("Searching obstacles within {best} px of ({x}, {y})");

    let mut nearest = None;
    for obstacle in obstacles {
        let dx = (x - obstacle.x) as f64;
        let dy = (y - obstacle.y) as f64;
        let distance = dx.hypot(dy);
        if distance < best {
            best = distance;
            nearest = Some(obstacle);
        }
    }
    nearest
}

/// Camera mode state machine plus the downloaded photo.
pub struct ObstacleView {
    fetcher: Arc<dyn ImageFetcher>,
    timeout: Duration,
    deadline: Duration,
    thread_name: String,
    mode: Mutex<CameraMode>,
    image: Mutex<Option<RasterBuffer>>,
}

impl ObstacleView {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, config: &ObstacleSection) -> Self {
        Self::with_timeouts(fetcher, config.timeout(), config.deadline())
    }

    /// `deadline` bounds the whole download, including thread start-up
    pub fn with_timeouts(
        fetcher: Arc<dyn ImageFetcher>,
        timeout: Duration,
        deadline: Duration,
    ) -> Self {
        Self {
            fetcher,
            timeout,
            deadline: deadline.max(timeout),
            thread_name: "obstacle-download".into(),
            mode: Mutex::new(CameraMode::MapView),
            image: Mutex::new(None),
        }
    }

    /// Name download threads after `device`
    pub fn for_device(mut self, device: &DeviceId) -> Self {
        self.thread_name = PoolKey::new(device.clone(), PoolKind::Download).thread_name(0);
        self
    }

    pub fn mode(&self) -> CameraMode {
        *self.mode.lock()
    }

    /// Photo shown in [`CameraMode::ObstacleView`]
    pub fn image(&self) -> Option<RasterBuffer> {
        self.image.lock().clone()
    }

    fn set_mode(&self, mode: CameraMode, reason: &str) {
        *self.mode.lock() = mode;
        log::debug!("Camera mode {mode:?}: {reason}");
    }

    fn map_view(&self, reason: &str) -> CameraMode {
        *self.image.lock() = None;
        self.set_mode(CameraMode::MapView, reason);
        CameraMode::MapView
    }

    /// Handle a tap at `(x, y)` in image pixels.
    ///
    /// In obstacle view any tap returns to the map. While a search or
    /// download is running the tap is ignored. Download failures and
    /// timeouts return to the map and are reported as errors.
    pub fn request(
        &self,
        x: i32,
        y: i32,
        obstacles: &[Obstacle],
        reference: ImageSize,
        ratio: Option<AspectRatio>,
    ) -> Result<CameraMode> {
        match self.mode() {
            CameraMode::ObstacleView => return Ok(self.map_view("exit requested")),
            mode @ (CameraMode::ObstacleSearch | CameraMode::ObstacleDownload) => {
                log::debug!("Obstacle request ignored while in {mode:?}");
                return Ok(mode);
            }
            CameraMode::MapView => {}
        }
        if obstacles.is_empty() {
            return Ok(self.map_view("no obstacles in map"));
        }

        self.set_mode(CameraMode::ObstacleSearch, "obstacle view requested");
        let Some(nearest) = find_nearest(x, y, obstacles, reference.width, reference.height)
        else {
            return Ok(self.map_view("no nearby obstacle"));
        };
        let Some(link) = nearest.link.clone() else {
            return Ok(self.map_view("obstacle has no image"));
        };

        self.set_mode(CameraMode::ObstacleDownload, &link);
        let image = match self.download(&link).and_then(|bytes| decode(&bytes, ratio)) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("Obstacle image {link}: {e}");
                self.map_view("download failed");
                return Err(e);
            }
        };
        *self.image.lock() = Some(image);
        self.set_mode(CameraMode::ObstacleView, "image downloaded");
        Ok(CameraMode::ObstacleView)
    }

    fn download(&self, url: &str) -> Result<Vec<u8>> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let fetcher = Arc::clone(&self.fetcher);
        let owned = url.to_string();
        let timeout = self.timeout;
        thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                let _ = tx.send(fetcher.fetch(&owned, timeout));
            })?;

        match rx.recv_timeout(self.deadline) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(Error::DownloadTimeout(self.deadline)),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::Download("download worker exited".into()))
            }
        }
    }
}

fn decode(bytes: &[u8], ratio: Option<AspectRatio>) -> Result<RasterBuffer> {
    let image = RasterBuffer::from_encoded(bytes)?;
    if ratio.is_none() {
        return Ok(image);
    }
    let reference = image.size();
    Ok(OffsetResizer::new(0, FormatTag::Hypfer)
        .pad_to_aspect(&image, reference, ratio)?
        .image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticFetcher {
        body: Vec<u8>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl StaticFetcher {
        fn png(delay: Duration) -> Arc<Self> {
            let body = RasterBuffer::new(8, 4, [10, 20, 30, 255]).to_png().unwrap();
            Arc::new(Self {
                body,
                delay,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl ImageFetcher for StaticFetcher {
        fn fetch(&self, _url: &str, _timeout: Duration) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            Ok(self.body.clone())
        }
    }

    fn obstacle(x: i32, y: i32, link: Option<&str>) -> Obstacle {
        Obstacle {
            x,
            y,
            label: Some("sock".into()),
            link: link.map(String::from),
        }
    }

    fn view(fetcher: Arc<StaticFetcher>, deadline_ms: u64) -> ObstacleView {
        ObstacleView::with_timeouts(
            fetcher,
            Duration::from_millis(10),
            Duration::from_millis(deadline_ms),
        )
    }

    #[test]
    fn test_find_nearest_radius() {
        let obstacles = vec![obstacle(100, 100, None), obstacle(150, 100, None)];
        // 16:9 reference → radius round(65 · 1.777) = 116
        let hit = find_nearest(140, 100, &obstacles, 1600, 900).unwrap();
        assert_eq!(hit.x, 150);
        assert!(find_nearest(400, 400, &obstacles, 1600, 900).is_none());
        // Square reference → radius 65
        assert!(find_nearest(100, 170, &obstacles, 100, 100).is_none());
        assert!(find_nearest(100, 164, &obstacles, 100, 100).is_some());
    }

    #[test]
    fn test_download_and_exit() {
        let fetcher = StaticFetcher::png(Duration::ZERO);
        let v = view(Arc::clone(&fetcher), 2000);
        let obstacles = vec![obstacle(50, 50, Some("/api/v2/obstacle/1.jpg"))];

        let mode = v
            .request(52, 48, &obstacles, ImageSize::new(200, 200), None)
            .unwrap();
        assert_eq!(mode, CameraMode::ObstacleView);
        assert_eq!(v.image().unwrap().size(), ImageSize::new(8, 4));

        let mode = v
            .request(0, 0, &obstacles, ImageSize::new(200, 200), None)
            .unwrap();
        assert_eq!(mode, CameraMode::MapView);
        assert!(v.image().is_none());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_photo_padded_to_ratio() {
        let v = view(StaticFetcher::png(Duration::ZERO), 2000);
        let obstacles = vec![obstacle(50, 50, Some("/o.png"))];
        let ratio = AspectRatio::new(1, 1).ok();
        v.request(50, 50, &obstacles, ImageSize::new(200, 200), ratio)
            .unwrap();
        let img = v.image().unwrap();
        assert_eq!(img.width(), img.height());
    }

    #[test]
    fn test_timeout_returns_to_map_view() {
        let v = view(StaticFetcher::png(Duration::from_millis(500)), 50);
        let obstacles = vec![obstacle(50, 50, Some("/slow.jpg"))];
        let err = v
            .request(50, 50, &obstacles, ImageSize::new(200, 200), None)
            .unwrap_err();
        assert!(matches!(err, Error::DownloadTimeout(_)));
        assert_eq!(v.mode(), CameraMode::MapView);
    }

    struct NamingFetcher {
        names: Mutex<Vec<String>>,
    }

    impl ImageFetcher for NamingFetcher {
        fn fetch(&self, _url: &str, _timeout: Duration) -> Result<Vec<u8>> {
            let name = thread::current().name().unwrap_or_default().to_string();
            self.names.lock().push(name);
            Err(Error::Download("offline".into()))
        }
    }

    #[test]
    fn test_download_thread_named_after_device() {
        let fetcher = Arc::new(NamingFetcher {
            names: Mutex::new(Vec::new()),
        });
        let v = ObstacleView::with_timeouts(
            Arc::clone(&fetcher) as Arc<dyn ImageFetcher>,
            Duration::from_millis(10),
            Duration::from_secs(2),
        )
        .for_device(&DeviceId::new("valetudo/kitchen"));
        let obstacles = vec![obstacle(50, 50, Some("/o.jpg"))];

        let err = v
            .request(50, 50, &obstacles, ImageSize::new(200, 200), None)
            .unwrap_err();
        assert!(matches!(err, Error::Download(_)));
        assert_eq!(v.mode(), CameraMode::MapView);
        assert_eq!(
            fetcher.names.lock().as_slice(),
            ["valetudo_kitchen-download-0".to_string()]
        );
    }

    #[test]
    fn test_missing_link_or_far_tap_stays_on_map() {
        let fetcher = StaticFetcher::png(Duration::ZERO);
        let v = view(Arc::clone(&fetcher), 2000);
        let no_link = vec![obstacle(50, 50, None)];
        assert_eq!(
            v.request(50, 50, &no_link, ImageSize::new(200, 200), None)
                .unwrap(),
            CameraMode::MapView
        );
        assert_eq!(
            v.request(50, 50, &[], ImageSize::new(200, 200), None).unwrap(),
            CameraMode::MapView
        );
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }
}
