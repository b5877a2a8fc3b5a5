//! SyntheticPage: an in-memory page backed by a raster.
//!
//! The page behaves like a browser tab as far as the capture loop can tell:
//! it reports geometry, clamps scrolling to the scrollable range and returns
//! PNG-encoded viewport captures. It is deterministic, needs no browser and
//! is what the `stitch` command uses to tile local images.

use crate::codec::{encode_raster, ImageFormat};
use crate::composite::BACKGROUND;
use crate::geometry::PageGeometry;
use crate::{Error, PageSurface, Result, ScrollOffset, Viewport};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Calls observed by a [`SyntheticPage`]
#[derive(Debug, Clone, Default)]
pub struct SurfaceStats {
    /// Every `scroll_to` request, in order
    pub scrolls: Vec<ScrollOffset>,
    pub captures: usize,
}

pub struct SyntheticPage {
    url: String,
    page: RgbaImage,
    viewport: Viewport,
    scroll: ScrollOffset,
    device_scale: u32,
    capture_delay: Duration,
    fail_after: Option<usize>,
    garbage_after: Option<usize>,
    stats: Arc<Mutex<SurfaceStats>>,
}

impl SyntheticPage {
    pub fn from_image(url: &str, page: RgbaImage, viewport: Viewport) -> Self {
        Self {
            url: url.to_string(),
            page,
            viewport,
            scroll: ScrollOffset::default(),
            device_scale: 1,
            capture_delay: Duration::ZERO,
            fail_after: None,
            garbage_after: None,
            stats: Arc::new(Mutex::new(SurfaceStats::default())),
        }
    }

    /// A page whose pixels are derived from `seed`. Every pixel encodes its
    /// own coordinates, so misplaced segments show up in comparisons.
    pub fn from_seed(url: &str, width: u32, height: u32, viewport: Viewport, seed: &[u8]) -> Self {
        Self::from_image(url, seeded_raster(width, height, seed), viewport)
    }

    /// Report captures at `scale` device pixels per CSS pixel.
    pub fn with_device_scale(mut self, scale: u32) -> Self {
        self.device_scale = scale.max(1);
        self
    }

    /// Sleep this long inside every viewport capture.
    pub fn with_capture_delay(mut self, delay: Duration) -> Self {
        self.capture_delay = delay;
        self
    }

    /// Fail every viewport capture after the first `n` succeeded.
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Answer every viewport capture after the first `n` with bytes that
    /// are not an image.
    pub fn returning_garbage_after(mut self, n: usize) -> Self {
        self.garbage_after = Some(n);
        self
    }

    /// Shared handle to the call statistics; stays valid after the page has
    /// been moved to another thread.
    pub fn stats(&self) -> Arc<Mutex<SurfaceStats>> {
        self.stats.clone()
    }

    pub fn raster(&self) -> &RgbaImage {
        &self.page
    }

    fn page_geometry(&self) -> Result<PageGeometry> {
        PageGeometry::new(self.page.width(), self.page.height(), self.viewport)
    }
}

impl PageSurface for SyntheticPage {
    fn url(&self) -> Result<String> {
        Ok(self.url.clone())
    }

    fn navigate(&mut self, url: &str) -> Result<()> {
        self.url = url.to_string();
        self.scroll = ScrollOffset::default();
        Ok(())
    }

    fn geometry(&mut self) -> Result<PageGeometry> {
        self.page_geometry()
    }

    fn scroll_offset(&mut self) -> Result<ScrollOffset> {
        Ok(self.scroll)
    }

    fn scroll_to(&mut self, x: u32, y: u32) -> Result<()> {
        let (max_x, max_y) = self.page_geometry()?.max_scroll();
        self.scroll = ScrollOffset {
            x: x.min(max_x),
            y: y.min(max_y),
        };
        if let Ok(mut stats) = self.stats.lock() {
            stats.scrolls.push(ScrollOffset { x, y });
        }
        Ok(())
    }

    fn capture_viewport(&mut self) -> Result<Vec<u8>> {
        if !self.capture_delay.is_zero() {
            std::thread::sleep(self.capture_delay);
        }
        let captured = {
            let mut stats = self
                .stats
                .lock()
                .map_err(|_| Error::TransportError("surface statistics poisoned".into()))?;
            stats.captures += 1;
            stats.captures
        };
        if let Some(limit) = self.fail_after {
            if captured > limit {
                return Err(Error::TransportError(format!(
                    "viewport capture {} refused by page",
                    captured
                )));
            }
        }
        if self.garbage_after.is_some_and(|limit| captured > limit) {
            return Ok(b"<html>not an image</html>".to_vec());
        }

        let mut view = RgbaImage::from_pixel(self.viewport.width, self.viewport.height, BACKGROUND);
        let x = self.scroll.x.min(self.page.width());
        let y = self.scroll.y.min(self.page.height());
        let w = self.viewport.width.min(self.page.width() - x);
        let h = self.viewport.height.min(self.page.height() - y);
        if w > 0 && h > 0 {
            let visible = imageops::crop_imm(&self.page, x, y, w, h).to_image();
            imageops::replace(&mut view, &visible, 0, 0);
        }
        if self.device_scale > 1 {
            view = imageops::resize(
                &view,
                view.width() * self.device_scale,
                view.height() * self.device_scale,
                FilterType::Nearest,
            );
        }
        encode_raster(&view, ImageFormat::Png, 1.0)
    }
}

/// Deterministic test raster derived from `seed`.
pub fn seeded_raster(width: u32, height: u32, seed: &[u8]) -> RgbaImage {
    let key = Sha256::digest(seed);
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x as u8).wrapping_add(key[0]),
            (y as u8).wrapping_add(key[1]),
            (((x >> 8) as u8) ^ ((y >> 8) as u8).wrapping_mul(16)).wrapping_add(key[2]),
            255,
        ])
    })
}
