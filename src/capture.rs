//! Segment capture: scroll, settle, capture the viewport, composite

use crate::codec::{decode_raster, CapturedImage};
use crate::composite::{fit_to_viewport, CompositeCanvas};
use crate::{restricted, CaptureConfig, Error, PageSurface, Result};
use image::RgbaImage;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Captures a full scrollable page by stitching viewport captures.
///
/// Clones share the in-progress flag: only one capture runs at a time per
/// capturer family, and a second attempt fails with
/// [`Error::CaptureInProgress`] instead of interleaving scroll positions.
#[derive(Clone)]
pub struct SegmentCapturer {
    config: CaptureConfig,
    busy: Arc<AtomicBool>,
}

/// Marks a capture as in flight until dropped.
pub struct CaptureGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl SegmentCapturer {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn is_capturing(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claim the capturer, or fail immediately if a capture is running.
    pub fn try_begin(&self) -> Result<CaptureGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::CaptureInProgress)?;
        Ok(CaptureGuard {
            flag: self.busy.clone(),
        })
    }

    /// Capture the full page behind `surface`.
    pub fn capture<S: PageSurface + ?Sized>(&self, surface: &mut S) -> Result<CapturedImage> {
        let guard = self.try_begin()?;
        self.capture_with(surface, &guard)
    }

    /// Capture with a guard obtained earlier from [`SegmentCapturer::try_begin`].
    /// Used when the claim and the capture happen on different threads.
    pub fn capture_with<S: PageSurface + ?Sized>(
        &self,
        surface: &mut S,
        guard: &CaptureGuard,
    ) -> Result<CapturedImage> {
        if !Arc::ptr_eq(&guard.flag, &self.busy) {
            return Err(Error::Other("capture guard belongs to another capturer".into()));
        }

        let url = surface.url()?;
        restricted::ensure_capturable(&url)?;

        let started = Instant::now();
        let origin = surface.scroll_offset()?;
        let stitched = self.stitch(surface);

        // Restore even when stitching failed
        if let Err(e) = surface.scroll_to(origin.x, origin.y) {
            warn!("failed to restore scroll position ({}, {}): {}", origin.x, origin.y, e);
        }

        let raster = stitched?;
        let image = CapturedImage::encode(&raster, self.config.format, self.config.quality)?;
        info!(
            "captured {} as {}x{} {} in {:?}",
            url,
            image.width,
            image.height,
            image.format,
            started.elapsed()
        );
        Ok(image)
    }

    fn stitch<S: PageSurface + ?Sized>(&self, surface: &mut S) -> Result<RgbaImage> {
        let geometry = surface.geometry()?;
        let grid = geometry.grid();
        debug!(
            "page {}x{}, viewport {}x{}, {} rows x {} cols",
            geometry.page_width,
            geometry.page_height,
            geometry.viewport_width,
            geometry.viewport_height,
            grid.rows(),
            grid.cols()
        );

        let mut canvas = CompositeCanvas::new(&geometry);
        let settle = Duration::from_millis(self.config.settle_delay_ms);

        for segment in grid.iter() {
            surface.scroll_to(segment.x, segment.y)?;
            std::thread::sleep(settle);
            let scrolled = surface.scroll_offset()?;

            let bytes = surface.capture_viewport()?;
            let shot = fit_to_viewport(decode_raster(&bytes)?, geometry.viewport());
            canvas.draw_segment(&shot, &segment, scrolled)?;
            debug!("segment ({}, {}) composited at ({}, {})", segment.row, segment.col, segment.x, segment.y);
        }

        Ok(canvas.into_raster())
    }
}
