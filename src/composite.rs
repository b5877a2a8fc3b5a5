//! The full-page raster that viewport captures are stitched into

use crate::geometry::{PageGeometry, Segment};
use crate::{Error, Result, ScrollOffset, Viewport};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use log::warn;

/// Canvases above this many bytes get a warning; nothing caps the size.
const LARGE_CANVAS_BYTES: u64 = 512 * 1024 * 1024;

pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Composite raster sized to the full page and pre-filled with opaque white
/// so segments shorter than a viewport leave no transparent gaps.
pub struct CompositeCanvas {
    raster: RgbaImage,
}

impl CompositeCanvas {
    pub fn new(geometry: &PageGeometry) -> Self {
        let bytes = geometry.page_width as u64 * geometry.page_height as u64 * 4;
        if bytes > LARGE_CANVAS_BYTES {
            warn!(
                "allocating a {}x{} composite canvas ({} MiB)",
                geometry.page_width,
                geometry.page_height,
                bytes / (1024 * 1024)
            );
        }
        Self {
            raster: RgbaImage::from_pixel(geometry.page_width, geometry.page_height, BACKGROUND),
        }
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    /// Draw the part of a viewport capture that belongs to `segment`.
    ///
    /// `scroll` is the offset the page actually had when `shot` was taken.
    /// It differs from the segment origin when the page clamped scrolling on
    /// the last row or column; the source region is shifted accordingly.
    pub fn draw_segment(&mut self, shot: &RgbaImage, segment: &Segment, scroll: ScrollOffset) -> Result<()> {
        let sx = segment.x.saturating_sub(scroll.x);
        let sy = segment.y.saturating_sub(scroll.y);
        if sx >= shot.width() || sy >= shot.height() {
            return Err(Error::Other(format!(
                "viewport capture at ({}, {}) does not cover segment ({}, {})",
                scroll.x, scroll.y, segment.row, segment.col
            )));
        }
        let width = segment.draw_width.min(shot.width() - sx);
        let height = segment.draw_height.min(shot.height() - sy);
        if width < segment.draw_width || height < segment.draw_height {
            warn!(
                "segment ({}, {}) only partially covered: {}x{} of {}x{}",
                segment.row, segment.col, width, height, segment.draw_width, segment.draw_height
            );
        }
        let tile = imageops::crop_imm(shot, sx, sy, width, height).to_image();
        imageops::replace(&mut self.raster, &tile, segment.x as i64, segment.y as i64);
        Ok(())
    }

    pub fn into_raster(self) -> RgbaImage {
        self.raster
    }
}

/// Resample a capture taken at a device pixel ratio other than 1 down (or
/// up) to CSS viewport pixels.
pub fn fit_to_viewport(shot: RgbaImage, viewport: Viewport) -> RgbaImage {
    if shot.dimensions() == (viewport.width, viewport.height) {
        return shot;
    }
    imageops::resize(&shot, viewport.width, viewport.height, FilterType::Triangle)
}
