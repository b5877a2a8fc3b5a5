//! Page geometry and the segment grid used to tile a page into viewports

use crate::{Error, Result, Viewport};

/// Dimensions of the full page and of the live viewport, in pixels.
///
/// The page is never smaller than the viewport: [`PageGeometry::new`] lifts
/// a short or narrow page to the viewport size so every grid has at least
/// one full segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageGeometry {
    pub page_width: u32,
    pub page_height: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl PageGeometry {
    pub fn new(page_width: u32, page_height: u32, viewport: Viewport) -> Result<Self> {
        if viewport.width == 0 || viewport.height == 0 {
            return Err(Error::ConfigError(format!(
                "viewport must be non-empty, got {}x{}",
                viewport.width, viewport.height
            )));
        }
        Ok(Self {
            page_width: page_width.max(viewport.width),
            page_height: page_height.max(viewport.height),
            viewport_width: viewport.width,
            viewport_height: viewport.height,
        })
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.viewport_width,
            height: self.viewport_height,
        }
    }

    pub fn columns(&self) -> u32 {
        self.page_width.div_ceil(self.viewport_width)
    }

    pub fn rows(&self) -> u32 {
        self.page_height.div_ceil(self.viewport_height)
    }

    /// Largest scroll offset the page allows on each axis
    pub fn max_scroll(&self) -> (u32, u32) {
        (
            self.page_width - self.viewport_width,
            self.page_height - self.viewport_height,
        )
    }

    pub fn grid(&self) -> SegmentGrid {
        SegmentGrid::new(*self)
    }
}

/// One viewport-sized tile of the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub row: u32,
    pub col: u32,
    /// Page coordinates of the tile origin
    pub x: u32,
    pub y: u32,
    /// Size of the tile, clamped to the page on the last row/column
    pub draw_width: u32,
    pub draw_height: u32,
}

/// Row-major sequence of segments covering a page.
///
/// Iteration order is top-to-bottom, left-to-right and is the order in
/// which segments are scrolled to, captured and composited.
#[derive(Debug, Clone)]
pub struct SegmentGrid {
    geometry: PageGeometry,
    rows: u32,
    cols: u32,
}

impl SegmentGrid {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            rows: geometry.rows(),
            cols: geometry.columns(),
            geometry,
        }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Segment at `(row, col)`, or `None` outside the grid
    pub fn segment(&self, row: u32, col: u32) -> Option<Segment> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let g = &self.geometry;
        let x = col * g.viewport_width;
        let y = row * g.viewport_height;
        Some(Segment {
            row,
            col,
            x,
            y,
            draw_width: g.viewport_width.min(g.page_width - x),
            draw_height: g.viewport_height.min(g.page_height - y),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Segment> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.cols).filter_map(move |col| self.segment(row, col))
        })
    }
}
