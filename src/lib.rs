//! fullshot
//!
//! Full-page screenshots for Rust: scroll a page through viewport-sized
//! segments, stitch the captures into one composite image, annotate the
//! result and keep a local history of captures.
//!
//! # Features
//!
//! - **Segment capture**: row-major scroll-and-capture loop over any
//!   [`PageSurface`] backend
//! - **CDP Backend** (`cdp` feature): drives headless Chrome via the
//!   Chrome DevTools Protocol
//! - **Synthetic Backend**: deterministic in-memory page, also used to
//!   stitch local images through a simulated viewport
//! - **Annotation editor**: pen, rectangle and arrow tools with bounded
//!   undo/redo
//! - **Library**: captures and settings persisted in a key-value store
//!
//! # Example
//!
//! ```
//! use fullshot::synthetic::SyntheticPage;
//! use fullshot::{CaptureConfig, SegmentCapturer, Viewport};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let viewport = Viewport { width: 100, height: 80 };
//! let mut page = SyntheticPage::from_seed("https://example.com/", 250, 170, viewport, b"demo");
//! let capturer = SegmentCapturer::new(CaptureConfig {
//!     viewport,
//!     settle_delay_ms: 0,
//!     ..Default::default()
//! });
//! let shot = capturer.capture(&mut page)?;
//! assert_eq!((shot.width, shot.height), (250, 170));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod codec;
pub mod composite;
pub mod geometry;
pub mod restricted;

pub mod capture;
pub mod synthetic;

// Chrome DevTools Protocol page surface
#[cfg(feature = "cdp")]
pub mod cdp;

// Async coordinator owning a surface on a worker thread
pub mod service;

pub mod annotate;
pub mod download;
pub mod i18n;
pub mod library;
pub mod store;

pub use capture::{CaptureGuard, SegmentCapturer};
pub use codec::{CapturedImage, ImageFormat};
pub use geometry::{PageGeometry, Segment, SegmentGrid};
pub use service::{CaptureOutcome, CaptureService};

/// Default delay between scrolling and capturing a segment
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 500;

/// Default watchdog applied to a whole capture by [`CaptureService`]
pub const DEFAULT_CAPTURE_TIMEOUT_MS: u64 = 60_000;

/// Configuration for a capture
///
/// The defaults mirror what an interactive capture needs: a desktop-sized
/// viewport, a settle delay long enough for lazy content to paint, a one
/// minute watchdog and lossless PNG output.
///
/// # Examples
///
/// ```
/// let cfg = fullshot::CaptureConfig::default();
/// assert_eq!(cfg.settle_delay_ms, 500);
/// assert_eq!(cfg.format, fullshot::ImageFormat::Png);
/// ```
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Viewport dimensions used by backends that create their own window
    pub viewport: Viewport,
    /// Time to wait after each scroll before capturing, in milliseconds
    pub settle_delay_ms: u64,
    /// Watchdog for a whole capture in milliseconds
    pub timeout_ms: u64,
    /// Output format of the composite image
    pub format: ImageFormat,
    /// Lossy quality in `0.0..=1.0` (ignored for PNG)
    pub quality: f32,
    /// User agent string for backends that load pages themselves
    pub user_agent: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            timeout_ms: DEFAULT_CAPTURE_TIMEOUT_MS,
            format: ImageFormat::Png,
            quality: 0.9,
            user_agent: None,
        }
    }
}

impl CaptureConfig {
    /// Check the configuration for values no capture can work with.
    pub fn validate(&self) -> Result<()> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::ConfigError(format!(
                "viewport must be non-empty, got {}x{}",
                self.viewport.width, self.viewport.height
            )));
        }
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(Error::ConfigError(format!(
                "quality must be within 0.0..=1.0, got {}",
                self.quality
            )));
        }
        if self.timeout_ms == 0 {
            return Err(Error::ConfigError("timeout must be positive".into()));
        }
        Ok(())
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Scroll position of a page in CSS pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
pub struct ScrollOffset {
    pub x: u32,
    pub y: u32,
}

/// A page that can be scrolled and whose visible viewport can be captured.
///
/// This is the seam between the capture loop and a concrete browser
/// backend. Implementations are driven from a single thread; the capture
/// loop never calls them concurrently.
pub trait PageSurface {
    /// Current URL of the page
    fn url(&self) -> Result<String>;

    /// Load a URL and wait for the page to be ready
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Measure the full content box and the live viewport
    fn geometry(&mut self) -> Result<PageGeometry>;

    /// Current scroll offset
    fn scroll_offset(&mut self) -> Result<ScrollOffset>;

    /// Scroll so `(x, y)` is the top-left corner of the viewport. Backends
    /// may clamp to the scrollable range.
    fn scroll_to(&mut self, x: u32, y: u32) -> Result<()>;

    /// Capture the currently visible viewport as an encoded image
    fn capture_viewport(&mut self) -> Result<Vec<u8>>;
}

impl<S: PageSurface + ?Sized> PageSurface for Box<S> {
    fn url(&self) -> Result<String> {
        (**self).url()
    }

    fn navigate(&mut self, url: &str) -> Result<()> {
        (**self).navigate(url)
    }

    fn geometry(&mut self) -> Result<PageGeometry> {
        (**self).geometry()
    }

    fn scroll_offset(&mut self) -> Result<ScrollOffset> {
        (**self).scroll_offset()
    }

    fn scroll_to(&mut self, x: u32, y: u32) -> Result<()> {
        (**self).scroll_to(x, y)
    }

    fn capture_viewport(&mut self) -> Result<Vec<u8>> {
        (**self).capture_viewport()
    }
}

/// Milliseconds since the Unix epoch, used for timestamps and ids
pub fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}
