//! Chrome DevTools Protocol page surface

use crate::geometry::PageGeometry;
use crate::{CaptureConfig, Error, PageSurface, Result, ScrollOffset, Viewport};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Measures the document the same way for every backend: the largest of
/// the body and root element extents, and the live inner window size.
const GEOMETRY_SCRIPT: &str = r#"
(function() {
    const body = document.body || document.documentElement;
    const html = document.documentElement;
    return JSON.stringify({
        pageWidth: Math.max(body.scrollWidth, body.offsetWidth, html.clientWidth, html.scrollWidth, html.offsetWidth),
        pageHeight: Math.max(body.scrollHeight, body.offsetHeight, html.clientHeight, html.scrollHeight, html.offsetHeight),
        viewportWidth: window.innerWidth,
        viewportHeight: window.innerHeight
    });
})()
"#;

const SCROLL_OFFSET_SCRIPT: &str =
    "JSON.stringify({ x: Math.round(window.scrollX), y: Math.round(window.scrollY) })";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGeometry {
    page_width: u32,
    page_height: u32,
    viewport_width: u32,
    viewport_height: u32,
}

/// CDP-backed surface (uses the `headless_chrome` crate)
///
/// Launches a headless Chrome instance sized to the configured viewport and
/// drives a single tab. Dropping the surface shuts the browser down.
pub struct CdpSurface {
    _browser: Browser,
    tab: Arc<Tab>,
    timeout: Duration,
}

impl CdpSurface {
    pub fn launch(config: &CaptureConfig) -> Result<Self> {
        let Viewport { width, height } = config.viewport;
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((width, height)))
            .idle_browser_timeout(Duration::from_millis(config.timeout_ms.max(30_000)))
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;

        if let Some(ua) = &config.user_agent {
            tab.set_user_agent(ua, None, None)
                .map_err(|e| Error::InitializationError(format!("Failed to set user agent: {}", e)))?;
        }

        Ok(Self {
            _browser: browser,
            tab,
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }

    fn eval_json<T: for<'de> Deserialize<'de>>(&self, script: &str) -> Result<T> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| Error::TransportError(format!("Evaluation failed: {}", e)))?;
        let value = result
            .value
            .ok_or_else(|| Error::TransportError("No value returned from evaluation".into()))?;
        let text = value
            .as_str()
            .ok_or_else(|| Error::TransportError(format!("Expected a JSON string, got {}", value)))?;
        serde_json::from_str(text).map_err(|e| Error::TransportError(format!("Malformed page reply: {}", e)))
    }
}

impl PageSurface for CdpSurface {
    fn url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }

    fn navigate(&mut self, url: &str) -> Result<()> {
        self.tab.set_default_timeout(self.timeout);
        self.tab
            .navigate_to(url)
            .map_err(|e| Error::TransportError(format!("Navigation failed: {}", e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::TransportError(format!("Wait for navigation failed: {}", e)))?;
        debug!("navigated to {}", self.tab.get_url());
        Ok(())
    }

    fn geometry(&mut self) -> Result<PageGeometry> {
        let raw: RawGeometry = self.eval_json(GEOMETRY_SCRIPT)?;
        PageGeometry::new(
            raw.page_width,
            raw.page_height,
            Viewport {
                width: raw.viewport_width,
                height: raw.viewport_height,
            },
        )
    }

    fn scroll_offset(&mut self) -> Result<ScrollOffset> {
        self.eval_json(SCROLL_OFFSET_SCRIPT)
    }

    fn scroll_to(&mut self, x: u32, y: u32) -> Result<()> {
        self.tab.evaluate(&format!("window.scrollTo({}, {})", x, y), false)?;
        Ok(())
    }

    fn capture_viewport(&mut self) -> Result<Vec<u8>> {
        self.tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| {
                warn!("viewport capture failed: {}", e);
                Error::from(e)
            })
    }
}
