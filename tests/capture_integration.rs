//! Full-page capture against the synthetic page backend

use fullshot::synthetic::SyntheticPage;
use fullshot::{CaptureConfig, Error, ImageFormat, PageSurface, ScrollOffset, SegmentCapturer, Viewport};
use image::{Rgba, RgbaImage};
use sha2::{Digest, Sha256};

fn config(width: u32, height: u32) -> CaptureConfig {
    CaptureConfig {
        viewport: Viewport { width, height },
        settle_delay_ms: 0,
        ..Default::default()
    }
}

fn pixel_digest(img: &RgbaImage) -> String {
    hex::encode(Sha256::digest(img.as_raw()))
}

#[test]
fn two_by_two_grid_reassembles_page() {
    let viewport = Viewport {
        width: 1000,
        height: 800,
    };
    let mut page = SyntheticPage::from_seed("https://example.com/wide", 2000, 1500, viewport, b"grid");
    let expected = pixel_digest(page.raster());
    let stats = page.stats();

    let capturer = SegmentCapturer::new(config(1000, 800));
    let shot = capturer.capture(&mut page).expect("capture failed");

    assert_eq!((shot.width, shot.height), (2000, 1500));
    assert_eq!(shot.format, ImageFormat::Png);
    assert_eq!(pixel_digest(&shot.decode().unwrap()), expected);

    let stats = stats.lock().unwrap();
    assert_eq!(stats.captures, 4);
    assert_eq!(
        stats.scrolls,
        vec![
            ScrollOffset { x: 0, y: 0 },
            ScrollOffset { x: 1000, y: 0 },
            ScrollOffset { x: 0, y: 800 },
            ScrollOffset { x: 1000, y: 800 },
            // restore
            ScrollOffset { x: 0, y: 0 },
        ]
    );
}

#[test]
fn tall_page_with_remainder_row() {
    let viewport = Viewport {
        width: 640,
        height: 480,
    };
    let mut page = SyntheticPage::from_seed("https://example.com/tall", 640, 2000, viewport, b"tall");
    let expected = pixel_digest(page.raster());

    let shot = SegmentCapturer::new(config(640, 480)).capture(&mut page).unwrap();
    assert_eq!((shot.width, shot.height), (640, 2000));
    assert_eq!(pixel_digest(&shot.decode().unwrap()), expected);
    // five rows of one column
    assert_eq!(page.stats().lock().unwrap().captures, 5);
}

#[test]
fn page_smaller_than_viewport_is_padded() {
    let viewport = Viewport {
        width: 400,
        height: 300,
    };
    let raster = RgbaImage::from_pixel(200, 100, Rgba([10, 20, 30, 255]));
    let mut page = SyntheticPage::from_image("https://example.com/short", raster, viewport);

    let shot = SegmentCapturer::new(config(400, 300)).capture(&mut page).unwrap();
    assert_eq!((shot.width, shot.height), (400, 300));
    let img = shot.decode().unwrap();
    assert_eq!(*img.get_pixel(5, 5), Rgba([10, 20, 30, 255]));
    assert_eq!(*img.get_pixel(399, 299), Rgba([255, 255, 255, 255]));
}

#[test]
fn restricted_pages_are_never_scrolled() {
    let viewport = Viewport::default();
    for url in ["chrome://settings", "chrome-extension://abc/popup.html", "about:blank"] {
        let mut page = SyntheticPage::from_seed(url, 1280, 3000, viewport, b"restricted");
        let stats = page.stats();
        let err = SegmentCapturer::new(config(1280, 720)).capture(&mut page).unwrap_err();
        assert!(matches!(err, Error::PageNotAccessible(_)), "{}: {:?}", url, err);
        let stats = stats.lock().unwrap();
        assert!(stats.scrolls.is_empty());
        assert_eq!(stats.captures, 0);
    }
}

#[test]
fn failed_capture_restores_scroll_position() {
    let viewport = Viewport {
        width: 500,
        height: 400,
    };
    let mut page =
        SyntheticPage::from_seed("https://example.com/flaky", 500, 2000, viewport, b"flaky").failing_after(2);
    page.scroll_to(0, 300).unwrap();

    let err = SegmentCapturer::new(config(500, 400)).capture(&mut page).unwrap_err();
    assert!(matches!(err, Error::TransportError(_)), "{:?}", err);
    assert_eq!(page.scroll_offset().unwrap(), ScrollOffset { x: 0, y: 300 });
}

#[test]
fn undecodable_viewport_aborts_and_restores_scroll() {
    let viewport = Viewport {
        width: 500,
        height: 400,
    };
    let mut page = SyntheticPage::from_seed("https://example.com/garbled", 1000, 1200, viewport, b"garbled")
        .returning_garbage_after(1);
    let stats = page.stats();
    page.scroll_to(250, 600).unwrap();

    let err = SegmentCapturer::new(config(500, 400)).capture(&mut page).unwrap_err();
    assert!(matches!(err, Error::DecodeError(_)), "{:?}", err);
    assert_eq!(page.scroll_offset().unwrap(), ScrollOffset { x: 250, y: 600 });
    // aborted at the second segment
    assert_eq!(stats.lock().unwrap().captures, 2);
}

#[test]
fn successful_capture_restores_scroll_position() {
    let viewport = Viewport {
        width: 500,
        height: 400,
    };
    let mut page = SyntheticPage::from_seed("https://example.com/restore", 500, 2000, viewport, b"restore");
    page.scroll_to(0, 1234).unwrap();

    SegmentCapturer::new(config(500, 400)).capture(&mut page).unwrap();
    assert_eq!(page.scroll_offset().unwrap(), ScrollOffset { x: 0, y: 1234 });
}

#[test]
fn overlapping_capture_is_rejected() {
    let viewport = Viewport {
        width: 300,
        height: 200,
    };
    let mut page = SyntheticPage::from_seed("https://example.com/busy", 300, 600, viewport, b"busy");
    let capturer = SegmentCapturer::new(config(300, 200));
    let other = capturer.clone();

    let guard = capturer.try_begin().unwrap();
    assert!(other.is_capturing());
    assert!(matches!(other.capture(&mut page), Err(Error::CaptureInProgress)));
    assert!(page.stats().lock().unwrap().scrolls.is_empty());

    drop(guard);
    assert!(!other.is_capturing());
    assert!(other.capture(&mut page).is_ok());
    assert!(!capturer.is_capturing());
}

#[test]
fn high_dpi_captures_are_scaled_to_css_pixels() {
    let viewport = Viewport {
        width: 320,
        height: 240,
    };
    let mut page =
        SyntheticPage::from_seed("https://example.com/retina", 640, 480, viewport, b"dpr").with_device_scale(2);

    let shot = SegmentCapturer::new(config(320, 240)).capture(&mut page).unwrap();
    assert_eq!((shot.width, shot.height), (640, 480));
}

#[test]
fn jpeg_output() {
    let viewport = Viewport {
        width: 300,
        height: 200,
    };
    let mut page = SyntheticPage::from_seed("https://example.com/jpeg", 300, 500, viewport, b"jpeg");
    let cfg = CaptureConfig {
        format: ImageFormat::Jpeg,
        quality: 0.7,
        ..config(300, 200)
    };

    let shot = SegmentCapturer::new(cfg).capture(&mut page).unwrap();
    assert_eq!(shot.format, ImageFormat::Jpeg);
    assert_eq!(&shot.data[0..2], &[0xFF, 0xD8]);
    assert!(shot.to_data_url().starts_with("data:image/jpeg;base64,"));
    assert_eq!((shot.width, shot.height), (300, 500));
}

#[test]
fn pdf_output_is_unsupported() {
    let viewport = Viewport {
        width: 300,
        height: 200,
    };
    let mut page = SyntheticPage::from_seed("https://example.com/pdf", 300, 200, viewport, b"pdf");
    let cfg = CaptureConfig {
        format: ImageFormat::Pdf,
        ..config(300, 200)
    };
    let err = SegmentCapturer::new(cfg).capture(&mut page).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)));
    // the page is left where it was
    assert_eq!(page.scroll_offset().unwrap(), ScrollOffset::default());
}
