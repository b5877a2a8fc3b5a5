//! Annotating a capture and keeping it in the screenshot library

use fullshot::annotate::draw::STROKE_COLOR;
use fullshot::annotate::{EditOp, Editor, Point, Tool, HISTORY_CAP};
use fullshot::library::{ScreenshotLibrary, Settings};
use fullshot::store::{JsonFileStore, KeyValueStore, MemoryStore};
use fullshot::synthetic::SyntheticPage;
use fullshot::{CaptureOutcome, ImageFormat, SegmentCapturer, Viewport};
use image::{Rgba, RgbaImage};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

fn captured(url: &str, id: &str, timestamp: u64) -> CaptureOutcome {
    let viewport = Viewport {
        width: 200,
        height: 150,
    };
    let mut page = SyntheticPage::from_seed(url, 200, 400, viewport, id.as_bytes());
    let capturer = SegmentCapturer::new(fullshot::CaptureConfig {
        viewport,
        settle_delay_ms: 0,
        ..Default::default()
    });
    CaptureOutcome {
        id: id.to_string(),
        image: capturer.capture(&mut page).unwrap(),
        url: url.to_string(),
        timestamp,
    }
}

#[test]
fn drawing_undo_redo_through_pointer_events() {
    let mut editor = Editor::new(RgbaImage::from_pixel(120, 80, WHITE)).unwrap();
    editor.set_tool(Some(Tool::Draw));
    editor.pointer_down(Point::new(10.5, 40.5));
    editor.pointer_move(Point::new(60.5, 40.5)).unwrap();
    editor.pointer_move(Point::new(110.5, 40.5)).unwrap();
    editor.pointer_up().unwrap();

    assert_eq!(*editor.canvas().get_pixel(35, 40), STROKE_COLOR);
    assert_eq!(*editor.canvas().get_pixel(90, 40), STROKE_COLOR);
    assert_eq!(editor.history().len(), 2);

    assert!(editor.undo().unwrap());
    assert_eq!(*editor.canvas().get_pixel(35, 40), WHITE);
    assert!(!editor.undo().unwrap());

    assert!(editor.redo().unwrap());
    assert_eq!(*editor.canvas().get_pixel(90, 40), STROKE_COLOR);
    assert!(!editor.redo().unwrap());
}

#[test]
fn new_edit_after_undo_discards_redo_branch() {
    let mut editor = Editor::new(RgbaImage::from_pixel(100, 100, WHITE)).unwrap();
    editor
        .apply(&EditOp::Rect {
            from: Point::new(10.5, 10.5),
            to: Point::new(40.5, 40.5),
        })
        .unwrap();
    editor.apply(&EditOp::Undo).unwrap();
    editor
        .apply(&EditOp::Arrow {
            from: Point::new(50.5, 90.5),
            to: Point::new(90.5, 90.5),
        })
        .unwrap();

    assert_eq!(editor.history().len(), 2);
    assert!(!editor.history().can_redo());
    // the rectangle is gone for good
    assert_eq!(*editor.canvas().get_pixel(10, 25), WHITE);
    assert_eq!(*editor.canvas().get_pixel(70, 90), STROKE_COLOR);
}

#[test]
fn crop_tool_and_clicks_do_not_record() {
    let mut editor = Editor::new(RgbaImage::from_pixel(50, 50, WHITE)).unwrap();
    editor.set_tool(Some(Tool::Crop));
    editor.pointer_down(Point::new(1.0, 1.0));
    editor.pointer_move(Point::new(40.0, 40.0)).unwrap();
    editor.pointer_up().unwrap();

    editor.set_tool(Some(Tool::Rect));
    editor.pointer_down(Point::new(5.0, 5.0));
    editor.pointer_up().unwrap();

    assert_eq!(editor.history().len(), 1);
    assert!(editor.canvas().pixels().all(|p| *p == WHITE));
}

#[test]
fn history_is_capped() {
    let mut editor = Editor::new(RgbaImage::from_pixel(64, 64, WHITE)).unwrap();
    for i in 0..(HISTORY_CAP + 5) {
        let y = (i % 60) as f32 + 0.5;
        editor
            .apply(&EditOp::Draw {
                points: vec![Point::new(2.5, y), Point::new(60.5, y)],
            })
            .unwrap();
    }
    assert_eq!(editor.history().len(), HISTORY_CAP);
    assert_eq!(editor.history().index(), Some(HISTORY_CAP - 1));

    let mut undone = 0;
    while editor.undo().unwrap() {
        undone += 1;
    }
    assert_eq!(undone, HISTORY_CAP - 1);
    // the oldest strokes were folded into the first surviving entry
    assert_eq!(*editor.canvas().get_pixel(30, 0), STROKE_COLOR);
}

#[test]
fn clear_is_undoable() {
    let mut editor = Editor::new(RgbaImage::from_pixel(60, 60, WHITE)).unwrap();
    let ops: Vec<EditOp> = serde_json::from_str(
        r#"[
            {"op": "rect", "from": {"x": 5.5, "y": 5.5}, "to": {"x": 50.5, "y": 50.5}},
            {"op": "clear"}
        ]"#,
    )
    .unwrap();
    for op in &ops {
        editor.apply(op).unwrap();
    }
    assert!(editor.canvas().pixels().all(|p| *p == WHITE));
    editor.apply(&EditOp::Undo).unwrap();
    assert_eq!(*editor.canvas().get_pixel(5, 30), STROKE_COLOR);
}

#[test]
fn edited_capture_replaces_library_entry() {
    let mut library = ScreenshotLibrary::new(MemoryStore::new());
    let outcome = captured("https://example.com/edit", "canvas_1", 1_000);
    library.save_capture(&outcome).unwrap();

    let record = library.get("canvas_1").unwrap();
    let mut editor = Editor::from_image(&record.image().unwrap()).unwrap();
    editor
        .apply(&EditOp::Rect {
            from: Point::new(20.5, 20.5),
            to: Point::new(120.5, 220.5),
        })
        .unwrap();
    let edited = editor.export(ImageFormat::Png, 1.0).unwrap();
    let updated = library.update_image("canvas_1", &edited).unwrap();

    assert_eq!((updated.width, updated.height), (200, 400));
    assert!(updated.timestamp > 1_000);
    let reloaded = library.get("canvas_1").unwrap().image().unwrap().decode().unwrap();
    assert_eq!(*reloaded.get_pixel(20, 100), STROKE_COLOR);
}

#[test]
fn file_store_keeps_history_and_settings_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    {
        let mut library = ScreenshotLibrary::new(JsonFileStore::open(&path).unwrap());
        library.save_capture(&captured("https://example.com/1", "canvas_1", 1_000)).unwrap();
        library.save_capture(&captured("https://example.com/2", "canvas_2", 2_000)).unwrap();
        library
            .save_settings(&Settings {
                format: ImageFormat::Jpeg,
                quality: 0.5,
                auto_download: true,
            })
            .unwrap();
    }

    let mut library = ScreenshotLibrary::new(JsonFileStore::open(&path).unwrap());
    let ids: Vec<String> = library.list().unwrap().into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["canvas_2", "canvas_1"]);
    assert_eq!(library.settings().unwrap().format, ImageFormat::Jpeg);

    assert_eq!(library.clear_all().unwrap(), 2);
    assert!(library.list().unwrap().is_empty());
    assert!(library.store().get("settings").unwrap().is_some());

    let reopened = ScreenshotLibrary::new(JsonFileStore::open(&path).unwrap());
    assert!(reopened.list().unwrap().is_empty());
    assert!(reopened.settings().unwrap().auto_download);
}
