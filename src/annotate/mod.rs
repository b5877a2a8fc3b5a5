//! Post-capture annotation editor
//!
//! The editor keeps the captured image as an immutable base, a working
//! canvas the tools draw on, and a [`HistoryLog`] of PNG snapshots taken
//! after every completed edit. Pointer events drive the tools the same way
//! mouse events would in an interactive surface.

pub mod draw;
pub mod history;

pub use draw::Point;
pub use history::{HistoryLog, HISTORY_CAP};

use crate::codec::{decode_raster, encode_raster, CapturedImage, ImageFormat};
use crate::Result;
use image::RgbaImage;
use log::debug;
use serde::{Deserialize, Serialize};

/// Annotation tools.
///
/// `Crop` can be selected but does not modify the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Draw,
    Rect,
    Arrow,
    Crop,
}

/// An in-progress pointer gesture
#[derive(Debug, Clone, Copy)]
struct Gesture {
    start: Point,
    changed: bool,
}

pub struct Editor {
    base: RgbaImage,
    canvas: RgbaImage,
    history: HistoryLog<Vec<u8>>,
    tool: Option<Tool>,
    gesture: Option<Gesture>,
}

impl Editor {
    /// Start editing `base`; the untouched base is the first history entry.
    pub fn new(base: RgbaImage) -> Result<Self> {
        let mut editor = Self {
            canvas: base.clone(),
            base,
            history: HistoryLog::new(),
            tool: None,
            gesture: None,
        };
        editor.record_state()?;
        Ok(editor)
    }

    pub fn from_image(image: &CapturedImage) -> Result<Self> {
        Self::new(image.decode()?)
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn history(&self) -> &HistoryLog<Vec<u8>> {
        &self.history
    }

    pub fn tool(&self) -> Option<Tool> {
        self.tool
    }

    /// Switch tools; an unfinished gesture is abandoned.
    pub fn set_tool(&mut self, tool: Option<Tool>) {
        self.tool = tool;
        self.gesture = None;
    }

    pub fn pointer_down(&mut self, at: Point) {
        self.gesture = Some(Gesture {
            start: at,
            changed: false,
        });
    }

    pub fn pointer_move(&mut self, at: Point) -> Result<()> {
        let Some(mut gesture) = self.gesture else {
            return Ok(());
        };
        match self.tool {
            Some(Tool::Draw) => {
                draw::draw_line(&mut self.canvas, gesture.start, at);
                gesture.start = at;
                gesture.changed = true;
            }
            Some(Tool::Rect) => {
                self.redraw()?;
                draw::draw_rect(&mut self.canvas, gesture.start, at);
                gesture.changed = true;
            }
            Some(Tool::Arrow) => {
                self.redraw()?;
                draw::draw_arrow(&mut self.canvas, gesture.start, at);
                gesture.changed = true;
            }
            Some(Tool::Crop) | None => {}
        }
        self.gesture = Some(gesture);
        Ok(())
    }

    /// Finish the gesture, committing it if it changed the canvas.
    pub fn pointer_up(&mut self) -> Result<()> {
        match self.gesture.take() {
            Some(gesture) if gesture.changed => self.record_state(),
            _ => Ok(()),
        }
    }

    /// Snapshot the canvas into the history log.
    pub fn record_state(&mut self) -> Result<()> {
        let snapshot = encode_raster(&self.canvas, ImageFormat::Png, 1.0)?;
        self.history.record(snapshot);
        debug!(
            "recorded editor state {}/{}",
            self.history.index().map_or(0, |i| i + 1),
            self.history.len()
        );
        Ok(())
    }

    /// Returns whether anything changed.
    pub fn undo(&mut self) -> Result<bool> {
        if self.history.undo().is_none() {
            return Ok(false);
        }
        self.redraw()?;
        Ok(true)
    }

    /// Returns whether anything changed.
    pub fn redo(&mut self) -> Result<bool> {
        if self.history.redo().is_none() {
            return Ok(false);
        }
        self.redraw()?;
        Ok(true)
    }

    /// Drop all annotations from the canvas. This is itself an edit and can
    /// be undone.
    pub fn clear(&mut self) -> Result<()> {
        self.gesture = None;
        self.canvas = self.base.clone();
        self.record_state()
    }

    pub fn export(&self, format: ImageFormat, quality: f32) -> Result<CapturedImage> {
        CapturedImage::encode(&self.canvas, format, quality)
    }

    /// Reset the canvas to the base image with the current history entry on top.
    fn redraw(&mut self) -> Result<()> {
        self.canvas = self.base.clone();
        if let Some(snapshot) = self.history.current() {
            let layer = decode_raster(snapshot)?;
            image::imageops::overlay(&mut self.canvas, &layer, 0, 0);
        }
        Ok(())
    }
}

/// A scripted editor action, used to replay edits non-interactively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum EditOp {
    /// Pen stroke through the given points
    Draw { points: Vec<Point> },
    Rect { from: Point, to: Point },
    Arrow { from: Point, to: Point },
    Undo,
    Redo,
    Clear,
}

impl Editor {
    /// Replay `op` through the pointer interface.
    pub fn apply(&mut self, op: &EditOp) -> Result<()> {
        match op {
            EditOp::Draw { points } => {
                let Some((first, rest)) = points.split_first() else {
                    return Ok(());
                };
                self.set_tool(Some(Tool::Draw));
                self.pointer_down(*first);
                for p in rest {
                    self.pointer_move(*p)?;
                }
                self.pointer_up()
            }
            EditOp::Rect { from, to } => self.drag(Tool::Rect, *from, *to),
            EditOp::Arrow { from, to } => self.drag(Tool::Arrow, *from, *to),
            EditOp::Undo => self.undo().map(|_| ()),
            EditOp::Redo => self.redo().map(|_| ()),
            EditOp::Clear => self.clear(),
        }
    }

    fn drag(&mut self, tool: Tool, from: Point, to: Point) -> Result<()> {
        self.set_tool(Some(tool));
        self.pointer_down(from);
        self.pointer_move(to)?;
        self.pointer_up()
    }
}
