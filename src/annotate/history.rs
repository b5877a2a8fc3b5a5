//! Bounded, truncating undo/redo log

use std::collections::VecDeque;

/// Maximum number of snapshots kept by the editor
pub const HISTORY_CAP: usize = 50;

/// Linear undo/redo log.
///
/// Recording after an undo discards the redo branch. When the log grows
/// past its cap the oldest entry is evicted and the index shifts with it,
/// so it keeps pointing at the same logical entry.
#[derive(Debug, Clone)]
pub struct HistoryLog<T> {
    entries: VecDeque<T>,
    index: usize,
    cap: usize,
}

impl<T> Default for HistoryLog<T> {
    fn default() -> Self {
        Self::with_cap(HISTORY_CAP)
    }
}

impl<T> HistoryLog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log holding at most `cap` entries (at least one).
    pub fn with_cap(cap: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            index: 0,
            cap: cap.max(1),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of the current entry, `None` while empty
    pub fn index(&self) -> Option<usize> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.index)
        }
    }

    pub fn current(&self) -> Option<&T> {
        self.entries.get(self.index)
    }

    pub fn record(&mut self, entry: T) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.index + 1);
        }
        self.entries.push_back(entry);
        self.index = self.entries.len() - 1;
        while self.entries.len() > self.cap {
            self.entries.pop_front();
            self.index -= 1;
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty() && self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.entries.is_empty() && self.index + 1 < self.entries.len()
    }

    /// Step back; returns the new current entry, or `None` if nothing moved.
    pub fn undo(&mut self) -> Option<&T> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.current()
    }

    /// Step forward; returns the new current entry, or `None` if nothing moved.
    pub fn redo(&mut self) -> Option<&T> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.current()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}
