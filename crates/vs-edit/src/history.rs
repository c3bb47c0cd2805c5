//! Undo/redo stack of buffer snapshots.

use std::collections::VecDeque;

use vs_core::AudioBuffer;

/// Default number of undoable edits kept.
pub const DEFAULT_HISTORY_DEPTH: usize = 32;

/// One undoable operation: the buffer before and after it.
#[derive(Clone, Debug)]
struct UndoEntry {
    label: &'static str,
    before: AudioBuffer,
    after: AudioBuffer,
}

/// Bounded undo/redo stack. When full, the oldest entry is dropped.
#[derive(Debug)]
pub struct UndoStack {
    entries: VecDeque<UndoEntry>,
    position: usize,
    depth: usize,
}

impl UndoStack {
    pub fn new(depth: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            position: 0,
            depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Record an edit. Any redo history beyond the current position is
    /// discarded.
    pub fn push(&mut self, label: &'static str, before: AudioBuffer, after: AudioBuffer) {
        if self.depth == 0 {
            return;
        }
        self.entries.truncate(self.position);
        if self.entries.len() == self.depth {
            self.entries.pop_front();
        }
        self.entries.push_back(UndoEntry { label, before, after });
        self.position = self.entries.len();
    }

    /// Step back; returns the buffer to restore.
    pub fn undo(&mut self) -> Option<&AudioBuffer> {
        if self.position == 0 {
            return None;
        }
        self.position -= 1;
        Some(&self.entries[self.position].before)
    }

    /// Step forward; returns the buffer to restore.
    pub fn redo(&mut self) -> Option<&AudioBuffer> {
        if self.position >= self.entries.len() {
            return None;
        }
        let after = &self.entries[self.position].after;
        self.position += 1;
        Some(after)
    }

    pub fn can_undo(&self) -> bool {
        self.position > 0
    }

    pub fn can_redo(&self) -> bool {
        self.position < self.entries.len()
    }

    /// Label of the edit `undo` would revert.
    pub fn undo_label(&self) -> Option<&'static str> {
        self.position.checked_sub(1).map(|i| self.entries[i].label)
    }

    pub fn redo_label(&self) -> Option<&'static str> {
        self.entries.get(self.position).map(|e| e.label)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.position = 0;
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}
