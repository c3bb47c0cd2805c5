//! Offline waveform editing for vstudio.
//!
//! [`WaveformEditor`] owns an `AudioBuffer` and applies time-addressed
//! edits to it (cut, insert, fades, generators, effects) with an undo
//! history. Everything runs on the caller's thread.

mod editor;
mod history;

pub use editor::{Selection, WaveformEditor};
pub use history::{UndoStack, DEFAULT_HISTORY_DEPTH};
