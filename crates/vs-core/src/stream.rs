//! Pull-based frame producers.

use crate::audio_buffer::AudioBuffer;
use crate::spec::AudioSpec;

/// A lazily produced sequence of frames in a fixed `AudioSpec`, read
/// through a cursor.
///
/// Every method is total: reading or seeking a stream that is not open
/// returns 0 / `false`.
pub trait AudioStream: Send {
    /// Open the stream from a host-defined identifier (a path for file
    /// streams, a waveform name for generators). Resets the cursor.
    fn open(&mut self, source_id: &str) -> bool;

    /// Release any resources. The stream reads nothing until reopened.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Format of the frames `read` produces.
    fn spec(&self) -> AudioSpec;

    /// Write up to `frames` frames of raw samples into `dst`, advancing the
    /// cursor. The request is further limited to the whole frames that fit in
    /// `dst`. Returns the number of frames written.
    fn read(&mut self, dst: &mut [u8], frames: usize) -> usize;

    /// Move the cursor. Returns `false` if the stream is not open.
    fn seek(&mut self, frame: usize) -> bool;

    /// Current cursor position in frames.
    fn tell(&self) -> usize;

    /// Length in frames; `usize::MAX` for unbounded producers.
    fn total_frames(&self) -> usize;

    /// Read into the start of `dst`. Returns 0 unless `dst` has the stream's
    /// spec.
    fn read_into(&mut self, dst: &mut AudioBuffer, frames: usize) -> usize {
        if *dst.spec() != self.spec() {
            return 0;
        }
        let frames = frames.min(dst.frames());
        self.read(dst.as_bytes_mut(), frames)
    }
}
