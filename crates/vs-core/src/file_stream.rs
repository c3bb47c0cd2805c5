//! Stream over a decoded PCM image held in memory.

use alloc::vec::Vec;

use crate::audio_buffer::AudioBuffer;
use crate::spec::AudioSpec;
use crate::stream::AudioStream;

/// Reads frames from an in-memory image of raw samples at a declared spec.
///
/// With `looping` set, reads wrap at the end of the image and always fill
/// the full request; otherwise a read stops at the end and later reads
/// return 0.
#[derive(Clone, Debug)]
pub struct FileStream {
    spec: AudioSpec,
    image: Vec<u8>,
    total: usize,
    cursor: usize,
    looping: bool,
    open: bool,
}

impl FileStream {
    /// A closed stream that will interpret its image as `spec`.
    pub fn new(spec: AudioSpec) -> Self {
        Self {
            spec,
            image: Vec::new(),
            total: 0,
            cursor: 0,
            looping: false,
            open: false,
        }
    }

    /// An open stream over a copy of `buffer`'s samples.
    pub fn from_buffer(buffer: &AudioBuffer) -> Self {
        let mut stream = Self::new(*buffer.spec());
        stream.open_image(buffer.as_bytes().to_vec());
        stream
    }

    /// Adopt `bytes` as the decoded image. A trailing partial frame is
    /// dropped.
    pub fn open_image(&mut self, mut bytes: Vec<u8>) -> bool {
        let bpf = self.spec.bytes_per_frame();
        if bpf == 0 {
            return false;
        }
        self.total = bytes.len() / bpf;
        bytes.truncate(self.total * bpf);
        self.image = bytes;
        self.cursor = 0;
        self.open = true;
        true
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
}

impl AudioStream for FileStream {
    /// Read a raw PCM image at this stream's spec from the file at
    /// `source_id`.
    #[cfg(feature = "std")]
    fn open(&mut self, source_id: &str) -> bool {
        match std::fs::read(source_id) {
            Ok(bytes) => self.open_image(bytes),
            Err(_) => false,
        }
    }

    #[cfg(not(feature = "std"))]
    fn open(&mut self, _source_id: &str) -> bool {
        false
    }

    fn close(&mut self) {
        self.image = Vec::new();
        self.total = 0;
        self.cursor = 0;
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn spec(&self) -> AudioSpec {
        self.spec
    }

    fn read(&mut self, dst: &mut [u8], frames: usize) -> usize {
        if !self.open {
            return 0;
        }
        let bpf = self.spec.bytes_per_frame();
        let wanted = frames.min(dst.len() / bpf);
        let mut written = 0;

        while written < wanted {
            if self.cursor >= self.total {
                if self.looping && self.total > 0 {
                    self.cursor = 0;
                } else {
                    break;
                }
            }
            let n = (wanted - written).min(self.total - self.cursor);
            let src = &self.image[self.cursor * bpf..(self.cursor + n) * bpf];
            dst[written * bpf..(written + n) * bpf].copy_from_slice(src);
            written += n;
            self.cursor += n;
        }
        written
    }

    fn seek(&mut self, frame: usize) -> bool {
        if !self.open {
            return false;
        }
        self.cursor = frame.min(self.total);
        true
    }

    fn tell(&self) -> usize {
        self.cursor
    }

    fn total_frames(&self) -> usize {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{ChannelLayout, SampleFormat};
    use alloc::vec;

    fn counting_stream(frames: u8) -> FileStream {
        let spec = AudioSpec::new(8000, SampleFormat::U8, ChannelLayout::Mono);
        let mut s = FileStream::new(spec);
        assert!(s.open_image((0..frames).collect()));
        s
    }

    #[test]
    fn read_before_open_returns_zero() {
        let mut s = FileStream::new(AudioSpec::default());
        let mut dst = vec![0u8; 64];
        assert_eq!(s.read(&mut dst, 8), 0);
        assert!(!s.seek(0));
    }

    #[test]
    fn read_stops_at_end_without_looping() {
        let mut s = counting_stream(5);
        let mut dst = [0u8; 8];
        assert_eq!(s.read(&mut dst, 3), 3);
        assert_eq!(s.read(&mut dst, 3), 2);
        assert_eq!(&dst[..2], &[3, 4]);
        assert_eq!(s.read(&mut dst, 3), 0);
    }

    #[test]
    fn looping_wraps_and_fills() {
        let mut s = counting_stream(4).with_looping(true);
        let mut dst = [0u8; 10];
        assert_eq!(s.read(&mut dst, 10), 10);
        assert_eq!(dst, [0, 1, 2, 3, 0, 1, 2, 3, 0, 1]);
        assert_eq!(s.tell(), 2);
    }

    #[test]
    fn seek_clamps_to_total() {
        let mut s = counting_stream(4);
        assert!(s.seek(100));
        assert_eq!(s.tell(), 4);
        assert!(s.seek(1));
        let mut dst = [0u8; 1];
        s.read(&mut dst, 1);
        assert_eq!(dst[0], 1);
    }

    #[test]
    fn partial_trailing_frame_is_dropped() {
        let spec = AudioSpec::new(8000, SampleFormat::I16, ChannelLayout::Stereo);
        let mut s = FileStream::new(spec);
        s.open_image(vec![0u8; 9]);
        assert_eq!(s.total_frames(), 2);
    }

    #[test]
    fn request_is_limited_by_destination() {
        let mut s = counting_stream(8);
        let mut dst = [0u8; 3];
        assert_eq!(s.read(&mut dst, 8), 3);
    }

    #[test]
    fn close_releases_image() {
        let mut s = counting_stream(8);
        s.close();
        assert!(!s.is_open());
        assert_eq!(s.total_frames(), 0);
    }
}
