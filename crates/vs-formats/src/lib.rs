//! WAV import and export for vstudio.
//!
//! Decodes 8/16/24/32-bit PCM and 32-bit float WAV data into
//! `AudioBuffer`s in the matching `SampleFormat`, and encodes buffers back.

mod wav;

use thiserror::Error;

pub use wav::{buffer_to_wav, load_wav, load_wav_file, save_wav, write_wav};

/// Error type for WAV decoding and encoding.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("invalid WAV data: {0}")]
    Wav(#[from] hound::Error),
    #[error("unsupported sample format: {bits}-bit {kind}")]
    UnsupportedFormat { bits: u16, kind: &'static str },
    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(u16),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
