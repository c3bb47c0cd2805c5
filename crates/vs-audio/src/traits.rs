//! Audio output trait and error types.

use thiserror::Error;

/// Error type for audio device operations.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,
    #[error("device init error: {0}")]
    DeviceInit(String),
    #[error("stream create error: {0}")]
    StreamCreate(String),
    #[error("playback error: {0}")]
    Playback(String),
}

/// An output that consumes interleaved float32 samples.
pub trait AudioOutput {
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    /// Queue samples, blocking until they fit.
    fn write(&mut self, samples: &[f32]);

    fn start(&mut self) -> Result<(), AudioError>;

    fn stop(&mut self) -> Result<(), AudioError>;
}
