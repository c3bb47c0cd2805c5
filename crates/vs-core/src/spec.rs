//! Sample format, channel layout and the `AudioSpec` tuple.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum number of channels in any supported layout (7.1).
pub const MAX_CHANNELS: usize = 8;

/// Encoding of a single sample.
///
/// Integer formats are two's-complement signed, except `U8` which is
/// unsigned with silence at 128 (WAV convention). `I24` is packed into
/// three host-endian bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SampleFormat {
    U8,
    I16,
    I24,
    I32,
    #[default]
    F32,
    F64,
}

impl SampleFormat {
    /// Size of one sample in bytes.
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::I16 => 2,
            SampleFormat::I24 => 3,
            SampleFormat::I32 => 4,
            SampleFormat::F32 => 4,
            SampleFormat::F64 => 8,
        }
    }

    /// True for `F32` and `F64`.
    pub const fn is_float(self) -> bool {
        matches!(self, SampleFormat::F32 | SampleFormat::F64)
    }
}

/// Declared ordering of the samples within one frame.
///
/// Channel order per layout:
/// - mono: M
/// - stereo: L, R
/// - quad: FL, FR, BL, BR
/// - 5.1: FL, FR, C, LFE, BL, BR
/// - 7.1: FL, FR, C, LFE, BL, BR, SL, SR
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ChannelLayout {
    Mono,
    #[default]
    Stereo,
    Quad,
    #[cfg_attr(feature = "serde", serde(rename = "5.1"))]
    Surround51,
    #[cfg_attr(feature = "serde", serde(rename = "7.1"))]
    Surround71,
}

impl ChannelLayout {
    /// Number of interleaved channels per frame.
    pub const fn channel_count(self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
            ChannelLayout::Quad => 4,
            ChannelLayout::Surround51 => 6,
            ChannelLayout::Surround71 => 8,
        }
    }

    /// Layout with exactly `count` channels, if one exists.
    pub const fn from_channel_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            4 => Some(ChannelLayout::Quad),
            6 => Some(ChannelLayout::Surround51),
            8 => Some(ChannelLayout::Surround71),
            _ => None,
        }
    }
}

/// The (sample rate, sample format, channel layout) tuple describing a
/// buffer or stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AudioSpec {
    pub sample_rate: u32,
    pub format: SampleFormat,
    pub layout: ChannelLayout,
}

impl AudioSpec {
    pub const fn new(sample_rate: u32, format: SampleFormat, layout: ChannelLayout) -> Self {
        Self {
            sample_rate,
            format,
            layout,
        }
    }

    /// Float32 spec, the format every effect and the mixer operate on.
    pub const fn float(sample_rate: u32, layout: ChannelLayout) -> Self {
        Self::new(sample_rate, SampleFormat::F32, layout)
    }

    pub const fn bytes_per_sample(&self) -> usize {
        self.format.bytes_per_sample()
    }

    pub const fn channels(&self) -> usize {
        self.layout.channel_count()
    }

    pub const fn bytes_per_frame(&self) -> usize {
        self.bytes_per_sample() * self.channels()
    }

    /// Frame count for `seconds`, rounded to the nearest frame. Negative
    /// durations give zero.
    pub fn seconds_to_frames(&self, seconds: f64) -> usize {
        if !(seconds > 0.0) {
            return 0;
        }
        libm::round(seconds * self.sample_rate as f64) as usize
    }

    /// Duration of `frames` frames in seconds.
    pub fn frames_to_seconds(&self, frames: usize) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        frames as f64 / self.sample_rate as f64
    }
}

impl Default for AudioSpec {
    fn default() -> Self {
        Self::float(48000, ChannelLayout::Stereo)
    }
}
