//! Core audio types for vstudio.
//!
//! This crate defines the sample substrate shared by the engine, the
//! effects and the offline tools: the `AudioSpec` tuple, interleaved
//! `AudioBuffer`s in any supported sample format, and pull-based
//! `AudioStream`s.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod audio_buffer;
mod file_stream;
mod generator;
mod spec;
mod stream;
mod vec3;

pub use audio_buffer::{decode_sample, encode_sample, i24_to_i32, i32_to_i24, AudioBuffer, SampleData, I24};
pub use file_stream::FileStream;
pub use generator::{GeneratorStream, Waveform};
pub use spec::{AudioSpec, ChannelLayout, SampleFormat, MAX_CHANNELS};
pub use stream::AudioStream;
pub use vec3::Vec3;

/// Convert decibels to a linear amplitude factor.
pub fn db_to_linear(db: f32) -> f32 {
    libm::powf(10.0, db / 20.0)
}

/// Convert a linear amplitude factor to decibels. Non-positive input gives
/// negative infinity.
pub fn linear_to_db(gain: f32) -> f32 {
    if gain <= 0.0 {
        return f32::NEG_INFINITY;
    }
    20.0 * libm::log10f(gain)
}
