//! In-place DSP effects for vstudio.
//!
//! Each effect is an `Effect` wrapping one variant of `EffectKind`: a
//! parametric equaliser, compressor, reverb, delay, chorus, distortion or
//! biquad filter. Effects process float32 `AudioBuffer`s in place and are
//! composed with an `EffectChain`.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod biquad;
mod chain;
mod chorus;
mod compressor;
mod delay;
mod distortion;
mod effect;
mod equalizer;
mod filter;
mod reverb;

pub use biquad::{BiquadCoeffs, BiquadState, FilterType};
pub use chain::EffectChain;
pub use chorus::Chorus;
pub use compressor::Compressor;
pub use delay::Delay;
pub use distortion::{Distortion, DistortionKind};
pub use effect::{Effect, EffectKind, Processor};
pub use equalizer::{EqBand, Equalizer};
pub use filter::Filter;
pub use reverb::Reverb;
