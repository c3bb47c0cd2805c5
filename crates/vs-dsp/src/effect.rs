//! The `Effect` node: shared enable/bypass/mix state around a tagged
//! processor.

use vs_core::{AudioBuffer, AudioSpec, SampleFormat, MAX_CHANNELS};

use crate::chorus::Chorus;
use crate::compressor::Compressor;
use crate::delay::Delay;
use crate::distortion::Distortion;
use crate::equalizer::Equalizer;
use crate::filter::Filter;
use crate::reverb::Reverb;

/// Per-frame DSP kernel behind an `Effect`.
pub trait Processor: Send {
    /// Size internal state for `spec`. May allocate; called off the render
    /// path whenever the spec changes. Calling it again with the same spec
    /// must not allocate.
    fn prepare(&mut self, spec: &AudioSpec);

    /// Clear delay lines, envelopes and filter histories.
    fn reset(&mut self);

    /// Process one interleaved frame in place.
    fn process_frame(&mut self, frame: &mut [f32]);
}

/// The seven processor variants.
#[derive(Clone, Debug)]
pub enum EffectKind {
    Equalizer(Equalizer),
    Compressor(Compressor),
    Reverb(Reverb),
    Delay(Delay),
    Chorus(Chorus),
    Distortion(Distortion),
    Filter(Filter),
}

impl EffectKind {
    pub fn name(&self) -> &'static str {
        match self {
            EffectKind::Equalizer(_) => "equalizer",
            EffectKind::Compressor(_) => "compressor",
            EffectKind::Reverb(_) => "reverb",
            EffectKind::Delay(_) => "delay",
            EffectKind::Chorus(_) => "chorus",
            EffectKind::Distortion(_) => "distortion",
            EffectKind::Filter(_) => "filter",
        }
    }

    fn processor(&mut self) -> &mut dyn Processor {
        match self {
            EffectKind::Equalizer(p) => p,
            EffectKind::Compressor(p) => p,
            EffectKind::Reverb(p) => p,
            EffectKind::Delay(p) => p,
            EffectKind::Chorus(p) => p,
            EffectKind::Distortion(p) => p,
            EffectKind::Filter(p) => p,
        }
    }
}

macro_rules! impl_from_processor {
    ($($ty:ident),*) => {
        $(
            impl From<$ty> for EffectKind {
                fn from(p: $ty) -> Self {
                    EffectKind::$ty(p)
                }
            }

            impl From<$ty> for Effect {
                fn from(p: $ty) -> Self {
                    Effect::new(EffectKind::$ty(p))
                }
            }
        )*
    };
}

impl_from_processor!(Equalizer, Compressor, Reverb, Delay, Chorus, Distortion, Filter);

/// An in-place DSP node.
///
/// Processing is the identity while the effect is disabled or bypassed.
/// `mix` blends the dry frame with the processed one (1.0 = fully
/// processed). Only float32 buffers are processed; other formats pass
/// through unchanged.
#[derive(Clone, Debug)]
pub struct Effect {
    enabled: bool,
    bypass: bool,
    mix: f32,
    kind: EffectKind,
    prepared: Option<AudioSpec>,
}

impl Effect {
    pub fn new(kind: EffectKind) -> Self {
        Self {
            enabled: true,
            bypass: false,
            mix: 1.0,
            kind,
            prepared: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn kind(&self) -> &EffectKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut EffectKind {
        &mut self.kind
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn bypass(&self) -> bool {
        self.bypass
    }

    pub fn set_bypass(&mut self, bypass: bool) {
        self.bypass = bypass;
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }

    /// Dry/wet blend, clamped to [0, 1].
    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    /// True when `process` would change the signal.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.bypass
    }

    /// Size internal state for `spec` ahead of processing.
    pub fn prepare(&mut self, spec: &AudioSpec) {
        if self.prepared.as_ref() != Some(spec) {
            self.kind.processor().prepare(spec);
            self.prepared = Some(*spec);
        }
    }

    pub fn reset(&mut self) {
        self.kind.processor().reset();
    }

    /// Process a float32 buffer in place.
    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        let spec = *buffer.spec();
        if let Some(samples) = buffer.as_f32_mut() {
            self.process_interleaved(&spec, samples);
        }
    }

    /// Process interleaved float samples laid out per `spec`.
    ///
    /// A trailing partial frame is left untouched. If `spec` differs from the
    /// last prepared spec the effect is re-prepared first.
    pub fn process_interleaved(&mut self, spec: &AudioSpec, samples: &mut [f32]) {
        if !self.is_active() || spec.format != SampleFormat::F32 {
            return;
        }
        let channels = spec.channels();
        if channels == 0 || channels > MAX_CHANNELS {
            return;
        }
        self.prepare(spec);

        let mix = self.mix;
        let processor = self.kind.processor();
        if mix >= 1.0 {
            for frame in samples.chunks_exact_mut(channels) {
                processor.process_frame(frame);
            }
            return;
        }

        let mut dry = [0.0f32; MAX_CHANNELS];
        for frame in samples.chunks_exact_mut(channels) {
            dry[..channels].copy_from_slice(frame);
            processor.process_frame(frame);
            for (wet, d) in frame.iter_mut().zip(&dry[..channels]) {
                *wet = d + (*wet - d) * mix;
            }
        }
    }
}
