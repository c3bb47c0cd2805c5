//! Parametric equaliser built from a cascade of peaking biquads.

use alloc::vec::Vec;

use vs_core::AudioSpec;

use crate::biquad::{BiquadCoeffs, BiquadState, FilterType};
use crate::effect::Processor;

pub const MAX_BAND_GAIN_DB: f32 = 12.0;

/// One peaking band.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EqBand {
    pub frequency: f32,
    pub gain_db: f32,
    pub q: f32,
    pub enabled: bool,
}

impl EqBand {
    pub fn new(frequency: f32, gain_db: f32, q: f32) -> Self {
        Self {
            frequency,
            gain_db,
            q,
            enabled: true,
        }
        .clamped()
    }

    fn clamped(mut self) -> Self {
        self.frequency = self.frequency.max(20.0);
        self.gain_db = self.gain_db.clamp(-MAX_BAND_GAIN_DB, MAX_BAND_GAIN_DB);
        self.q = self.q.max(0.1);
        self
    }
}

/// Bands are applied in order. State is laid out band-major:
/// `states[band * channels + ch]`.
#[derive(Clone, Debug, Default)]
pub struct Equalizer {
    bands: Vec<EqBand>,
    coeffs: Vec<BiquadCoeffs>,
    states: Vec<BiquadState>,
    channels: usize,
    sample_rate: u32,
}

impl Equalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_band(mut self, band: EqBand) -> Self {
        self.add_band(band);
        self
    }

    /// Append a band, returning its index.
    pub fn add_band(&mut self, band: EqBand) -> usize {
        let band = band.clamped();
        self.bands.push(band);
        self.coeffs.push(self.design(&band));
        self.states
            .resize(self.bands.len() * self.channels, BiquadState::default());
        self.bands.len() - 1
    }

    pub fn remove_band(&mut self, index: usize) -> Option<EqBand> {
        if index >= self.bands.len() {
            return None;
        }
        let band = self.bands.remove(index);
        self.coeffs.remove(index);
        let start = index * self.channels;
        self.states.drain(start..start + self.channels);
        Some(band)
    }

    /// Replace band `index`. Returns false if it does not exist.
    pub fn set_band(&mut self, index: usize, band: EqBand) -> bool {
        let band = band.clamped();
        let coeffs = self.design(&band);
        match (self.bands.get_mut(index), self.coeffs.get_mut(index)) {
            (Some(b), Some(c)) => {
                *b = band;
                *c = coeffs;
                true
            }
            _ => false,
        }
    }

    pub fn band(&self, index: usize) -> Option<&EqBand> {
        self.bands.get(index)
    }

    pub fn bands(&self) -> &[EqBand] {
        &self.bands
    }

    fn design(&self, band: &EqBand) -> BiquadCoeffs {
        if self.sample_rate == 0 {
            return BiquadCoeffs::IDENTITY;
        }
        BiquadCoeffs::design(
            FilterType::Peaking,
            self.sample_rate as f64,
            band.frequency as f64,
            band.q as f64,
            band.gain_db as f64,
        )
    }
}

impl Processor for Equalizer {
    fn prepare(&mut self, spec: &AudioSpec) {
        self.sample_rate = spec.sample_rate;
        self.channels = spec.channels();
        self.states
            .resize(self.bands.len() * self.channels, BiquadState::default());
        for i in 0..self.bands.len() {
            self.coeffs[i] = self.design(&self.bands[i]);
        }
    }

    fn reset(&mut self) {
        self.states.iter_mut().for_each(BiquadState::reset);
    }

    fn process_frame(&mut self, frame: &mut [f32]) {
        let channels = self.channels;
        for (b, band) in self.bands.iter().enumerate() {
            if !band.enabled {
                continue;
            }
            let c = &self.coeffs[b];
            let states = &mut self.states[b * channels..(b + 1) * channels];
            for (s, st) in frame.iter_mut().zip(states.iter_mut()) {
                *s = st.process(c, *s as f64) as f32;
            }
        }
    }
}
