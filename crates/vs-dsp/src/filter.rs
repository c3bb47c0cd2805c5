//! Single biquad filter with per-channel state.

use alloc::vec::Vec;

use vs_core::AudioSpec;

use crate::biquad::{BiquadCoeffs, BiquadState, FilterType};
use crate::effect::Processor;

pub const MIN_CUTOFF: f32 = 20.0;
pub const MIN_Q: f32 = 0.1;

#[derive(Clone, Debug)]
pub struct Filter {
    filter_type: FilterType,
    cutoff: f32,
    q: f32,
    gain_db: f32,
    sample_rate: u32,
    coeffs: BiquadCoeffs,
    states: Vec<BiquadState>,
}

impl Filter {
    pub fn new(filter_type: FilterType, cutoff: f32, q: f32) -> Self {
        Self {
            filter_type,
            cutoff: cutoff.max(MIN_CUTOFF),
            q: q.max(MIN_Q),
            gain_db: 0.0,
            sample_rate: 0,
            coeffs: BiquadCoeffs::IDENTITY,
            states: Vec::new(),
        }
    }

    /// Gain for the peaking and shelving shapes.
    pub fn with_gain_db(mut self, gain_db: f32) -> Self {
        self.set_gain_db(gain_db);
        self
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.filter_type = filter_type;
        self.update_coefficients();
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    pub fn set_cutoff(&mut self, cutoff: f32) {
        self.cutoff = cutoff.max(MIN_CUTOFF);
        self.update_coefficients();
    }

    pub fn q(&self) -> f32 {
        self.q
    }

    pub fn set_q(&mut self, q: f32) {
        self.q = q.max(MIN_Q);
        self.update_coefficients();
    }

    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    pub fn set_gain_db(&mut self, gain_db: f32) {
        self.gain_db = if gain_db.is_finite() { gain_db } else { 0.0 };
        self.update_coefficients();
    }

    fn update_coefficients(&mut self) {
        if self.sample_rate == 0 {
            return;
        }
        self.coeffs = BiquadCoeffs::design(
            self.filter_type,
            self.sample_rate as f64,
            self.cutoff as f64,
            self.q as f64,
            self.gain_db as f64,
        );
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::new(FilterType::LowPass, 1000.0, 0.707)
    }
}

impl Processor for Filter {
    fn prepare(&mut self, spec: &AudioSpec) {
        self.sample_rate = spec.sample_rate;
        self.states.resize(spec.channels(), BiquadState::default());
        self.update_coefficients();
    }

    fn reset(&mut self) {
        self.states.iter_mut().for_each(BiquadState::reset);
    }

    fn process_frame(&mut self, frame: &mut [f32]) {
        for (s, state) in frame.iter_mut().zip(self.states.iter_mut()) {
            *s = state.process(&self.coeffs, *s as f64) as f32;
        }
    }
}
