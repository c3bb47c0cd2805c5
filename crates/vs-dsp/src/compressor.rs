//! Feed-forward compressor with a peak envelope follower.

use vs_core::{db_to_linear, linear_to_db, AudioSpec};

use crate::effect::Processor;

/// One envelope is shared by all channels, so stereo material keeps its
/// image under gain reduction. The envelope persists across `process`
/// calls until `reset`.
#[derive(Clone, Debug)]
pub struct Compressor {
    threshold_db: f32,
    ratio: f32,
    attack: f32,
    release: f32,
    knee_db: f32,
    makeup_db: f32,

    sample_rate: u32,
    attack_coeff: f32,
    release_coeff: f32,
    envelope: f32,
    gain_reduction_db: f32,
}

impl Compressor {
    pub fn new(threshold_db: f32, ratio: f32, attack: f32, release: f32) -> Self {
        let mut c = Self {
            threshold_db: 0.0,
            ratio: 1.0,
            attack: 0.0,
            release: 0.0,
            knee_db: 0.0,
            makeup_db: 0.0,
            sample_rate: 0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            envelope: 0.0,
            gain_reduction_db: 0.0,
        };
        c.set_threshold_db(threshold_db);
        c.set_ratio(ratio);
        c.set_attack(attack);
        c.set_release(release);
        c
    }

    pub fn with_knee_db(mut self, knee_db: f32) -> Self {
        self.set_knee_db(knee_db);
        self
    }

    pub fn with_makeup_db(mut self, makeup_db: f32) -> Self {
        self.set_makeup_db(makeup_db);
        self
    }

    pub fn threshold_db(&self) -> f32 {
        self.threshold_db
    }

    pub fn set_threshold_db(&mut self, db: f32) {
        self.threshold_db = db.clamp(-60.0, 0.0);
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = ratio.max(1.0);
    }

    pub fn attack(&self) -> f32 {
        self.attack
    }

    pub fn set_attack(&mut self, seconds: f32) {
        self.attack = seconds.max(0.0);
        self.attack_coeff = time_coeff(self.attack, self.sample_rate);
    }

    pub fn release(&self) -> f32 {
        self.release
    }

    pub fn set_release(&mut self, seconds: f32) {
        self.release = seconds.max(0.0);
        self.release_coeff = time_coeff(self.release, self.sample_rate);
    }

    pub fn knee_db(&self) -> f32 {
        self.knee_db
    }

    pub fn set_knee_db(&mut self, db: f32) {
        self.knee_db = db.max(0.0);
    }

    pub fn makeup_db(&self) -> f32 {
        self.makeup_db
    }

    pub fn set_makeup_db(&mut self, db: f32) {
        self.makeup_db = db.clamp(0.0, 24.0);
    }

    /// Gain reduction applied to the most recent sample, in dB (≤ 0).
    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction_db
    }

    /// Static curve: gain change in dB for an envelope level in dB.
    fn compute_gain(&self, level_db: f32) -> f32 {
        let slope = 1.0 - 1.0 / self.ratio;
        let excess = level_db - self.threshold_db;
        if self.knee_db <= 0.0 {
            if excess <= 0.0 {
                0.0
            } else {
                -excess * slope
            }
        } else {
            let half = self.knee_db / 2.0;
            if excess <= -half {
                0.0
            } else if excess >= half {
                -excess * slope
            } else {
                let x = excess + half;
                -slope * x * x / (2.0 * self.knee_db)
            }
        }
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(-20.0, 4.0, 0.005, 0.1)
    }
}

/// One-pole smoothing coefficient `exp(-1 / (tau * rate))`; zero for an
/// instantaneous response.
fn time_coeff(tau: f32, sample_rate: u32) -> f32 {
    if tau <= 0.0 || sample_rate == 0 {
        return 0.0;
    }
    libm::expf(-1.0 / (tau * sample_rate as f32))
}

impl Processor for Compressor {
    fn prepare(&mut self, spec: &AudioSpec) {
        self.sample_rate = spec.sample_rate;
        self.attack_coeff = time_coeff(self.attack, self.sample_rate);
        self.release_coeff = time_coeff(self.release, self.sample_rate);
    }

    fn reset(&mut self) {
        self.envelope = 0.0;
        self.gain_reduction_db = 0.0;
    }

    fn process_frame(&mut self, frame: &mut [f32]) {
        let makeup = self.makeup_db;
        for s in frame.iter_mut() {
            let level = libm::fabsf(*s);
            let coeff = if level > self.envelope {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.envelope = coeff * self.envelope + (1.0 - coeff) * level;

            let reduction = self.compute_gain(linear_to_db(self.envelope));
            self.gain_reduction_db = reduction;
            *s *= db_to_linear(reduction + makeup);
        }
    }
}
