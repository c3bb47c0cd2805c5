//! LFO-modulated short delay.

use alloc::vec::Vec;
use core::f64::consts::TAU;

use vs_core::AudioSpec;

use crate::effect::Processor;

pub const MAX_DEPTH: f32 = 0.01;
pub const MIN_RATE: f32 = 0.1;

/// The delay swings between 0 and `2 * depth` seconds:
/// `delay = depth * (1 + sin(phase))`. Output is
/// `in * (1 - mix) + delayed * mix`.
#[derive(Clone, Debug)]
pub struct Chorus {
    rate: f32,
    depth: f32,
    mix: f32,

    sample_rate: u32,
    phase: f64,
    lines: Vec<Vec<f32>>,
    write: usize,
}

impl Chorus {
    pub fn new(rate: f32, depth: f32, mix: f32) -> Self {
        Self {
            rate: rate.max(MIN_RATE),
            depth: depth.clamp(0.0, MAX_DEPTH),
            mix: mix.clamp(0.0, 1.0),
            sample_rate: 0,
            phase: 0.0,
            lines: Vec::new(),
            write: 0,
        }
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn set_rate(&mut self, hz: f32) {
        self.rate = hz.max(MIN_RATE);
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn set_depth(&mut self, seconds: f32) {
        self.depth = seconds.clamp(0.0, MAX_DEPTH);
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    /// Fractional read `delay` samples behind the write head.
    fn read(line: &[f32], write: usize, delay: f64) -> f32 {
        let len = line.len();
        let whole = libm::floor(delay) as usize;
        let frac = (delay - whole as f64) as f32;
        let i0 = (write + len - whole % len) % len;
        let i1 = (i0 + len - 1) % len;
        line[i0] + (line[i1] - line[i0]) * frac
    }
}

impl Default for Chorus {
    fn default() -> Self {
        Self::new(1.5, 0.002, 0.5)
    }
}

impl Processor for Chorus {
    fn prepare(&mut self, spec: &AudioSpec) {
        self.sample_rate = spec.sample_rate;
        let len = libm::ceil(2.0 * MAX_DEPTH as f64 * spec.sample_rate as f64) as usize + 2;
        self.lines.resize_with(spec.channels(), Vec::new);
        for line in &mut self.lines {
            if line.len() < len {
                line.resize(len, 0.0);
            }
        }
        self.write %= len;
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.fill(0.0);
        }
        self.write = 0;
        self.phase = 0.0;
    }

    fn process_frame(&mut self, frame: &mut [f32]) {
        if self.lines.is_empty() || self.sample_rate == 0 {
            return;
        }
        let rate = self.sample_rate as f64;
        let delay = self.depth as f64 * (1.0 + libm::sin(self.phase)) * rate;
        let len = self.lines[0].len();
        for (s, line) in frame.iter_mut().zip(self.lines.iter_mut()) {
            line[self.write] = *s;
            let delayed = Self::read(line, self.write, delay);
            *s = *s * (1.0 - self.mix) + delayed * self.mix;
        }
        self.write = (self.write + 1) % len;
        self.phase += TAU * self.rate as f64 / rate;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
    }
}
