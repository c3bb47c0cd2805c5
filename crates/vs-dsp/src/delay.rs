//! Feedback delay line.

use alloc::vec::Vec;

use vs_core::AudioSpec;

use crate::effect::Processor;

pub const MAX_FEEDBACK: f32 = 0.95;

/// Echo with feedback: `out = in + ring[w - d] * mix` and
/// `ring[w] = (in + ring[w - d]) * feedback`, so echo `k` of an impulse
/// has magnitude `mix * feedback^k`.
#[derive(Clone, Debug)]
pub struct Delay {
    time: f32,
    feedback: f32,
    mix: f32,

    sample_rate: u32,
    delay_samples: usize,
    lines: Vec<Vec<f32>>,
    write: usize,
}

impl Delay {
    pub fn new(time: f32, feedback: f32, mix: f32) -> Self {
        Self {
            time: time.max(0.0),
            feedback: feedback.clamp(0.0, MAX_FEEDBACK),
            mix: mix.clamp(0.0, 1.0),
            sample_rate: 0,
            delay_samples: 0,
            lines: Vec::new(),
            write: 0,
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Set the delay time in seconds. Grows the lines if needed.
    pub fn set_time(&mut self, seconds: f32) {
        self.time = seconds.max(0.0);
        let channels = self.lines.len();
        self.resize(channels);
    }

    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, MAX_FEEDBACK);
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    /// Delay in frames at the prepared sample rate.
    pub fn delay_samples(&self) -> usize {
        self.delay_samples
    }

    fn resize(&mut self, channels: usize) {
        self.delay_samples = libm::roundf(self.time * self.sample_rate as f32) as usize;
        let len = self.delay_samples + 1;
        self.lines.resize_with(channels, Vec::new);
        for line in &mut self.lines {
            if line.len() < len {
                line.resize(len, 0.0);
            }
        }
        let ring = self.lines.first().map_or(0, Vec::len);
        if ring > 0 {
            self.write %= ring;
        }
    }
}

impl Default for Delay {
    fn default() -> Self {
        Self::new(0.25, 0.3, 0.5)
    }
}

impl Processor for Delay {
    fn prepare(&mut self, spec: &AudioSpec) {
        self.sample_rate = spec.sample_rate;
        self.resize(spec.channels());
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.fill(0.0);
        }
        self.write = 0;
    }

    fn process_frame(&mut self, frame: &mut [f32]) {
        let d = self.delay_samples;
        if d == 0 || self.lines.is_empty() {
            return;
        }
        let len = self.lines[0].len();
        let read = (self.write + len - d) % len;
        for (s, line) in frame.iter_mut().zip(self.lines.iter_mut()) {
            let input = *s;
            let delayed = line[read];
            *s = input + delayed * self.mix;
            line[self.write] = (input + delayed) * self.feedback;
        }
        self.write = (self.write + 1) % len;
    }
}
