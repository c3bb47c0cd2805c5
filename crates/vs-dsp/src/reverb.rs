//! Freeverb-style algorithmic reverb: parallel damped combs into series
//! allpasses, sized from the buffer's sample rate.

use alloc::vec;
use alloc::vec::Vec;

use vs_core::AudioSpec;

use crate::effect::Processor;

const COMB_TUNING: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNING: [usize; 4] = [556, 441, 341, 225];
const STEREO_SPREAD: usize = 23;
const TUNING_RATE: f64 = 44100.0;

const FIXED_GAIN: f32 = 0.015;
const SCALE_WET: f32 = 3.0;
const ROOM_SCALE: f32 = 0.28;
const ROOM_OFFSET: f32 = 0.7;
const ALLPASS_FEEDBACK: f32 = 0.5;

#[derive(Clone, Debug)]
struct Comb {
    buffer: Vec<f32>,
    index: usize,
    filter_store: f32,
}

impl Comb {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
            filter_store: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damp: f32) -> f32 {
        let output = self.buffer[self.index];
        self.filter_store = output * (1.0 - damp) + self.filter_store * damp;
        self.buffer[self.index] = input + self.filter_store * feedback;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.filter_store = 0.0;
    }
}

#[derive(Clone, Debug)]
struct Allpass {
    buffer: Vec<f32>,
    index: usize,
}

impl Allpass {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let buffered = self.buffer[self.index];
        let output = buffered - input;
        self.buffer[self.index] = input + buffered * ALLPASS_FEEDBACK;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
    }
}

/// Stereo reverb. Mono input feeds the left tank only; channels beyond
/// the first two pass through.
#[derive(Clone, Debug)]
pub struct Reverb {
    room_size: f32,
    damping: f32,
    wet: f32,
    dry: f32,
    width: f32,

    sample_rate: u32,
    combs: [Vec<Comb>; 2],
    allpasses: [Vec<Allpass>; 2],
}

impl Reverb {
    pub fn new(room_size: f32, damping: f32, wet: f32, dry: f32, width: f32) -> Self {
        Self {
            room_size: unit(room_size),
            damping: unit(damping),
            wet: unit(wet),
            dry: unit(dry),
            width: unit(width),
            sample_rate: 0,
            combs: [Vec::new(), Vec::new()],
            allpasses: [Vec::new(), Vec::new()],
        }
    }

    pub fn room_size(&self) -> f32 {
        self.room_size
    }

    pub fn set_room_size(&mut self, v: f32) {
        self.room_size = unit(v);
    }

    pub fn damping(&self) -> f32 {
        self.damping
    }

    pub fn set_damping(&mut self, v: f32) {
        self.damping = unit(v);
    }

    pub fn wet(&self) -> f32 {
        self.wet
    }

    pub fn set_wet(&mut self, v: f32) {
        self.wet = unit(v);
    }

    pub fn dry(&self) -> f32 {
        self.dry
    }

    pub fn set_dry(&mut self, v: f32) {
        self.dry = unit(v);
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn set_width(&mut self, v: f32) {
        self.width = unit(v);
    }

    /// Length of the first left comb line, for inspecting rate scaling.
    pub fn first_comb_len(&self) -> usize {
        self.combs[0].first().map_or(0, |c| c.buffer.len())
    }

    fn tank(&mut self, side: usize, input: f32) -> f32 {
        let feedback = self.room_size * ROOM_SCALE + ROOM_OFFSET;
        let damp = self.damping;
        let mut out = 0.0;
        for comb in &mut self.combs[side] {
            out += comb.process(input, feedback, damp);
        }
        for ap in &mut self.allpasses[side] {
            out = ap.process(out);
        }
        out
    }
}

impl Default for Reverb {
    fn default() -> Self {
        Self::new(0.5, 0.5, 0.33, 1.0, 1.0)
    }
}

fn unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

impl Processor for Reverb {
    fn prepare(&mut self, spec: &AudioSpec) {
        if spec.sample_rate == self.sample_rate && !self.combs[0].is_empty() {
            return;
        }
        self.sample_rate = spec.sample_rate;
        let scale = spec.sample_rate as f64 / TUNING_RATE;
        let len = |t: usize, spread: usize| libm::round((t + spread) as f64 * scale) as usize;
        for (side, spread) in [(0, 0), (1, STEREO_SPREAD)] {
            self.combs[side] = COMB_TUNING.iter().map(|&t| Comb::new(len(t, spread))).collect();
            self.allpasses[side] = ALLPASS_TUNING
                .iter()
                .map(|&t| Allpass::new(len(t, spread)))
                .collect();
        }
    }

    fn reset(&mut self) {
        for side in 0..2 {
            self.combs[side].iter_mut().for_each(Comb::clear);
            self.allpasses[side].iter_mut().for_each(Allpass::clear);
        }
    }

    fn process_frame(&mut self, frame: &mut [f32]) {
        if self.combs[0].is_empty() {
            return;
        }
        let wet = self.wet * SCALE_WET;
        let wet1 = wet * (self.width / 2.0 + 0.5);
        let wet2 = wet * ((1.0 - self.width) / 2.0);
        let dry = self.dry;

        match frame {
            [mono] => {
                let input = *mono * 2.0 * FIXED_GAIN;
                let out = self.tank(0, input);
                *mono = out * wet + *mono * dry;
            }
            [left, right, ..] => {
                let input = (*left + *right) * FIXED_GAIN;
                let out_l = self.tank(0, input);
                let out_r = self.tank(1, input);
                let (l, r) = (*left, *right);
                *left = out_l * wet1 + out_r * wet2 + l * dry;
                *right = out_r * wet1 + out_l * wet2 + r * dry;
            }
            [] => {}
        }
    }
}
