//! Procedural waveform stream.

use core::f64::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::audio_buffer::encode_sample;
use crate::spec::AudioSpec;
use crate::stream::AudioStream;

const DEFAULT_SEED: u64 = 0x5eed_a0d1_0000_0001;

/// Periodic shape produced by a `GeneratorStream`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
    /// Uniform white noise in [-amplitude, amplitude).
    Noise,
}

impl Waveform {
    /// Parse a lowercase waveform name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sine" => Some(Waveform::Sine),
            "square" => Some(Waveform::Square),
            "sawtooth" | "saw" => Some(Waveform::Sawtooth),
            "triangle" => Some(Waveform::Triangle),
            "noise" => Some(Waveform::Noise),
            _ => None,
        }
    }

    /// Value at normalised phase `p` in [0, 1).
    fn eval(self, p: f64) -> f64 {
        match self {
            Waveform::Sine => libm::sin(TAU * p),
            Waveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * p - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * libm::fabs(p - 0.5),
            Waveform::Noise => 0.0,
        }
    }
}

/// Unbounded waveform producer.
///
/// Phase is derived from the absolute frame index, so consecutive reads
/// are continuous and seeking is exact for the periodic shapes.
#[derive(Clone, Debug)]
pub struct GeneratorStream {
    spec: AudioSpec,
    waveform: Waveform,
    frequency: f64,
    amplitude: f32,
    frame: usize,
    seed: u64,
    rng: Pcg32,
    open: bool,
}

impl GeneratorStream {
    /// An open generator.
    pub fn new(spec: AudioSpec, waveform: Waveform, frequency: f64, amplitude: f32) -> Self {
        Self {
            spec,
            waveform,
            frequency: frequency.max(0.0),
            amplitude,
            frame: 0,
            seed: DEFAULT_SEED,
            rng: Pcg32::seed_from_u64(DEFAULT_SEED),
            open: true,
        }
    }

    /// Reseed the noise source.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = Pcg32::seed_from_u64(seed);
        self
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency.max(0.0);
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn set_amplitude(&mut self, amplitude: f32) {
        self.amplitude = amplitude;
    }

    fn next_value(&mut self, n: usize) -> f64 {
        let amp = self.amplitude as f64;
        if self.waveform == Waveform::Noise {
            return amp * self.rng.gen_range(-1.0..1.0);
        }
        let rate = self.spec.sample_rate as f64;
        if rate <= 0.0 {
            return 0.0;
        }
        let phase = libm::fmod(n as f64 * self.frequency, rate) / rate;
        amp * self.waveform.eval(phase)
    }
}

impl AudioStream for GeneratorStream {
    /// `source_id` is a waveform name, or empty to keep the current one.
    fn open(&mut self, source_id: &str) -> bool {
        if !source_id.is_empty() {
            match Waveform::from_name(source_id) {
                Some(w) => self.waveform = w,
                None => return false,
            }
        }
        self.frame = 0;
        self.rng = Pcg32::seed_from_u64(self.seed);
        self.open = true;
        true
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn spec(&self) -> AudioSpec {
        self.spec
    }

    fn read(&mut self, dst: &mut [u8], frames: usize) -> usize {
        if !self.open {
            return 0;
        }
        let format = self.spec.format;
        let bps = self.spec.bytes_per_sample();
        let channels = self.spec.channels();
        let bpf = bps * channels;
        let frames = frames.min(dst.len() / bpf);

        for i in 0..frames {
            let value = self.next_value(self.frame.wrapping_add(i));
            let base = i * bpf;
            for ch in 0..channels {
                let at = base + ch * bps;
                encode_sample(format, value, &mut dst[at..at + bps]);
            }
        }
        self.frame = self.frame.wrapping_add(frames);
        frames
    }

    fn seek(&mut self, frame: usize) -> bool {
        if !self.open {
            return false;
        }
        self.frame = frame;
        true
    }

    fn tell(&self) -> usize {
        self.frame
    }

    fn total_frames(&self) -> usize {
        usize::MAX
    }
}
