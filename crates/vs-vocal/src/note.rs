//! Notes and synthesis parameters.

use serde::{Deserialize, Serialize};

use crate::phoneme::{lyrics_to_phonemes, Phonemes};

/// Highest valid MIDI note number.
pub const MAX_MIDI_NOTE: u8 = 127;

/// Amplitude modulation applied over a note.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vibrato {
    /// Hz.
    pub rate: f32,
    /// Fraction of full level, 0..1.
    pub depth: f32,
}

/// One sung note.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Note {
    pub midi_note: u8,
    /// Seconds from the start of the render.
    pub start: f64,
    /// Seconds.
    pub duration: f64,
    pub velocity: u8,
    pub lyrics: String,
    /// Semitones.
    pub pitch_bend: f32,
    pub vibrato: Option<Vibrato>,
}

impl Default for Note {
    fn default() -> Self {
        Self {
            midi_note: 69,
            start: 0.0,
            duration: 0.5,
            velocity: 100,
            lyrics: "a".into(),
            pitch_bend: 0.0,
            vibrato: None,
        }
    }
}

impl Note {
    pub fn new(midi_note: u8, start: f64, duration: f64, velocity: u8, lyrics: &str) -> Self {
        Self {
            midi_note,
            start,
            duration,
            velocity,
            lyrics: lyrics.into(),
            ..Self::default()
        }
    }

    pub fn with_vibrato(mut self, rate: f32, depth: f32) -> Self {
        self.vibrato = Some(Vibrato { rate, depth });
        self
    }

    pub fn with_pitch_bend(mut self, semitones: f32) -> Self {
        self.pitch_bend = semitones;
        self
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Fundamental in Hz including pitch bend. Note numbers above
    /// `MAX_MIDI_NOTE` are read as `MAX_MIDI_NOTE`.
    pub fn frequency(&self) -> f64 {
        let semis = self.midi_note.min(MAX_MIDI_NOTE) as f64 - 69.0 + self.pitch_bend as f64;
        440.0 * 2f64.powf(semis / 12.0)
    }

    pub fn phonemes(&self) -> Phonemes {
        lyrics_to_phonemes(&self.lyrics)
    }

    /// Whether the note can be rendered: a MIDI note in 0..=127, a finite
    /// non-negative start and a positive duration.
    pub fn is_renderable(&self) -> bool {
        self.midi_note <= MAX_MIDI_NOTE
            && self.start.is_finite() && self.start >= 0.0 && self.duration.is_finite() && self.duration > 0.0
    }
}

/// Voice-wide synthesis parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthParams {
    /// Noise level relative to the voiced tone.
    pub breathiness: f32,
    pub master_gain: f32,
    /// Level of the phoneme harmonic relative to the fundamental.
    pub harmonic_weight: f32,
    /// Fractions of each note spent ramping in and out.
    pub attack: f32,
    pub release: f32,
    pub noise_seed: u64,
}

impl Default for SynthParams {
    fn default() -> Self {
        Self {
            breathiness: 0.02,
            master_gain: 1.0,
            harmonic_weight: 0.5,
            attack: 0.1,
            release: 0.1,
            noise_seed: 0x766f_6361,
        }
    }
}
