//! Note-based vocal synthesiser for vstudio.
//!
//! Notes carry a MIDI pitch, timing, velocity and lyrics. Lyrics map to a
//! small phoneme table, each phoneme shaping the harmonic content of an
//! additive voice. [`VocalSynth::synthesize`] renders the notes into a
//! stereo float32 `AudioBuffer`; [`VocalProject`] stores them as JSON.

mod note;
mod phoneme;
mod project;
mod synth;

pub use note::{Note, SynthParams, Vibrato, MAX_MIDI_NOTE};
pub use phoneme::{lyrics_to_phonemes, Phoneme, Phonemes, MAX_PHONEMES};
pub use project::{ProjectError, TimeSignature, VocalProject};
pub use synth::{CompletionCallback, ProgressCallback, VocalSynth};
