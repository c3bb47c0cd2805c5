//! Additive note renderer.

use std::f64::consts::TAU;

use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use vs_core::{AudioBuffer, AudioSpec, ChannelLayout};

use crate::note::{Note, SynthParams};
use crate::phoneme::Phoneme;

/// Longest consonant noise burst, in seconds.
const BURST_SECONDS: f64 = 0.015;
const BURST_LEVEL: f32 = 0.3;

/// Called after each note with the fraction of notes done.
pub type ProgressCallback = Box<dyn FnMut(f32) + Send>;
/// Called once when a render finishes.
pub type CompletionCallback = Box<dyn FnMut() + Send>;

/// Renders a list of notes into a stereo float32 buffer.
#[derive(Default)]
pub struct VocalSynth {
    notes: Vec<Note>,
    params: SynthParams,
    on_progress: Option<ProgressCallback>,
    on_complete: Option<CompletionCallback>,
}

impl VocalSynth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(mut self, params: SynthParams) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> &SynthParams {
        &self.params
    }

    pub fn set_params(&mut self, params: SynthParams) {
        self.params = params;
    }

    // --- Notes ---

    pub fn add_note(&mut self, note: Note) {
        self.notes.push(note);
    }

    pub fn remove_note(&mut self, index: usize) -> Option<Note> {
        (index < self.notes.len()).then(|| self.notes.remove(index))
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn notes_mut(&mut self) -> &mut Vec<Note> {
        &mut self.notes
    }

    pub fn clear_notes(&mut self) {
        self.notes.clear();
    }

    /// End of the last renderable note in seconds; 0 with no notes.
    pub fn total_duration(&self) -> f64 {
        self.notes
            .iter()
            .filter(|n| n.is_renderable())
            .map(Note::end)
            .fold(0.0, f64::max)
    }

    // --- Callbacks ---

    pub fn set_progress_callback(&mut self, callback: impl FnMut(f32) + Send + 'static) {
        self.on_progress = Some(Box::new(callback));
    }

    pub fn set_completion_callback(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    pub fn clear_callbacks(&mut self) {
        self.on_progress = None;
        self.on_complete = None;
    }

    // --- Rendering ---

    /// Render every note at `sample_rate`.
    ///
    /// The result is `round(total_duration * sample_rate)` stereo frames.
    /// Notes with a negative start or a non-positive duration are skipped;
    /// tails past the end are clipped. Noise is seeded from the params, so
    /// identical input renders identical output.
    pub fn synthesize(&mut self, sample_rate: u32) -> AudioBuffer {
        let spec = AudioSpec::float(sample_rate, ChannelLayout::Stereo);
        let frames = if sample_rate == 0 {
            0
        } else {
            spec.seconds_to_frames(self.total_duration())
        };
        let mut out = AudioBuffer::new(spec, frames);
        let mut rng = Pcg32::seed_from_u64(self.params.noise_seed);
        let mut voice = Vec::new();
        let count = self.notes.len();

        for (i, note) in self.notes.iter().enumerate() {
            if sample_rate > 0 && note.is_renderable() {
                render_note(note, &self.params, sample_rate, &mut rng, &mut voice);
                let start = spec.seconds_to_frames(note.start);
                if let Some(samples) = out.as_f32_mut() {
                    for (k, v) in voice.iter().enumerate() {
                        let f = start + k;
                        if f >= frames {
                            break;
                        }
                        samples[2 * f] += v;
                        samples[2 * f + 1] += v;
                    }
                }
            } else {
                debug!("skipping note {i}: start {} duration {}", note.start, note.duration);
            }
            if let Some(progress) = self.on_progress.as_mut() {
                progress((i + 1) as f32 / count as f32);
            }
        }

        if let Some(complete) = self.on_complete.as_mut() {
            complete();
        }
        info!("rendered {count} notes into {frames} frames at {sample_rate} Hz");
        out
    }
}

impl std::fmt::Debug for VocalSynth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VocalSynth")
            .field("notes", &self.notes)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Render one note as mono samples into `out`, replacing its contents.
///
/// Each phoneme gets an equal share of the note. A voiced phoneme is
/// `(sin(p) + w sin(h p)) / (1 + w)` plus breath noise; consonant onsets
/// add a decaying noise burst; pauses are silent. The whole note is
/// shaped by the attack/release ramps, then vibrato.
fn render_note(note: &Note, params: &SynthParams, sample_rate: u32, rng: &mut Pcg32, out: &mut Vec<f32>) {
    let sr = sample_rate as f64;
    let n = (note.duration * sr).round() as usize;
    out.clear();
    out.resize(n, 0.0);
    if n == 0 {
        return;
    }

    let freq = note.frequency();
    let gain = note.velocity.min(127) as f32 / 127.0 * params.master_gain.max(0.0);
    let w = params.harmonic_weight.max(0.0) as f64;
    let breath = params.breathiness.max(0.0);
    let attack = (params.attack.clamp(0.0, 0.5) * n as f32) as usize;
    let release = (params.release.clamp(0.0, 0.5) * n as f32) as usize;

    let phonemes = note.phonemes();
    let segments = phonemes.len();
    let burst = ((BURST_SECONDS * sr) as usize).min(n / segments / 5).max(1);

    for (k, sample) in out.iter_mut().enumerate() {
        let seg = (k * segments / n).min(segments - 1);
        let phoneme = phonemes[seg];
        let Some(harmonic) = phoneme.harmonic() else {
            continue;
        };

        let t = k as f64 / sr;
        let phase = TAU * freq * t;
        let tone = ((phase.sin() + w * (harmonic * phase).sin()) / (1.0 + w)) as f32;
        let mut s = tone + breath * rng.gen_range(-1.0f32..1.0);

        if phoneme.is_consonant() {
            let seg_start = (seg * n).div_ceil(segments);
            let into = k.saturating_sub(seg_start);
            if into < burst {
                let decay = 1.0 - into as f32 / burst as f32;
                s += BURST_LEVEL * decay * rng.gen_range(-1.0f32..1.0);
            }
        }

        let env = if k < attack {
            k as f32 / attack as f32
        } else if k >= n - release {
            (n - 1 - k) as f32 / release as f32
        } else {
            1.0
        };
        s *= env * gain;

        if let Some(v) = note.vibrato {
            s *= 1.0 + v.depth * (TAU * v.rate as f64 * t).sin() as f32;
        }
        *sample = s;
    }

    if phonemes.iter().all(|p| *p == Phoneme::Pause) {
        debug!("note {} is all pauses", note.midi_note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn empty_synth_renders_nothing() {
        let mut synth = VocalSynth::new();
        let buf = synth.synthesize(44100);
        assert_eq!(buf.frames(), 0);
        assert_eq!(buf.channels(), 2);
    }

    #[test]
    fn note_envelope_starts_and_ends_silent() {
        let mut synth = VocalSynth::new();
        synth.add_note(Note::new(69, 0.0, 0.1, 127, "a"));
        let buf = synth.synthesize(8000);
        assert_eq!(buf.frames(), 800);
        assert_eq!(buf.sample(0, 0), 0.0);
        assert_eq!(buf.sample(799, 1), 0.0);
        assert_eq!(buf.sample(400, 0), buf.sample(400, 1));
    }

    #[test]
    fn pause_renders_silence() {
        let mut synth = VocalSynth::new();
        synth.add_note(Note::new(60, 0.0, 0.2, 100, " "));
        let buf = synth.synthesize(8000);
        assert!(buf.as_f32().unwrap().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn invalid_notes_are_skipped_and_late_starts_offset() {
        let mut synth = VocalSynth::new();
        synth.add_note(Note::new(60, 0.0, -1.0, 100, "a"));
        synth.add_note(Note::new(200, 0.0, 2.0, 100, "a"));
        synth.add_note(Note::new(60, 0.5, 0.25, 100, "a"));
        let buf = synth.synthesize(1000);
        assert_eq!(buf.frames(), 750);
        let samples = buf.as_f32().unwrap();
        assert!(samples[..1000].iter().all(|&s| s == 0.0));
        assert!(samples[1000..].iter().any(|&s| s != 0.0));
    }

    #[test]
    fn same_seed_same_output() {
        let render = || {
            let mut synth = VocalSynth::new();
            synth.add_note(Note::new(64, 0.0, 0.2, 90, "kasa"));
            synth.synthesize(8000)
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn callbacks_fire() {
        let progress = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(AtomicUsize::new(0));
        let mut synth = VocalSynth::new();
        synth.add_note(Note::new(60, 0.0, 0.05, 100, "a"));
        synth.add_note(Note::new(62, 0.05, 0.05, 100, "i"));
        let p = Arc::clone(&progress);
        synth.set_progress_callback(move |f| p.lock().unwrap().push(f));
        let d = Arc::clone(&done);
        synth.set_completion_callback(move || {
            d.fetch_add(1, Ordering::Relaxed);
        });
        synth.synthesize(8000);
        assert_eq!(*progress.lock().unwrap(), vec![0.5, 1.0]);
        assert_eq!(done.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn vibrato_modulates_level() {
        let mut plain = VocalSynth::new();
        plain.add_note(Note::new(69, 0.0, 0.2, 100, "a"));
        let mut wobbly = VocalSynth::new();
        wobbly.add_note(Note::new(69, 0.0, 0.2, 100, "a").with_vibrato(5.0, 0.5));
        assert_ne!(plain.synthesize(8000), wobbly.synthesize(8000));
    }
}
