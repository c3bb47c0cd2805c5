//! Offline, time-addressed editing of a single buffer.

use std::f64::consts::TAU;
use std::ops::Range;

use log::debug;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use vs_core::{db_to_linear, AudioBuffer, SampleFormat};
use vs_dsp::{Effect, EffectChain};

use crate::history::{UndoStack, DEFAULT_HISTORY_DEPTH};

const DEFAULT_NOISE_SEED: u64 = 0x5eed_f00d;

/// Peak below which `normalize` leaves the buffer alone.
const NORMALIZE_FLOOR: f64 = 1e-9;

/// A time range in seconds kept for display. Editing operations take
/// explicit times and ignore it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Selection {
    pub start: f64,
    pub end: f64,
}

impl Selection {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Editor owning one buffer.
///
/// Times are seconds from the start of the buffer and are clamped to it.
/// A range whose clamped start is not before its clamped end is a no-op.
/// Every operation returns whether the buffer changed; each change is one
/// undo entry.
#[derive(Debug)]
pub struct WaveformEditor {
    buffer: AudioBuffer,
    selection: Option<Selection>,
    history: UndoStack,
    rng: Pcg32,
}

impl WaveformEditor {
    pub fn new(buffer: AudioBuffer) -> Self {
        Self::with_history_depth(buffer, DEFAULT_HISTORY_DEPTH)
    }

    /// Editor keeping at most `depth` undo entries; 0 disables history.
    pub fn with_history_depth(buffer: AudioBuffer, depth: usize) -> Self {
        Self {
            buffer,
            selection: None,
            history: UndoStack::new(depth),
            rng: Pcg32::seed_from_u64(DEFAULT_NOISE_SEED),
        }
    }

    /// Reseed the noise generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Pcg32::seed_from_u64(seed);
        self
    }

    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }

    /// Direct access to the buffer. Changes made here are not recorded in
    /// the undo history.
    pub fn buffer_mut(&mut self) -> &mut AudioBuffer {
        &mut self.buffer
    }

    pub fn into_buffer(self) -> AudioBuffer {
        self.buffer
    }

    pub fn duration(&self) -> f64 {
        self.buffer.duration()
    }

    // --- Selection ---

    /// Select `[t0, t1]`, ordered and clamped to the buffer.
    pub fn set_selection(&mut self, t0: f64, t1: f64) {
        let d = self.duration();
        let clamp = |t: f64| if t.is_nan() { 0.0 } else { t.clamp(0.0, d) };
        let (a, b) = (clamp(t0), clamp(t1));
        self.selection = Some(Selection {
            start: a.min(b),
            end: a.max(b),
        });
    }

    pub fn select_all(&mut self) {
        self.set_selection(0.0, self.duration());
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    // --- History ---

    pub fn undo(&mut self) -> bool {
        let label = self.history.undo_label();
        match self.history.undo() {
            Some(before) => {
                self.buffer = before.clone();
                debug!("undo {}", label.unwrap_or("edit"));
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        let label = self.history.redo_label();
        match self.history.redo() {
            Some(after) => {
                self.buffer = after.clone();
                debug!("redo {}", label.unwrap_or("edit"));
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    // --- Structural edits ---

    /// Remove `[t0, t1)` by shifting the rest of the buffer left. The length
    /// is unchanged; the vacated tail is silenced.
    pub fn delete_range(&mut self, t0: f64, t1: f64) -> bool {
        record(&mut self.history, &mut self.buffer, "delete", |buf| {
            let Some(r) = frame_range(buf, t0, t1) else {
                return false;
            };
            let n = buf.frames();
            let bpf = buf.spec().bytes_per_frame();
            let removed = r.len();
            buf.as_bytes_mut().copy_within(r.end * bpf..n * bpf, r.start * bpf);
            silence_frames(buf, n - removed..n);
            true
        })
    }

    /// Insert `dur` seconds of silence at `t0`, growing the buffer.
    pub fn insert_silence(&mut self, t0: f64, dur: f64) -> bool {
        record(&mut self.history, &mut self.buffer, "insert silence", |buf| {
            let spec = *buf.spec();
            let inserted = spec.seconds_to_frames(dur);
            if inserted == 0 {
                return false;
            }
            let at = frame_at(buf, t0);
            let bpf = spec.bytes_per_frame();
            let mut out = AudioBuffer::new(spec, buf.frames() + inserted);
            let src = buf.as_bytes();
            let dst = out.as_bytes_mut();
            dst[..at * bpf].copy_from_slice(&src[..at * bpf]);
            dst[(at + inserted) * bpf..].copy_from_slice(&src[at * bpf..]);
            *buf = out;
            true
        })
    }

    /// Keep only `[t0, t1)`.
    pub fn crop(&mut self, t0: f64, t1: f64) -> bool {
        record(&mut self.history, &mut self.buffer, "crop", |buf| {
            match frame_range(buf, t0, t1) {
                Some(r) if r.len() < buf.frames() => {
                    *buf = buf.extract_frames(r.start, r.len());
                    true
                }
                _ => false,
            }
        })
    }

    /// Drop leading and trailing frames whose largest channel magnitude does
    /// not exceed `threshold_db` dBFS. No-op when no frame exceeds it.
    pub fn trim_silence(&mut self, threshold_db: f32) -> bool {
        record(&mut self.history, &mut self.buffer, "trim silence", |buf| {
            let threshold = db_to_linear(threshold_db);
            let loud = |f: usize| (0..buf.channels()).any(|ch| buf.sample(f, ch).abs() > threshold);
            let Some(first) = (0..buf.frames()).find(|&f| loud(f)) else {
                return false;
            };
            let last = (first..buf.frames()).rev().find(|&f| loud(f)).unwrap_or(first);
            let count = last - first + 1;
            if count == buf.frames() {
                return false;
            }
            *buf = buf.extract_frames(first, count);
            true
        })
    }

    /// Resample the whole buffer. Float buffers only.
    pub fn sample_rate_conversion(&mut self, new_rate: u32) -> bool {
        record(&mut self.history, &mut self.buffer, "resample", |buf| {
            let old = buf.sample_rate();
            if new_rate == 0 || new_rate == old || !buf.spec().format.is_float() {
                return false;
            }
            buf.resample(new_rate);
            buf.sample_rate() == new_rate
        })
    }

    // --- Level edits ---

    /// Scale so the largest absolute sample equals `target`.
    pub fn normalize(&mut self, target: f32) -> bool {
        record(&mut self.history, &mut self.buffer, "normalize", |buf| {
            if !(target.is_finite() && target >= 0.0) {
                return false;
            }
            let data = buf.data();
            let peak = (0..data.len()).map(|i| data.get(i).abs()).fold(0.0f64, f64::max);
            if peak <= NORMALIZE_FLOOR {
                return false;
            }
            buf.apply_gain((target as f64 / peak) as f32);
            true
        })
    }

    pub fn amplify(&mut self, gain: f32) -> bool {
        record(&mut self.history, &mut self.buffer, "amplify", |buf| {
            if !gain.is_finite() || buf.is_empty() {
                return false;
            }
            buf.apply_gain(gain);
            true
        })
    }

    /// Linear gain ramp from `l0` at `t0` towards `l1` at `t1`: frame `i` of
    /// `N` is scaled by `l0 + (l1 - l0) * i / N`.
    pub fn fade(&mut self, t0: f64, t1: f64, l0: f32, l1: f32) -> bool {
        record(&mut self.history, &mut self.buffer, "fade", |buf| {
            let Some(r) = frame_range(buf, t0, t1) else {
                return false;
            };
            let (l0, l1, n) = (l0 as f64, l1 as f64, r.len() as f64);
            for (i, f) in r.enumerate() {
                let gain = l0 + (l1 - l0) * (i as f64 / n);
                for ch in 0..buf.channels() {
                    let v = buf.sample_f64(f, ch);
                    buf.set_sample_f64(f, ch, v * gain);
                }
            }
            true
        })
    }

    pub fn fade_in(&mut self, t0: f64, t1: f64) -> bool {
        self.fade(t0, t1, 0.0, 1.0)
    }

    pub fn fade_out(&mut self, t0: f64, t1: f64) -> bool {
        self.fade(t0, t1, 1.0, 0.0)
    }

    /// Reverse the frame order within `[t0, t1)`.
    pub fn reverse(&mut self, t0: f64, t1: f64) -> bool {
        record(&mut self.history, &mut self.buffer, "reverse", |buf| {
            let Some(r) = frame_range(buf, t0, t1) else {
                return false;
            };
            let bpf = buf.spec().bytes_per_frame();
            let bytes = buf.as_bytes_mut();
            let (mut a, mut b) = (r.start, r.end - 1);
            while a < b {
                let (head, tail) = bytes.split_at_mut(b * bpf);
                head[a * bpf..(a + 1) * bpf].swap_with_slice(&mut tail[..bpf]);
                a += 1;
                b -= 1;
            }
            true
        })
    }

    /// Flip polarity in `[t0, t1)`. Integer formats use the one's
    /// complement, so inverting twice restores the exact samples.
    pub fn invert(&mut self, t0: f64, t1: f64) -> bool {
        record(&mut self.history, &mut self.buffer, "invert", |buf| {
            let Some(r) = frame_range(buf, t0, t1) else {
                return false;
            };
            buf.invert_frames(r.start, r.len());
            true
        })
    }

    pub fn silence(&mut self, t0: f64, t1: f64) -> bool {
        record(&mut self.history, &mut self.buffer, "silence", |buf| {
            match frame_range(buf, t0, t1) {
                Some(r) => {
                    silence_frames(buf, r);
                    true
                }
                None => false,
            }
        })
    }

    // --- Generators ---

    /// Overwrite `dur` seconds from `t0` with a sine of `freq` Hz and peak
    /// `amplitude` on every channel. Phase starts at 0 at `t0`.
    pub fn generate_tone(&mut self, t0: f64, dur: f64, freq: f64, amplitude: f32) -> bool {
        record(&mut self.history, &mut self.buffer, "tone", |buf| {
            let Some(r) = span(buf, t0, dur) else {
                return false;
            };
            let sr = buf.sample_rate() as f64;
            for (i, f) in r.enumerate() {
                let v = amplitude * (TAU * freq * i as f64 / sr).sin() as f32;
                for ch in 0..buf.channels() {
                    buf.set_sample(f, ch, v);
                }
            }
            true
        })
    }

    /// Overwrite `dur` seconds from `t0` with uniform noise in
    /// `[-amplitude, amplitude)`.
    pub fn generate_noise(&mut self, t0: f64, dur: f64, amplitude: f32) -> bool {
        let rng = &mut self.rng;
        record(&mut self.history, &mut self.buffer, "noise", |buf| {
            let Some(r) = span(buf, t0, dur) else {
                return false;
            };
            for f in r {
                for ch in 0..buf.channels() {
                    let v = amplitude * rng.gen_range(-1.0f32..1.0);
                    buf.set_sample(f, ch, v);
                }
            }
            true
        })
    }

    // --- Processing ---

    /// Run `effect` over `[t0, t1)` only. Float32 buffers only.
    pub fn apply_effect(&mut self, effect: &mut Effect, t0: f64, t1: f64) -> bool {
        record(&mut self.history, &mut self.buffer, "effect", |buf| {
            process_range(buf, t0, t1, |tmp| effect.process(tmp))
        })
    }

    /// Run a whole chain over `[t0, t1)`. Float32 buffers only.
    pub fn apply_chain(&mut self, chain: &mut EffectChain, t0: f64, t1: f64) -> bool {
        record(&mut self.history, &mut self.buffer, "effect chain", |buf| {
            process_range(buf, t0, t1, |tmp| chain.process(tmp))
        })
    }

    /// Add `other * gain` into the buffer from `t0`. Channels `other` lacks
    /// take its first channel. Sample rates are not reconciled.
    pub fn mix(&mut self, other: &AudioBuffer, t0: f64, gain: f32) -> bool {
        record(&mut self.history, &mut self.buffer, "mix", |buf| {
            let start = frame_at(buf, t0);
            if other.is_empty() || start >= buf.frames() {
                return false;
            }
            let count = other.frames().min(buf.frames() - start);
            let src_channels = other.channels();
            let gain = gain as f64;
            for i in 0..count {
                for ch in 0..buf.channels() {
                    let sch = if ch < src_channels { ch } else { 0 };
                    let v = buf.sample_f64(start + i, ch) + other.sample_f64(i, sch) * gain;
                    buf.set_sample_f64(start + i, ch, v);
                }
            }
            true
        })
    }
}

/// Run `op` on the buffer and, if it reports a change, push an undo entry.
fn record(
    history: &mut UndoStack,
    buffer: &mut AudioBuffer,
    label: &'static str,
    op: impl FnOnce(&mut AudioBuffer) -> bool,
) -> bool {
    let before = (history.depth() > 0).then(|| buffer.clone());
    if !op(buffer) {
        return false;
    }
    if let Some(before) = before {
        history.push(label, before, buffer.clone());
    }
    true
}

/// Frame index of `t` seconds, clamped to `[0, frames]`.
fn frame_at(buf: &AudioBuffer, t: f64) -> usize {
    buf.spec().seconds_to_frames(t).min(buf.frames())
}

fn frame_range(buf: &AudioBuffer, t0: f64, t1: f64) -> Option<Range<usize>> {
    let (a, b) = (frame_at(buf, t0), frame_at(buf, t1));
    (a < b).then_some(a..b)
}

fn span(buf: &AudioBuffer, t0: f64, dur: f64) -> Option<Range<usize>> {
    let start = frame_at(buf, t0);
    let count = buf.spec().seconds_to_frames(dur).min(buf.frames() - start);
    (count > 0).then_some(start..start + count)
}

fn silence_frames(buf: &mut AudioBuffer, frames: Range<usize>) {
    for f in frames {
        for ch in 0..buf.channels() {
            buf.set_sample(f, ch, 0.0);
        }
    }
}

fn process_range(
    buf: &mut AudioBuffer,
    t0: f64,
    t1: f64,
    op: impl FnOnce(&mut AudioBuffer),
) -> bool {
    if buf.spec().format != SampleFormat::F32 {
        return false;
    }
    let Some(r) = frame_range(buf, t0, t1) else {
        return false;
    };
    let mut tmp = buf.extract_frames(r.start, r.len());
    op(&mut tmp);
    buf.write_frames(r.start, &tmp);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use vs_core::{AudioSpec, ChannelLayout};
    use vs_dsp::{Distortion, DistortionKind};

    /// Mono float buffer at 10 Hz so one frame is 0.1 s.
    fn ramp(n: usize) -> AudioBuffer {
        let samples = (0..n).map(|i| (i + 1) as f32 / 10.0).collect();
        AudioBuffer::from_interleaved_f32(10, ChannelLayout::Mono, samples)
    }

    fn samples(buf: &AudioBuffer) -> Vec<f32> {
        buf.as_f32().unwrap().to_vec()
    }

    #[test]
    fn delete_shifts_left_and_keeps_length() {
        let mut ed = WaveformEditor::new(ramp(6));
        assert!(ed.delete_range(0.1, 0.3));
        assert_eq!(samples(ed.buffer()), vec![0.1, 0.4, 0.5, 0.6, 0.0, 0.0]);
    }

    #[test]
    fn insert_silence_grows_buffer() {
        let mut ed = WaveformEditor::new(ramp(4));
        assert!(ed.insert_silence(0.2, 0.3));
        assert_eq!(samples(ed.buffer()), vec![0.1, 0.2, 0.0, 0.0, 0.0, 0.3, 0.4]);
    }

    #[test]
    fn empty_or_inverted_ranges_are_noops() {
        let mut ed = WaveformEditor::new(ramp(4));
        assert!(!ed.silence(0.3, 0.1));
        assert!(!ed.reverse(5.0, 9.0));
        assert!(!ed.crop(0.0, 0.0));
        assert!(!ed.can_undo());
    }

    #[test]
    fn normalize_scales_to_target() {
        let mut ed = WaveformEditor::new(ramp(5));
        assert!(ed.normalize(1.0));
        let s = samples(ed.buffer());
        assert!((s[4] - 1.0).abs() < 1e-6);
        assert!((s[0] - 0.2).abs() < 1e-6);

        let mut silent = WaveformEditor::new(AudioBuffer::new(AudioSpec::float(10, ChannelLayout::Mono), 4));
        assert!(!silent.normalize(1.0));
    }

    #[test]
    fn fade_uses_i_over_n() {
        let buf = AudioBuffer::from_interleaved_f32(10, ChannelLayout::Mono, vec![1.0; 4]);
        let mut ed = WaveformEditor::new(buf);
        assert!(ed.fade_in(0.0, 0.4));
        assert_eq!(samples(ed.buffer()), vec![0.0, 0.25, 0.5, 0.75]);
    }

    #[test]
    fn reverse_subrange() {
        let mut ed = WaveformEditor::new(ramp(5));
        assert!(ed.reverse(0.1, 0.4));
        assert_eq!(samples(ed.buffer()), vec![0.1, 0.4, 0.3, 0.2, 0.5]);
    }

    #[test]
    fn reverse_moves_whole_frames() {
        let buf = AudioBuffer::from_interleaved_f32(10, ChannelLayout::Stereo, vec![1.0, -1.0, 2.0, -2.0]);
        let mut ed = WaveformEditor::new(buf);
        assert!(ed.reverse(0.0, 0.2));
        assert_eq!(samples(ed.buffer()), vec![2.0, -2.0, 1.0, -1.0]);
    }

    #[test]
    fn trim_searches_frame_magnitude() {
        let buf = AudioBuffer::from_interleaved_f32(
            10,
            ChannelLayout::Stereo,
            vec![0.0, 0.0, 0.0, 0.5, 0.5, 0.0, 0.0, 0.0],
        );
        let mut ed = WaveformEditor::new(buf);
        assert!(ed.trim_silence(-40.0));
        assert_eq!(samples(ed.buffer()), vec![0.0, 0.5, 0.5, 0.0]);

        let mut quiet = WaveformEditor::new(AudioBuffer::new(AudioSpec::float(10, ChannelLayout::Mono), 8));
        assert!(!quiet.trim_silence(-40.0));
        assert_eq!(quiet.buffer().frames(), 8);
    }

    #[test]
    fn mix_falls_back_to_first_channel() {
        let dst = AudioBuffer::new(AudioSpec::float(10, ChannelLayout::Stereo), 3);
        let src = AudioBuffer::from_interleaved_f32(10, ChannelLayout::Mono, vec![1.0, 1.0, 1.0]);
        let mut ed = WaveformEditor::new(dst);
        assert!(ed.mix(&src, 0.1, 0.5));
        assert_eq!(samples(ed.buffer()), vec![0.0, 0.0, 0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn tone_and_noise_overwrite_region() {
        let mut ed = WaveformEditor::new(AudioBuffer::new(AudioSpec::float(1000, ChannelLayout::Mono), 1000));
        assert!(ed.generate_tone(0.0, 0.5, 250.0, 0.5));
        let s = samples(ed.buffer());
        assert!(s[0].abs() < 1e-6);
        assert!((s[1] - 0.5).abs() < 1e-6);
        assert_eq!(s[600], 0.0);

        assert!(ed.generate_noise(0.5, 10.0, 0.25));
        let s = samples(ed.buffer());
        assert!(s[500..].iter().all(|v| v.abs() <= 0.25));
        assert!(s[500..].iter().any(|v| *v != 0.0));
    }

    #[test]
    fn effect_touches_only_the_range() {
        let buf = AudioBuffer::from_interleaved_f32(10, ChannelLayout::Mono, vec![0.9; 4]);
        let mut ed = WaveformEditor::new(buf);
        let mut clip = Effect::new(Distortion::new(DistortionKind::HardClip, 4.0, 0.5).into());
        assert!(ed.apply_effect(&mut clip, 0.2, 0.4));
        assert_eq!(samples(ed.buffer()), vec![0.9, 0.9, 0.5, 0.5]);
    }

    #[test]
    fn crop_and_undo_redo() {
        let mut ed = WaveformEditor::new(ramp(5));
        assert!(ed.crop(0.1, 0.3));
        assert_eq!(samples(ed.buffer()), vec![0.2, 0.3]);
        assert!(ed.undo());
        assert_eq!(ed.buffer().frames(), 5);
        assert!(ed.redo());
        assert_eq!(samples(ed.buffer()), vec![0.2, 0.3]);
        assert!(!ed.redo());
    }

    #[test]
    fn selection_is_ordered_and_clamped() {
        let mut ed = WaveformEditor::new(ramp(5));
        ed.set_selection(2.0, 0.1);
        assert_eq!(ed.selection(), Some(Selection { start: 0.1, end: 0.5 }));
        ed.clear_selection();
        assert!(ed.selection().is_none());
    }

    #[test]
    fn resample_changes_rate() {
        let mut ed = WaveformEditor::new(ramp(10));
        assert!(ed.sample_rate_conversion(20));
        assert_eq!(ed.buffer().sample_rate(), 20);
        assert_eq!(ed.buffer().frames(), 20);
        assert!(!ed.sample_rate_conversion(20));
    }
}
