//! Engine-owned playback entities.

use std::sync::{Arc, Mutex};

use log::warn;
use slotmap::new_key_type;
use vs_core::{decode_sample, AudioBuffer, AudioSpec, AudioStream, SampleFormat, Vec3, MAX_CHANNELS};
use vs_dsp::EffectChain;

use crate::lock;
use crate::spatial::{Cone, DistanceModel};

new_key_type! {
    /// Handle of a source inside its engine.
    pub struct SourceKey;
}

/// Fastest rate a stream-backed source can consume frames, relative to
/// the output rate. Bounds the per-source read scratch.
pub const MAX_STREAM_STEP: f64 = 8.0;

pub const MIN_PITCH: f32 = 0.1;

/// Combined gain below which a source is not mixed.
const SILENT_GAIN: f32 = 1e-4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

pub(crate) struct StreamBinding {
    stream: Box<dyn AudioStream>,
    bytes: Vec<u8>,
    frac: f64,
    eof: bool,
}

pub(crate) enum Binding {
    None,
    Buffer(Arc<AudioBuffer>),
    Stream(StreamBinding),
}

/// Per-batch values shared by every source in one mix pass.
pub(crate) struct MixContext<'a> {
    pub spec: &'a AudioSpec,
    pub listener_position: Vec3,
    pub listener_velocity: Vec3,
    pub listener_gain: f32,
    pub master_volume: f32,
    pub doppler: Option<(f32, f32)>,
}

pub(crate) struct SourceInner {
    state: PlaybackState,
    gain: f32,
    pitch: f32,
    pan: f32,
    looping: bool,
    position: Vec3,
    velocity: Vec3,
    direction: Vec3,
    distance: DistanceModel,
    cone: Cone,
    priority: i32,
    current_time: f64,
    /// Media seconds per output second used by the last rendered batch.
    rate: Option<f64>,
    /// Fractional buffer frame the next batch reads from.
    cursor: Option<f64>,
    binding: Binding,
    effects: Option<EffectChain>,
}

/// A playback entity bound to a buffer or a stream.
///
/// All state sits behind one mutex; every getter and setter takes it.
/// The engine holds the same lock while it renders the source's
/// contribution to a batch, so changes land on the next batch.
pub struct Source {
    key: SourceKey,
    output_spec: AudioSpec,
    stream_capacity: usize,
    inner: Mutex<SourceInner>,
}

impl Source {
    pub(crate) fn new(key: SourceKey, output_spec: AudioSpec, batch_frames: usize) -> Self {
        Self {
            key,
            output_spec,
            stream_capacity: (batch_frames as f64 * MAX_STREAM_STEP) as usize + 1,
            inner: Mutex::new(SourceInner {
                state: PlaybackState::Stopped,
                gain: 1.0,
                pitch: 1.0,
                pan: 0.0,
                looping: false,
                position: Vec3::ZERO,
                velocity: Vec3::ZERO,
                direction: Vec3::ZERO,
                distance: DistanceModel::default(),
                cone: Cone::default(),
                priority: 0,
                current_time: 0.0,
                rate: None,
                cursor: None,
                binding: Binding::None,
                effects: None,
            }),
        }
    }

    pub fn key(&self) -> SourceKey {
        self.key
    }

    pub(crate) fn inner(&self) -> &Mutex<SourceInner> {
        &self.inner
    }

    // --- Binding ---

    /// Bind an in-memory buffer, replacing any buffer or stream. Playback
    /// restarts from time 0; a playing source keeps playing. Only float32
    /// buffers are mixed.
    pub fn set_buffer(&self, buffer: Arc<AudioBuffer>) {
        if buffer.spec().format != SampleFormat::F32 {
            warn!(
                "source bound to {:?} buffer; only f32 buffers are mixed",
                buffer.spec().format
            );
        }
        let mut inner = lock(&self.inner);
        inner.binding = Binding::Buffer(buffer);
        inner.rewind();
    }

    /// Bind a stream, replacing any buffer or stream. The stream is read
    /// sequentially from its start.
    pub fn set_stream(&self, mut stream: Box<dyn AudioStream>) {
        if !stream.is_open() {
            warn!("source bound to a stream that is not open");
        }
        let _ = stream.seek(0);
        let bytes = vec![0u8; self.stream_capacity * stream.spec().bytes_per_frame()];
        let mut inner = lock(&self.inner);
        inner.binding = Binding::Stream(StreamBinding {
            stream,
            bytes,
            frac: 0.0,
            eof: false,
        });
        inner.rewind();
    }

    /// Remove the binding and stop.
    pub fn clear_binding(&self) {
        let mut inner = lock(&self.inner);
        inner.binding = Binding::None;
        inner.state = PlaybackState::Stopped;
        inner.rewind();
    }

    pub fn buffer(&self) -> Option<Arc<AudioBuffer>> {
        match &lock(&self.inner).binding {
            Binding::Buffer(b) => Some(Arc::clone(b)),
            _ => None,
        }
    }

    pub fn has_stream(&self) -> bool {
        matches!(lock(&self.inner).binding, Binding::Stream(_))
    }

    // --- Transport ---

    /// Start or resume. A source that stopped at its end restarts from 0.
    pub fn play(&self) {
        let mut inner = lock(&self.inner);
        match inner.state {
            PlaybackState::Playing => {}
            PlaybackState::Paused => inner.state = PlaybackState::Playing,
            PlaybackState::Stopped => {
                let duration = inner.duration();
                if inner.at_end(duration) {
                    inner.rewind();
                }
                inner.state = PlaybackState::Playing;
            }
        }
    }

    pub fn pause(&self) {
        let mut inner = lock(&self.inner);
        if inner.state == PlaybackState::Playing {
            inner.state = PlaybackState::Paused;
        }
    }

    /// Stop and reset the cursor to 0, seeking a bound stream back to its
    /// start.
    pub fn stop(&self) {
        let mut inner = lock(&self.inner);
        inner.state = PlaybackState::Stopped;
        inner.rewind();
    }

    pub fn state(&self) -> PlaybackState {
        lock(&self.inner).state
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    /// Advance the playback clock by `dt` seconds while playing, scaled by
    /// the rate the last rendered batch consumed media at (pitch when
    /// nothing was rendered since the previous update). At the end a looping source wraps and a one-shot source
    /// stops.
    pub fn update(&self, dt: f64) {
        lock(&self.inner).update(dt);
    }

    /// Playback position in seconds.
    pub fn current_time(&self) -> f64 {
        lock(&self.inner).current_time
    }

    /// Seek to `seconds`, clamped to the bound media.
    pub fn set_current_time(&self, seconds: f64) {
        let mut inner = lock(&self.inner);
        let duration = inner.duration();
        let t = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        let t = if duration.is_finite() { t.min(duration) } else { t };
        inner.current_time = t;
        inner.cursor = None;
        if let Binding::Stream(sb) = &mut inner.binding {
            let frame = (t * sb.stream.spec().sample_rate as f64).round() as usize;
            let _ = sb.stream.seek(frame);
            sb.frac = 0.0;
            sb.eof = false;
        }
    }

    /// Length of the bound media in seconds; infinite for unbounded
    /// streams, 0 when unbound.
    pub fn duration(&self) -> f64 {
        lock(&self.inner).duration()
    }

    /// `current_time / duration`, or 0 when the duration is 0 or unbounded.
    pub fn progress(&self) -> f64 {
        let inner = lock(&self.inner);
        let duration = inner.duration();
        if duration.is_finite() && duration > 0.0 {
            (inner.current_time / duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    // --- Parameters ---

    pub fn gain(&self) -> f32 {
        lock(&self.inner).gain
    }

    pub fn set_gain(&self, gain: f32) {
        lock(&self.inner).gain = unit(gain);
    }

    pub fn pitch(&self) -> f32 {
        lock(&self.inner).pitch
    }

    pub fn set_pitch(&self, pitch: f32) {
        lock(&self.inner).pitch = if pitch.is_finite() { pitch.max(MIN_PITCH) } else { 1.0 };
    }

    pub fn pan(&self) -> f32 {
        lock(&self.inner).pan
    }

    pub fn set_pan(&self, pan: f32) {
        lock(&self.inner).pan = if pan.is_nan() { 0.0 } else { pan.clamp(-1.0, 1.0) };
    }

    pub fn looping(&self) -> bool {
        lock(&self.inner).looping
    }

    pub fn set_looping(&self, looping: bool) {
        lock(&self.inner).looping = looping;
    }

    pub fn priority(&self) -> i32 {
        lock(&self.inner).priority
    }

    pub fn set_priority(&self, priority: i32) {
        lock(&self.inner).priority = priority;
    }

    pub fn position(&self) -> Vec3 {
        lock(&self.inner).position
    }

    pub fn set_position(&self, position: Vec3) {
        if position.is_finite() {
            lock(&self.inner).position = position;
        }
    }

    pub fn velocity(&self) -> Vec3 {
        lock(&self.inner).velocity
    }

    pub fn set_velocity(&self, velocity: Vec3) {
        if velocity.is_finite() {
            lock(&self.inner).velocity = velocity;
        }
    }

    /// Facing direction for the cone; zero means omnidirectional.
    pub fn direction(&self) -> Vec3 {
        lock(&self.inner).direction
    }

    pub fn set_direction(&self, direction: Vec3) {
        if direction.is_finite() {
            lock(&self.inner).direction = direction;
        }
    }

    pub fn distance_model(&self) -> DistanceModel {
        lock(&self.inner).distance
    }

    /// Set all attenuation parameters, clamping each to its valid range.
    pub fn set_distance_model(&self, model: DistanceModel) {
        let min_gain = unit(model.min_gain);
        let clamped = DistanceModel {
            reference_distance: positive(model.reference_distance, 1.0),
            rolloff: if model.rolloff.is_nan() { 1.0 } else { model.rolloff.max(0.0) },
            max_distance: positive(model.max_distance, f32::MAX),
            min_gain,
            max_gain: unit(model.max_gain).max(min_gain),
        };
        lock(&self.inner).distance = clamped;
    }

    pub fn set_reference_distance(&self, d: f32) {
        let mut m = self.distance_model();
        m.reference_distance = d;
        self.set_distance_model(m);
    }

    pub fn set_rolloff(&self, rolloff: f32) {
        let mut m = self.distance_model();
        m.rolloff = rolloff;
        self.set_distance_model(m);
    }

    pub fn set_max_distance(&self, d: f32) {
        let mut m = self.distance_model();
        m.max_distance = d;
        self.set_distance_model(m);
    }

    pub fn set_gain_range(&self, min_gain: f32, max_gain: f32) {
        let mut m = self.distance_model();
        m.min_gain = min_gain;
        m.max_gain = max_gain;
        self.set_distance_model(m);
    }

    pub fn cone(&self) -> Cone {
        lock(&self.inner).cone
    }

    pub fn set_cone(&self, inner_angle: f32, outer_angle: f32, outer_gain: f32) {
        let angle = |a: f32| if a.is_nan() { 360.0 } else { a.clamp(0.0, 360.0) };
        lock(&self.inner).cone = Cone {
            inner_angle: angle(inner_angle),
            outer_angle: angle(outer_angle),
            outer_gain: unit(outer_gain),
        };
    }

    // --- Effects ---

    /// Attach or detach the per-source effect chain. The chain is prepared
    /// for the engine's output spec here, off the render path.
    pub fn set_effect_chain(&self, chain: Option<EffectChain>) {
        let chain = chain.map(|mut c| {
            c.prepare(&self.output_spec);
            c
        });
        lock(&self.inner).effects = chain;
    }

    pub fn has_effect_chain(&self) -> bool {
        lock(&self.inner).effects.is_some()
    }

    /// Edit the attached chain in place. Returns `None` if there is none.
    pub fn with_effect_chain<R>(&self, f: impl FnOnce(&mut EffectChain) -> R) -> Option<R> {
        let mut inner = lock(&self.inner);
        let chain = inner.effects.as_mut()?;
        let result = f(chain);
        chain.prepare(&self.output_spec);
        Some(result)
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source").field("key", &self.key).finish_non_exhaustive()
    }
}

fn unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn positive(v: f32, fallback: f32) -> f32 {
    if v > 0.0 {
        v
    } else if v.is_nan() {
        fallback
    } else {
        f32::MIN_POSITIVE
    }
}

/// Which source channel feeds output channel `ch`. Mono and stereo outputs
/// fall back to channel 0; wider outputs pad missing channels with silence.
#[inline]
fn source_channel(ch: usize, src_channels: usize, out_channels: usize) -> Option<usize> {
    if ch < src_channels {
        Some(ch)
    } else if out_channels <= 2 {
        Some(0)
    } else {
        None
    }
}

impl SourceInner {
    pub(crate) fn state(&self) -> PlaybackState {
        self.state
    }

    fn duration(&self) -> f64 {
        match &self.binding {
            Binding::None => 0.0,
            Binding::Buffer(b) => b.duration(),
            Binding::Stream(sb) => {
                let total = sb.stream.total_frames();
                let rate = sb.stream.spec().sample_rate;
                if total == usize::MAX || rate == 0 {
                    f64::INFINITY
                } else {
                    total as f64 / rate as f64
                }
            }
        }
    }

    fn at_end(&self, duration: f64) -> bool {
        let stream_done = matches!(&self.binding, Binding::Stream(sb) if sb.eof);
        stream_done || (duration.is_finite() && duration > 0.0 && self.current_time >= duration)
    }

    fn rewind(&mut self) {
        self.current_time = 0.0;
        self.rate = None;
        self.cursor = None;
        if let Binding::Stream(sb) = &mut self.binding {
            let _ = sb.stream.seek(0);
            sb.frac = 0.0;
            sb.eof = false;
        }
    }

    pub(crate) fn update(&mut self, dt: f64) {
        if self.state != PlaybackState::Playing || !(dt > 0.0) {
            return;
        }
        let rate = self.rate.take().unwrap_or(self.pitch as f64);
        self.current_time += dt * rate;
        let duration = self.duration();
        let stream_eof = matches!(&self.binding, Binding::Stream(sb) if sb.eof);

        if stream_eof && !self.looping {
            if duration.is_finite() {
                self.current_time = self.current_time.min(duration);
            }
            self.state = PlaybackState::Stopped;
            return;
        }
        if duration.is_finite() && duration > 0.0 && self.current_time >= duration {
            if self.looping {
                self.current_time %= duration;
            } else {
                self.current_time = duration;
                self.state = PlaybackState::Stopped;
            }
        }
    }

    /// Render this source's contribution for `frames` output frames and add
    /// it into `out`. `scratch` holds at least `frames * channels` samples.
    pub(crate) fn mix_into(&mut self, ctx: &MixContext<'_>, scratch: &mut [f32], out: &mut [f32], frames: usize) {
        let out_ch = ctx.spec.channels();
        let n = frames * out_ch;

        let to_listener = ctx.listener_position - self.position;
        let attenuation = self.distance.gain(to_listener.length());
        let cone = self.cone.gain(self.direction, to_listener);
        let total = self.gain * attenuation * cone * ctx.master_volume * ctx.listener_gain;
        let audible = total >= SILENT_GAIN;

        let doppler = match ctx.doppler {
            Some((speed, factor)) => crate::spatial::doppler_factor(
                self.position,
                self.velocity,
                ctx.listener_position,
                ctx.listener_velocity,
                speed,
                factor,
            ),
            None => 1.0,
        };
        let pitch = self.pitch as f64 * doppler as f64;

        let scratch = &mut scratch[..n];
        scratch.fill(0.0);
        let rendered = match &mut self.binding {
            Binding::None => false,
            Binding::Buffer(_) if !audible => {
                self.rate = Some(pitch);
                self.cursor = None;
                false
            }
            Binding::Buffer(buf) => {
                self.rate = Some(pitch);
                let read = BufferRead {
                    current_time: self.current_time,
                    pitch,
                    looping: self.looping,
                };
                render_buffer(buf, read, &mut self.cursor, ctx.spec, scratch, frames)
            }
            // Streams are consumed even when inaudible so the clock and the
            // stream position stay together.
            Binding::Stream(sb) => {
                let src_rate = sb.stream.spec().sample_rate;
                let step = stream_step(pitch, src_rate, ctx.spec.sample_rate);
                if src_rate > 0 {
                    self.rate = Some(step * ctx.spec.sample_rate as f64 / src_rate as f64);
                }
                render_stream(sb, step, self.looping, ctx.spec, scratch, frames)
            }
        };
        if !rendered || !audible {
            return;
        }

        if let Some(chain) = self.effects.as_mut() {
            chain.process_interleaved(ctx.spec, scratch);
        }

        let (g0, g1) = if out_ch == 2 {
            crate::spatial::pan_gains(self.pan)
        } else {
            (1.0, 1.0)
        };
        let mut gains = [total; MAX_CHANNELS];
        gains[0] *= g0;
        if out_ch > 1 {
            gains[1] *= g1;
        }
        for (dst, src) in out[..n].chunks_exact_mut(out_ch).zip(scratch.chunks_exact(out_ch)) {
            for ch in 0..out_ch {
                dst[ch] += src[ch] * gains[ch];
            }
        }
    }
}

#[derive(Clone, Copy)]
struct BufferRead {
    current_time: f64,
    pitch: f64,
    looping: bool,
}

/// Linear-interpolated read of a float32 buffer. The read starts at the
/// fractional frame carried in `cursor` when it still agrees with
/// `current_time`, otherwise at `round(current_time * buffer_rate)`.
/// `cursor` is left at the frame the next batch continues from.
fn render_buffer(
    buf: &AudioBuffer,
    read: BufferRead,
    cursor: &mut Option<f64>,
    out_spec: &AudioSpec,
    scratch: &mut [f32],
    frames: usize,
) -> bool {
    let BufferRead { current_time, pitch, looping } = read;
    let Some(data) = buf.as_f32() else {
        return false;
    };
    let total = buf.frames();
    if total == 0 || out_spec.sample_rate == 0 {
        return false;
    }
    let src_ch = buf.channels();
    let out_ch = out_spec.channels();
    let buf_rate = buf.sample_rate() as f64;
    let step = pitch * buf_rate / out_spec.sample_rate as f64;
    let expected = current_time * buf_rate;
    let start = match *cursor {
        Some(pos) if (pos - expected).abs() < 0.5 => pos,
        _ => expected.round(),
    };
    let len = total as f64;
    let end = start + frames as f64 * step;
    *cursor = Some(if looping { end % len } else { end });

    for i in 0..frames {
        let mut pos = start + i as f64 * step;
        if pos >= len {
            if !looping {
                break;
            }
            pos %= len;
        }
        let idx = pos as usize;
        let frac = (pos - idx as f64) as f32;
        let next = if idx + 1 < total {
            idx + 1
        } else if looping {
            0
        } else {
            idx
        };
        let dst = &mut scratch[i * out_ch..(i + 1) * out_ch];
        for (ch, d) in dst.iter_mut().enumerate() {
            if let Some(sch) = source_channel(ch, src_ch, out_ch) {
                let a = data[idx * src_ch + sch];
                let b = data[next * src_ch + sch];
                *d = a + (b - a) * frac;
            }
        }
    }
    true
}

/// Stream frames consumed per output frame, capped at `MAX_STREAM_STEP`.
fn stream_step(pitch: f64, src_rate: u32, out_rate: u32) -> f64 {
    if out_rate == 0 {
        return 0.0;
    }
    (pitch * src_rate as f64 / out_rate as f64).min(MAX_STREAM_STEP)
}

/// Sequential read from a stream with sample-and-hold rate conversion,
/// advancing `step` stream frames per output frame.
fn render_stream(
    sb: &mut StreamBinding,
    step: f64,
    looping: bool,
    out_spec: &AudioSpec,
    scratch: &mut [f32],
    frames: usize,
) -> bool {
    if sb.eof && !looping {
        return false;
    }
    let spec = sb.stream.spec();
    let bpf = spec.bytes_per_frame();
    let bps = spec.bytes_per_sample();
    let src_ch = spec.channels();
    let out_ch = out_spec.channels();
    if bpf == 0 || out_spec.sample_rate == 0 {
        return false;
    }
    let capacity = sb.bytes.len() / bpf;

    let end = sb.frac + frames as f64 * step;
    let wanted = (end as usize).clamp(1, capacity);
    let mut got = 0;
    let mut rewound = false;
    while got < wanted {
        let n = sb.stream.read(&mut sb.bytes[got * bpf..], wanted - got);
        if n == 0 {
            if looping && !rewound && sb.stream.total_frames() > 0 && sb.stream.seek(0) {
                rewound = true;
                continue;
            }
            sb.eof = true;
            break;
        }
        rewound = false;
        got += n;
    }
    if got == 0 {
        return false;
    }

    for i in 0..frames {
        let idx = (sb.frac + i as f64 * step) as usize;
        let idx = if idx < got {
            idx
        } else if sb.eof {
            break;
        } else {
            got - 1
        };
        let frame = &sb.bytes[idx * bpf..(idx + 1) * bpf];
        let dst = &mut scratch[i * out_ch..(i + 1) * out_ch];
        for (ch, d) in dst.iter_mut().enumerate() {
            if let Some(sch) = source_channel(ch, src_ch, out_ch) {
                *d = decode_sample(spec.format, &frame[sch * bps..]) as f32;
            }
        }
    }
    sb.frac = (end - wanted as f64).max(0.0);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use vs_core::{ChannelLayout, FileStream};

    fn source() -> Source {
        Source::new(SourceKey::default(), AudioSpec::float(1000, ChannelLayout::Stereo), 100)
    }

    fn one_second_buffer() -> Arc<AudioBuffer> {
        Arc::new(AudioBuffer::new(AudioSpec::float(1000, ChannelLayout::Mono), 1000))
    }

    #[test]
    fn setters_clamp() {
        let s = source();
        s.set_gain(2.0);
        assert_eq!(s.gain(), 1.0);
        s.set_pitch(0.0);
        assert_eq!(s.pitch(), MIN_PITCH);
        s.set_pan(-3.0);
        assert_eq!(s.pan(), -1.0);
        s.set_reference_distance(-1.0);
        assert!(s.distance_model().reference_distance > 0.0);
        s.set_gain_range(0.8, 0.2);
        let m = s.distance_model();
        assert_eq!((m.min_gain, m.max_gain), (0.8, 0.8));
        s.set_cone(-10.0, 720.0, 5.0);
        assert_eq!(s.cone(), Cone { inner_angle: 0.0, outer_angle: 360.0, outer_gain: 1.0 });
    }

    #[test]
    fn update_advances_by_pitch() {
        let s = source();
        s.set_buffer(one_second_buffer());
        s.set_pitch(2.0);
        s.play();
        s.update(0.1);
        assert!((s.current_time() - 0.2).abs() < 1e-12);
        s.pause();
        s.update(0.1);
        assert!((s.current_time() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn one_shot_stops_at_duration() {
        let s = source();
        s.set_buffer(one_second_buffer());
        s.play();
        s.update(1.5);
        assert_eq!(s.state(), PlaybackState::Stopped);
        assert_eq!(s.current_time(), 1.0);
        assert_eq!(s.progress(), 1.0);
        s.play();
        assert_eq!(s.current_time(), 0.0);
    }

    #[test]
    fn looping_wraps() {
        let s = source();
        s.set_buffer(one_second_buffer());
        s.set_looping(true);
        s.play();
        s.update(2.25);
        assert!(s.is_playing());
        assert!((s.current_time() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn stop_resets_cursor() {
        let s = source();
        s.set_buffer(one_second_buffer());
        s.play();
        s.update(0.5);
        s.stop();
        assert_eq!(s.current_time(), 0.0);
        assert_eq!(s.state(), PlaybackState::Stopped);
    }

    #[test]
    fn rebinding_while_playing_restarts() {
        let s = source();
        s.set_buffer(one_second_buffer());
        s.play();
        s.update(0.5);
        s.set_buffer(one_second_buffer());
        assert_eq!(s.current_time(), 0.0);
        assert!(s.is_playing());
    }

    #[test]
    fn stream_binding_replaces_buffer() {
        let s = source();
        s.set_buffer(one_second_buffer());
        let stream = FileStream::from_buffer(&AudioBuffer::new(AudioSpec::float(1000, ChannelLayout::Mono), 10));
        s.set_stream(Box::new(stream));
        assert!(s.has_stream());
        assert!(s.buffer().is_none());
        assert!((s.duration() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn capped_stream_step_drives_the_clock() {
        let spec = AudioSpec::float(1000, ChannelLayout::Mono);
        let s = Source::new(SourceKey::default(), spec, 100);
        let media = AudioBuffer::new(spec, 10_000);
        s.set_stream(Box::new(FileStream::from_buffer(&media)));
        s.set_pitch(16.0);
        s.play();

        let ctx = MixContext {
            spec: &spec,
            listener_position: Vec3::ZERO,
            listener_velocity: Vec3::ZERO,
            listener_gain: 1.0,
            master_volume: 1.0,
            doppler: None,
        };
        let mut scratch = vec![0.0f32; 100];
        let mut out = vec![0.0f32; 100];
        let mut inner = lock(s.inner());
        for batch in 1..=3 {
            inner.mix_into(&ctx, &mut scratch, &mut out, 100);
            inner.update(0.1);
            let consumed = match &inner.binding {
                Binding::Stream(sb) => sb.stream.tell(),
                _ => unreachable!(),
            };
            assert_eq!(consumed, batch * 800);
            assert!((inner.current_time - batch as f64 * 0.8).abs() < 1e-9);
        }
    }

    #[test]
    fn update_without_render_uses_pitch() {
        let s = source();
        s.set_buffer(one_second_buffer());
        s.set_pitch(0.5);
        s.play();
        s.update(0.2);
        s.update(0.2);
        assert!((s.current_time() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn channel_fallback() {
        assert_eq!(source_channel(1, 1, 2), Some(0));
        assert_eq!(source_channel(1, 2, 2), Some(1));
        assert_eq!(source_channel(4, 2, 6), None);
    }
}
