//! Batch renderer: sums every playing source for the primary listener.

use std::sync::Arc;

use slotmap::SlotMap;
use vs_core::{AudioBuffer, AudioSpec};

use crate::config::{DopplerConfig, EngineConfig};
use crate::listener::{Listener, ListenerKey};
use crate::lock;
use crate::source::{MixContext, PlaybackState, Source, SourceKey};

/// Entity tables and render scratch for one initialised engine.
///
/// Everything the render path touches is allocated here up front; a batch
/// only locks, reads and writes.
pub(crate) struct Mixer {
    spec: AudioSpec,
    buffer_frames: usize,
    master_volume: f32,
    doppler: DopplerConfig,
    sources: SlotMap<SourceKey, Arc<Source>>,
    source_order: Vec<SourceKey>,
    listeners: SlotMap<ListenerKey, Arc<Listener>>,
    listener_order: Vec<ListenerKey>,
    mix: AudioBuffer,
    scratch: Vec<f32>,
}

impl Mixer {
    pub(crate) fn new(config: &EngineConfig) -> Self {
        let spec = AudioSpec::float(config.sample_rate, config.layout);
        Self {
            spec,
            buffer_frames: config.buffer_frames,
            master_volume: config.master_volume.clamp(0.0, 1.0),
            doppler: config.doppler,
            sources: SlotMap::with_key(),
            source_order: Vec::new(),
            listeners: SlotMap::with_key(),
            listener_order: Vec::new(),
            mix: AudioBuffer::new(spec, config.buffer_frames),
            scratch: vec![0.0; config.buffer_frames * spec.channels()],
        }
    }

    pub(crate) fn spec(&self) -> AudioSpec {
        self.spec
    }

    pub(crate) fn buffer_frames(&self) -> usize {
        self.buffer_frames
    }

    pub(crate) fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub(crate) fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
    }

    // --- Entities ---

    pub(crate) fn create_source(&mut self) -> Arc<Source> {
        let (spec, frames) = (self.spec, self.buffer_frames);
        let key = self
            .sources
            .insert_with_key(|key| Arc::new(Source::new(key, spec, frames)));
        self.source_order.push(key);
        Arc::clone(&self.sources[key])
    }

    pub(crate) fn destroy_source(&mut self, key: SourceKey) -> bool {
        if self.sources.remove(key).is_none() {
            return false;
        }
        self.source_order.retain(|k| *k != key);
        true
    }

    pub(crate) fn sources(&self) -> Vec<Arc<Source>> {
        self.source_order
            .iter()
            .filter_map(|k| self.sources.get(*k))
            .cloned()
            .collect()
    }

    pub(crate) fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub(crate) fn create_listener(&mut self, name: &str) -> Arc<Listener> {
        let key = self
            .listeners
            .insert_with_key(|key| Arc::new(Listener::new(key, name)));
        self.listener_order.push(key);
        Arc::clone(&self.listeners[key])
    }

    pub(crate) fn destroy_listener(&mut self, key: ListenerKey) -> bool {
        if self.listeners.remove(key).is_none() {
            return false;
        }
        self.listener_order.retain(|k| *k != key);
        true
    }

    pub(crate) fn listeners(&self) -> Vec<Arc<Listener>> {
        self.listener_order
            .iter()
            .filter_map(|k| self.listeners.get(*k))
            .cloned()
            .collect()
    }

    pub(crate) fn primary_listener(&self) -> Option<&Arc<Listener>> {
        self.listener_order.first().and_then(|k| self.listeners.get(*k))
    }

    // --- Rendering ---

    /// Render `frames` frames of interleaved float32 bytes into `output`.
    /// The request is limited to the whole frames that fit. Returns the
    /// number of frames written.
    pub(crate) fn process(&mut self, output: &mut [u8], frames: usize) -> usize {
        #[cfg(feature = "alloc_check")]
        {
            assert_no_alloc::assert_no_alloc(|| self.process_bytes(output, frames))
        }
        #[cfg(not(feature = "alloc_check"))]
        {
            self.process_bytes(output, frames)
        }
    }

    fn process_bytes(&mut self, output: &mut [u8], frames: usize) -> usize {
        let bpf = self.spec.bytes_per_frame();
        let frames = frames.min(output.len() / bpf);
        output[..frames * bpf].fill(0);

        let mut done = 0;
        while done < frames {
            let n = (frames - done).min(self.buffer_frames);
            self.render_chunk(n);
            let src = &self.mix.as_bytes()[..n * bpf];
            output[done * bpf..(done + n) * bpf].copy_from_slice(src);
            done += n;
        }
        frames
    }

    /// Float-slice variant of [`Mixer::process`].
    pub(crate) fn process_f32(&mut self, output: &mut [f32], frames: usize) -> usize {
        let ch = self.spec.channels();
        let frames = frames.min(output.len() / ch);
        output[..frames * ch].fill(0.0);

        let mut done = 0;
        while done < frames {
            let n = (frames - done).min(self.buffer_frames);
            self.render_chunk(n);
            if let Some(mix) = self.mix.as_f32() {
                output[done * ch..(done + n) * ch].copy_from_slice(&mix[..n * ch]);
            }
            done += n;
        }
        frames
    }

    /// Mix `frames` (at most one batch) into the start of `self.mix`, then
    /// advance every source that played.
    fn render_chunk(&mut self, frames: usize) {
        let ch = self.spec.channels();
        let Self {
            spec,
            master_volume,
            doppler,
            sources,
            source_order,
            listeners,
            listener_order,
            mix,
            scratch,
            ..
        } = self;
        let spec: &AudioSpec = spec;
        let Some(out) = mix.as_f32_mut() else {
            return;
        };
        let out = &mut out[..frames * ch];
        out.fill(0.0);

        let Some(listener) = listener_order.first().and_then(|k| listeners.get(*k)) else {
            return;
        };
        let pose = listener.pose();
        let ctx = MixContext {
            spec,
            listener_position: pose.position,
            listener_velocity: pose.velocity,
            listener_gain: pose.gain,
            master_volume: *master_volume,
            doppler: doppler
                .enabled
                .then_some((doppler.speed_of_sound, doppler.factor)),
        };
        let dt = frames as f64 / spec.sample_rate as f64;

        for key in source_order.iter() {
            let Some(source) = sources.get(*key) else {
                continue;
            };
            let mut inner = lock(source.inner());
            if inner.state() != PlaybackState::Playing {
                continue;
            }
            inner.mix_into(&ctx, scratch, out, frames);
            inner.update(dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vs_core::{ChannelLayout, Vec3};

    fn mixer() -> Mixer {
        Mixer::new(&EngineConfig::new(1000, 64, ChannelLayout::Stereo).manual())
    }

    fn constant(value: f32, frames: usize) -> Arc<AudioBuffer> {
        Arc::new(AudioBuffer::from_interleaved_f32(
            1000,
            ChannelLayout::Mono,
            vec![value; frames],
        ))
    }

    #[test]
    fn silence_without_listener() {
        let mut m = mixer();
        let s = m.create_source();
        s.set_buffer(constant(0.5, 1000));
        s.play();
        let mut out = vec![1.0f32; 200];
        assert_eq!(m.process_f32(&mut out, 100), 100);
        assert!(out.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn mono_buffer_reaches_both_channels() {
        let mut m = mixer();
        m.create_listener("main");
        let s = m.create_source();
        s.set_buffer(constant(0.5, 1000));
        s.play();
        let mut out = vec![0.0f32; 200];
        m.process_f32(&mut out, 100);
        assert!(out.iter().all(|&x| (x - 0.5).abs() < 1e-6));
        assert!((s.current_time() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn distance_attenuates() {
        let mut m = mixer();
        m.create_listener("main");
        let s = m.create_source();
        s.set_buffer(constant(1.0, 1000));
        s.set_position(Vec3::new(10.0, 0.0, 0.0));
        s.play();
        let mut out = vec![0.0f32; 20];
        m.process_f32(&mut out, 10);
        assert!(out.iter().all(|&x| (x - 0.1).abs() < 1e-5));
    }

    #[test]
    fn one_shot_ends_in_silence() {
        let mut m = mixer();
        m.create_listener("main");
        let s = m.create_source();
        s.set_buffer(constant(1.0, 50));
        s.play();
        let mut out = vec![0.0f32; 200];
        m.process_f32(&mut out, 100);
        assert_eq!(out[49 * 2], 1.0);
        assert_eq!(out[50 * 2], 0.0);
        assert_eq!(s.state(), PlaybackState::Stopped);
    }

    #[test]
    fn destroyed_entities_leave_the_mix() {
        let mut m = mixer();
        let l = m.create_listener("main");
        let s = m.create_source();
        s.set_buffer(constant(1.0, 1000));
        s.play();
        assert!(m.destroy_source(s.key()));
        assert!(!m.destroy_source(s.key()));
        assert_eq!(m.source_count(), 0);
        assert!(m.destroy_listener(l.key()));
        assert!(m.primary_listener().is_none());
    }

    #[test]
    fn byte_output_is_limited_to_whole_frames() {
        let mut m = mixer();
        let mut out = vec![0xffu8; 8 * 3 + 5];
        assert_eq!(m.process(&mut out, 10), 3);
        assert!(out[..24].iter().all(|&b| b == 0));
        assert_eq!(out[24], 0xff);
    }
}
