//! Allocation-free render path tests.
//!
//! These tests verify that `Engine::process_audio_f32()` does not allocate
//! once sources are bound and playing. Each renders several seconds so that
//! loop wraps, stream refills and effect state all get exercised.
//!
//! Runs under plain `cargo test`; no feature flags needed.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use std::sync::Arc;

use vs_core::{AudioBuffer, AudioSpec, ChannelLayout, FileStream, GeneratorStream, SampleFormat, Vec3, Waveform};
use vs_dsp::{Chorus, Compressor, Delay, EffectChain, Filter, FilterType, Reverb};
use vs_engine::{Engine, EngineConfig};

const RATE: u32 = 44100;
const BATCH: usize = 512;

fn engine(doppler: bool) -> Engine {
    let mut config = EngineConfig::new(RATE, BATCH, ChannelLayout::Stereo).manual();
    config.doppler.enabled = doppler;
    let engine = Engine::new();
    assert!(engine.initialize_with(&config));
    engine.create_listener("main").unwrap();
    engine
}

fn noise_buffer(frames: usize) -> Arc<AudioBuffer> {
    let samples = (0..frames * 2)
        .map(|i| ((i * 7919) % 2001) as f32 / 1000.0 - 1.0)
        .collect();
    Arc::new(AudioBuffer::from_interleaved_f32(22050, ChannelLayout::Stereo, samples))
}

/// Render `seconds` of audio in batch-sized calls, aborting on any heap
/// allocation.
fn assert_render_alloc_free(engine: &Engine, seconds: usize) {
    let mut out = vec![0.0f32; BATCH * 2];
    let batches = seconds * RATE as usize / BATCH;
    assert_no_alloc(|| {
        for _ in 0..batches {
            engine.process_audio_f32(&mut out, BATCH);
        }
    });
}

#[test]
fn looping_buffers_alloc_free() {
    let engine = engine(false);
    for i in 0..8 {
        let source = engine.create_source().unwrap();
        source.set_buffer(noise_buffer(1000 + i * 37));
        source.set_looping(true);
        source.set_pitch(0.5 + i as f32 * 0.25);
        source.set_pan(i as f32 / 4.0 - 1.0);
        source.set_position(Vec3::new(i as f32, 0.0, -2.0));
        source.play();
    }
    assert_render_alloc_free(&engine, 3);
}

#[test]
fn streams_alloc_free() {
    let engine = engine(false);

    let pcm_spec = AudioSpec::new(22050, SampleFormat::I16, ChannelLayout::Mono);
    let mut pcm = AudioBuffer::new(pcm_spec, 3000);
    for f in 0..3000 {
        pcm.set_sample(f, 0, (f % 100) as f32 / 100.0);
    }
    let looping = engine.create_source().unwrap();
    looping.set_stream(Box::new(FileStream::from_buffer(&pcm)));
    looping.set_looping(true);
    looping.play();

    let one_shot = engine.create_source().unwrap();
    one_shot.set_stream(Box::new(FileStream::from_buffer(&pcm)));
    one_shot.play();

    let tone = engine.create_source().unwrap();
    let gen_spec = AudioSpec::float(48000, ChannelLayout::Stereo);
    tone.set_stream(Box::new(GeneratorStream::new(gen_spec, Waveform::Triangle, 220.0, 0.5)));
    tone.set_pitch(3.0);
    tone.play();

    let noise = engine.create_source().unwrap();
    let noise_spec = AudioSpec::float(RATE, ChannelLayout::Mono);
    noise.set_stream(Box::new(GeneratorStream::new(noise_spec, Waveform::Noise, 0.0, 0.1)));
    noise.play();

    assert_render_alloc_free(&engine, 3);
}

#[test]
fn effect_chains_alloc_free() {
    let engine = engine(false);
    let chains = [
        EffectChain::new()
            .with(Reverb::default())
            .with(Delay::new(0.25, 0.5, 0.4)),
        EffectChain::new()
            .with(Chorus::default())
            .with(Filter::new(FilterType::LowPass, 2000.0, 0.707))
            .with(Compressor::default()),
    ];
    for chain in chains {
        let source = engine.create_source().unwrap();
        source.set_buffer(noise_buffer(4096));
        source.set_looping(true);
        source.set_effect_chain(Some(chain));
        source.play();
    }
    assert_render_alloc_free(&engine, 3);
}

#[test]
fn moving_sources_with_doppler_alloc_free() {
    let engine = engine(true);
    let listener = engine.primary_listener().unwrap();
    listener.set_velocity(Vec3::new(0.0, 0.0, -5.0));
    for i in 0..4 {
        let source = engine.create_source().unwrap();
        source.set_buffer(noise_buffer(2048));
        source.set_looping(true);
        source.set_position(Vec3::new(0.0, 0.0, -10.0 * (i + 1) as f32));
        source.set_velocity(Vec3::new(0.0, 0.0, 20.0 * i as f32));
        source.set_direction(Vec3::new(0.0, 0.0, 1.0));
        source.set_cone(60.0, 180.0, 0.2);
        source.play();
    }
    assert_render_alloc_free(&engine, 3);
}
