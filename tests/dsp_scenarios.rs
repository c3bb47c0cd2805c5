//! DSP behaviour checked against literal expected values.

use std::f64::consts::TAU;

use vs_core::{AudioBuffer, AudioSpec, AudioStream, ChannelLayout, GeneratorStream, Waveform};
use vs_dsp::{
    Chorus, Compressor, Delay, Distortion, DistortionKind, Effect, EffectChain, EqBand, Equalizer, Filter, FilterType,
    Reverb,
};

fn sine(rate: u32, freq: f64, amplitude: f64, frames: usize) -> AudioBuffer {
    let samples = (0..frames)
        .map(|i| (amplitude * (TAU * freq * i as f64 / rate as f64).sin()) as f32)
        .collect();
    AudioBuffer::from_interleaved_f32(rate, ChannelLayout::Mono, samples)
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

#[test]
fn compressor_steady_state_gain() {
    let amplitude = 10f64.powf(6.0 / 20.0);
    let mut buf = sine(44100, 441.0, amplitude, 44100 + 100);
    let mut fx = Effect::from(Compressor::new(-20.0, 4.0, 0.0, 1.0));
    fx.process(&mut buf);

    let expected = amplitude as f32 * 10f32.powf(-(6.0 + 20.0) * (1.0 - 1.0 / 4.0) / 20.0);
    let samples = buf.as_f32().unwrap();
    let last_period = peak(&samples[44100..]);
    assert!(
        (last_period - expected).abs() / expected < 0.01,
        "got {last_period}, expected {expected}"
    );
}

#[test]
fn delay_impulse_train() {
    let mut samples = vec![0.0f32; 44100];
    samples[0] = 1.0;
    let mut buf = AudioBuffer::from_interleaved_f32(44100, ChannelLayout::Mono, samples);
    let mut fx = Effect::from(Delay::new(0.1, 0.5, 1.0));
    fx.process(&mut buf);

    let out = buf.as_f32().unwrap();
    let mut expected = 1.0f32;
    for k in 0..10 {
        let at = k * 4410;
        assert!((out[at] - expected).abs() < 1e-6, "echo {k}");
        if k < 9 {
            assert!(out[at + 1..at + 4410].iter().all(|&s| s == 0.0), "gap after echo {k}");
        }
        expected *= 0.5;
    }
}

fn effects() -> Vec<Effect> {
    vec![
        Equalizer::new().with_band(EqBand::new(1000.0, 6.0, 1.0)).into(),
        Compressor::default().into(),
        Reverb::default().into(),
        Delay::default().into(),
        Chorus::default().into(),
        Distortion::new(DistortionKind::SoftClip, 3.0, 0.8).into(),
        Filter::new(FilterType::HighPass, 500.0, 0.707).into(),
    ]
}

#[test]
fn disabled_or_bypassed_effects_are_identity() {
    let original = sine(44100, 220.0, 0.8, 2048);
    for mut fx in effects() {
        let mut buf = original.clone();
        fx.set_bypass(true);
        fx.process(&mut buf);
        assert_eq!(buf, original, "{} bypassed", fx.name());

        fx.set_bypass(false);
        fx.set_enabled(false);
        fx.process(&mut buf);
        assert_eq!(buf, original, "{} disabled", fx.name());
    }
}

#[test]
fn chain_equals_sequential_processing() {
    let input = sine(44100, 330.0, 0.9, 4096);

    let mut chained = input.clone();
    let mut chain = EffectChain::new()
        .with(Filter::new(FilterType::LowPass, 2000.0, 0.707))
        .with(Delay::new(0.01, 0.4, 0.5));
    chain.process(&mut chained);

    let mut sequential = input;
    Effect::from(Filter::new(FilterType::LowPass, 2000.0, 0.707)).process(&mut sequential);
    Effect::from(Delay::new(0.01, 0.4, 0.5)).process(&mut sequential);

    assert_eq!(chained, sequential);
}

#[test]
fn band_pass_of_silence_is_silence() {
    let mut buf = AudioBuffer::new(AudioSpec::float(48000, ChannelLayout::Stereo), 1024);
    Effect::from(Filter::new(FilterType::BandPass, 1000.0, 2.0)).process(&mut buf);
    assert!(buf.as_f32().unwrap().iter().all(|&s| s == 0.0));
}

#[test]
fn low_pass_keeps_history_between_calls() {
    let input = sine(8000, 3000.0, 1.0, 512);
    let mut whole = input.clone();
    Effect::from(Filter::new(FilterType::LowPass, 200.0, 0.707)).process(&mut whole);

    let mut fx = Effect::from(Filter::new(FilterType::LowPass, 200.0, 0.707));
    let mut first = input.extract_frames(0, 256);
    let mut second = input.extract_frames(256, 256);
    fx.process(&mut first);
    fx.process(&mut second);

    let whole = whole.as_f32().unwrap();
    assert_eq!(first.as_f32().unwrap(), &whole[..256]);
    assert_eq!(second.as_f32().unwrap(), &whole[256..]);
    assert!(peak(&whole[256..]) < 0.05);
}

#[test]
fn generator_sine_is_periodic() {
    let spec = AudioSpec::float(44100, ChannelLayout::Mono);
    let mut stream = GeneratorStream::new(spec, Waveform::Sine, 441.0, 1.0);
    let mut bytes = vec![0u8; 1000 * spec.bytes_per_frame()];
    assert_eq!(stream.read(&mut bytes, 1000), 1000);
    let samples: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    for k in 0..900 {
        assert!((samples[k] - samples[k + 100]).abs() < 1e-5, "frame {k}");
    }
}
