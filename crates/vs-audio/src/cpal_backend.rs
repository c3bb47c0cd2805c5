//! CPAL-based audio output backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use log::{error, info};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::traits::{AudioError, AudioOutput};

const DECODE_BLOCK: usize = 256;

/// Producer half of the device ring buffer.
///
/// Writes spin while the ring is full, so whoever feeds it is paced by the
/// device. Once the output is stopped, writes are dropped instead.
pub struct SampleWriter {
    producer: HeapProd<f32>,
    running: Arc<AtomicBool>,
}

impl SampleWriter {
    /// Queue samples, spinning until the ring has room.
    pub fn write_spin(&mut self, samples: &[f32]) {
        let mut rest = samples;
        while !rest.is_empty() {
            if !self.running.load(Ordering::Relaxed) {
                return;
            }
            let pushed = self.producer.push_slice(rest);
            rest = &rest[pushed..];
            if pushed == 0 {
                std::hint::spin_loop();
            }
        }
    }

    /// Queue native-endian float32 bytes, as delivered by the engine
    /// callback. A trailing partial sample is ignored.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let whole = &bytes[..bytes.len() / 4 * 4];
        if let Ok(samples) = bytemuck::try_cast_slice::<u8, f32>(whole) {
            self.write_spin(samples);
            return;
        }
        // Unaligned input: decode through a stack block.
        let mut block = [0.0f32; DECODE_BLOCK];
        for chunk in whole.chunks(DECODE_BLOCK * 4) {
            let n = chunk.len() / 4;
            for (dst, src) in block.iter_mut().zip(chunk.chunks_exact(4)) {
                *dst = f32::from_ne_bytes([src[0], src[1], src[2], src[3]]);
            }
            self.write_spin(&block[..n]);
        }
    }
}

/// CPAL output on the default device.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    writer: Option<SampleWriter>,
    running: Arc<AtomicBool>,
}

impl CpalOutput {
    /// Open the default device at `sample_rate` with `channels` channels.
    /// Returns the output and the consumer half for [`CpalOutput::build_stream`].
    pub fn new(sample_rate: u32, channels: u16) -> Result<(Self, HeapCons<f32>), AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let default = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;
        let mut config: StreamConfig = default.into();
        config.channels = channels;
        config.sample_rate = SampleRate(sample_rate);

        // About 100 ms of audio.
        let capacity = (sample_rate as usize / 10).max(1) * channels as usize;
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();
        let running = Arc::new(AtomicBool::new(false));

        let output = Self {
            device,
            config,
            stream: None,
            writer: Some(SampleWriter {
                producer,
                running: Arc::clone(&running),
            }),
            running,
        };
        Ok((output, consumer))
    }

    /// Build and start the device stream draining `consumer`.
    pub fn build_stream(&mut self, mut consumer: HeapCons<f32>) -> Result<(), AudioError> {
        let running = Arc::clone(&self.running);
        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !running.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }
                    let n = consumer.pop_slice(data);
                    data[n..].fill(0.0);
                },
                |err| error!("audio stream error: {err}"),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        self.running.store(true, Ordering::Relaxed);
        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);
        info!(
            "audio output started: {} Hz, {} channels",
            self.config.sample_rate.0, self.config.channels
        );
        Ok(())
    }

    /// Hand the producer half to another thread, e.g. the engine callback.
    /// After this, [`AudioOutput::write`] drops samples.
    pub fn take_writer(&mut self) -> Option<SampleWriter> {
        self.writer.take()
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn channels(&self) -> u16 {
        self.config.channels
    }

    fn write(&mut self, samples: &[f32]) {
        if let Some(writer) = self.writer.as_mut() {
            writer.write_spin(samples);
        }
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        if let Some(stream) = &self.stream {
            stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(stream) = &self.stream {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }
}
