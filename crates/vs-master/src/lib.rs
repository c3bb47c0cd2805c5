//! Headless controller for vstudio.
//!
//! Owns an [`Engine`] and provides the playback and rendering API shared by
//! the CLI and tests: device playback through `vs-audio`, offline rendering
//! into buffers and WAV export.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{info, warn};
use thiserror::Error;
use vs_audio::{AudioError, AudioOutput, CpalOutput};
use vs_core::{AudioBuffer, SampleFormat};

// Re-export common types so callers don't need vs-engine directly.
pub use vs_engine::{ConfigError, Engine, EngineConfig, Listener, Source};
pub use vs_formats::FormatError;

#[derive(Debug, Error)]
pub enum MasterError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("engine failed to initialise")]
    EngineInit,
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("failed to start output thread: {0}")]
    Thread(#[from] std::io::Error),
    #[error("output thread exited before starting")]
    OutputThread,
}

/// Headless controller: owns an engine and manages device playback.
pub struct Controller {
    engine: Arc<Engine>,
    config: EngineConfig,
    playback: Option<PlaybackHandle>,
}

struct PlaybackHandle {
    stop_signal: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Controller {
    /// Create and initialise an engine from `config`.
    pub fn new(config: EngineConfig) -> Result<Self, MasterError> {
        config.validate()?;
        let engine = Arc::new(Engine::new());
        if !engine.initialize_with(&config) {
            return Err(MasterError::EngineInit);
        }
        Ok(Self {
            engine,
            config,
            playback: None,
        })
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Scene helpers ---

    /// The primary listener, creating one named "main" if there is none.
    pub fn ensure_listener(&self) -> Option<Arc<Listener>> {
        self.engine
            .primary_listener()
            .or_else(|| self.engine.create_listener("main"))
    }

    /// Convert `buffer` to the engine's format and rate, bind it to a new
    /// source and start it.
    pub fn play_buffer(&self, mut buffer: AudioBuffer, looping: bool) -> Option<Arc<Source>> {
        self.ensure_listener()?;
        buffer.convert_format(SampleFormat::F32);
        buffer.resample(self.config.sample_rate);
        let source = self.engine.create_source()?;
        source.set_buffer(Arc::new(buffer));
        source.set_looping(looping);
        source.play();
        Some(source)
    }

    // --- Real-time playback ---

    /// Open the default device and route engine batches to it.
    pub fn start_playback(&mut self) -> Result<(), MasterError> {
        self.stop_playback();

        let (ready_tx, ready_rx) = mpsc::channel();
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&stop_signal);
        let engine = Arc::clone(&self.engine);
        let config = self.config.clone();

        let thread = std::thread::Builder::new()
            .name("vs-output".into())
            .spawn(move || output_thread(engine, config, stop, ready_tx))?;

        let mut handle = PlaybackHandle {
            stop_signal,
            thread: Some(thread),
        };
        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.playback = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                handle.join();
                Err(e.into())
            }
            Err(_) => {
                handle.join();
                Err(MasterError::OutputThread)
            }
        }
    }

    pub fn stop_playback(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            pb.stop_signal.store(true, Ordering::Relaxed);
            pb.join();
            info!("playback stopped");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    // --- Offline rendering ---

    /// Render `seconds` of engine output on the calling thread. A running
    /// render worker is suspended for the duration.
    pub fn render_offline(&self, seconds: f64) -> AudioBuffer {
        let spec = self
            .engine
            .output_spec()
            .unwrap_or(vs_core::AudioSpec::float(self.config.sample_rate, self.config.layout));
        let frames = spec.seconds_to_frames(seconds);
        let mut out = AudioBuffer::new(spec, frames);

        let was_running = self.config.worker && self.engine.is_running();
        if was_running {
            self.engine.suspend();
        }
        if let Some(samples) = out.as_f32_mut() {
            self.engine.process_audio_f32(samples, frames);
        }
        if was_running {
            self.engine.resume();
        }
        out
    }

    pub fn render_to_wav(&self, seconds: f64) -> Result<Vec<u8>, MasterError> {
        Ok(vs_formats::buffer_to_wav(&self.render_offline(seconds))?)
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop_playback();
        self.engine.shutdown();
    }
}

impl PlaybackHandle {
    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("output thread panicked");
            }
        }
    }
}

fn output_thread(
    engine: Arc<Engine>,
    config: EngineConfig,
    stop_signal: Arc<AtomicBool>,
    ready: mpsc::Sender<Result<(), AudioError>>,
) {
    let channels = config.layout.channel_count() as u16;
    let (mut output, consumer) = match CpalOutput::new(config.sample_rate, channels) {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if let Err(e) = output.build_stream(consumer) {
        let _ = ready.send(Err(e));
        return;
    }
    let Some(mut writer) = output.take_writer() else {
        let _ = ready.send(Err(AudioError::Playback("writer already taken".into())));
        return;
    };
    engine.set_callback(move |bytes| writer.write_bytes(bytes));
    let _ = ready.send(Ok(()));

    let period = Duration::from_secs_f64(config.buffer_frames as f64 / config.sample_rate as f64);
    while !stop_signal.load(Ordering::Relaxed) {
        if config.worker {
            std::thread::sleep(period);
        } else {
            // No render worker: drive the engine here, paced by the device.
            engine.render(config.buffer_frames);
        }
    }

    // Stop the device first so a callback blocked on a full ring returns.
    let _ = output.stop();
    engine.clear_callback();
}

#[cfg(test)]
mod tests {
    use super::*;
    use vs_core::ChannelLayout;

    fn controller() -> Controller {
        Controller::new(EngineConfig::new(8000, 128, ChannelLayout::Stereo).manual()).unwrap()
    }

    #[test]
    fn offline_render_of_empty_scene_is_silent() {
        let c = controller();
        let out = c.render_offline(0.5);
        assert_eq!(out.frames(), 4000);
        assert!(out.as_f32().unwrap().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn played_buffer_is_converted_and_heard() {
        let c = controller();
        let spec = vs_core::AudioSpec::new(4000, SampleFormat::I16, ChannelLayout::Mono);
        let mut buf = AudioBuffer::new(spec, 4000);
        for f in 0..buf.frames() {
            buf.set_sample(f, 0, 0.5);
        }
        let source = c.play_buffer(buf, false).unwrap();
        let stored = source.buffer().unwrap();
        assert_eq!(stored.spec().format, SampleFormat::F32);
        assert_eq!(stored.sample_rate(), 8000);

        let out = c.render_offline(0.1);
        assert!((out.sample(100, 0) - 0.5).abs() < 1e-3);
        assert!((out.sample(100, 1) - 0.5).abs() < 1e-3);
    }

    #[test]
    fn wav_export_has_riff_header() {
        let c = controller();
        let wav = c.render_to_wav(0.01).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = Controller::new(EngineConfig::new(0, 128, ChannelLayout::Stereo)).err();
        assert!(matches!(err, Some(MasterError::Config(_))));
    }
}
