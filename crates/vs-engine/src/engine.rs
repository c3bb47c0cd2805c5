//! Engine lifecycle, entity registry and the render worker.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::thread::{JoinHandle, ThreadId};
use std::time::Duration;

use log::{debug, error, info, warn};
use vs_core::{AudioSpec, ChannelLayout};

use crate::config::EngineConfig;
use crate::listener::Listener;
use crate::lock;
use crate::mixer::Mixer;
use crate::source::Source;

/// Receives each rendered batch as interleaved float32 bytes.
pub type RenderCallback = Box<dyn FnMut(&[u8]) + Send>;

struct Shared {
    initialized: AtomicBool,
    running: AtomicBool,
    suspended: AtomicBool,
    batches: AtomicU64,
    mixer: Mutex<Option<Mixer>>,
    staging: Mutex<Vec<u8>>,
    callback: Mutex<Option<RenderCallback>>,
    /// Set by the worker, under `wake_lock`, while it renders a batch.
    busy: AtomicBool,
    worker_thread: Mutex<Option<ThreadId>>,
    wake_lock: Mutex<()>,
    wake: Condvar,
    idle: Condvar,
}

/// Spatial mixing engine.
///
/// An `Engine` starts uninitialised. [`Engine::initialize`] allocates the
/// mix buffers and, unless the config says otherwise, spawns a worker
/// thread that renders one batch per period and hands it to the render
/// callback. All methods take `&self`, so an engine can be shared across
/// threads behind an `Arc` or used through [`default_engine`].
pub struct Engine {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                initialized: AtomicBool::new(false),
                running: AtomicBool::new(false),
                suspended: AtomicBool::new(false),
                batches: AtomicU64::new(0),
                mixer: Mutex::new(None),
                staging: Mutex::new(Vec::new()),
                callback: Mutex::new(None),
                busy: AtomicBool::new(false),
                worker_thread: Mutex::new(None),
                wake_lock: Mutex::new(()),
                wake: Condvar::new(),
                idle: Condvar::new(),
            }),
            worker: Mutex::new(None),
        }
    }

    // --- Lifecycle ---

    /// Initialise with the default config for the given format. Returns
    /// `true` if the engine is (now) initialised; a second call is a no-op.
    pub fn initialize(&self, sample_rate: u32, buffer_frames: usize, layout: ChannelLayout) -> bool {
        self.initialize_with(&EngineConfig::new(sample_rate, buffer_frames, layout))
    }

    pub fn initialize_with(&self, config: &EngineConfig) -> bool {
        let mut worker = lock(&self.worker);
        if self.shared.initialized.load(Ordering::Acquire) {
            return true;
        }
        if let Err(e) = config.validate() {
            warn!("engine not initialised: {e}");
            return false;
        }

        let mixer = Mixer::new(config);
        let batch_bytes = config.buffer_frames * mixer.spec().bytes_per_frame();
        *lock(&self.shared.staging) = vec![0u8; batch_bytes];
        *lock(&self.shared.mixer) = Some(mixer);
        self.shared.batches.store(0, Ordering::Relaxed);
        self.shared.suspended.store(false, Ordering::Release);
        self.shared.running.store(true, Ordering::Release);

        if config.worker {
            let shared = Arc::clone(&self.shared);
            let frames = config.buffer_frames;
            let period = Duration::from_secs_f64(frames as f64 / config.sample_rate as f64);
            let spawned = std::thread::Builder::new()
                .name("vs-render".into())
                .spawn(move || render_loop(shared, frames, period));
            match spawned {
                Ok(handle) => *worker = Some(handle),
                Err(e) => {
                    error!("failed to spawn render worker: {e}");
                    self.shared.running.store(false, Ordering::Release);
                    *lock(&self.shared.mixer) = None;
                    lock(&self.shared.staging).clear();
                    return false;
                }
            }
        }

        self.shared.initialized.store(true, Ordering::Release);
        info!(
            "engine initialised: {} Hz, {} frames, {} channels{}",
            config.sample_rate,
            config.buffer_frames,
            config.layout.channel_count(),
            if config.worker { "" } else { " (manual render)" }
        );
        true
    }

    /// Stop the worker, wait for it to exit and release every source,
    /// listener and buffer. No-op when not initialised.
    pub fn shutdown(&self) {
        let mut worker = lock(&self.worker);
        if !self.shared.initialized.swap(false, Ordering::AcqRel) {
            return;
        }
        self.shared.running.store(false, Ordering::Release);
        {
            let _guard = lock(&self.shared.wake_lock);
            self.shared.wake.notify_all();
        }
        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                warn!("render worker panicked");
            }
        }
        *lock(&self.shared.mixer) = None;
        *lock(&self.shared.staging) = Vec::new();
        self.shared.suspended.store(false, Ordering::Release);
        info!("engine shut down");
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.initialized.load(Ordering::Acquire)
    }

    /// Whether the engine is initialised and not suspended.
    pub fn is_running(&self) -> bool {
        self.is_initialized() && !self.is_suspended()
    }

    /// Pause the worker. Batches are neither rendered nor delivered until
    /// [`Engine::resume`]. Returns once a batch the worker had already
    /// started has been delivered, unless called from the render callback.
    pub fn suspend(&self) {
        if !self.is_initialized() {
            return;
        }
        let on_worker = *lock(&self.shared.worker_thread) == Some(std::thread::current().id());
        let guard = lock(&self.shared.wake_lock);
        self.shared.suspended.store(true, Ordering::Release);
        if !on_worker {
            let idle = self
                .shared
                .idle
                .wait_while(guard, |_| self.shared.busy.load(Ordering::Acquire));
            drop(idle);
        }
        debug!("engine suspended");
    }

    pub fn resume(&self) {
        let _guard = lock(&self.shared.wake_lock);
        if self.shared.suspended.swap(false, Ordering::AcqRel) {
            self.shared.wake.notify_all();
            debug!("engine resumed");
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.shared.suspended.load(Ordering::Acquire)
    }

    /// Output format, while initialised.
    pub fn output_spec(&self) -> Option<AudioSpec> {
        lock(&self.shared.mixer).as_ref().map(Mixer::spec)
    }

    pub fn buffer_frames(&self) -> Option<usize> {
        lock(&self.shared.mixer).as_ref().map(Mixer::buffer_frames)
    }

    /// Batches rendered since initialisation.
    pub fn batches_rendered(&self) -> u64 {
        self.shared.batches.load(Ordering::Relaxed)
    }

    pub fn master_volume(&self) -> f32 {
        lock(&self.shared.mixer).as_ref().map_or(1.0, Mixer::master_volume)
    }

    /// Clamped to `[0, 1]`. Ignored while uninitialised.
    pub fn set_master_volume(&self, volume: f32) {
        if let Some(mixer) = lock(&self.shared.mixer).as_mut() {
            mixer.set_master_volume(volume);
        }
    }

    // --- Entities ---

    /// `None` while uninitialised.
    pub fn create_source(&self) -> Option<Arc<Source>> {
        lock(&self.shared.mixer).as_mut().map(Mixer::create_source)
    }

    /// Remove a source from the engine. Returns `false` if it was not
    /// registered. Outstanding handles stay valid but are never rendered.
    pub fn destroy_source(&self, source: &Source) -> bool {
        lock(&self.shared.mixer)
            .as_mut()
            .is_some_and(|m| m.destroy_source(source.key()))
    }

    pub fn sources(&self) -> Vec<Arc<Source>> {
        lock(&self.shared.mixer).as_ref().map(Mixer::sources).unwrap_or_default()
    }

    pub fn source_count(&self) -> usize {
        lock(&self.shared.mixer).as_ref().map_or(0, Mixer::source_count)
    }

    pub fn create_listener(&self, name: &str) -> Option<Arc<Listener>> {
        lock(&self.shared.mixer)
            .as_mut()
            .map(|m| m.create_listener(name))
    }

    pub fn destroy_listener(&self, listener: &Listener) -> bool {
        lock(&self.shared.mixer)
            .as_mut()
            .is_some_and(|m| m.destroy_listener(listener.key()))
    }

    pub fn listeners(&self) -> Vec<Arc<Listener>> {
        lock(&self.shared.mixer).as_ref().map(Mixer::listeners).unwrap_or_default()
    }

    /// The listener every source is rendered for: the oldest one alive.
    pub fn primary_listener(&self) -> Option<Arc<Listener>> {
        lock(&self.shared.mixer)
            .as_ref()
            .and_then(|m| m.primary_listener().cloned())
    }

    // --- Rendering ---

    /// Install the batch consumer. The callback runs on the render worker
    /// (or on the thread calling [`Engine::render`]) and must not call
    /// `set_callback` or `clear_callback` itself.
    pub fn set_callback(&self, callback: impl FnMut(&[u8]) + Send + 'static) {
        *lock(&self.shared.callback) = Some(Box::new(callback));
    }

    pub fn clear_callback(&self) {
        *lock(&self.shared.callback) = None;
    }

    /// Render one batch of up to `buffer_frames` frames on the calling
    /// thread and deliver it to the callback. Returns the frames rendered.
    pub fn render(&self, frames: usize) -> usize {
        render_batch(&self.shared, frames).map_or(0, |(n, _)| n)
    }

    /// Render `frames` frames of interleaved float32 bytes into `output`.
    /// Returns the frames written; 0 while uninitialised.
    pub fn process_audio(&self, output: &mut [u8], frames: usize) -> usize {
        match lock(&self.shared.mixer).as_mut() {
            Some(mixer) => mixer.process(output, frames),
            None => 0,
        }
    }

    /// [`Engine::process_audio`] into a float slice.
    pub fn process_audio_f32(&self, output: &mut [f32], frames: usize) -> usize {
        match lock(&self.shared.mixer).as_mut() {
            Some(mixer) => mixer.process_f32(output, frames),
            None => 0,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Process-wide engine for hosts that want a single shared instance.
pub fn default_engine() -> &'static Engine {
    static ENGINE: OnceLock<Engine> = OnceLock::new();
    ENGINE.get_or_init(Engine::new)
}

/// Render into the staging buffer and hand it to the callback. The mixer
/// lock is released before the callback runs. Returns the frames rendered
/// and whether a callback consumed them.
fn render_batch(shared: &Shared, frames: usize) -> Option<(usize, bool)> {
    let mut staging = lock(&shared.staging);
    let (n, bytes) = {
        let mut guard = lock(&shared.mixer);
        let mixer = guard.as_mut()?;
        let frames = frames.min(mixer.buffer_frames());
        let n = mixer.process(&mut staging, frames);
        (n, n * mixer.spec().bytes_per_frame())
    };
    shared.batches.fetch_add(1, Ordering::Relaxed);

    let mut callback = lock(&shared.callback);
    let delivered = match callback.as_mut() {
        Some(f) => {
            f(&staging[..bytes]);
            true
        }
        None => false,
    };
    Some((n, delivered))
}

fn render_loop(shared: Arc<Shared>, frames: usize, period: Duration) {
    debug!("render worker started");
    *lock(&shared.worker_thread) = Some(std::thread::current().id());
    while shared.running.load(Ordering::Acquire) {
        {
            let guard = lock(&shared.wake_lock);
            if shared.suspended.load(Ordering::Acquire) {
                let waited = shared.wake.wait_while(guard, |_| {
                    shared.suspended.load(Ordering::Acquire) && shared.running.load(Ordering::Acquire)
                });
                drop(waited);
                continue;
            }
            shared.busy.store(true, Ordering::Release);
        }
        let rendered = render_batch(&shared, frames);
        {
            let _guard = lock(&shared.wake_lock);
            shared.busy.store(false, Ordering::Release);
            shared.idle.notify_all();
        }
        match rendered {
            Some((_, true)) => {}
            // Nothing consumes the audio, so pace the clock ourselves.
            Some((_, false)) => std::thread::sleep(period),
            None => break,
        }
    }
    *lock(&shared.worker_thread) = None;
    debug!("render worker stopped");
}
