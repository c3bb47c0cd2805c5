//! Spatial mixing engine for vstudio.
//!
//! An [`Engine`] owns a set of [`Source`]s and [`Listener`]s. Each render
//! batch it sums every playing source for the primary listener, applying
//! distance attenuation, cone gain, optional Doppler shift, pan and the
//! source's effect chain, then hands the batch to a callback.
//!
//! Sources and listeners are shared handles (`Arc`) whose state sits
//! behind a per-entity mutex, so a host thread can move them while the
//! render worker mixes.

mod config;
mod engine;
mod listener;
mod mixer;
mod source;
mod spatial;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use config::{ConfigError, DopplerConfig, EngineConfig};
pub use engine::{default_engine, Engine, RenderCallback};
pub use listener::{Listener, ListenerKey, ListenerPose, MAX_LISTENER_NAME};
pub use source::{PlaybackState, Source, SourceKey, MAX_STREAM_STEP, MIN_PITCH};
pub use spatial::{doppler_factor, pan_gains, Cone, DistanceModel};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
