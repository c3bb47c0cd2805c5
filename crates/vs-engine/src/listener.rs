//! The point of audition sources are rendered for.

use std::sync::Mutex;

use arrayvec::ArrayString;
use slotmap::new_key_type;
use vs_core::Vec3;

use crate::lock;

new_key_type! {
    /// Handle of a listener inside its engine.
    pub struct ListenerKey;
}

pub const MAX_LISTENER_NAME: usize = 32;

/// Snapshot of a listener's spatial state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ListenerPose {
    pub position: Vec3,
    pub velocity: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub gain: f32,
}

impl Default for ListenerPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            forward: Vec3::FORWARD,
            up: Vec3::UP,
            gain: 1.0,
        }
    }
}

struct ListenerInner {
    name: ArrayString<MAX_LISTENER_NAME>,
    pose: ListenerPose,
}

/// A named listener. Only the engine's primary listener (the first one
/// created that is still alive) is rendered for.
pub struct Listener {
    key: ListenerKey,
    inner: Mutex<ListenerInner>,
}

impl Listener {
    pub(crate) fn new(key: ListenerKey, name: &str) -> Self {
        Self {
            key,
            inner: Mutex::new(ListenerInner {
                name: truncated(name),
                pose: ListenerPose::default(),
            }),
        }
    }

    pub fn key(&self) -> ListenerKey {
        self.key
    }

    pub fn name(&self) -> String {
        lock(&self.inner).name.to_string()
    }

    /// Rename; names longer than 32 bytes are cut at a character boundary.
    pub fn set_name(&self, name: &str) {
        lock(&self.inner).name = truncated(name);
    }

    pub fn pose(&self) -> ListenerPose {
        lock(&self.inner).pose
    }

    pub fn position(&self) -> Vec3 {
        lock(&self.inner).pose.position
    }

    pub fn set_position(&self, position: Vec3) {
        if position.is_finite() {
            lock(&self.inner).pose.position = position;
        }
    }

    pub fn velocity(&self) -> Vec3 {
        lock(&self.inner).pose.velocity
    }

    pub fn set_velocity(&self, velocity: Vec3) {
        if velocity.is_finite() {
            lock(&self.inner).pose.velocity = velocity;
        }
    }

    /// `(forward, up)`.
    pub fn orientation(&self) -> (Vec3, Vec3) {
        let pose = lock(&self.inner).pose;
        (pose.forward, pose.up)
    }

    /// Zero or non-finite vectors keep the previous value.
    pub fn set_orientation(&self, forward: Vec3, up: Vec3) {
        let mut inner = lock(&self.inner);
        let f = forward.normalize();
        if forward.is_finite() && f != Vec3::ZERO {
            inner.pose.forward = f;
        }
        let u = up.normalize();
        if up.is_finite() && u != Vec3::ZERO {
            inner.pose.up = u;
        }
    }

    pub fn gain(&self) -> f32 {
        lock(&self.inner).pose.gain
    }

    pub fn set_gain(&self, gain: f32) {
        lock(&self.inner).pose.gain = if gain.is_nan() { 0.0 } else { gain.clamp(0.0, 1.0) };
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("key", &self.key)
            .field("name", &self.name())
            .finish()
    }
}

fn truncated(name: &str) -> ArrayString<MAX_LISTENER_NAME> {
    let mut out = ArrayString::new();
    for c in name.chars() {
        if out.try_push(c).is_err() {
            break;
        }
    }
    out
}
