//! Distance, cone and Doppler models used when mixing a source.

use vs_core::Vec3;

/// Inverse-linear rolloff parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceModel {
    pub reference_distance: f32,
    pub rolloff: f32,
    pub max_distance: f32,
    pub min_gain: f32,
    pub max_gain: f32,
}

impl Default for DistanceModel {
    fn default() -> Self {
        Self {
            reference_distance: 1.0,
            rolloff: 1.0,
            max_distance: f32::MAX,
            min_gain: 0.0,
            max_gain: 1.0,
        }
    }
}

impl DistanceModel {
    /// `ref / (ref + rolloff * max(0, d - ref))` with `d` capped at the max
    /// distance, clamped to `[min_gain, max_gain]`.
    pub fn gain(&self, distance: f32) -> f32 {
        let d = distance.min(self.max_distance);
        let r = self.reference_distance;
        let att = r / (r + self.rolloff * (d - r).max(0.0));
        att.clamp(self.min_gain, self.max_gain.max(self.min_gain))
    }
}

/// Directional cone. Angles are full-cone widths in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cone {
    pub inner_angle: f32,
    pub outer_angle: f32,
    pub outer_gain: f32,
}

impl Default for Cone {
    fn default() -> Self {
        Self {
            inner_angle: 360.0,
            outer_angle: 360.0,
            outer_gain: 0.0,
        }
    }
}

impl Cone {
    /// Gain for a listener at `to_listener` (source → listener) from a
    /// source facing `direction`. Omnidirectional when either vector is zero.
    pub fn gain(&self, direction: Vec3, to_listener: Vec3) -> f32 {
        let dir = direction.normalize();
        let to = to_listener.normalize();
        if dir == Vec3::ZERO || to == Vec3::ZERO {
            return 1.0;
        }
        let cos = dir.dot(to).clamp(-1.0, 1.0);
        let angle = libm::acosf(cos).to_degrees();
        let inner = self.inner_angle / 2.0;
        let outer = (self.outer_angle / 2.0).max(inner);
        if angle <= inner {
            1.0
        } else if angle >= outer {
            self.outer_gain
        } else {
            let t = (angle - inner) / (outer - inner);
            1.0 + (self.outer_gain - 1.0) * t
        }
    }
}

/// Playback-rate multiplier `(c - vL·ê) / (c - vS·ê)` where ê points from
/// source to listener. Velocities are scaled by `factor` and kept below
/// the speed of sound.
pub fn doppler_factor(
    source_pos: Vec3,
    source_vel: Vec3,
    listener_pos: Vec3,
    listener_vel: Vec3,
    speed_of_sound: f32,
    factor: f32,
) -> f32 {
    let e = (listener_pos - source_pos).normalize();
    if e == Vec3::ZERO || speed_of_sound <= 0.0 || factor <= 0.0 {
        return 1.0;
    }
    let limit = speed_of_sound * 0.99;
    let vl = (listener_vel.dot(e) * factor).clamp(-limit, limit);
    let vs = (source_vel.dot(e) * factor).clamp(-limit, limit);
    (speed_of_sound - vl) / (speed_of_sound - vs)
}

/// Linear pan gains for the first two output channels.
#[inline]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    (1.0 - pan / 2.0, 1.0 + pan / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_rolloff_at_ten_metres() {
        let m = DistanceModel::default();
        assert!((m.gain(10.0) - 0.1).abs() < 1e-6);
        assert_eq!(m.gain(0.0), 1.0);
        assert_eq!(m.gain(0.5), 1.0);
    }

    #[test]
    fn distance_is_capped_and_gain_clamped() {
        let m = DistanceModel {
            max_distance: 5.0,
            min_gain: 0.3,
            ..DistanceModel::default()
        };
        assert!((m.gain(100.0) - 0.3).abs() < 1e-6);
        let m = DistanceModel {
            max_distance: 5.0,
            ..DistanceModel::default()
        };
        assert!((m.gain(100.0) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn cone_interpolates_between_angles() {
        let cone = Cone {
            inner_angle: 90.0,
            outer_angle: 180.0,
            outer_gain: 0.0,
        };
        let fwd = Vec3::new(0.0, 0.0, -1.0);
        assert_eq!(cone.gain(fwd, Vec3::new(0.0, 0.0, -5.0)), 1.0);
        assert_eq!(cone.gain(fwd, Vec3::new(0.0, 0.0, 5.0)), 0.0);
        // 67.5° off-axis: halfway between 45° and 90°
        let off = Vec3::new(libm::sinf(67.5f32.to_radians()), 0.0, -libm::cosf(67.5f32.to_radians()));
        assert!((cone.gain(fwd, off) - 0.5).abs() < 1e-3);
        assert_eq!(Cone::default().gain(fwd, Vec3::new(0.0, 0.0, 5.0)), 1.0);
    }

    #[test]
    fn approaching_source_raises_pitch() {
        let f = doppler_factor(
            Vec3::ZERO,
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(100.0, 0.0, 0.0),
            Vec3::ZERO,
            343.3,
            1.0,
        );
        assert!((f - 343.3 / 333.3).abs() < 1e-5);
        let receding = doppler_factor(
            Vec3::ZERO,
            Vec3::new(-10.0, 0.0, 0.0),
            Vec3::new(100.0, 0.0, 0.0),
            Vec3::ZERO,
            343.3,
            1.0,
        );
        assert!(receding < 1.0);
    }

    #[test]
    fn centre_pan_is_unity() {
        assert_eq!(pan_gains(0.0), (1.0, 1.0));
        assert_eq!(pan_gains(-1.0), (1.5, 0.5));
    }
}
