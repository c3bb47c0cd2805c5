//! Memoryless waveshaping.

use core::f32::consts::FRAC_PI_2;

use vs_core::AudioSpec;

use crate::effect::Processor;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DistortionKind {
    /// Clip to [-1, 1].
    #[default]
    HardClip,
    /// `tanh(x)`.
    SoftClip,
    /// `x * (2 - |x|)` on the clipped signal.
    Overdrive,
    /// `sin(x * pi / 2)`.
    Fuzz,
}

impl DistortionKind {
    #[inline]
    pub fn shape(self, x: f32) -> f32 {
        match self {
            DistortionKind::HardClip => x.clamp(-1.0, 1.0),
            DistortionKind::SoftClip => libm::tanhf(x),
            DistortionKind::Overdrive => {
                let x = x.clamp(-1.0, 1.0);
                x * (2.0 - libm::fabsf(x))
            }
            DistortionKind::Fuzz => libm::sinf(x * FRAC_PI_2),
        }
    }
}

/// `out = shape(in * drive) * tone`.
#[derive(Clone, Debug)]
pub struct Distortion {
    kind: DistortionKind,
    drive: f32,
    tone: f32,
}

impl Distortion {
    pub fn new(kind: DistortionKind, drive: f32, tone: f32) -> Self {
        Self {
            kind,
            drive: drive.max(1.0),
            tone: tone.max(0.0),
        }
    }

    pub fn kind(&self) -> DistortionKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: DistortionKind) {
        self.kind = kind;
    }

    pub fn drive(&self) -> f32 {
        self.drive
    }

    pub fn set_drive(&mut self, drive: f32) {
        self.drive = drive.max(1.0);
    }

    pub fn tone(&self) -> f32 {
        self.tone
    }

    pub fn set_tone(&mut self, tone: f32) {
        self.tone = tone.max(0.0);
    }
}

impl Default for Distortion {
    fn default() -> Self {
        Self::new(DistortionKind::HardClip, 1.0, 1.0)
    }
}

impl Processor for Distortion {
    fn prepare(&mut self, _spec: &AudioSpec) {}

    fn reset(&mut self) {}

    fn process_frame(&mut self, frame: &mut [f32]) {
        for s in frame.iter_mut() {
            *s = self.kind.shape(*s * self.drive) * self.tone;
        }
    }
}
