//! Ordered effect chain.

use alloc::vec::Vec;

use vs_core::{AudioBuffer, AudioSpec};

use crate::effect::Effect;

/// Effects run in list order, each seeing the previous one's output.
/// Disabled or bypassed effects are skipped; a disabled chain is the
/// identity.
#[derive(Clone, Debug)]
pub struct EffectChain {
    effects: Vec<Effect>,
    enabled: bool,
}

impl EffectChain {
    pub fn new() -> Self {
        Self {
            effects: Vec::new(),
            enabled: true,
        }
    }

    pub fn with(mut self, effect: impl Into<Effect>) -> Self {
        self.push(effect);
        self
    }

    /// Append an effect, returning its index.
    pub fn push(&mut self, effect: impl Into<Effect>) -> usize {
        self.effects.push(effect.into());
        self.effects.len() - 1
    }

    /// Insert at `index`, clamped to the end of the chain.
    pub fn insert(&mut self, index: usize, effect: impl Into<Effect>) {
        let index = index.min(self.effects.len());
        self.effects.insert(index, effect.into());
    }

    pub fn remove(&mut self, index: usize) -> Option<Effect> {
        if index < self.effects.len() {
            Some(self.effects.remove(index))
        } else {
            None
        }
    }

    /// Move the effect at `from` so it ends up at `to`.
    pub fn move_effect(&mut self, from: usize, to: usize) -> bool {
        let len = self.effects.len();
        if from >= len || to >= len {
            return false;
        }
        let effect = self.effects.remove(from);
        self.effects.insert(to, effect);
        true
    }

    pub fn get(&self, index: usize) -> Option<&Effect> {
        self.effects.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Effect> {
        self.effects.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Prepare every effect for `spec` so processing does not allocate.
    pub fn prepare(&mut self, spec: &AudioSpec) {
        for effect in &mut self.effects {
            effect.prepare(spec);
        }
    }

    pub fn reset(&mut self) {
        for effect in &mut self.effects {
            effect.reset();
        }
    }

    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.enabled {
            return;
        }
        for effect in &mut self.effects {
            effect.process(buffer);
        }
    }

    pub fn process_interleaved(&mut self, spec: &AudioSpec, samples: &mut [f32]) {
        if !self.enabled {
            return;
        }
        for effect in &mut self.effects {
            effect.process_interleaved(spec, samples);
        }
    }
}

impl Default for EffectChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distortion::{Distortion, DistortionKind};
    use crate::Delay;

    fn names(chain: &EffectChain) -> Vec<&'static str> {
        chain.iter().map(Effect::name).collect()
    }

    #[test]
    fn editing_keeps_order() {
        let mut chain = EffectChain::new();
        chain.push(Distortion::default());
        chain.push(Delay::default());
        chain.insert(0, crate::Filter::default());
        assert_eq!(names(&chain), ["filter", "distortion", "delay"]);

        assert!(chain.move_effect(0, 2));
        assert_eq!(names(&chain), ["distortion", "delay", "filter"]);
        assert!(!chain.move_effect(0, 3));

        assert_eq!(chain.remove(1).map(|e| e.name()), Some("delay"));
        assert!(chain.remove(5).is_none());
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn disabled_chain_is_identity() {
        let mut chain = EffectChain::new().with(Distortion::new(DistortionKind::HardClip, 8.0, 1.0));
        chain.set_enabled(false);
        let mut buf = AudioBuffer::from_interleaved_f32(
            8000,
            vs_core::ChannelLayout::Mono,
            alloc::vec![0.5, -0.5],
        );
        chain.process(&mut buf);
        assert_eq!(buf.as_f32().unwrap(), &[0.5, -0.5]);
    }

    #[test]
    fn order_matters() {
        // gain-then-clip differs from clip-then-gain
        let boost = Distortion::new(DistortionKind::HardClip, 4.0, 1.0);
        let halve = Distortion::new(DistortionKind::HardClip, 1.0, 0.5);
        let mut a = EffectChain::new().with(boost.clone()).with(halve.clone());
        let mut b = EffectChain::new().with(halve).with(boost);
        let mk = || {
            AudioBuffer::from_interleaved_f32(8000, vs_core::ChannelLayout::Mono, alloc::vec![0.5])
        };
        let (mut x, mut y) = (mk(), mk());
        a.process(&mut x);
        b.process(&mut y);
        assert_eq!(x.as_f32().unwrap(), &[0.5]);
        assert_eq!(y.as_f32().unwrap(), &[1.0]);
    }
}
