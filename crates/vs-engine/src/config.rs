//! Engine configuration schema and loader.
//!
//! Stored as YAML; every field is optional and falls back to its default.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use vs_core::ChannelLayout;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Doppler shift applied to source playback rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DopplerConfig {
    pub enabled: bool,
    /// Metres per second.
    pub speed_of_sound: f32,
    /// Scales both velocities; 0 disables the effect.
    pub factor: f32,
}

impl Default for DopplerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            speed_of_sound: 343.3,
            factor: 1.0,
        }
    }
}

/// Output format and runtime options for an `Engine`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: u32,
    /// Frames per rendered batch.
    pub buffer_frames: usize,
    pub layout: ChannelLayout,
    pub master_volume: f32,
    pub doppler: DopplerConfig,
    /// Spawn the render worker. When false the host drives `Engine::render`.
    pub worker: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_frames: 512,
            layout: ChannelLayout::Stereo,
            master_volume: 1.0,
            doppler: DopplerConfig::default(),
            worker: true,
        }
    }
}

impl EngineConfig {
    pub fn new(sample_rate: u32, buffer_frames: usize, layout: ChannelLayout) -> Self {
        Self {
            sample_rate,
            buffer_frames,
            layout,
            ..Self::default()
        }
    }

    /// Same config with the render worker disabled.
    pub fn manual(mut self) -> Self {
        self.worker = false;
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "sample_rate",
                reason: "must be positive".into(),
            });
        }
        if self.buffer_frames == 0 {
            return Err(ConfigError::Invalid {
                field: "buffer_frames",
                reason: "must be positive".into(),
            });
        }
        if !(self.master_volume >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "master_volume",
                reason: format!("{} is not a non-negative gain", self.master_volume),
            });
        }
        if self.doppler.enabled && !(self.doppler.speed_of_sound > 0.0) {
            return Err(ConfigError::Invalid {
                field: "doppler.speed_of_sound",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = EngineConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_yaml_overrides_fields() {
        let yaml = "sample_rate: 44100\nlayout: '5.1'\ndoppler:\n  enabled: true\n";
        let config = EngineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.layout, ChannelLayout::Surround51);
        assert!(config.doppler.enabled);
        assert_eq!(config.doppler.speed_of_sound, 343.3);
        assert_eq!(config.buffer_frames, 512);
    }

    #[test]
    fn zero_rate_is_rejected() {
        let err = EngineConfig::from_yaml_str("sample_rate: 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "sample_rate", .. }));
    }

    #[test]
    fn yaml_round_trip() {
        let config = EngineConfig::new(22050, 256, ChannelLayout::Quad).manual();
        let yaml = config.to_yaml_string().unwrap();
        assert_eq!(EngineConfig::from_yaml_str(&yaml).unwrap(), config);
    }
}
