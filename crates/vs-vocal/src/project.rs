//! JSON persistence for vocal projects.

use std::collections::BTreeMap;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::note::{Note, SynthParams};
use crate::synth::VocalSynth;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed project: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }
}

/// Everything needed to re-render a vocal line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocalProject {
    pub name: String,
    pub notes: Vec<Note>,
    pub params: SynthParams,
    /// Beats per minute.
    pub tempo: f64,
    pub time_signature: TimeSignature,
    /// Named expression values, e.g. `"tension": 0.3`.
    pub expressions: BTreeMap<String, f32>,
}

impl Default for VocalProject {
    fn default() -> Self {
        Self {
            name: "Untitled".into(),
            notes: Vec::new(),
            params: SynthParams::default(),
            tempo: 120.0,
            time_signature: TimeSignature::default(),
            expressions: BTreeMap::new(),
        }
    }
}

impl VocalProject {
    pub fn from_json(json: &str) -> Result<Self, ProjectError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ProjectError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let project = Self::from_json(&std::fs::read_to_string(path)?)?;
        info!("loaded project '{}' ({} notes) from {}", project.name, project.notes.len(), path.display());
        Ok(project)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ProjectError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        info!("saved project '{}' to {}", self.name, path.display());
        Ok(())
    }

    /// A synthesiser loaded with this project's notes and params.
    pub fn synth(&self) -> VocalSynth {
        let mut synth = VocalSynth::new().with_params(self.params.clone());
        for note in &self.notes {
            synth.add_note(note.clone());
        }
        synth
    }

    /// Replace notes and params with the synthesiser's.
    pub fn capture(&mut self, synth: &VocalSynth) {
        self.notes = synth.notes().to_vec();
        self.params = synth.params().clone();
    }

    /// Length of one beat in seconds at the project tempo.
    pub fn seconds_per_beat(&self) -> f64 {
        if self.tempo > 0.0 {
            60.0 / self.tempo
        } else {
            0.0
        }
    }
}
