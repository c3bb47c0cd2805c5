//! Audio device output for vstudio.

mod cpal_backend;
mod traits;

pub use cpal_backend::{CpalOutput, SampleWriter};
pub use traits::{AudioError, AudioOutput};
