pub mod backend;
pub mod cpal_output;
pub mod decoder;
pub mod engine;

pub use backend::{AudioBackend, AudioError, AudioHandle};
pub use engine::{PlaybackEngine, PlaybackError};
