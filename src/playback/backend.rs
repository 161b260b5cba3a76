use thiserror::Error;

use crate::playback::decoder::DecoderError;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no audio output device available")]
    DeviceNotFound,
    #[error("stream config error: {0}")]
    StreamConfig(String),
    #[error("stream build error: {0}")]
    StreamBuild(String),
    #[error("stream start error: {0}")]
    StreamStart(String),
    #[error("decoder error: {0}")]
    Decoder(#[from] DecoderError),
}

/// A clip loaded and ready to play.
///
/// Handles are fire-and-forget: a clip that runs to its natural end simply
/// goes quiet, and stopping or dropping the handle halts output immediately.
pub trait AudioHandle {
    fn start(&mut self) -> Result<(), AudioError>;
    /// Effective volume in `0.0..=1.0`, applied to audio already in flight.
    fn set_volume(&mut self, volume: f32);
    /// A cleared loop flag lets the current pass finish; a set one takes
    /// effect when the clip next wraps around.
    fn set_looping(&mut self, looping: bool);
    fn stop(&mut self);
}

/// Seam between the playback engine and the audio device, so the engine can
/// run against a recording fake in tests.
pub trait AudioBackend {
    fn load(&self, bytes: Vec<u8>) -> Result<Box<dyn AudioHandle>, AudioError>;
}
