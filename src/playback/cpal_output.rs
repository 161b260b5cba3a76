use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{error, info};

use crate::playback::backend::{AudioBackend, AudioError, AudioHandle};
use crate::playback::decoder::{decode_clip, DecodedClip};

/// Audio backend playing clips through the default CPAL output device.
///
/// Each handle owns its own output stream; mixing concurrent categories is
/// the device's job, not ours.
pub struct CpalBackend {
    device: Device,
    stream_config: StreamConfig,
}

impl CpalBackend {
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::DeviceNotFound)?;

        let default_config = device
            .default_output_config()
            .map_err(|e| AudioError::StreamConfig(e.to_string()))?;
        let stream_config = StreamConfig::from(default_config);

        info!(
            "Audio device: {} channels, {} Hz",
            stream_config.channels, stream_config.sample_rate.0
        );

        Ok(Self {
            device,
            stream_config,
        })
    }
}

impl AudioBackend for CpalBackend {
    fn load(&self, bytes: Vec<u8>) -> Result<Box<dyn AudioHandle>, AudioError> {
        let clip = decode_clip(bytes)?;
        Ok(Box::new(CpalHandle {
            device: self.device.clone(),
            stream_config: self.stream_config.clone(),
            clip: Arc::new(clip),
            controls: Arc::new(Controls::default()),
            stream: None,
        }))
    }
}

/// Live-updatable playback parameters shared with the realtime callback.
struct Controls {
    volume: AtomicU32, // 0-10000 (0.0-1.0 scaled)
    looping: AtomicBool,
}

impl Default for Controls {
    fn default() -> Self {
        Controls {
            volume: AtomicU32::new(10000),
            looping: AtomicBool::new(false),
        }
    }
}

struct CpalHandle {
    device: Device,
    stream_config: StreamConfig,
    clip: Arc<DecodedClip>,
    controls: Arc<Controls>,
    stream: Option<Stream>,
}

impl AudioHandle for CpalHandle {
    fn start(&mut self) -> Result<(), AudioError> {
        let clip = self.clip.clone();
        let controls = self.controls.clone();
        let out_channels = self.stream_config.channels as usize;
        // Sample rate conversion factor
        let ratio = clip.sample_rate as f64 / self.stream_config.sample_rate.0 as f64;
        let mut src_pos = 0f64;
        let mut finished = false;

        let stream = self
            .device
            .build_output_stream(
                &self.stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = clip.frames();
                    if finished || frames == 0 {
                        data.fill(0.0);
                        return;
                    }
                    let vol = controls.volume.load(Ordering::Relaxed) as f32 / 10000.0;
                    for out_frame in data.chunks_mut(out_channels) {
                        let mut frame_idx = src_pos as usize;
                        if frame_idx >= frames {
                            if controls.looping.load(Ordering::Relaxed) {
                                src_pos = 0.0;
                                frame_idx = 0;
                            } else {
                                finished = true;
                            }
                        }
                        if finished {
                            out_frame.fill(0.0);
                            continue;
                        }
                        write_frame(&clip, frame_idx, out_frame, vol);
                        src_pos += ratio;
                    }
                },
                |err| {
                    error!("Audio stream error: {:?}", err);
                },
                None,
            )
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamStart(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.controls.volume.store(
            (volume.clamp(0.0, 1.0) * 10000.0) as u32,
            Ordering::Relaxed,
        );
    }

    fn set_looping(&mut self, looping: bool) {
        self.controls.looping.store(looping, Ordering::Relaxed);
    }

    fn stop(&mut self) {
        // Dropping the stream halts output.
        self.stream.take();
    }
}

/// Map one source frame onto an output frame, fanning mono out to every
/// output channel and folding extra source channels down to the first ones.
fn write_frame(clip: &DecodedClip, frame_idx: usize, out_frame: &mut [f32], vol: f32) {
    let base = frame_idx * clip.channels;
    for (ch, slot) in out_frame.iter_mut().enumerate() {
        let sample = if ch < clip.channels {
            clip.samples[base + ch]
        } else {
            clip.samples[base]
        };
        *slot = sample * vol;
    }
}
