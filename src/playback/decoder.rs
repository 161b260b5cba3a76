use std::io::Cursor;
use symphonia::core::{
    audio::{AudioBufferRef, Signal},
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("Symphonia error: {0}")]
    Symphonia(#[from] symphonia::core::errors::Error),
    #[error("No audio tracks found")]
    NoAudioTracks,
    #[error("Unsupported sample format")]
    UnsupportedFormat,
}

/// A fully decoded clip: interleaved f32 samples plus the source layout.
pub struct DecodedClip {
    pub samples: Vec<f32>,
    pub channels: usize,
    pub sample_rate: u32,
}

impl DecodedClip {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }
}

/// Decode an entire clip into memory.
///
/// Soundboard clips are short, so holding the PCM up-front keeps the
/// realtime callback trivial and makes loop wrap-around seamless.
pub fn decode_clip(data: Vec<u8>) -> Result<DecodedClip, DecoderError> {
    let cursor = Cursor::new(data);
    let media_source = MediaSourceStream::new(Box::new(cursor), Default::default());

    let probed = symphonia::default::get_probe().format(
        &Hint::new(),
        media_source,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecoderError::NoAudioTracks)?;
    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples = Vec::new();
    let mut channels = 0usize;

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(DecoderError::Symphonia(e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let audio_buf = decoder.decode(&packet)?;
        let frames = audio_buf.frames();
        let buf_channels = audio_buf.spec().channels.count();
        channels = buf_channels;

        match audio_buf {
            AudioBufferRef::F32(buf) => {
                for frame_idx in 0..frames {
                    for ch in 0..buf_channels {
                        samples.push(buf.chan(ch)[frame_idx]);
                    }
                }
            }
            AudioBufferRef::S16(buf) => {
                for frame_idx in 0..frames {
                    for ch in 0..buf_channels {
                        samples.push(buf.chan(ch)[frame_idx] as f32 / 32768.0);
                    }
                }
            }
            AudioBufferRef::S32(buf) => {
                for frame_idx in 0..frames {
                    for ch in 0..buf_channels {
                        samples.push(buf.chan(ch)[frame_idx] as f32 / 2147483648.0);
                    }
                }
            }
            _ => return Err(DecoderError::UnsupportedFormat),
        }
    }

    if channels == 0 {
        return Err(DecoderError::NoAudioTracks);
    }

    Ok(DecodedClip {
        samples,
        channels,
        sample_rate,
    })
}
