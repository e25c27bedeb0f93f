//! Audio decoding.
//!
//! symphonia handles every input format the workspace enables
//! (WAV/AIFF PCM, FLAC, ALAC, MP3, OGG Vorbis, AAC). The whole file is
//! decoded up front into one planar buffer; the render pass never
//! streams.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use vstility_plugin::AudioBuffer;

use crate::error::{RenderError, RenderResult};

// ═══════════════════════════════════════════════════════════════════════════
// STREAM INFO
// ═══════════════════════════════════════════════════════════════════════════

/// Layout of a decoded stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: usize,
    /// Frames per channel
    pub frames: usize,
}

impl StreamInfo {
    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// DECODER
// ═══════════════════════════════════════════════════════════════════════════

fn probe_format(path: &Path) -> RenderResult<Box<dyn symphonia::core::formats::FormatReader>> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RenderError::InputNotFound(path.display().to_string())
        } else {
            RenderError::DecodeError(format!("Failed to open file: {}", e))
        }
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| RenderError::DecodeError(format!("Failed to probe format: {}", e)))?;

    Ok(probed.format)
}

fn stream_layout(
    format: &dyn symphonia::core::formats::FormatReader,
) -> RenderResult<(u32, symphonia::core::codecs::CodecParameters)> {
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| RenderError::DecodeError("No audio track found".to_string()))?;
    Ok((track.id, track.codec_params.clone()))
}

/// Read the stream layout without decoding any audio.
///
/// The frame count comes from the container header and is zero when
/// the header does not carry one.
pub fn probe(path: &Path) -> RenderResult<StreamInfo> {
    let format = probe_format(path)?;
    let (_, codec_params) = stream_layout(format.as_ref())?;

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| RenderError::DecodeError("Stream reports no sample rate".to_string()))?;
    let channels = codec_params
        .channels
        .map(|c| c.count())
        .ok_or_else(|| RenderError::DecodeError("Stream reports no channel layout".to_string()))?;

    Ok(StreamInfo {
        sample_rate,
        channels,
        frames: codec_params.n_frames.unwrap_or(0) as usize,
    })
}

/// Decode a whole audio file into a planar f32 buffer.
///
/// Corrupt packets are skipped; any other decode failure aborts. The
/// returned frame count comes from the samples actually decoded, not
/// from the container header.
pub fn decode(path: &Path) -> RenderResult<(AudioBuffer, StreamInfo)> {
    let mut format = probe_format(path)?;
    let (track_id, codec_params) = stream_layout(format.as_ref())?;

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| RenderError::DecodeError("Stream reports no sample rate".to_string()))?;
    let channels = codec_params
        .channels
        .map(|c| c.count())
        .ok_or_else(|| RenderError::DecodeError("Stream reports no channel layout".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| RenderError::DecodeError(format!("Failed to create decoder: {}", e)))?;

    let mut planes: Vec<Vec<f32>> = vec![Vec::new(); channels];
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        match format.next_packet() {
            Ok(packet) => {
                if packet.track_id() != track_id {
                    continue;
                }

                match decoder.decode(&packet) {
                    Ok(decoded) => {
                        let spec = SignalSpec::new(decoded.spec().rate, decoded.spec().channels);
                        let needs_realloc = sample_buf
                            .as_ref()
                            .is_none_or(|buf| buf.capacity() < decoded.capacity());
                        if needs_realloc {
                            sample_buf =
                                Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
                        }
                        if let Some(buf) = sample_buf.as_mut() {
                            buf.copy_interleaved_ref(decoded);
                            deinterleave(buf.samples(), channels, &mut planes);
                        }
                    }
                    Err(SymphoniaError::DecodeError(e)) => {
                        // Skip corrupt packets
                        log::debug!("Skipping undecodable packet: {}", e);
                        continue;
                    }
                    Err(SymphoniaError::ResetRequired) => {
                        decoder.reset();
                        continue;
                    }
                    Err(e) => {
                        return Err(RenderError::DecodeError(format!("Decode error: {}", e)));
                    }
                }
            }
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                // End of stream
                break;
            }
            Err(e) => {
                return Err(RenderError::DecodeError(format!("Packet read error: {}", e)));
            }
        }
    }

    let buffer = AudioBuffer::from_planes(planes);
    let info = StreamInfo {
        sample_rate,
        channels: buffer.channels(),
        frames: buffer.frames(),
    };

    log::info!(
        "Decoded {}: {} Hz, {} ch, {} frames ({:.2}s)",
        path.display(),
        info.sample_rate,
        info.channels,
        info.frames,
        info.duration_secs()
    );

    Ok((buffer, info))
}

fn deinterleave(samples: &[f32], channels: usize, planes: &mut [Vec<f32>]) {
    for frame in samples.chunks_exact(channels) {
        for (ch, &sample) in frame.iter().enumerate() {
            planes[ch].push(sample);
        }
    }
}
