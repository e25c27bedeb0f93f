//! WAV encoding.
//!
//! Output is always 16-bit integer PCM. The output stream is opened
//! (created or truncated) before the WAV writer is constructed over it,
//! so a failure to reach the path and a failure to set up the encoder
//! surface as distinct errors.

use std::fs::OpenOptions;
use std::io::BufWriter;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use vstility_plugin::AudioBuffer;

use crate::error::{RenderError, RenderResult};

/// Convert a normalized sample to 16-bit PCM
fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

/// Write a planar buffer to `path` as 16-bit PCM WAV.
///
/// An existing file is truncated; the parent directory must exist.
pub fn write_wav16(path: &Path, buffer: &AudioBuffer, sample_rate: u32) -> RenderResult<()> {
    if buffer.channels() == 0 {
        return Err(RenderError::EncodeWriterError(
            "buffer has no channels".to_string(),
        ));
    }

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| {
            RenderError::OutputStreamError(format!("{}: {}", path.display(), e))
        })?;

    let spec = WavSpec {
        channels: buffer.channels() as u16,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::new(BufWriter::new(file), spec)
        .map_err(|e| RenderError::EncodeWriterError(e.to_string()))?;

    for frame in 0..buffer.frames() {
        for ch in 0..buffer.channels() {
            let sample = buffer
                .channel(ch)
                .and_then(|plane| plane.get(frame))
                .copied()
                .unwrap_or(0.0);
            writer
                .write_sample(to_i16(sample))
                .map_err(|e| RenderError::EncodeWriterError(e.to_string()))?;
        }
    }

    writer
        .finalize()
        .map_err(|e| RenderError::EncodeWriterError(e.to_string()))?;

    log::info!(
        "Wrote {}: {} Hz, {} ch, {} frames, 16-bit PCM",
        path.display(),
        sample_rate,
        buffer.channels(),
        buffer.frames()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_i16_range() {
        assert_eq!(to_i16(0.0), 0);
        assert_eq!(to_i16(1.0), 32767);
        assert_eq!(to_i16(-1.0), -32767);
        // Out-of-range samples clamp instead of wrapping
        assert_eq!(to_i16(2.5), 32767);
        assert_eq!(to_i16(-3.0), -32767);
        assert_eq!(to_i16(0.5), 16384);
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");

        let buffer = AudioBuffer::from_planes(vec![
            vec![0.0, 0.25, -0.5, 1.0],
            vec![0.1, -0.1, 0.0, -1.0],
        ]);
        write_wav16(&path, &buffer, 48000).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);

        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        let expected: Vec<i16> = [0.0f32, 0.1, 0.25, -0.1, -0.5, 0.0, 1.0, -1.0]
            .iter()
            .map(|&s| to_i16(s))
            .collect();
        assert_eq!(samples, expected);
    }

    #[test]
    fn test_overwrite_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");

        let long = AudioBuffer::from_planes(vec![vec![0.5; 1000]]);
        write_wav16(&path, &long, 44100).unwrap();

        let short = AudioBuffer::from_planes(vec![vec![-0.5; 10]]);
        write_wav16(&path, &short, 44100).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.duration(), 10);
        let first = reader.samples::<i16>().next().unwrap().unwrap();
        assert_eq!(first, to_i16(-0.5));
    }

    #[test]
    fn test_missing_parent_is_output_stream_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("out.wav");

        let buffer = AudioBuffer::new(1, 4);
        let err = write_wav16(&path, &buffer, 44100).unwrap_err();
        assert!(matches!(err, RenderError::OutputStreamError(_)));
    }

    #[test]
    fn test_empty_buffer_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");

        let buffer = AudioBuffer::from_planes(Vec::new());
        let err = write_wav16(&path, &buffer, 44100).unwrap_err();
        assert!(matches!(err, RenderError::EncodeWriterError(_)));
    }

    #[test]
    fn test_zero_frames_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");

        let buffer = AudioBuffer::new(2, 0);
        write_wav16(&path, &buffer, 44100).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.duration(), 0);
    }
}
