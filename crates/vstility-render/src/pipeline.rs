//! The offline render pipeline.
//!
//! One strictly linear pass, single-threaded, one live buffer:
//!
//! ```text
//! decode ─→ load effect ─→ prepare ─→ process (once) ─→ release ─→ encode
//! ```
//!
//! The output file is only ever touched at the encode stage, so any
//! earlier failure leaves nothing behind on disk.

use std::path::{Path, PathBuf};

use vstility_plugin::{load_first, EventBuffer};

use crate::decoder::{self, StreamInfo};
use crate::encoder;
use crate::error::{RenderError, RenderResult};

/// Summary of a completed render
#[derive(Debug, Clone)]
pub struct RenderReport {
    pub output: PathBuf,
    pub info: StreamInfo,
    /// Display name of the effect that processed the audio
    pub effect: String,
    /// Peak level of the rendered audio in dBFS
    pub peak_db: f32,
}

/// Render `input` through the first effect in `bundle` and write the
/// result to `output` as 16-bit PCM WAV.
pub fn render_file(input: &Path, output: &Path, bundle: &Path) -> RenderResult<RenderReport> {
    log::info!(
        "Rendering {} -> {} via {}",
        input.display(),
        output.display(),
        bundle.display()
    );

    let (mut buffer, info) = decoder::decode(input)?;
    if buffer.channels() != info.channels {
        return Err(RenderError::ChannelMismatch {
            expected: info.channels,
            actual: buffer.channels(),
        });
    }

    let mut effect = load_first(bundle)?;
    let effect_name = effect.descriptor().name.clone();

    effect.prepare(info.sample_rate as f64, info.channels)?;

    let latency = effect.latency();
    if latency > 0 {
        log::warn!(
            "{} reports {} frames of latency; rendering 1:1 without compensation",
            effect_name,
            latency
        );
    }

    effect.process(&mut buffer, &EventBuffer::new())?;
    effect.release();

    encoder::write_wav16(output, &buffer, info.sample_rate)?;

    let peak_db = buffer.peak_db();
    log::info!("Render complete: peak {:.2} dBFS", peak_db);

    Ok(RenderReport {
        output: output.to_path_buf(),
        info,
        effect: effect_name,
        peak_db,
    })
}
