//! vstility-render — offline effect rendering.
//!
//! Decodes an audio file, runs it through one effect instance in a
//! single pass, and writes 16-bit PCM WAV:
//!
//! ```text
//! ┌──────────┐    ┌──────────────────┐    ┌──────────┐
//! │ Decoder  │ ─→ │ EffectProcessor  │ ─→ │ Encoder  │
//! │(symphonia│    │  (vstility-plugin│    │  (hound, │
//! │ → f32)   │    │   VST3/builtin)  │    │  16-bit) │
//! └──────────┘    └──────────────────┘    └──────────┘
//! ```

mod decoder;
mod encoder;
mod error;
mod pipeline;

pub use decoder::{decode, probe, StreamInfo};
pub use encoder::write_wav16;
pub use error::{RenderError, RenderResult};
pub use pipeline::{render_file, RenderReport};
