//! Effect hosting for the vstility offline renderer.
//!
//! One effect instance processes one decoded file in a single pass:
//!
//! ```text
//! discover(bundle) ─→ EffectDescriptor ─→ instantiate() ─→ Box<dyn EffectProcessor>
//!                                                              │
//!                                            prepare() → process() → release()
//! ```
//!
//! Two backends live behind the [`EffectProcessor`] trait:
//! - VST3 bundles, hosted via the `rack` crate ([`vst3`])
//! - builtin effects addressed by `builtin:` pseudo-paths ([`builtin`]),
//!   used for bypass/gain rendering and by the test suite

use thiserror::Error;

pub mod builtin;
pub mod discovery;
pub mod vst3;

pub use discovery::{discover, load_first, EffectDescriptor, EffectFormat, DEFAULT_BLOCK_SIZE};
pub use vst3::Vst3Effect;

// ═══════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════

/// Effect hosting errors
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Plugin not found: {0}")]
    NotFound(String),

    #[error("No usable effect in bundle: {0}")]
    NoEffectFound(String),

    #[error("Failed to scan plugin bundle: {0}")]
    ScanFailed(String),

    #[error("Failed to instantiate plugin: {0}")]
    InstantiationFailed(String),

    #[error("Plugin format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Effect used before prepare()")]
    NotPrepared,

    #[error("Audio processing error: {0}")]
    ProcessingError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for effect operations
pub type PluginResult<T> = Result<T, PluginError>;

// ═══════════════════════════════════════════════════════════════════════════
// AUDIO BUFFER
// ═══════════════════════════════════════════════════════════════════════════

/// Planar audio buffer: one `Vec<f32>` per channel, samples normalized
/// to [-1.0, 1.0]. Every channel holds the same number of frames.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Per-channel sample data
    data: Vec<Vec<f32>>,
    /// Number of channels
    channels: usize,
    /// Number of frames per channel
    frames: usize,
}

impl AudioBuffer {
    /// Create a silent buffer
    pub fn new(channels: usize, frames: usize) -> Self {
        let data = (0..channels).map(|_| vec![0.0f32; frames]).collect();
        Self {
            data,
            channels,
            frames,
        }
    }

    /// Take ownership of existing channel planes. All planes must be the
    /// same length; the shortest plane wins and longer ones are truncated.
    pub fn from_planes(mut data: Vec<Vec<f32>>) -> Self {
        let channels = data.len();
        let frames = data.iter().map(Vec::len).min().unwrap_or(0);
        for plane in &mut data {
            plane.truncate(frames);
        }
        Self {
            data,
            channels,
            frames,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Get channel data
    pub fn channel(&self, ch: usize) -> Option<&[f32]> {
        self.data.get(ch).map(|v| v.as_slice())
    }

    /// Get mutable channel data
    pub fn channel_mut(&mut self, ch: usize) -> Option<&mut [f32]> {
        self.data.get_mut(ch).map(|v| v.as_mut_slice())
    }

    /// All channel planes
    pub fn planes(&self) -> &[Vec<f32>] {
        &self.data
    }

    /// All channel planes, mutable
    pub fn planes_mut(&mut self) -> &mut [Vec<f32>] {
        &mut self.data
    }

    /// Peak absolute sample value across all channels
    pub fn peak(&self) -> f32 {
        self.data
            .iter()
            .flat_map(|ch| ch.iter())
            .fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Peak level in dBFS (-inf for silence)
    pub fn peak_db(&self) -> f32 {
        let peak = self.peak();
        if peak > 0.0 {
            20.0 * peak.log10()
        } else {
            f32::NEG_INFINITY
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════════

/// A timestamped control event (raw MIDI-style bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEvent {
    /// Frame offset within the buffer being processed
    pub frame: usize,
    /// Status byte (type + channel)
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl ControlEvent {
    pub fn note_on(frame: usize, channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            frame,
            status: 0x90 | (channel & 0x0F),
            data1: note,
            data2: velocity,
        }
    }

    pub fn note_off(frame: usize, channel: u8, note: u8) -> Self {
        Self {
            frame,
            status: 0x80 | (channel & 0x0F),
            data1: note,
            data2: 0,
        }
    }
}

/// Event stream handed to an effect alongside the audio. The offline
/// render path always passes an empty buffer; the type exists so the
/// process signature matches what a hosted effect expects.
#[derive(Debug, Clone, Default)]
pub struct EventBuffer {
    events: Vec<ControlEvent>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: ControlEvent) {
        self.events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ControlEvent> {
        self.events.iter()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════

/// Effect parameter metadata
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ParameterInfo {
    /// Parameter index
    pub id: u32,
    /// Display name
    pub name: String,
    /// Unit label (dB, %, Hz, ...)
    pub unit: String,
    /// Minimum plain value
    pub min: f64,
    /// Maximum plain value
    pub max: f64,
    /// Default value, normalized to 0-1
    pub default: f64,
}

// ═══════════════════════════════════════════════════════════════════════════
// EFFECT PROCESSOR
// ═══════════════════════════════════════════════════════════════════════════

/// A loaded effect instance.
///
/// Lifecycle: [`prepare`](Self::prepare) once with the stream layout,
/// [`process`](Self::process) once with the whole file, then
/// [`release`](Self::release). Dropping the instance also releases the
/// backend resources, so early error paths need no explicit cleanup.
pub trait EffectProcessor {
    /// Descriptor this instance was created from
    fn descriptor(&self) -> &EffectDescriptor;

    /// Bind the instance to a sample rate and channel layout. Must be
    /// called before [`process`](Self::process).
    fn prepare(&mut self, sample_rate: f64, channels: usize) -> PluginResult<()>;

    /// Run the audio (and its companion event stream) through the
    /// effect in place. The buffer's channel count must match the
    /// layout given to [`prepare`](Self::prepare).
    fn process(&mut self, buffer: &mut AudioBuffer, events: &EventBuffer) -> PluginResult<()>;

    /// Processing latency in frames, as reported after prepare
    fn latency(&self) -> usize {
        0
    }

    fn parameter_count(&self) -> usize;

    fn parameter_info(&self, index: usize) -> Option<ParameterInfo>;

    /// Tear down backend resources. Idempotent.
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_buffer_new_is_silent() {
        let buf = AudioBuffer::new(2, 64);
        assert_eq!(buf.channels(), 2);
        assert_eq!(buf.frames(), 64);
        assert!(buf.channel(0).unwrap().iter().all(|&s| s == 0.0));
        assert_eq!(buf.peak(), 0.0);
        assert_eq!(buf.peak_db(), f32::NEG_INFINITY);
    }

    #[test]
    fn test_audio_buffer_from_planes_truncates_to_shortest() {
        let buf = AudioBuffer::from_planes(vec![vec![0.5; 10], vec![0.25; 8]]);
        assert_eq!(buf.channels(), 2);
        assert_eq!(buf.frames(), 8);
        assert_eq!(buf.channel(0).unwrap().len(), 8);
    }

    #[test]
    fn test_audio_buffer_peak() {
        let buf = AudioBuffer::from_planes(vec![vec![0.1, -0.8, 0.3], vec![0.2, 0.0, 0.5]]);
        assert!((buf.peak() - 0.8).abs() < 1e-6);
        assert!((buf.peak_db() - 20.0 * 0.8f32.log10()).abs() < 1e-4);
    }

    #[test]
    fn test_audio_buffer_missing_channel() {
        let mut buf = AudioBuffer::new(1, 4);
        assert!(buf.channel(1).is_none());
        assert!(buf.channel_mut(3).is_none());
    }

    #[test]
    fn test_event_buffer_empty_by_default() {
        let events = EventBuffer::new();
        assert!(events.is_empty());
        assert_eq!(events.len(), 0);
    }

    #[test]
    fn test_control_event_status_bytes() {
        let on = ControlEvent::note_on(0, 1, 60, 100);
        assert_eq!(on.status, 0x91);
        let off = ControlEvent::note_off(32, 1, 60);
        assert_eq!(off.status, 0x81);
        assert_eq!(off.frame, 32);
    }

    #[test]
    fn test_event_buffer_push_and_iter() {
        let mut events = EventBuffer::new();
        events.push(ControlEvent::note_on(0, 0, 64, 90));
        events.push(ControlEvent::note_off(128, 0, 64));
        assert_eq!(events.len(), 2);
        let frames: Vec<usize> = events.iter().map(|e| e.frame).collect();
        assert_eq!(frames, vec![0, 128]);
    }
}
