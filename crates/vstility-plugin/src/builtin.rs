//! Builtin effects, addressed by `builtin:` pseudo-paths.
//!
//! `builtin:bypass` hands the audio back untouched and `builtin:gain`
//! applies a flat linear gain. They run the full discover → instantiate
//! → prepare → process lifecycle without any plugin binary on disk,
//! which is what the integration tests render through.

use std::path::PathBuf;

use crate::discovery::{EffectDescriptor, EffectFormat, BUILTIN_SCHEME};
use crate::{AudioBuffer, EffectProcessor, EventBuffer, ParameterInfo, PluginError, PluginResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuiltinKind {
    Bypass,
    Gain,
}

fn descriptor_for(kind: BuiltinKind) -> EffectDescriptor {
    let (short, name) = match kind {
        BuiltinKind::Bypass => ("bypass", "Bypass"),
        BuiltinKind::Gain => ("gain", "Gain"),
    };
    EffectDescriptor {
        id: format!("builtin.{short}"),
        name: name.to_string(),
        format: EffectFormat::Builtin,
        path: PathBuf::from(format!("{BUILTIN_SCHEME}{short}")),
        index: 0,
    }
}

/// Descriptors for a builtin id; empty when the id names nothing
pub(crate) fn descriptors(id: &str) -> Vec<EffectDescriptor> {
    match id {
        "bypass" => vec![descriptor_for(BuiltinKind::Bypass)],
        "gain" => vec![descriptor_for(BuiltinKind::Gain)],
        other => {
            log::debug!("No builtin effect named {:?}", other);
            Vec::new()
        }
    }
}

pub(crate) fn instantiate(
    descriptor: &EffectDescriptor,
) -> PluginResult<Box<dyn EffectProcessor>> {
    let effect = match descriptor.id.as_str() {
        "builtin.bypass" => BuiltinEffect::bypass(),
        "builtin.gain" => BuiltinEffect::gain(1.0),
        other => {
            return Err(PluginError::NoEffectFound(other.to_string()));
        }
    };
    Ok(Box::new(effect))
}

/// Trivial deterministic effect
pub struct BuiltinEffect {
    descriptor: EffectDescriptor,
    kind: BuiltinKind,
    gain: f32,
    prepared: bool,
    channels: usize,
}

impl BuiltinEffect {
    pub fn bypass() -> Self {
        Self {
            descriptor: descriptor_for(BuiltinKind::Bypass),
            kind: BuiltinKind::Bypass,
            gain: 1.0,
            prepared: false,
            channels: 0,
        }
    }

    pub fn gain(gain: f32) -> Self {
        Self {
            descriptor: descriptor_for(BuiltinKind::Gain),
            kind: BuiltinKind::Gain,
            gain,
            prepared: false,
            channels: 0,
        }
    }
}

impl EffectProcessor for BuiltinEffect {
    fn descriptor(&self) -> &EffectDescriptor {
        &self.descriptor
    }

    fn prepare(&mut self, sample_rate: f64, channels: usize) -> PluginResult<()> {
        if sample_rate <= 0.0 || channels == 0 {
            return Err(PluginError::InstantiationFailed(format!(
                "cannot prepare for {} Hz / {} channels",
                sample_rate, channels
            )));
        }
        self.channels = channels;
        self.prepared = true;
        log::debug!(
            "Prepared {} at {} Hz, {} ch",
            self.descriptor.name,
            sample_rate,
            channels
        );
        Ok(())
    }

    fn process(&mut self, buffer: &mut AudioBuffer, _events: &EventBuffer) -> PluginResult<()> {
        if !self.prepared {
            return Err(PluginError::NotPrepared);
        }
        if buffer.channels() != self.channels {
            return Err(PluginError::ProcessingError(format!(
                "buffer has {} channels, effect prepared for {}",
                buffer.channels(),
                self.channels
            )));
        }

        match self.kind {
            BuiltinKind::Bypass => {}
            BuiltinKind::Gain => {
                let gain = self.gain;
                for plane in buffer.planes_mut() {
                    for sample in plane.iter_mut() {
                        *sample *= gain;
                    }
                }
            }
        }
        Ok(())
    }

    fn parameter_count(&self) -> usize {
        match self.kind {
            BuiltinKind::Bypass => 0,
            BuiltinKind::Gain => 1,
        }
    }

    fn parameter_info(&self, index: usize) -> Option<ParameterInfo> {
        match (self.kind, index) {
            (BuiltinKind::Gain, 0) => Some(ParameterInfo {
                id: 0,
                name: "Gain".to_string(),
                unit: "x".to_string(),
                min: 0.0,
                max: 2.0,
                default: 0.5,
            }),
            _ => None,
        }
    }

    fn release(&mut self) {
        self.prepared = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ControlEvent;

    fn ramp_buffer() -> AudioBuffer {
        let left: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
        let right: Vec<f32> = (0..100).map(|i| -(i as f32) / 200.0).collect();
        AudioBuffer::from_planes(vec![left, right])
    }

    #[test]
    fn test_bypass_is_identity() {
        let mut buf = ramp_buffer();
        let original = buf.clone();

        let mut fx = BuiltinEffect::bypass();
        fx.prepare(44100.0, 2).unwrap();
        fx.process(&mut buf, &EventBuffer::new()).unwrap();

        assert_eq!(buf.planes(), original.planes());
    }

    #[test]
    fn test_unity_gain_is_identity() {
        let mut buf = ramp_buffer();
        let original = buf.clone();

        let mut fx = BuiltinEffect::gain(1.0);
        fx.prepare(44100.0, 2).unwrap();
        fx.process(&mut buf, &EventBuffer::new()).unwrap();

        assert_eq!(buf.planes(), original.planes());
    }

    #[test]
    fn test_gain_scales_samples() {
        let mut buf = AudioBuffer::from_planes(vec![vec![0.5, -0.5], vec![1.0, 0.0]]);

        let mut fx = BuiltinEffect::gain(0.5);
        fx.prepare(48000.0, 2).unwrap();
        fx.process(&mut buf, &EventBuffer::new()).unwrap();

        assert_eq!(buf.channel(0).unwrap(), &[0.25, -0.25]);
        assert_eq!(buf.channel(1).unwrap(), &[0.5, 0.0]);
    }

    #[test]
    fn test_process_before_prepare_fails() {
        let mut buf = ramp_buffer();
        let mut fx = BuiltinEffect::bypass();
        let err = fx.process(&mut buf, &EventBuffer::new()).unwrap_err();
        assert!(matches!(err, PluginError::NotPrepared));
    }

    #[test]
    fn test_process_after_release_fails() {
        let mut buf = ramp_buffer();
        let mut fx = BuiltinEffect::bypass();
        fx.prepare(44100.0, 2).unwrap();
        fx.release();
        let err = fx.process(&mut buf, &EventBuffer::new()).unwrap_err();
        assert!(matches!(err, PluginError::NotPrepared));
    }

    #[test]
    fn test_channel_mismatch_rejected() {
        let mut buf = ramp_buffer();
        let mut fx = BuiltinEffect::bypass();
        fx.prepare(44100.0, 1).unwrap();
        let err = fx.process(&mut buf, &EventBuffer::new()).unwrap_err();
        assert!(matches!(err, PluginError::ProcessingError(_)));
    }

    #[test]
    fn test_prepare_rejects_empty_layout() {
        let mut fx = BuiltinEffect::bypass();
        assert!(fx.prepare(44100.0, 0).is_err());
        assert!(fx.prepare(0.0, 2).is_err());
    }

    #[test]
    fn test_events_are_ignored() {
        let mut buf = ramp_buffer();
        let original = buf.clone();

        let mut events = EventBuffer::new();
        events.push(ControlEvent::note_on(0, 0, 60, 127));

        let mut fx = BuiltinEffect::bypass();
        fx.prepare(44100.0, 2).unwrap();
        fx.process(&mut buf, &events).unwrap();

        assert_eq!(buf.planes(), original.planes());
    }

    #[test]
    fn test_gain_parameter_metadata() {
        let fx = BuiltinEffect::gain(1.0);
        assert_eq!(fx.parameter_count(), 1);
        let param = fx.parameter_info(0).unwrap();
        assert_eq!(param.name, "Gain");
        assert!(fx.parameter_info(1).is_none());

        let bypass = BuiltinEffect::bypass();
        assert_eq!(bypass.parameter_count(), 0);
    }
}
