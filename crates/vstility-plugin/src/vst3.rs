//! VST3 effect hosting via the `rack` crate.
//!
//! The concrete instance type `rack` returns is type-erased behind a
//! private object-safe trait so the rest of the crate only ever sees
//! `Box<dyn EffectProcessor>`. Audio is fed to the plugin in blocks of
//! at most the prepare-time block size: input frames are copied into
//! scratch planes while output slices borrow straight from the caller's
//! buffer, so the processed audio lands in place.

use std::path::Path;

use crate::discovery::{EffectDescriptor, EffectFormat, DEFAULT_BLOCK_SIZE};
use crate::{AudioBuffer, EffectProcessor, EventBuffer, ParameterInfo, PluginError, PluginResult};

// ═══════════════════════════════════════════════════════════════════════════
// RACK TYPE ERASURE
// ═══════════════════════════════════════════════════════════════════════════

/// Object-safe slice of the `rack::PluginInstance` surface we use
trait RackEffect {
    fn initialize(&mut self, sample_rate: f64, max_block_size: usize) -> Result<(), String>;
    fn reset(&mut self) -> Result<(), String>;
    fn process(
        &mut self,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
        num_frames: usize,
    ) -> Result<(), String>;
    fn parameter_count(&self) -> usize;
    fn parameter_info(&self, index: usize) -> Result<ParameterInfo, String>;
}

struct RackEffectWrapper<P: rack::PluginInstance + Send> {
    plugin: P,
}

impl<P: rack::PluginInstance + Send> RackEffect for RackEffectWrapper<P> {
    fn initialize(&mut self, sample_rate: f64, max_block_size: usize) -> Result<(), String> {
        self.plugin
            .initialize(sample_rate, max_block_size)
            .map_err(|e| format!("{:?}", e))
    }

    fn reset(&mut self) -> Result<(), String> {
        self.plugin.reset().map_err(|e| format!("{:?}", e))
    }

    fn process(
        &mut self,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
        num_frames: usize,
    ) -> Result<(), String> {
        self.plugin
            .process(inputs, outputs, num_frames)
            .map_err(|e| format!("{:?}", e))
    }

    fn parameter_count(&self) -> usize {
        self.plugin.parameter_count()
    }

    fn parameter_info(&self, index: usize) -> Result<ParameterInfo, String> {
        let rack_param = self
            .plugin
            .parameter_info(index)
            .map_err(|e| format!("{:?}", e))?;

        // Normalize the default into 0-1
        let range = rack_param.max - rack_param.min;
        let normalized_default = if range > 0.0 {
            (rack_param.default - rack_param.min) / range
        } else {
            0.5
        };

        Ok(ParameterInfo {
            id: index as u32,
            name: rack_param.name.clone(),
            unit: rack_param.unit.clone(),
            min: rack_param.min as f64,
            max: rack_param.max as f64,
            default: normalized_default as f64,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// DISCOVERY
// ═══════════════════════════════════════════════════════════════════════════

fn bundle_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Unknown VST3")
        .to_string()
}

/// Scan a `.vst3` bundle for the effects it exposes.
///
/// `rack::PluginInfo` fields vary across versions, so descriptors carry
/// the bundle path plus the scan index and names derive from the path.
pub(crate) fn discover(bundle: &Path) -> PluginResult<Vec<EffectDescriptor>> {
    use rack::prelude::*;

    let scanner = Scanner::new()
        .map_err(|e| PluginError::ScanFailed(format!("{:?}", e)))?;

    let plugins = scanner
        .scan_path(bundle)
        .map_err(|e| PluginError::ScanFailed(format!("{:?}", e)))?;

    let stem = bundle_stem(bundle);
    let descriptors = (0..plugins.len())
        .map(|index| {
            let name = if index == 0 {
                stem.clone()
            } else {
                format!("{} ({})", stem, index)
            };
            EffectDescriptor {
                id: format!("vst3.{}.{}", stem.to_lowercase().replace(' ', "_"), index),
                name,
                format: EffectFormat::Vst3,
                path: bundle.to_path_buf(),
                index,
            }
        })
        .collect();

    Ok(descriptors)
}

// ═══════════════════════════════════════════════════════════════════════════
// EFFECT
// ═══════════════════════════════════════════════════════════════════════════

/// A VST3 effect hosted through `rack`
pub struct Vst3Effect {
    descriptor: EffectDescriptor,
    /// None once released
    inner: Option<Box<dyn RackEffect + Send>>,
    parameters: Vec<ParameterInfo>,
    prepared: bool,
    channels: usize,
    block_size: usize,
    /// Scratch input planes, one per channel
    scratch: Vec<Vec<f32>>,
    events_warned: bool,
}

impl Vst3Effect {
    /// Re-scan the descriptor's bundle and load the instance it points at.
    ///
    /// The backend's diagnostic is carried into the error verbatim.
    pub fn load(descriptor: &EffectDescriptor) -> PluginResult<Self> {
        use rack::prelude::*;

        log::info!(
            "Loading VST3 effect {} from {}",
            descriptor.name,
            descriptor.path.display()
        );

        let scanner = Scanner::new()
            .map_err(|e| PluginError::ScanFailed(format!("{:?}", e)))?;

        let plugins = scanner
            .scan_path(&descriptor.path)
            .map_err(|e| PluginError::ScanFailed(format!("{:?}", e)))?;

        let info = plugins.get(descriptor.index).ok_or_else(|| {
            PluginError::InstantiationFailed(format!(
                "descriptor {} no longer present in {}",
                descriptor.index,
                descriptor.path.display()
            ))
        })?;

        let plugin = scanner
            .load(info)
            .map_err(|e| PluginError::InstantiationFailed(format!("{:?}", e)))?;

        let wrapper = RackEffectWrapper { plugin };
        let inner: Box<dyn RackEffect + Send> = Box::new(wrapper);

        let mut parameters = Vec::new();
        for i in 0..inner.parameter_count() {
            if let Ok(param) = inner.parameter_info(i) {
                parameters.push(param);
            }
        }
        log::debug!(
            "Effect {} exposes {} parameters",
            descriptor.name,
            parameters.len()
        );

        Ok(Self {
            descriptor: descriptor.clone(),
            inner: Some(inner),
            parameters,
            prepared: false,
            channels: 0,
            block_size: DEFAULT_BLOCK_SIZE,
            scratch: Vec::new(),
            events_warned: false,
        })
    }

    fn inner_mut(&mut self) -> PluginResult<&mut Box<dyn RackEffect + Send>> {
        self.inner
            .as_mut()
            .ok_or_else(|| PluginError::ProcessingError("effect already released".into()))
    }
}

impl EffectProcessor for Vst3Effect {
    fn descriptor(&self) -> &EffectDescriptor {
        &self.descriptor
    }

    fn prepare(&mut self, sample_rate: f64, channels: usize) -> PluginResult<()> {
        let block_size = self.block_size;
        self.inner_mut()?
            .initialize(sample_rate, block_size)
            .map_err(PluginError::InstantiationFailed)?;

        self.channels = channels;
        self.scratch = (0..channels).map(|_| vec![0.0f32; block_size]).collect();
        self.prepared = true;

        log::debug!(
            "Prepared {} at {} Hz, {} ch, block {}",
            self.descriptor.name,
            sample_rate,
            channels,
            block_size
        );
        Ok(())
    }

    fn process(&mut self, buffer: &mut AudioBuffer, events: &EventBuffer) -> PluginResult<()> {
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
        if !events.is_empty() && !self.events_warned {
            log::warn!(
                "{}: {} control events ignored (no event plumbing in this host)",
                self.descriptor.name,
                events.len()
            );
            self.events_warned = true;
        }

        let channels = self.channels;
        let block_size = self.block_size;
        let frames = buffer.frames();

        let mut offset = 0;
        while offset < frames {
            let n = block_size.min(frames - offset);

            for ch in 0..channels {
                let plane = buffer
                    .channel(ch)
                    .ok_or_else(|| PluginError::ProcessingError("missing channel plane".into()))?;
                self.scratch[ch][..n].copy_from_slice(&plane[offset..offset + n]);
            }

            let input_slices: Vec<&[f32]> =
                self.scratch.iter().map(|v| &v[..n]).collect();

            let mut output_slices: Vec<&mut [f32]> = buffer
                .planes_mut()
                .iter_mut()
                .map(|p| &mut p[offset..offset + n])
                .collect();

            self.inner
                .as_mut()
                .ok_or_else(|| PluginError::ProcessingError("effect already released".into()))?
                .process(&input_slices, &mut output_slices, n)
                .map_err(PluginError::ProcessingError)?;

            offset += n;
        }

        Ok(())
    }

    fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    fn parameter_info(&self, index: usize) -> Option<ParameterInfo> {
        self.parameters.get(index).cloned()
    }

    fn release(&mut self) {
        if let Some(mut inner) = self.inner.take() {
            if let Err(e) = inner.reset() {
                log::debug!("{}: reset on release failed: {}", self.descriptor.name, e);
            }
            log::debug!("Released {}", self.descriptor.name);
        }
        self.prepared = false;
    }
}
