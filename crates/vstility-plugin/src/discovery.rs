//! Effect discovery and instantiation.
//!
//! A "bundle" is whatever the user pointed `--vst3` at:
//! - a `.vst3` path on disk, scanned through `rack`
//! - a `builtin:` pseudo-path naming one of the builtin effects
//!
//! Discovery enumerates the descriptors a bundle exposes; instantiation
//! turns one descriptor into a live [`EffectProcessor`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{builtin, vst3, EffectProcessor, PluginError, PluginResult};

/// Block size hint handed to effect backends at prepare time
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Prefix selecting the builtin effect registry instead of a disk path
pub const BUILTIN_SCHEME: &str = "builtin:";

/// Effect backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectFormat {
    Vst3,
    Builtin,
}

/// One effect a bundle exposes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectDescriptor {
    /// Stable id (`vst3.<name>` or `builtin.<name>`)
    pub id: String,
    /// Display name
    pub name: String,
    pub format: EffectFormat,
    /// Bundle path (the pseudo-path for builtins)
    pub path: PathBuf,
    /// Position within the bundle's descriptor list
    pub index: usize,
}

/// Enumerate the effects a bundle exposes.
///
/// A missing on-disk bundle is an error; a bundle that scans cleanly but
/// exposes nothing returns an empty list.
pub fn discover(bundle: &Path) -> PluginResult<Vec<EffectDescriptor>> {
    let spec = bundle.to_string_lossy();
    if let Some(id) = spec.strip_prefix(BUILTIN_SCHEME) {
        return Ok(builtin::descriptors(id));
    }

    if !bundle.exists() {
        return Err(PluginError::NotFound(bundle.display().to_string()));
    }

    match bundle.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("vst3") => vst3::discover(bundle),
        _ => Err(PluginError::UnsupportedFormat(bundle.display().to_string())),
    }
}

/// Pick the descriptor to render with: the first one, with a warning
/// naming how many others the bundle also exposes.
pub fn select_first<'a>(
    descriptors: &'a [EffectDescriptor],
    bundle: &Path,
) -> PluginResult<&'a EffectDescriptor> {
    match descriptors {
        [] => Err(PluginError::NoEffectFound(bundle.display().to_string())),
        [only] => Ok(only),
        [first, rest @ ..] => {
            log::warn!(
                "Bundle {} exposes {} effects; using the first ({}) and skipping {}",
                bundle.display(),
                rest.len() + 1,
                first.name,
                rest.len()
            );
            Ok(first)
        }
    }
}

/// Create a live effect instance from a descriptor
pub fn instantiate(descriptor: &EffectDescriptor) -> PluginResult<Box<dyn EffectProcessor>> {
    match descriptor.format {
        EffectFormat::Builtin => builtin::instantiate(descriptor),
        EffectFormat::Vst3 => {
            let effect = vst3::Vst3Effect::load(descriptor)?;
            Ok(Box::new(effect))
        }
    }
}

/// Discover a bundle and instantiate its first effect
pub fn load_first(bundle: &Path) -> PluginResult<Box<dyn EffectProcessor>> {
    let descriptors = discover(bundle)?;
    let descriptor = select_first(&descriptors, bundle)?;
    log::info!("Selected effect: {} ({:?})", descriptor.name, descriptor.format);
    instantiate(descriptor)
}
