//! Scene settings snapshots.
//!
//! A pointer to a scene cannot be exported inline, but whatever points at it
//! (a render-layers node, say) depends on the scene's render engine and view
//! layers. Export records those settings next to the external reference, and
//! import refuses to bind the reference to a scene whose settings differ.

use std::collections::BTreeMap;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{CodecResult, HostError};
use crate::host::{Host, PropertyKind};
use crate::vocab;

pub const ENGINE_WORKBENCH: &str = "WORKBENCH";
pub const ENGINE_EEVEE: &str = "EEVEE";
pub const ENGINE_CYCLES: &str = "CYCLES";

/// Flags every engine cares about.
const BASE_FLAGS: &[&str] = &["use_pass_combined", "use_pass_z", "use_pass_grease_pencil"];

/// Recorded settings of one view layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewLayerInfo {
    pub name: String,
    /// Every boolean property of the view layer.
    pub flags: BTreeMap<String, bool>,
    pub pass_cryptomatte_depth: i64,
    /// Boolean properties of the layer's Cycles settings.
    #[serde(default)]
    pub cycles: BTreeMap<String, bool>,
    #[serde(default)]
    pub aovs: usize,
    #[serde(default)]
    pub lightgroups: usize,
}

/// Recorded settings of a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneInfo {
    pub engine: String,
    pub view_layers: Vec<ViewLayerInfo>,
}

/// Why a scene does not match its recorded settings.
#[derive(Debug, Error, Diagnostic)]
pub enum SceneValidationError {
    #[error("render engine is {actual}, expected {expected}")]
    #[diagnostic(code(graphclip::scene::engine))]
    EngineMismatch { expected: String, actual: String },

    #[error("unknown render engine {engine}")]
    #[diagnostic(code(graphclip::scene::unknown_engine))]
    UnknownEngine { engine: String },

    #[error("missing view layer {name}")]
    #[diagnostic(code(graphclip::scene::missing_view_layer))]
    MissingViewLayer { name: String },

    #[error("view layer {view_layer}: {setting} differs")]
    #[diagnostic(code(graphclip::scene::setting))]
    SettingMismatch { view_layer: String, setting: String },

    #[error("could not read scene settings")]
    #[diagnostic(code(graphclip::scene::host))]
    Host(#[from] HostError),
}

/// How much of a view layer an engine depends on. Each level includes the
/// ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Coverage {
    Base,
    Eevee,
    Cycles,
}

/// Snapshot the settings of `scene`.
pub fn export_scene_info<H: Host>(host: &H, scene: &H::Handle) -> CodecResult<SceneInfo> {
    Ok(read_scene(host, scene)?)
}

fn read_flags<H: Host>(host: &H, object: &H::Handle) -> Result<BTreeMap<String, bool>, HostError> {
    let mut flags = BTreeMap::new();
    for prop in host.properties(object)? {
        if prop.kind == PropertyKind::Boolean && !prop.is_array() {
            let value = host.get_scalar(object, &prop.identifier)?;
            flags.insert(prop.identifier, value.as_bool().unwrap_or(false));
        }
    }
    Ok(flags)
}

/// Length of the collection `identifier`, zero where the host has none.
fn count<H: Host>(host: &H, object: &H::Handle, identifier: &str) -> Result<usize, HostError> {
    if !host.has_property(object, identifier)? {
        return Ok(0);
    }
    host.collection_len(&host.get_collection(object, identifier)?)
}

fn read_layer<H: Host>(host: &H, layer: &H::Handle) -> Result<ViewLayerInfo, HostError> {
    let cycles = if host.has_property(layer, vocab::CYCLES)? {
        match host.get_pointer(layer, vocab::CYCLES)? {
            Some(settings) => read_flags(host, &settings)?,
            None => BTreeMap::new(),
        }
    } else {
        BTreeMap::new()
    };
    Ok(ViewLayerInfo {
        name: host.display_name(layer)?,
        flags: read_flags(host, layer)?,
        pass_cryptomatte_depth: host
            .get_scalar(layer, vocab::PASS_CRYPTOMATTE_DEPTH)?
            .as_i64()
            .unwrap_or_default(),
        cycles,
        aovs: count(host, layer, vocab::AOVS_PROP)?,
        lightgroups: count(host, layer, vocab::LIGHTGROUPS_PROP)?,
    })
}

fn read_scene<H: Host>(host: &H, scene: &H::Handle) -> Result<SceneInfo, HostError> {
    let render = host
        .get_pointer(scene, vocab::RENDER)?
        .ok_or_else(|| HostError::NotFound {
            what: "scene render settings".into(),
        })?;
    let engine = host
        .get_scalar(&render, vocab::ENGINE)?
        .as_str()
        .unwrap_or_default()
        .to_string();

    let layers = host.get_collection(scene, vocab::VIEW_LAYERS_PROP)?;
    let view_layers = (0..host.collection_len(&layers)?)
        .map(|i| read_layer(host, &host.element(&layers, i)?))
        .collect::<Result<Vec<_>, HostError>>()?;

    Ok(SceneInfo {
        engine,
        view_layers,
    })
}

/// Check that `scene` matches the recorded settings.
///
/// Every recorded view layer must exist in `scene` under the same name;
/// layers only `scene` has are ignored. How much of each layer is compared
/// depends on the engine: every engine compares the combined, depth and
/// grease pencil passes, Eevee adds the cryptomatte depth, every other flag
/// and the AOV count, Cycles adds its own layer settings and the light
/// group count.
pub fn verify_scene<H: Host>(
    host: &H,
    expected: &SceneInfo,
    scene: &H::Handle,
) -> Result<(), SceneValidationError> {
    let actual = read_scene(host, scene)?;
    if actual.engine != expected.engine {
        return Err(SceneValidationError::EngineMismatch {
            expected: expected.engine.clone(),
            actual: actual.engine,
        });
    }
    let coverage = match expected.engine.as_str() {
        ENGINE_WORKBENCH => Coverage::Base,
        ENGINE_EEVEE => Coverage::Eevee,
        ENGINE_CYCLES => Coverage::Cycles,
        other => {
            return Err(SceneValidationError::UnknownEngine {
                engine: other.to_string(),
            });
        }
    };

    for want in &expected.view_layers {
        let have = actual
            .view_layers
            .iter()
            .find(|layer| layer.name == want.name)
            .ok_or_else(|| SceneValidationError::MissingViewLayer {
                name: want.name.clone(),
            })?;
        compare_layer(want, have, coverage)?;
    }
    Ok(())
}

fn compare_layer(
    want: &ViewLayerInfo,
    have: &ViewLayerInfo,
    coverage: Coverage,
) -> Result<(), SceneValidationError> {
    let mismatch = |setting: &str| SceneValidationError::SettingMismatch {
        view_layer: want.name.clone(),
        setting: setting.to_string(),
    };

    for flag in BASE_FLAGS {
        if want.flags.get(*flag) != have.flags.get(*flag) {
            return Err(mismatch(flag));
        }
    }
    if coverage == Coverage::Base {
        return Ok(());
    }

    if want.pass_cryptomatte_depth != have.pass_cryptomatte_depth {
        return Err(mismatch(vocab::PASS_CRYPTOMATTE_DEPTH));
    }
    if let Some(flag) = want.flags.keys().find(|f| want.flags.get(*f) != have.flags.get(*f)) {
        return Err(mismatch(flag));
    }
    if want.aovs != have.aovs {
        return Err(mismatch(vocab::AOVS_PROP));
    }
    if coverage == Coverage::Eevee {
        return Ok(());
    }

    if let Some(flag) = want.cycles.keys().find(|f| want.cycles.get(*f) != have.cycles.get(*f)) {
        return Err(mismatch(&format!("{}.{flag}", vocab::CYCLES)));
    }
    if want.lightgroups != have.lightgroups {
        return Err(mismatch(vocab::LIGHTGROUPS_PROP));
    }
    Ok(())
}
