//! Codec configuration: what to skip, what to clamp, how to write documents.
//!
//! Configuration is plain data, persisted as TOML. Every field has a default,
//! so a config file only needs to name what it changes.

use std::collections::BTreeSet;
use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vocab;

/// Errors from loading or saving configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read codec config: {path}")]
    #[diagnostic(
        code(graphclip::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse codec config: {path}")]
    #[diagnostic(
        code(graphclip::config::parse),
        help("Check the TOML syntax in the config file: {message}")
    )]
    Parse { path: String, message: String },

    #[error("failed to write codec config: {path}")]
    #[diagnostic(
        code(graphclip::config::write),
        help("Ensure you have write permissions to the target directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// A property the host reports but that must not be read on some host versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenProperty {
    /// Type (or base type) the property belongs to.
    pub type_name: String,
    pub identifier: String,
    /// Host version the property is broken on. `None` means every version.
    #[serde(default)]
    pub host_version: Option<String>,
}

/// A property whose value may legitimately sit outside its declared hard range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClampExemption {
    pub type_name: String,
    /// Only objects with this `name` are exempt.
    pub object_name: String,
    pub identifier: String,
}

/// Configuration shared by export and import sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Store the path trail of every exported node in its `debug_path` field.
    #[serde(default)]
    pub write_debug_paths: bool,
    /// Export node groups used by the root tree as separate trees.
    #[serde(default = "default_true")]
    pub export_sub_trees: bool,
    /// Write the compressed text form instead of plain JSON.
    #[serde(default)]
    pub compress: bool,
    /// Indentation of plain JSON output. Zero writes a single line.
    #[serde(default = "default_json_indent")]
    pub json_indent: usize,
    /// Simple properties that are never written nor read, whatever their owner.
    #[serde(default = "default_forbidden_properties")]
    pub forbidden_properties: BTreeSet<String>,
    #[serde(default = "default_broken_properties")]
    pub broken_properties: Vec<BrokenProperty>,
    #[serde(default = "default_clamp_exemptions")]
    pub clamp_exemptions: Vec<ClampExemption>,
}

fn default_true() -> bool {
    true
}
fn default_json_indent() -> usize {
    4
}
fn default_forbidden_properties() -> BTreeSet<String> {
    [
        vocab::IDNAME,
        "static_type",
        "label_static",
        "description_static",
        "icon",
        "width_default",
        "width_min",
        "width_max",
        "height_default",
        "height_min",
        "height_max",
        "socket_idname",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_broken_properties() -> Vec<BrokenProperty> {
    vec![BrokenProperty {
        type_name: vocab::NODE_SOCKET.into(),
        identifier: "display_shape".into(),
        host_version: Some("5.0.0".into()),
    }]
}
fn default_clamp_exemptions() -> Vec<ClampExemption> {
    vec![ClampExemption {
        type_name: vocab::NODE_SOCKET.into(),
        object_name: "Subsurface IOR".into(),
        identifier: vocab::DEFAULT_VALUE.into(),
    }]
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            write_debug_paths: false,
            export_sub_trees: default_true(),
            compress: false,
            json_indent: default_json_indent(),
            forbidden_properties: default_forbidden_properties(),
            broken_properties: default_broken_properties(),
            clamp_exemptions: default_clamp_exemptions(),
        }
    }
}

impl CodecConfig {
    pub fn is_forbidden(&self, identifier: &str) -> bool {
        self.forbidden_properties.contains(identifier)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_forbids_idname() {
        let config = CodecConfig::default();
        assert!(config.is_forbidden("idname"));
        assert!(config.is_forbidden("socket_idname"));
        assert!(!config.is_forbidden("name"));
        assert!(config.export_sub_trees);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: CodecConfig = toml::from_str("compress = true\njson_indent = 2\n").unwrap();
        assert!(config.compress);
        assert_eq!(config.json_indent, 2);
        assert_eq!(config.broken_properties, default_broken_properties());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("graphclip.toml");
        let config = CodecConfig {
            write_debug_paths: true,
            ..Default::default()
        };
        config.save(&path).unwrap();
        let loaded = CodecConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = CodecConfig::load(Path::new("/nonexistent/graphclip.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
