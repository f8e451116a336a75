//! The document envelope: versioning, external references and wire format.
//!
//! A document is a JSON object:
//!
//! ```json
//! {
//!   "host_version": "4.5.0",
//!   "format_version": "0.1.5",
//!   "material_name": "Shiny",
//!   "trees": [ { "id": 0, "data": { ... } } ],
//!   "external": { "7": { "description": null, "fixed_type_name": "Image", "scene_id": null } },
//!   "scenes": { "6": { "engine": "EEVEE", "view_layers": [ ... ] } }
//! }
//! ```
//!
//! Every exported object is a node `{ "id": n, "data": { ... } }`, optionally
//! with a `debug_path`. Collection nodes carry their elements under
//! `data.items`. References are plain integer ids.
//!
//! The compressed form is the marker [`MAGIC`] followed by base64 of the
//! gzip-compressed JSON.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use base64::Engine;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EnvelopeError;
use crate::scene::SceneInfo;

/// Marker that prefixes the compressed text form.
pub const MAGIC: &str = "GraphClip::";

/// Version of the document format this build writes.
pub const FORMAT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Key of a node's id.
pub const ID: &str = "id";
/// Key of a node's field map.
pub const DATA: &str = "data";
/// Key of a node's optional path trail.
pub const DEBUG_PATH: &str = "debug_path";
/// Key of a collection node's element list, inside `data`.
pub const ITEMS: &str = "items";

pub type EnvelopeResult<T> = std::result::Result<T, EnvelopeError>;

/// A reference the document makes to an object outside its trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalEntry {
    /// Free text shown to whoever resolves the reference on import. An entry
    /// without description may be left unresolved.
    pub description: Option<String>,
    /// Type the resolved object must be an instance of.
    pub fixed_type_name: String,
    /// Key into [`Document::scenes`] when the target is a scene.
    pub scene_id: Option<u64>,
}

/// A complete exported document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub host_version: String,
    pub format_version: String,
    /// Set when the last tree is the embedded tree of a material.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_name: Option<String>,
    /// Exported trees; sub-trees come before the trees that use them.
    pub trees: Vec<Value>,
    #[serde(default)]
    pub external: BTreeMap<u64, ExternalEntry>,
    #[serde(default)]
    pub scenes: BTreeMap<u64, SceneInfo>,
}

impl Document {
    /// Check that this document can be imported by a host running
    /// `host_version`, using this build's format version.
    pub fn check_version(&self, host_version: &str) -> EnvelopeResult<()> {
        check_compatibility(
            &self.host_version,
            &self.format_version,
            host_version,
            FORMAT_VERSION,
        )
    }

    /// Plain JSON text. `indent` of zero writes a single line.
    pub fn to_json(&self, indent: usize) -> EnvelopeResult<String> {
        if indent == 0 {
            return Ok(serde_json::to_string(self)?);
        }
        let indent = " ".repeat(indent);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut out = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)?;
        // serde_json only writes UTF-8.
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Compressed text form: [`MAGIC`] + base64(gzip(json)).
    pub fn to_compressed(&self) -> EnvelopeResult<String> {
        let json = serde_json::to_vec(self)?;
        let gz_err = |e| EnvelopeError::Io {
            path: "<gzip stream>".into(),
            source: e,
        };
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json).map_err(gz_err)?;
        let gz = encoder.finish().map_err(gz_err)?;
        let b64 = base64::engine::general_purpose::STANDARD.encode(gz);
        Ok(format!("{MAGIC}{b64}"))
    }

    /// Parse either text form.
    pub fn parse(text: &str) -> EnvelopeResult<Self> {
        match text.strip_prefix(MAGIC) {
            Some(payload) => {
                let gz = base64::engine::general_purpose::STANDARD.decode(payload.trim())?;
                let mut json = String::new();
                GzDecoder::new(gz.as_slice())
                    .read_to_string(&mut json)
                    .map_err(EnvelopeError::Decompress)?;
                Ok(serde_json::from_str(&json)?)
            }
            None => Ok(serde_json::from_str(text)?),
        }
    }

    /// Write to `path`, compressed or as JSON with `indent`.
    pub fn write_to_file(&self, path: &Path, compress: bool, indent: usize) -> EnvelopeResult<()> {
        let text = if compress {
            self.to_compressed()?
        } else {
            self.to_json(indent)?
        };
        std::fs::write(path, text).map_err(|e| EnvelopeError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Read a document from `path`, detecting the compressed form by its
    /// leading marker.
    pub fn read_from_file(path: &Path) -> EnvelopeResult<Self> {
        let io_err = |e| EnvelopeError::Io {
            path: path.display().to_string(),
            source: e,
        };
        let file = File::open(path).map_err(io_err)?;
        let mut reader = BufReader::new(file);
        let mut head = Vec::with_capacity(MAGIC.len());
        reader
            .by_ref()
            .take(MAGIC.len() as u64)
            .read_to_end(&mut head)
            .map_err(io_err)?;

        if head == MAGIC.as_bytes() {
            let mut rest = String::new();
            reader.read_to_string(&mut rest).map_err(io_err)?;
            Self::parse(&format!("{MAGIC}{rest}"))
        } else {
            Ok(serde_json::from_reader(head.as_slice().chain(reader))?)
        }
    }
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

/// A `major.minor.patch` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FormatVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl std::str::FromStr for FormatVersion {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || EnvelopeError::MalformedVersion {
            version: s.to_string(),
        };
        let parts: Vec<u32> = s
            .split('.')
            .map(|p| p.parse::<u32>().map_err(|_| malformed()))
            .collect::<Result<_, _>>()?;
        match parts.as_slice() {
            [major, minor, patch] => Ok(Self {
                major: *major,
                minor: *minor,
                patch: *patch,
            }),
            _ => Err(malformed()),
        }
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Host versions must match exactly. Format versions must share the major
/// component, and the document's minor component must not exceed ours.
pub fn check_compatibility(
    doc_host: &str,
    doc_format: &str,
    running_host: &str,
    running_format: &str,
) -> EnvelopeResult<()> {
    if doc_host != running_host {
        return Err(EnvelopeError::HostVersionMismatch {
            expected: running_host.to_string(),
            found: doc_host.to_string(),
        });
    }
    let ours: FormatVersion = running_format.parse()?;
    let theirs: FormatVersion = doc_format.parse()?;
    if ours.major != theirs.major || theirs.minor > ours.minor {
        return Err(EnvelopeError::FormatVersionMismatch {
            expected: ours.to_string(),
            found: theirs.to_string(),
        });
    }
    Ok(())
}
