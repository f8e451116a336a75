//! Human-readable trail from the root of a traversal to the current object.
//!
//! Trails appear in log lines, error messages and, optionally, in the
//! `debug_path` field of exported nodes.

use std::fmt;

use crate::host::PropertyInfo;

/// Immutable, append-only sequence of path pieces.
///
/// Extending a trail returns a new trail, so a caller's trail is never
/// affected by what a callee appends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathTrail {
    pieces: Vec<String>,
}

impl PathTrail {
    pub fn root(piece: impl Into<String>) -> Self {
        Self {
            pieces: vec![piece.into()],
        }
    }

    pub fn add(&self, piece: impl Into<String>) -> Self {
        let mut pieces = self.pieces.clone();
        pieces.push(piece.into());
        Self { pieces }
    }

    /// Append a piece describing a property, e.g. `POINTER (parent)`.
    pub fn add_prop(&self, prop: &PropertyInfo) -> Self {
        self.add(format!("{} ({})", prop.kind.label(), prop.identifier))
    }

    pub fn pieces(&self) -> &[String] {
        &self.pieces
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}

impl fmt::Display for PathTrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pieces.join(" -> "))
    }
}
