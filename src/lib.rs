// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # graphclip
//!
//! A reflective subgraph codec: export part of a live object graph (node
//! trees, their nodes, sockets, links and everything they own) into a
//! portable document, then rebuild an equivalent subgraph in another
//! session, re-binding references to objects that were left outside.
//!
//! ## Architecture
//!
//! - **Host model** (`host`): the reflection API a host implements; the codec
//!   only ever talks to objects through it
//! - **Exporter** (`export`): depth-first walk with deferred pointers,
//!   resolved into ids or external references once every tree is done
//! - **Importer** (`import`): getter-based reconstruction with phased
//!   deferred actions for ordering constraints
//! - **Dispatch** (`dispatch`): per-type override handlers, resolved along the
//!   host's single-inheritance chain
//! - **Envelope** (`document`): versioned JSON, optionally gzip + base64
//! - **Reference host** (`mem`): an in-memory node-graph host
//!
//! ## Library usage
//!
//! ```no_run
//! use graphclip::export::{ExportParameters, ExportSession};
//! use graphclip::handlers::{export_registry, import_registry};
//! use graphclip::import::{ImportParameters, ImportSession};
//! use graphclip::mem::{MemHost, sample};
//!
//! let (host, _) = sample::showcase().unwrap();
//! let mut export = ExportSession::new(
//!     &host,
//!     ExportParameters::tree(sample::MAIN_TREE),
//!     export_registry().unwrap(),
//! )
//! .unwrap();
//! export.run().unwrap();
//! let text = export.export_to_string().unwrap();
//!
//! let mut target = MemHost::new();
//! let mut import = ImportSession::from_text(
//!     &mut target,
//!     &text,
//!     import_registry().unwrap(),
//!     ImportParameters::default(),
//! )
//! .unwrap();
//! let report = import.run().unwrap();
//! println!("{} nodes imported", report.imported_nodes);
//! ```

pub mod config;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod export;
pub mod handlers;
pub mod host;
pub mod identity;
pub mod import;
pub mod mem;
pub mod path;
pub mod scene;
pub mod vocab;
