//! Rich diagnostic error types for the graphclip codec.
//!
//! Each failure domain has its own error type with miette `#[diagnostic]` derives,
//! giving error codes, help text, and the path trail of the object that failed so
//! users can tell which part of their graph broke the export or import.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::scene::SceneValidationError;

/// Top-level error type for the codec.
///
/// Each variant wraps a domain-specific error, preserving the full diagnostic
/// chain (error codes, help text, sources) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum CodecError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

/// Misconfiguration of a handler registry. Raised before any traversal starts.
#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error("a handler for \"{type_name}\" is already registered")]
    #[diagnostic(
        code(graphclip::registry::clobbering),
        help("Each host type may have at most one export and one import handler.")
    )]
    Clobbering { type_name: String },

    #[error("handler registered without an assumed type")]
    #[diagnostic(
        code(graphclip::registry::missing_type),
        help("Set the handler's ASSUMED_TYPE to the host type name it understands.")
    )]
    MissingTypeParameter,

    #[error("handler registered for \"{type_name}\", which the host schema does not define")]
    #[diagnostic(
        code(graphclip::registry::unknown_type),
        help("Check the spelling of the type name against the host schema.")
    )]
    UnknownType { type_name: String },

    #[error("type \"{type_name}\" has {count} base types; dispatch needs a single chain")]
    #[diagnostic(
        code(graphclip::registry::multiple_inheritance),
        help("Register a handler for \"{type_name}\" itself so dispatch does not walk its bases.")
    )]
    MultipleInheritance { type_name: String, count: usize },
}

// ---------------------------------------------------------------------------
// Structural errors
// ---------------------------------------------------------------------------

/// Traversal invariants violated while exporting or importing a graph.
///
/// Every variant carries the path trail of the object being processed.
#[derive(Debug, Error, Diagnostic)]
pub enum StructuralError {
    #[error("object serialized twice at {path}")]
    #[diagnostic(
        code(graphclip::structural::double_serialization),
        help(
            "An object was reached along two inlining paths. One of them should \
             be exported as a reference instead."
        )
    )]
    DoubleSerialization { path: String },

    #[error("id {id} registered twice at {path}")]
    #[diagnostic(
        code(graphclip::structural::double_deserialization),
        help("The document contains two nodes with the same id; it was likely edited by hand.")
    )]
    DoubleDeserialization { id: u64, path: String },

    #[error("missing property \"{identifier}\" in serialization at {path}")]
    #[diagnostic(
        code(graphclip::structural::missing_field),
        help("The document was produced by an exporter that did not know this property.")
    )]
    MissingField { identifier: String, path: String },

    #[error("specific handler needed at {path}: {reason}")]
    #[diagnostic(
        code(graphclip::structural::handler_needed),
        help("Register a specific handler for this type; the generic walk cannot handle it.")
    )]
    HandlerNeeded { reason: String, path: String },

    #[error("expected {expected} elements but the host has {actual} at {path}")]
    #[diagnostic(
        code(graphclip::structural::element_count),
        help(
            "The host builds this collection itself. A mismatch usually means the \
             owning object was configured differently than in the source graph."
        )
    )]
    ElementCountMismatch {
        expected: usize,
        actual: usize,
        path: String,
    },

    #[error("id {id} not deserialized or provided yet at {path}")]
    #[diagnostic(
        code(graphclip::structural::not_deserialized),
        help(
            "A reference points at an object that does not exist yet. Check the \
             order in which handlers import references."
        )
    )]
    NotDeserializedYet { id: u64, path: String },

    #[error("could not pair {path} with \"{partner}\"")]
    #[diagnostic(
        code(graphclip::structural::broken_pairing),
        help("The partner object is missing or of the wrong type.")
    )]
    BrokenPairing { partner: String, path: String },

    #[error("malformed field at {path}: expected {expected}")]
    #[diagnostic(
        code(graphclip::structural::malformed_field),
        help("The document does not match the shape this property needs.")
    )]
    MalformedField { expected: String, path: String },

    #[error("global object {key} vanished during traversal")]
    #[diagnostic(
        code(graphclip::structural::object_vanished),
        help("Do not rename or delete objects while an export or import session is running.")
    )]
    ObjectVanished { key: String },

    #[error("cannot reference {path} from outside the exported trees")]
    #[diagnostic(
        code(graphclip::structural::not_externalizable),
        help(
            "Only globally registered objects can become external references. \
             Export the owning object inline instead."
        )
    )]
    NotExternalizable { path: String },

    #[error("field \"{identifier}\" written twice at {path}")]
    #[diagnostic(
        code(graphclip::structural::field_clobbered),
        help("A specific handler and the generic walk both produced this field.")
    )]
    FieldClobbered { identifier: String, path: String },

    #[error("read-only pointer given as a reference at {path}")]
    #[diagnostic(
        code(graphclip::structural::readonly_pointer),
        help("Read-only pointers must be exported inline, never as references.")
    )]
    ReadonlyPointerDeferred { path: String },

    #[error("unexpected null at {path}")]
    #[diagnostic(
        code(graphclip::structural::unexpected_null),
        help("The host object is empty where the document describes content.")
    )]
    UnexpectedNull { path: String },

    #[error("read-only pointer at {path} is set but the document says null")]
    #[diagnostic(
        code(graphclip::structural::unexpected_pointer),
        help("The host filled in a pointer the source graph left empty.")
    )]
    UnexpectedPointer { path: String },

    #[error("tree \"{name}\" reached twice while collecting sub-trees at {path}")]
    #[diagnostic(
        code(graphclip::structural::duplicate_root),
        help("Trees that contain themselves through groups cannot be exported.")
    )]
    DuplicateRootTree { name: String, path: String },

    #[error("root object {key} not found")]
    #[diagnostic(
        code(graphclip::structural::root_not_found),
        help("Check the tree or material name passed to the exporter.")
    )]
    RootNotFound { key: String },
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// User-supplied external resolutions that do not fit the document.
#[derive(Debug, Error, Diagnostic)]
pub enum ValidationError {
    #[error("scene given for external {external_id} does not match its recorded settings")]
    #[diagnostic(
        code(graphclip::validation::external_scene),
        help("Pick a scene with the same render engine and view layers, or skip this reference.")
    )]
    ExternalScene {
        external_id: u64,
        #[source]
        #[diagnostic_source]
        source: SceneValidationError,
    },

    #[error("external {external_id} needs a {expected}, got a {actual}")]
    #[diagnostic(
        code(graphclip::validation::type_mismatch),
        help("Resolve each external reference to an object of its recorded type.")
    )]
    ExternalTypeMismatch {
        external_id: u64,
        expected: String,
        actual: String,
    },

    #[error("external {external_id} ({description}) was not resolved")]
    #[diagnostic(
        code(graphclip::validation::unresolved),
        help("Resolve it to a live object, or skip it explicitly to leave the reference empty.")
    )]
    UnresolvedExternal {
        external_id: u64,
        description: String,
    },

    #[error("external {external_id} resolved twice")]
    #[diagnostic(
        code(graphclip::validation::duplicate),
        help("Each external reference is resolved exactly once per import session.")
    )]
    DuplicateExternal { external_id: u64 },

    #[error("external {external_id} resolves to an object without a global name")]
    #[diagnostic(
        code(graphclip::validation::not_global),
        help("External references can only point at globally registered objects.")
    )]
    NotGlobal { external_id: u64 },
}

// ---------------------------------------------------------------------------
// Envelope errors
// ---------------------------------------------------------------------------

/// Problems with the document envelope or the export/import session lifecycle.
#[derive(Debug, Error, Diagnostic)]
pub enum EnvelopeError {
    #[error("document was written by host version {found}, this host is {expected}")]
    #[diagnostic(
        code(graphclip::envelope::host_version),
        help("Documents can only be imported into the exact host version that produced them.")
    )]
    HostVersionMismatch { expected: String, found: String },

    #[error("document format {found} is not readable by format {expected}")]
    #[diagnostic(
        code(graphclip::envelope::format_version),
        help(
            "The major version must match and the document's minor version must not \
             be newer than this build's. Upgrade graphclip to read it."
        )
    )]
    FormatVersionMismatch { expected: String, found: String },

    #[error("malformed version string \"{version}\"")]
    #[diagnostic(
        code(graphclip::envelope::malformed_version),
        help("Versions are three dot-separated integers, like 0.1.5.")
    )]
    MalformedVersion { version: String },

    #[error("document contains no trees")]
    #[diagnostic(
        code(graphclip::envelope::no_trees),
        help("Nothing to import. Check that the right document was loaded.")
    )]
    NoTrees,

    #[error("document is not valid JSON")]
    #[diagnostic(
        code(graphclip::envelope::json),
        help("The document may be truncated or not a graphclip export.")
    )]
    Json(#[from] serde_json::Error),

    #[error("failed to access {path}")]
    #[diagnostic(
        code(graphclip::envelope::io),
        help("Ensure the file exists and you have permission to read or write it.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("compressed document is not valid base64")]
    #[diagnostic(
        code(graphclip::envelope::decode),
        help("The text after the marker was altered or truncated while copying.")
    )]
    Decode(#[from] base64::DecodeError),

    #[error("compressed document could not be inflated")]
    #[diagnostic(
        code(graphclip::envelope::decompress),
        help("The payload is not gzip data or was truncated.")
    )]
    Decompress(#[source] std::io::Error),

    #[error("export session has not finished")]
    #[diagnostic(
        code(graphclip::envelope::export_not_finished),
        help("Call `step()` until it returns false before building the document.")
    )]
    ExportNotFinished,

    #[error("import session stopped after a failed tree")]
    #[diagnostic(
        code(graphclip::envelope::import_failed),
        help("Start a new session; the host may hold a partially imported tree.")
    )]
    ImportFailed,

    #[error("no external reference with id {external_id}")]
    #[diagnostic(
        code(graphclip::envelope::unknown_external),
        help("List the session's externals to see which ids exist.")
    )]
    UnknownExternal { external_id: u64 },
}

// ---------------------------------------------------------------------------
// Host errors
// ---------------------------------------------------------------------------

/// Failures reported by a [`Host`](crate::host::Host) implementation.
#[derive(Debug, Error, Diagnostic)]
pub enum HostError {
    #[error("object not found: {what}")]
    #[diagnostic(
        code(graphclip::host::not_found),
        help("The handle is stale or the object was deleted.")
    )]
    NotFound { what: String },

    #[error("type \"{type_name}\" has no property \"{identifier}\"")]
    #[diagnostic(
        code(graphclip::host::no_such_property),
        help("Check the property identifier against the host schema.")
    )]
    NoSuchProperty {
        type_name: String,
        identifier: String,
    },

    #[error("property \"{identifier}\" is not a {expected}")]
    #[diagnostic(
        code(graphclip::host::wrong_kind),
        help("Use the accessor that matches the property's kind.")
    )]
    WrongKind {
        identifier: String,
        expected: &'static str,
    },

    #[error("invalid value for \"{identifier}\": {message}")]
    #[diagnostic(
        code(graphclip::host::invalid_value),
        help("The host refused the value; check its type, length and range.")
    )]
    InvalidValue { identifier: String, message: String },

    #[error("host rejected {operation}: {message}")]
    #[diagnostic(
        code(graphclip::host::rejected),
        help("The host's own rules forbid this operation in the object's current state.")
    )]
    Rejected { operation: String, message: String },
}

/// Convenience alias for codec results.
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Convenience alias for host-level results.
pub type HostResult<T> = std::result::Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_error_converts_to_codec_error() {
        let err: CodecError = StructuralError::DoubleSerialization {
            path: "Tree (Main) -> Node (Math)".into(),
        }
        .into();
        assert!(matches!(err, CodecError::Structural(_)));
        assert!(err.to_string().contains("Tree (Main)"));
    }

    #[test]
    fn diagnostic_codes_are_namespaced() {
        let err = EnvelopeError::NoTrees;
        let code = err.code().map(|c| c.to_string()).unwrap_or_default();
        assert_eq!(code, "graphclip::envelope::no_trees");
    }

    #[test]
    fn transparent_wrapper_keeps_inner_code() {
        let err: CodecError = RegistryError::Clobbering {
            type_name: "Node".into(),
        }
        .into();
        let code = err.code().map(|c| c.to_string()).unwrap_or_default();
        assert_eq!(code, "graphclip::registry::clobbering");
    }
}
