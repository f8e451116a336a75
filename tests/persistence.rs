//! File round-trip tests for documents and codec settings.
//!
//! These tests verify that documents survive being written to disk in both
//! text forms, and that a session can import straight from a file.

use graphclip::config::CodecConfig;
use graphclip::document::{Document, MAGIC};
use graphclip::export::{ExportParameters, ExportSession};
use graphclip::handlers::{export_registry, import_registry};
use graphclip::import::{ImportParameters, ImportSession};
use graphclip::mem::{MemHost, sample};

fn export_document(host: &MemHost, config: CodecConfig) -> Document {
    let mut session = ExportSession::new(
        host,
        ExportParameters::tree(sample::MAIN_TREE).with_config(config),
        export_registry().unwrap(),
    )
    .unwrap();
    session.run().unwrap();
    session.document().unwrap()
}

#[test]
fn plain_document_survives_file_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("main.json");
    let (host, _) = sample::showcase().unwrap();
    let document = export_document(&host, CodecConfig::default());

    document.write_to_file(&path, false, 2).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with('{'));
    assert!(text.contains("\n  \""));

    let read = Document::read_from_file(&path).unwrap();
    assert_eq!(read, document);
}

#[test]
fn compressed_document_survives_file_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("main.clip");
    let (host, _) = sample::showcase().unwrap();
    let document = export_document(&host, CodecConfig::default());

    document.write_to_file(&path, true, 0).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with(MAGIC));
    assert!(!text.contains('{'));

    let read = Document::read_from_file(&path).unwrap();
    assert_eq!(read, document);
}

#[test]
fn session_writes_in_configured_form() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("configured.clip");
    let (host, _) = sample::showcase().unwrap();
    let config = CodecConfig {
        compress: true,
        ..Default::default()
    };

    let mut session = ExportSession::new(
        &host,
        ExportParameters::tree(sample::MAIN_TREE).with_config(config),
        export_registry().unwrap(),
    )
    .unwrap();
    session.run().unwrap();
    session.export_to_file(&path).unwrap();
    assert!(std::fs::read_to_string(&path).unwrap().starts_with(MAGIC));

    let mut target = MemHost::new();
    let mut import = ImportSession::from_file(
        &mut target,
        &path,
        import_registry().unwrap(),
        ImportParameters::default(),
    )
    .unwrap();
    let report = import.run().unwrap();
    assert_eq!(report.imported_trees, 2);
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let result = Document::read_from_file(&dir.path().join("absent.json"));
    assert!(result.is_err());
}

#[test]
fn config_survives_save_and_load() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("nested").join("graphclip.toml");

    let mut config = CodecConfig::default();
    config.write_debug_paths = true;
    config.json_indent = 2;
    config.forbidden_properties.insert("location".into());
    config.save(&path).unwrap();

    let loaded = CodecConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
    assert!(loaded.is_forbidden("location"));
}

#[test]
fn partial_config_falls_back_to_defaults() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("graphclip.toml");
    std::fs::write(&path, "compress = true\n").unwrap();

    let loaded = CodecConfig::load(&path).unwrap();
    assert!(loaded.compress);
    assert!(loaded.export_sub_trees);
    assert_eq!(loaded.json_indent, CodecConfig::default().json_indent);
    assert!(loaded.is_forbidden("idname"));
}
