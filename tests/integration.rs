//! End-to-end tests for graphclip.
//!
//! These tests export the showcase graph from one reference host and import
//! it into another, covering external resolution, the version gate and the
//! order in which the importer mutates the target host.

use graphclip::document::Document;
use graphclip::error::{CodecError, EnvelopeError, ValidationError};
use graphclip::export::{ExportParameters, ExportSession};
use graphclip::handlers::{export_registry, import_registry};
use graphclip::host::{Args, GlobalKey, Host, Scalar};
use graphclip::identity::same_object;
use graphclip::import::{ImportParameters, ImportSession, ImportState};
use graphclip::mem::{MemHandle, MemHost, sample};
use graphclip::vocab::*;

fn export_main(host: &MemHost) -> ExportSession<'_, MemHost> {
    let mut session = ExportSession::new(
        host,
        ExportParameters::tree(sample::MAIN_TREE),
        export_registry().unwrap(),
    )
    .unwrap();
    session.run().unwrap();
    session
}

fn showcase_document() -> Document {
    let (host, _) = sample::showcase().unwrap();
    export_main(&host).document().unwrap()
}

fn external_of_type(document: &Document, fixed_type_name: &str) -> u64 {
    document
        .external
        .iter()
        .find(|(_, entry)| entry.fixed_type_name == fixed_type_name)
        .map(|(id, _)| *id)
        .unwrap()
}

fn start_import(target: &mut MemHost, document: Document) -> ImportSession<'_, MemHost> {
    ImportSession::new(
        target,
        document,
        import_registry().unwrap(),
        ImportParameters::default(),
    )
    .unwrap()
}

fn main_tree(host: &MemHost) -> MemHandle {
    host.lookup_global(&GlobalKey::new(NODE_GROUPS, sample::MAIN_TREE))
        .unwrap()
}

fn node(host: &MemHost, tree: &MemHandle, name: &str) -> MemHandle {
    host.node_by_name(tree, name).unwrap().unwrap()
}

/// A scene shaped like the showcase one: Cycles with a second view layer.
fn matching_scene(host: &mut MemHost) -> MemHandle {
    let scene = host.new_scene(sample::SCENE_NAME, "CYCLES").unwrap();
    let layers = host.get_collection(&scene, VIEW_LAYERS_PROP).unwrap();
    host.construct(&layers, &Args::new().scalar(NAME, "Shadows"))
        .unwrap();
    scene
}

#[test]
fn showcase_round_trip() {
    let (source, _) = sample::showcase().unwrap();
    let export = export_main(&source);
    let exported = export.report().clone();
    assert_eq!(exported.exported_trees, 2);
    assert_eq!(exported.exported_links, 10);

    let document = export.document().unwrap();
    assert_eq!(document.trees.len(), 2);
    assert!(document.material_name.is_none());

    let mut target = MemHost::new();
    let mut import = start_import(&mut target, document);
    assert_eq!(import.total_steps(), 2);
    let report = import.run().unwrap().clone();
    assert_eq!(import.state(), ImportState::Finished);
    assert_eq!(import.progress(), 2);
    drop(import);

    assert_eq!(report.imported_trees, 2);
    assert_eq!(report.imported_links, 10);
    assert!(report.renamed.is_empty());
    assert_eq!(
        target.global_names(NODE_GROUPS),
        [sample::SUB_TREE, sample::MAIN_TREE]
    );

    let main = main_tree(&target);
    let nodes = target.get_collection(&main, NODES_PROP).unwrap();
    assert_eq!(target.collection_len(&nodes).unwrap(), 14);
    assert_eq!(
        target.get_scalar(&main, DESCRIPTION).unwrap(),
        Scalar::from("Everything at once")
    );

    let group = node(&target, &main, "Group");
    let sub = target.get_pointer(&group, NODE_TREE_PROP).unwrap().unwrap();
    assert_eq!(target.display_name(&sub).unwrap(), sample::SUB_TREE);
}

#[test]
fn importing_twice_renames_the_second_copy() {
    let mut target = MemHost::new();
    start_import(&mut target, showcase_document()).run().unwrap();

    let mut import = start_import(&mut target, showcase_document());
    let report = import.run().unwrap().clone();
    drop(import);

    assert_eq!(report.renamed.get(sample::MAIN_TREE).unwrap(), "Main.001");
    assert_eq!(report.renamed.get(sample::SUB_TREE).unwrap(), "Sub.001");

    // The copy's group node uses the copied sub tree, not the first one.
    let copy = target
        .lookup_global(&GlobalKey::new(NODE_GROUPS, "Main.001"))
        .unwrap();
    let group = node(&target, &copy, "Group");
    let sub = target.get_pointer(&group, NODE_TREE_PROP).unwrap().unwrap();
    assert_eq!(target.display_name(&sub).unwrap(), "Sub.001");
}

#[test]
fn externals_are_bound_to_target_objects() {
    let document = showcase_document();
    let material_id = external_of_type(&document, MATERIAL);
    let scene_id = external_of_type(&document, SCENE);
    assert!(document.external[&scene_id].scene_id.is_some());
    assert!(document.external[&material_id].scene_id.is_none());

    let mut target = MemHost::new();
    let material = target.new_material(sample::MATERIAL_NAME).unwrap();
    let scene = matching_scene(&mut target);

    let mut import = start_import(&mut target, document);
    import
        .set_external(vec![
            (material_id, Some(material.clone())),
            (scene_id, Some(scene.clone())),
        ])
        .unwrap();
    import.run().unwrap();
    drop(import);

    let main = main_tree(&target);
    let set_material = node(&target, &main, "SetMaterial");
    let socket = target.input(&set_material, 1).unwrap();
    let bound = target.get_pointer(&socket, DEFAULT_VALUE).unwrap().unwrap();
    assert!(same_object(&target, &bound, &material).unwrap());

    let render_layers = node(&target, &main, "RenderLayers");
    let bound = target
        .get_pointer(&render_layers, SCENE_PROP)
        .unwrap()
        .unwrap();
    assert!(same_object(&target, &bound, &scene).unwrap());
    assert_eq!(
        target.get_scalar(&render_layers, LAYER).unwrap(),
        Scalar::from("Shadows")
    );
}

#[test]
fn unresolved_externals_stay_empty() {
    let mut target = MemHost::new();
    start_import(&mut target, showcase_document()).run().unwrap();

    let main = main_tree(&target);
    let set_material = node(&target, &main, "SetMaterial");
    let socket = target.input(&set_material, 1).unwrap();
    assert!(target.get_pointer(&socket, DEFAULT_VALUE).unwrap().is_none());
}

#[test]
fn scene_with_other_view_layers_is_refused() {
    let document = showcase_document();
    let scene_id = external_of_type(&document, SCENE);

    let mut target = MemHost::new();
    let scene = target.new_scene(sample::SCENE_NAME, "CYCLES").unwrap();
    let mut import = start_import(&mut target, document);
    let err = import.set_external(vec![(scene_id, Some(scene))]).unwrap_err();
    assert!(matches!(
        err,
        CodecError::Validation(ValidationError::ExternalScene { .. })
    ));
}

#[test]
fn scene_with_extra_view_layers_is_accepted() {
    let document = showcase_document();
    let scene_id = external_of_type(&document, SCENE);

    let mut target = MemHost::new();
    let scene = matching_scene(&mut target);
    let layers = target.get_collection(&scene, VIEW_LAYERS_PROP).unwrap();
    target
        .construct(&layers, &Args::new().scalar(NAME, "Extra"))
        .unwrap();
    let mut import = start_import(&mut target, document);
    import.set_external(vec![(scene_id, Some(scene))]).unwrap();
    import.run().unwrap();
}

#[test]
fn external_of_the_wrong_type_is_refused() {
    let document = showcase_document();
    let material_id = external_of_type(&document, MATERIAL);

    let mut target = MemHost::new();
    let image = target.new_image("Decoy").unwrap();
    let mut import = start_import(&mut target, document);
    let err = import.set_external(vec![(material_id, Some(image))]).unwrap_err();
    assert!(matches!(
        err,
        CodecError::Validation(ValidationError::ExternalTypeMismatch { .. })
    ));
}

#[test]
fn resolving_an_external_twice_is_refused() {
    let document = showcase_document();
    let material_id = external_of_type(&document, MATERIAL);

    let mut target = MemHost::new();
    let mut import = start_import(&mut target, document);
    import.set_external(vec![(material_id, None)]).unwrap();
    let err = import.set_external(vec![(material_id, None)]).unwrap_err();
    assert!(matches!(
        err,
        CodecError::Validation(ValidationError::DuplicateExternal { .. })
    ));

    let err = import.set_external(vec![(999_999, None)]).unwrap_err();
    assert!(matches!(
        err,
        CodecError::Envelope(EnvelopeError::UnknownExternal { .. })
    ));
}

#[test]
fn described_externals_must_be_resolved() {
    let (source, _) = sample::showcase().unwrap();
    let mut export = export_main(&source);
    let material_id = export
        .externals()
        .values()
        .find(|e| e.fixed_type_name == MATERIAL)
        .map(|e| e.id)
        .unwrap();
    export
        .set_descriptions(vec![(material_id, "Material applied to the result")])
        .unwrap();
    let document = export.document().unwrap();
    assert_eq!(
        document.external[&material_id].description.as_deref(),
        Some("Material applied to the result")
    );

    let mut target = MemHost::new();
    let mut import = start_import(&mut target, document);
    let err = import.run().unwrap_err();
    assert!(matches!(
        err,
        CodecError::Validation(ValidationError::UnresolvedExternal { .. })
    ));
    assert_eq!(import.state(), ImportState::ResolvingExternals);
}

#[test]
fn documents_from_another_host_version_are_refused() {
    let mut target = MemHost::with_version("4.4.0");
    let err = ImportSession::new(
        &mut target,
        showcase_document(),
        import_registry().unwrap(),
        ImportParameters::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(
        err,
        CodecError::Envelope(EnvelopeError::HostVersionMismatch { .. })
    ));
}

#[test]
fn out_of_range_values_are_clamped_on_export() {
    let (mut source, main) = sample::showcase().unwrap();
    let frame = node(&source, &main, "Frame");
    source.poke_scalar(&frame, "label_size", Scalar::Int(100)).unwrap();

    let export = export_main(&source);
    assert!(
        export
            .report()
            .warnings
            .iter()
            .any(|w| w.contains("clamped"))
    );

    let mut target = MemHost::new();
    start_import(&mut target, export.document().unwrap())
        .run()
        .unwrap();
    let main = main_tree(&target);
    let frame = node(&target, &main, "Frame");
    assert_eq!(
        target.get_scalar(&frame, "label_size").unwrap(),
        Scalar::Int(64)
    );
}

#[test]
fn integers_beyond_float_precision_are_exact() {
    let big = (1_i64 << 53) + 1;
    let (mut source, main) = sample::showcase().unwrap();
    let repeat = node(&source, &main, "RepeatInput");
    let iterations = source.input(&repeat, 0).unwrap();
    source
        .set_scalar(&iterations, DEFAULT_VALUE, Scalar::Int(big))
        .unwrap();

    let export = export_main(&source);
    assert!(!export.report().warnings.iter().any(|w| w.contains("clamped")));
    assert!(export.export_to_string().unwrap().contains(&big.to_string()));

    let mut target = MemHost::new();
    start_import(&mut target, export.document().unwrap())
        .run()
        .unwrap();
    let main = main_tree(&target);
    let repeat = node(&target, &main, "RepeatInput");
    let iterations = target.input(&repeat, 0).unwrap();
    assert_eq!(
        target.get_scalar(&iterations, DEFAULT_VALUE).unwrap(),
        Scalar::Int(big)
    );
}

#[test]
fn target_is_mutated_in_dependency_order() {
    let mut target = MemHost::new();
    start_import(&mut target, showcase_document()).run().unwrap();
    let journal = target.journal();

    let last = |entry: &str| journal.iter().rposition(|e| e == entry).unwrap();
    let first = |entry: &str| journal.iter().position(|e| e == entry).unwrap();

    // Frames are assigned once every node of the tree exists.
    assert!(first("pointer ValueNode.parent") > last("construct Nodes"));
    // Menu defaults are only valid once the links are in place.
    assert!(first("set NodeSocketMenu.default_value") > last("construct NodeLinks"));
    // The sub tree is created before the tree using it.
    assert!(first("create GeometryNodeTree") < first("pointer GroupNode.node_tree"));
}

#[test]
fn compressed_documents_import_like_plain_ones() {
    let (source, _) = sample::showcase().unwrap();
    let document = export_main(&source).document().unwrap();
    let text = document.to_compressed().unwrap();
    assert!(text.starts_with(graphclip::document::MAGIC));

    let mut target = MemHost::new();
    let mut import = ImportSession::from_text(
        &mut target,
        &text,
        import_registry().unwrap(),
        ImportParameters::default(),
    )
    .unwrap();
    let report = import.run().unwrap();
    assert_eq!(report.imported_trees, 2);
}

#[test]
fn material_export_recreates_the_material() {
    let (source, _) = sample::showcase().unwrap();
    let mut export = ExportSession::new(
        &source,
        ExportParameters::material(sample::MATERIAL_NAME),
        export_registry().unwrap(),
    )
    .unwrap();
    export.run().unwrap();
    let document = export.document().unwrap();
    assert_eq!(document.material_name.as_deref(), Some(sample::MATERIAL_NAME));
    let image_id = external_of_type(&document, IMAGE);

    let mut target = MemHost::new();
    let image = target.new_image(sample::IMAGE_NAME).unwrap();
    let mut import = start_import(&mut target, document);
    import.set_external(vec![(image_id, Some(image.clone()))]).unwrap();
    import.run().unwrap();
    drop(import);

    assert_eq!(target.global_names(MATERIALS), [sample::MATERIAL_NAME]);
    let material = target
        .lookup_global(&GlobalKey::new(MATERIALS, sample::MATERIAL_NAME))
        .unwrap();
    let shader = target
        .get_pointer(&material, NODE_TREE_PROP)
        .unwrap()
        .unwrap();
    let texture = node(&target, &shader, "ImageTexture");
    let bound = target.get_pointer(&texture, "image").unwrap().unwrap();
    assert!(same_object(&target, &bound, &image).unwrap());
}
