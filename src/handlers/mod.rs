//! Built-in handlers for node-graph hosts.
//!
//! The generic walk in [`crate::export`] and [`crate::import`] copies
//! whatever a host's reflection exposes. Node graphs need more than that:
//! nodes are created by type name, sockets appear as a side effect of other
//! writes, links are created between sockets instead of being assigned, and
//! zones must be paired before their sockets exist. The handlers here cover
//! those types; everything else falls through to the generic walk.
//!
//! Handlers only use the names in [`crate::vocab`], so they work for any host
//! publishing that vocabulary, not just [`crate::mem::MemHost`].

mod node;
mod tree;
mod zone;

pub use node::{
    GroupNodeHandler, NodeHandler, NodeSocketHandler, RenderLayersHandler,
};
pub use tree::{
    InterfaceHandler, InterfacePanelHandler, InterfaceSocketHandler, NodeLinkHandler,
    NodeLinksHandler, NodeTreeHandler, NodesHandler,
};
pub use zone::{
    CaptureAttributeHandler, ColorRampElementsHandler, CurveMapPointsHandler, CurveMappingHandler,
    IndexSwitchHandler, MenuSwitchHandler, RepeatInputHandler, RepeatOutputHandler,
    SimulationInputHandler, SimulationOutputHandler, ViewerHandler, ViewerItemHandler,
};

use serde_json::{Map, Value};

use crate::document::ITEMS;
use crate::error::{CodecResult, RegistryError};
use crate::export::{ExportContext, ExportRegistry, Exporter, Field, NodeData};
use crate::host::Host;
use crate::import::{Getter, ImportRegistry, Importer};
use crate::path::PathTrail;
use crate::vocab;

/// Item types exported as their plain writable properties.
const SIMPLE_ITEMS: &[&str] = &[
    vocab::REPEAT_ITEM,
    vocab::VIEWER_ITEM,
    vocab::MENU_SWITCH_ITEM,
    vocab::SIMULATION_STATE_ITEM,
    vocab::CAPTURE_ATTRIBUTE_ITEM,
    vocab::INDEX_SWITCH_ITEM,
    vocab::COLOR_RAMP_ELEMENT,
    vocab::CURVE_MAP_POINT,
];

/// Every built-in export handler.
pub fn export_registry<H: Host>() -> Result<ExportRegistry<H>, RegistryError> {
    let mut registry = ExportRegistry::new();
    registry.register::<NodeTreeHandler>()?;
    registry.register::<InterfaceHandler>()?;
    registry.register::<InterfaceSocketHandler>()?;
    registry.register::<InterfacePanelHandler>()?;
    registry.register::<NodeHandler>()?;
    registry.register::<RepeatInputHandler>()?;
    registry.register::<SimulationInputHandler>()?;
    registry.register::<RenderLayersHandler>()?;
    registry.register::<NodeSocketHandler>()?;
    registry.register::<NodeLinkHandler>()?;
    for item in SIMPLE_ITEMS {
        registry.register_fn(item, export_simple_item::<H>)?;
    }
    Ok(registry)
}

/// Every built-in import handler.
pub fn import_registry<H: Host>() -> Result<ImportRegistry<H>, RegistryError> {
    let mut registry = ImportRegistry::new();
    registry.register::<NodeTreeHandler>()?;
    registry.register::<InterfaceHandler>()?;
    registry.register_fn(vocab::INTERFACE_ITEMS, import_nothing::<H>)?;
    registry.register::<InterfaceSocketHandler>()?;
    registry.register::<InterfacePanelHandler>()?;
    registry.register::<NodesHandler>()?;
    registry.register::<NodeLinksHandler>()?;
    registry.register::<NodeLinkHandler>()?;
    registry.register::<NodeHandler>()?;
    registry.register::<GroupNodeHandler>()?;
    registry.register::<RepeatInputHandler>()?;
    registry.register::<RepeatOutputHandler>()?;
    registry.register::<ViewerHandler>()?;
    registry.register::<ViewerItemHandler>()?;
    registry.register::<MenuSwitchHandler>()?;
    registry.register::<SimulationInputHandler>()?;
    registry.register::<SimulationOutputHandler>()?;
    registry.register::<CaptureAttributeHandler>()?;
    registry.register::<IndexSwitchHandler>()?;
    registry.register::<RenderLayersHandler>()?;
    registry.register::<NodeSocketHandler>()?;
    registry.register_fn(vocab::NODE_INPUTS, import_nothing::<H>)?;
    registry.register_fn(vocab::NODE_OUTPUTS, import_nothing::<H>)?;
    registry.register_fn(vocab::REPEAT_ITEMS, zone::import_item_collection::<H>)?;
    registry.register_fn(vocab::VIEWER_ITEMS, zone::import_item_collection::<H>)?;
    registry.register_fn(vocab::MENU_SWITCH_ITEMS, zone::import_item_collection::<H>)?;
    registry.register_fn(vocab::SIMULATION_STATE_ITEMS, zone::import_item_collection::<H>)?;
    registry.register_fn(vocab::CAPTURE_ATTRIBUTE_ITEMS, zone::import_capture_items::<H>)?;
    registry.register_fn(vocab::INDEX_SWITCH_ITEMS, zone::import_index_switch_items::<H>)?;
    registry.register::<ColorRampElementsHandler>()?;
    registry.register::<CurveMappingHandler>()?;
    registry.register_fn(vocab::CURVE_MAPS, import_nothing::<H>)?;
    registry.register::<CurveMapPointsHandler>()?;
    Ok(registry)
}

fn export_simple_item<H: Host>(
    exporter: &mut Exporter<'_, H>,
    obj: &H::Handle,
    path: &PathTrail,
) -> CodecResult<NodeData> {
    let type_name = exporter.host().type_name(obj)?;
    exporter.export_all_simple_writable_properties(obj, &type_name, path)
}

/// Containers whose elements the host manages itself. Registering them keeps
/// the element count check and nothing else.
fn import_nothing<H: Host>(
    _importer: &mut Importer<'_, H>,
    _getter: &Getter,
    _data: &Map<String, Value>,
    path: &PathTrail,
) -> CodecResult<()> {
    tracing::debug!(%path, "host-managed collection");
    Ok(())
}

/// Export collection `identifier` of the context object like the generic
/// walk does, leaving out the elements `keep` rejects.
fn export_collection_where<H: Host>(
    ctx: &mut ExportContext<'_, '_, H>,
    identifier: &str,
    mut keep: impl FnMut(&mut Exporter<'_, H>, &H::Handle, &PathTrail) -> CodecResult<bool>,
) -> CodecResult<Field> {
    let host = ctx.host();
    let prop = host.property(ctx.obj, identifier)?;
    let path = ctx.path.add_prop(&prop);
    let collection = host.get_collection(ctx.obj, identifier)?;
    let mut node = ctx.exporter.export_obj(&collection, &path)?;

    let mut items = Vec::new();
    for i in 0..host.collection_len(&collection)? {
        let element = host.element(&collection, i)?;
        let element_path = path.add(format!("[{i}] ({})", host.display_name(&element)?));
        if keep(&mut *ctx.exporter, &element, &element_path)? {
            items.push(ctx.exporter.export_obj(&element, &element_path)?);
        }
    }
    node.data.insert(ITEMS.into(), Field::List(items));
    Ok(Field::Object(Box::new(node)))
}

/// Whether a socket is enabled. Hosts without the flag enable everything.
fn is_enabled<H: Host>(host: &H, socket: &H::Handle) -> CodecResult<bool> {
    if !host.has_property(socket, vocab::ENABLED)? {
        return Ok(true);
    }
    Ok(host.get_scalar(socket, vocab::ENABLED)?.as_bool().unwrap_or(true))
}

/// Serialized id in `data[key]`, `None` when the field is null or absent.
fn field_id(data: &Map<String, Value>, key: &str) -> Option<u64> {
    data.get(key).and_then(Value::as_u64)
}

/// String in `data[key]`, empty when absent.
fn str_field<'v>(data: &'v Map<String, Value>, key: &str) -> &'v str {
    data.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Field map of a serialized node.
fn node_data<'v>(item: &'v Value, path: &PathTrail) -> CodecResult<&'v Map<String, Value>> {
    crate::import::split_node(item, path).map(|(_, data)| data)
}

/// Export the tree `tree` of `host` and import it into an empty host.
#[cfg(test)]
fn round_trip(host: &crate::mem::MemHost, tree: &str) -> (crate::mem::MemHost, crate::mem::MemHandle) {
    use crate::export::{ExportParameters, ExportSession};
    use crate::host::GlobalKey;
    use crate::import::{ImportParameters, ImportSession};
    use crate::mem::MemHost;

    let registry = export_registry::<MemHost>().unwrap();
    let mut export = ExportSession::new(host, ExportParameters::tree(tree), registry).unwrap();
    export.run().unwrap();
    let document = export.document().unwrap();

    let mut target = MemHost::new();
    let registry = import_registry::<MemHost>().unwrap();
    ImportSession::new(&mut target, document, registry, ImportParameters::default())
        .unwrap()
        .run()
        .unwrap();
    let imported = target
        .lookup_global(&GlobalKey::new(vocab::NODE_GROUPS, tree))
        .unwrap();
    (target, imported)
}

/// Export the showcase's main tree and import it into an empty host.
#[cfg(test)]
fn showcase_round_trip() -> (crate::mem::MemHost, crate::mem::MemHandle) {
    use crate::mem::sample::{MAIN_TREE, showcase};

    let (host, _) = showcase().unwrap();
    round_trip(&host, MAIN_TREE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemHost;

    #[test]
    fn registries_match_the_reference_schema() {
        let host = MemHost::new();
        let export = export_registry::<MemHost>().unwrap();
        let import = import_registry::<MemHost>().unwrap();
        assert!(export.handlers().validate(host.schema()).is_ok());
        assert!(import.handlers().validate(host.schema()).is_ok());
        assert!(import.handlers().contains(vocab::NODE_LINKS));
        assert!(!export.handlers().contains(vocab::NODE_LINKS));
    }

    #[test]
    fn registering_twice_is_refused() {
        let mut registry = export_registry::<MemHost>().unwrap();
        assert!(matches!(
            registry.register::<NodeHandler>(),
            Err(RegistryError::Clobbering { .. })
        ));
    }
}
