//! Nodes and their sockets.

use serde_json::Value;

use super::{export_collection_where, field_id, is_enabled};
use crate::error::{CodecResult, StructuralError};
use crate::export::{ExportContext, NodeData, SpecificExporter};
use crate::host::{Host, Scalar};
use crate::import::{DeferredAction, ImportContext, SpecificImporter};
use crate::vocab::*;

/// Fields every node exports besides its writable simple properties.
pub(super) fn export_node<H: Host>(ctx: &mut ExportContext<'_, '_, H>) -> CodecResult<NodeData> {
    let mut data = ctx.simple_writable()?;
    data.extend(ctx.properties(&[INPUTS, OUTPUTS, IDNAME, PARENT], false)?);
    Ok(data)
}

/// Import `identifier` ahead of everything else when it was serialized.
pub(super) fn import_first<H: Host>(
    ctx: &mut ImportContext<'_, '_, H>,
    identifier: &str,
) -> CodecResult<()> {
    if ctx.field(identifier).is_some() {
        ctx.properties(&[identifier])?;
        ctx.claim(identifier);
    }
    Ok(())
}

/// Frames may be imported after their children, so parents are set once
/// every node of the tree exists.
pub(super) fn defer_parent<H: Host>(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
    match ctx.field(PARENT) {
        None => Ok(()),
        Some(Value::Null) => {
            let obj = ctx.obj()?;
            if ctx.host().get_pointer(&obj, PARENT)?.is_some() {
                ctx.host_mut().set_pointer(&obj, PARENT, None)?;
            }
            Ok(())
        }
        Some(_) => {
            let parent_id = field_id(ctx.data, PARENT).ok_or_else(|| {
                StructuralError::MalformedField {
                    expected: "a parent id".into(),
                    path: ctx.path.to_string(),
                }
            })?;
            ctx.defer(DeferredAction::PairChildToParent {
                child: ctx.getter.clone(),
                parent_id,
                path: ctx.path.clone(),
            });
            Ok(())
        }
    }
}

/// Set `dimensions` first, then a default value no longer than it.
pub(super) fn import_dimensions<H: Host>(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
    import_first(ctx, DIMENSIONS)?;
    let obj = ctx.obj()?;
    let host = ctx.host();
    if !host.has_property(&obj, DIMENSIONS)? {
        return Ok(());
    }
    let Some(value) = ctx.field(DEFAULT_VALUE) else {
        return Ok(());
    };
    let Some(values) = value.as_array() else {
        return Ok(());
    };
    let dimensions = host
        .get_scalar(&obj, DIMENSIONS)?
        .as_i64()
        .unwrap_or_default()
        .max(0) as usize;
    if values.len() <= dimensions {
        return Ok(());
    }

    let prop = host.property(&obj, DEFAULT_VALUE)?;
    let mut scalar = Scalar::from_json(&prop, value).ok_or_else(|| {
        StructuralError::MalformedField {
            expected: "a numeric array".into(),
            path: ctx.path.add_prop(&prop).to_string(),
        }
    })?;
    scalar.truncate(dimensions);
    ctx.host_mut().set_scalar(&obj, DEFAULT_VALUE, scalar)?;
    ctx.claim(DEFAULT_VALUE);
    ctx.warn(format!(
        "default value has {} components, truncated to {dimensions}",
        values.len()
    ));
    Ok(())
}

/// Any node without a more specific handler.
pub struct NodeHandler;

impl<H: Host> SpecificExporter<H> for NodeHandler {
    const ASSUMED_TYPE: &'static str = NODE;

    fn serialize(ctx: &mut ExportContext<'_, '_, H>) -> CodecResult<NodeData> {
        export_node(ctx)
    }
}

impl<H: Host> SpecificImporter<H> for NodeHandler {
    const ASSUMED_TYPE: &'static str = NODE;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        // The data type decides which sockets exist.
        import_first(ctx, DATA_TYPE)?;
        ctx.simple_writable(&[DATA_TYPE])?;
        ctx.properties(&[INPUTS, OUTPUTS])?;
        defer_parent(ctx)
    }
}

/// Group nodes get their sockets from the referenced tree, so the tree is
/// set before the sockets are imported.
pub struct GroupNodeHandler;

impl<H: Host> SpecificImporter<H> for GroupNodeHandler {
    const ASSUMED_TYPE: &'static str = GROUP_NODE;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        ctx.simple_writable(&[])?;
        ctx.properties(&[NODE_TREE_PROP, INPUTS, OUTPUTS])?;
        defer_parent(ctx)
    }
}

/// Render-layers nodes. Which outputs are enabled depends on the scene's
/// passes, so only enabled outputs are exchanged, matched by position.
pub struct RenderLayersHandler;

impl<H: Host> SpecificExporter<H> for RenderLayersHandler {
    const ASSUMED_TYPE: &'static str = RENDER_LAYERS_NODE;

    fn serialize(ctx: &mut ExportContext<'_, '_, H>) -> CodecResult<NodeData> {
        let mut data = ctx.simple_writable()?;
        data.extend(ctx.properties(&[IDNAME, INPUTS, PARENT, SCENE_PROP], false)?);
        let outputs = export_collection_where(ctx, OUTPUTS, |exporter, socket, path| {
            let enabled = is_enabled(exporter.host(), socket)?;
            if !enabled {
                tracing::debug!(%path, "leaving out disabled output");
            }
            Ok(enabled)
        })?;
        data.insert(OUTPUTS.into(), outputs);
        Ok(data)
    }
}

impl<H: Host> SpecificImporter<H> for RenderLayersHandler {
    const ASSUMED_TYPE: &'static str = RENDER_LAYERS_NODE;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        ctx.simple_writable(&[LAYER])?;
        // The layer only means something once the scene is set.
        if field_id(ctx.data, SCENE_PROP).is_some() {
            ctx.properties(&[SCENE_PROP, LAYER])?;
        }
        ctx.properties(&[INPUTS])?;
        import_enabled_outputs(ctx)?;
        defer_parent(ctx)
    }
}

fn import_enabled_outputs<H: Host>(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
    let items = ctx.items(OUTPUTS)?;
    let Some(serialized) = ctx.field(OUTPUTS) else {
        return Ok(());
    };
    let obj = ctx.obj()?;
    let prop = ctx.host().property(&obj, OUTPUTS)?;
    let path = ctx.path.add_prop(&prop);
    let getter = ctx.getter.collection(OUTPUTS);
    ctx.importer.import_obj(&getter, serialized, &path)?;

    let enabled = {
        let host = ctx.host();
        let outputs = host.get_collection(&obj, OUTPUTS)?;
        let mut enabled = Vec::new();
        for index in 0..host.collection_len(&outputs)? {
            if is_enabled(host, &host.element(&outputs, index)?)? {
                enabled.push(index);
            }
        }
        enabled
    };
    if enabled.len() != items.len() {
        return Err(StructuralError::ElementCountMismatch {
            expected: items.len(),
            actual: enabled.len(),
            path: path.to_string(),
        }
        .into());
    }
    for (item, index) in items.iter().zip(enabled) {
        let name = item
            .get(crate::document::DATA)
            .and_then(|data| data.get(NAME))
            .and_then(Value::as_str)
            .unwrap_or("unnamed");
        ctx.importer.import_obj(
            &getter.element(index),
            item,
            &path.add(format!("[{index}] ({name})")),
        )?;
    }
    Ok(())
}

pub struct NodeSocketHandler;

impl<H: Host> SpecificExporter<H> for NodeSocketHandler {
    const ASSUMED_TYPE: &'static str = NODE_SOCKET;

    fn serialize(ctx: &mut ExportContext<'_, '_, H>) -> CodecResult<NodeData> {
        ctx.simple_writable()
    }
}

impl<H: Host> SpecificImporter<H> for NodeSocketHandler {
    const ASSUMED_TYPE: &'static str = NODE_SOCKET;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        import_dimensions(ctx)?;
        ctx.simple_writable(&[])
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::CodecConfig;
    use crate::handlers::import_registry;
    use crate::import::{Getter, Importer};
    use crate::mem::MemHost;
    use crate::mem::schema::SOCKET_VECTOR;
    use crate::path::PathTrail;

    #[test]
    fn long_vector_defaults_are_truncated() {
        let mut host = MemHost::new();
        let tree = host.new_tree(GEOMETRY_NODE_TREE, "Tree").unwrap();
        host.add_interface_socket(&tree, "Offset", IN_OUT_INPUT, SOCKET_VECTOR)
            .unwrap();
        let group_in = host.add_node(&tree, GROUP_INPUT_NODE).unwrap();
        let socket = host.output(&group_in, 0).unwrap();

        let getter = Getter::global(NODE_GROUPS, "Tree")
            .collection(NODES_PROP)
            .element(0)
            .collection(OUTPUTS)
            .element(0);
        let serialized = json!({
            "id": 7,
            "data": {"dimensions": 2, "default_value": [1.0, 2.0, 3.0]}
        });
        let registry = import_registry::<MemHost>().unwrap();
        let mut importer = Importer::new(&mut host, registry, CodecConfig::default());
        importer
            .import_obj(&getter, &serialized, &PathTrail::root("socket"))
            .unwrap();
        assert_eq!(importer.report().warnings.len(), 1);
        drop(importer);

        assert_eq!(
            host.get_scalar(&socket, DEFAULT_VALUE).unwrap(),
            Scalar::FloatArray(vec![1.0, 2.0])
        );
    }

    #[test]
    fn parents_are_deferred() {
        let mut host = MemHost::new();
        host.new_tree(GEOMETRY_NODE_TREE, "Tree").unwrap();
        let tree = Getter::global(NODE_GROUPS, "Tree");
        let nodes = host
            .get_collection(&tree.get(&host).unwrap().unwrap(), NODES_PROP)
            .unwrap();
        host.construct(
            &nodes,
            &crate::host::Args::new().scalar(ARG_TYPE, VALUE_NODE),
        )
        .unwrap();

        let serialized = json!({
            "id": 3,
            "data": {
                "name": "Value",
                "parent": 9,
                "inputs": {"id": 4, "data": {"items": []}},
                "outputs": {"id": 5, "data": {"items": [
                    {"id": 6, "data": {"name": "Value", "default_value": 0.5}}
                ]}}
            }
        });
        let registry = import_registry::<MemHost>().unwrap();
        let mut importer = Importer::new(&mut host, registry, CodecConfig::default());
        importer
            .import_obj(
                &tree.collection(NODES_PROP).element(0),
                &serialized,
                &PathTrail::root("node"),
            )
            .unwrap();
        assert_eq!(importer.pending(crate::import::Phase::StructuralPairing), 1);
    }
}
