//! Trees, their interface, and the node and link containers.

use std::collections::HashMap;

use serde_json::Value;

use super::{export_collection_where, field_id, is_enabled, node_data, str_field};
use crate::error::{CodecResult, StructuralError};
use crate::export::{ExportContext, Field, NodeData, SpecificExporter};
use crate::host::{Args, Host, Scalar};
use crate::identity::same_object;
use crate::import::{ImportContext, Phase, SpecificImporter, split_node};
use crate::vocab::*;

/// Node trees: interface first, then nodes, then links.
pub struct NodeTreeHandler;

impl<H: Host> SpecificExporter<H> for NodeTreeHandler {
    const ASSUMED_TYPE: &'static str = NODE_TREE;

    fn serialize(ctx: &mut ExportContext<'_, '_, H>) -> CodecResult<NodeData> {
        let mut data = ctx.simple_writable()?;
        data.extend(ctx.properties(&[INTERFACE_PROP, NODES_PROP, IDNAME], true)?);
        let links = export_collection_where(ctx, LINKS, |exporter, link, path| {
            let host = exporter.host();
            match host.get_pointer(link, FROM_SOCKET)? {
                Some(from) if !is_enabled(host, &from)? => {
                    exporter.warn(path, "skipping link from a disabled socket");
                    Ok(false)
                }
                _ => Ok(true),
            }
        })?;
        data.insert(LINKS.into(), links);
        Ok(data)
    }
}

impl<H: Host> SpecificImporter<H> for NodeTreeHandler {
    const ASSUMED_TYPE: &'static str = NODE_TREE;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        // The name was given when the tree was created.
        ctx.simple_writable(&[NAME])?;
        ctx.properties(&[INTERFACE_PROP, NODES_PROP])?;
        ctx.importer.flush(Phase::StructuralPairing)?;
        ctx.properties(&[LINKS])?;
        ctx.importer.flush(Phase::LateFlag)
    }
}

/// Tree interfaces. Items are created through the interface's own
/// functions, then moved into their panels, then filled in.
pub struct InterfaceHandler;

impl<H: Host> SpecificExporter<H> for InterfaceHandler {
    const ASSUMED_TYPE: &'static str = INTERFACE;

    fn serialize(ctx: &mut ExportContext<'_, '_, H>) -> CodecResult<NodeData> {
        let mut data = ctx.simple_writable()?;
        data.extend(ctx.properties(&[ITEMS_TREE], false)?);
        Ok(data)
    }
}

impl<H: Host> SpecificImporter<H> for InterfaceHandler {
    const ASSUMED_TYPE: &'static str = INTERFACE;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        let items = ctx.items(ITEMS_TREE)?;
        let interface = ctx.obj()?;
        let container = ctx.host().get_collection(&interface, ITEMS_TREE)?;
        ctx.host_mut().clear(&container)?;

        let mut parents = Vec::with_capacity(items.len());
        for item in items {
            let data = node_data(item, ctx.path)?;
            let (function, args) = match str_field(data, ITEM_TYPE) {
                ITEM_SOCKET => (
                    FN_NEW_SOCKET,
                    Args::new()
                        .scalar(NAME, str_field(data, NAME))
                        .scalar(DESCRIPTION, str_field(data, DESCRIPTION))
                        .scalar(IN_OUT, str_field(data, IN_OUT))
                        .scalar(SOCKET_TYPE, str_field(data, SOCKET_TYPE)),
                ),
                ITEM_PANEL => (
                    FN_NEW_PANEL,
                    Args::new()
                        .scalar(NAME, str_field(data, NAME))
                        .scalar(DESCRIPTION, str_field(data, DESCRIPTION))
                        .scalar(
                            DEFAULT_CLOSED,
                            data.get(DEFAULT_CLOSED).and_then(Value::as_bool).unwrap_or(false),
                        ),
                ),
                other => {
                    return Err(StructuralError::MalformedField {
                        expected: format!("an interface item type, got \"{other}\""),
                        path: ctx.path.to_string(),
                    }
                    .into());
                }
            };
            ctx.host_mut().invoke(&interface, function, &args)?;
            parents.push(
                data.get(PARENT_INDEX)
                    .and_then(Value::as_i64)
                    .and_then(|index| usize::try_from(index).ok()),
            );
        }

        let mut filled: HashMap<usize, i64> = HashMap::new();
        for (index, parent) in parents.into_iter().enumerate() {
            let Some(parent) = parent else { continue };
            let host = ctx.host();
            let item = host.element(&container, index)?;
            let panel = host.element(&container, parent)?;
            let position = filled.entry(parent).or_default();
            let args = Args::new()
                .handle(ARG_ITEM, Some(item))
                .handle(ARG_PARENT, Some(panel))
                .scalar(ARG_TO_POSITION, *position);
            ctx.host_mut().invoke(&interface, FN_MOVE_TO_PARENT, &args)?;
            *position += 1;
        }

        ctx.simple_writable_and_list(&[ITEMS_TREE])
    }
}

/// Index of the panel holding the context object, -1 at top level.
fn parent_index<H: Host>(ctx: &ExportContext<'_, '_, H>) -> CodecResult<Field> {
    let host = ctx.host();
    let index = match host.get_pointer(ctx.obj, PARENT)? {
        Some(panel) => host.get_scalar(&panel, INDEX)?.as_i64().unwrap_or(-1),
        None => -1,
    };
    Ok(Field::Value(Value::from(index)))
}

pub struct InterfaceSocketHandler;

impl<H: Host> SpecificExporter<H> for InterfaceSocketHandler {
    const ASSUMED_TYPE: &'static str = INTERFACE_SOCKET;

    fn serialize(ctx: &mut ExportContext<'_, '_, H>) -> CodecResult<NodeData> {
        let mut data = ctx.simple_writable()?;
        data.extend(ctx.properties(&[IN_OUT, ITEM_TYPE], false)?);
        data.insert(PARENT_INDEX.into(), parent_index(ctx)?);
        Ok(data)
    }
}

impl<H: Host> SpecificImporter<H> for InterfaceSocketHandler {
    const ASSUMED_TYPE: &'static str = INTERFACE_SOCKET;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        super::node::import_dimensions(ctx)?;
        ctx.simple_writable(&[SOCKET_TYPE])
    }
}

pub struct InterfacePanelHandler;

impl<H: Host> SpecificExporter<H> for InterfacePanelHandler {
    const ASSUMED_TYPE: &'static str = INTERFACE_PANEL;

    fn serialize(ctx: &mut ExportContext<'_, '_, H>) -> CodecResult<NodeData> {
        let mut data = ctx.simple_writable()?;
        data.extend(ctx.properties(&[ITEM_TYPE], false)?);
        data.insert(PARENT_INDEX.into(), parent_index(ctx)?);
        Ok(data)
    }
}

impl<H: Host> SpecificImporter<H> for InterfacePanelHandler {
    const ASSUMED_TYPE: &'static str = INTERFACE_PANEL;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        ctx.simple_writable(&[])
    }
}

/// The node container: nodes are created by type, and the active node is
/// restored by serialized id.
pub struct NodesHandler;

impl<H: Host> SpecificImporter<H> for NodesHandler {
    const ASSUMED_TYPE: &'static str = NODES;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        let items = ctx.own_items()?;
        let nodes = ctx.obj()?;
        ctx.host_mut().clear(&nodes)?;

        let active_id = field_id(ctx.data, ACTIVE);
        let mut active = None;
        for (index, item) in items.iter().enumerate() {
            let (id, data) = split_node(item, ctx.path)?;
            let idname = data.get(IDNAME).and_then(Value::as_str).ok_or_else(|| {
                StructuralError::MissingField {
                    identifier: IDNAME.into(),
                    path: ctx.path.add(format!("[{index}]")).to_string(),
                }
            })?;
            let node = ctx
                .host_mut()
                .construct(&nodes, &Args::new().scalar(ARG_TYPE, idname))?;
            if let Some(name) = data.get(NAME).and_then(Value::as_str) {
                ctx.host_mut().set_scalar(&node, NAME, Scalar::from(name))?;
            }
            if active_id == Some(id) {
                active = Some(node);
            }
        }

        if let Some(node) = active {
            ctx.host_mut().set_pointer(&nodes, ACTIVE, Some(&node))?;
        }
        Ok(())
    }
}

/// The link container: links are created between already imported sockets.
pub struct NodeLinksHandler;

impl<H: Host> SpecificImporter<H> for NodeLinksHandler {
    const ASSUMED_TYPE: &'static str = NODE_LINKS;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        let items = ctx.own_items()?;
        let links = ctx.obj()?;
        ctx.host_mut().clear(&links)?;

        let mut sort_ids = Vec::with_capacity(items.len());
        for item in items {
            let data = node_data(item, ctx.path)?;
            let from = linked_socket(ctx, data, FROM_SOCKET)?;
            let to = linked_socket(ctx, data, TO_SOCKET)?;
            let args = Args::new()
                .handle(ARG_INPUT, Some(from))
                .handle(ARG_OUTPUT, Some(to));
            ctx.host_mut().construct(&links, &args)?;
            sort_ids.push(data.get(MULTI_INPUT_SORT_ID).and_then(Value::as_i64));
        }
        restore_sort_ids(ctx, &links, &sort_ids)
    }
}

fn linked_socket<H: Host>(
    ctx: &ImportContext<'_, '_, H>,
    data: &serde_json::Map<String, Value>,
    key: &str,
) -> CodecResult<H::Handle> {
    let id = field_id(data, key).ok_or_else(|| StructuralError::MissingField {
        identifier: key.into(),
        path: ctx.path.to_string(),
    })?;
    ctx.importer
        .resolve_id(id, ctx.path)?
        .ok_or_else(|| {
            StructuralError::UnexpectedNull {
                path: ctx.path.to_string(),
            }
            .into()
        })
}

/// Links into a multi-input socket are numbered in creation order. Swap
/// numbers until every link carries the one it was exported with.
fn restore_sort_ids<H: Host>(
    ctx: &mut ImportContext<'_, '_, H>,
    links: &H::Handle,
    wanted: &[Option<i64>],
) -> CodecResult<()> {
    let sort_id = |host: &H, link: &H::Handle| -> CodecResult<i64> {
        Ok(host.get_scalar(link, MULTI_INPUT_SORT_ID)?.as_i64().unwrap_or_default())
    };
    for (index, want) in wanted.iter().enumerate() {
        let Some(want) = *want else { continue };
        let host = ctx.host();
        let link = host.element(links, index)?;
        if sort_id(host, &link)? == want {
            continue;
        }
        let to_socket = host.get_pointer(&link, TO_SOCKET)?;
        let mut partner = None;
        for other_index in 0..host.collection_len(links)? {
            let other = host.element(links, other_index)?;
            let same_socket = match (&to_socket, host.get_pointer(&other, TO_SOCKET)?) {
                (Some(a), Some(b)) => same_object(host, a, &b)?,
                _ => false,
            };
            if same_socket && sort_id(host, &other)? == want {
                partner = Some(other);
                break;
            }
        }
        let Some(other) = partner else {
            return Err(StructuralError::MalformedField {
                expected: format!("a link into the same socket numbered {want}"),
                path: ctx.path.add(format!("[{index}]")).to_string(),
            }
            .into());
        };
        let args = Args::new().handle(ARG_OTHER, Some(other));
        ctx.host_mut()
            .invoke(&link, FN_SWAP_MULTI_INPUT_SORT_ID, &args)?;
    }
    Ok(())
}

pub struct NodeLinkHandler;

impl<H: Host> SpecificExporter<H> for NodeLinkHandler {
    const ASSUMED_TYPE: &'static str = NODE_LINK;

    fn serialize(ctx: &mut ExportContext<'_, '_, H>) -> CodecResult<NodeData> {
        let mut data = ctx.simple_writable()?;
        let host = ctx.host();
        if let Some(to) = host.get_pointer(ctx.obj, TO_SOCKET)?
            && host.get_scalar(&to, IS_MULTI_INPUT)?.as_bool() == Some(true)
        {
            data.extend(ctx.properties(&[MULTI_INPUT_SORT_ID], false)?);
        }
        data.extend(ctx.properties(&[FROM_SOCKET, TO_SOCKET], false)?);
        Ok(data)
    }
}

impl<H: Host> SpecificImporter<H> for NodeLinkHandler {
    const ASSUMED_TYPE: &'static str = NODE_LINK;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        ctx.simple_writable(&[])
    }
}
