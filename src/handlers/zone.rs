//! Zones, item-driven nodes and their item collections.
//!
//! The sockets of these nodes follow an item collection, so items are
//! recreated before sockets are imported. A zone input (repeat or
//! simulation) has no item sockets of its own until it is paired with its
//! output, which is only possible once every node of the tree exists.

use serde_json::{Map, Value};

use super::node::{defer_parent, export_node, import_first};
use super::{node_data, str_field};
use crate::document::ITEMS;
use crate::error::{CodecResult, StructuralError};
use crate::export::{ExportContext, Field, NodeData, SpecificExporter};
use crate::host::{Args, Host, Scalar};
use crate::import::{DeferredAction, Getter, ImportContext, Importer, SpecificImporter, or_default};
use crate::path::PathTrail;
use crate::vocab::*;

/// Zone inputs reference their output by name: it is a sibling in the same
/// tree.
fn export_zone_input<H: Host>(ctx: &mut ExportContext<'_, '_, H>) -> CodecResult<NodeData> {
    let mut data = export_node(ctx)?;
    let host = ctx.host();
    let paired = match host.get_pointer(ctx.obj, PAIRED_OUTPUT)? {
        Some(output) => Field::Value(Value::from(host.display_name(&output)?)),
        None => Field::Null,
    };
    data.insert(PAIRED_OUTPUT.into(), paired);
    Ok(data)
}

fn import_zone_input<H: Host>(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
    ctx.simple_writable(&[])?;
    match ctx.field(PAIRED_OUTPUT).and_then(Value::as_str) {
        Some(output_name) => {
            let tree = ctx.importer.current_tree().cloned().ok_or_else(|| {
                StructuralError::HandlerNeeded {
                    reason: "zone input imported outside of a tree".into(),
                    path: ctx.path.to_string(),
                }
            })?;
            ctx.defer(DeferredAction::PairZone {
                input: ctx.getter.clone(),
                tree,
                output_name: output_name.to_string(),
                serialization: ctx.data.clone(),
                properties: vec![INPUTS.into(), OUTPUTS.into()],
                path: ctx.path.clone(),
            });
        }
        None => ctx.properties(&[INPUTS, OUTPUTS])?,
    }
    defer_parent(ctx)
}

pub struct RepeatInputHandler;

impl<H: Host> SpecificExporter<H> for RepeatInputHandler {
    const ASSUMED_TYPE: &'static str = REPEAT_INPUT_NODE;

    fn serialize(ctx: &mut ExportContext<'_, '_, H>) -> CodecResult<NodeData> {
        export_zone_input(ctx)
    }
}

impl<H: Host> SpecificImporter<H> for RepeatInputHandler {
    const ASSUMED_TYPE: &'static str = REPEAT_INPUT_NODE;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        import_zone_input(ctx)
    }
}

pub struct SimulationInputHandler;

impl<H: Host> SpecificExporter<H> for SimulationInputHandler {
    const ASSUMED_TYPE: &'static str = SIMULATION_INPUT_NODE;

    fn serialize(ctx: &mut ExportContext<'_, '_, H>) -> CodecResult<NodeData> {
        export_zone_input(ctx)
    }
}

impl<H: Host> SpecificImporter<H> for SimulationInputHandler {
    const ASSUMED_TYPE: &'static str = SIMULATION_INPUT_NODE;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        import_zone_input(ctx)
    }
}

/// Items first, then the sockets they produced.
fn import_item_node<H: Host>(
    ctx: &mut ImportContext<'_, '_, H>,
    items: &str,
) -> CodecResult<()> {
    ctx.simple_writable(&[])?;
    ctx.properties(&[items, INPUTS, OUTPUTS])?;
    defer_parent(ctx)
}

pub struct RepeatOutputHandler;

impl<H: Host> SpecificImporter<H> for RepeatOutputHandler {
    const ASSUMED_TYPE: &'static str = REPEAT_OUTPUT_NODE;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        import_item_node(ctx, REPEAT_ITEMS_PROP)
    }
}

pub struct ViewerHandler;

impl<H: Host> SpecificImporter<H> for ViewerHandler {
    const ASSUMED_TYPE: &'static str = VIEWER_NODE;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        import_item_node(ctx, VIEWER_ITEMS_PROP)
    }
}

/// `active_index` can only point at an item that exists.
fn import_indexed_item_node<H: Host>(
    ctx: &mut ImportContext<'_, '_, H>,
    items: &str,
) -> CodecResult<()> {
    ctx.simple_writable(&[ACTIVE_INDEX])?;
    ctx.properties(&[items, ACTIVE_INDEX, INPUTS, OUTPUTS])?;
    defer_parent(ctx)
}

pub struct SimulationOutputHandler;

impl<H: Host> SpecificImporter<H> for SimulationOutputHandler {
    const ASSUMED_TYPE: &'static str = SIMULATION_OUTPUT_NODE;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        import_indexed_item_node(ctx, STATE_ITEMS)
    }
}

pub struct CaptureAttributeHandler;

impl<H: Host> SpecificImporter<H> for CaptureAttributeHandler {
    const ASSUMED_TYPE: &'static str = CAPTURE_ATTRIBUTE_NODE;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        import_indexed_item_node(ctx, CAPTURE_ITEMS)
    }
}

pub struct IndexSwitchHandler;

impl<H: Host> SpecificImporter<H> for IndexSwitchHandler {
    const ASSUMED_TYPE: &'static str = INDEX_SWITCH_NODE;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        import_first(ctx, DATA_TYPE)?;
        ctx.simple_writable(&[DATA_TYPE])?;
        ctx.properties(&[INDEX_SWITCH_ITEMS_PROP, INPUTS, OUTPUTS])?;
        defer_parent(ctx)
    }
}

pub struct MenuSwitchHandler;

impl<H: Host> SpecificImporter<H> for MenuSwitchHandler {
    const ASSUMED_TYPE: &'static str = MENU_SWITCH_NODE;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        import_first(ctx, DATA_TYPE)?;
        ctx.simple_writable(&[DATA_TYPE])?;
        ctx.properties(&[ENUM_ITEMS, INPUTS, OUTPUTS])?;
        defer_parent(ctx)
    }
}

fn collection_items<'v>(data: &'v Map<String, Value>, path: &PathTrail) -> CodecResult<&'v [Value]> {
    data.get(ITEMS)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| {
            StructuralError::MalformedField {
                expected: "a collection node with items".into(),
                path: path.to_string(),
            }
            .into()
        })
}

/// Empty the collection `getter` yields and construct one element per
/// serialized item, with the arguments `make_args` derives from the item.
fn rebuild_items<H: Host>(
    importer: &mut Importer<'_, H>,
    getter: &Getter,
    data: &Map<String, Value>,
    path: &PathTrail,
    mut make_args: impl FnMut(&Map<String, Value>) -> CodecResult<Args<H::Handle>>,
) -> CodecResult<()> {
    let items = collection_items(data, path)?;
    let container = getter.live(importer.host())?;
    importer.host_mut().clear(&container)?;
    for item in items {
        let args = make_args(node_data(item, path)?)?;
        importer.host_mut().construct(&container, &args)?;
    }
    tracing::debug!(%path, count = items.len(), "recreated items");
    Ok(())
}

/// Recreate the items of a repeat, simulation, viewer or menu switch
/// collection. Their remaining properties are filled in element by element
/// afterwards.
pub(super) fn import_item_collection<H: Host>(
    importer: &mut Importer<'_, H>,
    getter: &Getter,
    data: &Map<String, Value>,
    path: &PathTrail,
) -> CodecResult<()> {
    rebuild_items(importer, getter, data, path, |item| {
        let mut args = Args::new().scalar(NAME, str_field(item, NAME));
        if let Some(socket_type) = item.get(SOCKET_TYPE).and_then(Value::as_str) {
            args = args.scalar(SOCKET_TYPE, socket_type);
        }
        Ok(args)
    })
}

/// Capture items are created from the socket type matching their data type.
pub(super) fn import_capture_items<H: Host>(
    importer: &mut Importer<'_, H>,
    getter: &Getter,
    data: &Map<String, Value>,
    path: &PathTrail,
) -> CodecResult<()> {
    let default_type =
        or_default(importer.host(), &Map::new(), CAPTURE_ATTRIBUTE_ITEM, DATA_TYPE, path)?;
    rebuild_items(importer, getter, data, path, |item| {
        let data_type = item
            .get(DATA_TYPE)
            .and_then(Value::as_str)
            .or(default_type.as_str())
            .unwrap_or_default();
        let socket_type = CAPTURE_SOCKET_TYPES
            .iter()
            .find(|(d, _)| *d == data_type)
            .map(|(_, socket_type)| *socket_type)
            .ok_or_else(|| StructuralError::MalformedField {
                expected: format!("a capturable data type, not \"{data_type}\""),
                path: path.to_string(),
            })?;
        Ok(Args::new()
            .scalar(NAME, str_field(item, NAME))
            .scalar(SOCKET_TYPE, socket_type))
    })
}

/// Index switch items carry no data; only their count matters.
pub(super) fn import_index_switch_items<H: Host>(
    importer: &mut Importer<'_, H>,
    getter: &Getter,
    data: &Map<String, Value>,
    path: &PathTrail,
) -> CodecResult<()> {
    rebuild_items(importer, getter, data, path, |_| Ok(Args::new()))
}

/// Viewer items may remove themselves when nothing is linked to them, so
/// `auto_remove` is only switched on after links exist.
pub struct ViewerItemHandler;

impl<H: Host> SpecificImporter<H> for ViewerItemHandler {
    const ASSUMED_TYPE: &'static str = VIEWER_ITEM;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        ctx.simple_writable(&[AUTO_REMOVE])?;
        match ctx.field(AUTO_REMOVE).and_then(Value::as_bool) {
            Some(true) => ctx.defer(DeferredAction::SetLateFlag {
                target: ctx.getter.clone(),
                identifier: AUTO_REMOVE.into(),
                value: Scalar::Bool(true),
                path: ctx.path.clone(),
            }),
            Some(false) => {
                let obj = ctx.obj()?;
                ctx.host_mut().set_scalar(&obj, AUTO_REMOVE, Scalar::Bool(false))?;
            }
            None => {}
        }
        Ok(())
    }
}

/// Color ramps always hold at least one element; the collection is grown or
/// shrunk to the serialized count instead of being rebuilt.
pub struct ColorRampElementsHandler;

impl<H: Host> SpecificImporter<H> for ColorRampElementsHandler {
    const ASSUMED_TYPE: &'static str = COLOR_RAMP_ELEMENTS;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        let items = ctx.own_items()?;
        if items.is_empty() {
            return Err(StructuralError::MalformedField {
                expected: "at least one color ramp element".into(),
                path: ctx.path.to_string(),
            }
            .into());
        }
        let elements = ctx.obj()?;
        loop {
            let len = ctx.host().collection_len(&elements)?;
            if len < items.len() {
                let position = items[len]
                    .get(crate::document::DATA)
                    .and_then(|data| data.get(POSITION))
                    .and_then(Value::as_f64)
                    .unwrap_or_default();
                ctx.host_mut()
                    .construct(&elements, &Args::new().scalar(POSITION, position))?;
            } else if len > items.len() {
                ctx.host_mut().remove(&elements, len - 1)?;
            } else {
                return Ok(());
            }
        }
    }
}

/// The curve is re-evaluated once its points are final.
pub struct CurveMappingHandler;

impl<H: Host> SpecificImporter<H> for CurveMappingHandler {
    const ASSUMED_TYPE: &'static str = CURVE_MAPPING;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        ctx.simple_writable(&[])?;
        ctx.properties(&[CURVES])?;
        ctx.defer(DeferredAction::Invoke {
            target: ctx.getter.clone(),
            function: FN_UPDATE.into(),
            path: ctx.path.clone(),
        });
        Ok(())
    }
}

/// A curve keeps its two end points. Everything between them is removed and
/// recreated at the serialized locations.
pub struct CurveMapPointsHandler;

impl<H: Host> SpecificImporter<H> for CurveMapPointsHandler {
    const ASSUMED_TYPE: &'static str = CURVE_MAP_POINTS;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()> {
        let items = ctx.own_items()?;
        if items.len() < 2 {
            return Err(StructuralError::MalformedField {
                expected: "at least two curve points".into(),
                path: ctx.path.to_string(),
            }
            .into());
        }
        let points = ctx.obj()?;
        while ctx.host().collection_len(&points)? > 2 {
            ctx.host_mut().remove(&points, 1)?;
        }
        for item in &items[1..items.len() - 1] {
            let location = node_data(item, ctx.path)?
                .get(LOCATION)
                .and_then(Value::as_array)
                .map(|l| l.iter().filter_map(Value::as_f64).collect::<Vec<_>>())
                .unwrap_or_default();
            let (Some(&x), Some(&y)) = (location.first(), location.get(1)) else {
                return Err(StructuralError::MalformedField {
                    expected: "a point location".into(),
                    path: ctx.path.to_string(),
                }
                .into());
            };
            ctx.host_mut()
                .construct(&points, &Args::new().scalar(POSITION, x).scalar(ARG_VALUE, y))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::CodecConfig;
    use crate::handlers::{import_registry, round_trip, showcase_round_trip};
    use crate::mem::sample::{FIELDS_TREE, fields};
    use crate::mem::{MemHandle, MemHost};

    fn node(host: &MemHost, tree: &MemHandle, name: &str) -> MemHandle {
        host.node_by_name(tree, name).unwrap().unwrap()
    }

    fn fields_round_trip() -> (MemHost, MemHandle) {
        let (host, _) = fields().unwrap();
        round_trip(&host, FIELDS_TREE)
    }

    fn socket_names(host: &MemHost, node: &MemHandle, side: &str) -> Vec<String> {
        let sockets = host.get_collection(node, side).unwrap();
        (0..host.collection_len(&sockets).unwrap())
            .map(|i| host.display_name(&host.element(&sockets, i).unwrap()).unwrap())
            .collect()
    }

    fn curve_points(host: &MemHost, curve: &MemHandle) -> MemHandle {
        let mapping = host.get_pointer(curve, MAPPING).unwrap().unwrap();
        let curves = host.get_collection(&mapping, CURVES).unwrap();
        host.get_collection(&host.element(&curves, 0).unwrap(), POINTS)
            .unwrap()
    }

    fn locations(host: &MemHost, points: &MemHandle) -> Vec<Scalar> {
        (0..host.collection_len(points).unwrap())
            .map(|i| {
                let point = host.element(points, i).unwrap();
                host.get_scalar(&point, LOCATION).unwrap()
            })
            .collect()
    }

    #[test]
    fn repeat_zones_are_paired_again() {
        let (host, main) = showcase_round_trip();
        let input = node(&host, &main, "RepeatInput");
        let output = host.get_pointer(&input, PAIRED_OUTPUT).unwrap().unwrap();
        assert_eq!(host.display_name(&output).unwrap(), "RepeatOutput");
        let iterations = host.input(&input, 0).unwrap();
        assert_eq!(
            host.get_scalar(&iterations, DEFAULT_VALUE).unwrap(),
            Scalar::Int(3)
        );
    }

    #[test]
    fn menu_default_is_restored_last() {
        let (host, main) = showcase_round_trip();
        let menu = node(&host, &main, "MenuSwitch");
        let selector = host.input(&menu, 0).unwrap();
        assert_eq!(
            host.get_scalar(&selector, DEFAULT_VALUE).unwrap(),
            Scalar::from("B")
        );
    }

    #[test]
    fn color_ramp_elements_match() {
        let (host, main) = showcase_round_trip();
        let ramp = node(&host, &main, "ColorRamp");
        let color_ramp = host.get_pointer(&ramp, COLOR_RAMP_PROP).unwrap().unwrap();
        let elements = host.get_collection(&color_ramp, ELEMENTS).unwrap();
        assert_eq!(host.collection_len(&elements).unwrap(), 3);
        assert_eq!(
            host.get_scalar(&color_ramp, "interpolation").unwrap(),
            Scalar::from("EASE")
        );
    }

    #[test]
    fn simulation_zones_are_paired_again() {
        let (host, tree) = fields_round_trip();
        let input = node(&host, &tree, "SimulationInput");
        let output = host.get_pointer(&input, PAIRED_OUTPUT).unwrap().unwrap();
        assert_eq!(host.display_name(&output).unwrap(), "SimulationOutput");
        assert_eq!(
            socket_names(&host, &input, OUTPUTS),
            ["Delta Time", "Geometry", "Velocity"]
        );
        assert_eq!(host.get_scalar(&output, ACTIVE_INDEX).unwrap(), Scalar::Int(1));

        let state = host.get_collection(&output, STATE_ITEMS).unwrap();
        let velocity = host.element(&state, 1).unwrap();
        assert_eq!(
            host.get_scalar(&velocity, SOCKET_TYPE).unwrap(),
            Scalar::from("NodeSocketVector")
        );
        assert_eq!(
            host.get_scalar(&velocity, "attribute_domain").unwrap(),
            Scalar::from("FACE")
        );
    }

    #[test]
    fn capture_items_keep_their_data_types() {
        let (host, tree) = fields_round_trip();
        let capture = node(&host, &tree, "CaptureAttribute");
        assert_eq!(
            socket_names(&host, &capture, INPUTS),
            ["Geometry", "Attribute", "Normal", "Index"]
        );
        let items = host.get_collection(&capture, CAPTURE_ITEMS).unwrap();
        let data_types: Vec<Scalar> = (0..host.collection_len(&items).unwrap())
            .map(|i| host.get_scalar(&host.element(&items, i).unwrap(), DATA_TYPE).unwrap())
            .collect();
        assert_eq!(
            data_types,
            [Scalar::from("FLOAT"), Scalar::from("FLOAT_VECTOR"), Scalar::from("INT")]
        );
        assert_eq!(host.get_scalar(&capture, ACTIVE_INDEX).unwrap(), Scalar::Int(2));

        // The zone around the capture node is linked through its sockets.
        let links = host.get_collection(&tree, LINKS).unwrap();
        assert_eq!(host.collection_len(&links).unwrap(), 3);
    }

    #[test]
    fn index_switch_items_are_recreated() {
        let (host, tree) = fields_round_trip();
        let switch = node(&host, &tree, "IndexSwitch");
        let items = host.get_collection(&switch, INDEX_SWITCH_ITEMS_PROP).unwrap();
        assert_eq!(host.collection_len(&items).unwrap(), 3);
        assert_eq!(socket_names(&host, &switch, INPUTS), ["Index", "0", "1", "2"]);
        let last = host.input(&switch, 3).unwrap();
        assert_eq!(host.type_name(&last).unwrap(), "NodeSocketFloat");
        let index = host.input(&switch, 0).unwrap();
        assert_eq!(host.get_scalar(&index, DEFAULT_VALUE).unwrap(), Scalar::Int(2));
    }

    #[test]
    fn curve_points_are_restored_in_order() {
        let (host, tree) = fields_round_trip();
        let curve = node(&host, &tree, "FloatCurve");
        let mapping = host.get_pointer(&curve, MAPPING).unwrap().unwrap();
        assert_eq!(
            host.get_scalar(&mapping, "extend").unwrap(),
            Scalar::from("EXTRAPOLATED")
        );
        let points = curve_points(&host, &curve);
        assert_eq!(
            locations(&host, &points),
            [vec![0.0, 0.0], vec![0.25, 0.6], vec![0.7, 0.4], vec![1.0, 1.0]].map(Scalar::from)
        );
        let sharp = host.element(&points, 2).unwrap();
        assert_eq!(
            host.get_scalar(&sharp, "handle_type").unwrap(),
            Scalar::from("VECTOR")
        );
    }

    #[test]
    fn surplus_curve_points_are_dropped() {
        let (mut host, _) = fields().unwrap();
        let points = Getter::global(NODE_GROUPS, FIELDS_TREE)
            .collection(NODES_PROP)
            .element(4)
            .pointer(MAPPING)
            .collection(CURVES)
            .element(0)
            .collection(POINTS);
        let serialized = json!({"id": 0, "data": {"items": [
            {"id": 1, "data": {"location": [0.0, 0.0]}},
            {"id": 2, "data": {"location": [0.5, 0.5]}},
            {"id": 3, "data": {"location": [1.0, 1.0]}}
        ]}});

        let mut importer = Importer::new(&mut host, import_registry().unwrap(), CodecConfig::default());
        importer
            .import_obj(&points, &serialized, &PathTrail::root("points"))
            .unwrap();
        drop(importer);

        let points = points.live(&host).unwrap();
        assert_eq!(
            locations(&host, &points),
            [vec![0.0, 0.0], vec![0.5, 0.5], vec![1.0, 1.0]].map(Scalar::from)
        );
    }
}
