//! Node-graph schema published by the reference host.

use crate::host::{PropertyInfo as Prop, Schema, TypeDef};
use crate::vocab::*;

pub const SOCKET_FLOAT: &str = "NodeSocketFloat";
pub const SOCKET_FACTOR: &str = "NodeSocketFloatFactor";
pub const SOCKET_INT: &str = "NodeSocketInt";
pub const SOCKET_VECTOR: &str = "NodeSocketVector";
pub const SOCKET_COLOR: &str = "NodeSocketColor";
pub const SOCKET_GEOMETRY: &str = "NodeSocketGeometry";
pub const SOCKET_MATERIAL: &str = "NodeSocketMaterial";
pub const SOCKET_IMAGE: &str = "NodeSocketImage";
pub const SOCKET_MENU: &str = "NodeSocketMenu";

/// Socket types items and interface sockets may be created with.
pub const ITEM_SOCKET_TYPES: &[&str] = &[SOCKET_FLOAT, SOCKET_INT, SOCKET_VECTOR, SOCKET_GEOMETRY];

pub const MENU_DATA_TYPES: &[&str] = &["FLOAT", "GEOMETRY"];

fn capture_data_types() -> Vec<&'static str> {
    CAPTURE_SOCKET_TYPES
        .iter()
        .map(|(data_type, _)| *data_type)
        .collect()
}

/// Interface socket type created for a socket type, e.g.
/// `NodeSocketFloat` -> `NodeTreeInterfaceSocketFloat`.
pub fn interface_socket_type(socket_type: &str) -> String {
    format!(
        "{INTERFACE_SOCKET}{}",
        socket_type.trim_start_matches("NodeSocket")
    )
}

fn unbounded(identifier: &str) -> Prop {
    Prop::float(identifier, f64::NEG_INFINITY, f64::INFINITY)
}

pub fn node_graph_schema() -> Schema {
    let mut schema = Schema::new();

    // -- ID blocks ----------------------------------------------------------

    schema.define(TypeDef::new(ID).prop(Prop::string(NAME)));
    schema.define(
        TypeDef::new(NODE_TREE)
            .base(ID)
            .prop(Prop::string(DESCRIPTION))
            .prop(Prop::enumeration(
                "color_tag",
                &["NONE", "COLOR_01", "COLOR_02", "COLOR_03"],
            ))
            .prop(Prop::string(IDNAME).readonly())
            .prop(Prop::pointer(INTERFACE_PROP, INTERFACE).readonly())
            .prop(Prop::collection(NODES_PROP, NODES, NODE))
            .prop(Prop::collection(LINKS, NODE_LINKS, NODE_LINK)),
    );
    schema.define(
        TypeDef::new(GEOMETRY_NODE_TREE)
            .base(NODE_TREE)
            .prop(Prop::boolean("is_modifier"))
            .prop(Prop::boolean("is_tool")),
    );
    schema.define(TypeDef::new(SHADER_NODE_TREE).base(NODE_TREE));
    schema.define(
        TypeDef::new(MATERIAL)
            .base(ID)
            .prop(Prop::boolean(USE_NODES))
            .prop(Prop::pointer(NODE_TREE_PROP, SHADER_NODE_TREE).readonly())
            .prop(
                Prop::float("diffuse_color", 0.0, 1.0)
                    .array(4)
                    .with_default(vec![0.8, 0.8, 0.8, 1.0]),
            ),
    );
    schema.define(
        TypeDef::new(IMAGE)
            .base(ID)
            .prop(Prop::string("filepath"))
            .prop(Prop::enumeration("alpha_mode", &["STRAIGHT", "PREMUL", "NONE"])),
    );
    schema.define(
        TypeDef::new(SCENE)
            .base(ID)
            .prop(Prop::pointer(RENDER, RENDER_SETTINGS).readonly())
            .prop(Prop::collection(VIEW_LAYERS_PROP, VIEW_LAYERS, VIEW_LAYER)),
    );
    schema.define(
        TypeDef::new(RENDER_SETTINGS)
            .prop(Prop::enumeration(ENGINE, &["WORKBENCH", "EEVEE", "CYCLES"]).with_default("EEVEE"))
            .prop(Prop::int("resolution_x", 4, 65536).with_default(1920_i64)),
    );
    schema.define(TypeDef::collection(VIEW_LAYERS).function(FN_NEW, &[NAME]));
    schema.define(
        TypeDef::new(VIEW_LAYER)
            .prop(Prop::string(NAME))
            .prop(Prop::boolean("use_pass_combined").with_default(true))
            .prop(Prop::boolean("use_pass_z").with_default(true))
            .prop(Prop::boolean("use_pass_mist"))
            .prop(Prop::boolean("use_pass_normal"))
            .prop(Prop::boolean("use_pass_grease_pencil"))
            .prop(Prop::int(PASS_CRYPTOMATTE_DEPTH, 0, 16).with_default(6_i64))
            .prop(Prop::pointer(CYCLES, VIEW_LAYER_CYCLES).readonly())
            .prop(Prop::collection(AOVS_PROP, AOVS, AOV))
            .prop(Prop::collection(LIGHTGROUPS_PROP, LIGHTGROUPS, LIGHTGROUP)),
    );
    schema.define(
        TypeDef::new(VIEW_LAYER_CYCLES)
            .prop(Prop::boolean("denoising_store_passes"))
            .prop(Prop::boolean("use_pass_volume_direct"))
            .prop(Prop::boolean("use_pass_shadow_catcher")),
    );
    schema.define(TypeDef::collection(AOVS).function(FN_NEW, &[NAME]));
    schema.define(
        TypeDef::new(AOV)
            .prop(Prop::string(NAME))
            .prop(Prop::enumeration("type", &["COLOR", "VALUE"])),
    );
    schema.define(TypeDef::collection(LIGHTGROUPS).function(FN_NEW, &[NAME]));
    schema.define(TypeDef::new(LIGHTGROUP).prop(Prop::string(NAME)));

    // -- Tree interface -----------------------------------------------------

    schema.define(
        TypeDef::new(INTERFACE)
            .prop(Prop::collection(ITEMS_TREE, INTERFACE_ITEMS, INTERFACE_ITEM))
            .function(
                FN_NEW_SOCKET,
                &[NAME, DESCRIPTION, IN_OUT, SOCKET_TYPE, ARG_PARENT],
            )
            .function(FN_NEW_PANEL, &[NAME, DESCRIPTION, DEFAULT_CLOSED])
            .function(FN_MOVE_TO_PARENT, &[ARG_ITEM, ARG_PARENT, ARG_TO_POSITION]),
    );
    schema.define(TypeDef::collection(INTERFACE_ITEMS));
    schema.define(
        TypeDef::new(INTERFACE_ITEM)
            .prop(Prop::enumeration(ITEM_TYPE, &[ITEM_SOCKET, ITEM_PANEL]).readonly())
            .prop(Prop::int(INDEX, -1, i64::MAX).readonly())
            .prop(Prop::pointer(PARENT, INTERFACE_PANEL).readonly()),
    );
    schema.define(
        TypeDef::new(INTERFACE_SOCKET)
            .base(INTERFACE_ITEM)
            .prop(Prop::string(NAME))
            .prop(Prop::string(DESCRIPTION))
            .prop(Prop::enumeration(IN_OUT, &[IN_OUT_INPUT, IN_OUT_OUTPUT]).readonly())
            .prop(Prop::enumeration(SOCKET_TYPE, ITEM_SOCKET_TYPES))
            .prop(Prop::boolean("hide_value")),
    );
    schema.define(
        TypeDef::new(&interface_socket_type(SOCKET_FLOAT))
            .base(INTERFACE_SOCKET)
            .prop(unbounded(DEFAULT_VALUE))
            .prop(unbounded("min_value").with_default(f64::MIN))
            .prop(unbounded("max_value").with_default(f64::MAX)),
    );
    schema.define(
        TypeDef::new(&interface_socket_type(SOCKET_INT))
            .base(INTERFACE_SOCKET)
            .prop(Prop::int(DEFAULT_VALUE, i64::MIN, i64::MAX)),
    );
    schema.define(
        TypeDef::new(&interface_socket_type(SOCKET_VECTOR))
            .base(INTERFACE_SOCKET)
            .prop(Prop::int(DIMENSIONS, 2, 4).with_default(3_i64))
            .prop(unbounded(DEFAULT_VALUE).array(4).with_default(vec![0.0; 3])),
    );
    schema.define(TypeDef::new(&interface_socket_type(SOCKET_GEOMETRY)).base(INTERFACE_SOCKET));
    schema.define(
        TypeDef::new(INTERFACE_PANEL)
            .base(INTERFACE_ITEM)
            .prop(Prop::string(NAME))
            .prop(Prop::string(DESCRIPTION))
            .prop(Prop::boolean(DEFAULT_CLOSED)),
    );

    // -- Nodes, sockets and links -------------------------------------------

    schema.define(
        TypeDef::collection(NODES)
            .prop(Prop::pointer(ACTIVE, NODE))
            .function(FN_NEW, &[ARG_TYPE]),
    );
    schema.define(TypeDef::collection(NODE_LINKS).function(FN_NEW, &[ARG_INPUT, ARG_OUTPUT]));
    schema.define(TypeDef::collection(NODE_INPUTS).function(FN_NEW, &[ARG_TYPE, NAME]));
    schema.define(TypeDef::collection(NODE_OUTPUTS).function(FN_NEW, &[ARG_TYPE, NAME]));

    schema.define(
        TypeDef::new(NODE)
            .prop(Prop::string(NAME))
            .prop(Prop::string("label"))
            .prop(unbounded("location").array(2))
            .prop(Prop::float("width", 0.0, 10000.0).with_default(140.0))
            .prop(Prop::boolean("hide"))
            .prop(Prop::boolean("mute"))
            .prop(Prop::pointer(PARENT, NODE))
            .prop(Prop::string(IDNAME).readonly())
            .prop(Prop::collection(INPUTS, NODE_INPUTS, NODE_SOCKET))
            .prop(Prop::collection(OUTPUTS, NODE_OUTPUTS, NODE_SOCKET)),
    );
    schema.define(TypeDef::new(VALUE_NODE).base(NODE));
    schema.define(
        TypeDef::new(MATH_NODE)
            .base(NODE)
            .prop(Prop::enumeration(
                "operation",
                &["ADD", "SUBTRACT", "MULTIPLY", "DIVIDE"],
            ))
            .prop(Prop::boolean("use_clamp")),
    );
    schema.define(
        TypeDef::new(FRAME_NODE)
            .base(NODE)
            .prop(Prop::int("label_size", 8, 64).with_default(20_i64))
            .prop(Prop::boolean("shrink").with_default(true)),
    );
    schema.define(
        TypeDef::new(GROUP_NODE)
            .base(NODE)
            .prop(Prop::pointer(NODE_TREE_PROP, NODE_TREE)),
    );
    schema.define(TypeDef::new(GROUP_INPUT_NODE).base(NODE));
    schema.define(TypeDef::new(GROUP_OUTPUT_NODE).base(NODE));
    schema.define(TypeDef::new(JOIN_GEOMETRY_NODE).base(NODE));
    schema.define(TypeDef::new(SET_MATERIAL_NODE).base(NODE));
    schema.define(
        TypeDef::new(IMAGE_TEXTURE_NODE)
            .base(NODE)
            .prop(Prop::pointer("image", IMAGE))
            .prop(Prop::enumeration("interpolation", &["Linear", "Closest", "Cubic"])),
    );
    schema.define(
        TypeDef::new(RENDER_LAYERS_NODE)
            .base(NODE)
            .prop(Prop::pointer(SCENE_PROP, SCENE))
            .prop(Prop::string(LAYER)),
    );
    schema.define(
        TypeDef::new(COLOR_RAMP_NODE)
            .base(NODE)
            .prop(Prop::pointer(COLOR_RAMP_PROP, COLOR_RAMP).readonly()),
    );
    schema.define(
        TypeDef::new(REPEAT_INPUT_NODE)
            .base(NODE)
            .prop(Prop::pointer(PAIRED_OUTPUT, REPEAT_OUTPUT_NODE).readonly())
            .function(FN_PAIR_WITH_OUTPUT, &[ARG_OUTPUT]),
    );
    schema.define(
        TypeDef::new(REPEAT_OUTPUT_NODE)
            .base(NODE)
            .prop(Prop::collection(REPEAT_ITEMS_PROP, REPEAT_ITEMS, REPEAT_ITEM)),
    );
    schema.define(TypeDef::collection(REPEAT_ITEMS).function(FN_NEW, &[SOCKET_TYPE, NAME]));
    schema.define(
        TypeDef::new(REPEAT_ITEM)
            .prop(Prop::string(NAME))
            .prop(Prop::enumeration(SOCKET_TYPE, ITEM_SOCKET_TYPES)),
    );
    schema.define(
        TypeDef::new(VIEWER_NODE)
            .base(NODE)
            .prop(Prop::enumeration("domain", &["AUTO", "POINT", "FACE"]))
            .prop(Prop::collection(VIEWER_ITEMS_PROP, VIEWER_ITEMS, VIEWER_ITEM)),
    );
    schema.define(TypeDef::collection(VIEWER_ITEMS).function(FN_NEW, &[SOCKET_TYPE, NAME]));
    schema.define(
        TypeDef::new(VIEWER_ITEM)
            .prop(Prop::string(NAME))
            .prop(Prop::enumeration(SOCKET_TYPE, ITEM_SOCKET_TYPES))
            .prop(Prop::boolean(AUTO_REMOVE)),
    );
    schema.define(
        TypeDef::new(MENU_SWITCH_NODE)
            .base(NODE)
            .prop(Prop::enumeration(DATA_TYPE, MENU_DATA_TYPES).with_default("GEOMETRY"))
            .prop(Prop::collection(ENUM_ITEMS, MENU_SWITCH_ITEMS, MENU_SWITCH_ITEM)),
    );
    schema.define(TypeDef::collection(MENU_SWITCH_ITEMS).function(FN_NEW, &[NAME]));
    schema.define(
        TypeDef::new(MENU_SWITCH_ITEM)
            .prop(Prop::string(NAME))
            .prop(Prop::string(DESCRIPTION)),
    );

    schema.define(
        TypeDef::new(SIMULATION_INPUT_NODE)
            .base(NODE)
            .prop(Prop::pointer(PAIRED_OUTPUT, SIMULATION_OUTPUT_NODE).readonly())
            .function(FN_PAIR_WITH_OUTPUT, &[ARG_OUTPUT]),
    );
    schema.define(
        TypeDef::new(SIMULATION_OUTPUT_NODE)
            .base(NODE)
            .prop(Prop::int(ACTIVE_INDEX, 0, i64::MAX))
            .prop(Prop::collection(STATE_ITEMS, SIMULATION_STATE_ITEMS, SIMULATION_STATE_ITEM)),
    );
    schema.define(
        TypeDef::collection(SIMULATION_STATE_ITEMS).function(FN_NEW, &[SOCKET_TYPE, NAME]),
    );
    schema.define(
        TypeDef::new(SIMULATION_STATE_ITEM)
            .prop(Prop::string(NAME))
            .prop(Prop::enumeration(SOCKET_TYPE, ITEM_SOCKET_TYPES))
            .prop(Prop::enumeration("attribute_domain", &["POINT", "EDGE", "FACE"])),
    );
    schema.define(
        TypeDef::new(CAPTURE_ATTRIBUTE_NODE)
            .base(NODE)
            .prop(Prop::enumeration("domain", &["POINT", "EDGE", "FACE"]))
            .prop(Prop::int(ACTIVE_INDEX, 0, i64::MAX))
            .prop(Prop::collection(
                CAPTURE_ITEMS,
                CAPTURE_ATTRIBUTE_ITEMS,
                CAPTURE_ATTRIBUTE_ITEM,
            )),
    );
    schema.define(
        TypeDef::collection(CAPTURE_ATTRIBUTE_ITEMS).function(FN_NEW, &[SOCKET_TYPE, NAME]),
    );
    schema.define(
        TypeDef::new(CAPTURE_ATTRIBUTE_ITEM)
            .prop(Prop::string(NAME))
            .prop(Prop::enumeration(DATA_TYPE, &capture_data_types()).with_default("FLOAT")),
    );
    schema.define(
        TypeDef::new(INDEX_SWITCH_NODE)
            .base(NODE)
            .prop(Prop::enumeration(DATA_TYPE, MENU_DATA_TYPES).with_default("GEOMETRY"))
            .prop(Prop::collection(
                INDEX_SWITCH_ITEMS_PROP,
                INDEX_SWITCH_ITEMS,
                INDEX_SWITCH_ITEM,
            )),
    );
    schema.define(TypeDef::collection(INDEX_SWITCH_ITEMS).function(FN_NEW, &[]));
    schema.define(TypeDef::new(INDEX_SWITCH_ITEM));
    schema.define(
        TypeDef::new(FLOAT_CURVE_NODE)
            .base(NODE)
            .prop(Prop::pointer(MAPPING, CURVE_MAPPING).readonly()),
    );
    schema.define(
        TypeDef::new(CURVE_MAPPING)
            .prop(Prop::boolean("use_clip").with_default(true))
            .prop(Prop::enumeration("extend", &["HORIZONTAL", "EXTRAPOLATED"]))
            .prop(Prop::collection(CURVES, CURVE_MAPS, CURVE_MAP))
            .function(FN_UPDATE, &[]),
    );
    schema.define(TypeDef::collection(CURVE_MAPS));
    schema.define(
        TypeDef::new(CURVE_MAP).prop(Prop::collection(POINTS, CURVE_MAP_POINTS, CURVE_MAP_POINT)),
    );
    schema.define(TypeDef::collection(CURVE_MAP_POINTS).function(FN_NEW, &[POSITION, ARG_VALUE]));
    schema.define(
        TypeDef::new(CURVE_MAP_POINT)
            .prop(unbounded(LOCATION).array(2))
            .prop(Prop::enumeration(
                "handle_type",
                &["AUTO", "AUTO_CLAMPED", "VECTOR"],
            ))
            .prop(Prop::boolean("select")),
    );

    schema.define(
        TypeDef::new(COLOR_RAMP)
            .prop(Prop::enumeration("color_mode", &["RGB", "HSV", "HSL"]))
            .prop(Prop::enumeration("interpolation", &["LINEAR", "EASE", "CONSTANT"]))
            .prop(Prop::collection(ELEMENTS, COLOR_RAMP_ELEMENTS, COLOR_RAMP_ELEMENT)),
    );
    schema.define(TypeDef::collection(COLOR_RAMP_ELEMENTS).function(FN_NEW, &[POSITION]));
    schema.define(
        TypeDef::new(COLOR_RAMP_ELEMENT)
            .prop(Prop::float(POSITION, 0.0, 1.0))
            .prop(Prop::float("color", 0.0, 1.0).array(4).with_default(vec![0.0, 0.0, 0.0, 1.0])),
    );

    schema.define(
        TypeDef::new(NODE_SOCKET)
            .prop(Prop::string(NAME))
            .prop(Prop::string(IDENTIFIER).readonly())
            .prop(Prop::boolean(ENABLED).readonly().with_default(true))
            .prop(Prop::boolean("hide"))
            .prop(Prop::boolean(IS_MULTI_INPUT).readonly())
            .prop(Prop::pointer(NODE_PROP, NODE).readonly()),
    );
    schema.define(
        TypeDef::new(SOCKET_FLOAT)
            .base(NODE_SOCKET)
            .prop(unbounded(DEFAULT_VALUE)),
    );
    schema.define(
        TypeDef::new(SOCKET_FACTOR)
            .base(SOCKET_FLOAT)
            .prop(Prop::float(DEFAULT_VALUE, 0.0, 1.0).with_default(0.5)),
    );
    schema.define(
        TypeDef::new(SOCKET_INT)
            .base(NODE_SOCKET)
            .prop(Prop::int(DEFAULT_VALUE, i64::MIN, i64::MAX)),
    );
    schema.define(
        TypeDef::new(SOCKET_VECTOR)
            .base(NODE_SOCKET)
            .prop(Prop::int(DIMENSIONS, 2, 4).with_default(3_i64))
            .prop(unbounded(DEFAULT_VALUE).array(4).with_default(vec![0.0; 3])),
    );
    schema.define(
        TypeDef::new(SOCKET_COLOR)
            .base(NODE_SOCKET)
            .prop(
                Prop::float(DEFAULT_VALUE, 0.0, f64::INFINITY)
                    .array(4)
                    .with_default(vec![0.8, 0.8, 0.8, 1.0]),
            ),
    );
    schema.define(TypeDef::new(SOCKET_GEOMETRY).base(NODE_SOCKET));
    schema.define(
        TypeDef::new(SOCKET_MATERIAL)
            .base(NODE_SOCKET)
            .prop(Prop::pointer(DEFAULT_VALUE, MATERIAL)),
    );
    schema.define(
        TypeDef::new(SOCKET_IMAGE)
            .base(NODE_SOCKET)
            .prop(Prop::pointer(DEFAULT_VALUE, IMAGE)),
    );
    schema.define(
        TypeDef::new(SOCKET_MENU)
            .base(NODE_SOCKET)
            .prop(Prop::enumeration(DEFAULT_VALUE, &[])),
    );

    schema.define(
        TypeDef::new(NODE_LINK)
            .prop(Prop::pointer(FROM_NODE, NODE).readonly())
            .prop(Prop::pointer(FROM_SOCKET, NODE_SOCKET).readonly())
            .prop(Prop::pointer(TO_NODE, NODE).readonly())
            .prop(Prop::pointer(TO_SOCKET, NODE_SOCKET).readonly())
            .prop(Prop::boolean("is_valid").readonly().with_default(true))
            .prop(Prop::boolean("is_muted"))
            .prop(Prop::boolean("is_hidden"))
            .prop(Prop::int(MULTI_INPUT_SORT_ID, 0, i64::MAX).readonly())
            .function(FN_SWAP_MULTI_INPUT_SORT_ID, &[ARG_OTHER]),
    );

    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_base_is_defined() {
        let schema = node_graph_schema();
        for def in schema.types() {
            for base in &def.bases {
                assert!(schema.contains(base), "{} derives from missing {base}", def.name);
            }
            for prop in &def.properties {
                for referenced in prop.fixed_type.iter().chain(&prop.container_type) {
                    assert!(schema.contains(referenced), "{}.{} names {referenced}", def.name, prop.identifier);
                }
            }
        }
    }

    #[test]
    fn factor_socket_narrows_range() {
        let schema = node_graph_schema();
        let factor = schema.property(SOCKET_FACTOR, DEFAULT_VALUE).unwrap();
        assert_eq!((factor.hard_min, factor.hard_max), (0.0, 1.0));
        assert!(schema.is_a(SOCKET_FACTOR, NODE_SOCKET));
    }

    #[test]
    fn item_collections_need_arguments() {
        let schema = node_graph_schema();
        assert!(schema.requires_arguments(NODES));
        assert!(schema.requires_arguments(COLOR_RAMP_ELEMENTS));
        assert!(!schema.requires_arguments(INTERFACE_ITEMS));
    }
}
