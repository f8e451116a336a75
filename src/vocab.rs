//! Names of the host types, properties, functions and registries the codec
//! and its built-in handlers refer to.
//!
//! Hosts that model a node-graph editor publish their schema under these
//! names; the generic traversal itself only relies on the handful marked in
//! [`crate::export`] and [`crate::import`].

// ---------------------------------------------------------------------------
// Global registries
// ---------------------------------------------------------------------------

pub const NODE_GROUPS: &str = "node_groups";
pub const MATERIALS: &str = "materials";
pub const SCENES: &str = "scenes";
pub const IMAGES: &str = "images";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

pub const ID: &str = "ID";
pub const NODE_TREE: &str = "NodeTree";
pub const GEOMETRY_NODE_TREE: &str = "GeometryNodeTree";
pub const SHADER_NODE_TREE: &str = "ShaderNodeTree";
pub const MATERIAL: &str = "Material";
pub const IMAGE: &str = "Image";
pub const SCENE: &str = "Scene";
pub const RENDER_SETTINGS: &str = "RenderSettings";
pub const VIEW_LAYER: &str = "ViewLayer";
pub const VIEW_LAYERS: &str = "ViewLayers";
pub const VIEW_LAYER_CYCLES: &str = "CyclesRenderLayerSettings";
pub const AOVS: &str = "AOVs";
pub const AOV: &str = "AOV";
pub const LIGHTGROUPS: &str = "Lightgroups";
pub const LIGHTGROUP: &str = "Lightgroup";

pub const NODE: &str = "Node";
pub const NODES: &str = "Nodes";
pub const NODE_LINK: &str = "NodeLink";
pub const NODE_LINKS: &str = "NodeLinks";
pub const NODE_INPUTS: &str = "NodeInputs";
pub const NODE_OUTPUTS: &str = "NodeOutputs";
pub const NODE_SOCKET: &str = "NodeSocket";

pub const INTERFACE: &str = "NodeTreeInterface";
pub const INTERFACE_ITEMS: &str = "NodeTreeInterfaceItems";
pub const INTERFACE_ITEM: &str = "NodeTreeInterfaceItem";
pub const INTERFACE_SOCKET: &str = "NodeTreeInterfaceSocket";
pub const INTERFACE_PANEL: &str = "NodeTreeInterfacePanel";

pub const VALUE_NODE: &str = "ValueNode";
pub const MATH_NODE: &str = "MathNode";
pub const FRAME_NODE: &str = "FrameNode";
pub const GROUP_NODE: &str = "GroupNode";
pub const GROUP_INPUT_NODE: &str = "GroupInputNode";
pub const GROUP_OUTPUT_NODE: &str = "GroupOutputNode";
pub const JOIN_GEOMETRY_NODE: &str = "JoinGeometryNode";
pub const SET_MATERIAL_NODE: &str = "SetMaterialNode";
pub const IMAGE_TEXTURE_NODE: &str = "ImageTextureNode";
pub const RENDER_LAYERS_NODE: &str = "RenderLayersNode";
pub const COLOR_RAMP_NODE: &str = "ColorRampNode";
pub const REPEAT_INPUT_NODE: &str = "RepeatInputNode";
pub const REPEAT_OUTPUT_NODE: &str = "RepeatOutputNode";
pub const VIEWER_NODE: &str = "ViewerNode";
pub const MENU_SWITCH_NODE: &str = "MenuSwitchNode";
pub const SIMULATION_INPUT_NODE: &str = "SimulationInputNode";
pub const SIMULATION_OUTPUT_NODE: &str = "SimulationOutputNode";
pub const CAPTURE_ATTRIBUTE_NODE: &str = "CaptureAttributeNode";
pub const INDEX_SWITCH_NODE: &str = "IndexSwitchNode";
pub const FLOAT_CURVE_NODE: &str = "FloatCurveNode";

pub const REPEAT_ITEMS: &str = "RepeatItems";
pub const REPEAT_ITEM: &str = "RepeatItem";
pub const VIEWER_ITEMS: &str = "ViewerItems";
pub const VIEWER_ITEM: &str = "ViewerItem";
pub const MENU_SWITCH_ITEMS: &str = "MenuSwitchItems";
pub const MENU_SWITCH_ITEM: &str = "MenuSwitchItem";
pub const SIMULATION_STATE_ITEMS: &str = "SimulationStateItems";
pub const SIMULATION_STATE_ITEM: &str = "SimulationStateItem";
pub const CAPTURE_ATTRIBUTE_ITEMS: &str = "CaptureAttributeItems";
pub const CAPTURE_ATTRIBUTE_ITEM: &str = "CaptureAttributeItem";
pub const INDEX_SWITCH_ITEMS: &str = "IndexSwitchItems";
pub const INDEX_SWITCH_ITEM: &str = "IndexSwitchItem";

pub const COLOR_RAMP: &str = "ColorRamp";
pub const COLOR_RAMP_ELEMENTS: &str = "ColorRampElements";
pub const COLOR_RAMP_ELEMENT: &str = "ColorRampElement";

pub const CURVE_MAPPING: &str = "CurveMapping";
pub const CURVE_MAPS: &str = "CurveMaps";
pub const CURVE_MAP: &str = "CurveMap";
pub const CURVE_MAP_POINTS: &str = "CurveMapPoints";
pub const CURVE_MAP_POINT: &str = "CurveMapPoint";

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

pub const NAME: &str = "name";
pub const IDNAME: &str = "idname";
pub const DESCRIPTION: &str = "description";
pub const INDEX: &str = "index";
pub const NODES_PROP: &str = "nodes";
pub const LINKS: &str = "links";
pub const INTERFACE_PROP: &str = "interface";
pub const ITEMS_TREE: &str = "items_tree";
pub const INPUTS: &str = "inputs";
pub const OUTPUTS: &str = "outputs";
pub const PARENT: &str = "parent";
pub const PARENT_INDEX: &str = "parent_index";
pub const ACTIVE: &str = "active";
pub const IDENTIFIER: &str = "identifier";
pub const DEFAULT_VALUE: &str = "default_value";
pub const DIMENSIONS: &str = "dimensions";
pub const ENABLED: &str = "enabled";
pub const SOCKET_TYPE: &str = "socket_type";
pub const IN_OUT: &str = "in_out";
pub const ITEM_TYPE: &str = "item_type";
pub const DEFAULT_CLOSED: &str = "default_closed";
pub const IS_MULTI_INPUT: &str = "is_multi_input";
pub const FROM_NODE: &str = "from_node";
pub const FROM_SOCKET: &str = "from_socket";
pub const TO_NODE: &str = "to_node";
pub const TO_SOCKET: &str = "to_socket";
pub const MULTI_INPUT_SORT_ID: &str = "multi_input_sort_id";
pub const NODE_TREE_PROP: &str = "node_tree";
pub const USE_NODES: &str = "use_nodes";
pub const PAIRED_OUTPUT: &str = "paired_output";
pub const REPEAT_ITEMS_PROP: &str = "repeat_items";
pub const VIEWER_ITEMS_PROP: &str = "viewer_items";
pub const ENUM_ITEMS: &str = "enum_items";
pub const STATE_ITEMS: &str = "state_items";
pub const CAPTURE_ITEMS: &str = "capture_items";
pub const INDEX_SWITCH_ITEMS_PROP: &str = "index_switch_items";
pub const ACTIVE_INDEX: &str = "active_index";
pub const MAPPING: &str = "mapping";
pub const CURVES: &str = "curves";
pub const POINTS: &str = "points";
pub const LOCATION: &str = "location";
pub const AUTO_REMOVE: &str = "auto_remove";
pub const DATA_TYPE: &str = "data_type";
pub const COLOR_RAMP_PROP: &str = "color_ramp";
pub const ELEMENTS: &str = "elements";
pub const POSITION: &str = "position";
pub const RENDER: &str = "render";
pub const ENGINE: &str = "engine";
pub const VIEW_LAYERS_PROP: &str = "view_layers";
pub const PASS_CRYPTOMATTE_DEPTH: &str = "pass_cryptomatte_depth";
pub const CYCLES: &str = "cycles";
pub const AOVS_PROP: &str = "aovs";
pub const LIGHTGROUPS_PROP: &str = "lightgroups";
pub const NODE_PROP: &str = "node";
pub const SCENE_PROP: &str = "scene";
pub const LAYER: &str = "layer";

// ---------------------------------------------------------------------------
// Constructor arguments and functions
// ---------------------------------------------------------------------------

pub const ARG_TYPE: &str = "type";
pub const ARG_INPUT: &str = "input";
pub const ARG_OUTPUT: &str = "output";
pub const ARG_ITEM: &str = "item";
pub const ARG_PARENT: &str = "parent";
pub const ARG_TO_POSITION: &str = "to_position";
pub const ARG_OTHER: &str = "other";
pub const ARG_VALUE: &str = "value";

pub const FN_NEW: &str = "new";
pub const FN_NEW_SOCKET: &str = "new_socket";
pub const FN_NEW_PANEL: &str = "new_panel";
pub const FN_MOVE_TO_PARENT: &str = "move_to_parent";
pub const FN_PAIR_WITH_OUTPUT: &str = "pair_with_output";
pub const FN_SWAP_MULTI_INPUT_SORT_ID: &str = "swap_multi_input_sort_id";
pub const FN_UPDATE: &str = "update";

// ---------------------------------------------------------------------------
// Enum values
// ---------------------------------------------------------------------------

pub const ITEM_SOCKET: &str = "SOCKET";
pub const ITEM_PANEL: &str = "PANEL";
pub const IN_OUT_INPUT: &str = "INPUT";
pub const IN_OUT_OUTPUT: &str = "OUTPUT";

/// Socket type a capture item of each attribute data type is created with.
pub const CAPTURE_SOCKET_TYPES: &[(&str, &str)] = &[
    ("FLOAT", "NodeSocketFloat"),
    ("INT", "NodeSocketInt"),
    ("FLOAT_VECTOR", "NodeSocketVector"),
];
