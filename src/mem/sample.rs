//! Ready-made graphs for the CLI demo, benchmarks and tests.

use crate::error::HostResult;
use crate::host::{Args, Host, Scalar};
use crate::vocab::*;

use super::schema::*;
use super::{MemHandle, MemHost};

/// Names of the globals [`showcase`] creates.
pub const MAIN_TREE: &str = "Main";
pub const SUB_TREE: &str = "Sub";
pub const MATERIAL_NAME: &str = "Steel";
pub const IMAGE_NAME: &str = "Bricks";
pub const SCENE_NAME: &str = "Scene";
/// Name of the tree [`fields`] creates.
pub const FIELDS_TREE: &str = "Fields";

/// A host holding one geometry tree that exercises every built-in handler:
/// a nested group, a frame, a repeat zone, a menu switch, a viewer, a
/// multi-input join, a color ramp, a render-layers node and a material with
/// an embedded shader tree. Returns the host and the main tree.
pub fn showcase() -> HostResult<(MemHost, MemHandle)> {
    let mut host = MemHost::new();

    let image = host.new_image(IMAGE_NAME)?;
    host.set_scalar(&image, "filepath", Scalar::from("//textures/bricks.png"))?;

    let material = host.new_material(MATERIAL_NAME)?;
    host.set_scalar(&material, USE_NODES, Scalar::Bool(true))?;
    if let Some(shader) = host.get_pointer(&material, NODE_TREE_PROP)? {
        let texture = host.add_node(&shader, IMAGE_TEXTURE_NODE)?;
        host.set_pointer(&texture, "image", Some(&image))?;
        let ramp = host.add_node(&shader, COLOR_RAMP_NODE)?;
        host.link(&shader, &texture, 1, &ramp, 0)?;
    }

    let scene = host.new_scene(SCENE_NAME, "CYCLES")?;
    let layers = host.get_collection(&scene, VIEW_LAYERS_PROP)?;
    host.construct(&layers, &Args::new().scalar(NAME, "Shadows"))?;

    let sub = host.new_tree(GEOMETRY_NODE_TREE, SUB_TREE)?;
    host.add_interface_socket(&sub, "Size", IN_OUT_INPUT, SOCKET_FLOAT)?;
    host.add_interface_socket(&sub, "Mesh", IN_OUT_OUTPUT, SOCKET_GEOMETRY)?;
    host.add_node(&sub, GROUP_INPUT_NODE)?;
    let sub_out = host.add_node(&sub, GROUP_OUTPUT_NODE)?;
    host.set_scalar(&sub_out, "location", Scalar::from(vec![300.0, 0.0]))?;

    let main = host.new_tree(GEOMETRY_NODE_TREE, MAIN_TREE)?;
    host.set_scalar(&main, DESCRIPTION, Scalar::from("Everything at once"))?;
    host.add_interface_socket(&main, "Geometry", IN_OUT_INPUT, SOCKET_GEOMETRY)?;
    host.add_interface_socket(&main, "Geometry", IN_OUT_OUTPUT, SOCKET_GEOMETRY)?;
    let panel = host.add_panel(&main, "Settings")?;
    let scale = host.add_interface_socket(&main, "Scale", IN_OUT_INPUT, SOCKET_FLOAT)?;
    host.set_scalar(&scale, DEFAULT_VALUE, Scalar::Float(2.0))?;
    host.move_into_panel(&main, &scale, &panel)?;
    let offset = host.add_interface_socket(&main, "Offset", IN_OUT_INPUT, SOCKET_VECTOR)?;
    host.set_scalar(&offset, DIMENSIONS, Scalar::Int(2))?;

    let group_in = host.add_node(&main, GROUP_INPUT_NODE)?;
    let group_out = host.add_node(&main, GROUP_OUTPUT_NODE)?;
    host.set_scalar(&group_out, "location", Scalar::from(vec![900.0, 0.0]))?;

    let frame = host.add_node(&main, FRAME_NODE)?;
    host.set_scalar(&frame, "label", Scalar::from("Math"))?;
    let value = host.add_node(&main, VALUE_NODE)?;
    let value_out = host.output(&value, 0)?;
    host.set_scalar(&value_out, DEFAULT_VALUE, Scalar::Float(0.25))?;
    let math = host.add_node(&main, MATH_NODE)?;
    host.set_scalar(&math, "operation", Scalar::from("MULTIPLY"))?;
    host.set_pointer(&value, PARENT, Some(&frame))?;
    host.set_pointer(&math, PARENT, Some(&frame))?;
    host.link(&main, &value, 0, &math, 0)?;

    let group = host.add_node(&main, GROUP_NODE)?;
    host.set_pointer(&group, NODE_TREE_PROP, Some(&sub))?;
    host.link(&main, &math, 0, &group, 0)?;

    let join = host.add_node(&main, JOIN_GEOMETRY_NODE)?;
    host.link(&main, &group_in, 0, &join, 0)?;
    host.link(&main, &group, 0, &join, 0)?;

    let set_material = host.add_node(&main, SET_MATERIAL_NODE)?;
    let material_in = host.input(&set_material, 1)?;
    host.set_pointer(&material_in, DEFAULT_VALUE, Some(&material))?;
    host.link(&main, &join, 0, &set_material, 0)?;

    let repeat_in = host.add_node(&main, REPEAT_INPUT_NODE)?;
    let repeat_out = host.add_node(&main, REPEAT_OUTPUT_NODE)?;
    let items = host.get_collection(&repeat_out, REPEAT_ITEMS_PROP)?;
    host.construct(
        &items,
        &Args::new().scalar(SOCKET_TYPE, SOCKET_FLOAT).scalar(NAME, "Scale"),
    )?;
    host.invoke(
        &repeat_in,
        FN_PAIR_WITH_OUTPUT,
        &Args::new().handle(ARG_OUTPUT, Some(repeat_out.clone())),
    )?;
    let iterations = host.input(&repeat_in, 0)?;
    host.set_scalar(&iterations, DEFAULT_VALUE, Scalar::Int(3))?;
    host.link(&main, &set_material, 0, &repeat_in, 1)?;
    host.link(&main, &repeat_in, 0, &repeat_out, 0)?;

    let menu = host.add_node(&main, MENU_SWITCH_NODE)?;
    let menu_in = host.input(&menu, 0)?;
    host.set_scalar(&menu_in, DEFAULT_VALUE, Scalar::from("B"))?;
    host.link(&main, &repeat_out, 0, &menu, 1)?;
    host.link(&main, &menu, 0, &group_out, 0)?;

    let viewer = host.add_node(&main, VIEWER_NODE)?;
    host.link(&main, &repeat_out, 0, &viewer, 0)?;

    let ramp = host.add_node(&main, COLOR_RAMP_NODE)?;
    if let Some(color_ramp) = host.get_pointer(&ramp, COLOR_RAMP_PROP)? {
        host.set_scalar(&color_ramp, "interpolation", Scalar::from("EASE"))?;
        let elements = host.get_collection(&color_ramp, ELEMENTS)?;
        host.construct(&elements, &Args::new().scalar(POSITION, 0.5))?;
    }

    let render_layers = host.add_node(&main, RENDER_LAYERS_NODE)?;
    host.set_pointer(&render_layers, SCENE_PROP, Some(&scene))?;
    host.set_scalar(&render_layers, LAYER, Scalar::from("Shadows"))?;

    let nodes = host.get_collection(&main, NODES_PROP)?;
    host.set_pointer(&nodes, ACTIVE, Some(&math))?;

    Ok((host, main))
}

/// A geometry tree with a simulation zone around a capture attribute node,
/// an index switch and a float curve with two interior points. Returns the
/// host and the tree.
pub fn fields() -> HostResult<(MemHost, MemHandle)> {
    let mut host = MemHost::new();
    let tree = host.new_tree(GEOMETRY_NODE_TREE, FIELDS_TREE)?;

    let sim_in = host.add_node(&tree, SIMULATION_INPUT_NODE)?;
    let sim_out = host.add_node(&tree, SIMULATION_OUTPUT_NODE)?;
    let state = host.get_collection(&sim_out, STATE_ITEMS)?;
    let velocity = host.construct(
        &state,
        &Args::new().scalar(SOCKET_TYPE, SOCKET_VECTOR).scalar(NAME, "Velocity"),
    )?;
    host.set_scalar(&velocity, "attribute_domain", Scalar::from("FACE"))?;
    host.set_scalar(&sim_out, ACTIVE_INDEX, Scalar::Int(1))?;
    host.invoke(
        &sim_in,
        FN_PAIR_WITH_OUTPUT,
        &Args::new().handle(ARG_OUTPUT, Some(sim_out.clone())),
    )?;

    let capture = host.add_node(&tree, CAPTURE_ATTRIBUTE_NODE)?;
    host.set_scalar(&capture, "domain", Scalar::from("FACE"))?;
    let captured = host.get_collection(&capture, CAPTURE_ITEMS)?;
    host.construct(
        &captured,
        &Args::new().scalar(SOCKET_TYPE, SOCKET_VECTOR).scalar(NAME, "Normal"),
    )?;
    host.construct(
        &captured,
        &Args::new().scalar(SOCKET_TYPE, SOCKET_INT).scalar(NAME, "Index"),
    )?;
    host.set_scalar(&capture, ACTIVE_INDEX, Scalar::Int(2))?;
    host.link(&tree, &sim_in, 1, &capture, 0)?;
    host.link(&tree, &capture, 0, &sim_out, 0)?;

    let switch = host.add_node(&tree, INDEX_SWITCH_NODE)?;
    host.set_scalar(&switch, DATA_TYPE, Scalar::from("FLOAT"))?;
    let options = host.get_collection(&switch, INDEX_SWITCH_ITEMS_PROP)?;
    host.construct(&options, &Args::new())?;
    let index = host.input(&switch, 0)?;
    host.set_scalar(&index, DEFAULT_VALUE, Scalar::Int(2))?;

    let curve = host.add_node(&tree, FLOAT_CURVE_NODE)?;
    if let Some(mapping) = host.get_pointer(&curve, MAPPING)? {
        host.set_scalar(&mapping, "extend", Scalar::from("EXTRAPOLATED"))?;
        let curves = host.get_collection(&mapping, CURVES)?;
        let points = host.get_collection(&host.element(&curves, 0)?, POINTS)?;
        for (x, y) in [(0.7, 0.4), (0.25, 0.6)] {
            let args = Args::new().scalar(POSITION, x).scalar(ARG_VALUE, y);
            host.construct(&points, &args)?;
        }
        let sharp = host.element(&points, 2)?;
        host.set_scalar(&sharp, "handle_type", Scalar::from("VECTOR"))?;
    }
    host.link(&tree, &curve, 0, &switch, 3)?;

    Ok((host, tree))
}

/// A tree of `count` math nodes fed one into the next.
pub fn math_chain(count: usize) -> HostResult<(MemHost, MemHandle)> {
    let mut host = MemHost::new();
    let tree = host.new_tree(GEOMETRY_NODE_TREE, "Chain")?;
    let mut previous = host.add_node(&tree, VALUE_NODE)?;
    for i in 0..count {
        let math = host.add_node(&tree, MATH_NODE)?;
        host.set_scalar(&math, "location", Scalar::from(vec![i as f64 * 160.0, 0.0]))?;
        host.link(&tree, &previous, 0, &math, 0)?;
        previous = math;
    }
    Ok((host, tree))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn showcase_builds() {
        let (host, main) = showcase().unwrap();
        let nodes = host.get_collection(&main, NODES_PROP).unwrap();
        assert_eq!(host.collection_len(&nodes).unwrap(), 14);
        let links = host.get_collection(&main, LINKS).unwrap();
        assert_eq!(host.collection_len(&links).unwrap(), 10);
        assert_eq!(host.global_names(NODE_GROUPS), [SUB_TREE, MAIN_TREE]);
    }

    #[test]
    fn fields_builds() {
        let (host, tree) = fields().unwrap();
        let nodes = host.get_collection(&tree, NODES_PROP).unwrap();
        assert_eq!(host.collection_len(&nodes).unwrap(), 5);
        let links = host.get_collection(&tree, LINKS).unwrap();
        assert_eq!(host.collection_len(&links).unwrap(), 3);
    }

    #[test]
    fn chain_links_every_node() {
        let (host, tree) = math_chain(10).unwrap();
        let links = host.get_collection(&tree, LINKS).unwrap();
        assert_eq!(host.collection_len(&links).unwrap(), 10);
    }
}
