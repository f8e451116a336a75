//! Node-graph behaviour of the reference host: socket layouts, item
//! collections, links, tree interfaces and the functions nodes expose.

use crate::error::{HostError, HostResult};
use crate::host::{Args, Scalar};
use crate::vocab::*;

use super::model::{Slot, Store};
use super::schema::*;
use super::{MemHandle, MemHost, ObjectId, invalid, rejected};

/// Element type created by each constructible item collection.
const ITEM_TYPES: &[(&str, &str)] = &[
    (REPEAT_ITEMS, REPEAT_ITEM),
    (VIEWER_ITEMS, VIEWER_ITEM),
    (MENU_SWITCH_ITEMS, MENU_SWITCH_ITEM),
    (SIMULATION_STATE_ITEMS, SIMULATION_STATE_ITEM),
    (CAPTURE_ATTRIBUTE_ITEMS, CAPTURE_ATTRIBUTE_ITEM),
    (INDEX_SWITCH_ITEMS, INDEX_SWITCH_ITEM),
    (COLOR_RAMP_ELEMENTS, COLOR_RAMP_ELEMENT),
    (CURVE_MAP_POINTS, CURVE_MAP_POINT),
    (AOVS, AOV),
    (LIGHTGROUPS, LIGHTGROUP),
];

/// Item collections whose elements each produce a socket on their node.
const SOCKET_ITEMS: &[&str] = &[
    REPEAT_ITEMS,
    VIEWER_ITEMS,
    MENU_SWITCH_ITEMS,
    SIMULATION_STATE_ITEMS,
    CAPTURE_ATTRIBUTE_ITEMS,
    INDEX_SWITCH_ITEMS,
];

/// A socket a node should have.
#[derive(Debug, Clone)]
pub(crate) struct SocketSpec {
    socket_type: String,
    name: String,
    identifier: String,
    multi_input: bool,
    enabled: bool,
    default: Option<Scalar>,
}

impl SocketSpec {
    fn new(socket_type: &str, name: &str) -> Self {
        Self {
            socket_type: socket_type.to_string(),
            name: name.to_string(),
            identifier: name.to_string(),
            multi_input: false,
            enabled: true,
            default: None,
        }
    }

    fn identified(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    fn multi(mut self) -> Self {
        self.multi_input = true;
        self
    }

    fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    fn with_default(mut self, value: impl Into<Scalar>) -> Self {
        self.default = Some(value.into());
        self
    }
}

type Layout = (Vec<SocketSpec>, Vec<SocketSpec>);

/// Sockets of node types whose layout never changes.
fn static_layout(node_type: &str) -> Layout {
    let s = SocketSpec::new;
    match node_type {
        VALUE_NODE => (vec![], vec![s(SOCKET_FLOAT, "Value")]),
        MATH_NODE => (
            vec![
                s(SOCKET_FLOAT, "Value").with_default(0.5),
                s(SOCKET_FLOAT, "Value").identified("Value_001").with_default(0.5),
                s(SOCKET_FLOAT, "Value").identified("Value_002").disabled(),
            ],
            vec![s(SOCKET_FLOAT, "Value")],
        ),
        JOIN_GEOMETRY_NODE => (
            vec![s(SOCKET_GEOMETRY, "Geometry").multi()],
            vec![s(SOCKET_GEOMETRY, "Geometry")],
        ),
        SET_MATERIAL_NODE => (
            vec![s(SOCKET_GEOMETRY, "Geometry"), s(SOCKET_MATERIAL, "Material")],
            vec![s(SOCKET_GEOMETRY, "Geometry")],
        ),
        IMAGE_TEXTURE_NODE => (
            vec![s(SOCKET_VECTOR, "Vector")],
            vec![s(SOCKET_COLOR, "Color"), s(SOCKET_FACTOR, "Alpha")],
        ),
        RENDER_LAYERS_NODE => (
            vec![],
            vec![
                s(SOCKET_COLOR, "Image"),
                s(SOCKET_FACTOR, "Alpha").disabled(),
                s(SOCKET_FLOAT, "Depth"),
            ],
        ),
        COLOR_RAMP_NODE => (
            vec![s(SOCKET_FACTOR, "Fac")],
            vec![s(SOCKET_COLOR, "Color"), s(SOCKET_FACTOR, "Alpha")],
        ),
        FLOAT_CURVE_NODE => (
            vec![
                s(SOCKET_FACTOR, "Factor").with_default(1.0),
                s(SOCKET_FLOAT, "Value").with_default(1.0),
            ],
            vec![s(SOCKET_FLOAT, "Value")],
        ),
        _ => (vec![], vec![]),
    }
}

/// Node type a zone input of `input_type` pairs with.
fn zone_output_type(input_type: &str) -> Option<&'static str> {
    match input_type {
        REPEAT_INPUT_NODE => Some(REPEAT_OUTPUT_NODE),
        SIMULATION_INPUT_NODE => Some(SIMULATION_OUTPUT_NODE),
        _ => None,
    }
}

/// Items of a zone output, by output type.
fn zone_items(output_type: &str) -> &'static str {
    match output_type {
        SIMULATION_OUTPUT_NODE => STATE_ITEMS,
        _ => REPEAT_ITEMS_PROP,
    }
}

fn capture_data_type(socket_type: &str) -> Option<&'static str> {
    CAPTURE_SOCKET_TYPES
        .iter()
        .find(|(_, s)| *s == socket_type)
        .map(|(data_type, _)| *data_type)
}

fn capture_socket_type(data_type: &str) -> &'static str {
    CAPTURE_SOCKET_TYPES
        .iter()
        .find(|(d, _)| *d == data_type)
        .map_or(SOCKET_FLOAT, |(_, socket_type)| *socket_type)
}

/// Sockets of `data_type` on menu and index switches.
fn switch_socket_type(data_type: &str) -> &'static str {
    match data_type {
        "FLOAT" => SOCKET_FLOAT,
        _ => SOCKET_GEOMETRY,
    }
}

fn element_type(container_type: &str) -> Option<&'static str> {
    ITEM_TYPES
        .iter()
        .find(|(container, _)| *container == container_type)
        .map(|(_, element)| *element)
}

impl MemHost {
    // -- Creation -----------------------------------------------------------

    /// Type-specific content of a freshly instantiated object.
    pub(crate) fn populate(&mut self, id: ObjectId) -> HostResult<()> {
        let object = self.store.get(id)?;
        let type_name = object.type_name.clone();
        let root = object.root;
        let is_tree = self.schema.is_a(&type_name, NODE_TREE);
        let is_node = self.schema.is_a(&type_name, NODE);

        if is_tree {
            self.store
                .put(id, IDNAME, Slot::Scalar(Scalar::from(type_name.as_str())))?;
            let interface = self.instantiate(INTERFACE, Some(root), Some(id))?;
            self.store.put(id, INTERFACE_PROP, Slot::Pointer(Some(interface)))?;
        } else if is_node {
            self.store
                .put(id, IDNAME, Slot::Scalar(Scalar::from(type_name.as_str())))?;
            match type_name.as_str() {
                COLOR_RAMP_NODE => {
                    let ramp = self.instantiate(COLOR_RAMP, Some(root), Some(id))?;
                    self.store.put(id, COLOR_RAMP_PROP, Slot::Pointer(Some(ramp)))?;
                    let elements = self.store.collection(ramp, ELEMENTS)?;
                    let first = self.push_item(elements, None)?;
                    let last = self.push_item(elements, None)?;
                    self.store.put(
                        last,
                        POSITION,
                        Slot::Scalar(Scalar::Float(1.0)),
                    )?;
                    self.store.put(
                        last,
                        "color",
                        Slot::Scalar(Scalar::from(vec![1.0, 1.0, 1.0, 1.0])),
                    )?;
                    self.store
                        .put(first, POSITION, Slot::Scalar(Scalar::Float(0.0)))?;
                }
                REPEAT_OUTPUT_NODE | SIMULATION_OUTPUT_NODE => {
                    let items = self.store.collection(id, zone_items(&type_name))?;
                    let item = self.push_item(items, Some(SOCKET_GEOMETRY))?;
                    self.store.put(item, NAME, Slot::Scalar(Scalar::from("Geometry")))?;
                }
                CAPTURE_ATTRIBUTE_NODE => {
                    let items = self.store.collection(id, CAPTURE_ITEMS)?;
                    let item = self.push_item(items, None)?;
                    self.store.put(item, NAME, Slot::Scalar(Scalar::from("Attribute")))?;
                }
                INDEX_SWITCH_NODE => {
                    let items = self.store.collection(id, INDEX_SWITCH_ITEMS_PROP)?;
                    self.push_item(items, None)?;
                    self.push_item(items, None)?;
                }
                FLOAT_CURVE_NODE => {
                    let mapping = self.instantiate(CURVE_MAPPING, Some(root), Some(id))?;
                    self.store.put(id, MAPPING, Slot::Pointer(Some(mapping)))?;
                    let curves = self.store.collection(mapping, CURVES)?;
                    let curve = self.instantiate(CURVE_MAP, Some(root), Some(curves))?;
                    self.store.get_mut(curves)?.elements.push(curve);
                    let points = self.store.collection(curve, POINTS)?;
                    for (x, y) in [(0.0, 0.0), (1.0, 1.0)] {
                        self.new_curve_point(points, x, y)?;
                    }
                }
                VIEWER_NODE => {
                    let items = self.store.collection(id, VIEWER_ITEMS_PROP)?;
                    let item = self.push_item(items, Some(SOCKET_GEOMETRY))?;
                    self.store.put(item, NAME, Slot::Scalar(Scalar::from("Geometry")))?;
                }
                MENU_SWITCH_NODE => {
                    let items = self.store.collection(id, ENUM_ITEMS)?;
                    for name in ["A", "B"] {
                        let item = self.push_item(items, None)?;
                        self.store.put(item, NAME, Slot::Scalar(Scalar::from(name)))?;
                    }
                }
                _ => {}
            }
            self.sync_sockets(id)?;
        } else if type_name == SCENE {
            let render = self.instantiate(RENDER_SETTINGS, Some(root), Some(id))?;
            self.store.put(id, RENDER, Slot::Pointer(Some(render)))?;
            let layers = self.store.collection(id, VIEW_LAYERS_PROP)?;
            let layer = self.instantiate(VIEW_LAYER, Some(root), Some(layers))?;
            self.store
                .put(layer, NAME, Slot::Scalar(Scalar::from("ViewLayer")))?;
            self.store.get_mut(layers)?.elements.push(layer);
        } else if type_name == VIEW_LAYER {
            let cycles = self.instantiate(VIEW_LAYER_CYCLES, Some(root), Some(id))?;
            self.store.put(id, CYCLES, Slot::Pointer(Some(cycles)))?;
        }
        Ok(())
    }

    /// Append a new element to an item collection.
    fn push_item(&mut self, container: ObjectId, socket_type: Option<&str>) -> HostResult<ObjectId> {
        let container_type = self.type_of(container)?;
        let item_type = element_type(&container_type).ok_or_else(|| {
            rejected(format!("construct {container_type}"), "not an item collection")
        })?;
        let root = self.store.get(container)?.root;
        let item = self.instantiate(item_type, Some(root), Some(container))?;
        if let Some(socket_type) = socket_type {
            self.store
                .put(item, SOCKET_TYPE, Slot::Scalar(Scalar::from(socket_type)))?;
        }
        self.store.get_mut(container)?.elements.push(item);
        Ok(item)
    }

    /// Add a point to a curve, keeping the points ordered by x.
    fn new_curve_point(&mut self, points: ObjectId, x: f64, y: f64) -> HostResult<ObjectId> {
        let point = self.push_item(points, None)?;
        self.store
            .put(point, LOCATION, Slot::Scalar(Scalar::from(vec![x, y])))?;
        self.sort_curve_points(points)?;
        Ok(point)
    }

    fn sort_curve_points(&mut self, points: ObjectId) -> HostResult<()> {
        let x_of = |store: &Store, point: ObjectId| match store.scalar(point, LOCATION) {
            Ok(Scalar::FloatArray(location)) => location.first().copied().unwrap_or_default(),
            _ => 0.0,
        };
        let mut elements = self.store.elements(points)?.to_vec();
        elements.sort_by(|a, b| x_of(&self.store, *a).total_cmp(&x_of(&self.store, *b)));
        self.store.get_mut(points)?.elements = elements;
        Ok(())
    }

    // -- Socket layouts -----------------------------------------------------

    fn socket_layout(&self, node: ObjectId) -> HostResult<Layout> {
        let object = self.store.get(node)?;
        let tree = object.root;
        Ok(match object.type_name.as_str() {
            GROUP_NODE => match self.store.pointer(node, NODE_TREE_PROP)? {
                Some(group) => (
                    self.group_specs(group, IN_OUT_INPUT)?,
                    self.group_specs(group, IN_OUT_OUTPUT)?,
                ),
                None => (vec![], vec![]),
            },
            GROUP_INPUT_NODE => (vec![], self.group_specs(tree, IN_OUT_INPUT)?),
            GROUP_OUTPUT_NODE => (self.group_specs(tree, IN_OUT_OUTPUT)?, vec![]),
            REPEAT_OUTPUT_NODE => {
                let items = self.item_specs(node, REPEAT_ITEMS_PROP, None)?;
                (items.clone(), items)
            }
            REPEAT_INPUT_NODE => {
                let items = self.paired_item_specs(node)?;
                let mut inputs =
                    vec![SocketSpec::new(SOCKET_INT, "Iterations").with_default(Scalar::Int(1))];
                inputs.extend(items.iter().cloned());
                (inputs, items)
            }
            SIMULATION_OUTPUT_NODE => {
                let items = self.item_specs(node, STATE_ITEMS, None)?;
                (items.clone(), items)
            }
            SIMULATION_INPUT_NODE => {
                let items = self.paired_item_specs(node)?;
                let mut outputs = vec![SocketSpec::new(SOCKET_FLOAT, "Delta Time")];
                outputs.extend(items.iter().cloned());
                (items, outputs)
            }
            CAPTURE_ATTRIBUTE_NODE => {
                let mut sockets = vec![SocketSpec::new(SOCKET_GEOMETRY, "Geometry")];
                sockets.extend(self.item_specs(node, CAPTURE_ITEMS, None)?);
                (sockets.clone(), sockets)
            }
            INDEX_SWITCH_NODE => {
                let socket_type = switch_socket_type(&self.store.text(node, DATA_TYPE));
                let container = self.store.collection(node, INDEX_SWITCH_ITEMS_PROP)?;
                let mut inputs = vec![SocketSpec::new(SOCKET_INT, "Index").with_default(Scalar::Int(0))];
                for (i, item) in self.store.elements(container)?.iter().enumerate() {
                    inputs.push(
                        SocketSpec::new(socket_type, &i.to_string())
                            .identified(format!("Item_{}", item.0)),
                    );
                }
                (inputs, vec![SocketSpec::new(socket_type, "Output")])
            }
            VIEWER_NODE => (self.item_specs(node, VIEWER_ITEMS_PROP, None)?, vec![]),
            MENU_SWITCH_NODE => {
                let socket_type = switch_socket_type(&self.store.text(node, DATA_TYPE));
                let items = self.item_specs(node, ENUM_ITEMS, Some(socket_type))?;
                let mut menu = SocketSpec::new(SOCKET_MENU, "Menu");
                if let Some(first) = items.first() {
                    menu = menu.with_default(first.name.as_str());
                }
                let mut inputs = vec![menu];
                inputs.extend(items);
                (inputs, vec![SocketSpec::new(socket_type, "Output")])
            }
            other => static_layout(other),
        })
    }

    /// One socket per item of the collection `prop` of `node`.
    fn item_specs(
        &self,
        node: ObjectId,
        prop: &str,
        socket_type: Option<&str>,
    ) -> HostResult<Vec<SocketSpec>> {
        let container = self.store.collection(node, prop)?;
        Ok(self
            .store
            .elements(container)?
            .iter()
            .map(|item| {
                let item_type = match socket_type {
                    Some(t) => t.to_string(),
                    None if self.store.get(*item).is_ok_and(|o| o.type_name == CAPTURE_ATTRIBUTE_ITEM) => {
                        capture_socket_type(&self.store.text(*item, DATA_TYPE)).to_string()
                    }
                    None => self.store.text(*item, SOCKET_TYPE),
                };
                SocketSpec::new(&item_type, &self.store.text(*item, NAME))
                    .identified(format!("Item_{}", item.0))
            })
            .collect())
    }

    /// Item sockets of the output a zone input is paired with.
    fn paired_item_specs(&self, input: ObjectId) -> HostResult<Vec<SocketSpec>> {
        match self.store.pointer(input, PAIRED_OUTPUT)? {
            Some(output) => self.item_specs(output, zone_items(&self.type_of(output)?), None),
            None => Ok(vec![]),
        }
    }

    /// Sockets of `tree`'s interface facing `in_out`.
    fn group_specs(&self, tree: ObjectId, in_out: &str) -> HostResult<Vec<SocketSpec>> {
        let Some(interface) = self.store.pointer(tree, INTERFACE_PROP)? else {
            return Ok(vec![]);
        };
        let items = self.store.collection(interface, ITEMS_TREE)?;
        let mut specs = Vec::new();
        for item in self.store.elements(items)? {
            if self.store.text(*item, ITEM_TYPE) != ITEM_SOCKET
                || self.store.text(*item, IN_OUT) != in_out
            {
                continue;
            }
            let mut spec = SocketSpec::new(
                &self.store.text(*item, SOCKET_TYPE),
                &self.store.text(*item, NAME),
            )
            .identified(format!("Socket_{}", item.0));
            if let Ok(value) = self.store.scalar(*item, DEFAULT_VALUE) {
                if matches!(value, Scalar::Float(_) | Scalar::Int(_)) {
                    spec = spec.with_default(value.clone());
                }
            }
            specs.push(spec);
        }
        Ok(specs)
    }

    /// Bring `node`'s sockets in line with its layout. Sockets whose
    /// identifier and type survive are kept, so are their links.
    pub(crate) fn sync_sockets(&mut self, node: ObjectId) -> HostResult<()> {
        let (inputs, outputs) = self.socket_layout(node)?;
        let dropped_in = self.sync_side(node, INPUTS, &inputs)?;
        let dropped_out = self.sync_side(node, OUTPUTS, &outputs)?;
        if dropped_in || dropped_out {
            let tree = self.store.get(node)?.root;
            self.drop_dead_links(tree)?;
        }
        Ok(())
    }

    fn sync_side(&mut self, node: ObjectId, side: &str, specs: &[SocketSpec]) -> HostResult<bool> {
        let container = self.store.collection(node, side)?;
        let existing = self.store.elements(container)?.to_vec();
        let mut kept = Vec::new();
        let mut sockets = Vec::with_capacity(specs.len());
        for spec in specs {
            let reuse = existing.iter().copied().find(|s| {
                !kept.contains(s)
                    && self.store.text(*s, IDENTIFIER) == spec.identifier
                    && self
                        .store
                        .get(*s)
                        .is_ok_and(|o| o.type_name == spec.socket_type)
            });
            let socket = match reuse {
                Some(socket) => {
                    kept.push(socket);
                    self.store
                        .put(socket, NAME, Slot::Scalar(Scalar::from(spec.name.as_str())))?;
                    socket
                }
                None => self.create_socket(node, container, spec)?,
            };
            sockets.push(socket);
        }
        let mut dropped = false;
        for socket in existing.into_iter().filter(|s| !kept.contains(s)) {
            self.store.kill(socket);
            dropped = true;
        }
        self.store.get_mut(container)?.elements = sockets;
        Ok(dropped)
    }

    fn create_socket(
        &mut self,
        node: ObjectId,
        container: ObjectId,
        spec: &SocketSpec,
    ) -> HostResult<ObjectId> {
        let root = self.store.get(node)?.root;
        let socket = self.instantiate(&spec.socket_type, Some(root), Some(container))?;
        let put = |value: Scalar| Slot::Scalar(value);
        self.store.put(socket, NAME, put(Scalar::from(spec.name.as_str())))?;
        self.store
            .put(socket, IDENTIFIER, put(Scalar::from(spec.identifier.as_str())))?;
        self.store.put(socket, ENABLED, put(Scalar::Bool(spec.enabled)))?;
        self.store
            .put(socket, IS_MULTI_INPUT, put(Scalar::Bool(spec.multi_input)))?;
        self.store.put(socket, NODE_PROP, Slot::Pointer(Some(node)))?;
        if let Some(default) = &spec.default {
            self.store.put(socket, DEFAULT_VALUE, put(default.clone()))?;
        }
        Ok(socket)
    }

    /// Re-derive the sockets of every node that mirrors `tree`'s interface.
    pub(crate) fn sync_group_users(&mut self, tree: ObjectId) -> HostResult<()> {
        let users: Vec<ObjectId> = self
            .store
            .iter()
            .filter(|(_, o)| match o.type_name.as_str() {
                GROUP_NODE => matches!(
                    o.fields.get(NODE_TREE_PROP),
                    Some(Slot::Pointer(Some(t))) if *t == tree
                ),
                GROUP_INPUT_NODE | GROUP_OUTPUT_NODE => o.root == tree,
                _ => false,
            })
            .map(|(id, _)| id)
            .collect();
        for node in users {
            self.sync_sockets(node)?;
        }
        Ok(())
    }

    /// The node owning the item collection `item` lives in, re-synced along
    /// with any repeat input paired to it.
    pub(crate) fn resync_item_owner(&mut self, item: ObjectId) -> HostResult<()> {
        let Some(container) = self.store.get(item)?.parent else {
            return Ok(());
        };
        self.resync_container_owner(container)
    }

    fn resync_container_owner(&mut self, container: ObjectId) -> HostResult<()> {
        let Some(node) = self.store.get(container)?.parent else {
            return Ok(());
        };
        if !self.schema.is_a(&self.type_of(node)?, NODE) {
            return Ok(());
        }
        self.sync_sockets(node)?;
        let paired: Vec<ObjectId> = self
            .store
            .iter()
            .filter(|(_, o)| {
                zone_output_type(&o.type_name).is_some()
                    && matches!(o.fields.get(PAIRED_OUTPUT), Some(Slot::Pointer(Some(p))) if *p == node)
            })
            .map(|(id, _)| id)
            .collect();
        for input in paired {
            self.sync_sockets(input)?;
        }
        Ok(())
    }

    /// Names a menu socket may take, when its node is a menu switch.
    pub(crate) fn menu_items_of_socket(&self, socket: ObjectId) -> HostResult<Option<Vec<String>>> {
        let Some(node) = self.store.pointer(socket, NODE_PROP)? else {
            return Ok(None);
        };
        if self.type_of(node)? != MENU_SWITCH_NODE {
            return Ok(None);
        }
        let items = self.store.collection(node, ENUM_ITEMS)?;
        Ok(Some(
            self.store
                .elements(items)?
                .iter()
                .map(|i| self.store.text(*i, NAME))
                .collect(),
        ))
    }

    /// Point a render-layers node at a layer its scene actually has.
    pub(crate) fn fit_render_layer(&mut self, node: ObjectId) -> HostResult<()> {
        let Some(scene) = self.store.pointer(node, SCENE_PROP)? else {
            return Ok(());
        };
        let layers = self.view_layer_names(scene)?;
        let current = self.store.text(node, LAYER);
        if !layers.contains(&current) {
            let first = layers.first().cloned().unwrap_or_default();
            self.store.put(node, LAYER, Slot::Scalar(Scalar::from(first)))?;
        }
        Ok(())
    }

    /// A viewer item flagged for removal goes away unless something is
    /// linked into its socket.
    pub(crate) fn auto_remove(&mut self, item: ObjectId) -> HostResult<()> {
        let Some(container) = self.store.get(item)?.parent else {
            return Ok(());
        };
        let Some(viewer) = self.store.get(container)?.parent else {
            return Ok(());
        };
        let identifier = format!("Item_{}", item.0);
        let inputs = self.store.collection(viewer, INPUTS)?;
        let socket = self
            .store
            .elements(inputs)?
            .iter()
            .copied()
            .find(|s| self.store.text(*s, IDENTIFIER) == identifier);
        let tree = self.store.get(viewer)?.root;
        let linked = match socket {
            Some(socket) => !self.links_to(tree, socket)?.is_empty(),
            None => false,
        };
        if linked {
            return Ok(());
        }
        self.store.kill(item);
        self.store.get_mut(container)?.elements.retain(|e| *e != item);
        self.resync_container_owner(container)
    }

    // -- Links --------------------------------------------------------------

    fn links_container(&self, tree: ObjectId) -> HostResult<ObjectId> {
        self.store.collection(tree, LINKS)
    }

    /// Links ending at `socket`, in creation order.
    pub(crate) fn links_to(&self, tree: ObjectId, socket: ObjectId) -> HostResult<Vec<ObjectId>> {
        let links = self.links_container(tree)?;
        Ok(self
            .store
            .elements(links)?
            .iter()
            .copied()
            .filter(|l| matches!(self.store.pointer(*l, TO_SOCKET), Ok(Some(s)) if s == socket))
            .collect())
    }

    /// Remove links whose sockets or nodes no longer exist.
    fn drop_dead_links(&mut self, tree: ObjectId) -> HostResult<()> {
        let links = self.links_container(tree)?;
        let all = self.store.elements(links)?.to_vec();
        let (live, dead): (Vec<ObjectId>, Vec<ObjectId>) = all.into_iter().partition(|l| {
            [FROM_NODE, FROM_SOCKET, TO_NODE, TO_SOCKET].iter().all(|p| {
                matches!(self.store.pointer(*l, p), Ok(Some(end)) if self.store.get(end).is_ok())
            })
        });
        for link in dead {
            self.store.kill(link);
        }
        self.store.get_mut(links)?.elements = live;
        Ok(())
    }

    fn socket_side(&self, socket: ObjectId) -> HostResult<String> {
        match self.store.get(socket)?.parent {
            Some(container) => self.type_of(container),
            None => Ok(String::new()),
        }
    }

    fn new_link(&mut self, container: ObjectId, from: ObjectId, to: ObjectId) -> HostResult<ObjectId> {
        let operation = || format!("construct {NODE_LINKS}");
        let tree = self.store.get(container)?.root;
        if self.socket_side(from)? != NODE_OUTPUTS || self.socket_side(to)? != NODE_INPUTS {
            return Err(rejected(operation(), "links go from an output to an input"));
        }
        if self.store.get(from)?.root != tree || self.store.get(to)?.root != tree {
            return Err(rejected(operation(), "both sockets must belong to this tree"));
        }
        let from_node = self.store.pointer(from, NODE_PROP)?;
        let to_node = self.store.pointer(to, NODE_PROP)?;
        if from_node == to_node {
            return Err(rejected(operation(), "a node cannot link to itself"));
        }

        let existing = self.links_to(tree, to)?;
        let sort_id = if self.store.flag(to, IS_MULTI_INPUT) {
            existing.len()
        } else {
            for link in &existing {
                self.store.kill(*link);
            }
            self.store
                .get_mut(container)?
                .elements
                .retain(|l| !existing.contains(l));
            0
        };

        let link = self.instantiate(NODE_LINK, Some(tree), Some(container))?;
        self.store.put(link, FROM_NODE, Slot::Pointer(from_node))?;
        self.store.put(link, FROM_SOCKET, Slot::Pointer(Some(from)))?;
        self.store.put(link, TO_NODE, Slot::Pointer(to_node))?;
        self.store.put(link, TO_SOCKET, Slot::Pointer(Some(to)))?;
        self.store.put(
            link,
            MULTI_INPUT_SORT_ID,
            Slot::Scalar(Scalar::Int(sort_id as i64)),
        )?;
        self.store.get_mut(container)?.elements.push(link);
        Ok(link)
    }

    // -- Interface ----------------------------------------------------------

    fn reindex(&mut self, container: ObjectId) -> HostResult<()> {
        let elements = self.store.elements(container)?.to_vec();
        for (i, item) in elements.into_iter().enumerate() {
            self.store.put(item, INDEX, Slot::Scalar(Scalar::Int(i as i64)))?;
        }
        Ok(())
    }

    fn new_interface_item(
        &mut self,
        interface: ObjectId,
        type_name: &str,
        fields: &[(&str, Scalar)],
        parent: Option<ObjectId>,
    ) -> HostResult<ObjectId> {
        let items = self.store.collection(interface, ITEMS_TREE)?;
        if let Some(parent) = parent {
            self.check_panel(items, parent)?;
        }
        let root = self.store.get(interface)?.root;
        let item = self.instantiate(type_name, Some(root), Some(items))?;
        for (identifier, value) in fields {
            self.store.put(item, identifier, Slot::Scalar(value.clone()))?;
        }
        self.store.put(item, PARENT, Slot::Pointer(parent))?;
        self.store.get_mut(items)?.elements.push(item);
        self.reindex(items)?;
        self.sync_group_users(root)?;
        Ok(item)
    }

    fn check_panel(&self, items: ObjectId, panel: ObjectId) -> HostResult<()> {
        if self.type_of(panel)? != INTERFACE_PANEL || !self.store.elements(items)?.contains(&panel) {
            return Err(invalid(ARG_PARENT, "parent must be a panel of this interface"));
        }
        Ok(())
    }

    // -- Collections --------------------------------------------------------

    pub(crate) fn construct_in(
        &mut self,
        container: ObjectId,
        type_name: &str,
        args: &Args<MemHandle>,
    ) -> HostResult<ObjectId> {
        let text = |name: &str| -> HostResult<String> {
            args.get_str(name)
                .map(str::to_string)
                .ok_or_else(|| invalid(name, "missing argument"))
        };
        match type_name {
            NODES => {
                let node_type = text(ARG_TYPE)?;
                if node_type == NODE || !self.schema.is_a(&node_type, NODE) {
                    return Err(invalid(ARG_TYPE, format!("\"{node_type}\" is not a node type")));
                }
                let tree = self.store.get(container)?.root;
                let node = self.instantiate(&node_type, Some(tree), Some(container))?;
                self.store.get_mut(container)?.elements.push(node);
                let base = node_type.strip_suffix("Node").unwrap_or(&node_type);
                let name = self.unique_name(node, base)?;
                self.store.put(node, NAME, Slot::Scalar(Scalar::from(name)))?;
                Ok(node)
            }
            NODE_LINKS => {
                let from = self.handle_arg(args, ARG_INPUT)?;
                let to = self.handle_arg(args, ARG_OUTPUT)?;
                self.new_link(container, from, to)
            }
            VIEW_LAYERS => {
                let name = text(NAME)?;
                let root = self.store.get(container)?.root;
                let layer = self.instantiate(VIEW_LAYER, Some(root), Some(container))?;
                self.store.get_mut(container)?.elements.push(layer);
                let name = self.unique_name(layer, &name)?;
                self.store.put(layer, NAME, Slot::Scalar(Scalar::from(name)))?;
                Ok(layer)
            }
            REPEAT_ITEMS | VIEWER_ITEMS | SIMULATION_STATE_ITEMS => {
                let socket_type = text(SOCKET_TYPE)?;
                if !ITEM_SOCKET_TYPES.contains(&socket_type.as_str()) {
                    return Err(invalid(SOCKET_TYPE, format!("unsupported socket type {socket_type}")));
                }
                let name = text(NAME)?;
                let item = self.push_item(container, Some(&socket_type))?;
                self.store.put(item, NAME, Slot::Scalar(Scalar::from(name)))?;
                self.resync_container_owner(container)?;
                Ok(item)
            }
            CAPTURE_ATTRIBUTE_ITEMS => {
                let socket_type = text(SOCKET_TYPE)?;
                let data_type = capture_data_type(&socket_type).ok_or_else(|| {
                    invalid(SOCKET_TYPE, format!("cannot capture {socket_type}"))
                })?;
                let name = text(NAME)?;
                let item = self.push_item(container, None)?;
                self.store.put(item, NAME, Slot::Scalar(Scalar::from(name)))?;
                self.store.put(item, DATA_TYPE, Slot::Scalar(Scalar::from(data_type)))?;
                self.resync_container_owner(container)?;
                Ok(item)
            }
            MENU_SWITCH_ITEMS | AOVS | LIGHTGROUPS => {
                let name = text(NAME)?;
                let item = self.push_item(container, None)?;
                self.store.put(item, NAME, Slot::Scalar(Scalar::from(name)))?;
                self.resync_container_owner(container)?;
                Ok(item)
            }
            INDEX_SWITCH_ITEMS => {
                let item = self.push_item(container, None)?;
                self.resync_container_owner(container)?;
                Ok(item)
            }
            CURVE_MAP_POINTS => {
                let float = |name: &str| {
                    args.get_scalar(name)
                        .and_then(Scalar::as_f64)
                        .ok_or_else(|| invalid(name, "missing argument"))
                };
                let (x, y) = (float(POSITION)?, float(ARG_VALUE)?);
                self.new_curve_point(container, x, y)
            }
            COLOR_RAMP_ELEMENTS => {
                let position = args
                    .get_scalar(POSITION)
                    .and_then(Scalar::as_f64)
                    .ok_or_else(|| invalid(POSITION, "missing argument"))?;
                let element = self.push_item(container, None)?;
                self.store.put(
                    element,
                    POSITION,
                    Slot::Scalar(Scalar::Float(position.clamp(0.0, 1.0))),
                )?;
                Ok(element)
            }
            _ => Err(rejected(
                format!("construct {type_name}"),
                "elements of this collection are created by the host",
            )),
        }
    }

    fn handle_arg(&self, args: &Args<MemHandle>, name: &str) -> HostResult<ObjectId> {
        let handle = args
            .get_handle(name)
            .ok_or_else(|| invalid(name, "missing argument"))?;
        self.id_of(handle)
    }

    pub(crate) fn clear_collection(&mut self, container: ObjectId, type_name: &str) -> HostResult<()> {
        match type_name {
            NODES | NODE_LINKS | INTERFACE_ITEMS | AOVS | LIGHTGROUPS => {}
            _ if SOCKET_ITEMS.contains(&type_name) => {}
            _ => {
                return Err(rejected(
                    format!("clear {type_name}"),
                    "this collection cannot be emptied",
                ));
            }
        }
        let elements = std::mem::take(&mut self.store.get_mut(container)?.elements);
        for element in elements {
            self.store.kill(element);
        }
        self.after_removal(container, type_name)
    }

    pub(crate) fn remove_element(
        &mut self,
        container: ObjectId,
        type_name: &str,
        index: usize,
    ) -> HostResult<()> {
        let operation = || format!("remove {type_name}[{index}]");
        if matches!(type_name, NODE_INPUTS | NODE_OUTPUTS | VIEW_LAYERS | CURVE_MAPS) {
            return Err(rejected(operation(), "elements of this collection are managed by the host"));
        }
        let elements = self.store.elements(container)?;
        let Some(&element) = elements.get(index) else {
            return Err(HostError::NotFound {
                what: format!("element {index} of {type_name}"),
            });
        };
        if type_name == COLOR_RAMP_ELEMENTS && elements.len() == 1 {
            return Err(rejected(operation(), "a color ramp needs at least one element"));
        }
        if type_name == CURVE_MAP_POINTS && elements.len() <= 2 {
            return Err(rejected(operation(), "a curve needs at least two points"));
        }
        self.store.kill(element);
        self.store.get_mut(container)?.elements.remove(index);
        self.after_removal(container, type_name)
    }

    fn after_removal(&mut self, container: ObjectId, type_name: &str) -> HostResult<()> {
        let tree = self.store.get(container)?.root;
        match type_name {
            NODES => {
                if let Some(active) = self.store.pointer(container, ACTIVE)? {
                    if self.store.get(active).is_err() {
                        self.store.put(container, ACTIVE, Slot::Pointer(None))?;
                    }
                }
                self.drop_dead_links(tree)
            }
            _ if SOCKET_ITEMS.contains(&type_name) => self.resync_container_owner(container),
            INTERFACE_ITEMS => {
                self.reindex(container)?;
                let items = self.store.elements(container)?.to_vec();
                for item in items {
                    if let Some(parent) = self.store.pointer(item, PARENT)? {
                        if self.store.get(parent).is_err() {
                            self.store.put(item, PARENT, Slot::Pointer(None))?;
                        }
                    }
                }
                self.sync_group_users(tree)
            }
            _ => Ok(()),
        }
    }

    // -- Functions ----------------------------------------------------------

    pub(crate) fn invoke_on(
        &mut self,
        id: ObjectId,
        type_name: &str,
        function: &str,
        args: &Args<MemHandle>,
    ) -> HostResult<Option<ObjectId>> {
        let text = |name: &str| args.get_str(name).unwrap_or_default().to_string();
        let operation = || format!("{type_name}.{function}");
        match function {
            FN_NEW_SOCKET => {
                let in_out = text(IN_OUT);
                if in_out != IN_OUT_INPUT && in_out != IN_OUT_OUTPUT {
                    return Err(invalid(IN_OUT, format!("\"{in_out}\" is neither INPUT nor OUTPUT")));
                }
                let socket_type = text(SOCKET_TYPE);
                if !ITEM_SOCKET_TYPES.contains(&socket_type.as_str()) {
                    return Err(invalid(SOCKET_TYPE, format!("unsupported socket type {socket_type}")));
                }
                let parent = args.get_handle(ARG_PARENT).map(|h| self.id_of(h)).transpose()?;
                let fields = [
                    (ITEM_TYPE, Scalar::from(ITEM_SOCKET)),
                    (NAME, Scalar::from(text(NAME))),
                    (DESCRIPTION, Scalar::from(text(DESCRIPTION))),
                    (IN_OUT, Scalar::from(in_out)),
                    (SOCKET_TYPE, Scalar::from(socket_type.as_str())),
                ];
                let item_type = interface_socket_type(&socket_type);
                self.new_interface_item(id, &item_type, &fields, parent).map(Some)
            }
            FN_NEW_PANEL => {
                let default_closed = args
                    .get_scalar(DEFAULT_CLOSED)
                    .and_then(Scalar::as_bool)
                    .unwrap_or(false);
                let fields = [
                    (ITEM_TYPE, Scalar::from(ITEM_PANEL)),
                    (NAME, Scalar::from(text(NAME))),
                    (DESCRIPTION, Scalar::from(text(DESCRIPTION))),
                    (DEFAULT_CLOSED, Scalar::Bool(default_closed)),
                ];
                self.new_interface_item(id, INTERFACE_PANEL, &fields, None).map(Some)
            }
            FN_MOVE_TO_PARENT => {
                let items = self.store.collection(id, ITEMS_TREE)?;
                let item = self.handle_arg(args, ARG_ITEM)?;
                if !self.store.elements(items)?.contains(&item) {
                    return Err(invalid(ARG_ITEM, "item does not belong to this interface"));
                }
                let parent = args.get_handle(ARG_PARENT).map(|h| self.id_of(h)).transpose()?;
                if let Some(parent) = parent {
                    self.check_panel(items, parent)?;
                    if parent == item {
                        return Err(rejected(operation(), "a panel cannot contain itself"));
                    }
                }
                self.store.put(item, PARENT, Slot::Pointer(parent))?;
                Ok(None)
            }
            FN_PAIR_WITH_OUTPUT => {
                let output = self.handle_arg(args, ARG_OUTPUT)?;
                let expected = zone_output_type(type_name)
                    .ok_or_else(|| rejected(operation(), "not a zone input"))?;
                if self.type_of(output)? != expected {
                    return Err(rejected(operation(), format!("can only pair with a {expected}")));
                }
                if self.store.get(output)?.root != self.store.get(id)?.root {
                    return Err(rejected(operation(), "zone output belongs to another tree"));
                }
                self.store.put(id, PAIRED_OUTPUT, Slot::Pointer(Some(output)))?;
                self.sync_sockets(id)?;
                Ok(None)
            }
            FN_SWAP_MULTI_INPUT_SORT_ID => {
                let other = self.handle_arg(args, ARG_OTHER)?;
                if self.store.pointer(id, TO_SOCKET)? != self.store.pointer(other, TO_SOCKET)? {
                    return Err(rejected(operation(), "links end at different sockets"));
                }
                let mine = self.store.scalar(id, MULTI_INPUT_SORT_ID)?.clone();
                let theirs = self.store.scalar(other, MULTI_INPUT_SORT_ID)?.clone();
                self.store.put(id, MULTI_INPUT_SORT_ID, Slot::Scalar(theirs))?;
                self.store.put(other, MULTI_INPUT_SORT_ID, Slot::Scalar(mine))?;
                Ok(None)
            }
            FN_UPDATE => {
                let curves = self.store.collection(id, CURVES)?;
                for curve in self.store.elements(curves)?.to_vec() {
                    let points = self.store.collection(curve, POINTS)?;
                    self.sort_curve_points(points)?;
                }
                Ok(None)
            }
            _ => Err(rejected(operation(), "no such function")),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::host::{Args, Host, Scalar};
    use crate::mem::{MemHandle, MemHost};
    use crate::mem::schema::*;
    use crate::vocab::*;

    fn names(host: &MemHost, node: &MemHandle, side: &str) -> Vec<String> {
        let sockets = host.get_collection(node, side).unwrap();
        (0..host.collection_len(&sockets).unwrap())
            .map(|i| host.display_name(&host.element(&sockets, i).unwrap()).unwrap())
            .collect()
    }

    #[test]
    fn group_nodes_mirror_the_interface() {
        let mut host = MemHost::new();
        let sub = host.new_tree(GEOMETRY_NODE_TREE, "Sub").unwrap();
        host.add_interface_socket(&sub, "Size", IN_OUT_INPUT, SOCKET_FLOAT).unwrap();
        host.add_interface_socket(&sub, "Mesh", IN_OUT_OUTPUT, SOCKET_GEOMETRY).unwrap();
        let input = host.add_node(&sub, GROUP_INPUT_NODE).unwrap();
        assert_eq!(names(&host, &input, OUTPUTS), ["Size"]);

        let main = host.new_tree(GEOMETRY_NODE_TREE, "Main").unwrap();
        let group = host.add_node(&main, GROUP_NODE).unwrap();
        assert!(names(&host, &group, INPUTS).is_empty());
        host.set_pointer(&group, NODE_TREE_PROP, Some(&sub)).unwrap();
        assert_eq!(names(&host, &group, INPUTS), ["Size"]);
        assert_eq!(names(&host, &group, OUTPUTS), ["Mesh"]);

        host.add_interface_socket(&sub, "Count", IN_OUT_INPUT, SOCKET_INT).unwrap();
        assert_eq!(names(&host, &group, INPUTS), ["Size", "Count"]);
        assert_eq!(names(&host, &input, OUTPUTS), ["Size", "Count"]);
    }

    #[test]
    fn single_inputs_keep_one_link() {
        let mut host = MemHost::new();
        let tree = host.new_tree(GEOMETRY_NODE_TREE, "Main").unwrap();
        let a = host.add_node(&tree, VALUE_NODE).unwrap();
        let b = host.add_node(&tree, VALUE_NODE).unwrap();
        let math = host.add_node(&tree, MATH_NODE).unwrap();
        host.link(&tree, &a, 0, &math, 0).unwrap();
        host.link(&tree, &b, 0, &math, 0).unwrap();
        let links = host.get_collection(&tree, LINKS).unwrap();
        assert_eq!(host.collection_len(&links).unwrap(), 1);
    }

    #[test]
    fn multi_inputs_number_their_links() {
        let mut host = MemHost::new();
        let tree = host.new_tree(GEOMETRY_NODE_TREE, "Main").unwrap();
        let join = host.add_node(&tree, JOIN_GEOMETRY_NODE).unwrap();
        let a = host.add_node(&tree, GROUP_INPUT_NODE).unwrap();
        host.add_interface_socket(&tree, "Geometry", IN_OUT_INPUT, SOCKET_GEOMETRY).unwrap();
        host.add_interface_socket(&tree, "Other", IN_OUT_INPUT, SOCKET_GEOMETRY).unwrap();
        let first = host.link(&tree, &a, 0, &join, 0).unwrap();
        let second = host.link(&tree, &a, 1, &join, 0).unwrap();
        assert_eq!(host.get_scalar(&first, MULTI_INPUT_SORT_ID).unwrap(), Scalar::Int(0));
        assert_eq!(host.get_scalar(&second, MULTI_INPUT_SORT_ID).unwrap(), Scalar::Int(1));

        let args = Args::new().handle(ARG_OTHER, Some(second.clone()));
        host.invoke(&first, FN_SWAP_MULTI_INPUT_SORT_ID, &args).unwrap();
        assert_eq!(host.get_scalar(&first, MULTI_INPUT_SORT_ID).unwrap(), Scalar::Int(1));
    }

    #[test]
    fn pairing_mirrors_zone_items() {
        let mut host = MemHost::new();
        let tree = host.new_tree(GEOMETRY_NODE_TREE, "Main").unwrap();
        let input = host.add_node(&tree, REPEAT_INPUT_NODE).unwrap();
        let output = host.add_node(&tree, REPEAT_OUTPUT_NODE).unwrap();
        assert_eq!(names(&host, &input, INPUTS), ["Iterations"]);

        let items = host.get_collection(&output, REPEAT_ITEMS_PROP).unwrap();
        let args = Args::new().scalar(SOCKET_TYPE, SOCKET_FLOAT).scalar(NAME, "Scale");
        host.construct(&items, &args).unwrap();
        let args = Args::new().handle(ARG_OUTPUT, Some(output.clone()));
        host.invoke(&input, FN_PAIR_WITH_OUTPUT, &args).unwrap();
        assert_eq!(names(&host, &input, INPUTS), ["Iterations", "Geometry", "Scale"]);
        assert_eq!(names(&host, &output, OUTPUTS), ["Geometry", "Scale"]);
    }

    #[test]
    fn menu_sockets_follow_items_and_type() {
        let mut host = MemHost::new();
        let tree = host.new_tree(GEOMETRY_NODE_TREE, "Main").unwrap();
        let menu = host.add_node(&tree, MENU_SWITCH_NODE).unwrap();
        assert_eq!(names(&host, &menu, INPUTS), ["Menu", "A", "B"]);

        let menu_socket = host.input(&menu, 0).unwrap();
        assert!(host.set_scalar(&menu_socket, DEFAULT_VALUE, Scalar::from("B")).is_ok());
        assert!(host.set_scalar(&menu_socket, DEFAULT_VALUE, Scalar::from("C")).is_err());

        host.set_scalar(&menu, DATA_TYPE, Scalar::from("FLOAT")).unwrap();
        let output = host.output(&menu, 0).unwrap();
        assert_eq!(host.type_name(&output).unwrap(), SOCKET_FLOAT);
    }

    #[test]
    fn unlinked_viewer_items_remove_themselves() {
        let mut host = MemHost::new();
        let tree = host.new_tree(GEOMETRY_NODE_TREE, "Main").unwrap();
        let viewer = host.add_node(&tree, VIEWER_NODE).unwrap();
        let items = host.get_collection(&viewer, VIEWER_ITEMS_PROP).unwrap();
        let item = host.element(&items, 0).unwrap();
        host.set_scalar(&item, AUTO_REMOVE, Scalar::Bool(true)).unwrap();
        assert_eq!(host.collection_len(&items).unwrap(), 0);
        assert!(names(&host, &viewer, INPUTS).is_empty());
    }

    #[test]
    fn color_ramps_keep_an_element() {
        let mut host = MemHost::new();
        let tree = host.new_tree(GEOMETRY_NODE_TREE, "Main").unwrap();
        let ramp_node = host.add_node(&tree, COLOR_RAMP_NODE).unwrap();
        let ramp = host.get_pointer(&ramp_node, COLOR_RAMP_PROP).unwrap().unwrap();
        let elements = host.get_collection(&ramp, ELEMENTS).unwrap();
        assert_eq!(host.collection_len(&elements).unwrap(), 2);
        host.remove(&elements, 1).unwrap();
        assert!(host.remove(&elements, 0).is_err());
        assert!(host.clear(&elements).is_err());
    }

    #[test]
    fn zone_inputs_pair_with_their_own_kind() {
        let mut host = MemHost::new();
        let tree = host.new_tree(GEOMETRY_NODE_TREE, "Main").unwrap();
        let input = host.add_node(&tree, SIMULATION_INPUT_NODE).unwrap();
        let repeat = host.add_node(&tree, REPEAT_OUTPUT_NODE).unwrap();
        let output = host.add_node(&tree, SIMULATION_OUTPUT_NODE).unwrap();

        let args = Args::new().handle(ARG_OUTPUT, Some(repeat));
        assert!(host.invoke(&input, FN_PAIR_WITH_OUTPUT, &args).is_err());
        let args = Args::new().handle(ARG_OUTPUT, Some(output.clone()));
        host.invoke(&input, FN_PAIR_WITH_OUTPUT, &args).unwrap();
        assert_eq!(names(&host, &input, OUTPUTS), ["Delta Time", "Geometry"]);

        let items = host.get_collection(&output, STATE_ITEMS).unwrap();
        host.clear(&items).unwrap();
        assert_eq!(names(&host, &input, OUTPUTS), ["Delta Time"]);
        assert!(host.set_scalar(&output, ACTIVE_INDEX, Scalar::Int(1)).is_err());
    }

    #[test]
    fn capture_items_map_socket_types() {
        let mut host = MemHost::new();
        let tree = host.new_tree(GEOMETRY_NODE_TREE, "Main").unwrap();
        let capture = host.add_node(&tree, CAPTURE_ATTRIBUTE_NODE).unwrap();
        let items = host.get_collection(&capture, CAPTURE_ITEMS).unwrap();
        let args = Args::new().scalar(SOCKET_TYPE, SOCKET_INT).scalar(NAME, "Id");
        let item = host.construct(&items, &args).unwrap();
        assert_eq!(host.get_scalar(&item, DATA_TYPE).unwrap(), Scalar::from("INT"));
        assert_eq!(host.type_name(&host.output(&capture, 2).unwrap()).unwrap(), SOCKET_INT);

        let args = Args::new().scalar(SOCKET_TYPE, SOCKET_GEOMETRY).scalar(NAME, "Mesh");
        assert!(host.construct(&items, &args).is_err());
    }

    #[test]
    fn curve_points_stay_sorted() {
        let mut host = MemHost::new();
        let tree = host.new_tree(GEOMETRY_NODE_TREE, "Main").unwrap();
        let curve = host.add_node(&tree, FLOAT_CURVE_NODE).unwrap();
        let mapping = host.get_pointer(&curve, MAPPING).unwrap().unwrap();
        let curves = host.get_collection(&mapping, CURVES).unwrap();
        let points = host.get_collection(&host.element(&curves, 0).unwrap(), POINTS).unwrap();
        let x = |host: &MemHost, i: usize| match host.get_scalar(&host.element(&points, i).unwrap(), LOCATION) {
            Ok(Scalar::FloatArray(location)) => location[0],
            other => panic!("unexpected location {other:?}"),
        };

        let args = Args::new().scalar(POSITION, 0.5).scalar(ARG_VALUE, 0.2);
        host.construct(&points, &args).unwrap();
        assert_eq!([x(&host, 0), x(&host, 1), x(&host, 2)], [0.0, 0.5, 1.0]);

        host.remove(&points, 1).unwrap();
        assert!(host.remove(&points, 0).is_err());
        assert!(host.clear(&points).is_err());

        let first = host.element(&points, 0).unwrap();
        host.set_scalar(&first, LOCATION, Scalar::from(vec![1.5, 0.0])).unwrap();
        assert_eq!(x(&host, 0), 1.5);
        host.invoke(&mapping, FN_UPDATE, &Args::new()).unwrap();
        assert_eq!([x(&host, 0), x(&host, 1)], [1.0, 1.5]);
    }

    #[test]
    fn view_layers_own_their_passes() {
        let mut host = MemHost::new();
        let scene = host.new_scene("Scene", "CYCLES").unwrap();
        let layers = host.get_collection(&scene, VIEW_LAYERS_PROP).unwrap();
        let layer = host.element(&layers, 0).unwrap();
        assert!(host.get_pointer(&layer, CYCLES).unwrap().is_some());
        let aovs = host.get_collection(&layer, AOVS_PROP).unwrap();
        host.construct(&aovs, &Args::new().scalar(NAME, "Mask")).unwrap();
        assert_eq!(host.collection_len(&aovs).unwrap(), 1);
        host.clear(&aovs).unwrap();
        assert_eq!(host.collection_len(&aovs).unwrap(), 0);
    }
}
