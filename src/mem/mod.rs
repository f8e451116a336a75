//! In-memory reference host.
//!
//! [`MemHost`] implements [`Host`] over an arena of reflected objects
//! described by [`schema::node_graph_schema`]. It behaves like a node-graph
//! editor would: names are kept unique, nodes build their own sockets, links
//! replace each other on single inputs, setting one property can reshape
//! others. Tests, benchmarks and the CLI demo run the codec against it.
//!
//! Every mutation is appended to a journal so tests can check the order in
//! which the importer touched the model.

mod build;
mod model;
mod nodes;
pub mod sample;
pub mod schema;

pub use model::{MemHandle, ObjectId};

use std::collections::BTreeMap;

use crate::error::{HostError, HostResult};
use crate::host::{Args, GlobalKey, Host, PropertyInfo, PropertyKind, Scalar, Schema};
use crate::vocab::*;

use model::{Object, Slot, Store};
use schema::SOCKET_MENU;

/// Host version reported unless configured otherwise.
pub const DEFAULT_VERSION: &str = "4.5.0";

#[derive(Debug, Clone)]
pub struct MemHost {
    schema: Schema,
    store: Store,
    /// Global registries: block name to member objects, in creation order.
    registries: BTreeMap<String, Vec<ObjectId>>,
    version: String,
    journal: Vec<String>,
}

impl Default for MemHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemHost {
    /// Create an empty host with the node-graph schema.
    pub fn new() -> Self {
        Self::with_version(DEFAULT_VERSION)
    }

    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            schema: schema::node_graph_schema(),
            store: Store::default(),
            registries: BTreeMap::new(),
            version: version.into(),
            journal: Vec::new(),
        }
    }

    /// Mutations performed so far, oldest first.
    pub fn journal(&self) -> &[String] {
        &self.journal
    }

    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    /// Write a simple property without validation, clamping or side effects.
    pub fn poke_scalar(
        &mut self,
        handle: &MemHandle,
        identifier: &str,
        value: Scalar,
    ) -> HostResult<()> {
        let id = self.id_of(handle)?;
        self.store.scalar(id, identifier)?;
        self.store.put(id, identifier, Slot::Scalar(value))
    }

    /// Names of the objects in a global registry, in creation order.
    pub fn global_names(&self, block: &str) -> Vec<String> {
        self.registries
            .get(block)
            .map(|ids| {
                ids.iter()
                    .filter(|id| self.store.get(**id).is_ok())
                    .map(|id| self.store.text(*id, NAME))
                    .collect()
            })
            .unwrap_or_default()
    }

    // -- Handles ------------------------------------------------------------

    pub(crate) fn id_of(&self, handle: &MemHandle) -> HostResult<ObjectId> {
        match handle {
            MemHandle::Object(id) => {
                self.store.get(*id)?;
                Ok(*id)
            }
            MemHandle::Named { block, name } => {
                self.find_global(block, name)
                    .ok_or_else(|| HostError::NotFound {
                        what: format!("{block}[\"{name}\"]"),
                    })
            }
        }
    }

    fn find_global(&self, block: &str, name: &str) -> Option<ObjectId> {
        self.registries
            .get(block)?
            .iter()
            .copied()
            .find(|id| self.store.get(*id).is_ok() && self.store.text(*id, NAME) == name)
    }

    /// Handle a pointer read yields: global objects come back by name.
    pub(crate) fn handle_for(&self, id: ObjectId) -> MemHandle {
        match self.store.get(id) {
            Ok(Object {
                block: Some(block), ..
            }) => MemHandle::named(block.as_str(), self.store.text(id, NAME)),
            _ => MemHandle::Object(id),
        }
    }

    fn type_of(&self, id: ObjectId) -> HostResult<String> {
        Ok(self.store.get(id)?.type_name.clone())
    }

    fn declared(&self, type_name: &str, identifier: &str) -> HostResult<PropertyInfo> {
        self.schema
            .property(type_name, identifier)
            .cloned()
            .ok_or_else(|| HostError::NoSuchProperty {
                type_name: type_name.to_string(),
                identifier: identifier.to_string(),
            })
    }

    // -- Object creation ----------------------------------------------------

    /// Create an object of `type_name` with every declared property at its
    /// zero value, collections empty and type-specific content in place.
    pub(crate) fn instantiate(
        &mut self,
        type_name: &str,
        root: Option<ObjectId>,
        parent: Option<ObjectId>,
    ) -> HostResult<ObjectId> {
        let def = self
            .schema
            .get(type_name)
            .ok_or_else(|| invalid(ARG_TYPE, format!("unknown type \"{type_name}\"")))?;
        let collection = def.collection;
        let props: Vec<PropertyInfo> = self
            .schema
            .properties(type_name)
            .into_iter()
            .cloned()
            .collect();

        let next = self.store.next_id();
        let mut object = Object::new(type_name, root.unwrap_or(next), collection);
        object.parent = parent;
        let root = object.root;
        let id = self.store.insert(object);

        for prop in &props {
            let slot = match prop.kind {
                PropertyKind::Pointer => Slot::Pointer(None),
                PropertyKind::Collection => {
                    let container_type = prop.container_type.as_deref().unwrap_or_default();
                    Slot::Collection(self.instantiate(container_type, Some(root), Some(id))?)
                }
                _ => match Scalar::zero_for(prop) {
                    Some(value) => Slot::Scalar(value),
                    None => continue,
                },
            };
            self.store.put(id, &prop.identifier, slot)?;
        }
        self.populate(id)?;
        Ok(id)
    }

    // -- Naming -------------------------------------------------------------

    /// Objects whose names must differ from `id`'s.
    fn name_siblings(&self, id: ObjectId) -> HostResult<Vec<ObjectId>> {
        let object = self.store.get(id)?;
        if let Some(block) = &object.block {
            return Ok(self.registries.get(block).cloned().unwrap_or_default());
        }
        let scoped = self.schema.is_a(&object.type_name, NODE)
            || self.schema.is_a(&object.type_name, VIEW_LAYER);
        match object.parent {
            Some(container) if scoped => Ok(self.store.elements(container)?.to_vec()),
            _ => Ok(Vec::new()),
        }
    }

    /// `wanted`, or the first `base.NNN` free among `id`'s siblings.
    fn unique_name(&self, id: ObjectId, wanted: &str) -> HostResult<String> {
        let siblings = self.name_siblings(id)?;
        let taken = |candidate: &str| {
            siblings
                .iter()
                .any(|s| *s != id && self.store.get(*s).is_ok() && self.store.text(*s, NAME) == candidate)
        };
        if !taken(wanted) {
            return Ok(wanted.to_string());
        }
        let base = strip_number_suffix(wanted);
        let mut n = 1;
        loop {
            let candidate = format!("{base}.{n:03}");
            if !taken(&candidate) {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    // -- Validation ---------------------------------------------------------

    fn check_length(&self, id: ObjectId, prop: &PropertyInfo, value: &Scalar) -> HostResult<()> {
        if !prop.is_array() {
            return Ok(());
        }
        let expected = if prop.identifier == DEFAULT_VALUE
            && self.store.get(id)?.fields.contains_key(DIMENSIONS)
        {
            self.store
                .scalar(id, DIMENSIONS)?
                .as_i64()
                .unwrap_or_default()
                .max(0) as usize
        } else {
            prop.array_length
        };
        match value.array_len() {
            Some(len) if len == expected => Ok(()),
            len => Err(invalid(
                &prop.identifier,
                format!("expected {expected} elements, got {}", len.unwrap_or(1)),
            )),
        }
    }

    fn check_enum(
        &self,
        id: ObjectId,
        type_name: &str,
        prop: &PropertyInfo,
        value: &Scalar,
    ) -> HostResult<()> {
        if prop.kind != PropertyKind::Enum {
            return Ok(());
        }
        let allowed: Vec<String> = if !prop.enum_items.is_empty() {
            prop.enum_items.clone()
        } else if type_name == SOCKET_MENU {
            match self.menu_items_of_socket(id)? {
                Some(items) => items,
                None => return Ok(()),
            }
        } else {
            return Ok(());
        };
        let values: Vec<&str> = match value {
            Scalar::String(s) => vec![s.as_str()],
            Scalar::StringSet(set) => set.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        };
        match values.iter().find(|v| !allowed.iter().any(|a| a == *v)) {
            Some(bad) => Err(invalid(
                &prop.identifier,
                format!("\"{bad}\" is not one of {allowed:?}"),
            )),
            None => Ok(()),
        }
    }

    fn check_pointer(
        &self,
        id: ObjectId,
        type_name: &str,
        identifier: &str,
        target: Option<ObjectId>,
    ) -> HostResult<()> {
        let Some(target) = target else {
            return Ok(());
        };
        let operation = format!("{type_name}.{identifier}");
        if identifier == PARENT && self.schema.is_a(type_name, NODE) {
            if self.type_of(target)? != FRAME_NODE {
                return Err(rejected(operation, "only frames can be parents"));
            }
            if self.store.get(target)?.root != self.store.get(id)?.root {
                return Err(rejected(operation, "parent belongs to another tree"));
            }
            let mut ancestor = Some(target);
            while let Some(current) = ancestor {
                if current == id {
                    return Err(rejected(operation, "parenting would form a loop"));
                }
                ancestor = self.store.pointer(current, PARENT)?;
            }
        }
        if identifier == NODE_TREE_PROP
            && type_name == GROUP_NODE
            && self.store.get(id)?.root == target
        {
            return Err(rejected(operation, "a group cannot contain itself"));
        }
        if identifier == ACTIVE && !self.store.elements(id)?.contains(&target) {
            return Err(invalid(identifier, "active node must belong to the tree"));
        }
        Ok(())
    }

    /// Adjust a value about to be written. Names are made unique.
    fn before_set(
        &self,
        id: ObjectId,
        type_name: &str,
        identifier: &str,
        value: Scalar,
    ) -> HostResult<Scalar> {
        let operation = || format!("{type_name}.{identifier}");
        match identifier {
            NAME => match value.as_str() {
                Some(wanted) => Ok(Scalar::from(self.unique_name(id, wanted)?)),
                None => Ok(value),
            },
            SOCKET_TYPE => {
                let current = self.store.scalar(id, SOCKET_TYPE)?;
                if *current != value {
                    return Err(rejected(operation(), "socket type is fixed at creation"));
                }
                Ok(value)
            }
            ACTIVE_INDEX => {
                let items = match type_name {
                    SIMULATION_OUTPUT_NODE => STATE_ITEMS,
                    _ => CAPTURE_ITEMS,
                };
                let len = self.store.elements(self.store.collection(id, items)?)?.len();
                let wanted = value.as_i64().unwrap_or_default();
                if wanted >= len.max(1) as i64 {
                    return Err(invalid(identifier, format!("no item at index {wanted}")));
                }
                Ok(value)
            }
            LAYER if type_name == RENDER_LAYERS_NODE => {
                if let Some(scene) = self.store.pointer(id, SCENE_PROP)? {
                    let layers = self.view_layer_names(scene)?;
                    let wanted = value.as_str().unwrap_or_default();
                    if !layers.iter().any(|l| l == wanted) {
                        return Err(invalid(
                            identifier,
                            format!("scene has no view layer \"{wanted}\""),
                        ));
                    }
                }
                Ok(value)
            }
            _ => Ok(value),
        }
    }

    pub(crate) fn view_layer_names(&self, scene: ObjectId) -> HostResult<Vec<String>> {
        let layers = self.store.collection(scene, VIEW_LAYERS_PROP)?;
        Ok(self
            .store
            .elements(layers)?
            .iter()
            .map(|l| self.store.text(*l, NAME))
            .collect())
    }

    fn after_set(&mut self, id: ObjectId, type_name: &str, identifier: &str) -> HostResult<()> {
        let interface_socket = self.schema.is_a(type_name, INTERFACE_SOCKET);
        match identifier {
            NAME if matches!(
                type_name,
                REPEAT_ITEM
                    | VIEWER_ITEM
                    | MENU_SWITCH_ITEM
                    | SIMULATION_STATE_ITEM
                    | CAPTURE_ATTRIBUTE_ITEM
            ) =>
            {
                self.resync_item_owner(id)
            }
            DATA_TYPE if type_name == CAPTURE_ATTRIBUTE_ITEM => self.resync_item_owner(id),
            NAME if interface_socket => {
                let tree = self.store.get(id)?.root;
                self.sync_group_users(tree)
            }
            DIMENSIONS => self.resize_default(id),
            USE_NODES if type_name == MATERIAL => self.ensure_material_tree(id),
            AUTO_REMOVE if self.store.flag(id, AUTO_REMOVE) => self.auto_remove(id),
            DATA_TYPE if matches!(type_name, MENU_SWITCH_NODE | INDEX_SWITCH_NODE) => {
                self.sync_sockets(id)
            }
            _ => Ok(()),
        }
    }

    fn resize_default(&mut self, id: ObjectId) -> HostResult<()> {
        let dimensions = self
            .store
            .scalar(id, DIMENSIONS)?
            .as_i64()
            .unwrap_or_default()
            .max(0) as usize;
        if let Ok(Scalar::FloatArray(values)) = self.store.scalar(id, DEFAULT_VALUE) {
            let mut values = values.clone();
            values.resize(dimensions, 0.0);
            self.store
                .put(id, DEFAULT_VALUE, Slot::Scalar(Scalar::FloatArray(values)))?;
        }
        Ok(())
    }

    fn ensure_material_tree(&mut self, material: ObjectId) -> HostResult<()> {
        if !self.store.flag(material, USE_NODES) || self.store.pointer(material, NODE_TREE_PROP)?.is_some() {
            return Ok(());
        }
        let tree = self.instantiate(SHADER_NODE_TREE, None, Some(material))?;
        self.store
            .put(tree, NAME, Slot::Scalar(Scalar::from("Shader Nodetree")))?;
        self.store
            .put(material, NODE_TREE_PROP, Slot::Pointer(Some(tree)))
    }
}

impl Host for MemHost {
    type Handle = MemHandle;

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn host_version(&self) -> String {
        self.version.clone()
    }

    fn type_name(&self, handle: &MemHandle) -> HostResult<String> {
        self.type_of(self.id_of(handle)?)
    }

    fn is_collection(&self, handle: &MemHandle) -> HostResult<bool> {
        Ok(self.store.get(self.id_of(handle)?)?.collection)
    }

    fn owner(&self, handle: &MemHandle) -> HostResult<Option<MemHandle>> {
        let root = self.store.get(self.id_of(handle)?)?.root;
        Ok(Some(self.handle_for(root)))
    }

    fn global_key(&self, handle: &MemHandle) -> HostResult<Option<GlobalKey>> {
        match handle {
            MemHandle::Named { block, name } => Ok(Some(GlobalKey::new(block.as_str(), name.as_str()))),
            MemHandle::Object(id) => {
                let object = self.store.get(*id)?;
                Ok(object
                    .block
                    .as_ref()
                    .map(|block| GlobalKey::new(block.as_str(), self.store.text(*id, NAME))))
            }
        }
    }

    fn lookup_global(&self, key: &GlobalKey) -> Option<MemHandle> {
        self.find_global(&key.block, &key.name).map(MemHandle::Object)
    }

    fn create_global(&mut self, block: &str, type_name: &str, name: &str) -> HostResult<MemHandle> {
        if !self.schema.is_a(type_name, ID) {
            return Err(rejected(
                format!("create {type_name}"),
                "only ID types can be registered globally",
            ));
        }
        let id = self.instantiate(type_name, None, None)?;
        self.store.get_mut(id)?.block = Some(block.to_string());
        self.registries.entry(block.to_string()).or_default().push(id);
        let name = self.unique_name(id, name)?;
        self.store.put(id, NAME, Slot::Scalar(Scalar::from(name)))?;
        self.journal.push(format!("create {type_name}"));
        Ok(MemHandle::Object(id))
    }

    fn get_scalar(&self, handle: &MemHandle, identifier: &str) -> HostResult<Scalar> {
        self.store.scalar(self.id_of(handle)?, identifier).cloned()
    }

    fn set_scalar(&mut self, handle: &MemHandle, identifier: &str, value: Scalar) -> HostResult<()> {
        let id = self.id_of(handle)?;
        let type_name = self.type_of(id)?;
        let prop = self.declared(&type_name, identifier)?;
        if !prop.kind.is_simple() {
            return Err(HostError::WrongKind {
                identifier: identifier.to_string(),
                expected: "simple property",
            });
        }
        if prop.readonly {
            return Err(rejected(format!("{type_name}.{identifier}"), "property is read-only"));
        }

        let mut value = Scalar::from_json(&prop, &value.to_json()).ok_or_else(|| {
            invalid(identifier, format!("expected a {} value", prop.kind.label()))
        })?;
        self.check_length(id, &prop, &value)?;
        self.check_enum(id, &type_name, &prop, &value)?;
        if matches!(prop.kind, PropertyKind::Int | PropertyKind::Float) {
            value.clamp(prop.hard_min, prop.hard_max);
        }
        let value = self.before_set(id, &type_name, identifier, value)?;

        self.store.put(id, identifier, Slot::Scalar(value))?;
        self.after_set(id, &type_name, identifier)?;
        self.journal.push(format!("set {type_name}.{identifier}"));
        Ok(())
    }

    fn get_pointer(&self, handle: &MemHandle, identifier: &str) -> HostResult<Option<MemHandle>> {
        let target = self.store.pointer(self.id_of(handle)?, identifier)?;
        Ok(target
            .filter(|t| self.store.get(*t).is_ok())
            .map(|t| self.handle_for(t)))
    }

    fn set_pointer(
        &mut self,
        handle: &MemHandle,
        identifier: &str,
        target: Option<&MemHandle>,
    ) -> HostResult<()> {
        let id = self.id_of(handle)?;
        let type_name = self.type_of(id)?;
        let prop = self.declared(&type_name, identifier)?;
        if prop.kind != PropertyKind::Pointer {
            return Err(HostError::WrongKind {
                identifier: identifier.to_string(),
                expected: "pointer",
            });
        }
        if prop.readonly {
            return Err(rejected(format!("{type_name}.{identifier}"), "pointer is read-only"));
        }
        let target = target.map(|t| self.id_of(t)).transpose()?;
        if let (Some(target), Some(fixed)) = (target, prop.fixed_type.as_deref()) {
            let target_type = self.type_of(target)?;
            if !self.schema.is_a(&target_type, fixed) {
                return Err(invalid(
                    identifier,
                    format!("expected a {fixed}, got a {target_type}"),
                ));
            }
        }
        self.check_pointer(id, &type_name, identifier, target)?;

        self.store.put(id, identifier, Slot::Pointer(target))?;
        match identifier {
            NODE_TREE_PROP if type_name == GROUP_NODE => self.sync_sockets(id)?,
            SCENE_PROP if type_name == RENDER_LAYERS_NODE => self.fit_render_layer(id)?,
            _ => {}
        }
        self.journal.push(format!("pointer {type_name}.{identifier}"));
        Ok(())
    }

    fn get_collection(&self, handle: &MemHandle, identifier: &str) -> HostResult<MemHandle> {
        Ok(MemHandle::Object(
            self.store.collection(self.id_of(handle)?, identifier)?,
        ))
    }

    fn collection_len(&self, collection: &MemHandle) -> HostResult<usize> {
        Ok(self.store.elements(self.id_of(collection)?)?.len())
    }

    fn element(&self, collection: &MemHandle, index: usize) -> HostResult<MemHandle> {
        let container = self.id_of(collection)?;
        self.store
            .elements(container)?
            .get(index)
            .map(|e| self.handle_for(*e))
            .ok_or_else(|| HostError::NotFound {
                what: format!("element {index} of {}", self.store.text(container, NAME)),
            })
    }

    fn clear(&mut self, collection: &MemHandle) -> HostResult<()> {
        let container = self.id_of(collection)?;
        let type_name = self.type_of(container)?;
        self.clear_collection(container, &type_name)?;
        self.journal.push(format!("clear {type_name}"));
        Ok(())
    }

    fn remove(&mut self, collection: &MemHandle, index: usize) -> HostResult<()> {
        let container = self.id_of(collection)?;
        let type_name = self.type_of(container)?;
        self.remove_element(container, &type_name, index)?;
        self.journal.push(format!("remove {type_name}[{index}]"));
        Ok(())
    }

    fn construct(&mut self, collection: &MemHandle, args: &Args<MemHandle>) -> HostResult<MemHandle> {
        let container = self.id_of(collection)?;
        let type_name = self.type_of(container)?;
        let created = self.construct_in(container, &type_name, args)?;
        self.journal.push(format!("construct {type_name}"));
        Ok(self.handle_for(created))
    }

    fn invoke(
        &mut self,
        handle: &MemHandle,
        function: &str,
        args: &Args<MemHandle>,
    ) -> HostResult<Option<MemHandle>> {
        let id = self.id_of(handle)?;
        let type_name = self.type_of(id)?;
        let declared = self
            .schema
            .get(&type_name)
            .is_some_and(|def| def.functions.iter().any(|f| f.name == function));
        if !declared {
            return Err(rejected(
                format!("{type_name}.{function}"),
                "no such function",
            ));
        }
        let result = self.invoke_on(id, &type_name, function, args)?;
        self.journal.push(format!("invoke {type_name}.{function}"));
        Ok(result.map(|r| self.handle_for(r)))
    }
}

fn invalid(identifier: &str, message: impl Into<String>) -> HostError {
    HostError::InvalidValue {
        identifier: identifier.to_string(),
        message: message.into(),
    }
}

fn rejected(operation: impl Into<String>, message: impl Into<String>) -> HostError {
    HostError::Rejected {
        operation: operation.into(),
        message: message.into(),
    }
}

/// `Name.002` -> `Name`; names without a three-digit suffix are kept.
fn strip_number_suffix(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((base, digits)) if digits.len() == 3 && digits.bytes().all(|b| b.is_ascii_digit()) => {
            base
        }
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Args;

    fn tree(host: &mut MemHost) -> MemHandle {
        host.new_tree(GEOMETRY_NODE_TREE, "Main").unwrap()
    }

    #[test]
    fn suffix_stripping() {
        assert_eq!(strip_number_suffix("Math.004"), "Math");
        assert_eq!(strip_number_suffix("v1.5"), "v1.5");
        assert_eq!(strip_number_suffix("Plain"), "Plain");
    }

    #[test]
    fn global_names_stay_unique() {
        let mut host = MemHost::new();
        tree(&mut host);
        let second = host.new_tree(GEOMETRY_NODE_TREE, "Main").unwrap();
        let third = host.new_tree(GEOMETRY_NODE_TREE, "Main.001").unwrap();
        assert_eq!(host.display_name(&second).unwrap(), "Main.001");
        assert_eq!(host.display_name(&third).unwrap(), "Main.002");
        assert_eq!(host.global_names(NODE_GROUPS), vec!["Main", "Main.001", "Main.002"]);
    }

    #[test]
    fn pointers_to_globals_come_back_by_name() {
        let mut host = MemHost::new();
        let main = tree(&mut host);
        let sub = host.new_tree(GEOMETRY_NODE_TREE, "Sub").unwrap();
        let group = host.add_node(&main, GROUP_NODE).unwrap();
        host.set_pointer(&group, NODE_TREE_PROP, Some(&sub)).unwrap();
        let read = host.get_pointer(&group, NODE_TREE_PROP).unwrap().unwrap();
        assert_eq!(read, MemHandle::named(NODE_GROUPS, "Sub"));
        assert_ne!(read, sub);
    }

    #[test]
    fn values_are_clamped_and_checked() {
        let mut host = MemHost::new();
        let main = tree(&mut host);
        let frame = host.add_node(&main, FRAME_NODE).unwrap();
        host.set_scalar(&frame, "label_size", Scalar::Int(500)).unwrap();
        assert_eq!(host.get_scalar(&frame, "label_size").unwrap(), Scalar::Int(64));

        let err = host.set_scalar(&frame, "label_size", Scalar::from("big"));
        assert!(matches!(err, Err(HostError::InvalidValue { .. })));
        let err = host.set_scalar(&frame, IDNAME, Scalar::from("MathNode"));
        assert!(matches!(err, Err(HostError::Rejected { .. })));
    }

    #[test]
    fn vector_default_follows_dimensions() {
        let mut host = MemHost::new();
        let main = tree(&mut host);
        let interface = host.get_pointer(&main, INTERFACE_PROP).unwrap().unwrap();
        let args = Args::new()
            .scalar(NAME, "Offset")
            .scalar(DESCRIPTION, "")
            .scalar(IN_OUT, IN_OUT_INPUT)
            .scalar(SOCKET_TYPE, schema::SOCKET_VECTOR);
        let socket = host.invoke(&interface, FN_NEW_SOCKET, &args).unwrap().unwrap();
        host.set_scalar(&socket, DIMENSIONS, Scalar::Int(2)).unwrap();
        assert_eq!(
            host.get_scalar(&socket, DEFAULT_VALUE).unwrap(),
            Scalar::FloatArray(vec![0.0, 0.0])
        );
        let err = host.set_scalar(&socket, DEFAULT_VALUE, Scalar::from(vec![1.0, 2.0, 3.0]));
        assert!(matches!(err, Err(HostError::InvalidValue { .. })));
    }

    #[test]
    fn frames_are_the_only_parents() {
        let mut host = MemHost::new();
        let main = tree(&mut host);
        let frame = host.add_node(&main, FRAME_NODE).unwrap();
        let math = host.add_node(&main, MATH_NODE).unwrap();
        let value = host.add_node(&main, VALUE_NODE).unwrap();
        host.set_pointer(&math, PARENT, Some(&frame)).unwrap();
        assert!(host.set_pointer(&math, PARENT, Some(&value)).is_err());
        assert!(host.set_pointer(&frame, PARENT, Some(&frame)).is_err());
    }

    #[test]
    fn use_nodes_creates_embedded_tree() {
        let mut host = MemHost::new();
        let material = host.new_material("Steel").unwrap();
        assert_eq!(host.get_pointer(&material, NODE_TREE_PROP).unwrap(), None);
        host.set_scalar(&material, USE_NODES, Scalar::Bool(true)).unwrap();
        let tree = host.get_pointer(&material, NODE_TREE_PROP).unwrap().unwrap();
        assert_eq!(host.type_name(&tree).unwrap(), SHADER_NODE_TREE);
        assert_eq!(host.global_key(&tree).unwrap(), None);
        assert_eq!(host.owner(&tree).unwrap(), Some(tree));
    }

    #[test]
    fn journal_records_mutations() {
        let mut host = MemHost::new();
        let main = tree(&mut host);
        host.clear_journal();
        let node = host.add_node(&main, VALUE_NODE).unwrap();
        host.set_scalar(&node, "hide", Scalar::Bool(true)).unwrap();
        assert_eq!(host.journal(), ["construct Nodes", "set ValueNode.hide"]);
    }
}
