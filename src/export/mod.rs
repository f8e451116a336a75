//! Exporter: walk live trees through reflection and produce serialized nodes.
//!
//! Every object reached by the walk is registered under a fresh integer id
//! and becomes a [`SerializedNode`]. A specific handler, chosen by
//! [`HandlerRegistry::resolve`], writes the fields it understands; every
//! property the handler's assumed type does not declare is then attempted
//! generically. Pointers are not followed: they are recorded as [`Pointer`]s
//! and resolved once every tree has been walked, either to the id of an
//! exported object or to a freshly allocated external reference.
//!
//! [`ExportSession`] drives the walk one tree per step.

mod session;

pub use session::{ExportParameters, ExportSession, ExportState, RootSelector};

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::config::CodecConfig;
use crate::dispatch::HandlerRegistry;
use crate::document::{DATA, DEBUG_PATH, ID, ITEMS};
use crate::error::{CodecResult, EnvelopeError, RegistryError, StructuralError};
use crate::host::{Host, PropertyInfo, PropertyKind, Scalar};
use crate::identity::canonicalize;
use crate::path::PathTrail;
use crate::scene::{SceneInfo, export_scene_info};
use crate::vocab;

// ---------------------------------------------------------------------------
// Serialized form
// ---------------------------------------------------------------------------

/// Field map of a serialized node, in insertion order.
pub type NodeData = IndexMap<String, Field>;

/// One field of a serialized node, before pointer ids are known.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Null,
    Value(Value),
    /// Index into the exporter's pointer table.
    Pointer(usize),
    Object(Box<SerializedNode>),
    List(Vec<SerializedNode>),
}

/// An exported object: its id, its fields and, optionally, where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedNode {
    pub id: u64,
    pub data: NodeData,
    pub debug_path: Option<String>,
}

impl SerializedNode {
    /// Render as JSON. Every pointer must have been resolved.
    pub fn to_json<Hd>(&self, pointers: &[Pointer<Hd>]) -> CodecResult<Value> {
        let mut data = Map::new();
        for (key, field) in &self.data {
            data.insert(key.clone(), field.to_json(pointers)?);
        }
        let mut node = Map::new();
        node.insert(ID.into(), Value::from(self.id));
        node.insert(DATA.into(), Value::Object(data));
        if let Some(path) = &self.debug_path {
            node.insert(DEBUG_PATH.into(), Value::from(path.as_str()));
        }
        Ok(Value::Object(node))
    }
}

impl Field {
    fn to_json<Hd>(&self, pointers: &[Pointer<Hd>]) -> CodecResult<Value> {
        Ok(match self {
            Self::Null => Value::Null,
            Self::Value(v) => v.clone(),
            Self::Pointer(index) => pointers
                .get(*index)
                .and_then(|p| p.pointee_id)
                .map(Value::from)
                .ok_or(EnvelopeError::ExportNotFinished)?,
            Self::Object(node) => node.to_json(pointers)?,
            Self::List(nodes) => Value::Array(
                nodes
                    .iter()
                    .map(|n| n.to_json(pointers))
                    .collect::<CodecResult<_>>()?,
            ),
        })
    }
}

/// A reference captured during the walk, resolved after all trees are done.
#[derive(Debug, Clone, PartialEq)]
pub struct Pointer<Hd> {
    pub owner: Hd,
    /// Id of the serialized node the field belongs to.
    pub owner_id: Option<u64>,
    pub identifier: String,
    /// Canonical handle of the pointee.
    pub target: Hd,
    pub fixed_type_name: String,
    pub debug_path: String,
    pub pointee_id: Option<u64>,
}

/// A pointer whose target was not exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct External {
    pub id: u64,
    /// Index into the exporter's pointer table.
    pub pointer: usize,
    pub fixed_type_name: String,
    pub scene_id: Option<u64>,
    pub description: Option<String>,
}

/// Counters and warnings collected during an export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub exported_trees: usize,
    pub exported_nodes: usize,
    pub exported_links: usize,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Export handler: write the fields of `obj` its assumed type understands.
pub type Serializer<H> =
    fn(&mut Exporter<'_, H>, &<H as Host>::Handle, &PathTrail) -> CodecResult<NodeData>;

/// A typed export handler for one host type and everything deriving from it.
pub trait SpecificExporter<H: Host> {
    const ASSUMED_TYPE: &'static str;

    fn serialize(ctx: &mut ExportContext<'_, '_, H>) -> CodecResult<NodeData>;
}

fn run_specific<H: Host, T: SpecificExporter<H>>(
    exporter: &mut Exporter<'_, H>,
    obj: &H::Handle,
    path: &PathTrail,
) -> CodecResult<NodeData> {
    let mut ctx = ExportContext {
        exporter,
        obj,
        path,
        assumed_type: T::ASSUMED_TYPE,
    };
    T::serialize(&mut ctx)
}

/// Everything a specific handler sees of the object it serializes.
pub struct ExportContext<'e, 'h, H: Host> {
    pub exporter: &'e mut Exporter<'h, H>,
    pub obj: &'e H::Handle,
    pub path: &'e PathTrail,
    pub assumed_type: &'static str,
}

impl<'h, H: Host> ExportContext<'_, 'h, H> {
    pub fn host(&self) -> &'h H {
        self.exporter.host
    }

    /// Every writable simple property of the assumed type.
    pub fn simple_writable(&mut self) -> CodecResult<NodeData> {
        self.exporter
            .export_all_simple_writable_properties(self.obj, self.assumed_type, self.path)
    }

    /// The named properties, regardless of kind or writability.
    pub fn properties(&mut self, ids: &[&str], serialize_pointees: bool) -> CodecResult<NodeData> {
        self.exporter
            .export_properties_from_id_list(self.obj, ids, serialize_pointees, self.path)
    }

    /// Writable simple properties, plus `inline` with pointees serialized and
    /// `references` as deferred pointers.
    pub fn simple_writable_and_list(
        &mut self,
        inline: &[&str],
        references: &[&str],
    ) -> CodecResult<NodeData> {
        let mut data = self.simple_writable()?;
        data.extend(self.properties(inline, true)?);
        data.extend(self.properties(references, false)?);
        Ok(data)
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.exporter.warn(self.path, message);
    }
}

/// Export handlers keyed by assumed type.
pub struct ExportRegistry<H: Host> {
    handlers: HandlerRegistry<Serializer<H>>,
}

impl<H: Host> Clone for ExportRegistry<H> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<H: Host> Default for ExportRegistry<H> {
    fn default() -> Self {
        Self {
            handlers: HandlerRegistry::new(),
        }
    }
}

impl<H: Host> fmt::Debug for ExportRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExportRegistry").field(&self.handlers).finish()
    }
}

impl<H: Host> ExportRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: SpecificExporter<H>>(&mut self) -> Result<(), RegistryError> {
        self.handlers.insert(T::ASSUMED_TYPE, run_specific::<H, T>)
    }

    pub fn register_fn(
        &mut self,
        type_name: &str,
        serializer: Serializer<H>,
    ) -> Result<(), RegistryError> {
        self.handlers.insert(type_name, serializer)
    }

    pub fn handlers(&self) -> &HandlerRegistry<Serializer<H>> {
        &self.handlers
    }
}

// ---------------------------------------------------------------------------
// Exporter
// ---------------------------------------------------------------------------

/// Walk state shared by every handler during one export.
pub struct Exporter<'h, H: Host> {
    host: &'h H,
    registry: ExportRegistry<H>,
    config: CodecConfig,
    next_id: u64,
    serialized: HashMap<H::Handle, u64>,
    pointers: Vec<Pointer<H::Handle>>,
    /// Pointer indices grouped by canonical target, in capture order.
    pointer_groups: IndexMap<H::Handle, Vec<usize>>,
    /// Ids of the nodes currently being serialized, innermost last.
    owners: Vec<u64>,
    current_tree: Option<H::Handle>,
    report: ExportReport,
}

impl<'h, H: Host> Exporter<'h, H> {
    pub fn new(host: &'h H, registry: ExportRegistry<H>, config: CodecConfig) -> Self {
        Self {
            host,
            registry,
            config,
            next_id: 0,
            serialized: HashMap::new(),
            pointers: Vec::new(),
            pointer_groups: IndexMap::new(),
            owners: Vec::new(),
            current_tree: None,
            report: ExportReport::default(),
        }
    }

    pub fn host(&self) -> &'h H {
        self.host
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn report(&self) -> &ExportReport {
        &self.report
    }

    pub fn pointers(&self) -> &[Pointer<H::Handle>] {
        &self.pointers
    }

    /// Number of ids handed out so far.
    pub fn allocated_ids(&self) -> u64 {
        self.next_id
    }

    pub fn warn(&mut self, path: &PathTrail, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%path, "{message}");
        self.report.warnings.push(format!("{message} at {path}"));
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn register_as_serialized(&mut self, obj: &H::Handle, path: &PathTrail) -> CodecResult<u64> {
        let key = canonicalize(self.host, obj)?;
        if self.serialized.contains_key(&key) {
            return Err(StructuralError::DoubleSerialization {
                path: path.to_string(),
            }
            .into());
        }
        let id = self.allocate_id();
        self.serialized.insert(key, id);
        Ok(id)
    }

    /// Id of `obj` if it has been serialized.
    pub fn serialized_id(&self, obj: &H::Handle) -> CodecResult<Option<u64>> {
        let key = canonicalize(self.host, obj)?;
        Ok(self.serialized.get(&key).copied())
    }

    fn count(&mut self, type_name: &str) {
        let schema = self.host.schema();
        if schema.is_a(type_name, vocab::NODE) {
            self.report.exported_nodes += 1;
        } else if schema.is_a(type_name, vocab::NODE_LINK) {
            self.report.exported_links += 1;
        } else if schema.is_a(type_name, vocab::NODE_TREE) {
            self.report.exported_trees += 1;
        }
    }

    /// Export one root tree. Pointers into it are inlined when read-only.
    pub(crate) fn export_tree(
        &mut self,
        tree: &H::Handle,
        path: &PathTrail,
    ) -> CodecResult<SerializedNode> {
        self.current_tree = Some(canonicalize(self.host, tree)?);
        let result = self.export_obj(tree, path);
        self.current_tree = None;
        result
    }

    fn is_in_current_tree(&self, target: &H::Handle) -> CodecResult<bool> {
        let Some(current) = &self.current_tree else {
            return Ok(false);
        };
        match self.host.owner(target)? {
            Some(owner) => Ok(&canonicalize(self.host, &owner)? == current),
            None => Ok(false),
        }
    }

    /// Serialize `obj`: register it, run its handler, then attempt every
    /// property the handler's assumed type does not declare.
    pub fn export_obj(&mut self, obj: &H::Handle, path: &PathTrail) -> CodecResult<SerializedNode> {
        let host = self.host;
        let schema = host.schema();
        let type_name = host.type_name(obj)?;
        self.count(&type_name);

        let assumed = self
            .registry
            .handlers
            .resolve(schema, &type_name, host.is_collection(obj)?)?;
        let handler = self.registry.handlers.get(&assumed).copied();
        let handled: Vec<&str> = assumed
            .type_name()
            .map(|t| {
                schema
                    .properties(t)
                    .into_iter()
                    .map(|p| p.identifier.as_str())
                    .collect()
            })
            .unwrap_or_default();
        let unhandled: Vec<PropertyInfo> = schema
            .properties(&type_name)
            .into_iter()
            .filter(|p| !handled.contains(&p.identifier.as_str()))
            .cloned()
            .collect();

        let id = self.register_as_serialized(obj, path)?;
        tracing::debug!(%path, id, %assumed, "exporting");

        self.owners.push(id);
        let data = self.export_contents(obj, handler, &unhandled, path);
        self.owners.pop();

        Ok(SerializedNode {
            id,
            data: data?,
            debug_path: self.config.write_debug_paths.then(|| path.to_string()),
        })
    }

    fn export_contents(
        &mut self,
        obj: &H::Handle,
        handler: Option<Serializer<H>>,
        unhandled: &[PropertyInfo],
        path: &PathTrail,
    ) -> CodecResult<NodeData> {
        let mut data = match handler {
            Some(serialize) => serialize(self, obj, path)?,
            None => NodeData::new(),
        };
        let type_name = self.host.type_name(obj)?;
        for prop in unhandled {
            let prop_path = path.add_prop(prop);
            if prop.kind.is_simple() && self.skip_simple(obj, &type_name, prop, &prop_path)? {
                continue;
            }
            let field = self.attempt_export_property(obj, prop, &prop_path)?;
            if data.contains_key(&prop.identifier) {
                return Err(StructuralError::FieldClobbered {
                    identifier: prop.identifier.clone(),
                    path: prop_path.to_string(),
                }
                .into());
            }
            data.insert(prop.identifier.clone(), field);
        }
        Ok(data)
    }

    /// Whether a simple property is left out entirely: broken on this host,
    /// forbidden by configuration, or an enum with no value.
    fn skip_simple(
        &mut self,
        obj: &H::Handle,
        type_name: &str,
        prop: &PropertyInfo,
        path: &PathTrail,
    ) -> CodecResult<bool> {
        if self.is_broken(type_name, &prop.identifier) {
            self.warn(path, "skipping property broken on this host version");
            return Ok(true);
        }
        if self.config.is_forbidden(&prop.identifier) {
            tracing::debug!(%path, "skipping forbidden property");
            return Ok(true);
        }
        if prop.kind == PropertyKind::Enum && !prop.enum_flag {
            let value = self.host.get_scalar(obj, &prop.identifier)?;
            if matches!(&value, Scalar::String(s) if s.is_empty()) {
                tracing::debug!(%path, "skipping empty enum");
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn is_broken(&self, type_name: &str, identifier: &str) -> bool {
        let schema = self.host.schema();
        let version = self.host.host_version();
        self.config.broken_properties.iter().any(|b| {
            b.identifier == identifier
                && schema.is_a(type_name, &b.type_name)
                && b.host_version.as_deref().is_none_or(|v| v == version)
        })
    }

    fn is_clamp_exempt(
        &self,
        obj: &H::Handle,
        type_name: &str,
        identifier: &str,
    ) -> CodecResult<bool> {
        let schema = self.host.schema();
        for exemption in &self.config.clamp_exemptions {
            if exemption.identifier == identifier
                && schema.is_a(type_name, &exemption.type_name)
                && self.host.display_name(obj)? == exemption.object_name
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn attempt_export_property(
        &mut self,
        obj: &H::Handle,
        prop: &PropertyInfo,
        path: &PathTrail,
    ) -> CodecResult<Field> {
        let host = self.host;
        match prop.kind {
            PropertyKind::Pointer => {
                let Some(target) = host.get_pointer(obj, &prop.identifier)? else {
                    tracing::debug!(%path, "empty pointer");
                    return Ok(Field::Null);
                };
                let in_tree = self.is_in_current_tree(&target)?;
                if prop.readonly && !in_tree {
                    return Err(StructuralError::HandlerNeeded {
                        reason: "read-only pointer to an object outside the current tree".into(),
                        path: path.to_string(),
                    }
                    .into());
                }
                self.export_property_pointer(obj, prop, prop.readonly, path)
            }
            PropertyKind::Collection => {
                let collection = host.get_collection(obj, &prop.identifier)?;
                let collection_type = host.type_name(&collection)?;
                let element_type = prop.fixed_type.as_deref().unwrap_or_default();
                if host.schema().requires_arguments(&collection_type)
                    && !self.registry.handlers.contains(element_type)
                {
                    return Err(StructuralError::HandlerNeeded {
                        reason: format!(
                            "elements of {collection_type} need constructor arguments \
                             and {element_type} has no handler"
                        ),
                        path: path.to_string(),
                    }
                    .into());
                }
                self.export_property_collection(obj, prop, path)
            }
            _ if prop.readonly => Ok(Field::Null),
            _ => Ok(Field::Value(self.export_property_simple(obj, prop, path)?)),
        }
    }

    /// Export one property by kind. Pointers are inlined when
    /// `serialize_pointee` is set, deferred otherwise.
    pub fn export_property(
        &mut self,
        obj: &H::Handle,
        prop: &PropertyInfo,
        serialize_pointee: bool,
        path: &PathTrail,
    ) -> CodecResult<Field> {
        match prop.kind {
            PropertyKind::Pointer => self.export_property_pointer(obj, prop, serialize_pointee, path),
            PropertyKind::Collection => self.export_property_collection(obj, prop, path),
            _ => Ok(Field::Value(self.export_property_simple(obj, prop, path)?)),
        }
    }

    fn export_property_simple(
        &mut self,
        obj: &H::Handle,
        prop: &PropertyInfo,
        path: &PathTrail,
    ) -> CodecResult<Value> {
        let host = self.host;
        let mut value = host.get_scalar(obj, &prop.identifier)?;

        if prop.identifier == vocab::DEFAULT_VALUE && host.has_property(obj, vocab::DIMENSIONS)? {
            let dimensions = host
                .get_scalar(obj, vocab::DIMENSIONS)?
                .as_i64()
                .unwrap_or_default()
                .max(0) as usize;
            if value.array_len().is_some_and(|len| len > dimensions) {
                self.warn(path, format!("fixing dimension mismatch, truncating to {dimensions}"));
                value.truncate(dimensions);
            }
        }

        if matches!(prop.kind, PropertyKind::Int | PropertyKind::Float)
            && prop.hard_min <= prop.hard_max
        {
            let type_name = host.type_name(obj)?;
            if !self.is_clamp_exempt(obj, &type_name, &prop.identifier)?
                && value.clamp(prop.hard_min, prop.hard_max)
            {
                self.warn(
                    path,
                    format!(
                        "value outside of valid range [{}, {}], clamped",
                        prop.hard_min, prop.hard_max
                    ),
                );
            }
        }

        Ok(value.to_json())
    }

    fn export_property_pointer(
        &mut self,
        obj: &H::Handle,
        prop: &PropertyInfo,
        serialize_pointee: bool,
        path: &PathTrail,
    ) -> CodecResult<Field> {
        let host = self.host;
        let Some(target) = host.get_pointer(obj, &prop.identifier)? else {
            return Ok(Field::Null);
        };
        if serialize_pointee {
            return Ok(Field::Object(Box::new(self.export_obj(&target, path)?)));
        }

        let fixed_type_name = prop.fixed_type.clone().ok_or_else(|| StructuralError::HandlerNeeded {
            reason: "pointer property without a fixed type".into(),
            path: path.to_string(),
        })?;
        let target = canonicalize(host, &target)?;
        let index = self.pointers.len();
        self.pointers.push(Pointer {
            owner: obj.clone(),
            owner_id: self.owners.last().copied(),
            identifier: prop.identifier.clone(),
            target: target.clone(),
            fixed_type_name,
            debug_path: path.to_string(),
            pointee_id: None,
        });
        self.pointer_groups.entry(target).or_default().push(index);
        tracing::debug!(%path, index, "deferring pointer");
        Ok(Field::Pointer(index))
    }

    fn export_property_collection(
        &mut self,
        obj: &H::Handle,
        prop: &PropertyInfo,
        path: &PathTrail,
    ) -> CodecResult<Field> {
        let host = self.host;
        let collection = host.get_collection(obj, &prop.identifier)?;
        let mut node = self.export_obj(&collection, path)?;

        let len = host.collection_len(&collection)?;
        let mut items = Vec::with_capacity(len);
        for i in 0..len {
            let element = host.element(&collection, i)?;
            let name = host.display_name(&element)?;
            items.push(self.export_obj(&element, &path.add(format!("[{i}] ({name})")))?);
        }
        if node.data.contains_key(ITEMS) {
            return Err(StructuralError::FieldClobbered {
                identifier: ITEMS.into(),
                path: path.to_string(),
            }
            .into());
        }
        node.data.insert(ITEMS.into(), Field::List(items));
        Ok(Field::Object(Box::new(node)))
    }

    /// Every writable simple property declared by `assumed_type`.
    pub fn export_all_simple_writable_properties(
        &mut self,
        obj: &H::Handle,
        assumed_type: &str,
        path: &PathTrail,
    ) -> CodecResult<NodeData> {
        let host = self.host;
        let type_name = host.type_name(obj)?;
        let props: Vec<PropertyInfo> = host
            .schema()
            .properties(assumed_type)
            .into_iter()
            .filter(|p| !p.readonly && p.kind.is_simple())
            .cloned()
            .collect();

        let mut data = NodeData::new();
        for prop in &props {
            let prop_path = path.add_prop(prop);
            if self.skip_simple(obj, &type_name, prop, &prop_path)? {
                continue;
            }
            let value = self.export_property_simple(obj, prop, &prop_path)?;
            data.insert(prop.identifier.clone(), Field::Value(value));
        }
        Ok(data)
    }

    /// Export the named properties of `obj`.
    pub fn export_properties_from_id_list(
        &mut self,
        obj: &H::Handle,
        ids: &[&str],
        serialize_pointees: bool,
        path: &PathTrail,
    ) -> CodecResult<NodeData> {
        let mut data = NodeData::new();
        for id in ids {
            let prop = self.host.property(obj, id)?;
            let field = self.export_property(obj, &prop, serialize_pointees, &path.add_prop(&prop))?;
            data.insert(prop.identifier, field);
        }
        Ok(data)
    }

    /// Resolve every captured pointer. Targets that were exported get their
    /// id; every other target must be a global object and becomes one
    /// external reference per pointer. Scene targets also get a settings
    /// snapshot, shared by all pointers to that scene.
    pub(crate) fn finalize(
        &mut self,
    ) -> CodecResult<(BTreeMap<u64, External>, BTreeMap<u64, SceneInfo>)> {
        let host = self.host;
        let groups = std::mem::take(&mut self.pointer_groups);
        let mut externals = BTreeMap::new();
        let mut scenes = BTreeMap::new();

        for (target, indices) in &groups {
            if let Some(&id) = self.serialized.get(target) {
                for &i in indices {
                    self.pointers[i].pointee_id = Some(id);
                }
                continue;
            }

            if host.global_key(target)?.is_none() {
                let path = indices
                    .first()
                    .map(|&i| self.pointers[i].debug_path.clone())
                    .unwrap_or_default();
                return Err(StructuralError::NotExternalizable { path }.into());
            }

            let scene_id = if host.is_a(target, vocab::SCENE)? {
                let scene_id = self.allocate_id();
                scenes.insert(scene_id, export_scene_info(host, target)?);
                Some(scene_id)
            } else {
                None
            };

            for &i in indices {
                let id = self.allocate_id();
                let pointer = &mut self.pointers[i];
                pointer.pointee_id = Some(id);
                tracing::debug!(path = %pointer.debug_path, id, "external reference");
                externals.insert(
                    id,
                    External {
                        id,
                        pointer: i,
                        fixed_type_name: pointer.fixed_type_name.clone(),
                        scene_id,
                        description: None,
                    },
                );
            }
        }

        self.pointer_groups = groups;
        Ok((externals, scenes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BrokenProperty, ClampExemption};
    use crate::error::CodecError;
    use crate::handlers::{export_registry, import_registry};
    use crate::host::GlobalKey;
    use crate::identity::same_object;
    use crate::import::{ImportParameters, ImportSession};
    use crate::mem::{MemHandle, MemHost, sample};

    fn export<'h>(host: &'h MemHost, root: &str, config: CodecConfig) -> ExportSession<'h, MemHost> {
        let mut session = ExportSession::new(
            host,
            ExportParameters::tree(root).with_config(config),
            export_registry().unwrap(),
        )
        .unwrap();
        session.run().unwrap();
        session
    }

    fn collect_ids(value: &Value, ids: &mut Vec<u64>) {
        match value {
            Value::Object(node) => match (node.get(ID).and_then(Value::as_u64), node.get(DATA)) {
                (Some(id), Some(data)) => {
                    ids.push(id);
                    collect_ids(data, ids);
                }
                _ => node.values().for_each(|v| collect_ids(v, ids)),
            },
            Value::Array(items) => items.iter().for_each(|v| collect_ids(v, ids)),
            _ => {}
        }
    }

    /// A chain holding a single value node whose width is out of range.
    fn wide_value_node() -> MemHost {
        let (mut host, tree) = sample::math_chain(0).unwrap();
        let value = host.node_by_name(&tree, "Value").unwrap().unwrap();
        host.poke_scalar(&value, "width", Scalar::Float(20000.0))
            .unwrap();
        host
    }

    fn first_node(document: &crate::document::Document) -> &Map<String, Value> {
        document.trees[0]["data"][vocab::NODES_PROP]["data"][ITEMS][0]["data"]
            .as_object()
            .unwrap()
    }

    #[test]
    fn ids_are_contiguous_and_unique() {
        let (host, _) = sample::showcase().unwrap();
        let document = export(&host, sample::MAIN_TREE, CodecConfig::default())
            .document()
            .unwrap();

        let mut ids = Vec::new();
        for tree in &document.trees {
            collect_ids(tree, &mut ids);
        }
        ids.extend(document.external.keys());
        ids.extend(document.scenes.keys());
        ids.sort_unstable();
        let expected: Vec<u64> = (0..ids.len() as u64).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn same_object_is_serialized_once() {
        let (host, tree) = sample::math_chain(1).unwrap();
        let mut exporter = Exporter::new(&host, export_registry().unwrap(), CodecConfig::default());
        let path = PathTrail::root("Tree (Chain)");
        exporter.export_obj(&tree, &path).unwrap();

        let by_name = MemHandle::named(vocab::NODE_GROUPS, "Chain");
        let err = exporter.export_obj(&by_name, &path).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Structural(StructuralError::DoubleSerialization { .. })
        ));
    }

    #[test]
    fn out_of_range_values_are_clamped_with_one_warning() {
        let host = wide_value_node();
        let session = export(&host, "Chain", CodecConfig::default());
        let clamped = session
            .report()
            .warnings
            .iter()
            .filter(|w| w.contains("clamped"))
            .count();
        assert_eq!(clamped, 1);

        let document = session.document().unwrap();
        assert_eq!(first_node(&document)["width"].as_f64(), Some(10000.0));
    }

    #[test]
    fn clamp_exemption_keeps_the_value() {
        let host = wide_value_node();
        let mut config = CodecConfig::default();
        config.clamp_exemptions.push(ClampExemption {
            type_name: vocab::NODE.into(),
            object_name: "Value".into(),
            identifier: "width".into(),
        });
        let session = export(&host, "Chain", config);
        assert!(session.report().warnings.is_empty());

        let document = session.document().unwrap();
        assert_eq!(first_node(&document)["width"].as_f64(), Some(20000.0));
    }

    #[test]
    fn broken_and_forbidden_properties_are_left_out() {
        let (host, _) = sample::math_chain(0).unwrap();
        let mut config = CodecConfig::default();
        config.broken_properties = vec![BrokenProperty {
            type_name: vocab::NODE.into(),
            identifier: "mute".into(),
            host_version: Some(host.host_version()),
        }];
        config.forbidden_properties.insert("label".into());

        let session = export(&host, "Chain", config);
        assert_eq!(session.report().warnings.len(), 1);
        let document = session.document().unwrap();
        let node = first_node(&document);
        assert!(!node.contains_key("mute"));
        assert!(!node.contains_key("label"));
        assert!(node.contains_key("hide"));
    }

    #[test]
    fn two_nodes_with_an_external_material() {
        let mut host = MemHost::new();
        let steel = host.new_material("Steel").unwrap();
        let tree = host.new_tree(vocab::GEOMETRY_NODE_TREE, "Pair").unwrap();
        let a = host.add_node(&tree, vocab::VALUE_NODE).unwrap();
        let b = host.add_node(&tree, vocab::SET_MATERIAL_NODE).unwrap();
        host.link(&tree, &a, 0, &b, 0).unwrap();
        let material_in = host.input(&b, 1).unwrap();
        host.set_pointer(&material_in, vocab::DEFAULT_VALUE, Some(&steel))
            .unwrap();

        let session = export(&host, "Pair", CodecConfig::default());
        let report = session.report();
        assert_eq!(report.exported_trees, 1);
        assert_eq!(report.exported_nodes, 2);
        assert_eq!(report.exported_links, 1);
        assert_eq!(session.externals().len(), 1);
        let external = session.externals().values().next().unwrap().clone();
        assert_eq!(external.fixed_type_name, vocab::MATERIAL);
        assert!(external.scene_id.is_none());
        let pointer = session.pointer(&external).unwrap();
        assert_eq!(pointer.identifier, vocab::DEFAULT_VALUE);
        let document = session.document().unwrap();

        let mut target = MemHost::new();
        let target_steel = target.new_material("Steel").unwrap();
        let mut import = ImportSession::new(
            &mut target,
            document,
            import_registry().unwrap(),
            ImportParameters::default(),
        )
        .unwrap();
        import
            .set_external(vec![(external.id, Some(target_steel.clone()))])
            .unwrap();
        import.run().unwrap();
        drop(import);

        let tree = target
            .lookup_global(&GlobalKey::new(vocab::NODE_GROUPS, "Pair"))
            .unwrap();
        let a = target.node_by_name(&tree, "Value").unwrap().unwrap();
        let b = target.node_by_name(&tree, "SetMaterial").unwrap().unwrap();
        let links = target.get_collection(&tree, vocab::LINKS).unwrap();
        assert_eq!(target.collection_len(&links).unwrap(), 1);
        let link = target.element(&links, 0).unwrap();
        let from = target.get_pointer(&link, vocab::FROM_SOCKET).unwrap().unwrap();
        let to = target.get_pointer(&link, vocab::TO_SOCKET).unwrap().unwrap();
        assert!(same_object(&target, &from, &target.output(&a, 0).unwrap()).unwrap());
        assert!(same_object(&target, &to, &target.input(&b, 0).unwrap()).unwrap());

        let material_in = target.input(&b, 1).unwrap();
        let bound = target
            .get_pointer(&material_in, vocab::DEFAULT_VALUE)
            .unwrap()
            .unwrap();
        assert!(same_object(&target, &bound, &target_steel).unwrap());
    }
}
