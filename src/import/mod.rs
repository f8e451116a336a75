//! Importer: rebuild serialized trees inside a live host.
//!
//! The walk mirrors the exporter's. Each serialized node is imported against
//! a [`Getter`] (never a raw handle, since handles go stale while the host is
//! mutated), registered under its id, handed to the specific handler chosen by
//! dispatch, and then every remaining property is imported generically.
//! References are integer ids looked up in the getter table, so the objects
//! they name must have been imported (or resolved as externals) first.
//!
//! Writes that need more of the tree to exist are queued as
//! [`DeferredAction`]s and flushed by phase: structural pairing before links,
//! late flags after links, enum defaults last.

mod deferred;
mod getter;
mod session;

pub use deferred::{DeferredAction, DeferredQueues, Phase};
pub use getter::{Getter, global_getter};
pub use session::{ImportParameters, ImportSession, ImportState};

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::config::CodecConfig;
use crate::dispatch::HandlerRegistry;
use crate::document::{DATA, ID, ITEMS};
use crate::error::{
    CodecResult, HostError, RegistryError, StructuralError, ValidationError,
};
use crate::host::{Args, Host, PropertyInfo, PropertyKind, Scalar};
use crate::path::PathTrail;
use crate::vocab;

/// Counters, renames and warnings collected during an import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub imported_trees: usize,
    pub imported_nodes: usize,
    pub imported_links: usize,
    /// Global objects the host created under a different name, original first.
    pub renamed: IndexMap<String, String>,
    pub warnings: Vec<String>,
    /// Getter of the last root tree imported.
    pub last_root: Option<Getter>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Import handler: apply the fields its assumed type understands.
pub type Deserializer<H> =
    fn(&mut Importer<'_, H>, &Getter, &Map<String, Value>, &PathTrail) -> CodecResult<()>;

/// A typed import handler for one host type and everything deriving from it.
pub trait SpecificImporter<H: Host> {
    const ASSUMED_TYPE: &'static str;

    fn deserialize(ctx: &mut ImportContext<'_, '_, H>) -> CodecResult<()>;
}

fn run_specific<H: Host, T: SpecificImporter<H>>(
    importer: &mut Importer<'_, H>,
    getter: &Getter,
    data: &Map<String, Value>,
    path: &PathTrail,
) -> CodecResult<()> {
    let mut ctx = ImportContext {
        importer,
        getter,
        data,
        path,
        assumed_type: T::ASSUMED_TYPE,
    };
    T::deserialize(&mut ctx)
}

/// Everything a specific handler sees of the object it rebuilds.
pub struct ImportContext<'i, 'h, H: Host> {
    pub importer: &'i mut Importer<'h, H>,
    pub getter: &'i Getter,
    pub data: &'i Map<String, Value>,
    pub path: &'i PathTrail,
    pub assumed_type: &'static str,
}

impl<'i, H: Host> ImportContext<'i, '_, H> {
    pub fn host(&self) -> &H {
        self.importer.host()
    }

    pub fn host_mut(&mut self) -> &mut H {
        self.importer.host_mut()
    }

    /// Live handle of the object being imported.
    pub fn obj(&self) -> CodecResult<H::Handle> {
        self.getter.live(self.importer.host())
    }

    pub fn field(&self, key: &str) -> Option<&'i Value> {
        self.data.get(key)
    }

    /// Elements of the collection being imported, for container handlers.
    pub fn own_items(&self) -> CodecResult<&'i [Value]> {
        self.data
            .get(ITEMS)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                StructuralError::MalformedField {
                    expected: "a collection node with items".into(),
                    path: self.path.to_string(),
                }
                .into()
            })
    }

    /// Elements serialized under collection field `key`.
    pub fn items(&self, key: &str) -> CodecResult<&'i [Value]> {
        self.data
            .get(key)
            .and_then(|node| node.get(DATA))
            .and_then(|data| data.get(ITEMS))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                StructuralError::MalformedField {
                    expected: format!("collection \"{key}\" with items"),
                    path: self.path.to_string(),
                }
                .into()
            })
    }

    /// Writable simple properties of the assumed type, except `forbidden`.
    pub fn simple_writable(&mut self, forbidden: &[&str]) -> CodecResult<()> {
        self.importer.import_all_simple_writable_properties(
            self.getter,
            self.data,
            self.assumed_type,
            forbidden,
            self.path,
        )
    }

    pub fn properties(&mut self, ids: &[&str]) -> CodecResult<()> {
        self.importer
            .import_properties_from_id_list(self.getter, self.data, ids, self.path)
    }

    pub fn simple_writable_and_list(&mut self, ids: &[&str]) -> CodecResult<()> {
        self.simple_writable(&[])?;
        self.properties(ids)
    }

    /// Serialized value of `identifier` parsed as declared on `type_name`, or
    /// the property's default when absent.
    pub fn or_default(&self, type_name: &str, identifier: &str) -> CodecResult<Scalar> {
        or_default(self.host(), self.data, type_name, identifier, self.path)
    }

    pub fn defer(&mut self, action: DeferredAction) {
        self.importer.defer(action);
    }

    /// Mark a field as imported so the generic pass leaves it alone.
    pub fn claim(&mut self, identifier: &str) {
        self.importer.claim(identifier);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.importer.warn(self.path, message);
    }
}

/// Import handlers keyed by assumed type.
pub struct ImportRegistry<H: Host> {
    handlers: HandlerRegistry<Deserializer<H>>,
}

impl<H: Host> Clone for ImportRegistry<H> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<H: Host> Default for ImportRegistry<H> {
    fn default() -> Self {
        Self {
            handlers: HandlerRegistry::new(),
        }
    }
}

impl<H: Host> fmt::Debug for ImportRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ImportRegistry").field(&self.handlers).finish()
    }
}

impl<H: Host> ImportRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: SpecificImporter<H>>(&mut self) -> Result<(), RegistryError> {
        self.handlers.insert(T::ASSUMED_TYPE, run_specific::<H, T>)
    }

    pub fn register_fn(
        &mut self,
        type_name: &str,
        deserializer: Deserializer<H>,
    ) -> Result<(), RegistryError> {
        self.handlers.insert(type_name, deserializer)
    }

    pub fn handlers(&self) -> &HandlerRegistry<Deserializer<H>> {
        &self.handlers
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Split a serialized node into its id and field map.
pub fn split_node<'v>(
    value: &'v Value,
    path: &PathTrail,
) -> CodecResult<(u64, &'v Map<String, Value>)> {
    let malformed = || StructuralError::MalformedField {
        expected: "a node with an integer id and a data object".into(),
        path: path.to_string(),
    };
    let node = value.as_object().ok_or_else(malformed)?;
    let id = node.get(ID).and_then(Value::as_u64).ok_or_else(malformed)?;
    let data = node.get(DATA).and_then(Value::as_object).ok_or_else(malformed)?;
    Ok((id, data))
}

/// Serialized value of `identifier` or the property's default.
pub fn or_default<H: Host>(
    host: &H,
    data: &Map<String, Value>,
    type_name: &str,
    identifier: &str,
    path: &PathTrail,
) -> CodecResult<Scalar> {
    let prop = host
        .schema()
        .property(type_name, identifier)
        .ok_or_else(|| HostError::NoSuchProperty {
            type_name: type_name.to_string(),
            identifier: identifier.to_string(),
        })?;
    match data.get(identifier) {
        Some(value) => Scalar::from_json(prop, value).ok_or_else(|| {
            StructuralError::MalformedField {
                expected: format!("{} value for \"{identifier}\"", prop.kind.label()),
                path: path.to_string(),
            }
            .into()
        }),
        None => Scalar::zero_for(prop).ok_or_else(|| {
            StructuralError::MissingField {
                identifier: identifier.to_string(),
                path: path.to_string(),
            }
            .into()
        }),
    }
}

// ---------------------------------------------------------------------------
// Importer
// ---------------------------------------------------------------------------

/// Walk state shared by every handler during one import.
pub struct Importer<'h, H: Host> {
    host: &'h mut H,
    registry: ImportRegistry<H>,
    config: CodecConfig,
    getters: HashMap<u64, Getter>,
    queues: DeferredQueues,
    current_tree: Option<Getter>,
    /// Fields claimed by the handlers currently running, innermost last.
    claimed: Vec<Vec<String>>,
    report: ImportReport,
}

impl<'h, H: Host> Importer<'h, H> {
    pub fn new(host: &'h mut H, registry: ImportRegistry<H>, config: CodecConfig) -> Self {
        Self {
            host,
            registry,
            config,
            getters: HashMap::new(),
            queues: DeferredQueues::new(),
            current_tree: None,
            claimed: Vec::new(),
            report: ImportReport::default(),
        }
    }

    pub fn host(&self) -> &H {
        self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        self.host
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn report(&self) -> &ImportReport {
        &self.report
    }

    /// Getter of the tree being imported.
    pub fn current_tree(&self) -> Option<&Getter> {
        self.current_tree.as_ref()
    }

    /// Getter registered for `id`, if that object has been imported.
    pub fn getter(&self, id: u64) -> Option<&Getter> {
        self.getters.get(&id)
    }

    /// Live object registered for `id`.
    pub fn resolve_id(&self, id: u64, path: &PathTrail) -> CodecResult<Option<H::Handle>> {
        let getter = self
            .getters
            .get(&id)
            .ok_or_else(|| StructuralError::NotDeserializedYet {
                id,
                path: path.to_string(),
            })?;
        Ok(getter.get(&*self.host)?)
    }

    pub fn defer(&mut self, action: DeferredAction) {
        tracing::debug!(phase = ?action.phase(), "deferring");
        self.queues.push(action);
    }

    fn claim(&mut self, identifier: &str) {
        if let Some(top) = self.claimed.last_mut() {
            top.push(identifier.to_string());
        }
    }

    pub fn pending(&self, phase: Phase) -> usize {
        self.queues.len(phase)
    }

    pub fn warn(&mut self, path: &PathTrail, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%path, "{message}");
        self.report.warnings.push(format!("{message} at {path}"));
    }

    pub(crate) fn register_external(&mut self, external_id: u64, getter: Getter) -> CodecResult<()> {
        if self.getters.contains_key(&external_id) {
            return Err(ValidationError::DuplicateExternal { external_id }.into());
        }
        self.getters.insert(external_id, getter);
        Ok(())
    }

    fn register_as_deserialized(
        &mut self,
        id: u64,
        getter: Getter,
        path: &PathTrail,
    ) -> CodecResult<()> {
        if self.getters.contains_key(&id) {
            return Err(StructuralError::DoubleDeserialization {
                id,
                path: path.to_string(),
            }
            .into());
        }
        self.getters.insert(id, getter);
        Ok(())
    }

    fn count(&mut self, type_name: &str) {
        let schema = self.host.schema();
        if schema.is_a(type_name, vocab::NODE) {
            self.report.imported_nodes += 1;
        } else if schema.is_a(type_name, vocab::NODE_LINK) {
            self.report.imported_links += 1;
        } else if schema.is_a(type_name, vocab::NODE_TREE) {
            self.report.imported_trees += 1;
        }
    }

    /// Import one serialized node into the object `getter` yields.
    pub fn import_obj(
        &mut self,
        getter: &Getter,
        serialization: &Value,
        path: &PathTrail,
    ) -> CodecResult<()> {
        let (id, data) = split_node(serialization, path)?;

        let host: &H = self.host;
        let obj = getter.live(host)?;
        let type_name = host.type_name(&obj)?;
        let is_collection = host.is_collection(&obj)?;
        let schema = host.schema();
        let assumed = self
            .registry
            .handlers
            .resolve(schema, &type_name, is_collection)?;
        if is_collection && !assumed.is_handled() {
            return Err(StructuralError::HandlerNeeded {
                reason: format!("collection {type_name} must be handled specifically"),
                path: path.to_string(),
            }
            .into());
        }
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

        self.count(&type_name);
        self.register_as_deserialized(id, getter.clone(), path)?;
        tracing::debug!(%path, id, %assumed, "importing");

        self.claimed.push(Vec::new());
        let handled = match handler {
            Some(deserialize) => deserialize(self, getter, data, path),
            None => Ok(()),
        };
        let claimed = self.claimed.pop().unwrap_or_default();
        handled?;

        for prop in &unhandled {
            let prop_path = path.add_prop(prop);
            if claimed.contains(&prop.identifier) {
                tracing::debug!(path = %prop_path, "already imported by handler");
                continue;
            }
            match data.get(&prop.identifier) {
                Some(_) if prop.kind.is_simple() && prop.readonly => {}
                Some(value) => self.import_property(getter, prop, value, &prop_path)?,
                None if prop.kind.is_simple() => {
                    tracing::debug!(path = %prop_path, "not serialized, keeping default");
                }
                None if prop.kind == PropertyKind::Pointer && !prop.readonly => {
                    tracing::debug!(path = %prop_path, "not serialized, leaving unset");
                }
                None => {
                    return Err(StructuralError::MissingField {
                        identifier: prop.identifier.clone(),
                        path: prop_path.to_string(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Import one property by kind.
    pub fn import_property(
        &mut self,
        getter: &Getter,
        prop: &PropertyInfo,
        value: &Value,
        path: &PathTrail,
    ) -> CodecResult<()> {
        match prop.kind {
            PropertyKind::Pointer => self.import_property_pointer(getter, prop, value, path),
            PropertyKind::Collection => self.import_property_collection(getter, prop, value, path),
            _ => self.import_property_simple(getter, prop, value, path),
        }
    }

    fn import_property_simple(
        &mut self,
        getter: &Getter,
        prop: &PropertyInfo,
        value: &Value,
        path: &PathTrail,
    ) -> CodecResult<()> {
        if self.config.is_forbidden(&prop.identifier) {
            tracing::debug!(%path, "skipping forbidden property");
            return Ok(());
        }
        if prop.readonly {
            tracing::debug!(%path, "skipping read-only property");
            return Ok(());
        }
        let scalar = Scalar::from_json(prop, value).ok_or_else(|| StructuralError::MalformedField {
            expected: format!("{} value", prop.kind.label()),
            path: path.to_string(),
        })?;
        let obj = getter.live(&*self.host)?;

        if prop.kind == PropertyKind::Enum
            && prop.identifier == vocab::DEFAULT_VALUE
            && (self.host.is_a(&obj, vocab::NODE_SOCKET)?
                || self.host.is_a(&obj, vocab::INTERFACE_SOCKET)?)
        {
            self.defer(DeferredAction::SetEnumDefault {
                target: getter.clone(),
                identifier: prop.identifier.clone(),
                value: scalar,
                path: path.clone(),
            });
            return Ok(());
        }

        self.host.set_scalar(&obj, &prop.identifier, scalar)?;
        Ok(())
    }

    fn import_property_pointer(
        &mut self,
        getter: &Getter,
        prop: &PropertyInfo,
        value: &Value,
        path: &PathTrail,
    ) -> CodecResult<()> {
        match value {
            Value::Null => {
                let obj = getter.live(&*self.host)?;
                if prop.readonly {
                    if self.host.get_pointer(&obj, &prop.identifier)?.is_some() {
                        return Err(StructuralError::UnexpectedPointer {
                            path: path.to_string(),
                        }
                        .into());
                    }
                } else {
                    self.host.set_pointer(&obj, &prop.identifier, None)?;
                }
                Ok(())
            }
            Value::Number(n) => {
                let id = n.as_u64().ok_or_else(|| StructuralError::MalformedField {
                    expected: "a non-negative id".into(),
                    path: path.to_string(),
                })?;
                if prop.readonly {
                    return Err(StructuralError::ReadonlyPointerDeferred {
                        path: path.to_string(),
                    }
                    .into());
                }
                let target = self.resolve_id(id, path)?;
                let obj = getter.live(&*self.host)?;
                self.host
                    .set_pointer(&obj, &prop.identifier, target.as_ref())?;
                Ok(())
            }
            Value::Object(_) => {
                let obj = getter.live(&*self.host)?;
                if self.host.get_pointer(&obj, &prop.identifier)?.is_none() {
                    return Err(StructuralError::UnexpectedNull {
                        path: path.to_string(),
                    }
                    .into());
                }
                self.import_obj(&getter.pointer(&prop.identifier), value, path)
            }
            _ => Err(StructuralError::MalformedField {
                expected: "null, an id or an inline node".into(),
                path: path.to_string(),
            }
            .into()),
        }
    }

    fn import_property_collection(
        &mut self,
        getter: &Getter,
        prop: &PropertyInfo,
        value: &Value,
        path: &PathTrail,
    ) -> CodecResult<()> {
        let (_, data) = split_node(value, path)?;
        let items = data
            .get(ITEMS)
            .and_then(Value::as_array)
            .ok_or_else(|| StructuralError::MalformedField {
                expected: "a collection node with items".into(),
                path: path.to_string(),
            })?;

        let collection = getter.collection(&prop.identifier);
        self.import_obj(&collection, value, path)?;

        let actual = {
            let host: &H = self.host;
            host.collection_len(&collection.live(host)?)?
        };
        if actual != items.len() {
            return Err(StructuralError::ElementCountMismatch {
                expected: items.len(),
                actual,
                path: path.to_string(),
            }
            .into());
        }

        for (i, item) in items.iter().enumerate() {
            let name = item
                .get(DATA)
                .and_then(|d| d.get(vocab::NAME))
                .and_then(Value::as_str)
                .unwrap_or("unnamed");
            self.import_obj(&collection.element(i), item, &path.add(format!("[{i}] ({name})")))?;
        }
        Ok(())
    }

    /// Every writable simple property declared by `assumed_type` that is
    /// present in `data`, except `forbidden`.
    pub fn import_all_simple_writable_properties(
        &mut self,
        getter: &Getter,
        data: &Map<String, Value>,
        assumed_type: &str,
        forbidden: &[&str],
        path: &PathTrail,
    ) -> CodecResult<()> {
        let props: Vec<PropertyInfo> = self
            .host
            .schema()
            .properties(assumed_type)
            .into_iter()
            .filter(|p| !p.readonly && p.kind.is_simple())
            .cloned()
            .collect();
        for prop in &props {
            let prop_path = path.add_prop(prop);
            if forbidden.contains(&prop.identifier.as_str()) {
                tracing::debug!(path = %prop_path, "skipping property forbidden here");
                continue;
            }
            match data.get(&prop.identifier) {
                Some(value) => self.import_property_simple(getter, prop, value, &prop_path)?,
                None => tracing::debug!(path = %prop_path, "not serialized, keeping default"),
            }
        }
        Ok(())
    }

    /// Import the named properties. Each must be present in `data`.
    pub fn import_properties_from_id_list(
        &mut self,
        getter: &Getter,
        data: &Map<String, Value>,
        ids: &[&str],
        path: &PathTrail,
    ) -> CodecResult<()> {
        for id in ids {
            let prop = {
                let host: &H = self.host;
                host.property(&getter.live(host)?, id)?
            };
            let prop_path = path.add_prop(&prop);
            let value = data.get(*id).ok_or_else(|| StructuralError::MissingField {
                identifier: id.to_string(),
                path: prop_path.to_string(),
            })?;
            self.import_property(getter, &prop, value, &prop_path)?;
        }
        Ok(())
    }

    /// Node called `name` in the tree `tree` yields.
    pub fn find_node(&self, tree: &Getter, name: &str) -> CodecResult<Option<H::Handle>> {
        let host: &H = self.host;
        let nodes = host.get_collection(&tree.live(host)?, vocab::NODES_PROP)?;
        for i in 0..host.collection_len(&nodes)? {
            let node = host.element(&nodes, i)?;
            if host.display_name(&node)? == name {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    /// Run every queued action of `phase`, including actions queued while
    /// flushing.
    pub fn flush(&mut self, phase: Phase) -> CodecResult<()> {
        while let Some(action) = self.queues.pop(phase) {
            self.apply(action)?;
        }
        Ok(())
    }

    fn apply(&mut self, action: DeferredAction) -> CodecResult<()> {
        match action {
            DeferredAction::PairChildToParent {
                child,
                parent_id,
                path,
            } => {
                let parent = self.resolve_id(parent_id, &path)?;
                let child = child.live(&*self.host)?;
                tracing::debug!(%path, parent_id, "pairing with parent");
                self.host
                    .set_pointer(&child, vocab::PARENT, parent.as_ref())?;
            }
            DeferredAction::PairZone {
                input,
                tree,
                output_name,
                serialization,
                properties,
                path,
            } => {
                let broken = || StructuralError::BrokenPairing {
                    partner: output_name.clone(),
                    path: path.to_string(),
                };
                let output = self.find_node(&tree, &output_name)?.ok_or_else(broken)?;
                let input_obj = input.live(&*self.host)?;
                let args = Args::new().handle(vocab::ARG_OUTPUT, Some(output));
                if let Err(err) = self
                    .host
                    .invoke(&input_obj, vocab::FN_PAIR_WITH_OUTPUT, &args)
                {
                    tracing::warn!(%path, error = %err, "pairing rejected");
                    return Err(broken().into());
                }
                let ids: Vec<&str> = properties.iter().map(String::as_str).collect();
                self.import_properties_from_id_list(&input, &serialization, &ids, &path)?;
            }
            DeferredAction::Invoke {
                target,
                function,
                path,
            } => {
                tracing::debug!(%path, %function, "calling deferred function");
                let obj = target.live(&*self.host)?;
                self.host.invoke(&obj, &function, &Args::new())?;
            }
            DeferredAction::SetLateFlag {
                target,
                identifier,
                value,
                path,
            }
            | DeferredAction::SetEnumDefault {
                target,
                identifier,
                value,
                path,
            } => {
                tracing::debug!(%path, "applying deferred value");
                let obj = target.live(&*self.host)?;
                self.host.set_scalar(&obj, &identifier, value)?;
            }
        }
        Ok(())
    }

    /// Create the root object for one serialized tree and import it.
    ///
    /// Node groups are created from the serialized `idname`; when
    /// `material_name` is given, a material is created instead and the tree
    /// is imported into its embedded tree.
    pub(crate) fn import_tree(
        &mut self,
        serialization: &Value,
        material_name: Option<&str>,
    ) -> CodecResult<Getter> {
        let (_, data) = split_node(serialization, &PathTrail::root("document"))?;
        let malformed = |expected: &str| StructuralError::MalformedField {
            expected: expected.to_string(),
            path: "document".into(),
        };

        let (getter, path) = match material_name {
            Some(material) => {
                let created = self
                    .host
                    .create_global(vocab::MATERIALS, vocab::MATERIAL, material)?;
                self.host
                    .set_scalar(&created, vocab::USE_NODES, Scalar::Bool(true))?;
                let name = self.host.display_name(&created)?;
                self.record_rename(material, &name);
                (
                    Getter::global(vocab::MATERIALS, name.as_str()).pointer(vocab::NODE_TREE_PROP),
                    PathTrail::root(format!("Material ({name})")),
                )
            }
            None => {
                let original = data
                    .get(vocab::NAME)
                    .and_then(Value::as_str)
                    .ok_or_else(|| malformed("a tree with a name"))?;
                let idname = data
                    .get(vocab::IDNAME)
                    .and_then(Value::as_str)
                    .ok_or_else(|| malformed("a tree with an idname"))?;
                let created = self.host.create_global(vocab::NODE_GROUPS, idname, original)?;
                let name = self.host.display_name(&created)?;
                self.record_rename(original, &name);
                (
                    Getter::global(vocab::NODE_GROUPS, name.as_str()),
                    PathTrail::root(format!("Tree ({name})")),
                )
            }
        };

        self.current_tree = Some(getter.clone());
        let result = self.import_tree_contents(&getter, serialization, &path);
        self.current_tree = None;
        if let Err(err) = result {
            // Actions left over would target the half-built tree.
            self.queues.clear();
            return Err(err);
        }

        self.report.last_root = Some(getter.clone());
        Ok(getter)
    }

    fn import_tree_contents(
        &mut self,
        getter: &Getter,
        serialization: &Value,
        path: &PathTrail,
    ) -> CodecResult<()> {
        self.import_obj(getter, serialization, path)?;
        self.flush(Phase::StructuralPairing)?;
        self.flush(Phase::LateFlag)?;
        self.flush(Phase::EnumDefault)
    }

    fn record_rename(&mut self, original: &str, actual: &str) {
        if original != actual {
            tracing::info!(original, actual, "host renamed imported object");
            self.report
                .renamed
                .insert(original.to_string(), actual.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::CodecError;
    use crate::handlers::import_registry;
    use crate::mem::MemHost;

    /// A tree holding a frame and, inside it, a value node.
    fn framed_value() -> MemHost {
        let mut host = MemHost::new();
        let tree = host.new_tree(vocab::GEOMETRY_NODE_TREE, "Tree").unwrap();
        let frame = host.add_node(&tree, vocab::FRAME_NODE).unwrap();
        let value = host.add_node(&tree, vocab::VALUE_NODE).unwrap();
        host.set_pointer(&value, vocab::PARENT, Some(&frame))
            .unwrap();
        host
    }

    fn nodes() -> Getter {
        Getter::global(vocab::NODE_GROUPS, "Tree").collection(vocab::NODES_PROP)
    }

    fn frame_node(id: u64) -> Value {
        json!({"id": id, "data": {
            "name": "Frame",
            "inputs": {"id": id + 1, "data": {"items": []}},
            "outputs": {"id": id + 2, "data": {"items": []}}
        }})
    }

    fn value_node(outputs: usize, parent: Value) -> Value {
        let items: Vec<Value> = (0..outputs)
            .map(|i| json!({"id": 10 + i, "data": {"name": "Value"}}))
            .collect();
        json!({"id": 3, "data": {
            "name": "Value",
            "parent": parent,
            "inputs": {"id": 4, "data": {"items": []}},
            "outputs": {"id": 5, "data": {"items": items}}
        }})
    }

    fn path() -> PathTrail {
        PathTrail::root("Tree (Tree)")
    }

    #[test]
    fn parents_resolve_once_flushed() {
        let mut host = framed_value();
        let mut importer = Importer::new(&mut host, import_registry().unwrap(), CodecConfig::default());
        importer
            .import_obj(&nodes().element(1), &value_node(1, json!(0)), &path())
            .unwrap();
        importer
            .import_obj(&nodes().element(0), &frame_node(0), &path())
            .unwrap();
        assert_eq!(importer.pending(Phase::StructuralPairing), 1);
        importer.flush(Phase::StructuralPairing).unwrap();
        assert_eq!(importer.pending(Phase::StructuralPairing), 0);
        drop(importer);

        let value = nodes().element(1).live(&host).unwrap();
        let parent = host.get_pointer(&value, vocab::PARENT).unwrap().unwrap();
        assert_eq!(host.display_name(&parent).unwrap(), "Frame");
    }

    #[test]
    fn unknown_parent_id_is_not_deserialized_yet() {
        let mut host = framed_value();
        let mut importer = Importer::new(&mut host, import_registry().unwrap(), CodecConfig::default());
        importer
            .import_obj(&nodes().element(1), &value_node(1, json!(42)), &path())
            .unwrap();
        let err = importer.flush(Phase::StructuralPairing).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Structural(StructuralError::NotDeserializedYet { id: 42, .. })
        ));
    }

    #[test]
    fn null_parent_clears_the_frame() {
        let mut host = framed_value();
        let mut importer = Importer::new(&mut host, import_registry().unwrap(), CodecConfig::default());
        importer
            .import_obj(&nodes().element(1), &value_node(1, Value::Null), &path())
            .unwrap();
        drop(importer);

        let value = nodes().element(1).live(&host).unwrap();
        assert!(host.get_pointer(&value, vocab::PARENT).unwrap().is_none());
    }

    #[test]
    fn null_clears_writable_pointers_generically() {
        let mut host = framed_value();
        let value = nodes().element(1).live(&host).unwrap();
        let prop = host.property(&value, vocab::PARENT).unwrap();

        let mut importer = Importer::new(&mut host, import_registry().unwrap(), CodecConfig::default());
        importer
            .import_property(&nodes().element(1), &prop, &Value::Null, &path())
            .unwrap();
        drop(importer);
        assert!(host.get_pointer(&value, vocab::PARENT).unwrap().is_none());
    }

    #[test]
    fn owned_pointers_cannot_be_emptied() {
        let mut host = framed_value();
        let tree = Getter::global(vocab::NODE_GROUPS, "Tree");
        let live = tree.live(&host).unwrap();
        let prop = host.property(&live, vocab::INTERFACE_PROP).unwrap();
        assert!(prop.readonly);

        let mut importer = Importer::new(&mut host, import_registry().unwrap(), CodecConfig::default());
        let err = importer
            .import_property(&tree, &prop, &Value::Null, &path())
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::Structural(StructuralError::UnexpectedPointer { .. })
        ));
        drop(importer);
        assert!(host.get_pointer(&live, vocab::INTERFACE_PROP).unwrap().is_some());
    }

    #[test]
    fn an_id_is_imported_once() {
        let mut host = framed_value();
        let mut importer = Importer::new(&mut host, import_registry().unwrap(), CodecConfig::default());
        let serialized = value_node(1, Value::Null);
        importer
            .import_obj(&nodes().element(1), &serialized, &path())
            .unwrap();
        let err = importer
            .import_obj(&nodes().element(1), &serialized, &path())
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::Structural(StructuralError::DoubleDeserialization { id: 3, .. })
        ));
    }

    #[test]
    fn socket_counts_must_match() {
        let mut host = framed_value();
        let mut importer = Importer::new(&mut host, import_registry().unwrap(), CodecConfig::default());
        let err = importer
            .import_obj(&nodes().element(1), &value_node(2, Value::Null), &path())
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::Structural(StructuralError::ElementCountMismatch {
                expected: 2,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    fn sockets_cannot_be_left_out() {
        let mut host = framed_value();
        let mut importer = Importer::new(&mut host, import_registry().unwrap(), CodecConfig::default());
        let serialized = json!({"id": 3, "data": {"name": "Value"}});
        let err = importer
            .import_obj(&nodes().element(1), &serialized, &path())
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::Structural(StructuralError::MissingField { .. })
        ));
    }

    #[test]
    fn missing_scalars_keep_their_default() {
        let mut host = framed_value();
        let mut importer = Importer::new(&mut host, import_registry().unwrap(), CodecConfig::default());
        importer
            .import_obj(&nodes().element(0), &frame_node(0), &path())
            .unwrap();
        assert!(importer.report().warnings.is_empty());
        assert_eq!(importer.report().imported_nodes, 1);
        drop(importer);

        let frame = nodes().element(0).live(&host).unwrap();
        assert_eq!(
            host.get_scalar(&frame, "label_size").unwrap(),
            Scalar::Int(20)
        );
    }
}
