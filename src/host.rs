//! Reflection boundary to the live object model.
//!
//! The codec never knows concrete host types. Everything it learns about an
//! object (its type name, its properties and their kinds, its place in the
//! global registries) goes through the [`Host`] trait and the [`Schema`] the
//! host publishes. A host is anything that can answer those questions: the
//! in-memory model in [`crate::mem`] or a binding to a real application.

use std::fmt;
use std::fmt::Debug;
use std::hash::Hash;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HostError, HostResult};

// ---------------------------------------------------------------------------
// Property metadata
// ---------------------------------------------------------------------------

/// The kind of a reflected property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    Boolean,
    Int,
    Float,
    String,
    Enum,
    Pointer,
    Collection,
}

impl PropertyKind {
    /// Simple properties hold plain data and are copied by value.
    pub fn is_simple(self) -> bool {
        !matches!(self, Self::Pointer | Self::Collection)
    }

    /// Upper-case label used in path trails.
    pub fn label(self) -> &'static str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::Int => "INT",
            Self::Float => "FLOAT",
            Self::String => "STRING",
            Self::Enum => "ENUM",
            Self::Pointer => "POINTER",
            Self::Collection => "COLLECTION",
        }
    }
}

/// Reflected description of one property of a host type.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyInfo {
    pub identifier: String,
    pub kind: PropertyKind,
    pub readonly: bool,
    /// Zero for scalars, the declared length for array properties.
    pub array_length: usize,
    pub hard_min: f64,
    pub hard_max: f64,
    /// Flag enums hold a set of identifiers instead of one.
    pub enum_flag: bool,
    /// Allowed enum identifiers. Empty means the host decides at runtime.
    pub enum_items: Vec<String>,
    /// Target type of a pointer, element type of a collection.
    pub fixed_type: Option<String>,
    /// Type of the container object behind a collection property.
    pub container_type: Option<String>,
    pub default: Option<Scalar>,
}

impl PropertyInfo {
    fn new(identifier: &str, kind: PropertyKind) -> Self {
        Self {
            identifier: identifier.to_string(),
            kind,
            readonly: false,
            array_length: 0,
            hard_min: f64::NEG_INFINITY,
            hard_max: f64::INFINITY,
            enum_flag: false,
            enum_items: Vec::new(),
            fixed_type: None,
            container_type: None,
            default: None,
        }
    }

    pub fn boolean(identifier: &str) -> Self {
        Self::new(identifier, PropertyKind::Boolean)
    }

    pub fn int(identifier: &str, hard_min: i64, hard_max: i64) -> Self {
        let mut info = Self::new(identifier, PropertyKind::Int);
        info.hard_min = hard_min as f64;
        info.hard_max = hard_max as f64;
        info
    }

    pub fn float(identifier: &str, hard_min: f64, hard_max: f64) -> Self {
        let mut info = Self::new(identifier, PropertyKind::Float);
        info.hard_min = hard_min;
        info.hard_max = hard_max;
        info
    }

    pub fn string(identifier: &str) -> Self {
        Self::new(identifier, PropertyKind::String)
    }

    pub fn enumeration(identifier: &str, items: &[&str]) -> Self {
        let mut info = Self::new(identifier, PropertyKind::Enum);
        info.enum_items = items.iter().map(|s| s.to_string()).collect();
        info
    }

    pub fn pointer(identifier: &str, fixed_type: &str) -> Self {
        let mut info = Self::new(identifier, PropertyKind::Pointer);
        info.fixed_type = Some(fixed_type.to_string());
        info
    }

    /// Collections are always read-only as properties: their content changes,
    /// the container itself never does.
    pub fn collection(identifier: &str, container_type: &str, element_type: &str) -> Self {
        let mut info = Self::new(identifier, PropertyKind::Collection);
        info.readonly = true;
        info.fixed_type = Some(element_type.to_string());
        info.container_type = Some(container_type.to_string());
        info
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn array(mut self, length: usize) -> Self {
        self.array_length = length;
        self
    }

    pub fn flag(mut self) -> Self {
        self.enum_flag = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Scalar>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn is_array(&self) -> bool {
        self.array_length > 0
    }
}

// ---------------------------------------------------------------------------
// Scalar values
// ---------------------------------------------------------------------------

/// Plain data read from or written to a simple property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    BoolArray(Vec<bool>),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
    /// Value of a flag enum.
    StringSet(Vec<String>),
}

impl Scalar {
    /// The zero value a freshly created object holds for `info`.
    pub fn zero_for(info: &PropertyInfo) -> Option<Self> {
        if let Some(default) = &info.default {
            return Some(default.clone());
        }
        let n = info.array_length;
        Some(match (info.kind, info.is_array()) {
            (PropertyKind::Boolean, false) => Self::Bool(false),
            (PropertyKind::Boolean, true) => Self::BoolArray(vec![false; n]),
            (PropertyKind::Int, false) => Self::Int(0),
            (PropertyKind::Int, true) => Self::IntArray(vec![0; n]),
            (PropertyKind::Float, false) => Self::Float(0.0),
            (PropertyKind::Float, true) => Self::FloatArray(vec![0.0; n]),
            (PropertyKind::String, _) => Self::String(String::new()),
            (PropertyKind::Enum, _) if info.enum_flag => Self::StringSet(Vec::new()),
            (PropertyKind::Enum, _) => {
                Self::String(info.enum_items.first().cloned().unwrap_or_default())
            }
            (PropertyKind::Pointer | PropertyKind::Collection, _) => return None,
        })
    }

    /// Parse a JSON value into the scalar shape `info` expects.
    pub fn from_json(info: &PropertyInfo, value: &Value) -> Option<Self> {
        match (info.kind, info.is_array()) {
            (PropertyKind::Boolean, false) => value.as_bool().map(Self::Bool),
            (PropertyKind::Boolean, true) => collect(value, Value::as_bool).map(Self::BoolArray),
            (PropertyKind::Int, false) => value.as_i64().map(Self::Int),
            (PropertyKind::Int, true) => collect(value, Value::as_i64).map(Self::IntArray),
            (PropertyKind::Float, false) => value.as_f64().map(Self::Float),
            (PropertyKind::Float, true) => collect(value, Value::as_f64).map(Self::FloatArray),
            (PropertyKind::String, _) => value.as_str().map(|s| Self::String(s.to_string())),
            (PropertyKind::Enum, _) if info.enum_flag => {
                collect(value, |v| v.as_str().map(str::to_string)).map(Self::StringSet)
            }
            (PropertyKind::Enum, _) => value.as_str().map(|s| Self::String(s.to_string())),
            (PropertyKind::Pointer | PropertyKind::Collection, _) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::from(*b),
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::String(s) => Value::from(s.as_str()),
            Self::BoolArray(v) => Value::from(v.clone()),
            Self::IntArray(v) => Value::from(v.clone()),
            Self::FloatArray(v) => Value::from(v.clone()),
            Self::StringSet(v) => Value::from(v.clone()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Number of elements of an array value, `None` for scalars.
    pub fn array_len(&self) -> Option<usize> {
        match self {
            Self::BoolArray(v) => Some(v.len()),
            Self::IntArray(v) => Some(v.len()),
            Self::FloatArray(v) => Some(v.len()),
            Self::StringSet(v) => Some(v.len()),
            _ => None,
        }
    }

    /// Drop trailing array elements beyond `len`. Scalars are left alone.
    pub fn truncate(&mut self, len: usize) {
        match self {
            Self::BoolArray(v) => v.truncate(len),
            Self::IntArray(v) => v.truncate(len),
            Self::FloatArray(v) => v.truncate(len),
            Self::StringSet(v) => v.truncate(len),
            _ => {}
        }
    }

    /// Clamp every numeric component into `[min, max]`. Returns whether
    /// anything changed. Integers are clamped against the integer bounds
    /// inside the range, so values beyond float precision stay exact. NaN is
    /// left as is.
    pub fn clamp(&mut self, min: f64, max: f64) -> bool {
        let changed = std::cell::Cell::new(false);
        let mut clamp_f = |x: &mut f64| {
            if x.is_nan() {
                return;
            }
            let clamped = x.clamp(min, max);
            if clamped != *x {
                *x = clamped;
                changed.set(true);
            }
        };
        // Float to int casts saturate.
        let (lo, hi) = (min.ceil() as i64, max.floor() as i64);
        let mut clamp_i = |i: &mut i64| {
            if lo > hi {
                return;
            }
            let clamped = (*i).clamp(lo, hi);
            if clamped != *i {
                *i = clamped;
                changed.set(true);
            }
        };
        match self {
            Self::Float(f) => clamp_f(f),
            Self::FloatArray(v) => v.iter_mut().for_each(&mut clamp_f),
            Self::Int(i) => clamp_i(i),
            Self::IntArray(v) => v.iter_mut().for_each(&mut clamp_i),
            _ => {}
        }
        changed.get()
    }
}

fn collect<T>(value: &Value, f: impl Fn(&Value) -> Option<T>) -> Option<Vec<T>> {
    value.as_array()?.iter().map(f).collect()
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<f64>> for Scalar {
    fn from(v: Vec<f64>) -> Self {
        Self::FloatArray(v)
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// A host function and the names of the parameters it requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    pub parameters: Vec<String>,
}

/// Reflected description of one host type.
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: String,
    pub bases: Vec<String>,
    pub properties: Vec<PropertyInfo>,
    pub functions: Vec<FunctionDef>,
    /// Collection containers are polymorphic and dispatched by their own name.
    pub collection: bool,
}

impl TypeDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bases: Vec::new(),
            properties: Vec::new(),
            functions: Vec::new(),
            collection: false,
        }
    }

    pub fn collection(name: &str) -> Self {
        Self {
            collection: true,
            ..Self::new(name)
        }
    }

    pub fn base(mut self, base: &str) -> Self {
        self.bases.push(base.to_string());
        self
    }

    pub fn prop(mut self, info: PropertyInfo) -> Self {
        self.properties.push(info);
        self
    }

    pub fn function(mut self, name: &str, parameters: &[&str]) -> Self {
        self.functions.push(FunctionDef {
            name: name.to_string(),
            parameters: parameters.iter().map(|s| s.to_string()).collect(),
        });
        self
    }
}

/// Every type a host exposes, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    types: IndexMap<String, TypeDef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, def: TypeDef) {
        self.types.insert(def.name.clone(), def);
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.values()
    }

    /// All properties of `name`, inherited ones first. A property redeclared by
    /// a subtype replaces the inherited declaration in place.
    pub fn properties(&self, name: &str) -> Vec<&PropertyInfo> {
        let mut out: Vec<&PropertyInfo> = Vec::new();
        self.collect_properties(name, &mut out);
        out
    }

    fn collect_properties<'a>(&'a self, name: &str, out: &mut Vec<&'a PropertyInfo>) {
        let Some(def) = self.types.get(name) else {
            return;
        };
        for base in &def.bases {
            self.collect_properties(base, out);
        }
        for prop in &def.properties {
            match out.iter().position(|p| p.identifier == prop.identifier) {
                Some(i) => out[i] = prop,
                None => out.push(prop),
            }
        }
    }

    pub fn property(&self, type_name: &str, identifier: &str) -> Option<&PropertyInfo> {
        self.properties(type_name)
            .into_iter()
            .find(|p| p.identifier == identifier)
    }

    /// Whether `name` is `base` or derives from it.
    pub fn is_a(&self, name: &str, base: &str) -> bool {
        if name == base {
            return true;
        }
        self.types
            .get(name)
            .is_some_and(|def| def.bases.iter().any(|b| self.is_a(b, base)))
    }

    /// Whether any function of `name` needs arguments, i.e. elements of a
    /// collection of this type cannot be created blindly.
    pub fn requires_arguments(&self, name: &str) -> bool {
        self.types
            .get(name)
            .is_some_and(|def| def.functions.iter().any(|f| !f.parameters.is_empty()))
    }
}

// ---------------------------------------------------------------------------
// Global identity
// ---------------------------------------------------------------------------

/// Address of an object in one of the host's global registries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GlobalKey {
    pub block: String,
    pub name: String,
}

impl GlobalKey {
    pub fn new(block: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            block: block.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for GlobalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[\"{}\"]", self.block, self.name)
    }
}

// ---------------------------------------------------------------------------
// Constructor / function arguments
// ---------------------------------------------------------------------------

/// One named argument to a host constructor or function.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg<Hd> {
    Scalar(Scalar),
    Handle(Option<Hd>),
}

/// Named arguments, in call order.
#[derive(Debug, Clone, PartialEq)]
pub struct Args<Hd> {
    entries: Vec<(String, Arg<Hd>)>,
}

impl<Hd> Default for Args<Hd> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<Hd> Args<Hd> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scalar(mut self, name: &str, value: impl Into<Scalar>) -> Self {
        self.entries.push((name.to_string(), Arg::Scalar(value.into())));
        self
    }

    pub fn handle(mut self, name: &str, handle: Option<Hd>) -> Self {
        self.entries.push((name.to_string(), Arg::Handle(handle)));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arg<Hd>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, arg)| arg)
    }

    pub fn get_scalar(&self, name: &str) -> Option<&Scalar> {
        match self.get(name) {
            Some(Arg::Scalar(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get_scalar(name).and_then(Scalar::as_str)
    }

    pub fn get_handle(&self, name: &str) -> Option<&Hd> {
        match self.get(name) {
            Some(Arg::Handle(h)) => h.as_ref(),
            _ => None,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

// ---------------------------------------------------------------------------
// Host trait
// ---------------------------------------------------------------------------

/// A live object model the codec can introspect and mutate.
///
/// Handles may be unstable: two handles to the same object need not compare
/// equal, and a handle may stop working after a mutation. The codec only
/// compares handles after passing them through
/// [`canonicalize`](crate::identity::canonicalize), and only keeps
/// [`Getter`](crate::import::Getter)s (never handles) across mutations.
pub trait Host {
    type Handle: Clone + Eq + Hash + Debug;

    fn schema(&self) -> &Schema;

    /// Version string of the running host, compared exactly on import.
    fn host_version(&self) -> String;

    fn type_name(&self, handle: &Self::Handle) -> HostResult<String>;

    fn is_collection(&self, handle: &Self::Handle) -> HostResult<bool>;

    /// The root object that owns `handle` (its "id data"). Global objects and
    /// embedded trees own themselves.
    fn owner(&self, handle: &Self::Handle) -> HostResult<Option<Self::Handle>>;

    /// Registry address of `handle` if it is a global object.
    fn global_key(&self, handle: &Self::Handle) -> HostResult<Option<GlobalKey>>;

    fn lookup_global(&self, key: &GlobalKey) -> Option<Self::Handle>;

    /// Create a new global object. The host may rename it to keep names
    /// unique within `block`.
    fn create_global(
        &mut self,
        block: &str,
        type_name: &str,
        name: &str,
    ) -> HostResult<Self::Handle>;

    fn get_scalar(&self, handle: &Self::Handle, identifier: &str) -> HostResult<Scalar>;

    fn set_scalar(
        &mut self,
        handle: &Self::Handle,
        identifier: &str,
        value: Scalar,
    ) -> HostResult<()>;

    fn get_pointer(
        &self,
        handle: &Self::Handle,
        identifier: &str,
    ) -> HostResult<Option<Self::Handle>>;

    fn set_pointer(
        &mut self,
        handle: &Self::Handle,
        identifier: &str,
        target: Option<&Self::Handle>,
    ) -> HostResult<()>;

    /// The container object behind a collection property.
    fn get_collection(&self, handle: &Self::Handle, identifier: &str)
    -> HostResult<Self::Handle>;

    fn collection_len(&self, collection: &Self::Handle) -> HostResult<usize>;

    fn element(&self, collection: &Self::Handle, index: usize) -> HostResult<Self::Handle>;

    fn clear(&mut self, collection: &Self::Handle) -> HostResult<()>;

    fn remove(&mut self, collection: &Self::Handle, index: usize) -> HostResult<()>;

    /// Create a new element in `collection`.
    fn construct(
        &mut self,
        collection: &Self::Handle,
        args: &Args<Self::Handle>,
    ) -> HostResult<Self::Handle>;

    /// Call a host function on `handle`.
    fn invoke(
        &mut self,
        handle: &Self::Handle,
        function: &str,
        args: &Args<Self::Handle>,
    ) -> HostResult<Option<Self::Handle>>;

    /// Reflected property list of `handle`'s runtime type.
    fn properties(&self, handle: &Self::Handle) -> HostResult<Vec<PropertyInfo>> {
        let type_name = self.type_name(handle)?;
        Ok(self
            .schema()
            .properties(&type_name)
            .into_iter()
            .cloned()
            .collect())
    }

    fn property(&self, handle: &Self::Handle, identifier: &str) -> HostResult<PropertyInfo> {
        let type_name = self.type_name(handle)?;
        self.schema()
            .property(&type_name, identifier)
            .cloned()
            .ok_or(HostError::NoSuchProperty {
                type_name,
                identifier: identifier.to_string(),
            })
    }

    fn has_property(&self, handle: &Self::Handle, identifier: &str) -> HostResult<bool> {
        let type_name = self.type_name(handle)?;
        Ok(self.schema().property(&type_name, identifier).is_some())
    }

    fn is_a(&self, handle: &Self::Handle, base: &str) -> HostResult<bool> {
        let type_name = self.type_name(handle)?;
        Ok(self.schema().is_a(&type_name, base))
    }

    /// The object's `name` property, or `"unnamed"` when it has none.
    fn display_name(&self, handle: &Self::Handle) -> HostResult<String> {
        if !self.has_property(handle, "name")? {
            return Ok("unnamed".to_string());
        }
        Ok(self
            .get_scalar(handle, "name")?
            .as_str()
            .unwrap_or("unnamed")
            .to_string())
    }
}
