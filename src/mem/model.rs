//! Object store of the reference host.
//!
//! Objects live in an arena and are addressed by [`ObjectId`]. Deleted
//! objects stay in the arena as tombstones so stale handles fail loudly
//! instead of aliasing a newer object.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{HostError, HostResult};
use crate::host::Scalar;
use crate::vocab;

/// Index of an object in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle handed out by [`MemHost`](super::MemHost).
///
/// Pointers to global objects come back as [`MemHandle::Named`], the way a
/// scripting layer hands out fresh proxies on every access; everything else
/// is addressed directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemHandle {
    Object(ObjectId),
    Named { block: String, name: String },
}

impl MemHandle {
    pub fn named(block: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Named {
            block: block.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for MemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(id) => write!(f, "{id}"),
            Self::Named { block, name } => write!(f, "{block}[\"{name}\"]"),
        }
    }
}

/// Storage of one property value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Slot {
    Scalar(Scalar),
    Pointer(Option<ObjectId>),
    /// Container object holding the elements.
    Collection(ObjectId),
}

#[derive(Debug, Clone)]
pub(crate) struct Object {
    pub type_name: String,
    /// Registry the object is listed in, for global objects.
    pub block: Option<String>,
    /// Owning root object; globals and embedded trees own themselves.
    pub root: ObjectId,
    /// Container of an element, owner of a container or inline sub-object.
    pub parent: Option<ObjectId>,
    pub fields: BTreeMap<String, Slot>,
    /// Elements, for collection containers.
    pub elements: Vec<ObjectId>,
    pub collection: bool,
    pub alive: bool,
}

impl Object {
    pub fn new(type_name: &str, root: ObjectId, collection: bool) -> Self {
        Self {
            type_name: type_name.to_string(),
            block: None,
            root,
            parent: None,
            fields: BTreeMap::new(),
            elements: Vec::new(),
            collection,
            alive: true,
        }
    }
}

/// Arena of every object ever created.
#[derive(Debug, Clone, Default)]
pub(crate) struct Store {
    objects: Vec<Object>,
}

impl Store {
    /// Id the next inserted object will get.
    pub fn next_id(&self) -> ObjectId {
        ObjectId(self.objects.len() as u32)
    }

    pub fn insert(&mut self, object: Object) -> ObjectId {
        let id = self.next_id();
        self.objects.push(object);
        id
    }

    pub fn get(&self, id: ObjectId) -> HostResult<&Object> {
        self.objects
            .get(id.0 as usize)
            .filter(|o| o.alive)
            .ok_or_else(|| HostError::NotFound {
                what: format!("object {id}"),
            })
    }

    pub fn get_mut(&mut self, id: ObjectId) -> HostResult<&mut Object> {
        self.objects
            .get_mut(id.0 as usize)
            .filter(|o| o.alive)
            .ok_or_else(|| HostError::NotFound {
                what: format!("object {id}"),
            })
    }

    /// Live objects with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects
            .iter()
            .enumerate()
            .filter(|(_, o)| o.alive)
            .map(|(i, o)| (ObjectId(i as u32), o))
    }

    pub fn slot(&self, id: ObjectId, identifier: &str) -> HostResult<&Slot> {
        let object = self.get(id)?;
        object
            .fields
            .get(identifier)
            .ok_or_else(|| HostError::NoSuchProperty {
                type_name: object.type_name.clone(),
                identifier: identifier.to_string(),
            })
    }

    pub fn scalar(&self, id: ObjectId, identifier: &str) -> HostResult<&Scalar> {
        match self.slot(id, identifier)? {
            Slot::Scalar(value) => Ok(value),
            _ => Err(wrong_kind(identifier, "simple property")),
        }
    }

    pub fn pointer(&self, id: ObjectId, identifier: &str) -> HostResult<Option<ObjectId>> {
        match self.slot(id, identifier)? {
            Slot::Pointer(target) => Ok(*target),
            _ => Err(wrong_kind(identifier, "pointer")),
        }
    }

    pub fn collection(&self, id: ObjectId, identifier: &str) -> HostResult<ObjectId> {
        match self.slot(id, identifier)? {
            Slot::Collection(container) => Ok(*container),
            _ => Err(wrong_kind(identifier, "collection")),
        }
    }

    /// String value of a scalar field, empty when it is not a string.
    pub fn text(&self, id: ObjectId, identifier: &str) -> String {
        self.scalar(id, identifier)
            .ok()
            .and_then(Scalar::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn flag(&self, id: ObjectId, identifier: &str) -> bool {
        self.scalar(id, identifier)
            .ok()
            .and_then(Scalar::as_bool)
            .unwrap_or(false)
    }

    /// Write a field without any validation.
    pub fn put(&mut self, id: ObjectId, identifier: &str, slot: Slot) -> HostResult<()> {
        self.get_mut(id)?.fields.insert(identifier.to_string(), slot);
        Ok(())
    }

    pub fn elements(&self, container: ObjectId) -> HostResult<&[ObjectId]> {
        Ok(&self.get(container)?.elements)
    }

    /// Delete an object together with everything it owns: collection
    /// containers, their elements and inline sub-objects.
    pub fn kill(&mut self, id: ObjectId) {
        let Ok(object) = self.get_mut(id) else {
            return;
        };
        object.alive = false;
        let mut owned: Vec<ObjectId> = std::mem::take(&mut object.elements);
        for (identifier, slot) in &object.fields {
            match slot {
                Slot::Collection(container) => owned.push(*container),
                Slot::Pointer(Some(target)) if OWNED_POINTERS.contains(&identifier.as_str()) => {
                    owned.push(*target)
                }
                _ => {}
            }
        }
        for child in owned {
            self.kill(child);
        }
    }
}

/// Pointers whose target is part of the pointing object.
const OWNED_POINTERS: &[&str] = &[
    vocab::INTERFACE_PROP,
    vocab::COLOR_RAMP_PROP,
    vocab::MAPPING,
    vocab::RENDER,
    vocab::CYCLES,
];

fn wrong_kind(identifier: &str, expected: &'static str) -> HostError {
    HostError::WrongKind {
        identifier: identifier.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn killed_objects_are_gone() {
        let mut store = Store::default();
        let root = store.next_id();
        let id = store.insert(Object::new("Node", root, false));
        let container = store.insert(Object::new("NodeInputs", root, true));
        store.put(id, "inputs", Slot::Collection(container)).unwrap();

        store.kill(id);
        assert!(store.get(id).is_err());
        assert!(store.get(container).is_err());
        assert_eq!(store.iter().count(), 0);
    }

    #[test]
    fn slot_kind_is_checked() {
        let mut store = Store::default();
        let root = store.next_id();
        let id = store.insert(Object::new("Node", root, false));
        store.put(id, "name", Slot::Scalar(Scalar::from("Math"))).unwrap();
        assert_eq!(store.text(id, "name"), "Math");
        assert!(matches!(
            store.pointer(id, "name"),
            Err(HostError::WrongKind { .. })
        ));
        assert!(matches!(
            store.scalar(id, "label"),
            Err(HostError::NoSuchProperty { .. })
        ));
    }
}
