//! Replayable access paths to host objects.
//!
//! Import mutates the host, and mutations may invalidate every handle taken
//! before them. A [`Getter`] records *how* an object was reached (a global
//! registry entry, then pointers, collections and element indices) and walks
//! that route again on each access.

use std::fmt;
use std::rc::Rc;

use crate::error::{CodecResult, HostError, HostResult, StructuralError, ValidationError};
use crate::host::{GlobalKey, Host};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Getter {
    /// Always yields nothing. Used for external references left unresolved.
    Null,
    Global(GlobalKey),
    Pointer {
        parent: Rc<Getter>,
        identifier: String,
    },
    Collection {
        parent: Rc<Getter>,
        identifier: String,
    },
    Element {
        collection: Rc<Getter>,
        index: usize,
    },
}

impl Getter {
    pub fn global(block: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Global(GlobalKey::new(block, name))
    }

    /// Getter for the target of pointer property `identifier`.
    pub fn pointer(&self, identifier: &str) -> Self {
        Self::Pointer {
            parent: Rc::new(self.clone()),
            identifier: identifier.to_string(),
        }
    }

    /// Getter for the container behind collection property `identifier`.
    pub fn collection(&self, identifier: &str) -> Self {
        Self::Collection {
            parent: Rc::new(self.clone()),
            identifier: identifier.to_string(),
        }
    }

    /// Getter for element `index` of the collection this getter yields.
    pub fn element(&self, index: usize) -> Self {
        Self::Element {
            collection: Rc::new(self.clone()),
            index,
        }
    }

    /// Walk the route. `Ok(None)` when it ends in an empty pointer or is
    /// [`Getter::Null`].
    pub fn get<H: Host>(&self, host: &H) -> HostResult<Option<H::Handle>> {
        match self {
            Self::Null => Ok(None),
            Self::Global(key) => host
                .lookup_global(key)
                .map(Some)
                .ok_or_else(|| HostError::NotFound {
                    what: key.to_string(),
                }),
            Self::Pointer { parent, identifier } => match parent.get(host)? {
                Some(owner) => host.get_pointer(&owner, identifier),
                None => Err(HostError::NotFound {
                    what: parent.to_string(),
                }),
            },
            Self::Collection { parent, identifier } => match parent.get(host)? {
                Some(owner) => host.get_collection(&owner, identifier).map(Some),
                None => Err(HostError::NotFound {
                    what: parent.to_string(),
                }),
            },
            Self::Element { collection, index } => match collection.get(host)? {
                Some(container) => host.element(&container, *index).map(Some),
                None => Err(HostError::NotFound {
                    what: collection.to_string(),
                }),
            },
        }
    }

    /// Walk the route and require an object at its end.
    pub fn live<H: Host>(&self, host: &H) -> CodecResult<H::Handle> {
        self.get(host)?.ok_or_else(|| {
            StructuralError::UnexpectedNull {
                path: self.to_string(),
            }
            .into()
        })
    }
}

impl fmt::Display for Getter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("<null>"),
            Self::Global(key) => write!(f, "{key}"),
            Self::Pointer { parent, identifier } | Self::Collection { parent, identifier } => {
                write!(f, "{parent}.{identifier}")
            }
            Self::Element { collection, index } => write!(f, "{collection}[{index}]"),
        }
    }
}

/// Getter that re-fetches a global object by registry name.
pub fn global_getter<H: Host>(
    host: &H,
    handle: &H::Handle,
    external_id: u64,
) -> CodecResult<Getter> {
    match host.global_key(handle)? {
        Some(key) => Ok(Getter::Global(key)),
        None => Err(ValidationError::NotGlobal { external_id }.into()),
    }
}
