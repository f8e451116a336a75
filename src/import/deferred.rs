//! Work postponed until the host is in a state that accepts it.
//!
//! Some writes only succeed once other parts of the tree exist: a node's
//! parent frame, the sockets of a zone input mirrored from its paired output,
//! enum defaults whose allowed values come from links, flags that delete
//! their owner when nothing is linked to it. These are queued as
//! [`DeferredAction`]s and flushed phase by phase.

use std::collections::VecDeque;

use serde_json::{Map, Value};

use crate::host::Scalar;
use crate::path::PathTrail;

use super::Getter;

/// When a deferred action runs, relative to link creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// After all nodes of a tree exist, before links.
    StructuralPairing,
    /// After links.
    LateFlag,
    /// Last, once everything that constrains enum values is in place.
    EnumDefault,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeferredAction {
    /// Set the `parent` of `child` to the object registered as `parent_id`.
    PairChildToParent {
        child: Getter,
        parent_id: u64,
        path: PathTrail,
    },
    /// Pair a zone input with the output named `output_name` in the current
    /// tree, then import `properties` of the input from `serialization`.
    PairZone {
        input: Getter,
        tree: Getter,
        output_name: String,
        serialization: Map<String, Value>,
        properties: Vec<String>,
        path: PathTrail,
    },
    /// Call `function` on `target` without arguments.
    Invoke {
        target: Getter,
        function: String,
        path: PathTrail,
    },
    SetLateFlag {
        target: Getter,
        identifier: String,
        value: Scalar,
        path: PathTrail,
    },
    SetEnumDefault {
        target: Getter,
        identifier: String,
        value: Scalar,
        path: PathTrail,
    },
}

impl DeferredAction {
    pub fn phase(&self) -> Phase {
        match self {
            Self::PairChildToParent { .. } | Self::PairZone { .. } | Self::Invoke { .. } => {
                Phase::StructuralPairing
            }
            Self::SetLateFlag { .. } => Phase::LateFlag,
            Self::SetEnumDefault { .. } => Phase::EnumDefault,
        }
    }
}

/// One FIFO queue per [`Phase`].
#[derive(Debug, Clone, Default)]
pub struct DeferredQueues {
    structural: VecDeque<DeferredAction>,
    late_flags: VecDeque<DeferredAction>,
    enum_defaults: VecDeque<DeferredAction>,
}

impl DeferredQueues {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue_mut(&mut self, phase: Phase) -> &mut VecDeque<DeferredAction> {
        match phase {
            Phase::StructuralPairing => &mut self.structural,
            Phase::LateFlag => &mut self.late_flags,
            Phase::EnumDefault => &mut self.enum_defaults,
        }
    }

    pub fn push(&mut self, action: DeferredAction) {
        self.queue_mut(action.phase()).push_back(action);
    }

    pub fn pop(&mut self, phase: Phase) -> Option<DeferredAction> {
        self.queue_mut(phase).pop_front()
    }

    pub fn len(&self, phase: Phase) -> usize {
        match phase {
            Phase::StructuralPairing => self.structural.len(),
            Phase::LateFlag => self.late_flags.len(),
            Phase::EnumDefault => self.enum_defaults.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.structural.is_empty() && self.late_flags.is_empty() && self.enum_defaults.is_empty()
    }

    /// Drop every queued action.
    pub fn clear(&mut self) {
        self.structural.clear();
        self.late_flags.clear();
        self.enum_defaults.clear();
    }
}
