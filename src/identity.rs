//! Canonical identity of host objects.
//!
//! Host handles are unstable: the same global object can be reached through
//! handles that do not compare equal. Before a handle is used as a map key
//! (serialized-object table, pointer grouping) it is canonicalized: global
//! objects are re-fetched from their registry by name, everything else is
//! taken as is.

use crate::error::{CodecResult, StructuralError};
use crate::host::Host;

/// Map `handle` to the representative handle for its object.
///
/// Idempotent; two handles to the same live global object canonicalize to
/// equal handles. Fails if a global object has vanished from its registry.
pub fn canonicalize<H: Host>(host: &H, handle: &H::Handle) -> CodecResult<H::Handle> {
    match host.global_key(handle)? {
        None => Ok(handle.clone()),
        Some(key) => host
            .lookup_global(&key)
            .ok_or_else(|| StructuralError::ObjectVanished { key: key.to_string() }.into()),
    }
}

/// Whether two handles denote the same object.
pub fn same_object<H: Host>(host: &H, a: &H::Handle, b: &H::Handle) -> CodecResult<bool> {
    Ok(canonicalize(host, a)? == canonicalize(host, b)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;
    use crate::host::Scalar;
    use crate::mem::{MemHandle, MemHost};
    use crate::vocab;

    #[test]
    fn named_and_direct_handles_agree() {
        let mut host = MemHost::new();
        let tree = host.new_tree(vocab::GEOMETRY_NODE_TREE, "Main").unwrap();
        let named = MemHandle::named(vocab::NODE_GROUPS, "Main");
        assert_ne!(tree, named);
        assert_eq!(
            canonicalize(&host, &named).unwrap(),
            canonicalize(&host, &tree).unwrap()
        );
        assert!(same_object(&host, &tree, &named).unwrap());
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let mut host = MemHost::new();
        let tree = host.new_tree(vocab::GEOMETRY_NODE_TREE, "Main").unwrap();
        let node = host.add_node(&tree, vocab::VALUE_NODE).unwrap();
        let once = canonicalize(&host, &node).unwrap();
        assert_eq!(canonicalize(&host, &once).unwrap(), once);
        assert_eq!(once, node);
    }

    #[test]
    fn renamed_global_vanishes() {
        let mut host = MemHost::new();
        let tree = host.new_tree(vocab::GEOMETRY_NODE_TREE, "Main").unwrap();
        let named = MemHandle::named(vocab::NODE_GROUPS, "Main");
        host.set_scalar(&tree, vocab::NAME, Scalar::from("Renamed"))
            .unwrap();
        let err = canonicalize(&host, &named).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Structural(StructuralError::ObjectVanished { .. })
        ));
    }
}
