//! Convenience builders for assembling graphs by hand.
//!
//! They go through the public [`Host`] surface, so everything they create is
//! journaled and validated like any other mutation.

use crate::error::HostResult;
use crate::host::{Args, Host, Scalar};
use crate::vocab::*;

use super::{MemHandle, MemHost};

impl MemHost {
    /// Register a new node group.
    pub fn new_tree(&mut self, tree_type: &str, name: &str) -> HostResult<MemHandle> {
        self.create_global(NODE_GROUPS, tree_type, name)
    }

    /// Register a new material. Its node tree only appears once `use_nodes`
    /// is switched on.
    pub fn new_material(&mut self, name: &str) -> HostResult<MemHandle> {
        self.create_global(MATERIALS, MATERIAL, name)
    }

    pub fn new_image(&mut self, name: &str) -> HostResult<MemHandle> {
        self.create_global(IMAGES, IMAGE, name)
    }

    /// Register a new scene rendering with `engine`.
    pub fn new_scene(&mut self, name: &str, engine: &str) -> HostResult<MemHandle> {
        let scene = self.create_global(SCENES, SCENE, name)?;
        if let Some(render) = self.get_pointer(&scene, RENDER)? {
            self.set_scalar(&render, ENGINE, Scalar::from(engine))?;
        }
        Ok(scene)
    }

    /// Add a node of `node_type` to `tree`.
    pub fn add_node(&mut self, tree: &MemHandle, node_type: &str) -> HostResult<MemHandle> {
        let nodes = self.get_collection(tree, NODES_PROP)?;
        self.construct(&nodes, &Args::new().scalar(ARG_TYPE, node_type))
    }

    /// The `index`th input socket of `node`.
    pub fn input(&self, node: &MemHandle, index: usize) -> HostResult<MemHandle> {
        let inputs = self.get_collection(node, INPUTS)?;
        self.element(&inputs, index)
    }

    /// The `index`th output socket of `node`.
    pub fn output(&self, node: &MemHandle, index: usize) -> HostResult<MemHandle> {
        let outputs = self.get_collection(node, OUTPUTS)?;
        self.element(&outputs, index)
    }

    /// Link output `from_index` of `from` to input `to_index` of `to`.
    pub fn link(
        &mut self,
        tree: &MemHandle,
        from: &MemHandle,
        from_index: usize,
        to: &MemHandle,
        to_index: usize,
    ) -> HostResult<MemHandle> {
        let from_socket = self.output(from, from_index)?;
        let to_socket = self.input(to, to_index)?;
        let links = self.get_collection(tree, LINKS)?;
        let args = Args::new()
            .handle(ARG_INPUT, Some(from_socket))
            .handle(ARG_OUTPUT, Some(to_socket));
        self.construct(&links, &args)
    }

    /// Add a socket to `tree`'s interface.
    pub fn add_interface_socket(
        &mut self,
        tree: &MemHandle,
        name: &str,
        in_out: &str,
        socket_type: &str,
    ) -> HostResult<MemHandle> {
        let interface = self.interface_of(tree)?;
        let args = Args::new()
            .scalar(NAME, name)
            .scalar(DESCRIPTION, "")
            .scalar(IN_OUT, in_out)
            .scalar(SOCKET_TYPE, socket_type);
        self.invoke(&interface, FN_NEW_SOCKET, &args)?
            .ok_or_else(|| super::rejected(FN_NEW_SOCKET, "no socket was created"))
    }

    /// Add a panel to `tree`'s interface.
    pub fn add_panel(&mut self, tree: &MemHandle, name: &str) -> HostResult<MemHandle> {
        let interface = self.interface_of(tree)?;
        let args = Args::new()
            .scalar(NAME, name)
            .scalar(DESCRIPTION, "")
            .scalar(DEFAULT_CLOSED, false);
        self.invoke(&interface, FN_NEW_PANEL, &args)?
            .ok_or_else(|| super::rejected(FN_NEW_PANEL, "no panel was created"))
    }

    /// Move an interface item under `panel`.
    pub fn move_into_panel(
        &mut self,
        tree: &MemHandle,
        item: &MemHandle,
        panel: &MemHandle,
    ) -> HostResult<()> {
        let interface = self.interface_of(tree)?;
        let args = Args::new()
            .handle(ARG_ITEM, Some(item.clone()))
            .handle(ARG_PARENT, Some(panel.clone()))
            .scalar(ARG_TO_POSITION, 0_i64);
        self.invoke(&interface, FN_MOVE_TO_PARENT, &args)?;
        Ok(())
    }

    /// The node of `tree` called `name`.
    pub fn node_by_name(&self, tree: &MemHandle, name: &str) -> HostResult<Option<MemHandle>> {
        let nodes = self.get_collection(tree, NODES_PROP)?;
        for i in 0..self.collection_len(&nodes)? {
            let node = self.element(&nodes, i)?;
            if self.display_name(&node)? == name {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    fn interface_of(&self, tree: &MemHandle) -> HostResult<MemHandle> {
        self.get_pointer(tree, INTERFACE_PROP)?
            .ok_or_else(|| super::invalid(INTERFACE_PROP, "tree has no interface"))
    }
}
