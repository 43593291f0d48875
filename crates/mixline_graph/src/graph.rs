// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node store: node lifecycle, selection and node dragging.

use crate::backend::{BackendError, ProcessingBackend};
use crate::connections::ConnectionStore;
use crate::node::{Node, NodeId, NodeKind, ParamValue};
use indexmap::IndexMap;

/// Pointer offset captured when a node drag starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeDrag {
    /// Node being moved
    pub node: NodeId,
    /// Pointer position minus node position at drag start
    pub offset: [f32; 2],
}

/// The set of nodes in a patch
#[derive(Debug, Default)]
pub struct NodeStore {
    /// Nodes in creation order
    nodes: IndexMap<NodeId, Node>,
    /// Last id handed out
    last_id: u64,
    /// Selected node
    selected: Option<NodeId>,
    /// Node drag in progress
    node_drag: Option<NodeDrag>,
}

impl NodeStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node of `kind` at `(x, y)` backed by a fresh backend unit.
    ///
    /// The id is consumed even when the backend refuses, so ids are never
    /// reused.
    pub fn add_node<B: ProcessingBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        kind: NodeKind,
        x: f32,
        y: f32,
    ) -> Result<NodeId, BackendError> {
        self.last_id += 1;
        let id = NodeId(self.last_id);
        let mut node = Node::new(id, kind, x, y);

        match backend.create_unit(kind, &node.data) {
            Ok(unit) => node.unit = Some(unit),
            Err(e) => {
                tracing::warn!("Could not create {kind} node {id}: {e}");
                return Err(e);
            }
        }

        tracing::info!("Added {} at ({x}, {y})", node.title());
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Delete a node, its backend unit and every connection touching it.
    ///
    /// Backend release errors are logged and do not stop the deletion.
    pub fn delete_node<B: ProcessingBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        connections: &mut ConnectionStore,
        node_id: NodeId,
    ) -> Option<Node> {
        let node = self.nodes.get_mut(&node_id)?;

        if let Some(unit) = node.unit.take() {
            if let Err(e) = backend.release_unit(unit) {
                tracing::warn!("Releasing {unit} for node {node_id} failed: {e}");
            }
        }

        let removed = connections.remove_connections_for_node(node_id);

        if self.selected == Some(node_id) {
            self.selected = None;
        }
        if self.node_drag.is_some_and(|drag| drag.node == node_id) {
            self.node_drag = None;
        }

        let node = self.nodes.shift_remove(&node_id)?;
        tracing::info!("Deleted {} and {removed} connection(s)", node.title());
        Some(node)
    }

    /// Set a parameter and push it into the node's backend control.
    ///
    /// Returns `false` without side effects when the node, its unit or the
    /// parameter is missing, or the value is outside the parameter's domain.
    pub fn update_node_parameter<B: ProcessingBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        node_id: NodeId,
        key: &str,
        value: ParamValue,
    ) -> bool {
        let Some(node) = self.nodes.get_mut(&node_id) else {
            tracing::debug!("Ignoring parameter {key} for missing node {node_id}");
            return false;
        };
        let Some(unit) = node.unit else {
            tracing::debug!("Ignoring parameter {key} for node {node_id} without a unit");
            return false;
        };
        let Some(value) = node.kind.schema().param(key).and_then(|spec| spec.accept(value)) else {
            tracing::debug!("Rejected value for {key} on {}", node.title());
            return false;
        };

        if let Err(e) = backend.set_control(unit, key, &value) {
            tracing::warn!("Pushing {key}={value} to {unit} failed: {e}");
        }
        node.data.insert(key.to_string(), value);
        true
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all nodes mutably
    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    /// Get the number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the store has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Topmost node whose rect contains a canvas point
    pub fn node_at(&self, point: [f32; 2]) -> Option<NodeId> {
        self.nodes.values().rev().find(|n| n.contains(point)).map(|n| n.id)
    }

    /// Select a node. Returns `false` if it does not exist.
    pub fn select_node(&mut self, node_id: NodeId) -> bool {
        if self.nodes.contains_key(&node_id) {
            self.selected = Some(node_id);
            true
        } else {
            false
        }
    }

    /// Currently selected node
    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    /// Clear the selection
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Start moving a node with the pointer; selects it
    pub fn begin_node_drag(&mut self, node_id: NodeId, pointer: [f32; 2]) -> bool {
        let Some(node) = self.nodes.get(&node_id) else {
            return false;
        };
        let offset = [pointer[0] - node.position[0], pointer[1] - node.position[1]];
        self.selected = Some(node_id);
        self.node_drag = Some(NodeDrag { node: node_id, offset });
        true
    }

    /// Move the dragged node so it keeps its offset from the pointer
    pub fn drag_node_to(&mut self, pointer: [f32; 2]) {
        let Some(drag) = self.node_drag else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&drag.node) {
            node.position = [pointer[0] - drag.offset[0], pointer[1] - drag.offset[1]];
        }
    }

    /// Finish moving a node
    pub fn end_node_drag(&mut self) {
        self.node_drag = None;
    }

    /// Node drag in progress
    pub fn node_drag(&self) -> Option<NodeDrag> {
        self.node_drag
    }
}
