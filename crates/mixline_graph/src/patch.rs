// SPDX-License-Identifier: MIT OR Apache-2.0
//! The patch: node store, connection store and backend under one owner.
//!
//! All mutation goes through `&mut Patch`. Renderers get a [`PatchView`],
//! which only hands out shared references.

use crate::anchors::{self, PortLayout};
use crate::backend::{BackendError, MemoryBackend, ProcessingBackend};
use crate::connection::{Connection, ConnectionId};
use crate::connections::ConnectionStore;
use crate::graph::NodeStore;
use crate::node::{Node, NodeId, NodeKind, ParamValue};
use crate::port::{PortDirection, PortRef};
use crate::protocol::ConnectError;
use crate::view::PatchView;

/// A patch bound to a processing backend
#[derive(Debug)]
pub struct Patch<B: ProcessingBackend = MemoryBackend> {
    nodes: NodeStore,
    connections: ConnectionStore,
    backend: B,
}

impl Default for Patch<MemoryBackend> {
    fn default() -> Self {
        Self::new(MemoryBackend::new())
    }
}

impl<B: ProcessingBackend> Patch<B> {
    /// Create an empty patch on `backend`
    pub fn new(backend: B) -> Self {
        Self {
            nodes: NodeStore::new(),
            connections: ConnectionStore::new(),
            backend,
        }
    }

    /// Add a node of `kind` at `(x, y)`
    pub fn add_node(&mut self, kind: NodeKind, x: f32, y: f32) -> Result<NodeId, BackendError> {
        self.nodes.add_node(&mut self.backend, kind, x, y)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.node(node_id)
    }

    /// Delete a node with its unit and connections; absent ids are a no-op
    pub fn delete_node(&mut self, node_id: NodeId) -> Option<Node> {
        self.nodes
            .delete_node(&mut self.backend, &mut self.connections, node_id)
    }

    /// Set a node parameter and push it to the backend
    pub fn update_node_parameter(&mut self, node_id: NodeId, key: &str, value: ParamValue) -> bool {
        self.nodes
            .update_node_parameter(&mut self.backend, node_id, key, value)
    }

    /// Select a node
    pub fn select_node(&mut self, node_id: NodeId) -> bool {
        self.nodes.select_node(node_id)
    }

    /// Clear the selection
    pub fn clear_selection(&mut self) {
        self.nodes.clear_selection();
    }

    /// Delete the selected node, if any
    pub fn delete_selection(&mut self) -> Option<Node> {
        let selected = self.nodes.selected()?;
        self.delete_node(selected)
    }

    /// Start moving a node with the pointer
    pub fn begin_node_drag(&mut self, node_id: NodeId, pointer: [f32; 2]) -> bool {
        self.nodes.begin_node_drag(node_id, pointer)
    }

    /// Move the dragged node
    pub fn drag_node_to(&mut self, pointer: [f32; 2]) {
        self.nodes.drag_node_to(pointer);
    }

    /// Finish moving a node
    pub fn end_node_drag(&mut self) {
        self.nodes.end_node_drag();
    }

    /// Pointer pressed on a port: start a connection drag from it.
    ///
    /// Returns `false`, leaving any current drag alone, if the port does not
    /// exist.
    pub fn start_connection(&mut self, node_id: NodeId, port: usize, is_output: bool) -> bool {
        let direction = PortDirection::from_is_output(is_output);
        let Some(anchor) = self
            .nodes
            .node(node_id)
            .and_then(|node| node.port(direction, port))
            .map(|p| p.anchor)
        else {
            tracing::debug!("Ignoring drag start on missing port {port} of node {node_id}");
            return false;
        };

        self.connections
            .begin_drag(PortRef::new(node_id, port, direction), anchor);
        true
    }

    /// Pointer moved: update the free end of the drag
    pub fn update_drag(&mut self, x: f32, y: f32) -> bool {
        self.connections.update_drag(x, y)
    }

    /// Pointer released on a port: try to commit the drag.
    ///
    /// The drag is gone afterwards whether or not a connection was made.
    pub fn end_connection(
        &mut self,
        node_id: NodeId,
        port: usize,
        is_output: bool,
    ) -> Result<ConnectionId, ConnectError> {
        let release = PortRef::new(node_id, port, PortDirection::from_is_output(is_output));
        let result = self
            .connections
            .commit_drag(&self.nodes, &mut self.backend, release);

        match &result {
            Err(ConnectError::Backend(e)) => tracing::warn!("Backend refused wire to {release}: {e}"),
            Err(e) => tracing::debug!("Connection to {release} rejected: {e}"),
            Ok(_) => {}
        }
        result
    }

    /// Pointer released away from any port: drop the drag
    pub fn cancel_drag(&mut self) -> bool {
        self.connections.cancel_drag().is_some()
    }

    /// Remove a single connection and its backend wire.
    ///
    /// Backends only disconnect whole units, so the source unit is
    /// disconnected and its remaining connections are wired again.
    pub fn remove_connection(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        let removed = self.connections.remove_connection(connection_id)?;
        tracing::info!("Removed connection {connection_id}");

        let Some(source) = self.nodes.node(removed.from_node).and_then(|node| node.unit) else {
            return Some(removed);
        };
        if let Err(e) = self.backend.disconnect(source) {
            tracing::warn!("Disconnecting {source} failed: {e}");
            return Some(removed);
        }

        for connection in self.connections.connections_for_node(removed.from_node) {
            if connection.from_node != removed.from_node {
                continue;
            }
            let Some(dest) = self.nodes.node(connection.to_node).and_then(|node| node.unit) else {
                continue;
            };
            if let Err(e) = self.backend.connect(source, dest) {
                tracing::warn!("Rewiring {} failed: {e}", connection.id);
            }
        }
        Some(removed)
    }

    /// Recompute port anchors from a layout; run before drawing each frame
    pub fn sync_port_anchors<L: PortLayout + ?Sized>(&mut self, layout: &L) -> usize {
        anchors::sync_port_anchors(&mut self.nodes, layout)
    }

    /// Read-only view for rendering
    pub fn view(&self) -> PatchView<'_> {
        PatchView::new(&self.nodes, &self.connections)
    }

    /// Node store
    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    /// Connection store
    pub fn connections(&self) -> &ConnectionStore {
        &self.connections
    }

    /// Processing backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Processing backend, mutably
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::CanvasLayout;
    use crate::settings::CanvasSettings;

    fn osc_and_output() -> (Patch, NodeId, NodeId) {
        let mut patch = Patch::new(MemoryBackend::new());
        let osc = patch.add_node(NodeKind::Oscillator, 0.0, 0.0).unwrap();
        let out = patch.add_node(NodeKind::Output, 0.0, 0.0).unwrap();
        (patch, osc, out)
    }

    #[test]
    fn test_oscillator_to_output() {
        let (mut patch, osc, out) = osc_and_output();

        assert!(patch.start_connection(osc, 0, true));
        let id = patch.end_connection(out, 0, false).unwrap();

        assert_eq!(patch.connections().len(), 1);
        let connection = patch.connections().connection(id).unwrap();
        assert_eq!((connection.from_node, connection.from_port), (osc, 0));
        assert_eq!((connection.to_node, connection.to_port), (out, 0));
        assert_eq!(patch.backend().wires().len(), 1);
        assert!(patch.view().drag().is_none());
    }

    #[test]
    fn test_same_node_same_direction_rejected() {
        let (mut patch, osc, _) = osc_and_output();

        patch.start_connection(osc, 0, true);
        let result = patch.end_connection(osc, 0, true);

        assert_eq!(result, Err(ConnectError::SelfLoop(osc)));
        assert!(patch.connections().is_empty());
    }

    #[test]
    fn test_self_loop_never_changes_count() {
        let mut patch = Patch::new(MemoryBackend::new());
        let gain = patch.add_node(NodeKind::Gain, 0.0, 0.0).unwrap();

        for (from_output, to_output) in [(true, false), (false, true), (true, true), (false, false)] {
            patch.start_connection(gain, 0, from_output);
            assert!(patch.end_connection(gain, 0, to_output).is_err());
            assert_eq!(patch.connections().len(), 0);
        }
    }

    fn connect(patch: &mut Patch, from: NodeId, to: NodeId) -> ConnectionId {
        assert!(patch.start_connection(from, 0, true));
        patch.end_connection(to, 0, false).unwrap()
    }

    #[test]
    fn test_remove_connection_drops_backend_wire() {
        let (mut patch, osc, out) = osc_and_output();
        let id = connect(&mut patch, osc, out);

        let removed = patch.remove_connection(id).unwrap();
        assert_eq!(removed.id, id);
        assert!(patch.connections().is_empty());
        assert!(patch.backend().wires().is_empty());
        assert!(patch.remove_connection(id).is_none());
    }

    #[test]
    fn test_remove_connection_keeps_sibling_wires() {
        let (mut patch, osc, out) = osc_and_output();
        let gain = patch.add_node(NodeKind::Gain, 0.0, 0.0).unwrap();
        let to_gain = connect(&mut patch, osc, gain);
        let to_out = connect(&mut patch, osc, out);
        connect(&mut patch, gain, out);

        patch.remove_connection(to_out);

        let unit = |id| patch.node(id).unwrap().unit.unwrap();
        let mut wires = patch.backend().wires().to_vec();
        wires.sort_by_key(|(source, dest)| (source.0, dest.0));
        assert_eq!(wires, vec![(unit(osc), unit(gain)), (unit(gain), unit(out))]);
        assert!(patch.connections().connection(to_gain).is_some());
        assert_eq!(patch.connections().len(), 2);
    }

    #[test]
    fn test_delete_survives_failed_unit_release() {
        let (mut patch, osc, out) = osc_and_output();
        connect(&mut patch, osc, out);
        let unit = patch.node(osc).unwrap().unit.unwrap();
        patch.backend_mut().release_unit(unit).unwrap();

        let node = patch.delete_node(osc).unwrap();
        assert_eq!(node.id, osc);
        assert!(patch.node(osc).is_none());
        assert!(patch.connections().is_empty());
        assert!(patch.node(out).is_some());
    }

    #[test]
    fn test_deleting_source_removes_connection() {
        let (mut patch, osc, out) = osc_and_output();
        patch.start_connection(osc, 0, true);
        patch.end_connection(out, 0, false).unwrap();

        assert!(patch.delete_node(osc).is_some());
        assert_eq!(patch.connections().len(), 0);
        assert!(patch.backend().wires().is_empty());
        assert!(patch.node(out).is_some());
    }

    #[test]
    fn test_cascade_delete_only_touches_node() {
        let mut patch = Patch::new(MemoryBackend::new());
        let osc = patch.add_node(NodeKind::Oscillator, 0.0, 0.0).unwrap();
        let gain = patch.add_node(NodeKind::Gain, 0.0, 0.0).unwrap();
        let out = patch.add_node(NodeKind::Output, 0.0, 0.0).unwrap();
        let other = patch.add_node(NodeKind::Oscillator, 0.0, 0.0).unwrap();

        for (from, to) in [(osc, gain), (gain, out), (other, out), (osc, out)] {
            patch.start_connection(from, 0, true);
            patch.end_connection(to, 0, false).unwrap();
        }

        patch.delete_node(gain);
        let remaining: Vec<_> = patch
            .connections()
            .connections()
            .map(|c| (c.from_node, c.to_node))
            .collect();
        assert_eq!(remaining, vec![(other, out), (osc, out)]);
        assert!(patch.connections().connections().all(|c| !c.involves_node(gain)));
    }

    #[test]
    fn test_committed_connections_run_output_to_input() {
        let mut patch = Patch::new(MemoryBackend::new());
        let osc = patch.add_node(NodeKind::Oscillator, 0.0, 0.0).unwrap();
        let gain = patch.add_node(NodeKind::Gain, 0.0, 0.0).unwrap();
        let out = patch.add_node(NodeKind::Output, 0.0, 0.0).unwrap();

        // Forward and reverse gestures
        patch.start_connection(osc, 0, true);
        patch.end_connection(gain, 0, false).unwrap();
        patch.start_connection(out, 0, false);
        patch.end_connection(gain, 0, true).unwrap();

        for connection in patch.connections().connections() {
            let from = patch.node(connection.from_node).unwrap();
            let to = patch.node(connection.to_node).unwrap();
            assert!(from.output(connection.from_port).unwrap().is_output());
            assert!(to.input(connection.to_port).unwrap().is_input());
        }
        assert_eq!(patch.connections().len(), 2);
    }

    #[test]
    fn test_cancel_then_fresh_gesture() {
        let (mut patch, osc, out) = osc_and_output();

        patch.start_connection(out, 0, false);
        patch.update_drag(40.0, 40.0);
        assert!(patch.cancel_drag());
        assert!(!patch.cancel_drag());

        patch.start_connection(osc, 0, true);
        let id = patch.end_connection(out, 0, false).unwrap();
        assert_eq!(patch.connections().len(), 1);
        assert_eq!(id.from, osc);
        assert_eq!(id.to, out);
    }

    #[test]
    fn test_start_on_missing_port_keeps_drag() {
        let (mut patch, osc, out) = osc_and_output();

        patch.start_connection(osc, 0, true);
        assert!(!patch.start_connection(out, 0, true));
        assert!(!patch.start_connection(NodeId(77), 0, true));
        assert_eq!(patch.view().drag().unwrap().origin.node, osc);
    }

    #[test]
    fn test_drag_starts_at_port_anchor() {
        let (mut patch, osc, _) = osc_and_output();
        let layout = CanvasLayout::new(&CanvasSettings::default());
        patch.sync_port_anchors(&layout);
        let anchor = patch.node(osc).unwrap().outputs[0].anchor;

        patch.start_connection(osc, 0, true);
        patch.update_drag(300.0, 200.0);
        let segment = patch.view().drag_segment().unwrap();
        assert_eq!(segment.from, anchor);
        assert_eq!(segment.to, [300.0, 200.0]);
    }

    #[test]
    fn test_backend_failure_on_connect() {
        let (mut patch, osc, out) = osc_and_output();
        patch.backend_mut().set_refuse_connections(true);

        patch.start_connection(osc, 0, true);
        let result = patch.end_connection(out, 0, false);
        assert!(matches!(result, Err(ConnectError::Backend(BackendError::Refused(_)))));
        assert!(patch.connections().is_empty());
    }

    #[test]
    fn test_delete_selection() {
        let (mut patch, osc, out) = osc_and_output();
        assert!(patch.delete_selection().is_none());

        patch.select_node(osc);
        let deleted = patch.delete_selection().unwrap();
        assert_eq!(deleted.id, osc);
        assert!(patch.view().selected().is_none());
        assert!(patch.node(out).is_some());
    }

    #[test]
    fn test_view_segments_follow_anchors() {
        let mut patch = Patch::new(MemoryBackend::new());
        let osc = patch.add_node(NodeKind::Oscillator, 0.0, 0.0).unwrap();
        let out = patch.add_node(NodeKind::Output, 400.0, 0.0).unwrap();
        patch.start_connection(osc, 0, true);
        patch.end_connection(out, 0, false).unwrap();

        patch.sync_port_anchors(&CanvasLayout::new(&CanvasSettings::default()));
        let view = patch.view();
        let (_, segment) = view.connection_segments().next().unwrap();
        assert_eq!(segment.from, patch.node(osc).unwrap().outputs[0].anchor);
        assert_eq!(segment.to, patch.node(out).unwrap().inputs[0].anchor);
        assert_eq!(view.port_at(segment.to, 2.0), Some(PortRef::new(out, 0, PortDirection::Input)));
    }
}
