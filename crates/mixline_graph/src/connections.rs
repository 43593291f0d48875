// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection store: committed connections and the single drag slot.

use crate::backend::ProcessingBackend;
use crate::connection::{Connection, ConnectionId, DragConnection};
use crate::graph::NodeStore;
use crate::node::NodeId;
use crate::port::PortRef;
use crate::protocol::{self, ConnectError, Endpoints};
use indexmap::IndexMap;

/// Committed connections plus the in-progress drag
#[derive(Debug, Default)]
pub struct ConnectionStore {
    /// Connections in commit order
    connections: IndexMap<ConnectionId, Connection>,
    /// Drag gesture in progress
    drag: Option<DragConnection>,
    /// Last creation stamp handed out
    last_stamp: u64,
}

impl ConnectionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a drag from `origin`, whose anchor is currently at `anchor`.
    ///
    /// Only one drag exists at a time; an unfinished one is discarded.
    pub fn begin_drag(&mut self, origin: PortRef, anchor: [f32; 2]) {
        if let Some(previous) = self.drag.take() {
            tracing::debug!("Discarding unfinished drag from {}", previous.origin);
        }
        self.drag = Some(DragConnection {
            origin,
            start: anchor,
            current: anchor,
        });
    }

    /// Move the free end of the drag. Returns `false` if no drag is active.
    pub fn update_drag(&mut self, x: f32, y: f32) -> bool {
        match self.drag.as_mut() {
            Some(drag) => {
                drag.current = [x, y];
                true
            }
            None => false,
        }
    }

    /// Drop the drag without side effects
    pub fn cancel_drag(&mut self) -> Option<DragConnection> {
        self.drag.take()
    }

    /// Drag in progress
    pub fn drag(&self) -> Option<&DragConnection> {
        self.drag.as_ref()
    }

    /// Finish the drag on `release` and commit a connection if it passes
    /// validation and the backend wires it.
    ///
    /// The drag is cleared whatever the outcome.
    pub fn commit_drag<B: ProcessingBackend + ?Sized>(
        &mut self,
        nodes: &NodeStore,
        backend: &mut B,
        release: PortRef,
    ) -> Result<ConnectionId, ConnectError> {
        let drag = self.drag.take().ok_or(ConnectError::NoActiveDrag)?;
        let endpoints = protocol::validate(nodes, drag.origin, release)?;
        protocol::wire(nodes, backend, &endpoints)?;

        let id = self.push(endpoints);
        tracing::info!(
            "Connected {} -> {} as {id}",
            endpoints.source,
            endpoints.dest
        );
        Ok(id)
    }

    fn push(&mut self, endpoints: Endpoints) -> ConnectionId {
        self.last_stamp += 1;
        let id = ConnectionId {
            from: endpoints.source.node,
            to: endpoints.dest.node,
            stamp: self.last_stamp,
        };
        self.connections.insert(
            id,
            Connection {
                id,
                from_node: endpoints.source.node,
                from_port: endpoints.source.port,
                to_node: endpoints.dest.node,
                to_port: endpoints.dest.port,
            },
        );
        id
    }

    /// Remove every connection touching `node_id`.
    ///
    /// Bookkeeping only; backend wires go away with the node's unit.
    pub fn remove_connections_for_node(&mut self, node_id: NodeId) -> usize {
        let before = self.connections.len();
        self.connections.retain(|_, c| !c.involves_node(node_id));
        before - self.connections.len()
    }

    /// Remove a connection
    pub fn remove_connection(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        self.connections.shift_remove(&connection_id)
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.involves_node(node_id))
    }

    /// Get the number of connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Check if there are no connections
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::node::NodeKind;
    use crate::port::PortDirection;

    fn output(node: NodeId) -> PortRef {
        PortRef::new(node, 0, PortDirection::Output)
    }

    fn input(node: NodeId) -> PortRef {
        PortRef::new(node, 0, PortDirection::Input)
    }

    #[test]
    fn test_drag_lifecycle() {
        let mut store = ConnectionStore::new();
        assert!(!store.update_drag(1.0, 1.0));

        store.begin_drag(output(NodeId(1)), [10.0, 20.0]);
        let drag = store.drag().unwrap();
        assert_eq!(drag.start, [10.0, 20.0]);
        assert_eq!(drag.current, [10.0, 20.0]);

        assert!(store.update_drag(50.0, 60.0));
        assert_eq!(store.drag().unwrap().current, [50.0, 60.0]);
        assert_eq!(store.drag().unwrap().start, [10.0, 20.0]);

        assert!(store.cancel_drag().is_some());
        assert!(store.drag().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_second_drag_replaces_first() {
        let mut store = ConnectionStore::new();
        store.begin_drag(output(NodeId(1)), [0.0, 0.0]);
        store.begin_drag(input(NodeId(2)), [5.0, 5.0]);

        assert_eq!(store.drag().unwrap().origin, input(NodeId(2)));
    }

    #[test]
    fn test_commit_clears_drag_on_rejection() {
        let mut backend = MemoryBackend::new();
        let mut nodes = NodeStore::new();
        let osc = nodes.add_node(&mut backend, NodeKind::Oscillator, 0.0, 0.0).unwrap();
        let mut store = ConnectionStore::new();

        store.begin_drag(output(osc), [0.0, 0.0]);
        let result = store.commit_drag(&nodes, &mut backend, input(osc));
        assert_eq!(result, Err(ConnectError::SelfLoop(osc)));
        assert!(store.drag().is_none());
        assert!(store.is_empty());

        assert_eq!(
            store.commit_drag(&nodes, &mut backend, input(osc)),
            Err(ConnectError::NoActiveDrag)
        );
    }

    #[test]
    fn test_backend_refusal_adds_nothing() {
        let mut backend = MemoryBackend::new();
        let mut nodes = NodeStore::new();
        let gain = nodes.add_node(&mut backend, NodeKind::Gain, 0.0, 0.0).unwrap();
        let osc = nodes.add_node(&mut backend, NodeKind::Oscillator, 0.0, 0.0).unwrap();
        let mut store = ConnectionStore::new();

        // Visually valid, but an oscillator unit takes no input
        store.begin_drag(output(gain), [0.0, 0.0]);
        let result = store.commit_drag(&nodes, &mut backend, input(osc));
        assert!(matches!(result, Err(ConnectError::Backend(_))));
        assert!(store.is_empty());
        assert!(backend.wires().is_empty());
    }

    #[test]
    fn test_duplicates_and_fan_out_allowed() {
        let mut backend = MemoryBackend::new();
        let mut nodes = NodeStore::new();
        let osc = nodes.add_node(&mut backend, NodeKind::Oscillator, 0.0, 0.0).unwrap();
        let gain = nodes.add_node(&mut backend, NodeKind::Gain, 0.0, 0.0).unwrap();
        let out = nodes.add_node(&mut backend, NodeKind::Output, 0.0, 0.0).unwrap();
        let mut store = ConnectionStore::new();

        for target in [gain, gain, out] {
            store.begin_drag(output(osc), [0.0, 0.0]);
            store.commit_drag(&nodes, &mut backend, input(target)).unwrap();
        }

        assert_eq!(store.len(), 3);
        assert_eq!(backend.wires().len(), 3);
        let ids: Vec<_> = store.connections().map(|c| c.id).collect();
        assert_ne!(ids[0], ids[1]);
        assert_eq!(ids[0].to_string(), format!("{osc}-{gain}-1"));
    }

    #[test]
    fn test_remove_connections_for_node() {
        let mut backend = MemoryBackend::new();
        let mut nodes = NodeStore::new();
        let osc = nodes.add_node(&mut backend, NodeKind::Oscillator, 0.0, 0.0).unwrap();
        let gain = nodes.add_node(&mut backend, NodeKind::Gain, 0.0, 0.0).unwrap();
        let out = nodes.add_node(&mut backend, NodeKind::Output, 0.0, 0.0).unwrap();
        let mut store = ConnectionStore::new();

        for (from, to) in [(osc, gain), (gain, out), (osc, out)] {
            store.begin_drag(output(from), [0.0, 0.0]);
            store.commit_drag(&nodes, &mut backend, input(to)).unwrap();
        }

        assert_eq!(store.remove_connections_for_node(gain), 2);
        assert_eq!(store.len(), 1);
        let remaining = store.connections().next().unwrap();
        assert_eq!((remaining.from_node, remaining.to_node), (osc, out));
        assert_eq!(store.connections_for_node(gain).count(), 0);
    }

    #[test]
    fn test_remove_connection() {
        let mut backend = MemoryBackend::new();
        let mut nodes = NodeStore::new();
        let osc = nodes.add_node(&mut backend, NodeKind::Oscillator, 0.0, 0.0).unwrap();
        let out = nodes.add_node(&mut backend, NodeKind::Output, 0.0, 0.0).unwrap();
        let mut store = ConnectionStore::new();

        store.begin_drag(output(osc), [0.0, 0.0]);
        let id = store.commit_drag(&nodes, &mut backend, input(out)).unwrap();

        assert!(store.remove_connection(id).is_some());
        assert!(store.remove_connection(id).is_none());
        assert!(store.connection(id).is_none());
    }
}
