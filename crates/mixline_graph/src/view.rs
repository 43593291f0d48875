// SPDX-License-Identifier: MIT OR Apache-2.0
//! Read-only view of a patch for renderers.

use crate::connection::{Connection, DragConnection};
use crate::connections::ConnectionStore;
use crate::graph::NodeStore;
use crate::node::{Node, NodeId};
use crate::port::PortRef;

/// Straight-line endpoints of a drawn connection, output side first
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Output anchor
    pub from: [f32; 2],
    /// Input anchor
    pub to: [f32; 2],
}

/// Shared borrow of both stores; holds no way to mutate them
#[derive(Debug, Clone, Copy)]
pub struct PatchView<'a> {
    nodes: &'a NodeStore,
    connections: &'a ConnectionStore,
}

impl<'a> PatchView<'a> {
    pub(crate) fn new(nodes: &'a NodeStore, connections: &'a ConnectionStore) -> Self {
        Self { nodes, connections }
    }

    /// Nodes in draw order
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = &'a Node> {
        self.nodes.nodes()
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&'a Node> {
        self.nodes.node(node_id)
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Committed connections
    pub fn connections(&self) -> impl Iterator<Item = &'a Connection> {
        self.connections.connections()
    }

    /// Number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Drag in progress
    pub fn drag(&self) -> Option<&'a DragConnection> {
        self.connections.drag()
    }

    /// Selected node
    pub fn selected(&self) -> Option<NodeId> {
        self.nodes.selected()
    }

    /// Current anchor of a port
    pub fn anchor(&self, port: PortRef) -> Option<[f32; 2]> {
        self.nodes
            .node(port.node)?
            .port(port.direction(), port.port)
            .map(|p| p.anchor)
    }

    /// Anchor pairs of every connection whose ports still resolve
    pub fn connection_segments(&self) -> impl Iterator<Item = (&'a Connection, Segment)> {
        let view = *self;
        self.connections().filter_map(move |c| {
            let from = view.anchor(c.source())?;
            let to = view.anchor(c.dest())?;
            Some((c, Segment { from, to }))
        })
    }

    /// Endpoints of the drag in progress, output side first
    pub fn drag_segment(&self) -> Option<Segment> {
        self.drag().map(|drag| {
            let (from, to) = drag.segment();
            Segment { from, to }
        })
    }

    /// Port whose anchor lies within `radius` of a screen point
    pub fn port_at(&self, point: [f32; 2], radius: f32) -> Option<PortRef> {
        let radius_sq = radius * radius;
        self.nodes().rev().find_map(|node| {
            node.inputs
                .iter()
                .enumerate()
                .chain(node.outputs.iter().enumerate())
                .find(|(_, port)| {
                    let dx = port.anchor[0] - point[0];
                    let dy = port.anchor[1] - point[1];
                    dx * dx + dy * dy <= radius_sq
                })
                .map(|(index, port)| PortRef::new(node.id, index, port.direction))
        })
    }
}
