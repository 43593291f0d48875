// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the patch.

use crate::node::NodeId;
use crate::port::{PortDirection, PortRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a connection.
///
/// Built from both endpoint nodes and a creation stamp that increases with
/// every connection the store commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId {
    /// Source node
    pub from: NodeId,
    /// Destination node
    pub to: NodeId,
    /// Creation stamp
    pub stamp: u64,
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.from, self.to, self.stamp)
    }
}

/// A connection from an output port to an input port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Source node ID
    pub from_node: NodeId,
    /// Index into the source node's outputs
    pub from_port: usize,
    /// Target node ID
    pub to_node: NodeId,
    /// Index into the target node's inputs
    pub to_port: usize,
}

impl Connection {
    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from_node == node_id || self.to_node == node_id
    }

    /// Source endpoint
    pub fn source(&self) -> PortRef {
        PortRef::new(self.from_node, self.from_port, PortDirection::Output)
    }

    /// Destination endpoint
    pub fn dest(&self) -> PortRef {
        PortRef::new(self.to_node, self.to_port, PortDirection::Input)
    }
}

/// Connection gesture in progress, not yet committed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragConnection {
    /// Port the gesture started from
    pub origin: PortRef,
    /// Anchor of the origin port when the drag began
    pub start: [f32; 2],
    /// Live pointer position of the free end
    pub current: [f32; 2],
}

impl DragConnection {
    /// Direction of the fixed end
    pub fn direction(&self) -> PortDirection {
        self.origin.direction()
    }

    /// Segment endpoints ordered output side first
    pub fn segment(&self) -> ([f32; 2], [f32; 2]) {
        if self.direction().is_output() {
            (self.start, self.current)
        } else {
            (self.current, self.start)
        }
    }
}
