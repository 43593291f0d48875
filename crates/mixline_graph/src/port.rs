// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

impl PortDirection {
    /// Direction from the `is_output` flag carried by pointer events
    pub fn from_is_output(is_output: bool) -> Self {
        if is_output {
            Self::Output
        } else {
            Self::Input
        }
    }

    /// Check if this is the output side
    pub fn is_output(self) -> bool {
        self == Self::Output
    }
}

/// Static port layout entry for a node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSpec {
    /// Port id, unique within its node and direction
    pub id: &'static str,
    /// Display label
    pub label: &'static str,
}

/// A port on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Port id, unique within its node and direction
    pub id: String,
    /// Display label
    pub label: String,
    /// Port direction
    pub direction: PortDirection,
    /// Screen-space centre, refreshed by the anchor sync
    pub anchor: [f32; 2],
}

impl Port {
    /// Create a port from its static layout entry
    pub fn from_spec(spec: &PortSpec, direction: PortDirection) -> Self {
        Self {
            id: spec.id.to_string(),
            label: spec.label.to_string(),
            direction,
            anchor: [0.0, 0.0],
        }
    }

    /// Checks if this port is an input
    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    /// Checks if this port is an output
    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Output
    }
}

/// Reference to a port by owner, index and direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    /// Owning node
    pub node: crate::node::NodeId,
    /// Index into the node's inputs or outputs
    pub port: usize,
    /// Whether the index refers to the outputs
    pub is_output: bool,
}

impl PortRef {
    /// Create a new port reference
    pub fn new(node: crate::node::NodeId, port: usize, direction: PortDirection) -> Self {
        Self {
            node,
            port,
            is_output: direction.is_output(),
        }
    }

    /// Direction of the referenced port
    pub fn direction(&self) -> PortDirection {
        PortDirection::from_is_output(self.is_output)
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = if self.is_output { "output" } else { "input" };
        write!(f, "node {} {side} {}", self.node, self.port)
    }
}
