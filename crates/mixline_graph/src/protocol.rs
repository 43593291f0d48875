// SPDX-License-Identifier: MIT OR Apache-2.0
//! Commit-time validation for drag-to-connect gestures.
//!
//! Rules run in a fixed order and the first failure wins:
//!
//! 1. both endpoints resolve to nodes
//! 2. the endpoints are on different nodes
//! 3. one endpoint is an output and the other an input
//! 4. both port indices exist
//! 5. both nodes hold a backend unit and the backend accepts the wire
//!
//! Cycles and duplicate wires are not rejected.

use crate::backend::{BackendError, ProcessingBackend};
use crate::graph::NodeStore;
use crate::node::NodeId;
use crate::port::{PortDirection, PortRef};

/// Reason a connection was not committed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectError {
    /// Release without a drag in progress
    #[error("No connection drag in progress")]
    NoActiveDrag,

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Self-loop not allowed
    #[error("Self-loop not allowed on node {0}")]
    SelfLoop(NodeId),

    /// Both ends face the same way
    #[error("Cannot connect {0:?} to {0:?}")]
    DirectionMismatch(PortDirection),

    /// Port index past the end of the node's ports
    #[error("No such port: {0}")]
    PortOutOfRange(PortRef),

    /// Node has no backend unit to wire
    #[error("Node {0} has no backend unit")]
    MissingUnit(NodeId),

    /// Backend refused the wire
    #[error("Backend rejected connection: {0}")]
    Backend(#[from] BackendError),
}

/// Validated endpoints, output side first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    /// Output port
    pub source: PortRef,
    /// Input port
    pub dest: PortRef,
}

/// Apply rules 1–4 to a gesture from `origin` released on `release`
pub fn validate(nodes: &NodeStore, origin: PortRef, release: PortRef) -> Result<Endpoints, ConnectError> {
    for end in [origin, release] {
        if nodes.node(end.node).is_none() {
            return Err(ConnectError::NodeNotFound(end.node));
        }
    }

    if origin.node == release.node {
        return Err(ConnectError::SelfLoop(origin.node));
    }

    if origin.is_output == release.is_output {
        return Err(ConnectError::DirectionMismatch(origin.direction()));
    }

    let (source, dest) = if origin.is_output {
        (origin, release)
    } else {
        (release, origin)
    };

    for end in [source, dest] {
        let exists = nodes
            .node(end.node)
            .is_some_and(|node| node.port(end.direction(), end.port).is_some());
        if !exists {
            return Err(ConnectError::PortOutOfRange(end));
        }
    }

    Ok(Endpoints { source, dest })
}

/// Apply rule 5: ask the backend to wire source unit into dest unit
pub fn wire<B: ProcessingBackend + ?Sized>(
    nodes: &NodeStore,
    backend: &mut B,
    endpoints: &Endpoints,
) -> Result<(), ConnectError> {
    let unit_of = |id: NodeId| {
        nodes
            .node(id)
            .and_then(|node| node.unit)
            .ok_or(ConnectError::MissingUnit(id))
    };
    let source = unit_of(endpoints.source.node)?;
    let dest = unit_of(endpoints.dest.node)?;

    backend.connect(source, dest)?;
    Ok(())
}
