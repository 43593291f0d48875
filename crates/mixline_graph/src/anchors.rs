// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port position synchronization.
//!
//! Renderers call [`sync_port_anchors`] once per frame, before drawing, so
//! connection curves and port hit-testing see anchors at most one frame old.

use crate::graph::NodeStore;
use crate::node::{Node, NodeId};
use crate::port::PortDirection;
use crate::settings::CanvasSettings;
use std::collections::HashSet;

/// Source of on-screen port positions
pub trait PortLayout {
    /// Screen-space centre of a port, or `None` if the node is not laid out yet
    fn port_anchor(&self, node: &Node, direction: PortDirection, index: usize) -> Option<[f32; 2]>;
}

/// Recompute every port anchor from `layout`.
///
/// Ports the layout cannot place keep their previous anchor. Returns the
/// number of anchors written.
pub fn sync_port_anchors<L: PortLayout + ?Sized>(nodes: &mut NodeStore, layout: &L) -> usize {
    let mut updated = 0;
    for node in nodes.nodes_mut() {
        for direction in [PortDirection::Input, PortDirection::Output] {
            for index in 0..node.ports(direction).len() {
                if let Some(anchor) = layout.port_anchor(node, direction, index) {
                    node.ports_mut(direction)[index].anchor = anchor;
                    updated += 1;
                }
            }
        }
    }
    updated
}

/// Canvas projection: inputs on the left edge, outputs on the right, rows
/// stacked under the header, then pan and zoom applied around `origin`.
#[derive(Debug, Clone)]
pub struct CanvasLayout {
    /// Height of the node title bar
    pub header_height: f32,
    /// Vertical distance between port rows
    pub port_spacing: f32,
    /// Pan offset in canvas units
    pub pan: [f32; 2],
    /// Zoom factor
    pub zoom: f32,
    /// Screen position of the canvas origin
    pub origin: [f32; 2],
    /// Nodes that have an on-screen element; `None` means all of them
    pub realized: Option<HashSet<NodeId>>,
}

impl CanvasLayout {
    /// Unpanned, unzoomed layout with geometry from settings
    pub fn new(canvas: &CanvasSettings) -> Self {
        Self {
            header_height: canvas.header_height,
            port_spacing: canvas.port_spacing,
            pan: [0.0, 0.0],
            zoom: 1.0,
            origin: [0.0, 0.0],
            realized: None,
        }
    }

    /// Apply a pan/zoom transform around a screen origin
    pub fn with_view(mut self, pan: [f32; 2], zoom: f32, origin: [f32; 2]) -> Self {
        self.pan = pan;
        self.zoom = zoom;
        self.origin = origin;
        self
    }

    /// Restrict placement to nodes that have been drawn
    pub fn with_realized(mut self, realized: HashSet<NodeId>) -> Self {
        self.realized = Some(realized);
        self
    }

    /// Convert canvas position to screen position
    pub fn to_screen(&self, point: [f32; 2]) -> [f32; 2] {
        [
            (point[0] + self.pan[0]) * self.zoom + self.origin[0],
            (point[1] + self.pan[1]) * self.zoom + self.origin[1],
        ]
    }

    /// Convert screen position to canvas position
    pub fn to_canvas(&self, point: [f32; 2]) -> [f32; 2] {
        [
            (point[0] - self.origin[0]) / self.zoom - self.pan[0],
            (point[1] - self.origin[1]) / self.zoom - self.pan[1],
        ]
    }
}

impl PortLayout for CanvasLayout {
    fn port_anchor(&self, node: &Node, direction: PortDirection, index: usize) -> Option<[f32; 2]> {
        if self.realized.as_ref().is_some_and(|r| !r.contains(&node.id)) {
            return None;
        }
        node.port(direction, index)?;

        let x = match direction {
            PortDirection::Input => node.position[0],
            PortDirection::Output => node.position[0] + node.size[0],
        };
        let y = node.position[1]
            + self.header_height
            + index as f32 * self.port_spacing
            + self.port_spacing / 2.0;
        Some(self.to_screen([x, y]))
    }
}
