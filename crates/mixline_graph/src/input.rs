// SPDX-License-Identifier: MIT OR Apache-2.0
//! Discrete input events and their dispatch onto a patch.

use crate::backend::{BackendError, ProcessingBackend};
use crate::connection::ConnectionId;
use crate::node::{NodeId, NodeKind, ParamValue};
use crate::patch::Patch;
use crate::port::PortRef;
use crate::protocol::ConnectError;
use serde::{Deserialize, Serialize};

/// Input event delivered by a UI or a script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// Pointer pressed on a port
    PortPressed {
        /// Owning node
        node: NodeId,
        /// Port index
        port: usize,
        /// Whether the port is an output
        is_output: bool,
    },
    /// Pointer moved, in screen space
    PointerMoved {
        /// Horizontal position
        x: f32,
        /// Vertical position
        y: f32,
    },
    /// Pointer released, possibly over a port
    PointerReleased {
        /// Port under the pointer
        #[serde(default)]
        on_port: Option<PortRef>,
    },
    /// Delete the selected node
    DeleteSelection,
    /// Select a node
    SelectNode {
        /// Node to select
        node: NodeId,
    },
    /// Pointer pressed on a node header
    NodeDragStart {
        /// Node to move
        node: NodeId,
        /// Pointer x in canvas space
        x: f32,
        /// Pointer y in canvas space
        y: f32,
    },
    /// Pointer moved while moving a node, in canvas space
    NodeDragMove {
        /// Pointer x
        x: f32,
        /// Pointer y
        y: f32,
    },
    /// Node move finished
    NodeDragEnd,
    /// Add a node
    AddNode {
        /// Kind to create
        kind: NodeKind,
        /// Canvas x
        x: f32,
        /// Canvas y
        y: f32,
    },
    /// Change a node parameter
    SetParameter {
        /// Target node
        node: NodeId,
        /// Parameter key
        key: String,
        /// New value
        value: ParamValue,
    },
}

/// What an event did to the patch
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// A node was created
    NodeAdded(NodeId),
    /// A node was deleted
    NodeDeleted(NodeId),
    /// A connection was committed
    Connected(ConnectionId),
    /// A release did not produce a connection
    Rejected(ConnectError),
    /// The backend refused to create a node
    BackendFailed(BackendError),
    /// Drag, selection, position or parameter state changed
    Updated,
    /// Nothing happened
    Ignored,
}

impl EventOutcome {
    fn from_flag(changed: bool) -> Self {
        if changed {
            Self::Updated
        } else {
            Self::Ignored
        }
    }
}

impl<B: ProcessingBackend> Patch<B> {
    /// Dispatch an input event to the matching entry point
    pub fn handle_event(&mut self, event: InputEvent) -> EventOutcome {
        match event {
            InputEvent::PortPressed { node, port, is_output } => {
                EventOutcome::from_flag(self.start_connection(node, port, is_output))
            }
            InputEvent::PointerMoved { x, y } => EventOutcome::from_flag(self.update_drag(x, y)),
            InputEvent::PointerReleased { on_port } => {
                let had_drag = self.view().drag().is_some();
                match on_port {
                    Some(port) if had_drag => match self.end_connection(port.node, port.port, port.is_output) {
                        Ok(id) => EventOutcome::Connected(id),
                        Err(e) => EventOutcome::Rejected(e),
                    },
                    _ => EventOutcome::from_flag(self.cancel_drag()),
                }
            }
            InputEvent::DeleteSelection => match self.delete_selection() {
                Some(node) => EventOutcome::NodeDeleted(node.id),
                None => EventOutcome::Ignored,
            },
            InputEvent::SelectNode { node } => EventOutcome::from_flag(self.select_node(node)),
            InputEvent::NodeDragStart { node, x, y } => {
                EventOutcome::from_flag(self.begin_node_drag(node, [x, y]))
            }
            InputEvent::NodeDragMove { x, y } => {
                let moving = self.nodes().node_drag().is_some();
                self.drag_node_to([x, y]);
                EventOutcome::from_flag(moving)
            }
            InputEvent::NodeDragEnd => {
                let moving = self.nodes().node_drag().is_some();
                self.end_node_drag();
                EventOutcome::from_flag(moving)
            }
            InputEvent::AddNode { kind, x, y } => match self.add_node(kind, x, y) {
                Ok(id) => EventOutcome::NodeAdded(id),
                Err(e) => EventOutcome::BackendFailed(e),
            },
            InputEvent::SetParameter { node, key, value } => {
                EventOutcome::from_flag(self.update_node_parameter(node, &key, value))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::port::PortDirection;

    #[test]
    fn test_scripted_gesture() {
        let mut patch = Patch::new(MemoryBackend::new());
        let events = [
            InputEvent::AddNode { kind: NodeKind::Oscillator, x: 0.0, y: 0.0 },
            InputEvent::AddNode { kind: NodeKind::Output, x: 300.0, y: 0.0 },
            InputEvent::PortPressed { node: NodeId(1), port: 0, is_output: true },
            InputEvent::PointerMoved { x: 200.0, y: 30.0 },
            InputEvent::PointerReleased {
                on_port: Some(PortRef::new(NodeId(2), 0, PortDirection::Input)),
            },
        ];

        let outcomes: Vec<_> = events.into_iter().map(|e| patch.handle_event(e)).collect();
        assert_eq!(outcomes[0], EventOutcome::NodeAdded(NodeId(1)));
        assert_eq!(outcomes[3], EventOutcome::Updated);
        assert!(matches!(outcomes[4], EventOutcome::Connected(_)));
        assert_eq!(patch.connections().len(), 1);
    }

    #[test]
    fn test_release_off_port_cancels() {
        let mut patch = Patch::new(MemoryBackend::new());
        let osc = patch.add_node(NodeKind::Oscillator, 0.0, 0.0).unwrap();

        patch.handle_event(InputEvent::PortPressed { node: osc, port: 0, is_output: true });
        let outcome = patch.handle_event(InputEvent::PointerReleased { on_port: None });
        assert_eq!(outcome, EventOutcome::Updated);
        assert!(patch.view().drag().is_none());

        // Nothing left to release
        let outcome = patch.handle_event(InputEvent::PointerReleased {
            on_port: Some(PortRef::new(osc, 0, PortDirection::Input)),
        });
        assert_eq!(outcome, EventOutcome::Ignored);
    }

    #[test]
    fn test_move_without_drag_is_ignored() {
        let mut patch = Patch::new(MemoryBackend::new());
        assert_eq!(
            patch.handle_event(InputEvent::PointerMoved { x: 1.0, y: 1.0 }),
            EventOutcome::Ignored
        );
        assert_eq!(patch.handle_event(InputEvent::DeleteSelection), EventOutcome::Ignored);
    }

    #[test]
    fn test_node_drag_and_delete() {
        let mut patch = Patch::new(MemoryBackend::new());
        let gain = patch.add_node(NodeKind::Gain, 10.0, 10.0).unwrap();

        patch.handle_event(InputEvent::NodeDragStart { node: gain, x: 15.0, y: 15.0 });
        patch.handle_event(InputEvent::NodeDragMove { x: 25.0, y: 35.0 });
        assert_eq!(patch.handle_event(InputEvent::NodeDragEnd), EventOutcome::Updated);
        assert_eq!(patch.node(gain).unwrap().position, [20.0, 30.0]);

        assert_eq!(
            patch.handle_event(InputEvent::DeleteSelection),
            EventOutcome::NodeDeleted(gain)
        );
    }

    #[test]
    fn test_set_parameter() {
        let mut patch = Patch::new(MemoryBackend::new());
        let gain = patch.add_node(NodeKind::Gain, 0.0, 0.0).unwrap();

        let outcome = patch.handle_event(InputEvent::SetParameter {
            node: gain,
            key: "gain".to_string(),
            value: ParamValue::Float(0.8),
        });
        assert_eq!(outcome, EventOutcome::Updated);
        assert_eq!(patch.node(gain).unwrap().param("gain"), Some(&ParamValue::Float(0.8)));
    }

    #[test]
    fn test_events_parse_from_ron() {
        let script = r#"[
            AddNode(kind: oscillator, x: 10.0, y: 20.0),
            PortPressed(node: 1, port: 0, is_output: true),
            PointerReleased(on_port: Some((node: 2, port: 0, is_output: false))),
            SetParameter(node: 1, key: "freq", value: Float(220.0)),
        ]"#;
        let events: Vec<InputEvent> = ron::from_str(script).unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(
            events[0],
            InputEvent::AddNode { kind: NodeKind::Oscillator, x: 10.0, y: 20.0 }
        );
    }
}
