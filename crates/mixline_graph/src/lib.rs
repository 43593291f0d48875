// SPDX-License-Identifier: MIT OR Apache-2.0
//! Patch model for the Mixline audio patch editor.
//!
//! A patch is a set of audio nodes (oscillators, gains, an output) joined by
//! directed connections from output ports to input ports. Each node is
//! realized by a unit in a [`ProcessingBackend`]; the backend is the final
//! arbiter of whether two units can be wired.
//!
//! ## Architecture
//!
//! - [`NodeStore`] and [`ConnectionStore`] own the model
//! - [`protocol`] validates a drag release before anything is wired
//! - [`Patch`] combines the stores with a backend and exposes the entry points
//! - [`InputEvent`] drives the entry points from a UI or a script
//! - [`PatchView`] is the read-only surface renderers draw from
//! - [`ui`] renders the canvas with egui

pub mod anchors;
pub mod backend;
pub mod connection;
pub mod connections;
pub mod graph;
pub mod input;
pub mod node;
pub mod patch;
pub mod port;
pub mod protocol;
pub mod settings;
pub mod ui;
pub mod view;

pub use anchors::{sync_port_anchors, CanvasLayout, PortLayout};
pub use backend::{BackendError, Capability, MemoryBackend, ProcessingBackend, UnitHandle};
pub use connection::{Connection, ConnectionId, DragConnection};
pub use connections::ConnectionStore;
pub use graph::{NodeDrag, NodeStore};
pub use input::{EventOutcome, InputEvent};
pub use node::{Node, NodeId, NodeKind, ParamValue};
pub use patch::Patch;
pub use port::{Port, PortDirection, PortRef};
pub use protocol::ConnectError;
pub use settings::{CanvasSettings, EditorSettings, SettingsError};
pub use ui::PatchEditorState;
pub use view::{PatchView, Segment};
