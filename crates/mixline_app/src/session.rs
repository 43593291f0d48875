// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scripted editing sessions.
//!
//! A script is a RON file listing input events in the order a user would
//! produce them. Replaying it drives a patch exactly like the canvas does.

use mixline_graph::{
    CanvasLayout, EditorSettings, EventOutcome, InputEvent, MemoryBackend, NodeId, NodeKind, Patch,
    PortDirection, PortRef,
};
use serde::Deserialize;
use std::path::Path;

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Script parse error
    #[error("Script parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Event script
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    /// Events in dispatch order
    pub events: Vec<InputEvent>,
}

impl Script {
    /// Parse a script from RON text
    pub fn from_ron(content: &str) -> Result<Self, SessionError> {
        Ok(ron::from_str(content)?)
    }

    /// Load a script from disk
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Oscillator into gain into output, with one rejected wire on the way
    pub fn demo() -> Self {
        let port = |node, direction| Some(PortRef::new(NodeId(node), 0, direction));
        Self {
            events: vec![
                InputEvent::AddNode { kind: NodeKind::Oscillator, x: 40.0, y: 80.0 },
                InputEvent::AddNode { kind: NodeKind::Gain, x: 300.0, y: 80.0 },
                InputEvent::AddNode { kind: NodeKind::Output, x: 560.0, y: 80.0 },
                // Backwards: gain output into the oscillator's frequency input
                InputEvent::PortPressed { node: NodeId(2), port: 0, is_output: true },
                InputEvent::PointerReleased { on_port: port(1, PortDirection::Input) },
                InputEvent::PortPressed { node: NodeId(1), port: 0, is_output: true },
                InputEvent::PointerMoved { x: 250.0, y: 120.0 },
                InputEvent::PointerReleased { on_port: port(2, PortDirection::Input) },
                InputEvent::PortPressed { node: NodeId(3), port: 0, is_output: false },
                InputEvent::PointerReleased { on_port: port(2, PortDirection::Output) },
            ],
        }
    }
}

/// Counts of what a replay did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Events dispatched
    pub events: usize,
    /// Connections committed
    pub connected: usize,
    /// Releases that did not connect
    pub rejected: usize,
    /// Events with no effect
    pub ignored: usize,
}

/// A patch plus the layout used to place its port anchors
pub struct Session {
    patch: Patch<MemoryBackend>,
    layout: CanvasLayout,
}

impl Session {
    /// Start an empty session
    pub fn new(settings: &EditorSettings) -> Self {
        Self {
            patch: Patch::new(MemoryBackend::new()),
            layout: CanvasLayout::new(&settings.canvas),
        }
    }

    /// Dispatch every event in order, keeping anchors in sync after each
    pub fn replay(&mut self, script: &Script) -> SessionSummary {
        let mut summary = SessionSummary::default();

        for event in &script.events {
            let outcome = self.patch.handle_event(event.clone());
            self.patch.sync_port_anchors(&self.layout);
            summary.events += 1;

            match &outcome {
                EventOutcome::Connected(id) => {
                    summary.connected += 1;
                    tracing::debug!("Connected {id}");
                }
                EventOutcome::Rejected(e) => {
                    summary.rejected += 1;
                    tracing::info!("Rejected: {e}");
                }
                EventOutcome::BackendFailed(e) => tracing::warn!("{e}"),
                EventOutcome::Ignored => {
                    summary.ignored += 1;
                    tracing::debug!("Ignored {event:?}");
                }
                EventOutcome::NodeAdded(_) | EventOutcome::NodeDeleted(_) | EventOutcome::Updated => {}
            }
        }

        summary
    }

    /// The patch being edited
    pub fn patch(&self) -> &Patch<MemoryBackend> {
        &self.patch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_builds_chain() {
        let mut session = Session::new(&EditorSettings::default());
        let summary = session.replay(&Script::demo());

        assert_eq!(summary.events, 10);
        assert_eq!(summary.connected, 2);
        assert_eq!(summary.rejected, 1);
        assert_eq!(session.patch().connections().len(), 2);
        assert_eq!(session.patch().backend().wires().len(), 2);
        assert!(session.patch().view().drag().is_none());
    }

    #[test]
    fn test_anchors_follow_replay() {
        let mut session = Session::new(&EditorSettings::default());
        session.replay(&Script::demo());

        let view = session.patch().view();
        assert_eq!(view.connection_segments().count(), 2);
        let osc_out = view.anchor(PortRef::new(NodeId(1), 0, PortDirection::Output)).unwrap();
        assert_eq!(osc_out[0], 40.0 + mixline_graph::node::NODE_WIDTH);
    }

    #[test]
    fn test_script_from_ron() {
        let script = Script::from_ron(
            r#"(events: [
                AddNode(kind: gain, x: 0.0, y: 0.0),
                SelectNode(node: 1),
                DeleteSelection,
                DeleteSelection,
            ])"#,
        )
        .unwrap();

        let mut session = Session::new(&EditorSettings::default());
        let summary = session.replay(&script);
        assert_eq!(summary.ignored, 1);
        assert!(session.patch().nodes().is_empty());
    }

    #[test]
    fn test_bad_script_is_parse_error() {
        assert!(matches!(
            Script::from_ron("(events: [Explode])"),
            Err(SessionError::Parse(_))
        ));
    }
}
