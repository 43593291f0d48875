// SPDX-License-Identifier: MIT OR Apache-2.0
//! Processing backend contract and an in-memory engine.
//!
//! The patch only talks to the signal engine through [`ProcessingBackend`].
//! [`MemoryBackend`] implements it without producing sound; the app uses it
//! to drive sessions and the tests use its refusal switches to exercise the
//! failure paths.

use crate::node::{NodeKind, ParamValue};
use indexmap::IndexMap;
use std::fmt;

/// Opaque handle to a backend unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitHandle(pub u64);

impl fmt::Display for UnitHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

/// Side of a unit that a wire attaches to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Accepts incoming wires
    Input,
    /// Emits outgoing wires
    Output,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// Error reported by a processing backend
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    /// The engine could not create a unit
    #[error("Failed to create {0} unit")]
    UnitCreation(NodeKind),

    /// The handle does not name a live unit
    #[error("Unknown unit: {0}")]
    UnknownUnit(UnitHandle),

    /// The engine refused the operation
    #[error("Backend refused: {0}")]
    Refused(String),

    /// The unit cannot be wired on the requested side
    #[error("{unit} has no {capability}")]
    MissingCapability {
        /// Offending unit
        unit: UnitHandle,
        /// Side that is missing
        capability: Capability,
    },

    /// The unit has no control with this name
    #[error("{unit} has no control named {key}")]
    UnknownControl {
        /// Offending unit
        unit: UnitHandle,
        /// Control name
        key: String,
    },
}

/// Capability exposed by the external signal engine
pub trait ProcessingBackend {
    /// Create a unit realizing a node of `kind` with initial parameters
    fn create_unit(
        &mut self,
        kind: NodeKind,
        params: &IndexMap<String, ParamValue>,
    ) -> Result<UnitHandle, BackendError>;

    /// Wire the output of `source` into the input of `dest`
    fn connect(&mut self, source: UnitHandle, dest: UnitHandle) -> Result<(), BackendError>;

    /// Drop every outgoing wire of `unit`
    fn disconnect(&mut self, unit: UnitHandle) -> Result<(), BackendError>;

    /// Push a parameter value into one of the unit's controls
    fn set_control(
        &mut self,
        unit: UnitHandle,
        key: &str,
        value: &ParamValue,
    ) -> Result<(), BackendError>;

    /// Release a unit whose node is being deleted
    fn release_unit(&mut self, unit: UnitHandle) -> Result<(), BackendError> {
        self.disconnect(unit)
    }
}

/// A unit living in the in-memory engine
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryUnit {
    /// Kind the unit was created for
    pub kind: NodeKind,
    /// Current control values
    pub controls: IndexMap<String, ParamValue>,
}

impl MemoryUnit {
    /// Check whether the unit can be wired on `capability`.
    ///
    /// Oscillators are pure sources and the output is a sink.
    pub fn has(&self, capability: Capability) -> bool {
        match (self.kind, capability) {
            (NodeKind::Oscillator, Capability::Input) | (NodeKind::Output, Capability::Output) => false,
            _ => true,
        }
    }
}

/// In-memory processing engine
#[derive(Debug, Default)]
pub struct MemoryBackend {
    units: IndexMap<UnitHandle, MemoryUnit>,
    wires: Vec<(UnitHandle, UnitHandle)>,
    next_handle: u64,
    refused_kinds: Vec<NodeKind>,
    refuse_connections: bool,
}

impl MemoryBackend {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Make unit creation fail for `kind`
    pub fn refuse_kind(&mut self, kind: NodeKind) {
        if !self.refused_kinds.contains(&kind) {
            self.refused_kinds.push(kind);
        }
    }

    /// Make every subsequent `connect` fail (or succeed again)
    pub fn set_refuse_connections(&mut self, refuse: bool) {
        self.refuse_connections = refuse;
    }

    /// Get a live unit
    pub fn unit(&self, handle: UnitHandle) -> Option<&MemoryUnit> {
        self.units.get(&handle)
    }

    /// Number of live units
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// All live wires as `(source, dest)` pairs
    pub fn wires(&self) -> &[(UnitHandle, UnitHandle)] {
        &self.wires
    }

    fn live_unit(&self, handle: UnitHandle) -> Result<&MemoryUnit, BackendError> {
        self.units.get(&handle).ok_or(BackendError::UnknownUnit(handle))
    }
}

impl ProcessingBackend for MemoryBackend {
    fn create_unit(
        &mut self,
        kind: NodeKind,
        params: &IndexMap<String, ParamValue>,
    ) -> Result<UnitHandle, BackendError> {
        if self.refused_kinds.contains(&kind) {
            return Err(BackendError::UnitCreation(kind));
        }

        self.next_handle += 1;
        let handle = UnitHandle(self.next_handle);
        self.units.insert(
            handle,
            MemoryUnit {
                kind,
                controls: params.clone(),
            },
        );
        Ok(handle)
    }

    fn connect(&mut self, source: UnitHandle, dest: UnitHandle) -> Result<(), BackendError> {
        if self.refuse_connections {
            return Err(BackendError::Refused("connections disabled".to_string()));
        }
        if !self.live_unit(source)?.has(Capability::Output) {
            return Err(BackendError::MissingCapability {
                unit: source,
                capability: Capability::Output,
            });
        }
        if !self.live_unit(dest)?.has(Capability::Input) {
            return Err(BackendError::MissingCapability {
                unit: dest,
                capability: Capability::Input,
            });
        }

        self.wires.push((source, dest));
        Ok(())
    }

    fn disconnect(&mut self, unit: UnitHandle) -> Result<(), BackendError> {
        self.live_unit(unit)?;
        self.wires.retain(|(source, _)| *source != unit);
        Ok(())
    }

    fn set_control(
        &mut self,
        unit: UnitHandle,
        key: &str,
        value: &ParamValue,
    ) -> Result<(), BackendError> {
        let live = self
            .units
            .get_mut(&unit)
            .ok_or(BackendError::UnknownUnit(unit))?;
        let control = live
            .controls
            .get_mut(key)
            .ok_or_else(|| BackendError::UnknownControl {
                unit,
                key: key.to_string(),
            })?;
        *control = value.clone();
        Ok(())
    }

    fn release_unit(&mut self, unit: UnitHandle) -> Result<(), BackendError> {
        if self.units.swap_remove(&unit).is_none() {
            return Err(BackendError::UnknownUnit(unit));
        }
        self.wires.retain(|(source, dest)| *source != unit && *dest != unit);
        Ok(())
    }
}
