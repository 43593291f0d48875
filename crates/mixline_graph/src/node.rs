// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions: the closed set of node kinds and node instances.

use crate::backend::UnitHandle;
use crate::port::{Port, PortDirection, PortSpec};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Node width shared by every kind
pub const NODE_WIDTH: f32 = 180.0;

/// Unique identifier for a node, assigned monotonically and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameter value stored in a node's data record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// Numeric control (frequency, gain)
    Float(f32),
    /// Enumerated choice (waveform)
    Text(String),
}

impl ParamValue {
    /// Numeric value, if any
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// Text value, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Float(_) => None,
            Self::Text(s) => Some(s),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Value domain of a parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    /// Continuous value clamped to `min..=max`
    Float {
        /// Default value
        default: f32,
        /// Lower bound
        min: f32,
        /// Upper bound
        max: f32,
    },
    /// One of a fixed set of options
    Choice {
        /// Default option
        default: &'static str,
        /// Allowed options
        options: &'static [&'static str],
    },
}

/// Static parameter schema entry for a node kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    /// Key into the node's data record and backend control name
    pub key: &'static str,
    /// Value domain
    pub kind: ParamKind,
}

impl ParamSpec {
    /// Default value for a freshly created node
    pub fn default_value(&self) -> ParamValue {
        match self.kind {
            ParamKind::Float { default, .. } => ParamValue::Float(default),
            ParamKind::Choice { default, .. } => ParamValue::Text(default.to_string()),
        }
    }

    /// Coerce a value into this parameter's domain.
    ///
    /// Floats are clamped; choices must match one of the options exactly.
    pub fn accept(&self, value: ParamValue) -> Option<ParamValue> {
        match (self.kind, value) {
            (ParamKind::Float { min, max, .. }, ParamValue::Float(v)) if v.is_finite() => {
                Some(ParamValue::Float(v.clamp(min, max)))
            }
            (ParamKind::Choice { options, .. }, ParamValue::Text(s)) if options.contains(&s.as_str()) => {
                Some(ParamValue::Text(s))
            }
            _ => None,
        }
    }
}

/// Fixed layout and parameter schema of a node kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeSchema {
    /// Type name shown in the node header
    pub name: &'static str,
    /// Input ports, in order
    pub inputs: &'static [PortSpec],
    /// Output ports, in order
    pub outputs: &'static [PortSpec],
    /// Parameters, in order
    pub params: &'static [ParamSpec],
    /// Node height in canvas units
    pub height: f32,
}

impl NodeSchema {
    /// Look up a parameter by key
    pub fn param(&self, key: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.key == key)
    }
}

const WAVEFORMS: &[&str] = &["sine", "square", "sawtooth", "triangle"];

const OSCILLATOR: NodeSchema = NodeSchema {
    name: "oscillator",
    inputs: &[PortSpec { id: "freq", label: "Freq" }],
    outputs: &[PortSpec { id: "out", label: "Out" }],
    params: &[
        ParamSpec {
            key: "freq",
            kind: ParamKind::Float { default: 440.0, min: 20.0, max: 2000.0 },
        },
        ParamSpec {
            key: "waveform",
            kind: ParamKind::Choice { default: "sine", options: WAVEFORMS },
        },
    ],
    height: 140.0,
};

const GAIN: NodeSchema = NodeSchema {
    name: "gain",
    inputs: &[PortSpec { id: "in", label: "In" }],
    outputs: &[PortSpec { id: "out", label: "Out" }],
    params: &[ParamSpec {
        key: "gain",
        kind: ParamKind::Float { default: 0.5, min: 0.0, max: 1.0 },
    }],
    height: 120.0,
};

const OUTPUT: NodeSchema = NodeSchema {
    name: "output",
    inputs: &[PortSpec { id: "in", label: "In" }],
    outputs: &[],
    params: &[],
    height: 100.0,
};

/// Node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Tone generator with a frequency control
    Oscillator,
    /// Amplitude scaler
    Gain,
    /// Master output
    Output,
}

impl NodeKind {
    /// Every kind, in menu order
    pub const ALL: [NodeKind; 3] = [NodeKind::Oscillator, NodeKind::Gain, NodeKind::Output];

    /// Fixed layout and parameter schema for this kind
    pub fn schema(self) -> &'static NodeSchema {
        match self {
            Self::Oscillator => &OSCILLATOR,
            Self::Gain => &GAIN,
            Self::Output => &OUTPUT,
        }
    }

    /// Type name
    pub fn name(self) -> &'static str {
        self.schema().name
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error parsing a node kind name
#[derive(Debug, thiserror::Error)]
#[error("Unknown node kind: {0}")]
pub struct UnknownNodeKind(pub String);

impl FromStr for NodeKind {
    type Err = UnknownNodeKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownNodeKind(s.to_string()))
    }
}

/// A node instance in the patch
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Node kind
    pub kind: NodeKind,
    /// Top-left corner in canvas space
    pub position: [f32; 2],
    /// Width and height in canvas units
    pub size: [f32; 2],
    /// Kind-specific parameters
    pub data: IndexMap<String, ParamValue>,
    /// Input ports
    pub inputs: Vec<Port>,
    /// Output ports
    pub outputs: Vec<Port>,
    /// Backend unit realizing this node
    pub unit: Option<UnitHandle>,
}

impl Node {
    /// Create a node of `kind` with default parameters and no backend unit
    pub fn new(id: NodeId, kind: NodeKind, x: f32, y: f32) -> Self {
        let schema = kind.schema();
        Self {
            id,
            kind,
            position: [x, y],
            size: [NODE_WIDTH, schema.height],
            data: schema
                .params
                .iter()
                .map(|p| (p.key.to_string(), p.default_value()))
                .collect(),
            inputs: schema
                .inputs
                .iter()
                .map(|spec| Port::from_spec(spec, PortDirection::Input))
                .collect(),
            outputs: schema
                .outputs
                .iter()
                .map(|spec| Port::from_spec(spec, PortDirection::Output))
                .collect(),
            unit: None,
        }
    }

    /// Header title, e.g. `oscillator [3]`
    pub fn title(&self) -> String {
        format!("{} [{}]", self.kind, self.id)
    }

    /// Get an input port by index
    pub fn input(&self, index: usize) -> Option<&Port> {
        self.inputs.get(index)
    }

    /// Get an output port by index
    pub fn output(&self, index: usize) -> Option<&Port> {
        self.outputs.get(index)
    }

    /// Get a port by direction and index
    pub fn port(&self, direction: PortDirection, index: usize) -> Option<&Port> {
        self.ports(direction).get(index)
    }

    /// Ports on one side of the node
    pub fn ports(&self, direction: PortDirection) -> &[Port] {
        match direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        }
    }

    /// Mutable ports on one side of the node
    pub fn ports_mut(&mut self, direction: PortDirection) -> &mut [Port] {
        match direction {
            PortDirection::Input => &mut self.inputs,
            PortDirection::Output => &mut self.outputs,
        }
    }

    /// Get a parameter value
    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.data.get(key)
    }

    /// Check if a canvas point lies inside the node rect
    pub fn contains(&self, point: [f32; 2]) -> bool {
        point[0] >= self.position[0]
            && point[0] <= self.position[0] + self.size[0]
            && point[1] >= self.position[1]
            && point[1] <= self.position[1] + self.size[1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_from_kind() {
        let osc = Node::new(NodeId(1), NodeKind::Oscillator, 10.0, 20.0);
        assert_eq!(osc.inputs.len(), 1);
        assert_eq!(osc.outputs.len(), 1);
        assert_eq!(osc.inputs[0].label, "Freq");
        assert_eq!(osc.param("freq"), Some(&ParamValue::Float(440.0)));
        assert_eq!(osc.param("waveform"), Some(&ParamValue::Text("sine".into())));
        assert_eq!(osc.size, [NODE_WIDTH, 140.0]);

        let out = Node::new(NodeId(2), NodeKind::Output, 0.0, 0.0);
        assert!(out.outputs.is_empty());
        assert!(out.data.is_empty());
        assert_eq!(out.title(), "output [2]");
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("gain".parse::<NodeKind>().unwrap(), NodeKind::Gain);
        assert!("reverb".parse::<NodeKind>().is_err());
        for kind in NodeKind::ALL {
            assert_eq!(kind.name().parse::<NodeKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_param_accept() {
        let freq = NodeKind::Oscillator.schema().param("freq").unwrap();
        assert_eq!(freq.accept(ParamValue::Float(5000.0)), Some(ParamValue::Float(2000.0)));
        assert_eq!(freq.accept(ParamValue::Float(f32::NAN)), None);
        assert_eq!(freq.accept(ParamValue::Text("loud".into())), None);

        let wave = NodeKind::Oscillator.schema().param("waveform").unwrap();
        assert!(wave.accept(ParamValue::Text("square".into())).is_some());
        assert!(wave.accept(ParamValue::Text("noise".into())).is_none());
    }

    #[test]
    fn test_contains() {
        let node = Node::new(NodeId(1), NodeKind::Gain, 0.0, 0.0);
        assert!(node.contains([90.0, 60.0]));
        assert!(!node.contains([190.0, 60.0]));
    }
}
