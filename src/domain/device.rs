use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::measurement::MeasurementSnapshot;

/// Which quantity the flows describe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FlowQuantity {
    #[default]
    Power,
    Energy,
}

/// Directed link from the owning device to `target`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Connection {
    /// Id of the device at the far end
    pub target: String,

    /// Route description for the renderer, opaque here
    #[serde(default)]
    pub desc: String,

    /// Sensor entity carrying the flow on this connection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,

    /// Explains where the source's own value comes from without counting as a
    /// transfer away from the source
    #[serde(default)]
    pub internal: bool,

    /// Resolved flow, positive = source to target
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl Connection {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            desc: String::new(),
            entity: None,
            internal: false,
            value: None,
        }
    }

    pub fn measured_by(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }
}

/// A node in the flow graph
pub trait FlowDevice {
    fn id(&self) -> &str;

    /// Net export (positive) or import (negative) for this snapshot
    fn intrinsic_value(&self, snapshot: &MeasurementSnapshot) -> f64;

    fn connections(&self) -> &[Connection];

    fn connections_mut(&mut self) -> &mut [Connection];
}

/// Device whose intrinsic value was computed by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct FixedDevice {
    pub id: String,
    pub intrinsic: f64,
    pub connections: Vec<Connection>,
}

impl FixedDevice {
    pub fn new(id: impl Into<String>, intrinsic: f64) -> Self {
        Self {
            id: id.into(),
            intrinsic,
            connections: Vec::new(),
        }
    }

    pub fn connect(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }
}

impl FlowDevice for FixedDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn intrinsic_value(&self, _snapshot: &MeasurementSnapshot) -> f64 {
        self.intrinsic
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn connections_mut(&mut self) -> &mut [Connection] {
        &mut self.connections
    }
}

/// Device whose intrinsic value is summed from sensor entities.
///
/// A positive reading on a `*_source` entity means power or energy leaves the
/// device towards the house (solar production, battery discharge, grid import).
/// A positive reading on a `*_sink` entity means it enters the device (load,
/// battery charge, grid feed-in).
#[derive(Debug, Clone, PartialEq)]
pub struct StandardDevice {
    pub id: String,
    pub name: String,
    pub power_sink: Vec<String>,
    pub power_source: Vec<String>,
    pub energy_sink: Vec<String>,
    pub energy_source: Vec<String>,
    pub connections: Vec<Connection>,
    pub quantity: FlowQuantity,
    /// Magnitudes below this are reported as zero
    pub floor: f64,
}

impl StandardDevice {
    pub fn new(id: impl Into<String>, quantity: FlowQuantity) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            power_sink: Vec::new(),
            power_source: Vec::new(),
            energy_sink: Vec::new(),
            energy_source: Vec::new(),
            connections: Vec::new(),
            quantity,
            floor: 0.0,
        }
    }

    pub fn power(&self, snapshot: &MeasurementSnapshot) -> f64 {
        self.clamp(round2(
            snapshot.sum_kw(&self.power_source) - snapshot.sum_kw(&self.power_sink),
        ))
    }

    pub fn energy_in(&self, snapshot: &MeasurementSnapshot) -> f64 {
        self.clamp(round2(snapshot.sum_kw(&self.energy_sink)))
    }

    pub fn energy_out(&self, snapshot: &MeasurementSnapshot) -> f64 {
        self.clamp(round2(snapshot.sum_kw(&self.energy_source)))
    }

    fn clamp(&self, value: f64) -> f64 {
        if value.abs() < self.floor {
            0.0
        } else {
            value
        }
    }
}

impl FlowDevice for StandardDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn intrinsic_value(&self, snapshot: &MeasurementSnapshot) -> f64 {
        match self.quantity {
            FlowQuantity::Power => self.power(snapshot),
            FlowQuantity::Energy => self.energy_out(snapshot) - self.energy_in(snapshot),
        }
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn connections_mut(&mut self) -> &mut [Connection] {
        &mut self.connections
    }
}

/// Round to two decimals
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
