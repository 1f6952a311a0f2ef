use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use thiserror::Error;

use super::device::{Connection, FlowQuantity, StandardDevice};

/// Topology document errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("No devices defined")]
    NoDevices,
    #[error("Device must have an id")]
    EmptyId,
    #[error("Duplicate device id: {0}")]
    DuplicateId(String),
    #[error("Device {0} needs at least one of power_sink, power_source, energy_sink or energy_source")]
    NoSensors(String),
    #[error("Connection from {0} needs a description of its route")]
    EmptyDescription(String),
    #[error("Connection target \"{target}\" of device {source_id} doesn't exist")]
    DanglingTarget { source_id: String, target: String },
}

/// User-authored device list
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Topology {
    #[serde(default)]
    pub power_or_energy: FlowQuantity,

    /// Default floor for devices that do not set their own
    #[serde(default)]
    pub floor: Option<f64>,

    #[serde(default)]
    pub devices: Vec<DeviceSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceSpec {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub power_sink: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub power_source: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub energy_sink: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub energy_source: Vec<String>,
    #[serde(default)]
    pub floor: Option<f64>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl DeviceSpec {
    fn sensor_count(&self) -> usize {
        self.power_sink.len()
            + self.power_source.len()
            + self.energy_sink.len()
            + self.energy_source.len()
    }
}

impl Topology {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Check ids, sensors and cross references
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.devices.is_empty() {
            return Err(TopologyError::NoDevices);
        }

        let mut ids = HashSet::new();
        for device in &self.devices {
            if device.id.is_empty() {
                return Err(TopologyError::EmptyId);
            }
            if !ids.insert(device.id.as_str()) {
                return Err(TopologyError::DuplicateId(device.id.clone()));
            }
            if device.sensor_count() == 0 {
                return Err(TopologyError::NoSensors(device.id.clone()));
            }
            if device.connections.iter().any(|c| c.desc.is_empty()) {
                return Err(TopologyError::EmptyDescription(device.id.clone()));
            }
        }

        for device in &self.devices {
            for c in &device.connections {
                if !ids.contains(c.target.as_str()) {
                    return Err(TopologyError::DanglingTarget {
                        source_id: device.id.clone(),
                        target: c.target.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Build devices in declaration order
    pub fn into_devices(self, default_floor: f64) -> Vec<StandardDevice> {
        let quantity = self.power_or_energy;
        let floor = self.floor.unwrap_or(default_floor);
        self.devices
            .into_iter()
            .map(|spec| StandardDevice {
                name: spec.name.unwrap_or_else(|| spec.id.clone()),
                id: spec.id,
                power_sink: spec.power_sink,
                power_source: spec.power_source,
                energy_sink: spec.energy_sink,
                energy_source: spec.energy_source,
                connections: spec.connections,
                quantity,
                floor: spec.floor.unwrap_or(floor),
            })
            .collect()
    }
}

/// Accept either `"sensor.x"` or `["sensor.x", "sensor.y"]`
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}
