use std::collections::HashMap;

use super::FlowError;
use crate::domain::{FlowDevice, MeasurementSnapshot};

/// One connection, addressed by device indices
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    /// Position within the source device's connection list
    pub slot: usize,
    pub entity: Option<String>,
    pub internal: bool,
}

/// Arena of devices and edges for one calculation cycle.
///
/// Devices are indexed by declaration position and edges are stored in
/// declaration order (device order, then connection order), which is the
/// tie-break order of the heuristic pass.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    ids: Vec<String>,
    intrinsic: Vec<f64>,
    edges: Vec<Edge>,
    incident: Vec<Vec<usize>>,
}

impl FlowGraph {
    /// Index the devices and evaluate their intrinsic values against `snapshot`
    pub fn build<D: FlowDevice>(
        devices: &[D],
        snapshot: &MeasurementSnapshot,
    ) -> Result<Self, FlowError> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(devices.len());
        for (i, device) in devices.iter().enumerate() {
            if index.insert(device.id(), i).is_some() {
                return Err(FlowError::DuplicateDevice(device.id().to_string()));
            }
        }

        let mut edges = Vec::new();
        let mut incident = vec![Vec::new(); devices.len()];
        for (source, device) in devices.iter().enumerate() {
            for (slot, c) in device.connections().iter().enumerate() {
                let target = *index.get(c.target.as_str()).ok_or_else(|| {
                    FlowError::DanglingTarget {
                        from: device.id().to_string(),
                        target: c.target.clone(),
                    }
                })?;
                let e = edges.len();
                incident[source].push(e);
                if target != source {
                    incident[target].push(e);
                }
                edges.push(Edge {
                    source,
                    target,
                    slot,
                    // an empty entity means no sensor
                    entity: c.entity.clone().filter(|e| !e.is_empty()),
                    internal: c.internal,
                });
            }
        }

        Ok(Self {
            ids: devices.iter().map(|d| d.id().to_string()).collect(),
            intrinsic: devices.iter().map(|d| d.intrinsic_value(snapshot)).collect(),
            edges,
            incident,
        })
    }

    pub fn device_count(&self) -> usize {
        self.ids.len()
    }

    pub fn device_id(&self, device: usize) -> &str {
        &self.ids[device]
    }

    pub fn intrinsic(&self, device: usize) -> f64 {
        self.intrinsic[device]
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, edge: usize) -> &Edge {
        &self.edges[edge]
    }

    /// Edges where `device` is the source or the target, in declaration order
    pub fn incident(&self, device: usize) -> &[usize] {
        &self.incident[device]
    }

    /// Human readable `from -> to` label
    pub fn describe(&self, edge: usize) -> (&str, &str) {
        let e = &self.edges[edge];
        (self.device_id(e.source), self.device_id(e.target))
    }
}
