use super::{FlowError, FlowGraph};

/// Running net flow per device plus the resolved value of every edge.
///
/// Recording `v` on an edge adds `v` to the source (unless the edge is
/// internal) and subtracts `v` from the target. Every phase mutates state
/// through [`NetFlowTracker::record`] only.
#[derive(Debug, Clone)]
pub struct NetFlowTracker {
    net: Vec<f64>,
    values: Vec<Option<f64>>,
}

impl NetFlowTracker {
    pub fn new(graph: &FlowGraph) -> Self {
        Self {
            net: vec![0.0; graph.device_count()],
            values: vec![None; graph.edges().len()],
        }
    }

    /// Assign `value` to `edge`; each edge takes exactly one assignment
    pub fn record(&mut self, graph: &FlowGraph, edge: usize, value: f64) -> Result<(), FlowError> {
        if self.values[edge].is_some() {
            let (from, to) = graph.describe(edge);
            return Err(FlowError::AlreadyAssigned {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        // -0.0 + 0.0 is +0.0
        let value = value + 0.0;
        self.values[edge] = Some(value);

        let e = graph.edge(edge);
        if !e.internal {
            self.net[e.source] += value;
        }
        self.net[e.target] -= value;
        Ok(())
    }

    pub fn net(&self, device: usize) -> f64 {
        self.net[device]
    }

    /// Intrinsic target minus what has been assigned so far
    pub fn remaining(&self, graph: &FlowGraph, device: usize) -> f64 {
        graph.intrinsic(device) - self.net[device]
    }

    pub fn value(&self, edge: usize) -> Option<f64> {
        self.values[edge]
    }

    pub fn is_resolved(&self, edge: usize) -> bool {
        self.values[edge].is_some()
    }

    /// All unresolved edges in declaration order
    pub fn unresolved(&self) -> Vec<usize> {
        (0..self.values.len())
            .filter(|&e| !self.is_resolved(e))
            .collect()
    }

    /// Unresolved edges touching `device`
    pub fn unresolved_incident(&self, graph: &FlowGraph, device: usize) -> Vec<usize> {
        graph
            .incident(device)
            .iter()
            .copied()
            .filter(|&e| !self.is_resolved(e))
            .collect()
    }
}
