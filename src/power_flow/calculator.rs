use itertools::Itertools;
use tracing::debug;

use super::{ConnectionFlow, DeviceFlow, FlowError, FlowGraph, FlowSummary, NetFlowTracker};
use crate::domain::{FlowDevice, MeasurementSnapshot};

/// Flow Calculator - infers a value for every connection
///
/// Assignment order:
/// 1. Connections with their own sensor get the measured value
/// 2. While some device has exactly one unresolved connection, that connection
///    gets whatever brings the device's net flow to its intrinsic value
/// 3. Remaining connections, in declaration order, move the largest amount that
///    brings both ends towards their intrinsic value without overshooting
/// 4. Anything still unresolved is 0
///
/// Steps 1 and 2 are well defined. Step 3 depends on declaration order and is
/// not guaranteed to balance every device, which is acceptable for display.
#[derive(Debug, Clone, Default)]
pub struct FlowCalculator {
    debug: bool,
}

impl FlowCalculator {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    /// Resolve every connection of `devices` and write the values back onto them
    pub fn calculate<D: FlowDevice>(
        &self,
        devices: &mut [D],
        snapshot: &MeasurementSnapshot,
    ) -> Result<FlowSummary, FlowError> {
        let graph = FlowGraph::build(devices, snapshot)?;
        let mut tracker = NetFlowTracker::new(&graph);
        self.trace_pending("start", &graph, &tracker);

        self.assign_measured(&graph, &mut tracker, snapshot)?;
        self.trace_pending("measured connections", &graph, &tracker);

        while self.assign_singletons(&graph, &mut tracker)? > 0 {}
        self.trace_pending("singleton devices", &graph, &tracker);

        self.balance_remaining(&graph, &mut tracker)?;

        let summary = materialize(&graph, &tracker, devices);
        if self.debug {
            debug!("final assignments\n{}", summary);
        }
        Ok(summary)
    }

    fn assign_measured(
        &self,
        graph: &FlowGraph,
        tracker: &mut NetFlowTracker,
        snapshot: &MeasurementSnapshot,
    ) -> Result<(), FlowError> {
        for edge in tracker.unresolved() {
            let Some(entity) = graph.edge(edge).entity.as_deref() else {
                continue;
            };
            // an unavailable sensor pins the connection to 0 rather than
            // leaving it to inference
            let value = snapshot.value_kw(entity).unwrap_or(0.0);
            if self.debug {
                let (from, to) = graph.describe(edge);
                debug!(from, to, entity, reading = ?snapshot.reading(entity), value, "measured connection");
            }
            tracker.record(graph, edge, value)?;
        }
        Ok(())
    }

    /// One pass over the devices; returns the number of assignments made
    fn assign_singletons(
        &self,
        graph: &FlowGraph,
        tracker: &mut NetFlowTracker,
    ) -> Result<usize, FlowError> {
        let singletons: Vec<usize> = (0..graph.device_count())
            .filter(|&d| tracker.unresolved_incident(graph, d).len() == 1)
            .collect();

        let mut assigned = 0;
        for device in singletons {
            // the edge may have been taken by the device at the other end
            let pending = tracker.unresolved_incident(graph, device);
            let &[edge] = pending.as_slice() else {
                continue;
            };
            let e = graph.edge(edge);
            let dir = if e.source == device { 1.0 } else { -1.0 };
            let value = dir * tracker.remaining(graph, device);

            if self.debug {
                let (from, to) = graph.describe(edge);
                debug!(
                    device = graph.device_id(device),
                    from,
                    to,
                    intrinsic = graph.intrinsic(device),
                    tracked = tracker.net(device),
                    value,
                    "singleton device"
                );
            }
            tracker.record(graph, edge, value)?;
            if self.debug {
                debug!(
                    source_tracked = tracker.net(e.source),
                    target_tracked = tracker.net(e.target),
                    "post assignment net flows"
                );
            }
            assigned += 1;
        }
        Ok(assigned)
    }

    /// Greedy single pass in declaration order, no lookahead
    fn balance_remaining(
        &self,
        graph: &FlowGraph,
        tracker: &mut NetFlowTracker,
    ) -> Result<(), FlowError> {
        for edge in tracker.unresolved() {
            let e = graph.edge(edge);
            let from_rem = tracker.remaining(graph, e.source);
            let to_rem = tracker.remaining(graph, e.target);

            let value = if from_rem * to_rem >= 0.0 {
                // both exporting, both importing, or one end already satisfied
                0.0
            } else {
                let dir = if from_rem > 0.0 { 1.0 } else { -1.0 };
                dir * from_rem.abs().min(to_rem.abs())
            };

            if self.debug {
                let (from, to) = graph.describe(edge);
                debug!(from, to, from_rem, to_rem, value, "heuristic assignment");
            }
            tracker.record(graph, edge, value)?;
        }
        Ok(())
    }

    fn trace_pending(&self, stage: &str, graph: &FlowGraph, tracker: &NetFlowTracker) {
        if !self.debug {
            return;
        }
        let pending = tracker.unresolved();
        let labels = pending
            .iter()
            .map(|&e| {
                let (from, to) = graph.describe(e);
                format!("{from}->{to}")
            })
            .join(", ");
        debug!(stage, unresolved = pending.len(), connections = %labels, "flow calculation progress");
    }
}

/// Copy resolved values onto the caller's connections and build the summary
fn materialize<D: FlowDevice>(
    graph: &FlowGraph,
    tracker: &NetFlowTracker,
    devices: &mut [D],
) -> FlowSummary {
    let connections = graph
        .edges()
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let value = tracker.value(i).unwrap_or(0.0);
            devices[e.source].connections_mut()[e.slot].value = Some(value);
            let (from, to) = graph.describe(i);
            ConnectionFlow {
                from: from.to_string(),
                to: to.to_string(),
                element_id: format!("line_{}_{}", from, e.slot + 1),
                value,
            }
        })
        .collect();

    let devices = (0..graph.device_count())
        .map(|d| DeviceFlow {
            id: graph.device_id(d).to_string(),
            intrinsic: graph.intrinsic(d),
            tracked: tracker.net(d),
        })
        .collect();

    FlowSummary {
        connections,
        devices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Connection, EntityState, FixedDevice};

    fn run(devices: &mut [FixedDevice]) -> FlowSummary {
        FlowCalculator::default()
            .calculate(devices, &MeasurementSnapshot::new())
            .unwrap()
    }

    #[test]
    fn test_isolated_pair_is_conserved() {
        let mut devices = vec![
            FixedDevice::new("a", 2.5).connect(Connection::new("b")),
            FixedDevice::new("b", 0.0),
        ];

        let summary = run(&mut devices);

        assert_eq!(devices[0].connections[0].value, Some(2.5));
        assert_eq!(summary.device("a").unwrap().tracked, 2.5);
        assert_eq!(summary.device("b").unwrap().tracked, -2.5);
    }

    #[test]
    fn test_reverse_declared_pair() {
        // declared home -> grid while the grid is supplying the house
        let mut devices = vec![
            FixedDevice::new("home", -4.0).connect(Connection::new("grid")),
            FixedDevice::new("grid", 4.0),
        ];

        let summary = run(&mut devices);

        assert_eq!(devices[0].connections[0].value, Some(-4.0));
        assert!(summary.unbalanced(1e-9).is_empty());
    }

    #[test]
    fn test_transmission_node_passes_flow_through() {
        // solar -> inverter -> home, inverter has no consumption of its own
        let mut devices = vec![
            FixedDevice::new("solar", 3.0).connect(Connection::new("inverter")),
            FixedDevice::new("inverter", 0.0).connect(Connection::new("home")),
            FixedDevice::new("home", -3.0),
        ];

        let summary = run(&mut devices);

        assert_eq!(devices[0].connections[0].value, Some(3.0));
        assert_eq!(devices[1].connections[0].value, Some(3.0));
        assert!(summary.unbalanced(1e-9).is_empty());
    }

    #[test]
    fn test_internal_edge_explains_source_value() {
        // panels feed the inverter internally, the inverter forwards to the house
        let mut devices = vec![
            FixedDevice::new("panels", 2.0).connect(Connection::new("inverter").internal()),
            FixedDevice::new("inverter", 0.0).connect(Connection::new("home")),
            FixedDevice::new("home", -2.0),
        ];

        let summary = run(&mut devices);

        assert_eq!(devices[0].connections[0].value, Some(2.0));
        assert_eq!(devices[1].connections[0].value, Some(2.0));
        assert_eq!(summary.device("panels").unwrap().tracked, 0.0);
        assert_eq!(summary.device("inverter").unwrap().tracked, 0.0);
    }

    #[test]
    fn test_measured_edge_uses_sensor() {
        let mut devices = vec![
            FixedDevice::new("grid", 1.0)
                .connect(Connection::new("home").measured_by("sensor.grid_to_home")),
            FixedDevice::new("home", -1.0),
        ];
        let snapshot = MeasurementSnapshot::new()
            .with("sensor.grid_to_home", EntityState::new("750").with_unit("W"));

        FlowCalculator::new(true)
            .calculate(&mut devices, &snapshot)
            .unwrap();

        assert!((devices[0].connections[0].value.unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_rerun_recomputes_from_scratch() {
        let mut devices = vec![
            FixedDevice::new("a", 1.0).connect(Connection::new("b")),
            FixedDevice::new("b", -1.0),
        ];

        run(&mut devices);
        devices[0].intrinsic = 2.0;
        run(&mut devices);

        assert_eq!(devices[0].connections[0].value, Some(2.0));
    }

    #[test]
    fn test_failed_run_leaves_connections_untouched() {
        let mut devices = vec![
            FixedDevice::new("a", 1.0).connect(Connection::new("c")),
            FixedDevice::new("c", 1.0).connect(Connection::new("nowhere")),
        ];

        let err = FlowCalculator::default()
            .calculate(&mut devices, &MeasurementSnapshot::new())
            .unwrap_err();

        assert!(matches!(err, FlowError::DanglingTarget { .. }));
        assert_eq!(devices[0].connections[0].value, None);
    }

    #[test]
    fn test_element_ids_derive_from_device_id() {
        let mut devices = vec![
            FixedDevice::new("battery", 1.0)
                .connect(Connection::new("home"))
                .connect(Connection::new("grid")),
            FixedDevice::new("home", -1.0),
            FixedDevice::new("grid", 0.0),
        ];

        let summary = run(&mut devices);

        let ids: Vec<_> = summary.connections.iter().map(|c| c.element_id.as_str()).collect();
        assert_eq!(ids, vec!["line_battery_1", "line_battery_2"]);
    }

    #[test]
    fn test_zero_flows_are_never_negative_zero() {
        let mut devices = vec![
            FixedDevice::new("a", 0.0)
                .connect(Connection::new("b"))
                .connect(Connection::new("c")),
            FixedDevice::new("b", 0.0),
            FixedDevice::new("c", 0.0),
        ];

        let summary = run(&mut devices);

        for c in &devices[0].connections {
            assert_eq!(c.value.map(f64::to_bits), Some(0.0f64.to_bits()));
        }
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("-0.0"), "{json}");
    }

    #[test]
    fn test_empty_entity_edge_is_inferred() {
        let mut devices = vec![
            FixedDevice::new("a", 2.0).connect(Connection::new("b").measured_by("")),
            FixedDevice::new("b", -2.0),
        ];

        run(&mut devices);

        assert_eq!(devices[0].connections[0].value, Some(2.0));
    }

}
