use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolved flow on one connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionFlow {
    pub from: String,
    pub to: String,
    /// Stable renderer id, `line_<source id>_<1-based slot>`
    pub element_id: String,
    pub value: f64,
}

/// Final accounting of one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceFlow {
    pub id: String,
    pub intrinsic: f64,
    pub tracked: f64,
}

impl DeviceFlow {
    /// Part of the intrinsic value the connections do not explain
    pub fn residual(&self) -> f64 {
        self.intrinsic - self.tracked
    }
}

/// Output of one calculation cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowSummary {
    pub connections: Vec<ConnectionFlow>,
    pub devices: Vec<DeviceFlow>,
}

impl FlowSummary {
    pub fn connection(&self, from: &str, to: &str) -> Option<&ConnectionFlow> {
        self.connections.iter().find(|c| c.from == from && c.to == to)
    }

    pub fn device(&self, id: &str) -> Option<&DeviceFlow> {
        self.devices.iter().find(|d| d.id == id)
    }

    /// Devices whose connections do not add up to their intrinsic value
    pub fn unbalanced(&self, tolerance: f64) -> Vec<&DeviceFlow> {
        self.devices
            .iter()
            .filter(|d| d.residual().abs() > tolerance)
            .collect()
    }
}

impl fmt::Display for FlowSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Connections:")?;
        for c in &self.connections {
            writeln!(f, "    from {} to {}: {:.2}", c.from, c.to, c.value)?;
        }
        writeln!(f, "Devices:")?;
        for d in &self.devices {
            writeln!(f, "    {}: {:.2} expected {:.2}", d.id, d.tracked, d.intrinsic)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> FlowSummary {
        FlowSummary {
            connections: vec![ConnectionFlow {
                from: "solar".into(),
                to: "home".into(),
                element_id: "line_solar_1".into(),
                value: 2.0,
            }],
            devices: vec![
                DeviceFlow { id: "solar".into(), intrinsic: 2.0, tracked: 2.0 },
                DeviceFlow { id: "home".into(), intrinsic: -3.0, tracked: -2.0 },
            ],
        }
    }

    #[test]
    fn test_unbalanced() {
        let s = summary();
        let off: Vec<_> = s.unbalanced(0.01).iter().map(|d| d.id.as_str()).collect();
        assert_eq!(off, vec!["home"]);
        assert_eq!(s.device("home").unwrap().residual(), -1.0);
    }

    #[test]
    fn test_display() {
        let text = summary().to_string();
        assert!(text.contains("from solar to home: 2.00"));
        assert!(text.contains("home: -2.00 expected -3.00"));
    }
}
