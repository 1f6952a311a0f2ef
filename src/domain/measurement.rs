use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumString};

/// Sentinel states a sensor reports instead of a number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SensorStatus {
    Unavailable,
    Unknown,
}

/// Interpreted state of a single entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Value(f64),
    Status(SensorStatus),
    /// Entity is not present in the snapshot at all
    Missing,
}

impl Reading {
    /// Numeric value, or `None` for sentinel and missing readings
    pub fn value(&self) -> Option<f64> {
        match self {
            Reading::Value(v) => Some(*v),
            _ => None,
        }
    }
}

/// Raw entity state as reported by the home automation host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityState {
    pub state: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl EntityState {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            unit_of_measurement: None,
            last_updated: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit_of_measurement = Some(unit.into());
        self
    }

    /// Parse the raw state string.
    ///
    /// Anything that is neither a sentinel nor a finite number is reported as
    /// `Unknown`, so a garbled sensor contributes nothing instead of NaN.
    /// [`MeasurementSnapshot::unparsable`] lists such entities.
    pub fn reading(&self) -> Reading {
        let raw = self.state.trim();
        if let Ok(status) = raw.parse::<SensorStatus>() {
            return Reading::Status(status);
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Reading::Value(v),
            _ => Reading::Status(SensorStatus::Unknown),
        }
    }

    /// Multiplier that brings the reading to kW / kWh
    pub fn unit_factor(&self) -> f64 {
        match self.unit_of_measurement.as_deref() {
            Some("W") | Some("Wh") => 0.001,
            _ => 1.0,
        }
    }
}

/// Read-only view of every entity state for one calculation cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasurementSnapshot {
    states: HashMap<String, EntityState>,
}

impl MeasurementSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: impl Into<String>, state: EntityState) {
        self.states.insert(entity.into(), state);
    }

    /// Builder form of [`insert`](Self::insert), handy for fixtures
    pub fn with(mut self, entity: impl Into<String>, state: EntityState) -> Self {
        self.insert(entity, state);
        self
    }

    pub fn get(&self, entity: &str) -> Option<&EntityState> {
        self.states.get(entity)
    }

    pub fn reading(&self, entity: &str) -> Reading {
        self.states
            .get(entity)
            .map(EntityState::reading)
            .unwrap_or(Reading::Missing)
    }

    /// Unit-normalized value in kW (or kWh), `None` when the sensor has no number
    pub fn value_kw(&self, entity: &str) -> Option<f64> {
        let state = self.states.get(entity)?;
        state.reading().value().map(|v| v * state.unit_factor())
    }

    /// Sum of normalized values; absent sensors contribute zero
    pub fn sum_kw<S: AsRef<str>>(&self, entities: &[S]) -> f64 {
        entities
            .iter()
            .filter_map(|e| self.value_kw(e.as_ref()))
            .sum()
    }

    /// Entities whose state is neither a sentinel nor a number, sorted
    pub fn unparsable(&self) -> Vec<&str> {
        let mut entities: Vec<&str> = self
            .states
            .iter()
            .filter(|(_, s)| {
                let raw = s.state.trim();
                raw.parse::<SensorStatus>().is_err()
                    && !raw.parse::<f64>().map(f64::is_finite).unwrap_or(false)
            })
            .map(|(e, _)| e.as_str())
            .collect();
        entities.sort_unstable();
        entities
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl FromIterator<(String, EntityState)> for MeasurementSnapshot {
    fn from_iter<T: IntoIterator<Item = (String, EntityState)>>(iter: T) -> Self {
        Self {
            states: iter.into_iter().collect(),
        }
    }
}
