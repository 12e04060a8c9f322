//! Sensor entity and its identifier.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Unique identifier for a sensor.
///
/// Opaque and totally ordered. Generated once when the sensor is created
/// and never reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorId(Uuid);

impl SensorId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns a shortened display form (first 8 hex characters).
    #[must_use]
    pub fn short(&self) -> String {
        let mut s = self.0.simple().to_string();
        s.truncate(8);
        s
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SensorId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ============================================================================
// Sensor Type
// ============================================================================

/// Kind of physical device a sensor represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorType {
    Door,
    Window,
    Motion,
}

impl SensorType {
    /// Returns the stable name, also used as the sort key for sensors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Door => "DOOR",
            Self::Window => "WINDOW",
            Self::Motion => "MOTION",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Sensor
// ============================================================================

/// A binary-state input device (door, window or motion detector).
///
/// Two sensors are equal when their ids match, whatever their name, type or
/// activation. Sensors sort by `(name, type name, id)` for stable display.
///
/// The activation flag can only be changed from inside this crate: callers
/// go through [`SecurityService::set_sensor_active`](crate::SecurityService::set_sensor_active)
/// so that every change runs the alarm rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sensor {
    pub id: SensorId,
    pub name: String,
    pub sensor_type: SensorType,
    active: bool,
}

impl Sensor {
    /// Creates an inactive sensor with a fresh id.
    pub fn new(name: impl Into<String>, sensor_type: SensorType) -> Self {
        Self::with_id(SensorId::generate(), name, sensor_type)
    }

    /// Creates an inactive sensor with a known id.
    pub fn with_id(id: SensorId, name: impl Into<String>, sensor_type: SensorType) -> Self {
        Self {
            id,
            name: name.into(),
            sensor_type,
            active: false,
        }
    }

    /// Whether the sensor currently reports activity.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

impl PartialEq for Sensor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Sensor {}

impl Hash for Sensor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Ord for Sensor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.sensor_type.as_str().cmp(other.sensor_type.as_str()))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Sensor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn id(n: u128) -> SensorId {
        SensorId::from_uuid(Uuid::from_u128(n))
    }

    #[test]
    fn test_new_sensor_is_inactive() {
        let sensor = Sensor::new("Front door", SensorType::Door);
        assert!(!sensor.is_active());
        assert_eq!(sensor.name, "Front door");
    }

    #[test]
    fn test_equality_is_by_id_only() {
        let a = Sensor::with_id(id(1), "Front door", SensorType::Door);
        let mut b = Sensor::with_id(id(1), "Renamed", SensorType::Motion);
        b.set_active(true);
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(!set.insert(b));
    }

    #[test]
    fn test_ordering_name_then_type_then_id() {
        let mut sensors = vec![
            Sensor::with_id(id(3), "Kitchen", SensorType::Window),
            Sensor::with_id(id(2), "Kitchen", SensorType::Door),
            Sensor::with_id(id(1), "Attic", SensorType::Motion),
            Sensor::with_id(id(0), "Kitchen", SensorType::Window),
        ];
        sensors.sort();

        let order: Vec<_> = sensors.iter().map(|s| s.id).collect();
        assert_eq!(order, vec![id(1), id(2), id(0), id(3)]);
    }

    #[test]
    fn test_type_order_uses_type_name() {
        // "MOTION" sorts before "WINDOW" even though Window is declared first
        let motion = Sensor::with_id(id(9), "Hall", SensorType::Motion);
        let window = Sensor::with_id(id(1), "Hall", SensorType::Window);
        assert!(motion < window);
    }

    #[test]
    fn test_sensor_id_parse_and_short() {
        let text = "8e11bfb5-7dc2-432b-9206-928fa5c35731";
        let parsed: SensorId = text.parse().unwrap();
        assert_eq!(parsed.to_string(), text);
        assert_eq!(parsed.short(), "8e11bfb5");
        assert!("not-a-uuid".parse::<SensorId>().is_err());
    }

    #[test]
    fn test_sensor_serde_round_trip_keeps_activation() {
        let mut sensor = Sensor::with_id(id(7), "Garage", SensorType::Door);
        sensor.set_active(true);
        let json = serde_json::to_string(&sensor).unwrap();
        assert!(json.contains("\"sensor_type\":\"DOOR\""));

        let back: Sensor = serde_json::from_str(&json).unwrap();
        assert!(back.is_active());
        assert_eq!(back.name, "Garage");
    }
}
