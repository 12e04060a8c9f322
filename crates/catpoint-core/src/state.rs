//! Snapshot of the persisted system state.

use std::collections::BTreeMap;

use crate::{AlarmStatus, ArmingStatus, Sensor, SensorId};

/// Everything the store persists: the sensor set and the two statuses.
///
/// Sensors are unique by id. The engine reads one of these at the start of
/// every operation and works on it in memory until the writes are committed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemState {
    pub sensors: BTreeMap<SensorId, Sensor>,
    pub alarm_status: AlarmStatus,
    pub arming_status: ArmingStatus,
}

impl SystemState {
    /// Builds a state from a sensor list; later duplicates of an id win.
    pub fn new(
        sensors: impl IntoIterator<Item = Sensor>,
        alarm_status: AlarmStatus,
        arming_status: ArmingStatus,
    ) -> Self {
        Self {
            sensors: sensors.into_iter().map(|s| (s.id, s)).collect(),
            alarm_status,
            arming_status,
        }
    }

    /// True when no sensor is active. Vacuously true with no sensors.
    #[must_use]
    pub fn all_inactive(&self) -> bool {
        self.sensors.values().all(|s| !s.is_active())
    }

    /// Ids of the sensors that are currently active, in id order.
    pub fn active_sensor_ids(&self) -> Vec<SensorId> {
        self.sensors
            .values()
            .filter(|s| s.is_active())
            .map(|s| s.id)
            .collect()
    }

    /// Sensors in display order (name, type, id).
    pub fn sorted_sensors(&self) -> Vec<Sensor> {
        let mut sensors: Vec<Sensor> = self.sensors.values().cloned().collect();
        sensors.sort();
        sensors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SensorType;

    #[test]
    fn test_empty_state_is_all_inactive() {
        let state = SystemState::default();
        assert!(state.all_inactive());
        assert!(state.active_sensor_ids().is_empty());
    }

    #[test]
    fn test_active_sensor_ids() {
        let idle = Sensor::new("Hall", SensorType::Motion);
        let mut tripped = Sensor::new("Door", SensorType::Door);
        tripped.set_active(true);
        let tripped_id = tripped.id;

        let state = SystemState::new(
            vec![idle, tripped],
            AlarmStatus::NoAlarm,
            ArmingStatus::Disarmed,
        );
        assert!(!state.all_inactive());
        assert_eq!(state.active_sensor_ids(), vec![tripped_id]);
    }

    #[test]
    fn test_sorted_sensors_uses_display_order() {
        let state = SystemState::new(
            vec![
                Sensor::new("Zeta", SensorType::Door),
                Sensor::new("Alpha", SensorType::Door),
            ],
            AlarmStatus::NoAlarm,
            ArmingStatus::Disarmed,
        );
        let names: Vec<_> = state.sorted_sensors().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }
}
