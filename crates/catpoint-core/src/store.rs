//! Sensor store port and an in-memory implementation.
//!
//! ```text
//!   SecurityService ──▶ SensorStore ──▶ JSON file / key-value store / memory
//! ```
//!
//! The store owns the durable [`SystemState`]. The engine only reads it
//! through [`SensorStore::snapshot`] and only writes it through
//! [`SensorStore::apply`], one batch per engine operation.

use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::{AlarmStatus, ArmingStatus, Sensor, SensorId, SystemState};

/// A single persisted change produced by an engine operation.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    /// Insert the sensor, replacing any sensor with the same id.
    UpsertSensor(Sensor),
    /// Remove the sensor with this id (no-op if absent).
    RemoveSensor(SensorId),
    /// Replace the alarm status.
    AlarmStatus(AlarmStatus),
    /// Replace the arming status.
    ArmingStatus(ArmingStatus),
}

/// Durable mapping of sensor ids to sensors plus the two current statuses.
///
/// # Atomicity
///
/// The engine hands every operation's writes to [`apply`](Self::apply) in a
/// single call. The default implementation applies them one by one, which is
/// only atomic for stores that cannot fail part-way. Stores backed by real
/// I/O must override `apply` so that either every write lands or none does.
pub trait SensorStore {
    /// Adds a sensor. A sensor with the same id is left untouched.
    fn add_sensor(&mut self, sensor: Sensor) -> Result<(), StoreError>;

    /// Removes a sensor. Removing an unknown id is not an error.
    fn remove_sensor(&mut self, sensor_id: &SensorId) -> Result<(), StoreError>;

    /// Inserts or replaces a sensor by id.
    fn update_sensor(&mut self, sensor: Sensor) -> Result<(), StoreError>;

    /// All sensors in display order.
    fn sensors(&self) -> Result<Vec<Sensor>, StoreError>;

    fn alarm_status(&self) -> Result<AlarmStatus, StoreError>;

    fn set_alarm_status(&mut self, status: AlarmStatus) -> Result<(), StoreError>;

    fn arming_status(&self) -> Result<ArmingStatus, StoreError>;

    fn set_arming_status(&mut self, status: ArmingStatus) -> Result<(), StoreError>;

    /// Reads the whole state in one go.
    fn snapshot(&self) -> Result<SystemState, StoreError> {
        Ok(SystemState::new(
            self.sensors()?,
            self.alarm_status()?,
            self.arming_status()?,
        ))
    }

    /// Applies a batch of writes in order.
    fn apply(&mut self, writes: &[StoreWrite]) -> Result<(), StoreError> {
        for write in writes {
            match write {
                StoreWrite::UpsertSensor(sensor) => self.update_sensor(sensor.clone())?,
                StoreWrite::RemoveSensor(id) => self.remove_sensor(id)?,
                StoreWrite::AlarmStatus(status) => self.set_alarm_status(*status)?,
                StoreWrite::ArmingStatus(status) => self.set_arming_status(*status)?,
            }
        }
        Ok(())
    }
}

impl<T: SensorStore + ?Sized> SensorStore for Box<T> {
    fn add_sensor(&mut self, sensor: Sensor) -> Result<(), StoreError> {
        (**self).add_sensor(sensor)
    }

    fn remove_sensor(&mut self, sensor_id: &SensorId) -> Result<(), StoreError> {
        (**self).remove_sensor(sensor_id)
    }

    fn update_sensor(&mut self, sensor: Sensor) -> Result<(), StoreError> {
        (**self).update_sensor(sensor)
    }

    fn sensors(&self) -> Result<Vec<Sensor>, StoreError> {
        (**self).sensors()
    }

    fn alarm_status(&self) -> Result<AlarmStatus, StoreError> {
        (**self).alarm_status()
    }

    fn set_alarm_status(&mut self, status: AlarmStatus) -> Result<(), StoreError> {
        (**self).set_alarm_status(status)
    }

    fn arming_status(&self) -> Result<ArmingStatus, StoreError> {
        (**self).arming_status()
    }

    fn set_arming_status(&mut self, status: ArmingStatus) -> Result<(), StoreError> {
        (**self).set_arming_status(status)
    }

    fn snapshot(&self) -> Result<SystemState, StoreError> {
        (**self).snapshot()
    }

    fn apply(&mut self, writes: &[StoreWrite]) -> Result<(), StoreError> {
        (**self).apply(writes)
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Non-durable store holding the state in process memory.
///
/// Infallible, so the default sequential `apply` is already atomic.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: SystemState,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing state (e.g. one loaded elsewhere).
    pub fn with_state(state: SystemState) -> Self {
        Self { state }
    }

    /// Direct read access for callers that own the store.
    pub fn state(&self) -> &SystemState {
        &self.state
    }

    /// Number of sensors stored.
    pub fn len(&self) -> usize {
        self.state.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.sensors.is_empty()
    }
}

impl SensorStore for MemoryStore {
    fn add_sensor(&mut self, sensor: Sensor) -> Result<(), StoreError> {
        self.state.sensors.entry(sensor.id).or_insert(sensor);
        Ok(())
    }

    fn remove_sensor(&mut self, sensor_id: &SensorId) -> Result<(), StoreError> {
        self.state.sensors.remove(sensor_id);
        Ok(())
    }

    fn update_sensor(&mut self, sensor: Sensor) -> Result<(), StoreError> {
        self.state.sensors.insert(sensor.id, sensor);
        Ok(())
    }

    fn sensors(&self) -> Result<Vec<Sensor>, StoreError> {
        Ok(self.state.sorted_sensors())
    }

    fn alarm_status(&self) -> Result<AlarmStatus, StoreError> {
        Ok(self.state.alarm_status)
    }

    fn set_alarm_status(&mut self, status: AlarmStatus) -> Result<(), StoreError> {
        self.state.alarm_status = status;
        Ok(())
    }

    fn arming_status(&self) -> Result<ArmingStatus, StoreError> {
        Ok(self.state.arming_status)
    }

    fn set_arming_status(&mut self, status: ArmingStatus) -> Result<(), StoreError> {
        self.state.arming_status = status;
        Ok(())
    }

    fn snapshot(&self) -> Result<SystemState, StoreError> {
        Ok(self.state.clone())
    }
}

impl From<BTreeMap<SensorId, Sensor>> for MemoryStore {
    fn from(sensors: BTreeMap<SensorId, Sensor>) -> Self {
        Self::with_state(SystemState {
            sensors,
            ..SystemState::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SensorType;

    #[test]
    fn test_add_keeps_existing_sensor() {
        let mut store = MemoryStore::new();
        let original = Sensor::new("Front door", SensorType::Door);
        let id = original.id;
        store.add_sensor(original).unwrap();

        let duplicate = Sensor::with_id(id, "Other name", SensorType::Window);
        store.add_sensor(duplicate).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.sensors().unwrap()[0].name, "Front door");
    }

    #[test]
    fn test_update_replaces_by_id() {
        let mut store = MemoryStore::new();
        let sensor = Sensor::new("Front door", SensorType::Door);
        let id = sensor.id;
        store.add_sensor(sensor).unwrap();

        store
            .update_sensor(Sensor::with_id(id, "Back door", SensorType::Door))
            .unwrap();

        let sensors = store.sensors().unwrap();
        assert_eq!(sensors.len(), 1);
        assert_eq!(sensors[0].name, "Back door");
    }

    #[test]
    fn test_remove_unknown_is_ok() {
        let mut store = MemoryStore::new();
        assert!(store.remove_sensor(&SensorId::generate()).is_ok());
        assert!(store.is_empty());
    }

    #[test]
    fn test_apply_batch() {
        let mut store = MemoryStore::new();
        let sensor = Sensor::new("Hall", SensorType::Motion);
        let id = sensor.id;

        store
            .apply(&[
                StoreWrite::UpsertSensor(sensor),
                StoreWrite::AlarmStatus(AlarmStatus::PendingAlarm),
                StoreWrite::ArmingStatus(ArmingStatus::ArmedAway),
            ])
            .unwrap();

        let snapshot = store.snapshot().unwrap();
        assert!(snapshot.sensors.contains_key(&id));
        assert_eq!(snapshot.alarm_status, AlarmStatus::PendingAlarm);
        assert_eq!(snapshot.arming_status, ArmingStatus::ArmedAway);

        store.apply(&[StoreWrite::RemoveSensor(id)]).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_boxed_store_delegates() {
        let mut store: Box<dyn SensorStore> = Box::new(MemoryStore::new());
        store.set_arming_status(ArmingStatus::ArmedHome).unwrap();
        assert_eq!(store.arming_status().unwrap(), ArmingStatus::ArmedHome);
        assert_eq!(store.snapshot().unwrap().arming_status, ArmingStatus::ArmedHome);
    }
}
