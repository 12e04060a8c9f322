//! Security service - the decision engine.
//!
//! [`SecurityService`] owns the store handle, the classifier, the listener
//! registry and the transient cat-detection flag. Every mutating operation
//! follows the same shape:
//!
//! ```text
//!   store.snapshot() ──▶ Transition (pure rules) ──▶ store.apply(writes)
//!                                                        │
//!                                     cat flag + listeners ◀┘ (only on success)
//! ```
//!
//! The service is synchronous and expects one caller at a time. To share it
//! between tasks, give it a single owner (see the `catpointd` engine actor).

use std::sync::Arc;

use tracing::{debug, info};

use crate::transition::{Outcome, Transition};
use crate::{
    AlarmStatus, ArmingStatus, CatClassifier, ListenerId, ListenerRegistry, SecurityError,
    SecurityResult, Sensor, SensorId, SensorStore, SensorType, StatusListener, StoreWrite,
    CAT_CONFIDENCE_THRESHOLD,
};

/// Point-in-time view of the whole engine state.
#[derive(Debug, Clone, PartialEq)]
pub struct SecuritySnapshot {
    pub alarm_status: AlarmStatus,
    pub arming_status: ArmingStatus,
    pub cat_detected: bool,
    /// Sensors in display order.
    pub sensors: Vec<Sensor>,
}

impl SecuritySnapshot {
    pub fn active_sensor_count(&self) -> usize {
        self.sensors.iter().filter(|s| s.is_active()).count()
    }
}

/// The alarm decision engine.
pub struct SecurityService<S, C> {
    store: S,
    classifier: C,
    listeners: ListenerRegistry,
    cat_detected: bool,
}

impl<S: SensorStore, C: CatClassifier> SecurityService<S, C> {
    /// Creates the engine over an initialised store.
    ///
    /// The starting state is whatever the store holds; no cat has been seen.
    pub fn new(store: S, classifier: C) -> Self {
        Self {
            store,
            classifier,
            listeners: ListenerRegistry::new(),
            cat_detected: false,
        }
    }

    // ── Listeners ─────────────────────────────────────────────

    /// Registers a listener. Registering the same `Arc` twice is a no-op.
    pub fn add_status_listener(&mut self, listener: Arc<dyn StatusListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Unregisters a listener. Returns `false` if it was not registered.
    pub fn remove_status_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    // ── Operations ────────────────────────────────────────────

    /// Changes the arming mode.
    ///
    /// A cat already in view escalates straight to `Alarm` when arming at
    /// home. Disarming clears the alarm. Arming deactivates every active
    /// sensor first, then stores the mode and sends one bulk
    /// `sensor_status_changed`.
    pub fn set_arming_status(&mut self, mode: ArmingStatus) -> SecurityResult<()> {
        info!(mode = %mode, "Arming status requested");
        self.run(|tx| tx.set_arming_status(mode))
    }

    /// Reports a sensor as active or inactive.
    ///
    /// # Errors
    ///
    /// - `SecurityError::UnknownSensor` if the store has no sensor with this id
    /// - `SecurityError::StoreUnavailable` if the store cannot be read or written
    pub fn set_sensor_active(&mut self, sensor_id: &SensorId, active: bool) -> SecurityResult<()> {
        debug!(sensor_id = %sensor_id, active, "Sensor activation requested");
        self.run(|tx| tx.change_sensor_activation(sensor_id, active))
    }

    /// Runs the image through the classifier and applies the result.
    ///
    /// Returns whether a cat was detected.
    ///
    /// # Errors
    ///
    /// - `SecurityError::ClassifierUnavailable` if the classifier fails; the
    ///   cat flag and the alarm are left untouched
    /// - `SecurityError::StoreUnavailable` if the store cannot be read or written
    pub fn submit_image(&mut self, image: &[u8]) -> SecurityResult<bool> {
        let detected = self
            .classifier
            .contains_cat(image, CAT_CONFIDENCE_THRESHOLD)?;
        self.process_cat_detection(detected)?;
        Ok(detected)
    }

    /// Applies a classification made elsewhere (e.g. off the owning task).
    pub fn process_cat_detection(&mut self, detected: bool) -> SecurityResult<()> {
        info!(detected, "Cat detection result");
        self.run(|tx| {
            tx.process_cat_detection(detected);
            Ok(())
        })
    }

    /// Writes the alarm status and notifies every listener.
    pub fn set_alarm_status(&mut self, status: AlarmStatus) -> SecurityResult<()> {
        self.run(|tx| {
            tx.set_alarm_status(status);
            Ok(())
        })
    }

    /// Creates and stores a new, inactive sensor.
    pub fn add_sensor(
        &mut self,
        name: impl Into<String>,
        sensor_type: SensorType,
    ) -> SecurityResult<Sensor> {
        let sensor = Sensor::new(name, sensor_type);
        self.store.add_sensor(sensor.clone())?;
        info!(sensor_id = %sensor.id, name = %sensor.name, "Sensor added");
        self.notify_sensors_changed();
        Ok(sensor)
    }

    /// Removes a sensor. The alarm status is not re-evaluated.
    ///
    /// # Errors
    ///
    /// - `SecurityError::UnknownSensor` if the store has no sensor with this id
    pub fn remove_sensor(&mut self, sensor_id: &SensorId) -> SecurityResult<Sensor> {
        let state = self.store.snapshot()?;
        let sensor = state
            .sensors
            .get(sensor_id)
            .cloned()
            .ok_or(SecurityError::UnknownSensor {
                sensor_id: *sensor_id,
            })?;

        self.store.apply(&[StoreWrite::RemoveSensor(*sensor_id)])?;
        info!(sensor_id = %sensor_id, name = %sensor.name, "Sensor removed");
        self.notify_sensors_changed();
        Ok(sensor)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn alarm_status(&self) -> SecurityResult<AlarmStatus> {
        Ok(self.store.alarm_status()?)
    }

    pub fn arming_status(&self) -> SecurityResult<ArmingStatus> {
        Ok(self.store.arming_status()?)
    }

    /// All sensors in display order.
    pub fn sensors(&self) -> SecurityResult<Vec<Sensor>> {
        Ok(self.store.sensors()?)
    }

    /// Whether the most recently processed image contained a cat.
    pub fn cat_detected(&self) -> bool {
        self.cat_detected
    }

    pub fn snapshot(&self) -> SecurityResult<SecuritySnapshot> {
        let state = self.store.snapshot()?;
        Ok(SecuritySnapshot {
            alarm_status: state.alarm_status,
            arming_status: state.arming_status,
            cat_detected: self.cat_detected,
            sensors: state.sorted_sensors(),
        })
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consumes the engine and hands the store back.
    pub fn into_store(self) -> S {
        self.store
    }

    // ── Internal ──────────────────────────────────────────────

    /// Loads the state, runs the rules, commits, then notifies.
    fn run<F>(&mut self, rules: F) -> SecurityResult<()>
    where
        F: FnOnce(&mut Transition) -> SecurityResult<()>,
    {
        let state = self.store.snapshot()?;
        let mut tx = Transition::new(state, self.cat_detected);
        rules(&mut tx)?;

        let Outcome {
            writes,
            events,
            cat_detected,
        } = tx.finish();

        self.store.apply(&writes)?;
        self.cat_detected = cat_detected;

        for event in &events {
            self.listeners.broadcast(event);
        }
        Ok(())
    }

    fn notify_sensors_changed(&self) {
        self.listeners
            .broadcast(&crate::SecurityEvent::SensorStatusChanged);
    }
}

impl<S, C> std::fmt::Debug for SecurityService<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityService")
            .field("listeners", &self.listeners)
            .field("cat_detected", &self.cat_detected)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClassifierError, MemoryStore};

    struct NoCat;

    impl CatClassifier for NoCat {
        fn contains_cat(&self, _image: &[u8], threshold: f32) -> Result<bool, ClassifierError> {
            assert_eq!(threshold, CAT_CONFIDENCE_THRESHOLD);
            Ok(false)
        }
    }

    fn service() -> SecurityService<MemoryStore, NoCat> {
        SecurityService::new(MemoryStore::new(), NoCat)
    }

    #[test]
    fn test_initial_state_defaults() {
        let service = service();
        let snapshot = service.snapshot().unwrap();
        assert_eq!(snapshot.alarm_status, AlarmStatus::NoAlarm);
        assert_eq!(snapshot.arming_status, ArmingStatus::Disarmed);
        assert!(!snapshot.cat_detected);
        assert!(snapshot.sensors.is_empty());
    }

    #[test]
    fn test_add_and_remove_sensor() {
        let mut service = service();
        let sensor = service.add_sensor("Front door", SensorType::Door).unwrap();
        assert!(!sensor.is_active());
        assert_eq!(service.sensors().unwrap().len(), 1);

        let removed = service.remove_sensor(&sensor.id).unwrap();
        assert_eq!(removed.id, sensor.id);
        assert!(service.sensors().unwrap().is_empty());
    }

    #[test]
    fn test_remove_unknown_sensor() {
        let mut service = service();
        let missing = SensorId::generate();
        let err = service.remove_sensor(&missing).unwrap_err();
        assert_eq!(err, SecurityError::UnknownSensor { sensor_id: missing });
    }

    #[test]
    fn test_submit_image_uses_fixed_threshold() {
        let mut service = service();
        assert!(!service.submit_image(&[1, 2, 3]).unwrap());
        assert!(!service.cat_detected());
    }

    #[test]
    fn test_snapshot_counts_active_sensors() {
        let mut service = service();
        let a = service.add_sensor("A", SensorType::Door).unwrap();
        service.add_sensor("B", SensorType::Motion).unwrap();
        service.set_sensor_active(&a.id, true).unwrap();

        assert_eq!(service.snapshot().unwrap().active_sensor_count(), 1);
    }
}
