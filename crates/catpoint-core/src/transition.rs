//! The alarm state machine.
//!
//! A [`Transition`] works on an in-memory copy of the [`SystemState`] and
//! records, in order, every store write and every listener notification the
//! rules produce. Nothing leaves this module until the service commits the
//! writes, so a failing store never sees half an operation.

use tracing::debug;

use crate::{
    AlarmStatus, ArmingStatus, SecurityError, SecurityEvent, SecurityResult, SensorId,
    StoreWrite, SystemState,
};

/// Everything one engine operation decided.
#[derive(Debug, Default)]
pub(crate) struct Outcome {
    pub writes: Vec<StoreWrite>,
    pub events: Vec<SecurityEvent>,
    pub cat_detected: bool,
}

pub(crate) struct Transition {
    state: SystemState,
    cat_detected: bool,
    writes: Vec<StoreWrite>,
    events: Vec<SecurityEvent>,
}

impl Transition {
    pub fn new(state: SystemState, cat_detected: bool) -> Self {
        Self {
            state,
            cat_detected,
            writes: Vec::new(),
            events: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &SystemState {
        &self.state
    }

    pub fn finish(self) -> Outcome {
        Outcome {
            writes: self.writes,
            events: self.events,
            cat_detected: self.cat_detected,
        }
    }

    /// The only place the alarm status changes.
    pub fn set_alarm_status(&mut self, status: AlarmStatus) {
        debug!(from = %self.state.alarm_status, to = %status, "Alarm status set");
        self.state.alarm_status = status;
        self.writes.push(StoreWrite::AlarmStatus(status));
        self.events.push(SecurityEvent::AlarmStatusChanged(status));
    }

    pub fn set_arming_status(&mut self, mode: ArmingStatus) -> SecurityResult<()> {
        if self.cat_detected && mode == ArmingStatus::ArmedHome {
            self.set_alarm_status(AlarmStatus::Alarm);
        }

        if mode == ArmingStatus::Disarmed {
            self.set_alarm_status(AlarmStatus::NoAlarm);
        } else {
            // Runs against the previous arming mode, which is only replaced below
            for sensor_id in self.state.active_sensor_ids() {
                self.change_sensor_activation(&sensor_id, false)?;
            }
        }

        self.state.arming_status = mode;
        self.writes.push(StoreWrite::ArmingStatus(mode));
        self.events.push(SecurityEvent::SensorStatusChanged);
        Ok(())
    }

    pub fn change_sensor_activation(
        &mut self,
        sensor_id: &SensorId,
        active: bool,
    ) -> SecurityResult<()> {
        let was_active = self
            .state
            .sensors
            .get(sensor_id)
            .map(|s| s.is_active())
            .ok_or(SecurityError::UnknownSensor {
                sensor_id: *sensor_id,
            })?;

        let alarm_status = self.state.alarm_status;
        let arming_status = self.state.arming_status;

        if alarm_status != AlarmStatus::Alarm {
            if active {
                self.handle_sensor_activated();
            } else if was_active {
                self.handle_sensor_deactivated();
            }
        }

        if let Some(sensor) = self.state.sensors.get_mut(sensor_id) {
            sensor.set_active(active);
            self.writes.push(StoreWrite::UpsertSensor(sensor.clone()));
        }
        debug!(sensor_id = %sensor_id, was_active, active, "Sensor activation written");

        if arming_status.is_armed() && self.state.all_inactive() {
            self.set_alarm_status(AlarmStatus::NoAlarm);
        }

        Ok(())
    }

    pub fn process_cat_detection(&mut self, detected: bool) {
        self.cat_detected = detected;

        if detected && self.state.arming_status == ArmingStatus::ArmedHome {
            self.set_alarm_status(AlarmStatus::Alarm);
        } else if !detected && self.state.all_inactive() {
            self.set_alarm_status(AlarmStatus::NoAlarm);
        }

        self.events.push(SecurityEvent::CatDetected(detected));
    }

    /// Only reached while the alarm is not already full.
    fn handle_sensor_activated(&mut self) {
        if self.state.arming_status == ArmingStatus::Disarmed {
            return;
        }
        match self.state.alarm_status {
            AlarmStatus::NoAlarm => self.set_alarm_status(AlarmStatus::PendingAlarm),
            AlarmStatus::PendingAlarm | AlarmStatus::Alarm => {
                self.set_alarm_status(AlarmStatus::Alarm)
            }
        }
    }

    /// Only reached while the alarm is not already full and the sensor was active.
    fn handle_sensor_deactivated(&mut self) {
        match self.state.alarm_status {
            AlarmStatus::PendingAlarm => self.set_alarm_status(AlarmStatus::NoAlarm),
            // A deactivation without a pending alarm is treated as tampering.
            // Kept as-is pending product sign-off.
            AlarmStatus::NoAlarm | AlarmStatus::Alarm => self.set_alarm_status(AlarmStatus::Alarm),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Sensor, SensorType};

    fn state_with(
        sensors: Vec<(Sensor, bool)>,
        alarm: AlarmStatus,
        arming: ArmingStatus,
    ) -> SystemState {
        let sensors = sensors.into_iter().map(|(mut s, active)| {
            s.set_active(active);
            s
        });
        SystemState::new(sensors, alarm, arming)
    }

    fn alarm_events(outcome: &Outcome) -> Vec<AlarmStatus> {
        outcome
            .events
            .iter()
            .filter_map(|e| match e {
                SecurityEvent::AlarmStatusChanged(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_activation_escalates_when_armed() {
        let sensor = Sensor::new("Door", SensorType::Door);
        let id = sensor.id;
        let state = state_with(vec![(sensor, false)], AlarmStatus::NoAlarm, ArmingStatus::ArmedAway);

        let mut tx = Transition::new(state, false);
        tx.change_sensor_activation(&id, true).unwrap();
        assert_eq!(tx.state().alarm_status, AlarmStatus::PendingAlarm);

        let outcome = tx.finish();
        assert_eq!(alarm_events(&outcome), vec![AlarmStatus::PendingAlarm]);
        assert!(matches!(outcome.writes.last(), Some(StoreWrite::UpsertSensor(s)) if s.is_active()));
    }

    #[test]
    fn test_activation_ignored_when_disarmed() {
        let sensor = Sensor::new("Door", SensorType::Door);
        let id = sensor.id;
        let state = state_with(vec![(sensor, false)], AlarmStatus::NoAlarm, ArmingStatus::Disarmed);

        let mut tx = Transition::new(state, false);
        tx.change_sensor_activation(&id, true).unwrap();

        let outcome = tx.finish();
        assert!(alarm_events(&outcome).is_empty());
        assert_eq!(outcome.writes.len(), 1);
    }

    #[test]
    fn test_deactivating_inactive_sensor_changes_nothing_but_flag() {
        let a = Sensor::new("A", SensorType::Door);
        let b = Sensor::new("B", SensorType::Window);
        let id = a.id;
        let state = state_with(
            vec![(a, false), (b, true)],
            AlarmStatus::NoAlarm,
            ArmingStatus::ArmedAway,
        );

        let mut tx = Transition::new(state, false);
        tx.change_sensor_activation(&id, false).unwrap();
        assert_eq!(tx.state().alarm_status, AlarmStatus::NoAlarm);
        assert!(alarm_events(&tx.finish()).is_empty());
    }

    #[test]
    fn test_unknown_sensor_is_rejected_without_writes() {
        let mut tx = Transition::new(SystemState::default(), false);
        let missing = SensorId::generate();

        let err = tx.change_sensor_activation(&missing, true).unwrap_err();
        assert_eq!(err, SecurityError::UnknownSensor { sensor_id: missing });
        assert!(tx.finish().writes.is_empty());
    }

    #[test]
    fn test_arming_deactivates_with_previous_mode() {
        // Disarmed with a tripped sensor: arming deactivates it while the
        // stored mode is still Disarmed, so the all-inactive reset does not
        // apply and the deactivation rule raises the alarm.
        let sensor = Sensor::new("Window", SensorType::Window);
        let state = state_with(vec![(sensor, true)], AlarmStatus::NoAlarm, ArmingStatus::Disarmed);

        let mut tx = Transition::new(state, false);
        tx.set_arming_status(ArmingStatus::ArmedAway).unwrap();

        assert_eq!(tx.state().alarm_status, AlarmStatus::Alarm);
        assert_eq!(tx.state().arming_status, ArmingStatus::ArmedAway);
        assert!(tx.state().all_inactive());

        let outcome = tx.finish();
        assert_eq!(outcome.events.last(), Some(&SecurityEvent::SensorStatusChanged));
        assert_eq!(
            outcome.writes.last(),
            Some(&StoreWrite::ArmingStatus(ArmingStatus::ArmedAway))
        );
    }

    #[test]
    fn test_cat_detection_sets_flag_and_notifies_last() {
        let state = state_with(vec![], AlarmStatus::NoAlarm, ArmingStatus::ArmedHome);
        let mut tx = Transition::new(state, false);
        tx.process_cat_detection(true);

        let outcome = tx.finish();
        assert!(outcome.cat_detected);
        assert_eq!(
            outcome.events,
            vec![
                SecurityEvent::AlarmStatusChanged(AlarmStatus::Alarm),
                SecurityEvent::CatDetected(true),
            ]
        );
    }
}
