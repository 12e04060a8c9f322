//! Notifications emitted by the engine.

use crate::AlarmStatus;

/// One observer notification, in the order the engine produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    /// The alarm status was written (possibly to the same value).
    AlarmStatusChanged(AlarmStatus),

    /// An image was processed; carries whether a cat was seen.
    CatDetected(bool),

    /// Sensors changed in bulk. Carries no payload: re-query the sensors.
    SensorStatusChanged,
}
