//! Alarm and arming status values.
//!
//! These are the pure state values the engine reasons about. Descriptions
//! and colours shown to a user belong to the front end, not here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Escalation level of the alarm.
///
/// Ordered by severity (`NoAlarm < PendingAlarm < Alarm`). The engine never
/// compares levels numerically; every change follows an explicit transition.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmStatus {
    /// Nothing is wrong.
    #[default]
    NoAlarm,
    /// A sensor tripped while armed; one more event escalates to [`Alarm`](Self::Alarm).
    PendingAlarm,
    /// Full alarm.
    Alarm,
}

impl AlarmStatus {
    /// Returns the stable identifier used in logs and persisted state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoAlarm => "NO_ALARM",
            Self::PendingAlarm => "PENDING_ALARM",
            Self::Alarm => "ALARM",
        }
    }
}

impl fmt::Display for AlarmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operating posture of the security system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArmingStatus {
    #[default]
    Disarmed,
    ArmedHome,
    ArmedAway,
}

impl ArmingStatus {
    /// True for both armed modes.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        matches!(self, Self::ArmedHome | Self::ArmedAway)
    }

    /// Returns the stable identifier used in logs and persisted state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disarmed => "DISARMED",
            Self::ArmedHome => "ARMED_HOME",
            Self::ArmedAway => "ARMED_AWAY",
        }
    }
}

impl fmt::Display for ArmingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
