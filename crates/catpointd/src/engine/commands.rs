//! Commands accepted by the engine actor, and the errors it returns.

use tokio::sync::{broadcast, oneshot};
use tracing::trace;

use catpoint_core::{
    AlarmStatus, ArmingStatus, ListenerError, SecurityError, SecurityEvent, SecuritySnapshot,
    Sensor, SensorId, SensorType, StatusListener,
};
use thiserror::Error;

// ============================================================================
// Commands
// ============================================================================

/// Commands sent to the [`EngineActor`](super::EngineActor).
///
/// Every command carries a oneshot `respond_to` channel. The actor replies
/// after the operation has been committed and listeners notified.
#[derive(Debug)]
pub enum EngineCommand {
    SetArmingStatus {
        mode: ArmingStatus,
        respond_to: oneshot::Sender<Result<(), EngineError>>,
    },

    SetSensorActive {
        sensor_id: SensorId,
        active: bool,
        respond_to: oneshot::Sender<Result<(), EngineError>>,
    },

    /// Result of a classification performed off the actor.
    ApplyCatDetection {
        detected: bool,
        respond_to: oneshot::Sender<Result<(), EngineError>>,
    },

    SetAlarmStatus {
        status: AlarmStatus,
        respond_to: oneshot::Sender<Result<(), EngineError>>,
    },

    AddSensor {
        name: String,
        sensor_type: SensorType,
        respond_to: oneshot::Sender<Result<Sensor, EngineError>>,
    },

    RemoveSensor {
        sensor_id: SensorId,
        respond_to: oneshot::Sender<Result<Sensor, EngineError>>,
    },

    GetSnapshot {
        respond_to: oneshot::Sender<Result<SecuritySnapshot, EngineError>>,
    },
}

// ============================================================================
// Errors
// ============================================================================

/// Errors returned through an [`EngineHandle`](super::EngineHandle).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The engine rejected or failed the operation.
    #[error(transparent)]
    Security(#[from] SecurityError),

    /// The actor has shut down.
    #[error("engine channel closed")]
    ChannelClosed,
}

// ============================================================================
// Broadcast bridge
// ============================================================================

/// Forwards engine notifications onto a tokio broadcast channel.
///
/// Having no subscribers is not a failure.
pub struct BroadcastListener {
    sender: broadcast::Sender<SecurityEvent>,
}

impl BroadcastListener {
    pub fn new(sender: broadcast::Sender<SecurityEvent>) -> Self {
        Self { sender }
    }

    fn forward(&self, event: SecurityEvent) -> Result<(), ListenerError> {
        if self.sender.send(event).is_err() {
            trace!(?event, "No subscribers for event");
        }
        Ok(())
    }
}

impl StatusListener for BroadcastListener {
    fn alarm_status_changed(&self, status: AlarmStatus) -> Result<(), ListenerError> {
        self.forward(SecurityEvent::AlarmStatusChanged(status))
    }

    fn cat_detected(&self, detected: bool) -> Result<(), ListenerError> {
        self.forward(SecurityEvent::CatDetected(detected))
    }

    fn sensor_status_changed(&self) -> Result<(), ListenerError> {
        self.forward(SecurityEvent::SensorStatusChanged)
    }
}
