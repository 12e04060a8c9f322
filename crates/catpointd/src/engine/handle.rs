//! Client interface for the engine actor.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()` outside tests
//! - Channel errors are mapped to `EngineError::ChannelClosed`

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{info, warn};

use catpoint_core::{
    AlarmStatus, ArmingStatus, SecurityError, SecurityEvent, SecuritySnapshot, Sensor, SensorId,
    SensorType, CAT_CONFIDENCE_THRESHOLD,
};

use super::actor::SharedClassifier;
use super::commands::{EngineCommand, EngineError};

// ============================================================================
// Classifier Policy
// ============================================================================

/// How [`EngineHandle::submit_image`] treats a slow or failing classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierPolicy {
    /// Upper bound on one classification.
    pub timeout: Duration,

    /// On failure or timeout, apply "no cat" instead of returning the error.
    pub assume_no_cat_on_failure: bool,
}

impl Default for ClassifierPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            assume_no_cat_on_failure: false,
        }
    }
}

// ============================================================================
// Engine Handle
// ============================================================================

/// Cheap-to-clone handle to the engine actor.
///
/// ```ignore
/// let handle = spawn_engine(store, classifier, ClassifierPolicy::default());
/// handle.set_arming_status(ArmingStatus::ArmedHome).await?;
///
/// let mut events = handle.subscribe();
/// while let Ok(event) = events.recv().await {
///     // ...
/// }
/// ```
#[derive(Clone)]
pub struct EngineHandle {
    sender: mpsc::Sender<EngineCommand>,
    event_sender: broadcast::Sender<SecurityEvent>,
    classifier: SharedClassifier,
    policy: ClassifierPolicy,
}

impl EngineHandle {
    pub fn new(
        sender: mpsc::Sender<EngineCommand>,
        event_sender: broadcast::Sender<SecurityEvent>,
        classifier: SharedClassifier,
        policy: ClassifierPolicy,
    ) -> Self {
        Self {
            sender,
            event_sender,
            classifier,
            policy,
        }
    }

    /// Changes the arming mode.
    ///
    /// # Errors
    ///
    /// - `EngineError::Security` if the store fails
    /// - `EngineError::ChannelClosed` if the actor has shut down
    pub async fn set_arming_status(&self, mode: ArmingStatus) -> Result<(), EngineError> {
        self.request(|respond_to| EngineCommand::SetArmingStatus { mode, respond_to })
            .await
    }

    /// Reports a sensor as active or inactive.
    ///
    /// # Errors
    ///
    /// - `EngineError::Security(SecurityError::UnknownSensor)` for an unknown id
    /// - `EngineError::ChannelClosed` if the actor has shut down
    pub async fn set_sensor_active(
        &self,
        sensor_id: SensorId,
        active: bool,
    ) -> Result<(), EngineError> {
        self.request(|respond_to| EngineCommand::SetSensorActive {
            sensor_id,
            active,
            respond_to,
        })
        .await
    }

    /// Classifies an image and applies the result.
    ///
    /// Classification runs on the blocking pool, bounded by the policy
    /// timeout, so the actor keeps serving other commands meanwhile.
    /// Returns the detection that was applied.
    ///
    /// # Errors
    ///
    /// - `EngineError::Security(SecurityError::ClassifierUnavailable)` if the
    ///   classifier fails or times out and the policy does not fall back
    /// - `EngineError::ChannelClosed` if the actor has shut down
    pub async fn submit_image(&self, image: Vec<u8>) -> Result<bool, EngineError> {
        let detected = match self.classify(image).await {
            Ok(detected) => detected,
            Err(e) if self.policy.assume_no_cat_on_failure => {
                warn!(error = %e, "Classification failed, assuming no cat");
                false
            }
            Err(e) => return Err(e.into()),
        };

        self.apply_cat_detection(detected).await?;
        Ok(detected)
    }

    /// Applies a classification made elsewhere.
    pub async fn apply_cat_detection(&self, detected: bool) -> Result<(), EngineError> {
        self.request(|respond_to| EngineCommand::ApplyCatDetection {
            detected,
            respond_to,
        })
        .await
    }

    /// Writes the alarm status directly.
    pub async fn set_alarm_status(&self, status: AlarmStatus) -> Result<(), EngineError> {
        self.request(|respond_to| EngineCommand::SetAlarmStatus { status, respond_to })
            .await
    }

    /// Creates a new inactive sensor.
    pub async fn add_sensor(
        &self,
        name: impl Into<String>,
        sensor_type: SensorType,
    ) -> Result<Sensor, EngineError> {
        let name = name.into();
        self.request(|respond_to| EngineCommand::AddSensor {
            name,
            sensor_type,
            respond_to,
        })
        .await
    }

    /// Removes a sensor and returns it.
    pub async fn remove_sensor(&self, sensor_id: SensorId) -> Result<Sensor, EngineError> {
        self.request(|respond_to| EngineCommand::RemoveSensor {
            sensor_id,
            respond_to,
        })
        .await
    }

    /// Current alarm, arming, cat flag and sensors.
    pub async fn snapshot(&self) -> Result<SecuritySnapshot, EngineError> {
        self.request(|respond_to| EngineCommand::GetSnapshot { respond_to })
            .await
    }

    /// Subscribes to engine notifications.
    ///
    /// Events published before this call are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<SecurityEvent> {
        self.event_sender.subscribe()
    }

    /// True while the actor is running.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }

    async fn classify(&self, image: Vec<u8>) -> Result<bool, SecurityError> {
        let classifier = self.classifier.clone();
        let task = tokio::task::spawn_blocking(move || {
            classifier.contains_cat(&image, CAT_CONFIDENCE_THRESHOLD)
        });

        match tokio::time::timeout(self.policy.timeout, task).await {
            Ok(Ok(result)) => Ok(result?),
            Ok(Err(join_error)) => Err(SecurityError::ClassifierUnavailable(format!(
                "classifier task failed: {join_error}"
            ))),
            Err(_) => {
                info!(timeout_ms = self.policy.timeout.as_millis() as u64, "Classifier timed out");
                Err(SecurityError::ClassifierUnavailable(format!(
                    "timed out after {}ms",
                    self.policy.timeout.as_millis()
                )))
            }
        }
    }

    async fn request<T, F>(&self, make: F) -> Result<T, EngineError>
    where
        F: FnOnce(oneshot::Sender<Result<T, EngineError>>) -> EngineCommand,
    {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(make(tx))
            .await
            .map_err(|_| EngineError::ChannelClosed)?;

        rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}
