//! Engine actor - the single owner of the [`SecurityService`].
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()` outside tests
//! - Reply send failures are ignored; the caller may have gone away

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use catpoint_core::{CatClassifier, SecurityService, SensorStore};

use super::commands::{EngineCommand, EngineError};

/// Classifier type held by the engine. Shared with every handle so images
/// can be classified off the actor task.
pub type SharedClassifier = Arc<dyn CatClassifier + Send + Sync>;

/// Owns the engine and processes commands one at a time.
pub struct EngineActor<S> {
    receiver: mpsc::Receiver<EngineCommand>,
    service: SecurityService<S, SharedClassifier>,
}

impl<S: SensorStore> EngineActor<S> {
    pub fn new(
        receiver: mpsc::Receiver<EngineCommand>,
        service: SecurityService<S, SharedClassifier>,
    ) -> Self {
        Self { receiver, service }
    }

    /// Processes commands until every handle has been dropped.
    pub async fn run(mut self) {
        info!("Engine actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("Engine actor stopped");
    }

    fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::SetArmingStatus { mode, respond_to } => {
                let result = self.service.set_arming_status(mode);
                let _ = respond_to.send(log_failure("set_arming_status", result));
            }
            EngineCommand::SetSensorActive {
                sensor_id,
                active,
                respond_to,
            } => {
                let result = self.service.set_sensor_active(&sensor_id, active);
                let _ = respond_to.send(log_failure("set_sensor_active", result));
            }
            EngineCommand::ApplyCatDetection {
                detected,
                respond_to,
            } => {
                let result = self.service.process_cat_detection(detected);
                let _ = respond_to.send(log_failure("process_cat_detection", result));
            }
            EngineCommand::SetAlarmStatus { status, respond_to } => {
                let result = self.service.set_alarm_status(status);
                let _ = respond_to.send(log_failure("set_alarm_status", result));
            }
            EngineCommand::AddSensor {
                name,
                sensor_type,
                respond_to,
            } => {
                let result = self.service.add_sensor(name, sensor_type);
                let _ = respond_to.send(log_failure("add_sensor", result));
            }
            EngineCommand::RemoveSensor {
                sensor_id,
                respond_to,
            } => {
                let result = self.service.remove_sensor(&sensor_id);
                let _ = respond_to.send(log_failure("remove_sensor", result));
            }
            EngineCommand::GetSnapshot { respond_to } => {
                let result = self.service.snapshot();
                let _ = respond_to.send(log_failure("snapshot", result));
            }
        }
    }
}

fn log_failure<T>(
    operation: &'static str,
    result: catpoint_core::SecurityResult<T>,
) -> Result<T, EngineError> {
    match result {
        Ok(value) => {
            debug!(operation, "Engine command completed");
            Ok(value)
        }
        Err(e) => {
            warn!(operation, error = %e, "Engine command failed");
            Err(EngineError::Security(e))
        }
    }
}
