//! Catpoint Core - alarm decision engine for a home security controller
//!
//! This crate provides the domain types and the decision engine shared by
//! the runtime (`catpointd`) and any other front end:
//! - [`SecurityService`] - the state machine over alarm status, arming
//!   status, sensor activation and cat detection
//! - [`SensorStore`], [`CatClassifier`], [`StatusListener`] - the ports the
//!   engine is driven through
//!
//! The engine never touches disk, the network or a screen. Everything it
//! knows about the outside world arrives through the ports.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod classifier;
pub mod error;
pub mod event;
pub mod listener;
pub mod sensor;
pub mod service;
pub mod state;
pub mod status;
pub mod store;
mod transition;

// Re-exports for convenience
pub use classifier::{CatClassifier, CAT_CONFIDENCE_THRESHOLD};
pub use error::{ClassifierError, ListenerError, SecurityError, SecurityResult, StoreError};
pub use event::SecurityEvent;
pub use listener::{DeliveryReport, ListenerId, ListenerRegistry, StatusListener};
pub use sensor::{Sensor, SensorId, SensorType};
pub use service::{SecurityService, SecuritySnapshot};
pub use state::SystemState;
pub use status::{AlarmStatus, ArmingStatus};
pub use store::{MemoryStore, SensorStore, StoreWrite};
