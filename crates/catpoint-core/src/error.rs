//! Error types for engine operations and the ports behind them.

use crate::SensorId;
use thiserror::Error;

/// Errors returned by [`SecurityService`](crate::SecurityService) operations.
///
/// State transitions themselves are total. Only a reference to a sensor the
/// store does not know, or a failing collaborator, produces an error, and in
/// every case nothing has been committed when the error is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SecurityError {
    /// The operation referenced a sensor absent from the store.
    #[error("Unknown sensor: {sensor_id}")]
    UnknownSensor { sensor_id: SensorId },

    /// The cat classifier could not be reached or rejected the image.
    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    /// Reading from or writing to the sensor store failed.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Result type for engine operations.
pub type SecurityResult<T> = Result<T, SecurityError>;

/// Errors raised by [`SensorStore`](crate::SensorStore) implementations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The backing medium could not be read or written.
    #[error("I/O error: {0}")]
    Io(String),

    /// Persisted state exists but could not be decoded.
    #[error("Stored state is corrupted: {0}")]
    Corrupted(String),
}

impl From<StoreError> for SecurityError {
    fn from(err: StoreError) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

/// Errors raised by [`CatClassifier`](crate::CatClassifier) implementations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    /// The image could not be decoded or was empty.
    #[error("malformed image: {0}")]
    MalformedImage(String),

    /// The classification backend could not be reached.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The classification backend answered with something unreadable.
    #[error("invalid classifier response: {0}")]
    InvalidResponse(String),
}

impl From<ClassifierError> for SecurityError {
    fn from(err: ClassifierError) -> Self {
        Self::ClassifierUnavailable(err.to_string())
    }
}

/// Error reported by a [`StatusListener`](crate::StatusListener) callback.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("listener failed: {0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    /// Creates a listener error from any displayable error.
    pub fn new<E: std::fmt::Display>(err: E) -> Self {
        Self(err.to_string())
    }
}
