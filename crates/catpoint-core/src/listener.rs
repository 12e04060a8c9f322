//! Observer registry.
//!
//! Listeners are registered as `Arc<dyn StatusListener>` and addressed by the
//! [`ListenerId`] handed out at registration. Broadcasts iterate a snapshot of
//! the registry, and a failing listener (error or panic) is logged and
//! counted without affecting delivery to the others.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

use crate::error::ListenerError;
use crate::{AlarmStatus, SecurityEvent};

/// Receives engine notifications.
///
/// All callbacks default to doing nothing, so a listener only implements
/// what it cares about. Callbacks take `&self`; listeners that keep state
/// use interior mutability.
pub trait StatusListener: Send + Sync {
    /// The alarm status was written.
    fn alarm_status_changed(&self, _status: AlarmStatus) -> Result<(), ListenerError> {
        Ok(())
    }

    /// An image was processed.
    fn cat_detected(&self, _detected: bool) -> Result<(), ListenerError> {
        Ok(())
    }

    /// Sensors changed in bulk; re-query them.
    fn sensor_status_changed(&self) -> Result<(), ListenerError> {
        Ok(())
    }
}

/// Identity of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Outcome of delivering one event to every listener.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// The set of registered listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Vec<(ListenerId, Arc<dyn StatusListener>)>,
    next_id: u64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener.
    ///
    /// Registering the same `Arc` again returns its existing id.
    pub fn add(&mut self, listener: Arc<dyn StatusListener>) -> ListenerId {
        if let Some((id, _)) = self
            .listeners
            .iter()
            .find(|(_, existing)| Arc::ptr_eq(existing, &listener))
        {
            return *id;
        }

        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.listeners.iter().any(|(existing, _)| *existing == id)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Delivers `event` to every listener registered at call time.
    pub fn broadcast(&self, event: &SecurityEvent) -> DeliveryReport {
        let snapshot: Vec<(ListenerId, Arc<dyn StatusListener>)> = self.listeners.clone();
        let mut report = DeliveryReport::default();

        for (id, listener) in snapshot {
            let outcome = catch_unwind(AssertUnwindSafe(|| dispatch(listener.as_ref(), event)));
            match outcome {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    warn!(listener = %id, event = ?event, error = %err, "Listener failed");
                    report.failed += 1;
                }
                Err(_) => {
                    warn!(listener = %id, event = ?event, "Listener panicked");
                    report.failed += 1;
                }
            }
        }

        report
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

fn dispatch(listener: &dyn StatusListener, event: &SecurityEvent) -> Result<(), ListenerError> {
    match *event {
        SecurityEvent::AlarmStatusChanged(status) => listener.alarm_status_changed(status),
        SecurityEvent::CatDetected(detected) => listener.cat_detected(detected),
        SecurityEvent::SensorStatusChanged => listener.sensor_status_changed(),
    }
}
