//! Engine runtime using the actor pattern.
//!
//! The [`SecurityService`] is synchronous and has a single owner: the
//! [`EngineActor`]. Everything else talks to it through an [`EngineHandle`].
//!
//! ```text
//! ┌───────────────┐  EngineCommand  ┌───────────────┐  SecurityEvent  ┌──────────────┐
//! │ EngineHandle  │────(mpsc)──────▶│  EngineActor  │──(broadcast)───▶│ subscribers  │
//! └───────────────┘                 └───────────────┘                 └──────────────┘
//!         │                                 │
//!         │ spawn_blocking + timeout        │ SecurityService<S, SharedClassifier>
//!         ▼                                 ▼
//!    CatClassifier                      SensorStore
//! ```
//!
//! Images are classified by the handle on the blocking pool and only the
//! boolean result is sent to the actor, so a slow classifier never stalls
//! sensor or arming commands.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use catpoint_core::{SecurityService, SensorStore};

mod actor;
mod commands;
mod handle;

pub use actor::{EngineActor, SharedClassifier};
pub use commands::{BroadcastListener, EngineCommand, EngineError};
pub use handle::{ClassifierPolicy, EngineHandle};

/// Channel buffer sizes
const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 256;

/// Spawns the engine actor over `store` and returns a handle to it.
///
/// Must be called from within a tokio runtime.
pub fn spawn_engine<S>(store: S, classifier: SharedClassifier, policy: ClassifierPolicy) -> EngineHandle
where
    S: SensorStore + Send + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

    let mut service = SecurityService::new(store, classifier.clone());
    let listener_id = service.add_status_listener(Arc::new(BroadcastListener::new(event_tx.clone())));
    debug!(%listener_id, "Broadcast listener registered");

    let actor = EngineActor::new(cmd_rx, service);
    tokio::spawn(actor.run());

    EngineHandle::new(cmd_tx, event_tx, classifier, policy)
}
