//! Background actors.
//!
//! Each actor is an independent tokio task stopped through a
//! [`CancellationToken`]. The only actor today is the
//! [`AutomationActor`], which feeds periodic analysis tasks into the pipeline.

pub mod automation;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use automation::AutomationActor;

/// Handle to a running actor, used for graceful shutdown.
pub struct ActorHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl ActorHandle {
    pub fn new(cancel: CancellationToken, join: JoinHandle<()>) -> Self {
        Self { cancel, join }
    }

    /// Signal the actor to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the actor to stop on its own or after [`shutdown`](Self::shutdown).
    pub async fn join(self) -> crate::Result<()> {
        self.join
            .await
            .map_err(|e| crate::Error::TaskJoin(e.to_string()))
    }
}
