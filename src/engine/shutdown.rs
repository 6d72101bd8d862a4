// src/engine/shutdown.rs

//! Ctrl-C to `ShutdownRequested` bridge.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::engine::RuntimeEvent;

/// Background task that sends [`RuntimeEvent::ShutdownRequested`] on Ctrl-C.
///
/// The task, and the sender it holds, is aborted when the listener is
/// dropped.
#[derive(Debug)]
pub struct ShutdownListener {
    handle: JoinHandle<()>,
}

impl ShutdownListener {
    pub fn spawn(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        let handle = tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl-C");
                return;
            }
            info!("Ctrl-C received; requesting shutdown");
            let _ = runtime_tx.send(RuntimeEvent::ShutdownRequested).await;
        });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ShutdownListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
