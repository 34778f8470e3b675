// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cloneable handle to the session actor.

use tokio::sync::{mpsc, oneshot, watch};

use courier_core::{CourierError, StatusSnapshot};

use crate::manager::SessionCommand;

/// Handle used by the gateway, dispatcher, and binary to talk to the
/// session actor.
///
/// Status reads go through a `watch` channel: they are lock-free snapshot
/// clones and can never block on, or fail because of, the actor.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) commands: mpsc::Sender<SessionCommand>,
    pub(crate) status_rx: watch::Receiver<StatusSnapshot>,
}

impl SessionHandle {
    /// Returns the current status snapshot. Never blocks, never fails.
    pub fn status(&self) -> StatusSnapshot {
        self.status_rx.borrow().clone()
    }

    /// A standalone watch on the status snapshot, for components that only
    /// observe the session and should not hold command capability.
    pub fn watch(&self) -> watch::Receiver<StatusSnapshot> {
        self.status_rx.clone()
    }

    /// Requests a transition into Initializing.
    ///
    /// Acts from Uninitialized and from the failed states (AuthFailed,
    /// Disconnected, where it short-circuits any pending restart timer).
    /// A no-op (inside the actor) while a session is already starting or
    /// connected.
    pub async fn start(&self) -> Result<(), CourierError> {
        self.commands
            .send(SessionCommand::Start)
            .await
            .map_err(|_| CourierError::Internal("session actor is gone".into()))
    }

    /// Orderly teardown: destroys the transport session and stops the actor.
    ///
    /// Resolves once the actor has acknowledged the shutdown.
    pub async fn shutdown(&self) -> Result<(), CourierError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Shutdown(ack_tx))
            .await
            .map_err(|_| CourierError::Internal("session actor is gone".into()))?;
        ack_rx
            .await
            .map_err(|_| CourierError::Internal("session actor dropped shutdown ack".into()))
    }
}
