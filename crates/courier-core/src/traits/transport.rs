// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport adapter trait for the opaque messaging automation engine.

use async_trait::async_trait;

use crate::error::CourierError;

/// Boundary to the external messaging engine.
///
/// The engine itself is opaque: it maintains the real account connection and
/// reports lifecycle changes as [`TransportEvent`](crate::types::TransportEvent)s
/// pushed into the session state machine's event channel. This trait covers
/// only the calls the service makes *into* the engine.
#[async_trait]
pub trait TransportAdapter: Send + Sync + 'static {
    /// Starts (or restarts) the engine's session.
    ///
    /// Resolution means the engine accepted the request; pairing and
    /// readiness arrive later as events. An error here is an
    /// initialization failure and drives the backoff/retry path.
    async fn connect(&self) -> Result<(), CourierError>;

    /// Sends one message body to one canonical address.
    async fn send_message(&self, address: &str, body: &str) -> Result<(), CourierError>;

    /// Tears the engine session down; used during orderly shutdown.
    async fn destroy(&self) -> Result<(), CourierError>;
}
