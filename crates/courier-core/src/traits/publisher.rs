// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status publisher trait for mirroring state transitions into storage.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::types::StatusUpdate;

/// Best-effort projection of session state into external storage.
///
/// Implementations must be safe to fail: callers log and discard every
/// error, and session correctness never depends on a publish succeeding.
#[async_trait]
pub trait StatusPublisher: Send + Sync + 'static {
    /// Upserts the single status row with the given transition.
    async fn publish(&self, update: StatusUpdate) -> Result<(), CourierError>;
}
