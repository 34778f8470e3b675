// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Courier messaging service.
//!
//! This crate provides the foundational error type, shared session/dispatch
//! types, and the traits implemented by the transport adapter and the
//! status storage publisher.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CourierError;
pub use traits::{StatusPublisher, TransportAdapter};
pub use types::{
    ConnectionInfo, PairingArtifact, ServiceStats, SessionPhase, StatsSnapshot, StatusSnapshot,
    StatusUpdate, TransportEvent,
};
