// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Courier messaging service.

use thiserror::Error;

/// The primary error type used across all Courier crates.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport engine errors (connect failure, send failure, bridge unreachable).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Status storage errors (database open, upsert failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Dispatch rejected because the session is not in the Ready phase.
    ///
    /// `pairing_available` tells the caller whether a pairing code is
    /// currently on offer, so it can prompt the user to scan it.
    #[error("session not ready for dispatch (pairing available: {pairing_available})")]
    NotReady { pairing_available: bool },

    /// Dispatch rejected before any send was attempted (empty recipients, blank body).
    #[error("invalid dispatch input: {0}")]
    InvalidInput(String),

    /// The session gave up initializing after the configured retry ceiling.
    #[error("transport initialization abandoned after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// Internal or unexpected errors (closed channels, poisoned invariants).
    #[error("internal error: {0}")]
    Internal(String),
}
