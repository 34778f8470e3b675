// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the session state machine, dispatcher, storage
//! publisher, and gateway.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle phase of the single process-wide messaging session.
///
/// Transitions are driven only by transport events and internal timers,
/// never directly by inbound HTTP requests.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No start has been requested yet.
    Uninitialized,
    /// The transport engine is starting up.
    Initializing,
    /// A pairing code has been issued and is waiting to be scanned.
    AwaitingPairing,
    /// The account scanned the code; the engine is finishing its handshake.
    Authenticated,
    /// Fully connected; dispatch is allowed.
    Ready,
    /// The engine rejected the stored credentials; restart pending.
    AuthFailed,
    /// The connection dropped; reconnect pending.
    Disconnected,
}

/// The short-lived code a user scans to link the service to their account.
///
/// At most one artifact is live at a time; a newly issued code replaces the
/// previous one. The sequence counter is monotonic for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairingArtifact {
    /// Raw pairing code as issued by the transport engine.
    pub code: String,
    /// When the code was issued.
    pub issued_at: DateTime<Utc>,
    /// Rendered pairing image as a base64 SVG data URL, if rendering succeeded.
    pub svg_data_url: Option<String>,
    /// Monotonic issue counter (1-based), never reset.
    pub sequence: u64,
}

/// Connection metadata reported by the transport engine on Ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Account identifier (the linked phone number for WhatsApp-style engines).
    pub account_id: String,
    /// Display name of the linked account, if the engine reports one.
    pub display_name: Option<String>,
    /// Version string of the remote transport, if reported.
    pub transport_version: Option<String>,
}

/// Lifecycle signals emitted by the transport adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A pairing code was issued (or re-issued) and should be shown to the user.
    PairingCodeIssued(String),
    /// The user scanned the code; credentials are accepted.
    Authenticated,
    /// Authentication failed with the given reason.
    AuthFailed(String),
    /// The session is fully connected.
    Ready(ConnectionInfo),
    /// The session dropped with the given reason.
    Disconnected(String),
}

/// Immutable view of the session published after every state mutation.
///
/// Snapshots are read lock-free via a `watch` channel; readers never block
/// the state machine.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    /// Current lifecycle phase.
    pub phase: SessionPhase,
    /// Live pairing artifact, present iff phase is `AwaitingPairing`.
    pub pairing: Option<PairingArtifact>,
    /// Connection metadata, present iff phase is `Ready`.
    pub connection: Option<ConnectionInfo>,
    /// Most recent error retained for diagnosis (bounded length).
    pub last_error: Option<String>,
    /// Initialization attempts since the last successful Ready.
    pub retry_attempt: u32,
    /// Authentication failures observed; separate from the init retry counter.
    pub auth_failures: u32,
}

impl StatusSnapshot {
    /// The snapshot for a freshly created, never-started session.
    pub fn uninitialized() -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            pairing: None,
            connection: None,
            last_error: None,
            retry_attempt: 0,
            auth_failures: 0,
        }
    }
}

/// One state transition projected into external storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Status label written to the single status row.
    pub status: &'static str,
    /// Account identifier, set only when the session is connected.
    pub account: Option<String>,
}

/// Process-lifetime service counters. Monotonic, never reset, shared via `Arc`.
#[derive(Debug, Default)]
pub struct ServiceStats {
    messages_sent: AtomicU64,
    errors: AtomicU64,
    pairing_codes_issued: AtomicU64,
    status_writes: AtomicU64,
}

impl ServiceStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pairing_code(&self) {
        self.pairing_codes_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_status_write(&self) {
        self.status_writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Serializable point-in-time view of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            pairing_codes_issued: self.pairing_codes_issued.load(Ordering::Relaxed),
            status_writes: self.status_writes.load(Ordering::Relaxed),
        }
    }
}

/// Serialized form of [`ServiceStats`] for status responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub messages_sent: u64,
    pub errors: u64,
    pub pairing_codes_issued: u64,
    pub status_writes: u64,
}
