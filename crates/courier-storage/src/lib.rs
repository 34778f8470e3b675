// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Courier service status row.
//!
//! The service persists exactly one row: the current session status keyed by
//! a fixed id. Writes are best-effort mirrors of state transitions; the
//! session state machine never depends on them succeeding.

pub mod publisher;

pub use publisher::{SqliteStatusPublisher, StatusRow};
