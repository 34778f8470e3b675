// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP boundary for the Courier messaging service.
//!
//! Read-only status and pairing endpoints plus the batch send endpoint.
//! Requests never drive session state transitions; they observe snapshots
//! and submit dispatch batches.

pub mod handlers;
mod server;

pub use server::{GatewayState, ServerConfig, router, start_server};
