// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport adapter for the Courier messaging service.
//!
//! Talks to a local automation-engine bridge over HTTP:
//! [`BridgeTransport`] implements [`courier_core::TransportAdapter`] for
//! session control and sends, [`EventPump`] streams lifecycle events from
//! the bridge into the session actor.

mod bridge;
mod events;

pub use bridge::BridgeTransport;
pub use events::{EventPump, parse_event_stream};
