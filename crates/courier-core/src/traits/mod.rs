// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the service's external collaborators.

pub mod publisher;
pub mod transport;

pub use publisher::StatusPublisher;
pub use transport::TransportAdapter;
