// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle management for the Courier messaging service.
//!
//! One long-lived messaging session, driven by a single-writer actor task.
//! [`manager::spawn`] wires an actor to a [`courier_core::TransportAdapter`]
//! and returns a cloneable [`SessionHandle`] for status reads and control.

pub mod backoff;
mod handle;
pub mod manager;
mod render;

pub use handle::SessionHandle;
pub use manager::spawn;
