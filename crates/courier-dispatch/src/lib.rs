// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch message dispatch for the Courier messaging service.
//!
//! Validates a batch up front, then walks the recipients strictly in order
//! with a fixed pause between sends. Batches from concurrent callers queue;
//! the underlying transport is one shared account channel and is never
//! driven concurrently.

mod normalize;
mod pipeline;

pub use normalize::canonical_address;
pub use pipeline::{
    DispatchReport, DispatchRequest, DispatchSummary, Dispatcher, OutcomeStatus, Recipient,
    RecipientOutcome, SEND_INTERVAL,
};
