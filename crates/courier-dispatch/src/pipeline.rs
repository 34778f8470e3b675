// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequential batch dispatch.
//!
//! One batch at a time, one recipient at a time, a fixed pause after every
//! attempt. The transport is a single shared account channel; pushing sends
//! through it concurrently or too quickly gets the account throttled or
//! banned, so the pacing here is a correctness constraint, not tuning.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use courier_core::{CourierError, ServiceStats, SessionPhase, StatusSnapshot, TransportAdapter};

use crate::normalize::canonical_address;

/// Pause after every send attempt.
pub const SEND_INTERVAL: Duration = Duration::from_secs(2);

/// One outbound batch: a body delivered to each recipient in order.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub recipients: Vec<Recipient>,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct Recipient {
    /// Raw address as submitted; normalized per attempt.
    pub address: String,
    pub name: Option<String>,
}

/// Result of a completed batch. One outcome per input recipient, in input
/// order, always.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub summary: DispatchSummary,
    pub outcomes: Vec<RecipientOutcome>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DispatchSummary {
    pub total_recipients: usize,
    pub sent: usize,
    pub failed: usize,
    pub success_rate_percent: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipientOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Canonical address on a send attempt, the raw input when
    /// normalization rejected it.
    pub address: String,
    pub status: OutcomeStatus,
    /// Failure detail; absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Sent,
    Failed,
}

/// Serializes batches onto the shared transport channel.
pub struct Dispatcher {
    transport: Arc<dyn TransportAdapter>,
    status: watch::Receiver<StatusSnapshot>,
    stats: Arc<ServiceStats>,
    // Held for the whole batch; concurrent callers queue behind it.
    in_flight: Mutex<()>,
    send_interval: Duration,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn TransportAdapter>,
        status: watch::Receiver<StatusSnapshot>,
        stats: Arc<ServiceStats>,
    ) -> Self {
        Self {
            transport,
            status,
            stats,
            in_flight: Mutex::new(()),
            send_interval: SEND_INTERVAL,
        }
    }

    /// Runs one batch to completion.
    ///
    /// Fails fast, before any send and any ledger entry, when the session
    /// is not ready or the request is malformed. Once sending starts the
    /// batch always runs to the end; individual failures are recorded in
    /// the report and never abort the remainder.
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchReport, CourierError> {
        let snapshot = self.status.borrow().clone();
        if snapshot.phase != SessionPhase::Ready {
            debug!(phase = %snapshot.phase, "dispatch rejected, session not ready");
            return Err(CourierError::NotReady {
                pairing_available: snapshot.pairing.is_some(),
            });
        }
        if request.recipients.is_empty() {
            return Err(CourierError::InvalidInput(
                "recipients list is empty".into(),
            ));
        }
        if request.body.trim().is_empty() {
            return Err(CourierError::InvalidInput("message body is empty".into()));
        }

        let _guard = self.in_flight.lock().await;
        info!(recipients = request.recipients.len(), "dispatching batch");

        let mut outcomes = Vec::with_capacity(request.recipients.len());
        for recipient in &request.recipients {
            outcomes.push(self.send_one(recipient, &request.body).await);
            tokio::time::sleep(self.send_interval).await;
        }

        let sent = outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Sent)
            .count();
        let summary = DispatchSummary {
            total_recipients: outcomes.len(),
            sent,
            failed: outcomes.len() - sent,
            success_rate_percent: success_rate(sent, outcomes.len()),
        };
        info!(
            total = summary.total_recipients,
            sent = summary.sent,
            failed = summary.failed,
            success_rate = summary.success_rate_percent,
            "batch complete"
        );

        Ok(DispatchReport { summary, outcomes })
    }

    async fn send_one(&self, recipient: &Recipient, body: &str) -> RecipientOutcome {
        let Some(canonical) = canonical_address(&recipient.address) else {
            self.stats.record_error();
            warn!(address = recipient.address.as_str(), "recipient address has no digits");
            return RecipientOutcome {
                name: recipient.name.clone(),
                address: recipient.address.clone(),
                status: OutcomeStatus::Failed,
                detail: Some("invalid phone number".into()),
                sent_at: None,
            };
        };

        match self.transport.send_message(&canonical, body).await {
            Ok(()) => {
                self.stats.record_message_sent();
                debug!(address = canonical.as_str(), "message sent");
                RecipientOutcome {
                    name: recipient.name.clone(),
                    address: canonical,
                    status: OutcomeStatus::Sent,
                    detail: None,
                    sent_at: Some(Utc::now()),
                }
            }
            Err(e) => {
                self.stats.record_error();
                warn!(address = canonical.as_str(), error = %e, "send failed");
                RecipientOutcome {
                    name: recipient.name.clone(),
                    address: canonical,
                    status: OutcomeStatus::Failed,
                    detail: Some(e.to_string()),
                    sent_at: None,
                }
            }
        }
    }
}

fn success_rate(sent: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (sent as f64 / total as f64 * 100.0).round() as u32
}
