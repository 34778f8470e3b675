// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the Courier REST API.
//!
//! All state transitions happen inside the session actor; these handlers
//! only read snapshots and hand batches to the dispatcher. A request can
//! never move the session.

use axum::Json;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use courier_core::{CourierError, PairingArtifact, SessionPhase, StatsSnapshot, StatusSnapshot};
use courier_dispatch::{DispatchRequest, DispatchSummary, Recipient, RecipientOutcome};

use crate::server::GatewayState;

/// Display lifetime of a pairing code. Reporting only: the engine rotates
/// codes on its own schedule and state never depends on this value.
const PAIRING_DISPLAY_TTL_SECS: i64 = 120;

/// Suggested poll interval while the session is still starting.
const PAIRING_RETRY_SECS: u64 = 10;

/// Response body for `GET /`.
#[derive(Debug, Serialize)]
pub struct BannerResponse {
    pub service: String,
    pub version: String,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub uptime_human: String,
    pub stats: StatsSnapshot,
    pub timestamp: DateTime<Utc>,
}

/// Response body for `GET /api/status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub service: String,
    pub version: String,
    pub session: StatusSnapshot,
    pub pairing_code_available: bool,
    pub stats: StatsSnapshot,
    pub uptime_secs: u64,
    pub timestamp: DateTime<Utc>,
}

/// Response body for `GET /api/qr`: three shapes depending on where the
/// session is in its lifecycle.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PairingResponse {
    ScanRequired {
        status: &'static str,
        pairing_code: String,
        message: &'static str,
        instructions: [&'static str; 4],
        issued_at: DateTime<Utc>,
        expires_in_secs: i64,
        code_number: u64,
    },
    Authenticated {
        status: &'static str,
        message: &'static str,
        account: Option<String>,
        display_name: Option<String>,
    },
    Pending {
        status: &'static str,
        message: &'static str,
        retry_in_secs: u64,
    },
}

/// Response body for `GET /api/qr/image`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PairingImageResponse {
    Available {
        image_data_url: String,
        format: &'static str,
        issued_at: DateTime<Utc>,
        expires_in_secs: i64,
    },
    NotAvailable {
        status: &'static str,
        message: &'static str,
    },
}

/// Request body for `POST /api/send-message`.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub recipients: Vec<RecipientBody>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct RecipientBody {
    pub phone: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Success body for `POST /api/send-message`.
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub error: bool,
    pub message: String,
    pub summary: DispatchSummary,
    pub results: Vec<RecipientOutcome>,
    pub timestamp: DateTime<Utc>,
}

/// Machine-readable error body.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: bool,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairing_code_available: Option<bool>,
}

/// GET /
pub async fn get_banner(State(state): State<GatewayState>) -> Json<BannerResponse> {
    let uptime = state.started_at.elapsed().as_secs();
    Json(BannerResponse {
        service: state.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: coarse_status(state.session.status().phase),
        uptime_secs: uptime,
        uptime_human: format!("{}m {}s", uptime / 60, uptime % 60),
        stats: state.stats.snapshot(),
        timestamp: Utc::now(),
    })
}

/// GET /api/status
pub async fn get_status(State(state): State<GatewayState>) -> Json<StatusResponse> {
    let session = state.session.status();
    Json(StatusResponse {
        service: state.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        pairing_code_available: session.pairing.is_some(),
        session,
        stats: state.stats.snapshot(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        timestamp: Utc::now(),
    })
}

/// GET /api/qr
pub async fn get_pairing(State(state): State<GatewayState>) -> Json<PairingResponse> {
    let snapshot = state.session.status();
    let response = match (&snapshot.pairing, snapshot.phase) {
        (Some(artifact), _) => PairingResponse::ScanRequired {
            status: "scan_required",
            pairing_code: artifact.code.clone(),
            message: "Scan this code with the messaging app on the linked phone",
            instructions: [
                "1. Open the messaging app on your phone",
                "2. Go to Settings > Linked devices",
                "3. Tap 'Link a device'",
                "4. Scan this code",
            ],
            issued_at: artifact.issued_at,
            expires_in_secs: expires_in_secs(artifact, Utc::now()),
            code_number: artifact.sequence,
        },
        (None, SessionPhase::Ready) => {
            let connection = snapshot.connection.as_ref();
            PairingResponse::Authenticated {
                status: "authenticated",
                message: "messaging account is already linked",
                account: connection.map(|c| c.account_id.clone()),
                display_name: connection.and_then(|c| c.display_name.clone()),
            }
        }
        (None, phase) => PairingResponse::Pending {
            status: coarse_status(phase),
            message: "service is starting, a pairing code will appear shortly",
            retry_in_secs: PAIRING_RETRY_SECS,
        },
    };
    Json(response)
}

/// GET /api/qr/image
pub async fn get_pairing_image(State(state): State<GatewayState>) -> Json<PairingImageResponse> {
    let snapshot = state.session.status();
    let response = match snapshot.pairing.as_ref().and_then(|a| {
        a.svg_data_url
            .clone()
            .map(|url| (url, a.issued_at, expires_in_secs(a, Utc::now())))
    }) {
        Some((image_data_url, issued_at, expires_in)) => PairingImageResponse::Available {
            image_data_url,
            format: "SVG",
            issued_at,
            expires_in_secs: expires_in,
        },
        None => PairingImageResponse::NotAvailable {
            status: "not_available",
            message: "no pairing image has been rendered yet",
        },
    };
    Json(response)
}

/// POST /api/send-message
pub async fn post_send_message(
    State(state): State<GatewayState>,
    Json(body): Json<SendMessageRequest>,
) -> Response {
    let request = DispatchRequest {
        recipients: body
            .recipients
            .into_iter()
            .map(|r| Recipient {
                address: r.phone,
                name: r.name,
            })
            .collect(),
        body: body.message,
    };

    match state.dispatcher.dispatch(request).await {
        Ok(report) => {
            let message = format!(
                "{}/{} messages sent",
                report.summary.sent, report.summary.total_recipients
            );
            Json(SendMessageResponse {
                error: false,
                message,
                summary: report.summary,
                results: report.outcomes,
                timestamp: Utc::now(),
            })
            .into_response()
        }
        Err(e) => dispatch_error_response(e),
    }
}

/// Fallback for unknown routes; lists what the service does expose.
pub async fn not_found(method: Method, uri: Uri) -> Response {
    let body = serde_json::json!({
        "error": true,
        "message": format!("endpoint {method} {} not found", uri.path()),
        "available_endpoints": [
            "GET /",
            "GET /api/status",
            "GET /api/qr",
            "GET /api/qr/image",
            "POST /api/send-message",
        ],
    });
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

/// Coarse status string for the banner and pending pairing responses.
fn coarse_status(phase: SessionPhase) -> &'static str {
    match phase {
        SessionPhase::Ready => "ready",
        SessionPhase::Uninitialized => "starting",
        _ => "initializing",
    }
}

/// Seconds the artifact remains worth displaying, floored at zero.
fn expires_in_secs(artifact: &PairingArtifact, now: DateTime<Utc>) -> i64 {
    (PAIRING_DISPLAY_TTL_SECS - (now - artifact.issued_at).num_seconds()).max(0)
}

/// Dispatch precondition failures keep the original API's 200-with-code
/// contract; anything else is a plain 500.
fn dispatch_error_response(e: CourierError) -> Response {
    match e {
        CourierError::NotReady { pairing_available } => Json(ApiError {
            error: true,
            code: "CLIENT_NOT_READY",
            message: "messaging session is not ready, pair the account first".into(),
            pairing_code_available: Some(pairing_available),
        })
        .into_response(),
        CourierError::InvalidInput(message) => {
            let code = if message.contains("recipients") {
                "INVALID_RECIPIENTS"
            } else {
                "INVALID_MESSAGE"
            };
            Json(ApiError {
                error: true,
                code,
                message,
                pairing_code_available: None,
            })
            .into_response()
        }
        other => {
            warn!(error = %other, "dispatch failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError {
                    error: true,
                    code: "INTERNAL_ERROR",
                    message: other.to_string(),
                    pairing_code_available: None,
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(issued_at: DateTime<Utc>) -> PairingArtifact {
        PairingArtifact {
            code: "2@AhF9q7".into(),
            issued_at,
            svg_data_url: None,
            sequence: 3,
        }
    }

    #[test]
    fn expiry_counts_down_and_floors_at_zero() {
        let issued = Utc::now();
        let a = artifact(issued);
        assert_eq!(expires_in_secs(&a, issued), 120);
        assert_eq!(expires_in_secs(&a, issued + chrono::Duration::seconds(45)), 75);
        assert_eq!(expires_in_secs(&a, issued + chrono::Duration::seconds(120)), 0);
        assert_eq!(expires_in_secs(&a, issued + chrono::Duration::seconds(999)), 0);
    }

    #[test]
    fn coarse_status_maps_phases() {
        assert_eq!(coarse_status(SessionPhase::Uninitialized), "starting");
        assert_eq!(coarse_status(SessionPhase::Ready), "ready");
        assert_eq!(coarse_status(SessionPhase::Initializing), "initializing");
        assert_eq!(coarse_status(SessionPhase::AwaitingPairing), "initializing");
        assert_eq!(coarse_status(SessionPhase::Disconnected), "initializing");
    }

    #[test]
    fn send_request_deserializes_with_defaults() {
        let req: SendMessageRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert!(req.recipients.is_empty());
        assert!(req.message.is_empty());

        let req: SendMessageRequest = serde_json::from_str(
            r#"{"recipients":[{"phone":"0612345678","name":"Kim"}],"message":"hi"}"#,
        )
        .unwrap();
        assert_eq!(req.recipients[0].phone, "0612345678");
        assert_eq!(req.recipients[0].name.as_deref(), Some("Kim"));
    }

    #[test]
    fn scan_required_response_serializes_flat() {
        let response = PairingResponse::ScanRequired {
            status: "scan_required",
            pairing_code: "2@AhF9q7".into(),
            message: "scan it",
            instructions: ["1", "2", "3", "4"],
            issued_at: Utc::now(),
            expires_in_secs: 88,
            code_number: 3,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"scan_required\""));
        assert!(json.contains("\"expires_in_secs\":88"));
        assert!(json.contains("\"code_number\":3"));
    }

    #[test]
    fn api_error_omits_absent_pairing_flag() {
        let e = ApiError {
            error: true,
            code: "INVALID_MESSAGE",
            message: "message body is empty".into(),
            pairing_code_available: None,
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(!json.contains("pairing_code_available"));

        let e = ApiError {
            error: true,
            code: "CLIENT_NOT_READY",
            message: "not ready".into(),
            pairing_code_available: Some(true),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"pairing_code_available\":true"));
    }
}
