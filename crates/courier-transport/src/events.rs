// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle-event feed from the engine bridge.
//!
//! The bridge publishes session lifecycle events as Server-Sent Events on
//! `GET /events`. [`parse_event_stream`] turns a reqwest response into
//! typed [`TransportEvent`]s; [`EventPump`] keeps a stream open for the
//! life of the process and forwards events into the session actor's
//! channel, reconnecting whenever the feed drops.

use std::pin::Pin;
use std::time::Duration;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use courier_core::{ConnectionInfo, CourierError, TransportEvent};

use crate::bridge::BridgeTransport;

/// Delay before re-opening a dropped event feed.
const RECONNECT_FEED_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct WirePairing {
    code: String,
}

#[derive(Debug, Deserialize)]
struct WireFailure {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct WireReady {
    account_id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireDisconnect {
    #[serde(default)]
    reason: String,
}

/// Parses a streaming bridge response into typed [`TransportEvent`]s.
///
/// Unknown event names are silently skipped so a newer bridge can add
/// events without breaking older services. Malformed payloads for known
/// events surface as `Err` items.
pub fn parse_event_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<TransportEvent, CourierError>> + Send>> {
    let event_stream = response.bytes_stream().eventsource();

    let mapped = event_stream.filter_map(|result| async move {
        match result {
            Ok(event) => {
                let parsed = match event.event.as_str() {
                    "qr" => serde_json::from_str::<WirePairing>(&event.data)
                        .map(|p| TransportEvent::PairingCodeIssued(p.code))
                        .map_err(|e| parse_error("qr", e)),
                    "authenticated" => Ok(TransportEvent::Authenticated),
                    "auth_failure" => serde_json::from_str::<WireFailure>(&event.data)
                        .map(|f| TransportEvent::AuthFailed(f.message))
                        .map_err(|e| parse_error("auth_failure", e)),
                    "ready" => serde_json::from_str::<WireReady>(&event.data)
                        .map(|r| {
                            TransportEvent::Ready(ConnectionInfo {
                                account_id: r.account_id,
                                display_name: r.display_name,
                                transport_version: r.version,
                            })
                        })
                        .map_err(|e| parse_error("ready", e)),
                    "disconnected" => serde_json::from_str::<WireDisconnect>(&event.data)
                        .map(|d| TransportEvent::Disconnected(d.reason))
                        .map_err(|e| parse_error("disconnected", e)),
                    // Keep-alives and future event types.
                    _ => return None,
                };
                Some(parsed)
            }
            Err(e) => Some(Err(CourierError::Transport {
                message: format!("event feed stream error: {e}"),
                source: None,
            })),
        }
    });

    Box::pin(mapped)
}

fn parse_error(name: &str, e: serde_json::Error) -> CourierError {
    CourierError::Transport {
        message: format!("malformed {name} event: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Long-running feed consumer.
///
/// Runs until the session actor drops its receiver. A dropped feed is
/// reported downstream as a `Disconnected` event (the state machine ignores
/// it unless the session was Ready) and the feed is re-opened after a short
/// delay.
pub struct EventPump {
    http: reqwest::Client,
    events_url: String,
    tx: mpsc::Sender<TransportEvent>,
}

impl EventPump {
    pub fn spawn(transport: &BridgeTransport, tx: mpsc::Sender<TransportEvent>) -> JoinHandle<()> {
        let pump = Self {
            http: transport.http(),
            events_url: transport.url("/events"),
            tx,
        };
        tokio::spawn(pump.run())
    }

    async fn run(self) {
        loop {
            match self.http.get(&self.events_url).send().await {
                Ok(response) if response.status().is_success() => {
                    info!("event feed connected");
                    self.consume(response).await;
                }
                Ok(response) => {
                    warn!(status = %response.status(), "event feed rejected");
                }
                Err(e) => {
                    warn!(error = %e, "event feed unreachable");
                }
            }

            if self
                .tx
                .send(TransportEvent::Disconnected("event feed lost".into()))
                .await
                .is_err()
            {
                debug!("session actor gone, stopping event pump");
                return;
            }
            tokio::time::sleep(RECONNECT_FEED_DELAY).await;
        }
    }

    /// Forwards events until the stream ends or the receiver closes.
    async fn consume(&self, response: reqwest::Response) {
        let mut stream = parse_event_stream(response);
        while let Some(item) = stream.next().await {
            match item {
                Ok(event) => {
                    if self.tx.send(event).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    // Malformed payloads are skipped; a byte-stream error
                    // also ends the stream and triggers the reconnect path.
                    warn!(error = %e, "bad event on feed");
                }
            }
        }
        warn!("event feed closed");
    }
}
