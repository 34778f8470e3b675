// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the automation-engine bridge.
//!
//! The messaging engine itself is an opaque local process; the bridge wraps
//! it with a small HTTP API. Session control is plain POSTs, lifecycle
//! events come from a separate streamed feed (see [`crate::events`]).

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use courier_core::{CourierError, TransportAdapter};

/// Suffix turning a canonical digit-string into an engine chat id.
const CHAT_ID_SUFFIX: &str = "@c.us";

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    chat_id: String,
    body: &'a str,
}

/// [`TransportAdapter`] implementation against the engine bridge.
pub struct BridgeTransport {
    http: reqwest::Client,
    base_url: String,
}

impl BridgeTransport {
    /// `bridge_url` is the bridge's base URL, e.g. `http://127.0.0.1:8600`.
    pub fn new(bridge_url: &str) -> Result<Self, CourierError> {
        // No overall request timeout: connect() blocks while the engine
        // boots its browser session, which routinely takes tens of seconds.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| CourierError::Transport {
                message: format!("failed to build bridge http client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            http,
            base_url: bridge_url.trim_end_matches('/').to_string(),
        })
    }

    pub(crate) fn http(&self) -> reqwest::Client {
        self.http.clone()
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post(&self, path: &str, body: Option<&OutboundMessage<'_>>) -> Result<(), CourierError> {
        let mut req = self.http.post(self.url(path));
        if let Some(body) = body {
            req = req.json(body);
        }
        let response = req.send().await.map_err(|e| CourierError::Transport {
            message: format!("bridge request {path} failed: {e}"),
            source: Some(Box::new(e)),
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CourierError::Transport {
                message: format!("bridge request {path} returned {status}: {detail}"),
                source: None,
            });
        }
        debug!(path, "bridge request ok");
        Ok(())
    }
}

#[async_trait]
impl TransportAdapter for BridgeTransport {
    async fn connect(&self) -> Result<(), CourierError> {
        self.post("/session/connect", None).await
    }

    async fn send_message(&self, address: &str, body: &str) -> Result<(), CourierError> {
        let message = OutboundMessage {
            chat_id: format!("{address}{CHAT_ID_SUFFIX}"),
            body,
        };
        self.post("/messages", Some(&message)).await
    }

    async fn destroy(&self) -> Result<(), CourierError> {
        self.post("/session/destroy", None).await
    }
}
