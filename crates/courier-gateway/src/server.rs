// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state, and runs until the
//! shutdown token fires.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::routing::{get, post};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use courier_core::{CourierError, ServiceStats};
use courier_dispatch::Dispatcher;
use courier_session::SessionHandle;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Read-only view plus control channel into the session actor.
    pub session: SessionHandle,
    /// Batch dispatch entry point.
    pub dispatcher: Arc<Dispatcher>,
    /// Process-lifetime counters.
    pub stats: Arc<ServiceStats>,
    /// Process start time for uptime reporting.
    pub started_at: Instant,
    /// Service name shown in banner and status responses.
    pub service_name: String,
}

/// Gateway server configuration (mirrors ServerConfig from courier-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Builds the full route tree.
///
/// CORS is permissive: the consumer is a browser dashboard on another
/// origin and the API carries no credentials.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(handlers::get_banner))
        .route("/api/status", get(handlers::get_status))
        .route("/api/qr", get(handlers::get_pairing))
        .route("/api/qr/image", get(handlers::get_pairing_image))
        .route("/api/send-message", post(handlers::post_send_message))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Starts the gateway and serves until `shutdown` is cancelled.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), CourierError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CourierError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| CourierError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::TransportAdapter;

    struct NullTransport;

    #[async_trait::async_trait]
    impl TransportAdapter for NullTransport {
        async fn connect(&self) -> Result<(), CourierError> {
            Ok(())
        }
        async fn send_message(&self, _address: &str, _body: &str) -> Result<(), CourierError> {
            Ok(())
        }
        async fn destroy(&self) -> Result<(), CourierError> {
            Ok(())
        }
    }

    struct NullPublisher;

    #[async_trait::async_trait]
    impl courier_core::StatusPublisher for NullPublisher {
        async fn publish(&self, _update: courier_core::StatusUpdate) -> Result<(), CourierError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn state_wires_up_and_router_builds() {
        let transport: Arc<dyn TransportAdapter> = Arc::new(NullTransport);
        let stats = Arc::new(ServiceStats::new());
        let (_events_tx, events_rx) = tokio::sync::mpsc::channel(4);
        let session = courier_session::spawn(
            transport.clone(),
            Arc::new(NullPublisher),
            stats.clone(),
            events_rx,
        );
        let dispatcher = Arc::new(Dispatcher::new(transport, session.watch(), stats.clone()));

        let state = GatewayState {
            session,
            dispatcher,
            stats,
            started_at: Instant::now(),
            service_name: "courier".into(),
        };
        let _cloned = state.clone();
        let _router = router(state);
    }
}
