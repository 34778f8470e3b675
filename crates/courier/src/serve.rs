// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier serve` command implementation.
//!
//! Wires the full service together: status storage, transport bridge
//! client with its event feed, the session actor, the dispatcher, and the
//! HTTP gateway. Runs until a shutdown signal arrives, then tears the
//! session down cleanly.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use courier_config::CourierConfig;
use courier_core::{CourierError, ServiceStats, StatusPublisher, TransportAdapter};
use courier_dispatch::Dispatcher;
use courier_gateway::{GatewayState, ServerConfig, start_server};
use courier_storage::SqliteStatusPublisher;
use courier_transport::{BridgeTransport, EventPump};

use crate::shutdown;

/// Wait before requesting the first session start, giving the bridge and
/// the gateway a moment to come up so early pairing events are not lost.
const STARTUP_DELAY: Duration = Duration::from_secs(5);

/// Capacity of the transport-to-session event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Runs the `courier serve` command.
pub async fn run_serve(config: CourierConfig) -> Result<(), CourierError> {
    init_tracing(&config.service.log_level);

    info!(
        service = config.service.name.as_str(),
        bridge = config.transport.bridge_url.as_str(),
        "starting courier serve"
    );

    let stats = Arc::new(ServiceStats::new());

    let publisher = Arc::new(SqliteStatusPublisher::new(
        config.storage.database_path.clone(),
        config.transport.version.clone(),
        config.service.origin.clone(),
    ));
    // Status storage is best-effort; an unreachable database delays nothing.
    match publisher.probe().await {
        Ok(()) => info!(path = config.storage.database_path.as_str(), "status storage ready"),
        Err(e) => warn!(error = %e, "status storage unreachable at startup, continuing"),
    }

    let transport = Arc::new(BridgeTransport::new(&config.transport.bridge_url)?);

    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let _event_pump = EventPump::spawn(transport.as_ref(), events_tx);

    let session = courier_session::spawn(
        transport.clone() as Arc<dyn TransportAdapter>,
        publisher.clone() as Arc<dyn StatusPublisher>,
        stats.clone(),
        events_rx,
    );

    let dispatcher = Arc::new(Dispatcher::new(
        transport as Arc<dyn TransportAdapter>,
        session.watch(),
        stats.clone(),
    ));

    let shutdown_token = shutdown::install_signal_handler();

    // The session starts on its own schedule; the gateway is usable (status,
    // pairing polling) immediately.
    let starter = session.clone();
    tokio::spawn(async move {
        tokio::time::sleep(STARTUP_DELAY).await;
        if let Err(e) = starter.start().await {
            error!(error = %e, "failed to start messaging session");
        }
    });

    let state = GatewayState {
        session: session.clone(),
        dispatcher,
        stats,
        started_at: Instant::now(),
        service_name: config.service.name.clone(),
    };
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    start_server(&server_config, state, shutdown_token).await?;

    info!("gateway stopped, shutting down session");
    if let Err(e) = session.shutdown().await {
        warn!(error = %e, "session shutdown incomplete");
    }
    info!("courier stopped");

    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("courier={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
