// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-writer session actor.
//!
//! The actor owns every piece of mutable session state (phase, pairing
//! artifact, connection info, retry context) and is the only task that
//! mutates it. Transport events, timer expirations, and control commands
//! all arrive over channels and are consumed one at a time, so an event
//! racing a timer can never produce a torn composite state.
//!
//! Scheduled restarts (init backoff, auth cool-down, reconnect delay) are
//! cancellable timer tasks owned by the actor: every transition cancels the
//! pending timer before installing a new one, and each expiry message
//! carries a generation number so a cancelled timer that already fired is
//! recognized as stale and dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use courier_core::{
    ConnectionInfo, CourierError, PairingArtifact, ServiceStats, SessionPhase, StatusPublisher,
    StatusSnapshot, StatusUpdate, TransportAdapter, TransportEvent,
};

use crate::backoff::{
    AUTH_FAILURE_COOLDOWN, INIT_RETRY_CEILING, RECONNECT_DELAY, init_retry_delay,
};
use crate::handle::SessionHandle;
use crate::render;

/// Longest error message retained for status reporting.
const MAX_ERROR_LEN: usize = 256;

/// Control commands accepted by the actor.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    /// Explicit start request (Uninitialized -> Initializing).
    Start,
    /// Orderly teardown; acked once the transport is destroyed.
    Shutdown(oneshot::Sender<()>),
}

/// Which scheduled restart a timer drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    /// Backoff before re-attempting `connect()` while Initializing.
    InitRetry,
    /// Cool-down after an authentication failure.
    AuthCooldown,
    /// Delay before reconnecting after a disconnect.
    Reconnect,
}

/// Messages the actor sends itself from spawned tasks.
#[derive(Debug)]
enum InternalEvent {
    /// Outcome of a spawned `connect()` call.
    InitResult(Result<(), CourierError>),
    /// A scheduled timer expired. Stale generations are ignored.
    TimerFired(TimerKind, u64),
}

/// Failure bookkeeping. `attempts` resets to zero only on entering Ready;
/// authentication failures are counted separately and never feed the
/// init-retry ceiling.
#[derive(Debug, Default)]
struct RetryContext {
    attempts: u32,
    auth_failures: u32,
    last_error: Option<String>,
}

/// The session state machine. Constructed and consumed by [`spawn`].
struct SessionActor {
    transport: Arc<dyn TransportAdapter>,
    publisher: Arc<dyn StatusPublisher>,
    stats: Arc<ServiceStats>,

    phase: SessionPhase,
    pairing: Option<PairingArtifact>,
    connection: Option<ConnectionInfo>,
    retry: RetryContext,
    /// Monotonic pairing-code issue counter; never reset.
    pairing_sequence: u64,

    pending_timer: Option<(TimerKind, JoinHandle<()>)>,
    timer_generation: u64,

    internal_tx: mpsc::Sender<InternalEvent>,
    status_tx: watch::Sender<StatusSnapshot>,
}

/// Spawns the session actor and returns a handle to it.
///
/// `events_rx` is the transport adapter's lifecycle-event feed; the actor
/// is its single consumer.
pub fn spawn(
    transport: Arc<dyn TransportAdapter>,
    publisher: Arc<dyn StatusPublisher>,
    stats: Arc<ServiceStats>,
    events_rx: mpsc::Receiver<TransportEvent>,
) -> SessionHandle {
    let (commands_tx, commands_rx) = mpsc::channel(16);
    let (internal_tx, internal_rx) = mpsc::channel(16);
    let (status_tx, status_rx) = watch::channel(StatusSnapshot::uninitialized());

    let actor = SessionActor {
        transport,
        publisher,
        stats,
        phase: SessionPhase::Uninitialized,
        pairing: None,
        connection: None,
        retry: RetryContext::default(),
        pairing_sequence: 0,
        pending_timer: None,
        timer_generation: 0,
        internal_tx,
        status_tx,
    };

    tokio::spawn(actor.run(commands_rx, events_rx, internal_rx));

    SessionHandle {
        commands: commands_tx,
        status_rx,
    }
}

impl SessionActor {
    async fn run(
        mut self,
        mut commands_rx: mpsc::Receiver<SessionCommand>,
        mut events_rx: mpsc::Receiver<TransportEvent>,
        mut internal_rx: mpsc::Receiver<InternalEvent>,
    ) {
        loop {
            tokio::select! {
                maybe_cmd = commands_rx.recv() => {
                    match maybe_cmd {
                        Some(cmd) => {
                            if self.handle_command(cmd).await {
                                break;
                            }
                        }
                        None => {
                            debug!("all session handles dropped, stopping actor");
                            break;
                        }
                    }
                }
                maybe_event = events_rx.recv() => {
                    match maybe_event {
                        Some(event) => self.handle_event(event),
                        None => {
                            error!("transport event feed closed, stopping actor");
                            break;
                        }
                    }
                }
                maybe_internal = internal_rx.recv() => {
                    // The actor holds a sender clone, so this arm never sees None
                    // while the loop runs.
                    if let Some(internal) = maybe_internal {
                        self.handle_internal(internal);
                    }
                }
            }
        }
        self.cancel_timer();
    }

    /// Returns true when the actor should stop.
    async fn handle_command(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::Start => {
                match self.phase {
                    SessionPhase::Uninitialized => {
                        info!("starting messaging session");
                        self.begin_initializing();
                    }
                    // An explicit start from a failed state skips whatever
                    // restart timer is pending and re-initializes now.
                    SessionPhase::AuthFailed | SessionPhase::Disconnected => {
                        info!(phase = %self.phase, "restarting messaging session");
                        self.cancel_timer();
                        self.begin_initializing();
                    }
                    _ => {
                        debug!(phase = %self.phase, "start ignored, session already running");
                    }
                }
                false
            }
            SessionCommand::Shutdown(ack) => {
                info!("session shutdown requested");
                self.cancel_timer();
                if let Err(e) = self.transport.destroy().await {
                    warn!(error = %e, "transport destroy failed during shutdown");
                }
                let _ = ack.send(());
                true
            }
        }
    }

    fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::PairingCodeIssued(code) => self.on_pairing_code(code),
            TransportEvent::Authenticated => self.on_authenticated(),
            TransportEvent::AuthFailed(reason) => self.on_auth_failed(reason),
            TransportEvent::Ready(info) => self.on_ready(info),
            TransportEvent::Disconnected(reason) => self.on_disconnected(reason),
        }
    }

    fn on_pairing_code(&mut self, code: String) {
        // Re-issue while AwaitingPairing replaces the live artifact; the
        // engine rotates codes until one is scanned.
        if !matches!(
            self.phase,
            SessionPhase::Initializing | SessionPhase::AwaitingPairing
        ) {
            debug!(phase = %self.phase, "ignoring pairing code outside initialization");
            return;
        }

        self.cancel_timer();
        self.pairing_sequence += 1;
        self.stats.record_pairing_code();

        let svg_data_url = render::pairing_svg_data_url(&code);
        self.pairing = Some(PairingArtifact {
            code,
            issued_at: Utc::now(),
            svg_data_url,
            sequence: self.pairing_sequence,
        });
        self.phase = SessionPhase::AwaitingPairing;

        info!(sequence = self.pairing_sequence, "pairing code issued");
        self.publish_snapshot();
        self.publish_status("qr_code_generated", None);
    }

    fn on_authenticated(&mut self) {
        if self.phase != SessionPhase::AwaitingPairing {
            debug!(phase = %self.phase, "ignoring authenticated event");
            return;
        }

        self.cancel_timer();
        self.pairing = None;
        self.phase = SessionPhase::Authenticated;

        info!("session authenticated");
        self.publish_snapshot();
        self.publish_status("authenticated", None);
    }

    fn on_auth_failed(&mut self, reason: String) {
        if !matches!(
            self.phase,
            SessionPhase::Initializing | SessionPhase::AwaitingPairing
        ) {
            debug!(phase = %self.phase, "ignoring auth failure event");
            return;
        }

        self.cancel_timer();
        self.pairing = None;
        self.retry.auth_failures += 1;
        self.stats.record_error();
        self.retry.last_error = Some(bounded(format!("authentication failed: {reason}")));
        self.phase = SessionPhase::AuthFailed;

        warn!(reason = reason.as_str(), "authentication failed, restarting after cool-down");
        self.publish_snapshot();
        self.publish_status("auth_failed", None);
        self.schedule_timer(TimerKind::AuthCooldown, AUTH_FAILURE_COOLDOWN);
    }

    fn on_ready(&mut self, info: ConnectionInfo) {
        if self.phase != SessionPhase::Authenticated {
            debug!(phase = %self.phase, "ignoring ready event");
            return;
        }

        self.cancel_timer();
        let account = info.account_id.clone();
        self.connection = Some(info);
        self.retry.attempts = 0;
        self.retry.last_error = None;
        self.phase = SessionPhase::Ready;

        info!(account = account.as_str(), "session ready");
        self.publish_snapshot();
        self.publish_status("connected", Some(account));
    }

    fn on_disconnected(&mut self, reason: String) {
        if self.phase != SessionPhase::Ready {
            debug!(phase = %self.phase, "ignoring disconnect event");
            return;
        }

        self.cancel_timer();
        self.connection = None;
        self.stats.record_error();
        self.retry.last_error = Some(bounded(format!("disconnected: {reason}")));
        self.phase = SessionPhase::Disconnected;

        warn!(reason = reason.as_str(), "session disconnected, reconnect scheduled");
        self.publish_snapshot();
        self.publish_status("disconnected", None);
        self.schedule_timer(TimerKind::Reconnect, RECONNECT_DELAY);
    }

    fn handle_internal(&mut self, internal: InternalEvent) {
        match internal {
            InternalEvent::InitResult(Ok(())) => {
                debug!("transport connect accepted");
            }
            InternalEvent::InitResult(Err(e)) => self.on_init_failure(e),
            InternalEvent::TimerFired(kind, generation) => self.on_timer(kind, generation),
        }
    }

    fn on_init_failure(&mut self, e: CourierError) {
        if self.phase != SessionPhase::Initializing {
            // A transport event already moved the session on; the stale
            // connect result is irrelevant.
            debug!(phase = %self.phase, error = %e, "ignoring late connect failure");
            return;
        }

        self.retry.attempts += 1;
        self.stats.record_error();
        self.retry.last_error = Some(bounded(format!("initialization failed: {e}")));

        if self.retry.attempts >= INIT_RETRY_CEILING {
            // Deliberate fail-stop: no further timers. The stall is
            // diagnosable through the status snapshot only.
            error!(
                attempts = self.retry.attempts,
                "initialization retry ceiling reached, manual restart required"
            );
            let abandoned = CourierError::RetriesExhausted {
                attempts: self.retry.attempts,
            };
            self.retry.last_error = Some(bounded(format!("{abandoned}: {e}")));
            self.publish_snapshot();
            return;
        }

        let delay = init_retry_delay(self.retry.attempts);
        warn!(
            attempt = self.retry.attempts,
            delay_secs = delay.as_secs(),
            error = %e,
            "initialization failed, retry scheduled"
        );
        self.publish_snapshot();
        self.schedule_timer(TimerKind::InitRetry, delay);
    }

    fn on_timer(&mut self, kind: TimerKind, generation: u64) {
        if self.pending_timer.is_none() || generation != self.timer_generation {
            debug!(?kind, "ignoring stale timer");
            return;
        }
        self.pending_timer = None;

        match kind {
            TimerKind::InitRetry => {
                if self.phase == SessionPhase::Initializing {
                    self.start_connect();
                }
            }
            TimerKind::AuthCooldown => {
                if self.phase == SessionPhase::AuthFailed {
                    info!("auth cool-down elapsed, restarting session");
                    self.begin_initializing();
                }
            }
            TimerKind::Reconnect => {
                if self.phase == SessionPhase::Disconnected {
                    info!("reconnect delay elapsed, restarting session");
                    self.begin_initializing();
                }
            }
        }
    }

    fn begin_initializing(&mut self) {
        self.phase = SessionPhase::Initializing;
        self.publish_snapshot();
        self.start_connect();
    }

    /// Runs `connect()` off the actor so events stay consumable while the
    /// engine starts; the outcome comes back as an internal message.
    fn start_connect(&self) {
        let transport = self.transport.clone();
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = transport.connect().await;
            let _ = tx.send(InternalEvent::InitResult(result)).await;
        });
    }

    fn schedule_timer(&mut self, kind: TimerKind, delay: Duration) {
        self.cancel_timer();
        self.timer_generation += 1;
        let generation = self.timer_generation;
        let tx = self.internal_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(InternalEvent::TimerFired(kind, generation)).await;
        });
        self.pending_timer = Some((kind, handle));
        debug!(?kind, delay_secs = delay.as_secs(), "timer scheduled");
    }

    fn cancel_timer(&mut self) {
        if let Some((kind, handle)) = self.pending_timer.take() {
            handle.abort();
            debug!(?kind, "pending timer cancelled");
        }
    }

    fn publish_snapshot(&self) {
        let _ = self.status_tx.send(StatusSnapshot {
            phase: self.phase,
            pairing: self.pairing.clone(),
            connection: self.connection.clone(),
            last_error: self.retry.last_error.clone(),
            retry_attempt: self.retry.attempts,
            auth_failures: self.retry.auth_failures,
        });
    }

    /// Mirrors the transition into storage on a detached task. Publish
    /// failures are logged and swallowed; they never touch session state.
    fn publish_status(&self, status: &'static str, account: Option<String>) {
        let publisher = self.publisher.clone();
        let stats = self.stats.clone();
        tokio::spawn(async move {
            stats.record_status_write();
            if let Err(e) = publisher.publish(StatusUpdate { status, account }).await {
                warn!(error = %e, status, "status publish failed (ignored)");
            }
        });
    }
}

fn bounded(mut message: String) -> String {
    if message.len() > MAX_ERROR_LEN {
        // The reason text comes off the wire and may be multi-byte; cut on
        // a char boundary so truncate cannot panic mid-codepoint.
        let mut cut = MAX_ERROR_LEN;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport whose connect() outcomes are scripted per call.
    struct ScriptedTransport {
        connect_results: Mutex<VecDeque<Result<(), CourierError>>>,
        connect_calls: AtomicUsize,
        destroy_calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(results: Vec<Result<(), CourierError>>) -> Arc<Self> {
            Arc::new(Self {
                connect_results: Mutex::new(results.into()),
                connect_calls: AtomicUsize::new(0),
                destroy_calls: AtomicUsize::new(0),
            })
        }

        fn connect_calls(&self) -> usize {
            self.connect_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TransportAdapter for ScriptedTransport {
        async fn connect(&self) -> Result<(), CourierError> {
            self.connect_calls.fetch_add(1, Ordering::SeqCst);
            self.connect_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()))
        }

        async fn send_message(&self, _address: &str, _body: &str) -> Result<(), CourierError> {
            Ok(())
        }

        async fn destroy(&self) -> Result<(), CourierError> {
            self.destroy_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Publisher that records every update.
    #[derive(Default)]
    struct RecordingPublisher {
        updates: Mutex<Vec<StatusUpdate>>,
    }

    impl RecordingPublisher {
        fn statuses(&self) -> Vec<&'static str> {
            self.updates.lock().unwrap().iter().map(|u| u.status).collect()
        }
    }

    #[async_trait]
    impl StatusPublisher for RecordingPublisher {
        async fn publish(&self, update: StatusUpdate) -> Result<(), CourierError> {
            self.updates.lock().unwrap().push(update);
            Ok(())
        }
    }

    struct Harness {
        handle: SessionHandle,
        events: mpsc::Sender<TransportEvent>,
        transport: Arc<ScriptedTransport>,
        publisher: Arc<RecordingPublisher>,
        stats: Arc<ServiceStats>,
    }

    fn harness(connect_results: Vec<Result<(), CourierError>>) -> Harness {
        let transport = ScriptedTransport::new(connect_results);
        let publisher = Arc::new(RecordingPublisher::default());
        let stats = Arc::new(ServiceStats::new());
        let (events_tx, events_rx) = mpsc::channel(16);
        let handle = spawn(
            transport.clone(),
            publisher.clone(),
            stats.clone(),
            events_rx,
        );
        Harness {
            handle,
            events: events_tx,
            transport,
            publisher,
            stats,
        }
    }

    fn transport_err(msg: &str) -> CourierError {
        CourierError::Transport {
            message: msg.into(),
            source: None,
        }
    }

    fn ready_info() -> ConnectionInfo {
        ConnectionInfo {
            account_id: "31612345678".into(),
            display_name: Some("Tour Van".into()),
            transport_version: Some("2.2412.54".into()),
        }
    }

    /// Lets the actor and its spawned tasks drain. Under `start_paused`,
    /// the sleep auto-advances once the runtime is idle.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    /// Drives a fresh harness to Ready through the full pairing flow.
    async fn drive_to_ready(h: &Harness) {
        h.handle.start().await.unwrap();
        settle().await;
        h.events
            .send(TransportEvent::PairingCodeIssued("code-1".into()))
            .await
            .unwrap();
        h.events.send(TransportEvent::Authenticated).await.unwrap();
        h.events
            .send(TransportEvent::Ready(ready_info()))
            .await
            .unwrap();
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_connects_and_moves_to_initializing() {
        let h = harness(vec![]);
        assert_eq!(h.handle.status().phase, SessionPhase::Uninitialized);

        h.handle.start().await.unwrap();
        settle().await;

        assert_eq!(h.handle.status().phase, SessionPhase::Initializing);
        assert_eq!(h.transport.connect_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent() {
        let h = harness(vec![]);
        h.handle.start().await.unwrap();
        h.handle.start().await.unwrap();
        settle().await;
        assert_eq!(h.transport.connect_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_while_disconnected_restarts_immediately() {
        let h = harness(vec![]);
        drive_to_ready(&h).await;

        h.events
            .send(TransportEvent::Disconnected("conflict".into()))
            .await
            .unwrap();
        settle().await;
        assert_eq!(h.handle.status().phase, SessionPhase::Disconnected);

        // Explicit start short-circuits the 15 s reconnect wait.
        h.handle.start().await.unwrap();
        settle().await;
        assert_eq!(h.handle.status().phase, SessionPhase::Initializing);
        assert_eq!(h.transport.connect_calls(), 2);

        // The superseded reconnect timer never fires a third connect.
        tokio::time::sleep(RECONNECT_DELAY * 4).await;
        assert_eq!(h.transport.connect_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pairing_flow_reaches_ready() {
        let h = harness(vec![]);
        h.handle.start().await.unwrap();
        settle().await;

        h.events
            .send(TransportEvent::PairingCodeIssued("code-1".into()))
            .await
            .unwrap();
        settle().await;
        let snap = h.handle.status();
        assert_eq!(snap.phase, SessionPhase::AwaitingPairing);
        let artifact = snap.pairing.expect("artifact present while awaiting pairing");
        assert_eq!(artifact.code, "code-1");
        assert_eq!(artifact.sequence, 1);
        assert_eq!(h.stats.snapshot().pairing_codes_issued, 1);

        h.events.send(TransportEvent::Authenticated).await.unwrap();
        settle().await;
        let snap = h.handle.status();
        assert_eq!(snap.phase, SessionPhase::Authenticated);
        assert!(snap.pairing.is_none(), "artifact cleared on authentication");

        h.events
            .send(TransportEvent::Ready(ready_info()))
            .await
            .unwrap();
        settle().await;
        let snap = h.handle.status();
        assert_eq!(snap.phase, SessionPhase::Ready);
        assert_eq!(
            snap.connection.as_ref().map(|c| c.account_id.as_str()),
            Some("31612345678")
        );
        assert_eq!(snap.retry_attempt, 0);
        assert!(snap.last_error.is_none());

        assert_eq!(
            h.publisher.statuses(),
            vec!["qr_code_generated", "authenticated", "connected"]
        );
        let updates = h.publisher.updates.lock().unwrap();
        assert_eq!(
            updates.last().unwrap().account.as_deref(),
            Some("31612345678")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reissued_pairing_code_replaces_the_artifact() {
        let h = harness(vec![]);
        h.handle.start().await.unwrap();
        settle().await;
        h.events
            .send(TransportEvent::PairingCodeIssued("code-1".into()))
            .await
            .unwrap();
        h.events
            .send(TransportEvent::PairingCodeIssued("code-2".into()))
            .await
            .unwrap();
        settle().await;

        let artifact = h.handle.status().pairing.unwrap();
        assert_eq!(artifact.code, "code-2");
        assert_eq!(artifact.sequence, 2);
        assert_eq!(h.stats.snapshot().pairing_codes_issued, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_phase_events_are_ignored() {
        let h = harness(vec![]);

        // Ready while Uninitialized must be a no-op, not a crash.
        h.events
            .send(TransportEvent::Ready(ready_info()))
            .await
            .unwrap();
        h.events.send(TransportEvent::Authenticated).await.unwrap();
        h.events
            .send(TransportEvent::Disconnected("nav".into()))
            .await
            .unwrap();
        settle().await;

        let snap = h.handle.status();
        assert_eq!(snap.phase, SessionPhase::Uninitialized);
        assert!(snap.connection.is_none());
        assert!(h.publisher.statuses().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_schedules_reconnect() {
        let h = harness(vec![]);
        drive_to_ready(&h).await;
        assert_eq!(h.transport.connect_calls(), 1);

        h.events
            .send(TransportEvent::Disconnected("conflict".into()))
            .await
            .unwrap();
        settle().await;

        let snap = h.handle.status();
        assert_eq!(snap.phase, SessionPhase::Disconnected);
        assert!(snap.connection.is_none(), "connection cleared on disconnect");
        assert!(snap.last_error.as_deref().unwrap().contains("conflict"));
        // Disconnects never touch the init attempt counter.
        assert_eq!(snap.retry_attempt, 0);

        // After the fixed reconnect delay the session re-initializes.
        tokio::time::sleep(RECONNECT_DELAY + Duration::from_secs(1)).await;
        assert_eq!(h.handle.status().phase, SessionPhase::Initializing);
        assert_eq!(h.transport.connect_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_failure_cools_down_then_restarts() {
        let h = harness(vec![]);
        h.handle.start().await.unwrap();
        settle().await;
        h.events
            .send(TransportEvent::PairingCodeIssued("code-1".into()))
            .await
            .unwrap();
        h.events
            .send(TransportEvent::AuthFailed("bad credentials".into()))
            .await
            .unwrap();
        settle().await;

        let snap = h.handle.status();
        assert_eq!(snap.phase, SessionPhase::AuthFailed);
        assert!(snap.pairing.is_none(), "artifact cleared on auth failure");
        assert_eq!(snap.auth_failures, 1);
        assert_eq!(snap.retry_attempt, 0, "auth failures bypass the init counter");

        tokio::time::sleep(AUTH_FAILURE_COOLDOWN + Duration::from_secs(1)).await;
        assert_eq!(h.handle.status().phase, SessionPhase::Initializing);
        assert_eq!(h.transport.connect_calls(), 2);
        assert_eq!(
            h.publisher.statuses(),
            vec!["qr_code_generated", "auth_failed"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn init_failures_back_off_then_fail_stop() {
        let h = harness(vec![
            Err(transport_err("engine down")),
            Err(transport_err("engine down")),
            Err(transport_err("engine down")),
            Err(transport_err("engine down")),
            Err(transport_err("engine down")),
        ]);
        h.handle.start().await.unwrap();
        settle().await;
        assert_eq!(h.handle.status().retry_attempt, 1);

        // Attempt n is retried after min(30s * n, 300s).
        for expected_attempt in 2..=5u32 {
            let delay = init_retry_delay(expected_attempt - 1);
            tokio::time::sleep(delay + Duration::from_secs(1)).await;
            assert_eq!(h.handle.status().retry_attempt, expected_attempt);
        }

        let snap = h.handle.status();
        assert_eq!(snap.phase, SessionPhase::Initializing);
        assert!(snap.last_error.as_deref().unwrap().contains("abandoned"));

        // Fail-stop: no further attempts no matter how long we wait.
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(h.transport.connect_calls(), 5);
        assert_eq!(h.handle.status().retry_attempt, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn ready_resets_the_retry_counter() {
        let h = harness(vec![Err(transport_err("first try fails"))]);
        h.handle.start().await.unwrap();
        settle().await;
        assert_eq!(h.handle.status().retry_attempt, 1);

        // The retry succeeds and the pairing flow completes.
        tokio::time::sleep(init_retry_delay(1) + Duration::from_secs(1)).await;
        h.events
            .send(TransportEvent::PairingCodeIssued("code-1".into()))
            .await
            .unwrap();
        h.events.send(TransportEvent::Authenticated).await.unwrap();
        h.events
            .send(TransportEvent::Ready(ready_info()))
            .await
            .unwrap();
        settle().await;

        let snap = h.handle.status();
        assert_eq!(snap.phase, SessionPhase::Ready);
        assert_eq!(snap.retry_attempt, 0);
        assert!(snap.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn pairing_code_cancels_a_pending_init_retry() {
        let h = harness(vec![Err(transport_err("slow engine"))]);
        h.handle.start().await.unwrap();
        settle().await;
        assert_eq!(h.handle.status().retry_attempt, 1);

        // The engine recovers on its own and issues a code before the
        // retry timer fires; the stale retry must not fire afterwards.
        h.events
            .send(TransportEvent::PairingCodeIssued("code-1".into()))
            .await
            .unwrap();
        settle().await;
        assert_eq!(h.handle.status().phase, SessionPhase::AwaitingPairing);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(h.transport.connect_calls(), 1, "cancelled retry never fired");
        assert_eq!(h.handle.status().phase, SessionPhase::AwaitingPairing);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_destroys_the_transport() {
        let h = harness(vec![]);
        drive_to_ready(&h).await;

        h.handle.shutdown().await.unwrap();
        assert_eq!(h.transport.destroy_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn publish_failures_never_disturb_state() {
        struct FailingPublisher;

        #[async_trait]
        impl StatusPublisher for FailingPublisher {
            async fn publish(&self, _update: StatusUpdate) -> Result<(), CourierError> {
                Err(CourierError::Storage {
                    source: Box::new(std::io::Error::other("db down")),
                })
            }
        }

        let transport = ScriptedTransport::new(vec![]);
        let stats = Arc::new(ServiceStats::new());
        let (events_tx, events_rx) = mpsc::channel(16);
        let handle = spawn(
            transport.clone(),
            Arc::new(FailingPublisher),
            stats.clone(),
            events_rx,
        );

        handle.start().await.unwrap();
        settle().await;
        events_tx
            .send(TransportEvent::PairingCodeIssued("code-1".into()))
            .await
            .unwrap();
        events_tx.send(TransportEvent::Authenticated).await.unwrap();
        events_tx
            .send(TransportEvent::Ready(ready_info()))
            .await
            .unwrap();
        settle().await;

        assert_eq!(handle.status().phase, SessionPhase::Ready);
        // Every publish was attempted despite failing.
        assert_eq!(stats.snapshot().status_writes, 3);
    }

    #[test]
    fn bounded_truncates_long_messages() {
        let long = "x".repeat(1000);
        assert_eq!(bounded(long).len(), MAX_ERROR_LEN);
        assert_eq!(bounded("short".into()), "short");
    }

    #[test]
    fn bounded_respects_char_boundaries() {
        // 100 euro signs are 300 bytes; the cut must land between
        // codepoints, not inside one.
        let truncated = bounded("\u{20ac}".repeat(100));
        assert!(truncated.len() <= MAX_ERROR_LEN);
        assert_eq!(truncated.len(), 255);
        assert!(truncated.chars().all(|c| c == '\u{20ac}'));
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_multibyte_disconnect_reason_is_survivable() {
        let h = harness(vec![]);
        drive_to_ready(&h).await;

        h.events
            .send(TransportEvent::Disconnected("\u{e9}".repeat(400)))
            .await
            .unwrap();
        settle().await;

        // The actor is still alive and the error was retained, bounded.
        let snap = h.handle.status();
        assert_eq!(snap.phase, SessionPhase::Disconnected);
        assert!(snap.last_error.as_deref().unwrap().len() <= MAX_ERROR_LEN);
        h.handle.start().await.unwrap();
    }
}
