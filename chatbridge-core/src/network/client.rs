//! Reconnecting WebSocket client.
//!
//! One lifecycle task per started client owns the connection. Callers
//! only touch the unbounded send queue and the liveness flag:
//!
//! ```text
//!  send() ──► SendQueue ──► sender loop ──► WsSink ──► remote
//!                                              remote ──► WsSource ──► receiver task ──► Diagnostics
//! ```
//!
//! Every transport failure is logged and followed by a backoff wait and
//! a fresh connect. Only `stop()` ends the lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::codec;
use crate::error::BridgeError;
use crate::host::{Diagnostics, TracingDiagnostics};
use crate::message::{InboundMessage, OutboundMessage, PROTOCOL_VERSION};
use crate::network::ws::{self, WsSink, WsSource};
use crate::state::{Backoff, BackoffPolicy, ConnectionPhase};

/// Default endpoint of the control process.
pub const DEFAULT_URL: &str = "ws://127.0.0.1:8080";

/// Largest inbound message accepted, in bytes.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

// ── ClientConfig ─────────────────────────────────────────────────

/// Transport client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint, `ws://` or `wss://`.
    pub url: String,
    /// Shared secret sent in the Hello frame when non-empty.
    pub secret: Option<String>,
    /// Inbound message / frame size cap.
    pub max_frame_size: usize,
    /// Deadline for the TCP connect plus the opening handshake.
    pub open_timeout: Duration,
    /// How long the sender waits on the queue before re-checking stop.
    pub sender_poll: Duration,
    /// Upper bound on how long `stop()` waits for the lifecycle task.
    pub stop_timeout: Duration,
    /// Reconnect delays.
    pub backoff: BackoffPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.into(),
            secret: None,
            max_frame_size: MAX_FRAME_SIZE,
            open_timeout: Duration::from_secs(10),
            sender_poll: Duration::from_millis(250),
            stop_timeout: Duration::from_secs(2),
            backoff: BackoffPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        Self {
            url: url.into(),
            secret: (!secret.is_empty()).then_some(secret),
            ..Self::default()
        }
    }
}

// ── Outbound seam ────────────────────────────────────────────────

/// Where the session driver puts outbound messages.
pub trait Outbound {
    /// Enqueue `message` without blocking.
    fn send(&self, message: OutboundMessage);

    /// Whether a connection is currently established.
    fn is_connected(&self) -> bool;
}

// ── BridgeClient ─────────────────────────────────────────────────

/// Items on the send queue.
#[derive(Debug)]
enum QueueItem {
    Message(OutboundMessage),
    Stop,
}

/// A running lifecycle task and its stop signal.
#[derive(Debug)]
struct Lifecycle {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Long-lived reconnecting client for a single endpoint.
pub struct BridgeClient {
    config: Arc<ClientConfig>,
    queue_tx: mpsc::UnboundedSender<QueueItem>,
    queue_rx: Arc<AsyncMutex<mpsc::UnboundedReceiver<QueueItem>>>,
    connected: Arc<AtomicBool>,
    lifecycle: Mutex<Option<Lifecycle>>,
    diagnostics: Arc<dyn Diagnostics>,
    /// False when the endpoint can never be connected to.
    deliverable: bool,
}

impl std::fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeClient")
            .field("url", &self.config.url)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl BridgeClient {
    /// Create a stopped client that reports protocol errors via `tracing`.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_diagnostics(config, Arc::new(TracingDiagnostics))
    }

    /// Create a stopped client that reports protocol errors to `diagnostics`.
    pub fn with_diagnostics(config: ClientConfig, diagnostics: Arc<dyn Diagnostics>) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let deliverable = ws::client_request(&config.url).is_ok();
        Self {
            config: Arc::new(config),
            queue_tx,
            queue_rx: Arc::new(AsyncMutex::new(queue_rx)),
            connected: Arc::new(AtomicBool::new(false)),
            lifecycle: Mutex::new(None),
            diagnostics,
            deliverable,
        }
    }

    /// Spawn the lifecycle task. Calling this while running is a no-op.
    ///
    /// Must be called from within a Tokio runtime. Fails only when the
    /// endpoint can never be connected to (not a WebSocket URL).
    pub fn start(&self) -> Result<(), BridgeError> {
        ws::client_request(&self.config.url)?;

        let mut slot = self.lock_lifecycle();
        if let Some(running) = slot.as_ref() {
            if !running.handle.is_finished() {
                debug!("client already running");
                return Ok(());
            }
        }

        let cancel = CancellationToken::new();
        let task = LifecycleTask {
            config: Arc::clone(&self.config),
            queue: Arc::clone(&self.queue_rx),
            connected: Arc::clone(&self.connected),
            diagnostics: Arc::clone(&self.diagnostics),
            cancel: cancel.clone(),
        };
        let handle = tokio::spawn(task.run());
        info!("bridge client started for {}", self.config.url);

        *slot = Some(Lifecycle { handle, cancel });
        Ok(())
    }

    /// Stop the lifecycle task and wait (bounded) for it to exit.
    ///
    /// Safe to call repeatedly or before `start()`. Afterwards the
    /// client is disconnected and may be started again.
    pub async fn stop(&self) {
        let running = self.lock_lifecycle().take();

        if let Some(Lifecycle { mut handle, cancel }) = running {
            cancel.cancel();
            // Wakes a sender blocked on an empty queue.
            let _ = self.queue_tx.send(QueueItem::Stop);

            match tokio::time::timeout(self.config.stop_timeout, &mut handle).await {
                Ok(Ok(())) => debug!("lifecycle task exited"),
                Ok(Err(e)) => error!("lifecycle task ended abnormally: {e}"),
                Err(_) => {
                    warn!(
                        "lifecycle task did not exit within {:?}; aborting",
                        self.config.stop_timeout
                    );
                    handle.abort();
                }
            }
            info!("bridge client stopped");
        }

        self.connected.store(false, Ordering::SeqCst);
    }

    /// Enqueue a message for delivery. Never blocks; failures are
    /// logged and swallowed.
    ///
    /// With an endpoint that is not a WebSocket URL nothing could ever
    /// drain the queue, so the message is dropped instead.
    pub fn send(&self, message: OutboundMessage) {
        if !self.deliverable {
            debug!("streaming unavailable; dropping {} message", message.kind());
            return;
        }
        if let Err(e) = self.queue_tx.send(QueueItem::Message(message)) {
            warn!("enqueue failed: {}", BridgeError::from(e));
        }
    }

    /// Current liveness.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Whether a lifecycle task is currently alive.
    pub fn is_running(&self) -> bool {
        self.lock_lifecycle()
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    fn lock_lifecycle(&self) -> std::sync::MutexGuard<'_, Option<Lifecycle>> {
        self.lifecycle
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Drop for BridgeClient {
    fn drop(&mut self) {
        let slot = self
            .lifecycle
            .get_mut()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(running) = slot.take() {
            debug!("client dropped while running; cancelling lifecycle");
            running.cancel.cancel();
        }
    }
}

impl Outbound for BridgeClient {
    fn send(&self, message: OutboundMessage) {
        BridgeClient::send(self, message);
    }

    fn is_connected(&self) -> bool {
        BridgeClient::is_connected(self)
    }
}

// ── Lifecycle task ───────────────────────────────────────────────

/// Why a streaming session ended.
#[derive(Debug, PartialEq, Eq)]
enum StreamEnd {
    Stopped,
    Disconnected,
}

/// State moved into the spawned lifecycle task.
struct LifecycleTask {
    config: Arc<ClientConfig>,
    queue: Arc<AsyncMutex<mpsc::UnboundedReceiver<QueueItem>>>,
    connected: Arc<AtomicBool>,
    diagnostics: Arc<dyn Diagnostics>,
    cancel: CancellationToken,
}

impl LifecycleTask {
    async fn run(self) {
        // Held for the whole lifecycle: the sender is the only consumer.
        let mut queue = tokio::select! {
            guard = self.queue.lock() => guard,
            _ = self.cancel.cancelled() => return,
        };
        let mut backoff = Backoff::new(self.config.backoff);
        let mut phase = ConnectionPhase::default();

        while !self.cancel.is_cancelled() {
            self.transition(&mut phase, ConnectionPhase::begin_connect);

            let connected = tokio::select! {
                result = ws::connect(
                    &self.config.url,
                    self.config.max_frame_size,
                    self.config.open_timeout,
                ) => result,
                _ = self.cancel.cancelled() => break,
            };

            match connected {
                Ok((mut sink, source)) => {
                    self.transition(&mut phase, ConnectionPhase::begin_handshake);
                    self.connected.store(true, Ordering::SeqCst);
                    backoff.reset();

                    match self.handshake(&mut sink).await {
                        Ok(()) => {
                            self.transition(&mut phase, ConnectionPhase::begin_streaming);
                            info!("connected to {}", self.config.url);

                            let end = self.stream(&mut sink, source, &mut queue).await;
                            if let Some(streamed) = phase.streaming_duration() {
                                debug!("streamed for {streamed:?}");
                            }
                            self.transition(&mut phase, ConnectionPhase::begin_close);
                            self.close(&mut sink).await;
                            if end == StreamEnd::Disconnected {
                                warn!("disconnected from {}", self.config.url);
                            }
                        }
                        Err(e) => {
                            warn!("handshake failed: {e}");
                            self.transition(&mut phase, ConnectionPhase::fail);
                        }
                    }
                }
                Err(e) => {
                    if !self.cancel.is_cancelled() {
                        warn!("connect error: {e}");
                    }
                    self.transition(&mut phase, ConnectionPhase::fail);
                }
            }

            self.connected.store(false, Ordering::SeqCst);
            self.transition(&mut phase, ConnectionPhase::finish);

            if self.cancel.is_cancelled() {
                break;
            }

            let delay = backoff.next_delay();
            debug!("reconnecting in {delay:?}");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancel.cancelled() => break,
            }
        }

        if !phase.is_disconnected() {
            debug!("stop interrupted phase {phase}");
            phase.force_disconnect();
        }
        self.connected.store(false, Ordering::SeqCst);
        debug!("lifecycle loop exited");
    }

    /// Apply a phase transition; an invalid one is a bug worth logging
    /// but never worth stopping the client for.
    fn transition(
        &self,
        phase: &mut ConnectionPhase,
        step: fn(&mut ConnectionPhase) -> Result<(), BridgeError>,
    ) {
        let from = phase.to_string();
        match step(phase) {
            Ok(()) => debug!("phase {from} -> {phase}"),
            Err(e) => warn!("phase transition rejected: {e}"),
        }
    }

    /// Fire-and-forget Hello; any reply is handled by the receiver.
    async fn handshake(&self, sink: &mut WsSink) -> Result<(), BridgeError> {
        let hello = codec::build_hello(PROTOCOL_VERSION, self.config.secret.as_deref());
        sink.send(Message::Text(codec::encode(&hello)?)).await?;
        Ok(())
    }

    /// Run the sender loop with a concurrent receiver until either ends.
    async fn stream(
        &self,
        sink: &mut WsSink,
        source: WsSource,
        queue: &mut mpsc::UnboundedReceiver<QueueItem>,
    ) -> StreamEnd {
        let mut receiver = tokio::spawn(receive_loop(source, Arc::clone(&self.diagnostics)));

        let end = loop {
            let polled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break StreamEnd::Stopped,
                _ = &mut receiver => {
                    debug!("receiver loop ended");
                    break StreamEnd::Disconnected;
                }
                polled = tokio::time::timeout(self.config.sender_poll, queue.recv()) => polled,
            };

            let item = match polled {
                Err(_elapsed) => continue,
                Ok(Some(item)) => item,
                Ok(None) => {
                    // Every sender is gone: the client itself was dropped.
                    debug!("send queue closed; stopping lifecycle");
                    self.cancel.cancel();
                    break StreamEnd::Stopped;
                }
            };

            let message = match item {
                QueueItem::Stop if self.cancel.is_cancelled() => break StreamEnd::Stopped,
                QueueItem::Stop => {
                    debug!("discarding stale stop sentinel");
                    continue;
                }
                QueueItem::Message(message) => message,
            };

            let text = match codec::encode(&message) {
                Ok(text) => text,
                Err(e) => {
                    warn!("dropping unencodable {} message: {e}", message.kind());
                    continue;
                }
            };

            if let Err(e) = sink.send(Message::Text(text)).await {
                warn!("send failed: {e}");
                break StreamEnd::Disconnected;
            }
        };

        receiver.abort();
        end
    }

    /// Best-effort close frame, bounded by one poll interval.
    async fn close(&self, sink: &mut WsSink) {
        match tokio::time::timeout(self.config.sender_poll, sink.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("close failed: {e}"),
            Err(_) => debug!("close timed out"),
        }
    }
}

/// Read frames until the socket closes or errors.
async fn receive_loop(mut source: WsSource, diagnostics: Arc<dyn Diagnostics>) {
    while let Some(frame) = source.next().await {
        let decoded = match frame {
            Ok(Message::Text(text)) => codec::decode(&text),
            Ok(Message::Binary(data)) => codec::decode_bytes(&data),
            Ok(Message::Close(frame)) => {
                debug!("remote closed: {frame:?}");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!("receive failed: {e}");
                break;
            }
        };

        match decoded {
            Some(InboundMessage::Error { code, message }) => {
                let line = format!("[bridge] error: {} {}", codec::describe_code(&code), message);
                diagnostics.echo(line.trim_end());
            }
            Some(InboundMessage::Ack) => debug!("ack received"),
            Some(InboundMessage::Unknown) => debug!("ignoring unknown control message"),
            None => {}
        }
    }
}
