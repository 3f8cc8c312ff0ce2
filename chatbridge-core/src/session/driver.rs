//! The session control loop.
//!
//! Merges host events with the sampling clock on a single loop: each
//! iteration waits for an event for at most one sampling interval, then
//! checks whether a state snapshot is due, then handles the event.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::codec;
use crate::command::{CommandParser, DEFAULT_COMMANDS};
use crate::host::{Host, HostEvent};
use crate::network::Outbound;
use crate::session::clock::SamplingClock;

/// Session driver settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Target interval between state snapshots (~8 Hz by default).
    pub state_interval: Duration,
    /// Whitelisted command verbs.
    pub commands: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            state_interval: Duration::from_millis(125),
            commands: DEFAULT_COMMANDS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Why the driver loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The world listener reported a disconnect.
    WorldDisconnected,
    /// The host dropped its end of the event stream.
    HostClosed,
}

/// Drives state sampling and command forwarding for one session.
pub struct SessionDriver<H: ?Sized, O: ?Sized> {
    host: Arc<H>,
    outbound: Arc<O>,
    parser: CommandParser,
    clock: SamplingClock,
}

impl<H, O> SessionDriver<H, O>
where
    H: Host + ?Sized,
    O: Outbound + ?Sized,
{
    pub fn new(host: Arc<H>, outbound: Arc<O>, config: &SessionConfig) -> Self {
        Self {
            host,
            outbound,
            parser: CommandParser::new(&config.commands),
            clock: SamplingClock::new(config.state_interval),
        }
    }

    pub fn clock(&self) -> &SamplingClock {
        &self.clock
    }

    /// Run until the world disconnects or the host goes away.
    ///
    /// Without an event source the driver cannot intercept chat; it
    /// warns once and keeps streaming state until the future is dropped.
    pub async fn run(&mut self, events: Option<mpsc::UnboundedReceiver<HostEvent>>) -> SessionEnd {
        let Some(mut events) = events else {
            return self.run_state_only().await;
        };

        let interval = self.clock.interval();
        loop {
            let event = match tokio::time::timeout(interval, events.recv()).await {
                Ok(Some(event)) => Some(event),
                Ok(None) => {
                    info!("host event stream closed");
                    return SessionEnd::HostClosed;
                }
                Err(_elapsed) => None,
            };

            self.tick(Instant::now());

            if let Some(event) = event {
                if let ControlFlow::Break(end) = self.handle_event(event) {
                    return end;
                }
            }
        }
    }

    /// Degraded loop used when event interception is unavailable.
    async fn run_state_only(&mut self) -> SessionEnd {
        warn!("event interception unavailable; streaming state only");
        self.host
            .echo("[bridge] WARNING: event interception not available; chat commands will not be intercepted");

        loop {
            tokio::time::sleep(self.clock.interval()).await;
            self.tick(Instant::now());
        }
    }

    /// Emit a state snapshot if connected and due. Returns whether the
    /// clock was advanced.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.outbound.is_connected() || !self.clock.is_due(now) {
            return false;
        }
        self.clock.mark(now);

        match self.host.player_state() {
            Some(state) => {
                let target = self.host.targeted_block();
                self.outbound
                    .send(codec::build_state(state.position, state.rotation, target));
            }
            None => debug!("no player state; skipping snapshot"),
        }
        true
    }

    /// Handle one host event.
    pub fn handle_event(&mut self, event: HostEvent) -> ControlFlow<SessionEnd> {
        match event {
            HostEvent::World { connected: false } => {
                info!("world disconnected");
                self.host.echo("[bridge] world disconnected, stopping.");
                ControlFlow::Break(SessionEnd::WorldDisconnected)
            }
            HostEvent::World { connected: true } => {
                debug!("world connected");
                ControlFlow::Continue(())
            }
            HostEvent::OutgoingChat(text) => {
                self.handle_chat(text);
                ControlFlow::Continue(())
            }
        }
    }

    fn handle_chat(&mut self, text: String) {
        let Some(command) = self.parser.parse(&text) else {
            // Not ours: hand it back so the message is not lost.
            self.host.chat(&text);
            return;
        };

        self.outbound
            .send(codec::build_command(&command.verb, &command.args));

        let line = format!("[bridge] {} {}", command.verb, command.args_line());
        info!("forwarded command: {}", line.trim_end());
        self.host.log(line.trim_end());
    }
}

// ── Tests ────────────────────────────────────────────────────────
