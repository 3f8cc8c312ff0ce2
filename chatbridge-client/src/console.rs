//! Console host adapter.
//!
//! Stands in for the game client: every stdin line is an outgoing chat
//! message held back for inspection, stdout is the normal chat path and
//! the echo surface, and the world state comes from the config file.
//! End of input is reported as a world disconnect.

use std::io::{BufRead, Write};
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{debug, info};

use chatbridge_core::{BlockPos, Diagnostics, Host, HostEvent, PlayerState};

use crate::config::HostConfig;

/// Host backed by the process's stdin/stdout.
pub struct ConsoleHost<W: Write + Send = std::io::Stdout> {
    out: Mutex<W>,
    state: PlayerState,
    target: Option<BlockPos>,
}

impl ConsoleHost {
    pub fn new(config: &HostConfig) -> Self {
        Self::with_writer(config, std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleHost<W> {
    pub fn with_writer(config: &HostConfig, out: W) -> Self {
        Self {
            out: Mutex::new(out),
            state: config.player_state(),
            target: config.targeted_block(),
        }
    }

    fn write_line(&self, line: &str) {
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            debug!("console write failed: {e}");
        }
    }
}

impl<W: Write + Send> Diagnostics for ConsoleHost<W> {
    fn echo(&self, line: &str) {
        self.write_line(line);
    }

    fn log(&self, line: &str) {
        info!(target: "chatbridge::host", "{line}");
    }
}

impl<W: Write + Send> Host for ConsoleHost<W> {
    fn chat(&self, text: &str) {
        self.write_line(&format!("<you> {text}"));
    }

    fn player_state(&self) -> Option<PlayerState> {
        Some(self.state)
    }

    fn targeted_block(&self) -> Option<BlockPos> {
        self.target
    }
}

/// Forward lines from `input` as chat events until EOF, then report a
/// world disconnect.
///
/// Reads on a detached OS thread: a blocking stdin read cannot be
/// cancelled and must not hold up runtime shutdown.
pub fn spawn_reader<R>(input: R) -> std::io::Result<mpsc::UnboundedReceiver<HostEvent>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("chatbridge-stdin".into())
        .spawn(move || {
            for line in input.lines() {
                match line {
                    Ok(line) => {
                        if tx.send(HostEvent::OutgoingChat(line)).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        debug!("stdin read failed: {e}");
                        break;
                    }
                }
            }
            let _ = tx.send(HostEvent::World { connected: false });
        })?;
    Ok(rx)
}
