//! Chat command bridge entry point.
//!
//! ```text
//! chatbridge                         Connect to ws://127.0.0.1:8080
//! chatbridge <url> [secret]          Override endpoint and shared secret
//! chatbridge --config <path>         Load a custom config TOML
//! chatbridge --gen-config            Print the default config and exit
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chatbridge_core::{BridgeClient, Diagnostics, SessionDriver, SessionEnd};

use chatbridge_client::config::BridgeConfig;
use chatbridge_client::console::{self, ConsoleHost};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "chatbridge", about = "Forward chat commands and player state to a control process")]
struct Cli {
    /// WebSocket endpoint (overrides config). Example: ws://127.0.0.1:8080
    url: Option<String>,

    /// Shared secret sent in the handshake (overrides config).
    secret: Option<String>,

    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "chatbridge.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&BridgeConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let (mut config, loaded) = match BridgeConfig::load(&cli.config) {
        Ok(Some(config)) => (config, Ok(true)),
        Ok(None) => (BridgeConfig::default(), Ok(false)),
        Err(e) => (BridgeConfig::default(), Err(e)),
    };
    if let Some(url) = cli.url {
        config.network.url = url;
    }
    if let Some(secret) = cli.secret {
        config.network.secret = secret;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("chatbridge v{}", env!("CARGO_PKG_VERSION"));
    // Reported only now that the subscriber exists.
    match loaded {
        Ok(true) => info!("loaded config from {}", cli.config.display()),
        Ok(false) => info!("no config at {}; using defaults", cli.config.display()),
        Err(e) => warn!("cannot use {}: {e}; using defaults", cli.config.display()),
    }

    let host = Arc::new(ConsoleHost::new(&config.host));
    host.echo(&format!("[bridge] starting -> {}", config.network.url));

    // ── 1. Transport ────────────────────────────────────────────

    let client = Arc::new(BridgeClient::with_diagnostics(
        config.to_client_config(),
        host.clone(),
    ));
    if let Err(e) = client.start() {
        warn!("streaming unavailable: {e}");
        host.echo(&format!("[bridge] WARNING: streaming unavailable ({e}); commands will not be delivered"));
    }

    // ── 2. Session ──────────────────────────────────────────────

    let events = console::spawn_reader(std::io::BufReader::new(std::io::stdin()))?;
    let mut driver = SessionDriver::new(host.clone(), client.clone(), &config.to_session_config());

    tokio::select! {
        end = driver.run(Some(events)) => match end {
            SessionEnd::WorldDisconnected => info!("session ended: world disconnected"),
            SessionEnd::HostClosed => info!("session ended: host closed"),
        },
        _ = tokio::signal::ctrl_c() => {
            host.echo("[bridge] stopped by user");
        }
    }

    // ── 3. Shutdown ─────────────────────────────────────────────

    client.stop().await;
    info!("shut down");
    Ok(())
}
