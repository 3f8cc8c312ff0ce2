//! Configuration for the bridge client.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use chatbridge_core::{BackoffPolicy, ClientConfig, DEFAULT_COMMANDS, DEFAULT_URL, MAX_FRAME_SIZE};
use chatbridge_core::{BlockPos, BridgeError, PlayerState, Position, Rotation, SessionConfig};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Endpoint settings.
    pub network: NetworkConfig,
    /// Sampling and command settings.
    pub session: SessionSettings,
    /// Reconnect delays.
    pub backoff: BackoffConfig,
    /// Console host world state.
    pub host: HostConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// WebSocket endpoint of the control process.
    pub url: String,
    /// Shared secret; empty means none.
    pub secret: String,
    /// Largest inbound frame accepted, in bytes.
    pub max_frame_bytes: usize,
}

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Milliseconds between state snapshots.
    pub state_interval_ms: u64,
    /// Chat command verbs forwarded to the control process.
    pub commands: Vec<String>,
}

/// Reconnect backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub initial_ms: u64,
    pub max_ms: u64,
}

/// Fixed world state reported by the console host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Player position `[x, y, z]`.
    pub position: [f64; 3],
    /// Player rotation `[yaw, pitch]`.
    pub rotation: [f64; 2],
    /// Block under the crosshair `[x, y, z]`, if any.
    pub looking_at: Option<[i32; 3]>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.into(),
            secret: String::new(),
            max_frame_bytes: MAX_FRAME_SIZE,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            state_interval_ms: 125,
            commands: DEFAULT_COMMANDS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        let policy = BackoffPolicy::default();
        Self {
            initial_ms: policy.initial.as_millis() as u64,
            max_ms: policy.max.as_millis() as u64,
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            position: [0.5, 64.0, 0.5],
            rotation: [0.0, 0.0],
            looking_at: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl BridgeConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns `Ok(None)` when the file does not exist. Runs before
    /// logging is set up, so the caller reports the outcome.
    pub fn load(path: &Path) -> Result<Option<Self>, BridgeError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Self::parse(&contents).map(Some)
    }

    /// Parse configuration from TOML text; missing keys keep defaults.
    pub fn parse(text: &str) -> Result<Self, BridgeError> {
        toml::from_str(text).map_err(|e| BridgeError::Config(e.message().to_string()))
    }

    /// Convert network and backoff settings into a `ClientConfig`.
    pub fn to_client_config(&self) -> ClientConfig {
        let initial = Duration::from_millis(self.backoff.initial_ms.max(1));
        ClientConfig {
            max_frame_size: self.network.max_frame_bytes.max(1024),
            backoff: BackoffPolicy {
                initial,
                max: Duration::from_millis(self.backoff.max_ms).max(initial),
            },
            ..ClientConfig::new(&self.network.url, &self.network.secret)
        }
    }

    /// Convert session settings into a `SessionConfig`.
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            state_interval: Duration::from_millis(self.session.state_interval_ms),
            commands: self.session.commands.clone(),
        }
    }
}

impl HostConfig {
    /// The fixed player state this config describes.
    pub fn player_state(&self) -> PlayerState {
        let [x, y, z] = self.position;
        let [yaw, pitch] = self.rotation;
        PlayerState {
            position: Position { x, y, z },
            rotation: Rotation { yaw, pitch },
        }
    }

    pub fn targeted_block(&self) -> Option<BlockPos> {
        self.looking_at.map(|[x, y, z]| BlockPos { x, y, z })
    }
}

// ── Tests ────────────────────────────────────────────────────────
