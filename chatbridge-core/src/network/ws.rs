//! WebSocket connection setup.
//!
//! Builds the client request from the endpoint URL, applies the frame
//! size limits and returns split halves: the sink for the sender loop
//! and the stream for the receiver loop.

use std::time::Duration;

use futures::StreamExt;
use futures::stream::{SplitSink, SplitStream};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::BridgeError;

/// Concrete WebSocket stream type.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half, owned by the sender loop.
pub type WsSink = SplitSink<WsStream, Message>;

/// Read half, owned by the receiver loop.
pub type WsSource = SplitStream<WsStream>;

/// Validate `url` and turn it into a handshake request.
pub fn client_request(url: &str) -> Result<Request, BridgeError> {
    url.into_client_request()
        .map_err(|e| BridgeError::InvalidEndpoint {
            url: url.to_string(),
            reason: e.to_string(),
        })
}

/// Open a WebSocket to `url`, rejecting inbound messages and frames
/// larger than `max_frame_size` bytes.
///
/// The TCP connect plus the opening handshake must finish within
/// `open_timeout`, otherwise `BridgeError::Timeout` is returned.
pub async fn connect(
    url: &str,
    max_frame_size: usize,
    open_timeout: Duration,
) -> Result<(WsSink, WsSource), BridgeError> {
    let request = client_request(url)?;
    let config = WebSocketConfig {
        max_message_size: Some(max_frame_size),
        max_frame_size: Some(max_frame_size),
        ..Default::default()
    };

    let opening = tokio_tungstenite::connect_async_with_config(request, Some(config), true);
    let (stream, _response) = tokio::time::timeout(open_timeout, opening)
        .await
        .map_err(|_| BridgeError::Timeout(open_timeout))??;
    Ok(stream.split())
}
