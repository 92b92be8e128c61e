//! WebSocket push transport.
//!
//! Opens a long-lived stream at `ws(s)://…/tournaments/{id}/live` and runs a
//! background reader task that forwards one JSON text frame per message into
//! the [`PushStream`] channel. Ping/pong and close frames are handled inside
//! the reader; the manager only ever sees messages, errors, and end-of-stream.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use crate::error::{ArenaLinkError, Result};

use super::{PushStream, PushTransport, FRAME_CHANNEL_CAPACITY};

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>>;

/// Resolve the push endpoint URL for a tournament from the configured base
/// URL, mapping http(s) schemes onto ws(s).
pub(crate) fn resolve_push_url(base_url: &str, tournament_id: &str) -> Result<String> {
    let base = Url::parse(base_url.trim()).map_err(|e| {
        ArenaLinkError::ConfigurationError(format!("Invalid base_url '{}': {}", base_url, e))
    })?;

    if base.host_str().is_none() {
        return Err(ArenaLinkError::ConfigurationError(
            "base_url must include a host".to_string(),
        ));
    }
    if !base.username().is_empty() || base.password().is_some() {
        return Err(ArenaLinkError::ConfigurationError(
            "base_url must not include username/password credentials".to_string(),
        ));
    }

    let ws_scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ArenaLinkError::ConfigurationError(format!(
                "Unsupported base_url scheme '{}'; expected http(s) or ws(s)",
                other
            )));
        }
    };

    let mut ws_url = base;
    ws_url.set_scheme(ws_scheme).map_err(|_| {
        ArenaLinkError::ConfigurationError("Failed to set WebSocket URL scheme".to_string())
    })?;
    ws_url.set_fragment(None);
    ws_url.set_query(None);
    ws_url.set_path(&format!("/tournaments/{}/live", tournament_id));

    Ok(ws_url.to_string())
}

/// WebSocket implementation of [`PushTransport`].
#[derive(Debug, Clone)]
pub struct WebSocketPush {
    base_url: String,
}

impl WebSocketPush {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PushTransport for WebSocketPush {
    async fn open(&self, tournament_id: &str) -> Result<PushStream> {
        let url = resolve_push_url(&self.base_url, tournament_id)?;
        log::debug!("[arena-link] opening push stream at {}", url);

        let (ws_stream, _response) = connect_async(url.as_str()).await.map_err(|e| {
            ArenaLinkError::PushTransportError(format!("Connection failed: {}", e))
        })?;

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (close_tx, close_rx) = oneshot::channel();
        let tournament = tournament_id.to_string();
        let reader = tokio::spawn(frame_reader_loop(ws_stream, frame_tx, close_rx, tournament));

        Ok(PushStream::new(frame_rx, Some(close_tx), Some(reader)))
    }
}

/// Background task that owns the WebSocket stream and forwards text frames.
///
/// Exits when: the close signal fires (stream handle dropped), the frame
/// channel's receiver is gone, the server closes, or the socket errors.
async fn frame_reader_loop(
    mut ws_stream: WsStream,
    frame_tx: mpsc::Sender<Result<String>>,
    close_rx: oneshot::Receiver<()>,
    tournament_id: String,
) {
    tokio::pin!(close_rx);

    loop {
        tokio::select! {
            biased;

            _ = &mut close_rx => {
                let _ = ws_stream.close(None).await;
                log::debug!("[arena-link] [{}] push stream closed by client", tournament_id);
                return;
            }

            frame = ws_stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if frame_tx.send(Ok(text.to_string())).await.is_err() {
                        // Receiver gone; nobody is listening any more.
                        let _ = ws_stream.close(None).await;
                        return;
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = ws_stream.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Binary(data))) => {
                    log::debug!(
                        "[arena-link] [{}] ignoring unexpected binary frame ({} bytes)",
                        tournament_id,
                        data.len()
                    );
                }
                Some(Ok(Message::Close(_))) => {
                    log::debug!("[arena-link] [{}] server closed push stream", tournament_id);
                    return;
                }
                Some(Ok(Message::Frame(_))) => {}
                Some(Err(e)) => {
                    let _ = frame_tx
                        .send(Err(ArenaLinkError::PushTransportError(e.to_string())))
                        .await;
                    return;
                }
                None => {
                    log::debug!("[arena-link] [{}] push stream ended", tournament_id);
                    return;
                }
            }
        }
    }
}
