//! Transport seams for the live-update feed.
//!
//! The manager consumes two narrow interfaces:
//!
//! - [`PushTransport`]: opens a server-to-client stream of JSON messages for
//!   one tournament. Production implementation: [`WebSocketPush`].
//! - [`PollTransport`]: fetches one JSON snapshot of tournament statistics.
//!   Production implementation: [`HttpPoll`].
//!
//! Both are injected at construction time, which is also how tests drive the
//! manager with scripted transports.

pub mod http;
pub mod websocket;

pub use http::{AuthContext, HttpPoll};
pub use websocket::WebSocketPush;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::models::PollSnapshot;

/// Capacity of the frame channel between a push reader task and the manager.
pub(crate) const FRAME_CHANNEL_CAPACITY: usize = 256;

/// An open push connection: a stream of raw JSON messages.
///
/// Wraps a bounded channel fed by a background reader task. Dropping the
/// stream signals the reader to close the underlying connection, so the
/// manager releasing its handle is enough to tear the transport down.
pub struct PushStream {
    frame_rx: mpsc::Receiver<Result<String>>,
    close_tx: Option<oneshot::Sender<()>>,
    _reader: Option<JoinHandle<()>>,
}

impl PushStream {
    /// Wrap a reader task's output channel.
    pub fn new(
        frame_rx: mpsc::Receiver<Result<String>>,
        close_tx: Option<oneshot::Sender<()>>,
        reader: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            frame_rx,
            close_tx,
            _reader: reader,
        }
    }

    /// Build a stream directly from a channel, with no backing reader task.
    /// Used by in-memory transports in tests.
    pub fn from_channel(frame_rx: mpsc::Receiver<Result<String>>) -> Self {
        Self::new(frame_rx, None, None)
    }

    /// Receive the next raw message.
    ///
    /// `Some(Ok(text))` is one JSON message; `Some(Err(_))` is a transport
    /// runtime error; `None` means the stream ended. The manager treats the
    /// latter two identically (reconnect policy).
    pub async fn next(&mut self) -> Option<Result<String>> {
        self.frame_rx.recv().await
    }
}

impl Drop for PushStream {
    fn drop(&mut self) {
        if let Some(tx) = self.close_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl std::fmt::Debug for PushStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushStream")
            .field("has_reader", &self._reader.is_some())
            .finish()
    }
}

/// Server-to-client event stream keyed by tournament identifier.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Open the stream. Errors here are open failures; errors after open
    /// surface through the returned stream.
    async fn open(&self, tournament_id: &str) -> Result<PushStream>;
}

/// Client-initiated snapshot fetch keyed by tournament identifier.
#[async_trait]
pub trait PollTransport: Send + Sync {
    /// Fetch one statistics snapshot. Protocol-level failures (network,
    /// non-2xx) are errors; a body with `success = false` is returned as-is
    /// and treated as a failure by the manager.
    async fn fetch(&self, tournament_id: &str) -> Result<PollSnapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_stream_yields_frames_then_end() {
        let (tx, rx) = mpsc::channel(4);
        let mut stream = PushStream::from_channel(rx);

        tx.send(Ok(r#"{"type":"heartbeat"}"#.to_string()))
            .await
            .unwrap();
        drop(tx);

        let frame = stream.next().await.unwrap().unwrap();
        assert!(frame.contains("heartbeat"));
        assert!(stream.next().await.is_none(), "closed channel ends stream");
    }

    #[tokio::test]
    async fn test_dropping_stream_fires_close_signal() {
        let (_tx, rx) = mpsc::channel(1);
        let (close_tx, close_rx) = oneshot::channel();
        let stream = PushStream::new(rx, Some(close_tx), None);

        drop(stream);
        assert!(close_rx.await.is_ok(), "close signal should arrive on drop");
    }
}
