//! Public handle for the live-update feed.
//!
//! One `LiveUpdatesManager` is created per tournament page view, owned by
//! the page controller, which passes references to anything that needs to
//! subscribe. There is deliberately no global registry of managers.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{ArenaLinkError, Result};
use crate::event_handlers::{HandlerId, Subscribers};
use crate::models::{ConnectionOptions, TournamentStatus, UpdateEvent, UpdateEventKind};
use crate::status::StatusSink;
use crate::transport::{AuthContext, HttpPoll, PollTransport, PushTransport, WebSocketPush};

use super::task::{connection_task, ManagerCmd, TaskContext};
use super::ConnectionState;
use super::CMD_CHANNEL_CAPACITY;

/// Client for a tournament's live-update feed.
///
/// Maintains a push connection with automatic degradation to polling,
/// fixed-delay reconnection, and visibility-aware throttling. Normalized
/// [`UpdateEvent`]s are delivered to handlers registered with [`on`].
///
/// # Examples
///
/// ```rust,no_run
/// use arena_link::{LiveUpdatesManager, TournamentStatus, UpdateEventKind};
///
/// # async fn example() -> arena_link::Result<()> {
/// let manager = LiveUpdatesManager::builder("t-42", TournamentStatus::InProgress)
///     .base_url("https://arena.example")
///     .build()?;
///
/// manager.on(UpdateEventKind::MatchUpdate, |event| {
///     println!("match changed: {:?}", event);
/// });
///
/// manager.start().await;
/// // ... page lifetime ...
/// manager.destroy().await;
/// # Ok(())
/// # }
/// ```
///
/// [`on`]: LiveUpdatesManager::on
pub struct LiveUpdatesManager {
    tournament_id: String,
    cmd_tx: mpsc::Sender<ManagerCmd>,
    subscribers: Subscribers,
    state_cell: Arc<AtomicU8>,
    attempts_cell: Arc<AtomicU32>,
    last_update_cell: Arc<AtomicU64>,
    _task: Option<JoinHandle<()>>,
}

impl LiveUpdatesManager {
    /// Create a builder for a tournament's feed.
    ///
    /// `status` is the tournament's status at page load. Feeds are only
    /// meaningful for live tournaments (`check_in`, `in_progress`); for any
    /// other status the manager is built inert and stays `Disconnected`
    /// forever.
    pub fn builder(
        tournament_id: impl Into<String>,
        status: TournamentStatus,
    ) -> LiveUpdatesManagerBuilder {
        LiveUpdatesManagerBuilder::new(tournament_id.into(), status)
    }

    /// Begin the feed. Idempotent: calling while active is a no-op.
    ///
    /// Prefers the push transport when enabled and available, otherwise goes
    /// straight to polling.
    pub async fn start(&self) {
        let _ = self.cmd_tx.send(ManagerCmd::Start).await;
    }

    /// Close the active transport and cancel pending timers. Registered
    /// subscribers are kept; `start()` may be called again.
    pub async fn disconnect(&self) {
        let _ = self.cmd_tx.send(ManagerCmd::Disconnect).await;
    }

    /// Disconnect, clear all subscriber registrations and the status
    /// indicator, and shut the background task down. Terminal.
    pub async fn destroy(&self) {
        // Clear handle-side first so nothing can be dispatched once this
        // call returns, even while the command is still in flight.
        self.subscribers.clear();
        let _ = self.cmd_tx.send(ManagerCmd::Destroy).await;
    }

    /// Report a foreground/background change of the consuming page.
    ///
    /// While hidden, polling slows to half rate; on return to the
    /// foreground the cadence is restored and the push transport is
    /// re-attempted when permitted.
    pub async fn set_page_visible(&self, visible: bool) {
        let _ = self.cmd_tx.send(ManagerCmd::SetVisibility { visible }).await;
    }

    /// Register a handler for one event kind. Handlers for the same kind run
    /// in registration order; a panicking handler never prevents the others
    /// from running.
    pub fn on(
        &self,
        kind: UpdateEventKind,
        handler: impl Fn(&UpdateEvent) + Send + Sync + 'static,
    ) -> HandlerId {
        self.subscribers.on(kind, handler)
    }

    /// Remove a handler registered with [`on`](Self::on). Returns false if it
    /// was already removed.
    pub fn off(&self, kind: UpdateEventKind, id: HandlerId) -> bool {
        self.subscribers.off(kind, id)
    }

    /// The tournament this feed is attached to.
    pub fn tournament_id(&self) -> &str {
        &self.tournament_id
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state_cell.load(Ordering::SeqCst))
    }

    /// True while live on the push transport.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::ConnectedPush
    }

    /// Consecutive failed reconnect attempts. Resets to 0 on any successful
    /// receipt of data.
    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts_cell.load(Ordering::SeqCst)
    }

    /// Epoch millis of the last successfully parsed inbound message
    /// (heartbeats included), or `None` before the first one.
    pub fn last_update_time_ms(&self) -> Option<u64> {
        match self.last_update_cell.load(Ordering::SeqCst) {
            0 => None,
            ms => Some(ms),
        }
    }
}

impl Drop for LiveUpdatesManager {
    fn drop(&mut self) {
        let _ = self.cmd_tx.try_send(ManagerCmd::Destroy);
    }
}

impl std::fmt::Debug for LiveUpdatesManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveUpdatesManager")
            .field("tournament_id", &self.tournament_id)
            .field("state", &self.state())
            .field("reconnect_attempts", &self.reconnect_attempts())
            .finish()
    }
}

/// Builder for [`LiveUpdatesManager`].
///
/// Transports may be injected explicitly (tests, custom stacks) or derived
/// from a base URL (production: WebSocket push + HTTP polling).
pub struct LiveUpdatesManagerBuilder {
    tournament_id: String,
    status: TournamentStatus,
    options: ConnectionOptions,
    base_url: Option<String>,
    auth: AuthContext,
    push: Option<Arc<dyn PushTransport>>,
    poll: Option<Arc<dyn PollTransport>>,
    status_sink: Option<Arc<dyn StatusSink>>,
}

impl LiveUpdatesManagerBuilder {
    fn new(tournament_id: String, status: TournamentStatus) -> Self {
        Self {
            tournament_id,
            status,
            options: ConnectionOptions::default(),
            base_url: None,
            auth: AuthContext::none(),
            push: None,
            poll: None,
            status_sink: None,
        }
    }

    /// Set connection options.
    pub fn options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    /// Derive production transports from this base URL: WebSocket push at
    /// `…/tournaments/{id}/live`, HTTP polling at `…/tournaments/{id}/stats`.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Caller-supplied request context (CSRF token) for poll requests.
    pub fn auth(mut self, auth: AuthContext) -> Self {
        self.auth = auth;
        self
    }

    /// Inject a push transport, overriding any base-URL derivation.
    pub fn push_transport(mut self, transport: Arc<dyn PushTransport>) -> Self {
        self.push = Some(transport);
        self
    }

    /// Inject a poll transport, overriding any base-URL derivation.
    pub fn poll_transport(mut self, transport: Arc<dyn PollTransport>) -> Self {
        self.poll = Some(transport);
        self
    }

    /// Attach a cosmetic status indicator sink.
    pub fn status_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.status_sink = Some(sink);
        self
    }

    /// Build the manager and spawn its background task.
    ///
    /// For a tournament that is not live, the manager is built inert: it
    /// stays `Disconnected`, `start()` is a no-op, and no task is spawned.
    pub fn build(self) -> Result<LiveUpdatesManager> {
        let subscribers = Subscribers::new();
        let state_cell = Arc::new(AtomicU8::new(ConnectionState::Disconnected.as_u8()));
        let attempts_cell = Arc::new(AtomicU32::new(0));
        let last_update_cell = Arc::new(AtomicU64::new(0));

        let (cmd_tx, cmd_rx) = mpsc::channel(CMD_CHANNEL_CAPACITY);

        if !self.status.is_live() {
            log::info!(
                "[arena-link] [{}] live updates disabled (status={})",
                self.tournament_id,
                self.status
            );
            // Receiver dropped: commands become silent no-ops.
            drop(cmd_rx);
            return Ok(LiveUpdatesManager {
                tournament_id: self.tournament_id,
                cmd_tx,
                subscribers,
                state_cell,
                attempts_cell,
                last_update_cell,
                _task: None,
            });
        }

        let push: Option<Arc<dyn PushTransport>> = match (self.push, &self.base_url) {
            (Some(push), _) => Some(push),
            (None, Some(base)) if self.options.enable_push => {
                Some(Arc::new(WebSocketPush::new(base.clone())))
            }
            _ => None,
        };
        let poll: Option<Arc<dyn PollTransport>> = match (self.poll, &self.base_url) {
            (Some(poll), _) => Some(poll),
            (None, Some(base)) if self.options.enable_polling => {
                Some(Arc::new(HttpPoll::new(base, self.auth.clone())?))
            }
            _ => None,
        };

        if push.is_none() && poll.is_none() {
            return Err(ArenaLinkError::ConfigurationError(
                "no usable transport: provide a base_url or inject a transport".to_string(),
            ));
        }

        let ctx = TaskContext {
            tournament_id: self.tournament_id.clone(),
            options: self.options,
            push,
            poll,
            subscribers: subscribers.clone(),
            status_sink: self.status_sink,
            state_cell: state_cell.clone(),
            attempts_cell: attempts_cell.clone(),
            last_update_cell: last_update_cell.clone(),
        };
        let task = tokio::spawn(connection_task(cmd_rx, ctx));

        Ok(LiveUpdatesManager {
            tournament_id: self.tournament_id,
            cmd_tx,
            subscribers,
            state_cell,
            attempts_cell,
            last_update_cell,
            _task: Some(task),
        })
    }
}
