//! Background connection task.
//!
//! Owns every piece of mutable connection state: the active transport, the
//! single pending timer, the in-flight open/fetch futures, and the reconnect
//! counter. The public handle talks to it over a command channel, so all
//! state transitions are serialized here — the `tokio` rendition of a
//! single-threaded event loop. Dropping an in-flight future on disconnect or
//! destroy is the cancellation mechanism: a late resolution can never be
//! observed, let alone applied.

use std::future::{pending, Future};
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tokio::time::Instant as TokioInstant;

use crate::error::{ArenaLinkError, Result};
use crate::event_handlers::Subscribers;
use crate::models::{parse_message, ConnectionOptions, PollSnapshot, UpdateEvent};
use crate::status::StatusSink;
use crate::transport::{PollTransport, PushStream, PushTransport};

use super::state::ConnectionState;

/// Commands sent from the public handle to the background task.
pub(crate) enum ManagerCmd {
    /// Begin the feed (idempotent).
    Start,
    /// Drop the active transport and any pending timer; keep subscribers.
    Disconnect,
    /// Disconnect, clear subscribers and the status indicator, exit the task.
    Destroy,
    /// The host page moved between foreground and background.
    SetVisibility { visible: bool },
}

type OpenFuture = Pin<Box<dyn Future<Output = Result<PushStream>> + Send>>;
type FetchFuture = Pin<Box<dyn Future<Output = Result<PollSnapshot>> + Send>>;

/// Which transport a scheduled retry should re-attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransportKind {
    Push,
    Poll,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Push => write!(f, "push"),
            Self::Poll => write!(f, "poll"),
        }
    }
}

/// What the single pending timer will do when it fires.
///
/// There is at most one of these at any time: every scheduling site replaces
/// the previous value, and every state exit clears it, so a timer can never
/// fire into a state that no longer expects it.
#[derive(Debug, Clone, Copy)]
enum PendingTimer {
    /// Run the next poll fetch.
    PollFire,
    /// Re-attempt the transport that failed.
    Retry(TransportKind),
}

/// Everything the task needs from the outside, fixed at spawn time.
pub(crate) struct TaskContext {
    pub tournament_id: String,
    pub options: ConnectionOptions,
    pub push: Option<Arc<dyn PushTransport>>,
    pub poll: Option<Arc<dyn PollTransport>>,
    pub subscribers: Subscribers,
    pub status_sink: Option<Arc<dyn StatusSink>>,
    pub state_cell: Arc<AtomicU8>,
    pub attempts_cell: Arc<AtomicU32>,
    pub last_update_cell: Arc<AtomicU64>,
}

/// Current time in millis since Unix epoch.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn push_usable(ctx: &TaskContext) -> bool {
    ctx.options.enable_push && ctx.push.is_some()
}

fn poll_usable(ctx: &TaskContext) -> bool {
    ctx.options.enable_polling && ctx.poll.is_some()
}

/// Poll cadence, doubled while the page is hidden.
fn effective_poll_interval(options: &ConnectionOptions, visible: bool) -> Duration {
    let base = options.polling_interval();
    if visible {
        base
    } else {
        base * 2
    }
}

/// Record a successfully received message. Monotonically non-decreasing.
fn record_update(ctx: &TaskContext) {
    ctx.last_update_cell.fetch_max(now_ms(), Ordering::SeqCst);
}

fn transition(state: &mut ConnectionState, next: ConnectionState, ctx: &TaskContext) {
    if *state == next {
        return;
    }
    log::debug!(
        "[arena-link] [{}] {} -> {}",
        ctx.tournament_id,
        state,
        next
    );
    *state = next;
    ctx.state_cell.store(next.as_u8(), Ordering::SeqCst);
    if let Some(sink) = &ctx.status_sink {
        sink.status_changed(next.indicator());
    }
}

/// Build the push open future, capped by the configured connect timeout.
fn begin_push_open(transport: Arc<dyn PushTransport>, ctx: &TaskContext) -> OpenFuture {
    let tournament_id = ctx.tournament_id.clone();
    let timeout = ctx.options.connect_timeout();
    Box::pin(async move {
        match tokio::time::timeout(timeout, transport.open(&tournament_id)).await {
            Ok(result) => result,
            Err(_) => Err(ArenaLinkError::TimeoutError(format!(
                "push open exceeded {:?}",
                timeout
            ))),
        }
    })
}

/// Build the fetch future for one poll request.
fn begin_fetch(transport: Arc<dyn PollTransport>, ctx: &TaskContext) -> FetchFuture {
    let tournament_id = ctx.tournament_id.clone();
    Box::pin(async move { transport.fetch(&tournament_id).await })
}

/// Route a transport failure through the reconnect policy.
///
/// The caller has already dropped the failed transport handle. Outcomes:
/// - permanently polling and the poll failed: keep polling at the normal
///   cadence, the backoff policy is no longer consulted;
/// - attempts below the ceiling: enter `Erroring` and schedule a fixed-delay
///   retry of the same transport kind;
/// - ceiling reached: settle on polling for good, or go `Disconnected` when
///   polling is unavailable.
#[allow(clippy::too_many_arguments)]
fn handle_transport_failure(
    ctx: &TaskContext,
    kind: TransportKind,
    error: &ArenaLinkError,
    state: &mut ConnectionState,
    attempts: &mut u32,
    polling_locked: &mut bool,
    visible: bool,
    timer: &mut Option<(PendingTimer, TokioInstant)>,
) {
    if *polling_locked && kind == TransportKind::Poll {
        log::warn!(
            "[arena-link] [{}] poll failed in permanent polling mode: {}; next poll at normal interval",
            ctx.tournament_id,
            error
        );
        transition(state, ConnectionState::Polling, ctx);
        *timer = Some((
            PendingTimer::PollFire,
            TokioInstant::now() + effective_poll_interval(&ctx.options, visible),
        ));
        return;
    }

    transition(state, ConnectionState::Erroring, ctx);
    *attempts += 1;
    ctx.attempts_cell.store(*attempts, Ordering::SeqCst);
    log::warn!(
        "[arena-link] [{}] {} transport failure (attempt {}/{}): {}",
        ctx.tournament_id,
        kind,
        attempts,
        ctx.options.max_reconnect_attempts,
        error
    );

    if *attempts >= ctx.options.max_reconnect_attempts {
        if poll_usable(ctx) {
            *polling_locked = true;
            transition(state, ConnectionState::Polling, ctx);
            *timer = Some((
                PendingTimer::PollFire,
                TokioInstant::now() + effective_poll_interval(&ctx.options, visible),
            ));
            log::warn!(
                "[arena-link] [{}] reconnect attempts exhausted; polling permanently every {}ms",
                ctx.tournament_id,
                ctx.options.polling_interval_ms
            );
        } else {
            transition(state, ConnectionState::Disconnected, ctx);
            log::warn!(
                "[arena-link] [{}] reconnect attempts exhausted and polling unavailable; giving up",
                ctx.tournament_id
            );
        }
    } else {
        *timer = Some((
            PendingTimer::Retry(kind),
            TokioInstant::now() + ctx.options.reconnect_delay(),
        ));
        log::info!(
            "[arena-link] [{}] retrying {} transport in {}ms",
            ctx.tournament_id,
            kind,
            ctx.options.reconnect_delay_ms
        );
    }
}

// ── select! helpers ─────────────────────────────────────────────────────────
//
// Each borrows exactly one optional slot and stays pending while the slot is
// empty, so the main loop needs no branch preconditions for them.

async fn next_push_frame(stream: &mut Option<PushStream>) -> Option<Result<String>> {
    match stream {
        Some(s) => s.next().await,
        None => pending().await,
    }
}

async fn resolve_open(slot: &mut Option<OpenFuture>) -> Result<PushStream> {
    match slot {
        Some(f) => f.as_mut().await,
        None => pending().await,
    }
}

async fn resolve_fetch(slot: &mut Option<FetchFuture>) -> Result<PollSnapshot> {
    match slot {
        Some(f) => f.as_mut().await,
        None => pending().await,
    }
}

// ── the task ────────────────────────────────────────────────────────────────

pub(crate) async fn connection_task(mut cmd_rx: mpsc::Receiver<ManagerCmd>, ctx: TaskContext) {
    let mut state = ConnectionState::Disconnected;
    let mut attempts: u32 = 0;
    let mut visible = true;
    // Set once the reconnect ceiling is hit: polling continues forever and
    // failures stop feeding the backoff policy.
    let mut polling_locked = false;
    // Set by `tournament_ended`: the feed is over for good.
    let mut terminated = false;

    let mut push_open: Option<OpenFuture> = None;
    let mut push_stream: Option<PushStream> = None;
    let mut fetch_in_flight: Option<FetchFuture> = None;
    // The single pending timer. Replaced, never accumulated.
    let mut timer: Option<(PendingTimer, TokioInstant)> = None;

    log::debug!(
        "[arena-link] [{}] connection task started",
        ctx.tournament_id
    );

    loop {
        // At most one transport may be live at this point.
        debug_assert!(
            !(push_stream.is_some()
                && (fetch_in_flight.is_some()
                    || matches!(timer, Some((PendingTimer::PollFire, _))))),
            "push and poll transports active at once"
        );

        let timer_armed = timer.is_some();
        let deadline = timer
            .as_ref()
            .map(|(_, d)| *d)
            .unwrap_or_else(|| TokioInstant::now() + super::FAR_FUTURE);
        let timer_sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(timer_sleep);

        tokio::select! {
            biased;

            // ── commands from the handle ────────────────────────────────
            cmd = cmd_rx.recv() => match cmd {
                Some(ManagerCmd::Start) => {
                    if terminated {
                        log::debug!(
                            "[arena-link] [{}] start ignored: feed is terminated",
                            ctx.tournament_id
                        );
                    } else if state.is_active() {
                        log::debug!(
                            "[arena-link] [{}] start ignored: already active ({})",
                            ctx.tournament_id,
                            state
                        );
                    } else if push_usable(&ctx) {
                        transition(&mut state, ConnectionState::ConnectingPush, &ctx);
                        if let Some(push) = ctx.push.clone() {
                            push_open = Some(begin_push_open(push, &ctx));
                        }
                    } else if poll_usable(&ctx) {
                        transition(&mut state, ConnectionState::Polling, &ctx);
                        if let Some(poll) = ctx.poll.clone() {
                            fetch_in_flight = Some(begin_fetch(poll, &ctx));
                        }
                    } else {
                        log::warn!(
                            "[arena-link] [{}] start ignored: no usable transport",
                            ctx.tournament_id
                        );
                    }
                }

                Some(ManagerCmd::Disconnect) => {
                    push_open = None;
                    push_stream = None;
                    fetch_in_flight = None;
                    timer = None;
                    transition(&mut state, ConnectionState::Disconnected, &ctx);
                    log::info!("[arena-link] [{}] disconnected", ctx.tournament_id);
                }

                Some(ManagerCmd::SetVisibility { visible: now_visible }) => {
                    if now_visible != visible {
                        visible = now_visible;
                        if !visible {
                            // Hidden: halve the poll rate, keep everything else.
                            if state == ConnectionState::Polling {
                                if let Some((PendingTimer::PollFire, _)) = timer {
                                    timer = Some((
                                        PendingTimer::PollFire,
                                        TokioInstant::now()
                                            + effective_poll_interval(&ctx.options, false),
                                    ));
                                    log::debug!(
                                        "[arena-link] [{}] page hidden; poll interval doubled",
                                        ctx.tournament_id
                                    );
                                }
                            }
                        } else if state == ConnectionState::Polling {
                            if push_usable(&ctx) {
                                // Foregrounded: prefer push again.
                                fetch_in_flight = None;
                                timer = None;
                                transition(&mut state, ConnectionState::ConnectingPush, &ctx);
                                if let Some(push) = ctx.push.clone() {
                                    push_open = Some(begin_push_open(push, &ctx));
                                }
                                log::info!(
                                    "[arena-link] [{}] page visible; re-attempting push transport",
                                    ctx.tournament_id
                                );
                            } else if let Some((PendingTimer::PollFire, _)) = timer {
                                timer = Some((
                                    PendingTimer::PollFire,
                                    TokioInstant::now()
                                        + effective_poll_interval(&ctx.options, true),
                                ));
                                log::debug!(
                                    "[arena-link] [{}] page visible; poll interval restored",
                                    ctx.tournament_id
                                );
                            }
                        }
                    }
                }

                Some(ManagerCmd::Destroy) | None => {
                    push_open = None;
                    push_stream = None;
                    fetch_in_flight = None;
                    timer = None;
                    transition(&mut state, ConnectionState::Disconnected, &ctx);
                    ctx.subscribers.clear();
                    if let Some(sink) = &ctx.status_sink {
                        sink.cleared();
                    }
                    log::debug!("[arena-link] [{}] manager destroyed", ctx.tournament_id);
                    return;
                }
            },

            // ── push open resolved ──────────────────────────────────────
            open_result = resolve_open(&mut push_open) => {
                push_open = None;
                match open_result {
                    Ok(stream) => {
                        push_stream = Some(stream);
                        attempts = 0;
                        ctx.attempts_cell.store(0, Ordering::SeqCst);
                        transition(&mut state, ConnectionState::ConnectedPush, &ctx);
                        log::info!(
                            "[arena-link] [{}] push transport connected",
                            ctx.tournament_id
                        );
                    }
                    Err(e) => handle_transport_failure(
                        &ctx,
                        TransportKind::Push,
                        &e,
                        &mut state,
                        &mut attempts,
                        &mut polling_locked,
                        visible,
                        &mut timer,
                    ),
                }
            }

            // ── push frame arrived ──────────────────────────────────────
            frame = next_push_frame(&mut push_stream) => match frame {
                Some(Ok(text)) => match parse_message(&text) {
                    Err(e) => {
                        log::warn!(
                            "[arena-link] [{}] dropping malformed message: {}",
                            ctx.tournament_id,
                            e
                        );
                    }
                    Ok(UpdateEvent::Unknown { raw_type }) => {
                        log::debug!(
                            "[arena-link] [{}] dropping message with unrecognized type '{}'",
                            ctx.tournament_id,
                            raw_type
                        );
                    }
                    Ok(UpdateEvent::TournamentEnded { status }) => {
                        record_update(&ctx);
                        // Tear the feed down first, then notify exactly once.
                        push_open = None;
                        push_stream = None;
                        fetch_in_flight = None;
                        timer = None;
                        terminated = true;
                        transition(&mut state, ConnectionState::Disconnected, &ctx);
                        ctx.subscribers
                            .dispatch(&UpdateEvent::TournamentEnded { status });
                        log::info!(
                            "[arena-link] [{}] tournament ended ({}); live updates stopped",
                            ctx.tournament_id,
                            status
                        );
                    }
                    Ok(event) => {
                        record_update(&ctx);
                        ctx.subscribers.dispatch(&event);
                    }
                },
                Some(Err(e)) => {
                    push_stream = None;
                    handle_transport_failure(
                        &ctx,
                        TransportKind::Push,
                        &e,
                        &mut state,
                        &mut attempts,
                        &mut polling_locked,
                        visible,
                        &mut timer,
                    );
                }
                None => {
                    push_stream = None;
                    let e = ArenaLinkError::PushTransportError(
                        "push stream ended".to_string(),
                    );
                    handle_transport_failure(
                        &ctx,
                        TransportKind::Push,
                        &e,
                        &mut state,
                        &mut attempts,
                        &mut polling_locked,
                        visible,
                        &mut timer,
                    );
                }
            },

            // ── poll fetch resolved ─────────────────────────────────────
            fetch_result = resolve_fetch(&mut fetch_in_flight) => {
                fetch_in_flight = None;
                match fetch_result {
                    Ok(snapshot) if snapshot.success => {
                        attempts = 0;
                        ctx.attempts_cell.store(0, Ordering::SeqCst);
                        record_update(&ctx);

                        match snapshot.status.filter(|s| s.is_terminal()) {
                            Some(status) => {
                                // The poll transport's encoding of the end of
                                // the tournament.
                                timer = None;
                                terminated = true;
                                transition(&mut state, ConnectionState::Disconnected, &ctx);
                                ctx.subscribers
                                    .dispatch(&UpdateEvent::TournamentEnded { status });
                                log::info!(
                                    "[arena-link] [{}] tournament ended ({}); live updates stopped",
                                    ctx.tournament_id,
                                    status
                                );
                            }
                            None => {
                                transition(&mut state, ConnectionState::Polling, &ctx);
                                ctx.subscribers.dispatch(&UpdateEvent::StatisticsUpdate {
                                    statistics: snapshot.statistics,
                                });
                                timer = Some((
                                    PendingTimer::PollFire,
                                    TokioInstant::now()
                                        + effective_poll_interval(&ctx.options, visible),
                                ));
                            }
                        }
                    }
                    Ok(_) => {
                        let e = ArenaLinkError::FetchError(
                            "server reported success = false".to_string(),
                        );
                        handle_transport_failure(
                            &ctx,
                            TransportKind::Poll,
                            &e,
                            &mut state,
                            &mut attempts,
                            &mut polling_locked,
                            visible,
                            &mut timer,
                        );
                    }
                    Err(e) => handle_transport_failure(
                        &ctx,
                        TransportKind::Poll,
                        &e,
                        &mut state,
                        &mut attempts,
                        &mut polling_locked,
                        visible,
                        &mut timer,
                    ),
                }
            }

            // ── timer fired ─────────────────────────────────────────────
            _ = &mut timer_sleep, if timer_armed => {
                let fired = timer.take();
                match fired {
                    Some((PendingTimer::PollFire, _)) => {
                        if let Some(poll) = ctx.poll.clone() {
                            fetch_in_flight = Some(begin_fetch(poll, &ctx));
                        }
                    }
                    Some((PendingTimer::Retry(TransportKind::Push), _)) => {
                        transition(&mut state, ConnectionState::ConnectingPush, &ctx);
                        if let Some(push) = ctx.push.clone() {
                            push_open = Some(begin_push_open(push, &ctx));
                        }
                    }
                    Some((PendingTimer::Retry(TransportKind::Poll), _)) => {
                        transition(&mut state, ConnectionState::Polling, &ctx);
                        if let Some(poll) = ctx.poll.clone() {
                            fetch_in_flight = Some(begin_fetch(poll, &ctx));
                        }
                    }
                    None => {}
                }
            }
        }
    }
}
