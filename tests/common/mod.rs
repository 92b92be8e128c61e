//! Shared test scaffolding: scripted in-memory transports and wait helpers.
//!
//! The mock transports implement the same seams the production WebSocket and
//! HTTP transports implement, so the manager under test runs the exact code
//! paths it runs in production, minus the network. Tests run under
//! `#[tokio::test(start_paused = true)]`: the virtual clock auto-advances
//! whenever every task is idle, so interval and backoff timings are exact
//! and the suite completes in milliseconds of wall time.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arena_link::{
    ArenaLinkError, ConnectionState, LiveUpdatesManager, PollSnapshot, PollTransport,
    PushStream, PushTransport, StatisticsSnapshot, TournamentStatus, UpdateEvent,
    UpdateEventKind,
};
use serde_json::json;
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;

// ── scripted push transport ─────────────────────────────────────────────────

enum PushOpenStep {
    /// Open succeeds; frames arrive through the paired sender.
    Ok(mpsc::Receiver<arena_link::Result<String>>),
    /// Open fails.
    Err,
}

/// Push transport that replays a script of open outcomes.
///
/// An empty script fails the open, so a finite script behaves like a server
/// that went away.
pub struct MockPush {
    script: Mutex<VecDeque<PushOpenStep>>,
    pub opens: AtomicU32,
}

impl MockPush {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            opens: AtomicU32::new(0),
        })
    }

    /// Queue a successful open; returns the sender that feeds its frames.
    pub fn script_ok(&self) -> mpsc::Sender<arena_link::Result<String>> {
        let (tx, rx) = mpsc::channel(32);
        self.script.lock().unwrap().push_back(PushOpenStep::Ok(rx));
        tx
    }

    /// Queue a failed open.
    pub fn script_err(&self) {
        self.script.lock().unwrap().push_back(PushOpenStep::Err);
    }

    pub fn open_count(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PushTransport for MockPush {
    async fn open(&self, _tournament_id: &str) -> arena_link::Result<PushStream> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(PushOpenStep::Ok(rx)) => Ok(PushStream::from_channel(rx)),
            Some(PushOpenStep::Err) | None => Err(ArenaLinkError::PushTransportError(
                "scripted open failure".to_string(),
            )),
        }
    }
}

// ── scripted poll transport ─────────────────────────────────────────────────

#[derive(Clone)]
pub enum PollStep {
    /// `success = true` with the given statistics payload.
    Ok(serde_json::Value),
    /// `success = true` carrying a tournament status.
    OkWithStatus(serde_json::Value, TournamentStatus),
    /// Well-formed body with `success = false`.
    NotSuccess,
    /// Network-level failure.
    NetworkErr,
    /// Block until the test releases `hang_gate`, then succeed.
    Hang,
}

/// Poll transport that replays a script of fetch outcomes.
pub struct MockPoll {
    script: Mutex<VecDeque<PollStep>>,
    fallback: Mutex<PollStep>,
    pub calls: AtomicU32,
    pub call_times: Mutex<Vec<Instant>>,
    pub hang_gate: Arc<Notify>,
}

impl MockPoll {
    /// Empty script; unscripted fetches fail with a network error.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(PollStep::NetworkErr),
            calls: AtomicU32::new(0),
            call_times: Mutex::new(Vec::new()),
            hang_gate: Arc::new(Notify::new()),
        })
    }

    pub fn script(&self, step: PollStep) {
        self.script.lock().unwrap().push_back(step);
    }

    pub fn script_many(&self, step: PollStep, count: usize) {
        let mut script = self.script.lock().unwrap();
        for _ in 0..count {
            script.push_back(step.clone());
        }
    }

    /// Behavior once the script is exhausted.
    pub fn set_fallback(&self, step: PollStep) {
        *self.fallback.lock().unwrap() = step;
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Virtual-clock gap between two recorded fetches.
    pub fn gap(&self, earlier: usize, later: usize) -> Duration {
        let times = self.call_times.lock().unwrap();
        times[later] - times[earlier]
    }
}

#[async_trait::async_trait]
impl PollTransport for MockPoll {
    async fn fetch(&self, _tournament_id: &str) -> arena_link::Result<PollSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(Instant::now());

        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.lock().unwrap().clone());

        match step {
            PollStep::Ok(statistics) => Ok(PollSnapshot {
                success: true,
                statistics: to_stats(statistics),
                status: Some(TournamentStatus::InProgress),
                timestamp: Some(1_000),
            }),
            PollStep::OkWithStatus(statistics, status) => Ok(PollSnapshot {
                success: true,
                statistics: to_stats(statistics),
                status: Some(status),
                timestamp: Some(1_000),
            }),
            PollStep::NotSuccess => Ok(PollSnapshot {
                success: false,
                statistics: StatisticsSnapshot::default(),
                status: None,
                timestamp: None,
            }),
            PollStep::NetworkErr => Err(ArenaLinkError::FetchError(
                "scripted network failure".to_string(),
            )),
            PollStep::Hang => {
                self.hang_gate.notified().await;
                Ok(PollSnapshot {
                    success: true,
                    statistics: StatisticsSnapshot::default(),
                    status: Some(TournamentStatus::InProgress),
                    timestamp: Some(2_000),
                })
            }
        }
    }
}

// ── helpers ─────────────────────────────────────────────────────────────────

pub fn to_stats(value: serde_json::Value) -> StatisticsSnapshot {
    serde_json::from_value(value).expect("statistics payload must be a JSON object")
}

pub fn stats_json(matches_played: u64) -> serde_json::Value {
    json!({ "matches_played": matches_played })
}

/// Register a capturing handler; returns the shared capture buffer.
pub fn capture_events(
    manager: &LiveUpdatesManager,
    kind: UpdateEventKind,
) -> Arc<Mutex<Vec<UpdateEvent>>> {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();
    manager.on(kind, move |event| {
        sink.lock().unwrap().push(event.clone());
    });
    captured
}

const WAIT_CEILING: Duration = Duration::from_secs(600);
const WAIT_TICK: Duration = Duration::from_millis(5);

/// Wait (in virtual time) until the manager reaches the given state.
pub async fn wait_for_state(manager: &LiveUpdatesManager, state: ConnectionState) {
    tokio::time::timeout(WAIT_CEILING, async {
        while manager.state() != state {
            tokio::time::sleep(WAIT_TICK).await;
        }
    })
    .await
    .unwrap_or_else(|_| {
        panic!(
            "manager never reached {:?}; stuck in {:?}",
            state,
            manager.state()
        )
    });
}

/// Wait (in virtual time) until a counter reaches at least `target`.
pub async fn wait_for_count(counter: &AtomicU32, target: u32) {
    tokio::time::timeout(WAIT_CEILING, async {
        while counter.load(Ordering::SeqCst) < target {
            tokio::time::sleep(WAIT_TICK).await;
        }
    })
    .await
    .unwrap_or_else(|_| {
        panic!(
            "counter stuck at {} waiting for {}",
            counter.load(Ordering::SeqCst),
            target
        )
    });
}

/// Wait (in virtual time) until a capture buffer holds at least `target` events.
pub async fn wait_for_events(buf: &Mutex<Vec<UpdateEvent>>, target: usize) {
    tokio::time::timeout(WAIT_CEILING, async {
        while buf.lock().unwrap().len() < target {
            tokio::time::sleep(WAIT_TICK).await;
        }
    })
    .await
    .unwrap_or_else(|_| {
        panic!(
            "capture buffer stuck at {} waiting for {}",
            buf.lock().unwrap().len(),
            target
        )
    });
}

/// Wait until the manager reports the given reconnect attempt count.
pub async fn wait_for_attempts(manager: &LiveUpdatesManager, target: u32) {
    tokio::time::timeout(WAIT_CEILING, async {
        while manager.reconnect_attempts() != target {
            tokio::time::sleep(WAIT_TICK).await;
        }
    })
    .await
    .unwrap_or_else(|_| {
        panic!(
            "reconnect_attempts stuck at {} waiting for {}",
            manager.reconnect_attempts(),
            target
        )
    });
}

/// Let the background task absorb queued commands/frames.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
