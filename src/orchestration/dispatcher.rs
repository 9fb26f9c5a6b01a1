//! Bounded-queue dispatcher that turns triggers into leaderboard updates.
//!
//! A single worker drains the queue in order across all contests. Producers
//! never block: when the queue is full the newest trigger is dropped, its
//! contest is marked dirty and remembered in a backlog set, and the worker
//! runs one recompute per backlogged contest before it next waits.

use crate::domain::ContestId;
use crate::engine::EngineError;
use crate::orchestration::broadcast::{Broadcaster, LeaderboardUpdate};
use crate::orchestration::pipeline::RankingPipeline;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{
    self,
    error::{TryRecvError, TrySendError},
};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Why a recompute was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    MatchEvent,
    Manual,
    Scheduled,
    /// Replay of a trigger dropped under backpressure.
    Backlog,
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerSource::MatchEvent => write!(f, "match_event"),
            TriggerSource::Manual => write!(f, "manual"),
            TriggerSource::Scheduled => write!(f, "scheduled"),
            TriggerSource::Backlog => write!(f, "backlog"),
        }
    }
}

/// A request to recompute one contest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub contest_id: ContestId,
    pub source: TriggerSource,
    pub match_event_id: Option<String>,
    pub requested_at: DateTime<Utc>,
}

impl Trigger {
    pub fn new(contest_id: ContestId, source: TriggerSource, match_event_id: Option<String>) -> Self {
        Trigger {
            contest_id,
            source,
            match_event_id,
            requested_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnqueueOutcome {
    Queued,
    /// Queue full; the contest was backlogged instead.
    Dropped,
    /// The worker is gone.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatcherState {
    Idle,
    Triggered,
    Processing,
}

impl DispatcherState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => DispatcherState::Triggered,
            2 => DispatcherState::Processing,
            _ => DispatcherState::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    pub processed: u64,
    pub failed: u64,
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Shared {
    state: AtomicU8,
    backlog: Mutex<BTreeSet<ContestId>>,
    processed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl Shared {
    fn set_state(&self, state: DispatcherState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn mark_triggered(&self) {
        let _ = self.state.compare_exchange(
            DispatcherState::Idle as u8,
            DispatcherState::Triggered as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    fn backlog(&self) -> std::sync::MutexGuard<'_, BTreeSet<ContestId>> {
        self.backlog.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn state(&self) -> DispatcherState {
        DispatcherState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Producer side. Cheap to clone; the worker exits once every handle is dropped.
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    tx: mpsc::Sender<Trigger>,
    shared: Arc<Shared>,
    pipeline: Arc<RankingPipeline>,
}

impl DispatcherHandle {
    /// Enqueue without waiting.
    pub fn try_enqueue(&self, trigger: Trigger) -> EnqueueOutcome {
        match self.tx.try_send(trigger) {
            Ok(()) => {
                self.shared.mark_triggered();
                EnqueueOutcome::Queued
            }
            Err(TrySendError::Full(trigger)) => {
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                self.pipeline.invalidate(&trigger.contest_id);
                let first = self.shared.backlog().insert(trigger.contest_id.clone());
                warn!(
                    contest_id = %trigger.contest_id,
                    source = %trigger.source,
                    match_event_id = ?trigger.match_event_id,
                    backlogged = first,
                    "dispatch queue full; trigger dropped"
                );
                EnqueueOutcome::Dropped
            }
            Err(TrySendError::Closed(trigger)) => {
                warn!(contest_id = %trigger.contest_id, "dispatch queue closed; trigger discarded");
                EnqueueOutcome::Closed
            }
        }
    }

    pub fn state(&self) -> DispatcherState {
        self.shared.state()
    }

    pub fn stats(&self) -> DispatcherStats {
        self.shared.stats()
    }

    /// Contests owed a recompute because their trigger was dropped.
    pub fn backlog(&self) -> Vec<ContestId> {
        self.shared.backlog().iter().cloned().collect()
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// False once the worker has stopped receiving.
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Consumer side. Run it on its own task.
#[derive(Debug)]
pub struct DispatchWorker {
    rx: mpsc::Receiver<Trigger>,
    shared: Arc<Shared>,
    pipeline: Arc<RankingPipeline>,
    broadcaster: Arc<dyn Broadcaster>,
}

/// Create a dispatcher without starting its worker.
pub fn channel(
    pipeline: Arc<RankingPipeline>,
    broadcaster: Arc<dyn Broadcaster>,
    capacity: usize,
) -> (DispatcherHandle, DispatchWorker) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let shared = Arc::new(Shared::default());
    let handle = DispatcherHandle {
        tx,
        shared: shared.clone(),
        pipeline: pipeline.clone(),
    };
    let worker = DispatchWorker {
        rx,
        shared,
        pipeline,
        broadcaster,
    };
    (handle, worker)
}

/// Create a dispatcher and spawn its worker on the current runtime.
pub fn spawn(
    pipeline: Arc<RankingPipeline>,
    broadcaster: Arc<dyn Broadcaster>,
    capacity: usize,
) -> (DispatcherHandle, JoinHandle<()>) {
    let (handle, worker) = channel(pipeline, broadcaster, capacity);
    (handle, tokio::spawn(worker.run()))
}

impl DispatchWorker {
    /// Drain triggers until every handle is dropped and the queue is empty.
    pub async fn run(mut self) {
        info!(capacity = self.rx.max_capacity(), "dispatch worker started");
        loop {
            match self.rx.try_recv() {
                Ok(trigger) => {
                    self.process(trigger).await;
                    continue;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => break,
            }

            // Queue is empty: settle what was dropped before waiting again.
            self.drain_backlog().await;
            self.settle();

            match self.rx.recv().await {
                Some(trigger) => self.process(trigger).await,
                None => break,
            }
        }
        self.drain_backlog().await;
        self.shared.set_state(DispatcherState::Idle);
        info!("dispatch worker stopped");
    }

    async fn drain_backlog(&self) {
        loop {
            let next = self.shared.backlog().pop_first();
            match next {
                Some(contest_id) => {
                    self.process(Trigger::new(contest_id, TriggerSource::Backlog, None))
                        .await
                }
                None => break,
            }
        }
    }

    fn settle(&self) {
        if self.rx.is_empty() && self.shared.backlog().is_empty() {
            self.shared.set_state(DispatcherState::Idle);
        } else {
            self.shared.set_state(DispatcherState::Triggered);
        }
    }

    async fn process(&self, trigger: Trigger) {
        self.shared.set_state(DispatcherState::Processing);

        let outcome = match self.pipeline.run_cycle(&trigger).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.shared.failed.fetch_add(1, Ordering::Relaxed);
                match &err {
                    EngineError::InvariantViolation(_) => error!(
                        contest_id = %trigger.contest_id,
                        source = %trigger.source,
                        error = %err,
                        "data integrity violation; cycle aborted"
                    ),
                    _ => warn!(
                        contest_id = %trigger.contest_id,
                        source = %trigger.source,
                        match_event_id = ?trigger.match_event_id,
                        error = %err,
                        "cycle aborted; serving last-good leaderboard"
                    ),
                }
                return;
            }
        };

        self.shared.processed.fetch_add(1, Ordering::Relaxed);
        let update =
            LeaderboardUpdate::from_cycle(&trigger, &outcome, self.pipeline.settings().top_n);
        if let Err(err) = self.broadcaster.publish(&update).await {
            warn!(contest_id = %trigger.contest_id, update_id = %update.update_id, error = %err, "broadcast failed");
        }
    }
}
