//! Sequencing of recomputes, snapshots, cache refreshes and update emission.

pub mod broadcast;
pub mod dispatcher;
pub mod pipeline;
pub mod service;

pub use broadcast::{
    BroadcastError, Broadcaster, ChannelBroadcaster, LeaderboardUpdate, LogBroadcaster,
};
pub use dispatcher::{
    DispatchWorker, DispatcherHandle, DispatcherState, DispatcherStats, EnqueueOutcome, Trigger,
    TriggerSource, DEFAULT_QUEUE_CAPACITY,
};
pub use pipeline::{CycleOutcome, LiveLeaderboard, PipelineSettings, RankingPipeline};
pub use service::{FanOutSummary, LeaderboardService};
