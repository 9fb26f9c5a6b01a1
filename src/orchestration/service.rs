//! Public façade over the ranking pipeline and the dispatcher.

use crate::datasource::{ContestStore, Stores};
use crate::domain::{ContestId, ContestInfo, Leaderboard, MatchId, UserId, UserRank};
use crate::engine::EngineError;
use crate::live::CacheView;
use crate::orchestration::broadcast::Broadcaster;
use crate::orchestration::dispatcher::{
    self, DispatcherHandle, EnqueueOutcome, Trigger, TriggerSource,
};
use crate::orchestration::pipeline::{LiveLeaderboard, PipelineSettings, RankingPipeline};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Result of fanning a match-level trigger out to its contests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FanOutSummary {
    pub contests: usize,
    pub queued: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone)]
pub struct LeaderboardService {
    pipeline: Arc<RankingPipeline>,
    dispatcher: DispatcherHandle,
    contests: Arc<dyn ContestStore>,
}

impl LeaderboardService {
    pub fn new(
        pipeline: Arc<RankingPipeline>,
        dispatcher: DispatcherHandle,
        contests: Arc<dyn ContestStore>,
    ) -> Self {
        Self {
            pipeline,
            dispatcher,
            contests,
        }
    }

    /// Build the pipeline and spawn the dispatch worker.
    pub fn start(
        stores: Stores,
        settings: PipelineSettings,
        broadcaster: Arc<dyn Broadcaster>,
        queue_capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let contests = stores.contests.clone();
        let pipeline = Arc::new(RankingPipeline::new(stores, settings));
        let (handle, worker) = dispatcher::spawn(pipeline.clone(), broadcaster, queue_capacity);
        (Self::new(pipeline, handle, contests), worker)
    }

    pub fn pipeline(&self) -> &Arc<RankingPipeline> {
        &self.pipeline
    }

    pub fn dispatcher(&self) -> &DispatcherHandle {
        &self.dispatcher
    }

    /// Contest metadata, or `ContestNotFound`.
    pub async fn contest_info(&self, contest_id: &ContestId) -> Result<ContestInfo, EngineError> {
        self.pipeline.ranking().contest(contest_id).await
    }

    pub async fn calculate_leaderboard(
        &self,
        contest_id: &ContestId,
    ) -> Result<Leaderboard, EngineError> {
        self.pipeline.calculate_leaderboard(contest_id).await
    }

    pub async fn get_live_leaderboard(
        &self,
        contest_id: &ContestId,
        user_id: &UserId,
    ) -> Result<LiveLeaderboard, EngineError> {
        self.pipeline.get_live_leaderboard(contest_id, user_id).await
    }

    /// `None` uses the configured max-age.
    pub async fn get_cached_leaderboard(
        &self,
        contest_id: &ContestId,
        max_age: Option<Duration>,
    ) -> Result<CacheView, EngineError> {
        let max_age = max_age.unwrap_or(self.pipeline.settings().cache_max_age);
        self.pipeline.get_cached_leaderboard(contest_id, max_age).await
    }

    pub async fn rank_of(
        &self,
        contest_id: &ContestId,
        user_id: &UserId,
    ) -> Result<UserRank, EngineError> {
        self.pipeline.rank_of(contest_id, user_id).await
    }

    /// Enqueue a recompute for every contest scored from `match_id`.
    pub async fn trigger_recalculation(
        &self,
        match_id: &MatchId,
    ) -> Result<FanOutSummary, EngineError> {
        let contest_ids = self.contests.contests_for_match(match_id).await?;
        let mut summary = FanOutSummary {
            contests: contest_ids.len(),
            ..FanOutSummary::default()
        };

        for contest_id in contest_ids {
            match self
                .dispatcher
                .try_enqueue(Trigger::new(contest_id, TriggerSource::MatchEvent, None))
            {
                EnqueueOutcome::Queued => summary.queued += 1,
                EnqueueOutcome::Dropped | EnqueueOutcome::Closed => summary.dropped += 1,
            }
        }

        info!(
            match_id = %match_id,
            contests = summary.contests,
            queued = summary.queued,
            dropped = summary.dropped,
            "match recalculation fanned out"
        );
        Ok(summary)
    }

    /// Enqueue a single-contest recompute. Never blocks.
    pub fn trigger_real_time_update(
        &self,
        contest_id: ContestId,
        source: TriggerSource,
        match_event_id: Option<String>,
    ) -> EnqueueOutcome {
        self.dispatcher
            .try_enqueue(Trigger::new(contest_id, source, match_event_id))
    }
}
