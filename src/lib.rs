pub mod api;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod live;
pub mod orchestration;

pub use config::Config;
pub use datasource::{
    ContestStore, MatchEventStore, MockStore, StoreError, Stores, TeamStore,
};
pub use db::{init_db, Repository};
pub use domain::{
    ContestId, ContestInfo, ContestParticipant, ContestStatus, Leaderboard, LeaderboardEntry,
    MatchEvent, MatchId, Multiplier, PlayerId, Points, RankChangeEvent, TeamComposition, TeamId,
    TimeMs, UpdateType, UserId, UserRank,
};
pub use engine::EngineError;
pub use error::AppError;
pub use orchestration::{
    ChannelBroadcaster, LeaderboardService, LeaderboardUpdate, PipelineSettings, TriggerSource,
};
