//! Raw scoring events produced upstream by the match feed.

use crate::domain::{MatchId, PlayerId, Points, TimeMs};
use serde::{Deserialize, Serialize};

/// A single scoring event for one player in one match.
///
/// Append-only; `points` may be negative (penalties, ducks, red cards).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub event_id: String,
    pub player_id: PlayerId,
    pub match_id: MatchId,
    pub points: Points,
    /// Innings/half/quarter the event belongs to.
    pub round: u32,
    pub timestamp: TimeMs,
}

impl MatchEvent {
    pub fn new(
        event_id: impl Into<String>,
        player_id: PlayerId,
        match_id: MatchId,
        points: Points,
        round: u32,
        timestamp: TimeMs,
    ) -> Self {
        MatchEvent {
            event_id: event_id.into(),
            player_id,
            match_id,
            points,
            round,
            timestamp,
        }
    }
}
