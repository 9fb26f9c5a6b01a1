//! Contest metadata and participant rows.

use crate::domain::{ContestId, MatchId, Points, TeamId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One team entered into a contest.
///
/// `rank` is written only by the ranking pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestParticipant {
    pub contest_id: ContestId,
    pub team_id: TeamId,
    pub user_id: UserId,
    pub rank: Option<u32>,
    pub prize_won: Option<Points>,
}

impl ContestParticipant {
    pub fn new(contest_id: ContestId, team_id: TeamId, user_id: UserId) -> Self {
        ContestParticipant {
            contest_id,
            team_id,
            user_id,
            rank: None,
            prize_won: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContestStatus {
    Upcoming,
    Live,
    Completed,
    Cancelled,
}

impl fmt::Display for ContestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContestStatus::Upcoming => write!(f, "upcoming"),
            ContestStatus::Live => write!(f, "live"),
            ContestStatus::Completed => write!(f, "completed"),
            ContestStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for ContestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(ContestStatus::Upcoming),
            "live" => Ok(ContestStatus::Live),
            "completed" => Ok(ContestStatus::Completed),
            "cancelled" => Ok(ContestStatus::Cancelled),
            other => Err(format!("unknown contest status: {}", other)),
        }
    }
}

/// Contest-level facts the ranking pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestInfo {
    pub contest_id: ContestId,
    pub match_id: MatchId,
    pub total_participants: u32,
    pub status: ContestStatus,
}
