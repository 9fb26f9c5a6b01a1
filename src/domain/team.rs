//! Fantasy team compositions and their structural checks.

use crate::domain::{MatchId, PlayerId, Points, TeamId, TimeMs, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// A user's squad for one match, with exactly one captain and one vice-captain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamComposition {
    pub team_id: TeamId,
    pub owner_user_id: UserId,
    pub match_id: MatchId,
    pub player_ids: Vec<PlayerId>,
    pub captain_id: PlayerId,
    pub vice_captain_id: PlayerId,
    pub credits_used: Points,
    /// Creation time; earlier teams win ties on points.
    pub created_at: TimeMs,
}

/// Structural defects in a composition. These are upstream data-integrity bugs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
    #[error("team {0} has no players")]
    EmptySquad(TeamId),
    #[error("team {team} lists player {player} more than once")]
    DuplicatePlayer { team: TeamId, player: PlayerId },
    #[error("team {team} uses player {player} as both captain and vice-captain")]
    CaptainIsViceCaptain { team: TeamId, player: PlayerId },
    #[error("team {team} captain {player} is not in the squad")]
    CaptainNotInSquad { team: TeamId, player: PlayerId },
    #[error("team {team} vice-captain {player} is not in the squad")]
    ViceCaptainNotInSquad { team: TeamId, player: PlayerId },
}

impl TeamComposition {
    /// Check the captain/vice-captain and squad invariants.
    ///
    /// # Errors
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), CompositionError> {
        if self.player_ids.is_empty() {
            return Err(CompositionError::EmptySquad(self.team_id.clone()));
        }

        let mut seen = HashSet::with_capacity(self.player_ids.len());
        for player in &self.player_ids {
            if !seen.insert(player) {
                return Err(CompositionError::DuplicatePlayer {
                    team: self.team_id.clone(),
                    player: player.clone(),
                });
            }
        }

        if self.captain_id == self.vice_captain_id {
            return Err(CompositionError::CaptainIsViceCaptain {
                team: self.team_id.clone(),
                player: self.captain_id.clone(),
            });
        }
        if !seen.contains(&self.captain_id) {
            return Err(CompositionError::CaptainNotInSquad {
                team: self.team_id.clone(),
                player: self.captain_id.clone(),
            });
        }
        if !seen.contains(&self.vice_captain_id) {
            return Err(CompositionError::ViceCaptainNotInSquad {
                team: self.team_id.clone(),
                player: self.vice_captain_id.clone(),
            });
        }

        Ok(())
    }
}
