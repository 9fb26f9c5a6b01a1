//! Snapshot diffing and update classification.

use crate::domain::{Points, RankChangeEvent, RankingSnapshot, UpdateType, UserId};

/// Change events for users whose rank or points moved, plus new entrants.
///
/// With no previous snapshot every user is a new entrant. Users missing from
/// `current` produce no event (see [`removed_users`]). Output is ordered by
/// new rank.
pub fn diff_rankings(
    previous: Option<&RankingSnapshot>,
    current: &RankingSnapshot,
) -> Vec<RankChangeEvent> {
    let mut events: Vec<RankChangeEvent> = current
        .rankings
        .iter()
        .filter_map(|(user_id, now)| {
            match previous.and_then(|p| p.rankings.get(user_id)) {
                Some(before) if before.rank == now.rank && before.points == now.points => None,
                Some(before) => Some(RankChangeEvent::new(
                    user_id.clone(),
                    now.team_id.clone(),
                    before.rank,
                    now.rank,
                    before.points,
                    now.points,
                )),
                None => Some(RankChangeEvent::new(
                    user_id.clone(),
                    now.team_id.clone(),
                    0,
                    now.rank,
                    Points::zero(),
                    now.points,
                )),
            }
        })
        .collect();

    events.sort_by_key(|e| e.new_rank);
    events
}

/// Users ranked in `previous` but gone from `current`, in id order.
pub fn removed_users(previous: Option<&RankingSnapshot>, current: &RankingSnapshot) -> Vec<UserId> {
    previous
        .map(|p| {
            p.rankings
                .keys()
                .filter(|user_id| !current.rankings.contains_key(*user_id))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// new_entry > rank_change > points_update > no_change.
pub fn classify_update(events: &[RankChangeEvent]) -> UpdateType {
    if events.iter().any(RankChangeEvent::is_new_entry) {
        UpdateType::NewEntry
    } else if events.iter().any(|e| e.rank_change != 0) {
        UpdateType::RankChange
    } else if events.iter().any(|e| !e.points_change.is_zero()) {
        UpdateType::PointsUpdate
    } else {
        UpdateType::NoChange
    }
}
