//! In-memory store for tests and local runs without a database.

use super::{ContestStore, MatchEventStore, StoreError, TeamStore};
use crate::domain::{
    ContestId, ContestInfo, ContestParticipant, ContestStatus, MatchEvent, MatchId, PlayerId,
    TeamComposition, TeamId,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

#[derive(Debug, Default)]
struct MockData {
    events: Vec<MatchEvent>,
    teams: BTreeMap<TeamId, TeamComposition>,
    contests: BTreeMap<ContestId, (MatchId, ContestStatus)>,
    participants: BTreeMap<ContestId, Vec<ContestParticipant>>,
    recorded_ranks: HashMap<ContestId, Vec<(TeamId, u32)>>,
}

/// Mock store that serves all three store roles from memory.
///
/// Data can be appended after construction so tests can simulate live
/// scoring, and reads can be switched to fail to simulate an outage.
#[derive(Debug, Default)]
pub struct MockStore {
    data: RwLock<MockData>,
    failing: AtomicBool,
    participant_reads: AtomicUsize,
    event_reads: AtomicUsize,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a contest for a match with `live` status.
    pub fn with_contest(self, contest_id: ContestId, match_id: MatchId) -> Self {
        self.with_contest_status(contest_id, match_id, ContestStatus::Live)
    }

    pub fn with_contest_status(
        self,
        contest_id: ContestId,
        match_id: MatchId,
        status: ContestStatus,
    ) -> Self {
        self.write()
            .contests
            .insert(contest_id, (match_id, status));
        self
    }

    /// Add a team and enter it into a contest under its owner.
    pub fn with_entry(self, contest_id: ContestId, team: TeamComposition) -> Self {
        self.add_entry(contest_id, team);
        self
    }

    pub fn with_event(self, event: MatchEvent) -> Self {
        self.push_event(event);
        self
    }

    pub fn with_events(self, events: Vec<MatchEvent>) -> Self {
        self.write().events.extend(events);
        self
    }

    pub fn push_event(&self, event: MatchEvent) {
        self.write().events.push(event);
    }

    pub fn add_entry(&self, contest_id: ContestId, team: TeamComposition) {
        let mut data = self.write();
        let participant =
            ContestParticipant::new(contest_id.clone(), team.team_id.clone(), team.owner_user_id.clone());
        data.participants.entry(contest_id).or_default().push(participant);
        data.teams.insert(team.team_id.clone(), team);
    }

    /// Withdraw a team from a contest (disqualification, refund).
    pub fn remove_entry(&self, contest_id: &ContestId, team_id: &TeamId) {
        if let Some(entries) = self.write().participants.get_mut(contest_id) {
            entries.retain(|p| &p.team_id != team_id);
        }
    }

    /// Make every read fail with `StoreError::Unavailable` until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `participants_in_contest` calls, i.e. ranking recomputes.
    pub fn participant_reads(&self) -> usize {
        self.participant_reads.load(Ordering::SeqCst)
    }

    /// Number of `events_for` calls.
    pub fn event_reads(&self) -> usize {
        self.event_reads.load(Ordering::SeqCst)
    }

    pub fn recorded_ranks(&self, contest_id: &ContestId) -> Option<Vec<(TeamId, u32)>> {
        self.read().recorded_ranks.get(contest_id).cloned()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("mock store offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MockData> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MockData> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl MatchEventStore for MockStore {
    async fn events_for(
        &self,
        player_id: &PlayerId,
        match_id: &MatchId,
    ) -> Result<Vec<MatchEvent>, StoreError> {
        self.event_reads.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self
            .read()
            .events
            .iter()
            .filter(|e| &e.player_id == player_id && &e.match_id == match_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TeamStore for MockStore {
    async fn teams_in_contest(
        &self,
        contest_id: &ContestId,
    ) -> Result<Vec<TeamComposition>, StoreError> {
        self.check_available()?;
        let data = self.read();
        Ok(data
            .participants
            .get(contest_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|p| data.teams.get(&p.team_id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn participants_in_contest(
        &self,
        contest_id: &ContestId,
    ) -> Result<Vec<ContestParticipant>, StoreError> {
        self.participant_reads.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self
            .read()
            .participants
            .get(contest_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn record_ranks(
        &self,
        contest_id: &ContestId,
        ranks: &[(TeamId, u32)],
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let mut data = self.write();
        if let Some(entries) = data.participants.get_mut(contest_id) {
            for entry in entries.iter_mut() {
                entry.rank = ranks
                    .iter()
                    .find(|(team_id, _)| team_id == &entry.team_id)
                    .map(|(_, rank)| *rank);
            }
        }
        data.recorded_ranks
            .insert(contest_id.clone(), ranks.to_vec());
        Ok(())
    }
}

#[async_trait]
impl ContestStore for MockStore {
    async fn contest_info(
        &self,
        contest_id: &ContestId,
    ) -> Result<Option<ContestInfo>, StoreError> {
        self.check_available()?;
        let data = self.read();
        Ok(data.contests.get(contest_id).map(|(match_id, status)| ContestInfo {
            contest_id: contest_id.clone(),
            match_id: match_id.clone(),
            total_participants: data
                .participants
                .get(contest_id)
                .map(|p| p.len() as u32)
                .unwrap_or(0),
            status: *status,
        }))
    }

    async fn contests_for_match(&self, match_id: &MatchId) -> Result<Vec<ContestId>, StoreError> {
        self.check_available()?;
        Ok(self
            .read()
            .contests
            .iter()
            .filter(|(_, (m, _))| m == match_id)
            .map(|(id, _)| id.clone())
            .collect())
    }
}
