use crate::domain::{ContestId, RankingSnapshot};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// The single "current" snapshot per contest, replaced atomically.
///
/// Has its own lock, independent of the cache map.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<HashMap<ContestId, Arc<RankingSnapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, contest_id: &ContestId) -> Option<Arc<RankingSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(contest_id)
            .cloned()
    }

    /// Install `snapshot` as its contest's current one, returning the one it superseded.
    pub fn replace(&self, snapshot: Arc<RankingSnapshot>) -> Option<Arc<RankingSnapshot>> {
        self.current
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(snapshot.contest_id.clone(), snapshot)
    }

    pub fn len(&self) -> usize {
        self.current.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
