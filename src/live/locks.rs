use crate::domain::ContestId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<ContestId, Arc<AsyncMutex<()>>>;

/// One async mutex per contest. Holding a contest's guard serializes writers
/// for that contest only; other contests never contend.
///
/// Entries live only while someone holds or waits on them.
#[derive(Debug, Clone, Default)]
pub struct ContestLocks {
    inner: Arc<Mutex<LockMap>>,
}

impl ContestLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the contest's critical section.
    pub async fn lock(&self, contest_id: &ContestId) -> ContestGuard {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.entry(contest_id.clone()).or_default().clone()
        };
        let guard = mutex.lock_owned().await;
        ContestGuard {
            contest_id: contest_id.clone(),
            locks: self.inner.clone(),
            guard: Some(guard),
        }
    }

    /// Contests with a live lock entry.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Held critical section. Dropping it releases the contest and removes the
/// map entry when nobody else is waiting.
#[derive(Debug)]
pub struct ContestGuard {
    contest_id: ContestId,
    locks: Arc<Mutex<LockMap>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ContestGuard {
    fn drop(&mut self) {
        // New waiters clone under the map lock, so the count is stable here.
        let mut map = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        drop(self.guard.take());
        let idle = map
            .get(&self.contest_id)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1);
        if idle {
            map.remove(&self.contest_id);
        }
    }
}
