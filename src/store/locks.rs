use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::{ContentId, UserId};

type Pair = (UserId, ContentId);

/// Per-(user, content) async locks, so a read-decide-write on one watch position is not interleaved with
/// another session doing the same for the same pair.
///
/// Entries are dropped again once nobody holds or waits on them.
#[derive(Debug, Default)]
pub struct PairLocks {
    locks: DashMap<Pair, Arc<Mutex<()>>>,
}

impl PairLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, user_id: UserId, content_id: ContentId) -> PairGuard<'_> {
        let key = (user_id, content_id);
        let mutex = self.locks.entry(key).or_default().clone();
        let guard = mutex.lock_owned().await;

        PairGuard {
            owner: self,
            key,
            guard: Some(guard),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[derive(Debug)]
pub struct PairGuard<'a> {
    owner: &'a PairLocks,
    key: Pair,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PairGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        // the map holds one reference, a waiter or a new holder holds another
        self.owner
            .locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
