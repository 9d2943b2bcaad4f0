//! Per-client write locks.
//!
//! Every mutation of a client's ledger runs load, recompute and commit while
//! holding that client's lock, so ripple passes for one client never
//! interleave. Different clients proceed in parallel. A client's entry is
//! dropped once nobody holds or waits for its lock.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

type LockMap = DashMap<Uuid, Arc<Mutex<()>>>;

#[derive(Debug, Default, Clone)]
pub struct ClientLocks {
    locks: Arc<LockMap>,
}

/// Exclusive access to one client's ledger until dropped.
#[derive(Debug)]
pub struct ClientLockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    client_id: Uuid,
    locks: Arc<LockMap>,
}

impl ClientLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `client_id`'s ledger.
    pub async fn acquire(&self, client_id: Uuid) -> ClientLockGuard {
        // Clone the Arc out so the shard lock is released before awaiting.
        let lock = self
            .locks
            .entry(client_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        ClientLockGuard {
            guard: Some(lock.lock_owned().await),
            client_id,
            locks: self.locks.clone(),
        }
    }

    /// Clients with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for ClientLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own reference left: no holder and no waiter. New
        // acquirers clone under the same shard lock, so this cannot race.
        self.locks
            .remove_if(&self.client_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
