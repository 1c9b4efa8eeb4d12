//! Per-workload serialization of the read-decide-write sequence
//!
//! Without it, two triggers for the same deployment can read the same current
//! count and the last write wins. With it, triggers for one (namespace,
//! deployment) run one after another; different workloads never wait on each
//! other.

use crate::policy::WorkloadRef;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Keyed async mutexes, one per workload currently in use
#[derive(Debug, Default)]
pub struct WorkloadLocks {
    locks: Mutex<HashMap<WorkloadRef, Arc<AsyncMutex<()>>>>,
}

impl WorkloadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `workload`. Released when the guard drops.
    pub async fn acquire(&self, workload: &WorkloadRef) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            // Entries only referenced by the map have no holder and no waiter.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(workload.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of workloads with a holder or waiter, as of the last acquire.
    pub fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_workload_is_exclusive() {
        let locks = Arc::new(WorkloadLocks::new());
        let workload = WorkloadRef::new("ns", "api");

        let guard = locks.acquire(&workload).await;
        let waiter = {
            let locks = Arc::clone(&locks);
            let workload = workload.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&workload).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_workloads_do_not_block() {
        let locks = WorkloadLocks::new();
        let _a = locks.acquire(&WorkloadRef::new("ns", "a")).await;
        let b = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(&WorkloadRef::new("ns", "b")),
        )
        .await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_idle_entries_are_pruned() {
        let locks = WorkloadLocks::new();
        drop(locks.acquire(&WorkloadRef::new("ns", "a")).await);
        drop(locks.acquire(&WorkloadRef::new("ns", "b")).await);
        assert_eq!(locks.tracked(), 1);
    }
}
