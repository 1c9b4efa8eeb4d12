//! In-memory orchestrator for tests

use super::ClusterOrchestrator;
use crate::error::{Result, ScalerError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Failure injected into one side of the fake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fault {
    #[default]
    None,
    /// Return an API error
    Error,
    /// Never answer within any reasonable deadline
    Hang,
}

/// Replica counts held in memory, with call counters and fault injection.
///
/// Unknown workloads read as zero, the same as a Deployment without replicas.
#[derive(Debug, Default)]
pub struct FakeOrchestrator {
    replicas: Mutex<HashMap<(String, String), i32>>,
    read_fault: Mutex<HashMap<(String, String), Fault>>,
    write_fault: Mutex<HashMap<(String, String), Fault>>,
    read_delay: Mutex<Duration>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

fn key(namespace: &str, deployment: &str) -> (String, String) {
    (namespace.to_string(), deployment.to_string())
}

impl FakeOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replicas(self, namespace: &str, deployment: &str, replicas: i32) -> Self {
        self.set(namespace, deployment, replicas);
        self
    }

    pub fn set(&self, namespace: &str, deployment: &str, replicas: i32) {
        self.lock_replicas().insert(key(namespace, deployment), replicas);
    }

    pub fn replicas(&self, namespace: &str, deployment: &str) -> Option<i32> {
        self.lock_replicas().get(&key(namespace, deployment)).copied()
    }

    pub fn fail_reads(&self, namespace: &str, deployment: &str, fault: Fault) {
        lock(&self.read_fault).insert(key(namespace, deployment), fault);
    }

    pub fn fail_writes(&self, namespace: &str, deployment: &str, fault: Fault) {
        lock(&self.write_fault).insert(key(namespace, deployment), fault);
    }

    /// Delay every read, widening the read-then-write window.
    pub fn delay_reads(&self, delay: Duration) {
        *lock(&self.read_delay) = delay;
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock_replicas(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), i32>> {
        lock(&self.replicas)
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn inject(fault: Fault, op: &str) -> Result<()> {
    match fault {
        Fault::None => Ok(()),
        Fault::Error => Err(ScalerError::KubeApi(format!("injected {} failure", op))),
        Fault::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl ClusterOrchestrator for FakeOrchestrator {
    async fn get_replicas(&self, namespace: &str, deployment: &str) -> Result<i32> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let k = key(namespace, deployment);
        let fault = lock(&self.read_fault).get(&k).copied().unwrap_or_default();
        inject(fault, "read").await?;

        let delay = *lock(&self.read_delay);
        let current = self.lock_replicas().get(&k).copied().unwrap_or(0);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(current)
    }

    async fn set_replicas(&self, namespace: &str, deployment: &str, replicas: i32) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let k = key(namespace, deployment);
        let fault = lock(&self.write_fault).get(&k).copied().unwrap_or_default();
        inject(fault, "write").await?;

        self.lock_replicas().insert(k, replicas);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_round_trip_and_counts() {
        let fake = FakeOrchestrator::new().with_replicas("ns", "api", 3);
        assert_eq!(fake.get_replicas("ns", "api").await.unwrap(), 3);
        fake.set_replicas("ns", "api", 5).await.unwrap();
        assert_eq!(fake.replicas("ns", "api"), Some(5));
        assert_eq!(fake.read_count(), 1);
        assert_eq!(fake.write_count(), 1);
    }

    #[tokio::test]
    async fn test_fake_unknown_workload_reads_zero() {
        let fake = FakeOrchestrator::new();
        assert_eq!(fake.get_replicas("ns", "missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fake_injected_error() {
        let fake = FakeOrchestrator::new().with_replicas("ns", "api", 3);
        fake.fail_writes("ns", "api", Fault::Error);
        assert!(fake.set_replicas("ns", "api", 4).await.is_err());
        assert_eq!(fake.replicas("ns", "api"), Some(3));
    }
}
