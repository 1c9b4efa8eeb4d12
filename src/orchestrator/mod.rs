//! Cluster orchestrator boundary
//!
//! The dispatcher only needs two operations from the cluster: read the desired
//! replica count of a deployment and set a new one. [`KubeOrchestrator`] talks
//! to the Kubernetes API; tests substitute [`testing::FakeOrchestrator`].

mod kubernetes;
#[doc(hidden)]
pub mod testing;

pub use kubernetes::KubeOrchestrator;

use crate::error::Result;

/// Reads and writes replica counts for a (namespace, deployment) pair
#[async_trait::async_trait]
pub trait ClusterOrchestrator: Send + Sync {
    /// Current desired replica count
    async fn get_replicas(&self, namespace: &str, deployment: &str) -> Result<i32>;

    /// Set the desired replica count
    async fn set_replicas(&self, namespace: &str, deployment: &str, replicas: i32) -> Result<()>;

    /// Name for logging
    fn name(&self) -> &'static str;
}
