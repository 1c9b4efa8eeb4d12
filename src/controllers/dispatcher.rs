//! Trigger dispatcher
//!
//! Single entry point for every scaling trigger, whether it comes from an alert
//! webhook or from the off-hours optimizer. Each call is self-contained:
//! resolve the tenant policy, read the current replica count, decide, and write
//! the new count only when it differs. Failures end the call; nothing is
//! retried here.

use super::decision::{plan, ScalingAction, ScalingDecision};
use crate::config::{DispatcherConfig, TimeoutConfig};
use crate::error::{Result, ScalerError};
use crate::locks::WorkloadLocks;
use crate::orchestrator::ClusterOrchestrator;
use crate::policy::{PolicyStore, WorkloadRef};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Inbound scaling trigger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerRequest {
    /// Tenant identifier
    #[serde(alias = "tenant")]
    pub client: String,

    pub namespace: String,

    pub deployment: String,

    /// Free-form label of the signal source, e.g. "cpu" or "schedule"
    pub metric: String,

    /// One of `scale_up`, `scale_down`, `scale_to_minimum`
    pub action: String,

    /// Informational only
    #[serde(default = "default_priority")]
    pub priority: String,
}

fn default_priority() -> String {
    "normal".to_string()
}

impl TriggerRequest {
    pub fn new(
        client: impl Into<String>,
        workload: &WorkloadRef,
        metric: impl Into<String>,
        action: ScalingAction,
    ) -> Self {
        Self {
            client: client.into(),
            namespace: workload.namespace.clone(),
            deployment: workload.deployment.clone(),
            metric: metric.into(),
            action: action.as_str().to_string(),
            priority: default_priority(),
        }
    }

    pub fn workload(&self) -> WorkloadRef {
        WorkloadRef::new(&self.namespace, &self.deployment)
    }
}

/// Whether the trigger changed the replica count
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriggerStatus {
    Success,
    NoChange,
}

/// Result of a handled trigger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerOutcome {
    pub status: TriggerStatus,
    pub client: String,
    pub action: ScalingAction,
    pub previous_replicas: i32,
    pub target_replicas: i32,
}

impl TriggerOutcome {
    fn from_decision(client: &str, action: ScalingAction, decision: &ScalingDecision) -> Self {
        Self {
            status: if decision.applied {
                TriggerStatus::Success
            } else {
                TriggerStatus::NoChange
            },
            client: client.to_string(),
            action,
            previous_replicas: decision.current_replicas,
            target_replicas: decision.target_replicas,
        }
    }
}

/// Drives policy lookup, decision and execution for each trigger
#[derive(Clone)]
pub struct TriggerDispatcher {
    policies: Arc<PolicyStore>,
    orchestrator: Arc<dyn ClusterOrchestrator>,
    read_timeout: Duration,
    scale_timeout: Duration,
    locks: Option<Arc<WorkloadLocks>>,
}

impl TriggerDispatcher {
    /// Create a dispatcher with default timeouts and no per-workload serialization
    pub fn new(policies: Arc<PolicyStore>, orchestrator: Arc<dyn ClusterOrchestrator>) -> Self {
        let timeouts = TimeoutConfig::default();
        Self {
            policies,
            orchestrator,
            read_timeout: timeouts.read_timeout(),
            scale_timeout: timeouts.scale_timeout(),
            locks: None,
        }
    }

    pub fn with_timeouts(mut self, timeouts: &TimeoutConfig) -> Self {
        self.read_timeout = timeouts.read_timeout();
        self.scale_timeout = timeouts.scale_timeout();
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_scale_timeout(mut self, timeout: Duration) -> Self {
        self.scale_timeout = timeout;
        self
    }

    pub fn with_dispatcher_config(mut self, config: &DispatcherConfig) -> Self {
        self.locks = config
            .serialize_per_workload
            .then(|| Arc::new(WorkloadLocks::new()));
        self
    }

    pub fn policies(&self) -> &Arc<PolicyStore> {
        &self.policies
    }

    /// Handle one trigger end to end.
    pub async fn handle(&self, request: &TriggerRequest) -> Result<TriggerOutcome> {
        info!(
            client = %request.client,
            namespace = %request.namespace,
            deployment = %request.deployment,
            metric = %request.metric,
            action = %request.action,
            priority = %request.priority,
            "Received trigger"
        );

        let result = self.execute(request).await;
        if let Err(e) = &result {
            warn!(
                client = %request.client,
                namespace = %request.namespace,
                deployment = %request.deployment,
                kind = e.kind(),
                "Trigger rejected: {}",
                e
            );
        }
        result
    }

    async fn execute(&self, request: &TriggerRequest) -> Result<TriggerOutcome> {
        let policy = self.policies.lookup(&request.client)?;
        let action: ScalingAction = request.action.parse()?;

        let _guard = match &self.locks {
            Some(locks) => Some(locks.acquire(&request.workload()).await),
            None => None,
        };

        let current = self
            .read_replicas(&request.namespace, &request.deployment)
            .await?;
        let decision = plan(policy, action, current);

        if !decision.applied {
            debug!(
                client = %request.client,
                namespace = %request.namespace,
                deployment = %request.deployment,
                replicas = current,
                "Already at target, skipping scale"
            );
            return Ok(TriggerOutcome::from_decision(&request.client, action, &decision));
        }

        let written = tokio::time::timeout(
            self.scale_timeout,
            self.orchestrator.set_replicas(
                &request.namespace,
                &request.deployment,
                decision.target_replicas,
            ),
        )
        .await;

        let message = match written {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(format!("timed out after {:?}", self.scale_timeout)),
        };
        if let Some(message) = message {
            return Err(ScalerError::ExecutionFailed { decision, message });
        }

        info!(
            client = %request.client,
            namespace = %request.namespace,
            deployment = %request.deployment,
            current = decision.current_replicas,
            target = decision.target_replicas,
            orchestrator = self.orchestrator.name(),
            "{}",
            decision.reason
        );
        Ok(TriggerOutcome::from_decision(&request.client, action, &decision))
    }

    /// Read the current count, treating zero or less as a failed read.
    async fn read_replicas(&self, namespace: &str, deployment: &str) -> Result<i32> {
        let read = tokio::time::timeout(
            self.read_timeout,
            self.orchestrator.get_replicas(namespace, deployment),
        )
        .await;

        match read {
            Ok(Ok(replicas)) if replicas > 0 => Ok(replicas),
            Ok(Ok(replicas)) => Err(ScalerError::ReadFailed(format!(
                "{}/{} reported {} replicas",
                namespace, deployment, replicas
            ))),
            Ok(Err(e)) => Err(ScalerError::ReadFailed(e.to_string())),
            Err(_) => Err(ScalerError::ReadFailed(format!(
                "{}/{} read timed out after {:?}",
                namespace, deployment, self.read_timeout
            ))),
        }
    }
}
