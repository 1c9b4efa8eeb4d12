//! Per-tenant scaling policies
//!
//! Policies are loaded once from the configuration file and never change while
//! the process runs. A tenant without a policy is rejected outright; there is no
//! fallback policy.

use crate::error::{Result, ScalerError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Scaling bounds and increments for a single tenant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ScalingPolicy {
    /// Lowest replica count the autoscaler will ever set
    pub min_replicas: i32,

    /// Highest replica count the autoscaler will ever set
    pub max_replicas: i32,

    /// Replicas added per scale-up trigger
    #[serde(default = "default_scale_up_increment")]
    pub scale_up_increment: i32,

    /// Business-hours window used by the off-hours optimizer
    #[serde(default)]
    pub business_hours: Option<BusinessHours>,

    /// Workload the off-hours optimizer scales for this tenant
    #[serde(default)]
    pub target: Option<WorkloadRef>,
}

/// Daily window during which normal capacity is kept.
///
/// Hours are in the tenant-local clock; `start_hour` is inclusive and
/// `end_hour` exclusive. Windows that wrap midnight are rejected at load.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BusinessHours {
    pub start_hour: u32,
    pub end_hour: u32,

    /// Replica count intended for off-hours
    #[serde(default = "default_off_hours_replicas")]
    pub off_hours_replicas: i32,

    /// Replica floor intended for business hours
    #[serde(default = "default_business_hours_min_replicas")]
    pub business_hours_min_replicas: i32,
}

/// A (namespace, deployment) pair in the cluster
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(deny_unknown_fields)]
pub struct WorkloadRef {
    pub namespace: String,
    pub deployment: String,
}

impl WorkloadRef {
    pub fn new(namespace: impl Into<String>, deployment: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            deployment: deployment.into(),
        }
    }
}

impl std::fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.deployment)
    }
}

fn default_scale_up_increment() -> i32 {
    1
}

fn default_off_hours_replicas() -> i32 {
    1
}

fn default_business_hours_min_replicas() -> i32 {
    1
}

impl ScalingPolicy {
    /// Policy with the given bounds, an increment of 1 and no schedule.
    pub fn new(min_replicas: i32, max_replicas: i32) -> Self {
        Self {
            min_replicas,
            max_replicas,
            scale_up_increment: default_scale_up_increment(),
            business_hours: None,
            target: None,
        }
    }

    pub fn with_scale_up_increment(mut self, increment: i32) -> Self {
        self.scale_up_increment = increment;
        self
    }

    pub fn with_business_hours(mut self, hours: BusinessHours) -> Self {
        self.business_hours = Some(hours);
        self
    }

    pub fn with_target(mut self, target: WorkloadRef) -> Self {
        self.target = Some(target);
        self
    }

    /// Workload scaled on this tenant's behalf by the optimizer.
    ///
    /// Defaults to namespace `<tenant>` and deployment `<tenant>-api`.
    pub fn workload_for(&self, tenant: &str) -> WorkloadRef {
        self.target
            .clone()
            .unwrap_or_else(|| WorkloadRef::new(tenant, format!("{}-api", tenant)))
    }

    /// Check the policy invariants for `tenant`.
    pub fn validate(&self, tenant: &str) -> Result<()> {
        let invalid = |msg: String| Err(ScalerError::Configuration(format!("{}: {}", tenant, msg)));

        if self.min_replicas <= 0 {
            return invalid(format!(
                "min_replicas must be positive, got {}",
                self.min_replicas
            ));
        }
        if self.min_replicas > self.max_replicas {
            return invalid(format!(
                "min_replicas ({}) exceeds max_replicas ({})",
                self.min_replicas, self.max_replicas
            ));
        }
        if self.scale_up_increment < 1 {
            return invalid(format!(
                "scale_up_increment must be at least 1, got {}",
                self.scale_up_increment
            ));
        }

        if let Some(hours) = &self.business_hours {
            if hours.start_hour > 23 || hours.end_hour > 24 {
                return invalid(format!(
                    "business hours {}..{} out of range (start 0-23, end 1-24)",
                    hours.start_hour, hours.end_hour
                ));
            }
            if hours.start_hour >= hours.end_hour {
                return invalid(format!(
                    "business hours {}..{} must not wrap midnight or be empty",
                    hours.start_hour, hours.end_hour
                ));
            }
            for (field, value) in [
                ("off_hours_replicas", hours.off_hours_replicas),
                ("business_hours_min_replicas", hours.business_hours_min_replicas),
            ] {
                if value < 1 || value > self.max_replicas {
                    return invalid(format!(
                        "{} must be within 1..={}, got {}",
                        field, self.max_replicas, value
                    ));
                }
            }
        }

        if let Some(target) = &self.target {
            if target.namespace.is_empty() || target.deployment.is_empty() {
                return invalid("target namespace and deployment must be non-empty".to_string());
            }
        }

        Ok(())
    }
}

/// Read-only map from tenant id to policy
#[derive(Debug, Clone, Default)]
pub struct PolicyStore {
    policies: BTreeMap<String, ScalingPolicy>,
}

impl PolicyStore {
    /// Validate and take ownership of a policy set.
    ///
    /// Any invalid policy rejects the whole set.
    pub fn new(policies: BTreeMap<String, ScalingPolicy>) -> Result<Self> {
        for (tenant, policy) in &policies {
            if tenant.trim().is_empty() {
                return Err(ScalerError::Configuration(
                    "tenant identifiers must be non-empty".to_string(),
                ));
            }
            policy.validate(tenant)?;

            if let Some(hours) = &policy.business_hours {
                if hours.off_hours_replicas != policy.min_replicas {
                    warn!(
                        tenant = %tenant,
                        off_hours_replicas = hours.off_hours_replicas,
                        min_replicas = policy.min_replicas,
                        "off_hours_replicas differs from min_replicas; off-hours scaling uses min_replicas"
                    );
                }
            }
        }

        info!(count = policies.len(), "Loaded scaling policies");
        Ok(Self { policies })
    }

    /// Policy for `tenant`, or `PolicyNotFound`.
    pub fn lookup(&self, tenant: &str) -> Result<&ScalingPolicy> {
        self.policies
            .get(tenant)
            .ok_or_else(|| ScalerError::PolicyNotFound(tenant.to_string()))
    }

    /// All policies, ordered by tenant id.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalingPolicy)> {
        self.policies.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
