//! Tenant Autoscaler
//!
//! Policy-driven replica scaling for multi-tenant Kubernetes deployments.
//!
//! Triggers arrive from an alerting system (`POST /trigger`) or from the
//! off-hours optimizer. Each one is checked against the tenant's scaling
//! policy, turned into a target replica count clamped to the policy bounds,
//! and applied to the Deployment's `scale` subresource when it differs from
//! the current count.
//!
//! ## Configuration
//!
//! ```toml
//! [scaling_policies.cliente-a]
//! min_replicas = 2
//! max_replicas = 10
//! scale_up_increment = 2
//!
//! [scaling_policies.cliente-c]
//! min_replicas = 2
//! max_replicas = 6
//!
//! [scaling_policies.cliente-c.business_hours]
//! start_hour = 8
//! end_hour = 20
//! ```

pub mod config;
pub mod controllers;
pub mod error;
pub mod locks;
pub mod orchestrator;
pub mod policy;
pub mod webhook;

pub use config::AutoscalerConfig;
pub use controllers::{
    decide, plan, OffHoursOptimizer, OptimizationReport, ScalingAction, ScalingDecision,
    TriggerDispatcher, TriggerOutcome, TriggerRequest, TriggerStatus,
};
pub use error::{Result, ScalerError};
pub use orchestrator::{ClusterOrchestrator, KubeOrchestrator};
pub use policy::{BusinessHours, PolicyStore, ScalingPolicy, WorkloadRef};
