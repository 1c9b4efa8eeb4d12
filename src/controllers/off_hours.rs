//! Off-Hours Optimizer
//!
//! For every tenant with a business-hours window, checks the tenant-local hour
//! and, outside the window, sends a `scale_to_minimum` trigger through the
//! regular [`TriggerDispatcher`]. Tenants are handled concurrently and each
//! gets its own outcome; one failing tenant never stops the others.

use super::decision::ScalingAction;
use super::dispatcher::{TriggerDispatcher, TriggerOutcome, TriggerRequest};
use crate::policy::{is_within_business_hours, WorkloadRef};
use chrono::{DateTime, FixedOffset, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Metric label carried by optimizer-generated triggers
pub const SCHEDULE_METRIC: &str = "schedule";

/// What happened to one tenant in a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TenantResult {
    /// Inside business hours; nothing sent
    InBusinessHours,
    /// Trigger handled (scaled or already at minimum)
    Optimized { outcome: TriggerOutcome },
    /// Trigger failed
    Failed { kind: String, message: String },
}

/// Outcome for a single tenant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenantOutcome {
    pub tenant: String,
    pub workload: WorkloadRef,
    #[serde(flatten)]
    pub result: TenantResult,
}

/// Result of one optimizer run, ordered by tenant id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OptimizationReport {
    /// Tenant-local time the run was evaluated at (RFC 3339)
    pub evaluated_at: String,
    pub tenants: Vec<TenantOutcome>,
}

impl OptimizationReport {
    pub fn failures(&self) -> usize {
        self.tenants
            .iter()
            .filter(|t| matches!(t.result, TenantResult::Failed { .. }))
            .count()
    }

    pub fn optimized(&self) -> usize {
        self.tenants
            .iter()
            .filter(|t| matches!(t.result, TenantResult::Optimized { .. }))
            .count()
    }
}

/// Scales tenants to their minimum outside business hours
pub struct OffHoursOptimizer {
    dispatcher: TriggerDispatcher,
    local_offset: FixedOffset,
}

impl OffHoursOptimizer {
    /// Create an optimizer evaluating hours in the given tenant-local offset
    pub fn new(dispatcher: TriggerDispatcher, local_offset: FixedOffset) -> Self {
        Self {
            dispatcher,
            local_offset,
        }
    }

    /// Run once against the current wall clock.
    pub async fn run_once(&self) -> OptimizationReport {
        let now = Utc::now().with_timezone(&self.local_offset);
        self.run_at(now).await
    }

    /// Run once as if the tenant-local time were `now`.
    pub async fn run_at(&self, now: DateTime<FixedOffset>) -> OptimizationReport {
        info!(now = %now.to_rfc3339(), "Cost optimization run starting");

        let policies = Arc::clone(self.dispatcher.policies());
        let runs = policies
            .iter()
            .filter_map(|(tenant, policy)| policy.business_hours.map(|hours| (tenant, policy, hours)))
            .map(|(tenant, policy, hours)| {
                let workload = policy.workload_for(tenant);
                async move {
                    let result = if is_within_business_hours(&hours, &now) {
                        debug!(tenant = %tenant, "Business hours, maintaining normal operation");
                        TenantResult::InBusinessHours
                    } else {
                        info!(tenant = %tenant, workload = %workload, "Off-hours, scaling to minimum");
                        self.optimize_tenant(tenant, &workload).await
                    };
                    TenantOutcome {
                        tenant: tenant.to_string(),
                        workload,
                        result,
                    }
                }
            });

        let tenants = join_all(runs).await;
        let report = OptimizationReport {
            evaluated_at: now.to_rfc3339(),
            tenants,
        };

        info!(
            tenants = report.tenants.len(),
            optimized = report.optimized(),
            failed = report.failures(),
            "Cost optimization run complete"
        );
        report
    }

    async fn optimize_tenant(&self, tenant: &str, workload: &WorkloadRef) -> TenantResult {
        let request = TriggerRequest::new(
            tenant,
            workload,
            SCHEDULE_METRIC,
            ScalingAction::ScaleToMinimum,
        );

        match self.dispatcher.handle(&request).await {
            Ok(outcome) => TenantResult::Optimized { outcome },
            Err(e) => {
                error!(tenant = %tenant, kind = e.kind(), "Optimization failed: {}", e);
                TenantResult::Failed {
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                }
            }
        }
    }

    /// Run every `interval` until the task is dropped. The first run is immediate.
    pub async fn run(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::TriggerStatus;
    use crate::orchestrator::testing::{FakeOrchestrator, Fault};
    use crate::orchestrator::ClusterOrchestrator;
    use crate::policy::{BusinessHours, PolicyStore, ScalingPolicy};
    use std::collections::BTreeMap;

    fn window() -> BusinessHours {
        BusinessHours {
            start_hour: 8,
            end_hour: 20,
            off_hours_replicas: 1,
            business_hours_min_replicas: 2,
        }
    }

    fn at_hour(hour: u32) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(&format!("2024-05-02T{:02}:00:00+00:00", hour)).unwrap()
    }

    fn optimizer(fake: &Arc<FakeOrchestrator>) -> OffHoursOptimizer {
        let mut policies = BTreeMap::new();
        policies.insert(
            "cliente-c".to_string(),
            ScalingPolicy::new(2, 6).with_business_hours(window()),
        );
        policies.insert(
            "cliente-d".to_string(),
            ScalingPolicy::new(1, 4)
                .with_business_hours(window())
                .with_target(WorkloadRef::new("shared", "d-web")),
        );
        policies.insert("cliente-a".to_string(), ScalingPolicy::new(2, 10));
        let store = Arc::new(PolicyStore::new(policies).unwrap());
        let dispatcher =
            TriggerDispatcher::new(store, Arc::clone(fake) as Arc<dyn ClusterOrchestrator>);
        OffHoursOptimizer::new(dispatcher, FixedOffset::east_opt(0).unwrap())
    }

    fn fake() -> Arc<FakeOrchestrator> {
        Arc::new(
            FakeOrchestrator::new()
                .with_replicas("cliente-c", "cliente-c-api", 5)
                .with_replicas("shared", "d-web", 3)
                .with_replicas("cliente-a", "cliente-a-api", 6),
        )
    }

    #[tokio::test]
    async fn test_off_hours_scales_to_policy_minimum() {
        let fake = fake();
        let report = optimizer(&fake).run_at(at_hour(22)).await;

        assert_eq!(report.tenants.len(), 2);
        assert_eq!(report.failures(), 0);
        assert_eq!(report.optimized(), 2);

        // min_replicas wins over off_hours_replicas.
        assert_eq!(fake.replicas("cliente-c", "cliente-c-api"), Some(2));
        assert_eq!(fake.replicas("shared", "d-web"), Some(1));
        // Tenants without a window are never touched.
        assert_eq!(fake.replicas("cliente-a", "cliente-a-api"), Some(6));

        match &report.tenants[0].result {
            TenantResult::Optimized { outcome } => {
                assert_eq!(outcome.status, TriggerStatus::Success);
                assert_eq!(outcome.action, ScalingAction::ScaleToMinimum);
                assert_eq!(outcome.previous_replicas, 5);
                assert_eq!(outcome.target_replicas, 2);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_business_hours_skip_without_calls() {
        let fake = fake();
        let report = optimizer(&fake).run_at(at_hour(10)).await;

        assert!(report
            .tenants
            .iter()
            .all(|t| t.result == TenantResult::InBusinessHours));
        assert_eq!(fake.read_count(), 0);
        assert_eq!(fake.write_count(), 0);
    }

    #[tokio::test]
    async fn test_one_tenant_failure_is_isolated() {
        let fake = fake();
        fake.fail_writes("cliente-c", "cliente-c-api", Fault::Error);
        let report = optimizer(&fake).run_at(at_hour(3)).await;

        assert_eq!(report.failures(), 1);
        assert_eq!(report.tenants[0].tenant, "cliente-c");
        assert!(matches!(
            &report.tenants[0].result,
            TenantResult::Failed { kind, .. } if kind == "execution_failed"
        ));
        assert_eq!(fake.replicas("shared", "d-web"), Some(1));
    }

    #[tokio::test]
    async fn test_hanging_tenant_does_not_delay_others() {
        let fake = fake();
        fake.fail_reads("cliente-c", "cliente-c-api", Fault::Hang);
        let mut optimizer = optimizer(&fake);
        optimizer.dispatcher = optimizer
            .dispatcher
            .clone()
            .with_read_timeout(Duration::from_millis(100));

        let started = std::time::Instant::now();
        let report = optimizer.run_at(at_hour(23)).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(report.failures(), 1);
        assert_eq!(report.optimized(), 1);
    }

    #[tokio::test]
    async fn test_second_run_is_noop() {
        let fake = fake();
        let optimizer = optimizer(&fake);
        optimizer.run_at(at_hour(22)).await;
        let writes = fake.write_count();

        let report = optimizer.run_at(at_hour(23)).await;
        assert_eq!(fake.write_count(), writes);
        for tenant in &report.tenants {
            match &tenant.result {
                TenantResult::Optimized { outcome } => {
                    assert_eq!(outcome.status, TriggerStatus::NoChange)
                }
                other => panic!("unexpected result: {:?}", other),
            }
        }
    }

    #[test]
    fn test_report_serialization() {
        let report = OptimizationReport {
            evaluated_at: "2024-05-02T22:00:00+00:00".to_string(),
            tenants: vec![TenantOutcome {
                tenant: "cliente-c".to_string(),
                workload: WorkloadRef::new("cliente-c", "cliente-c-api"),
                result: TenantResult::Failed {
                    kind: "read_failed".to_string(),
                    message: "boom".to_string(),
                },
            }],
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["tenants"][0]["result"], "failed");
        assert_eq!(value["tenants"][0]["kind"], "read_failed");
        assert_eq!(value["tenants"][0]["workload"]["deployment"], "cliente-c-api");
    }
}
