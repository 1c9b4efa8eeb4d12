//! Scaling controllers
//!
//! The decision engine computes targets, the dispatcher turns triggers into
//! orchestrator calls, and the off-hours optimizer feeds schedule-driven
//! triggers into the same dispatcher.

mod decision;
mod dispatcher;
mod off_hours;

pub use decision::{decide, plan, ScalingAction, ScalingDecision};
pub use dispatcher::{TriggerDispatcher, TriggerOutcome, TriggerRequest, TriggerStatus};
pub use off_hours::{
    OffHoursOptimizer, OptimizationReport, TenantOutcome, TenantResult, SCHEDULE_METRIC,
};
