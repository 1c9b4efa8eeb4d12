//! Tenant scaling policies and their business-hours schedules

mod schedule;
mod store;

pub use schedule::is_within_business_hours;
pub use store::{BusinessHours, PolicyStore, ScalingPolicy, WorkloadRef};
