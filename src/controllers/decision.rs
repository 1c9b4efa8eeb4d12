//! Scaling decision engine
//!
//! Maps a trigger action, a tenant policy, and the current replica count to a
//! target replica count. Pure: no I/O, no clock, no state between calls.
//!
//! ```text
//! scale_up          target = min(current + increment, max)
//! scale_down        target = max(current - 1, min)
//! scale_to_minimum  target = min
//! ```
//!
//! Every defined action lands inside `[min_replicas, max_replicas]`, whatever
//! the current count is. A target equal to the current count is a no-op.

use crate::error::{Result, ScalerError};
use crate::policy::ScalingPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scaling action requested by a trigger
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScalingAction {
    ScaleUp,
    ScaleDown,
    ScaleToMinimum,
}

impl ScalingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalingAction::ScaleUp => "scale_up",
            ScalingAction::ScaleDown => "scale_down",
            ScalingAction::ScaleToMinimum => "scale_to_minimum",
        }
    }
}

impl fmt::Display for ScalingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScalingAction {
    type Err = ScalerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "scale_up" => Ok(ScalingAction::ScaleUp),
            "scale_down" => Ok(ScalingAction::ScaleDown),
            "scale_to_minimum" => Ok(ScalingAction::ScaleToMinimum),
            other => Err(ScalerError::InvalidAction(other.to_string())),
        }
    }
}

/// Outcome of a single decision
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScalingDecision {
    /// Replica count read from the cluster
    pub current_replicas: i32,

    /// Replica count the policy allows for this action
    pub target_replicas: i32,

    /// Whether the target differs from the current count and must be written
    pub applied: bool,

    /// Human-readable reason
    pub reason: String,
}

/// Parse `action` and decide. Unknown actions fail with `InvalidAction`.
pub fn decide(policy: &ScalingPolicy, action: &str, current_replicas: i32) -> Result<ScalingDecision> {
    let action: ScalingAction = action.parse()?;
    Ok(plan(policy, action, current_replicas))
}

/// Compute the decision for a known action.
pub fn plan(policy: &ScalingPolicy, action: ScalingAction, current_replicas: i32) -> ScalingDecision {
    let (target, rule) = match action {
        ScalingAction::ScaleUp => (
            current_replicas
                .saturating_add(policy.scale_up_increment)
                .min(policy.max_replicas),
            format!("+{} capped at max {}", policy.scale_up_increment, policy.max_replicas),
        ),
        ScalingAction::ScaleDown => (
            current_replicas.saturating_sub(1).max(policy.min_replicas),
            format!("-1 floored at min {}", policy.min_replicas),
        ),
        ScalingAction::ScaleToMinimum => (
            policy.min_replicas,
            format!("minimum {}", policy.min_replicas),
        ),
    };

    // A current count outside the bounds (e.g. scaled by hand) is pulled back in.
    let target = target.clamp(policy.min_replicas, policy.max_replicas);
    let applied = target != current_replicas;

    let reason = if applied {
        format!("{}: {} -> {} ({})", action, current_replicas, target, rule)
    } else {
        format!("{}: already at {} replicas", action, current_replicas)
    };

    ScalingDecision {
        current_replicas,
        target_replicas: target,
        applied,
        reason,
    }
}
