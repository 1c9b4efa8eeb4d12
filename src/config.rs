//! Autoscaler configuration file
//!
//! A single TOML document holds the tenant policies plus timeout, dispatcher
//! and optimizer tuning. Everything except `scaling_policies` has defaults.

use crate::error::{Result, ScalerError};
use crate::policy::{PolicyStore, ScalingPolicy};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutoscalerConfig {
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    #[serde(default)]
    pub optimizer: OptimizerConfig,

    /// Tenant id to policy
    pub scaling_policies: BTreeMap<String, ScalingPolicy>,
}

/// Deadlines for calls into the cluster orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutConfig {
    #[serde(default = "default_read_seconds")]
    pub read_seconds: u64,

    #[serde(default = "default_scale_seconds")]
    pub scale_seconds: u64,
}

/// Trigger dispatcher tuning
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Serialize read-decide-write per (namespace, deployment)
    #[serde(default)]
    pub serialize_per_workload: bool,
}

/// Off-hours optimizer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizerConfig {
    /// Run the optimizer periodically inside `serve`
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,

    /// Offset of the tenant-local clock from UTC
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

fn default_read_seconds() -> u64 {
    10
}

fn default_scale_seconds() -> u64 {
    30
}

fn default_interval_seconds() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_seconds: default_read_seconds(),
            scale_seconds: default_scale_seconds(),
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: default_interval_seconds(),
            utc_offset_minutes: 0,
        }
    }
}

impl TimeoutConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_seconds)
    }

    pub fn scale_timeout(&self) -> Duration {
        Duration::from_secs(self.scale_seconds)
    }
}

impl OptimizerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    /// Fixed offset of the tenant-local clock.
    pub fn local_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            ScalerError::Configuration(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }
}

impl AutoscalerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScalerError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AutoscalerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the non-policy settings. Policies are checked by [`PolicyStore::new`].
    pub fn validate(&self) -> Result<()> {
        if self.timeouts.read_seconds == 0 || self.timeouts.scale_seconds == 0 {
            return Err(ScalerError::Configuration(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.optimizer.interval_seconds == 0 {
            return Err(ScalerError::Configuration(
                "optimizer.interval_seconds must be greater than zero".to_string(),
            ));
        }
        if self.optimizer.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ScalerError::Configuration(format!(
                "optimizer.utc_offset_minutes must be within a day, got {}",
                self.optimizer.utc_offset_minutes
            )));
        }
        Ok(())
    }

    /// Build the policy store, validating every policy.
    pub fn policy_store(&self) -> Result<PolicyStore> {
        PolicyStore::new(self.scaling_policies.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[timeouts]
read_seconds = 5

[optimizer]
utc_offset_minutes = -180

[scaling_policies.cliente-a]
min_replicas = 2
max_replicas = 10
scale_up_increment = 2

[scaling_policies.cliente-c]
min_replicas = 2
max_replicas = 6

[scaling_policies.cliente-c.business_hours]
start_hour = 8
end_hour = 20
off_hours_replicas = 1
business_hours_min_replicas = 2

[scaling_policies.cliente-c.target]
namespace = "cliente-c"
deployment = "cliente-c-api"
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = AutoscalerConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.timeouts.read_seconds, 5);
        assert_eq!(config.timeouts.scale_seconds, 30);
        assert!(!config.dispatcher.serialize_per_workload);
        assert!(config.optimizer.enabled);
        assert_eq!(config.optimizer.interval_seconds, 3600);
        assert_eq!(config.scaling_policies.len(), 2);

        let store = config.policy_store().unwrap();
        let policy = store.lookup("cliente-c").unwrap();
        let hours = policy.business_hours.unwrap();
        assert_eq!((hours.start_hour, hours.end_hour), (8, 20));
        assert_eq!(store.lookup("cliente-a").unwrap().scale_up_increment, 2);
    }

    #[test]
    fn test_local_offset() {
        let config = AutoscalerConfig::from_toml_str(SAMPLE).unwrap();
        let offset = config.optimizer.local_offset().unwrap();
        assert_eq!(offset.local_minus_utc(), -180 * 60);
    }

    #[test]
    fn test_missing_policies_section_is_error() {
        assert!(AutoscalerConfig::from_toml_str("[timeouts]\nread_seconds = 5\n").is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let toml = "[timeouts]\nscale_seconds = 0\n[scaling_policies]\n";
        let err = AutoscalerConfig::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("timeouts"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = "[scaling_policies.a]\nmin_replicas = 1\nmax_replicas = 2\nmax_replica = 3\n";
        assert!(AutoscalerConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_invalid_policy_fails_store_build() {
        let toml = "[scaling_policies.a]\nmin_replicas = 4\nmax_replicas = 2\n";
        let config = AutoscalerConfig::from_toml_str(toml).unwrap();
        assert!(config.policy_store().is_err());
    }
}
