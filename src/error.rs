//! Error types for the tenant autoscaler

use crate::controllers::ScalingDecision;
use std::fmt;

/// Result type alias for autoscaler operations
pub type Result<T> = std::result::Result<T, ScalerError>;

/// Errors that can occur while handling a scaling trigger or loading configuration
#[derive(Debug)]
pub enum ScalerError {
    /// No scaling policy is configured for the tenant
    PolicyNotFound(String),
    /// Reading the current replica count failed, timed out, or returned zero
    ReadFailed(String),
    /// The trigger carried an action the engine does not know
    InvalidAction(String),
    /// The scale call failed or timed out; the decision was not confirmed
    ExecutionFailed {
        decision: ScalingDecision,
        message: String,
    },
    /// Configuration error (fatal at startup)
    Configuration(String),
    /// Kubernetes API error
    KubeApi(String),
    /// Serialization error
    Serialization(String),
    /// I/O error
    Io(String),
}

impl ScalerError {
    /// Stable snake_case label used in responses and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ScalerError::PolicyNotFound(_) => "policy_not_found",
            ScalerError::ReadFailed(_) => "read_failed",
            ScalerError::InvalidAction(_) => "invalid_action",
            ScalerError::ExecutionFailed { .. } => "execution_failed",
            ScalerError::Configuration(_) => "configuration",
            ScalerError::KubeApi(_) => "kube_api",
            ScalerError::Serialization(_) => "serialization",
            ScalerError::Io(_) => "io",
        }
    }
}

impl fmt::Display for ScalerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalerError::PolicyNotFound(tenant) => {
                write!(f, "No scaling policy found for client: {}", tenant)
            }
            ScalerError::ReadFailed(msg) => write!(f, "Failed to get current replicas: {}", msg),
            ScalerError::InvalidAction(action) => write!(f, "Invalid action: {}", action),
            ScalerError::ExecutionFailed { decision, message } => write!(
                f,
                "Scaling from {} to {} replicas failed: {}",
                decision.current_replicas, decision.target_replicas, message
            ),
            ScalerError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ScalerError::KubeApi(msg) => write!(f, "Kubernetes API error: {}", msg),
            ScalerError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            ScalerError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for ScalerError {}

impl From<kube::Error> for ScalerError {
    fn from(err: kube::Error) -> Self {
        ScalerError::KubeApi(err.to_string())
    }
}

impl From<serde_json::Error> for ScalerError {
    fn from(err: serde_json::Error) -> Self {
        ScalerError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ScalerError {
    fn from(err: toml::de::Error) -> Self {
        ScalerError::Configuration(err.to_string())
    }
}

impl From<std::io::Error> for ScalerError {
    fn from(err: std::io::Error) -> Self {
        ScalerError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScalerError::PolicyNotFound("unknown-client".to_string());
        assert!(err.to_string().contains("unknown-client"));

        let err = ScalerError::ExecutionFailed {
            decision: ScalingDecision {
                current_replicas: 3,
                target_replicas: 5,
                applied: true,
                reason: "scale up".to_string(),
            },
            message: "timed out".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Scaling from 3 to 5 replicas failed: timed out"
        );
    }

    #[test]
    fn test_error_kinds() {
        let errors = vec![
            (ScalerError::PolicyNotFound("t".into()), "policy_not_found"),
            (ScalerError::ReadFailed("r".into()), "read_failed"),
            (ScalerError::InvalidAction("a".into()), "invalid_action"),
            (ScalerError::Configuration("c".into()), "configuration"),
            (ScalerError::KubeApi("k".into()), "kube_api"),
            (ScalerError::Serialization("s".into()), "serialization"),
            (ScalerError::Io("i".into()), "io"),
        ];

        for (err, kind) in errors {
            assert_eq!(err.kind(), kind);
            let _ = format!("{}", err);
        }
    }

    #[test]
    fn test_toml_error_is_configuration() {
        let err: ScalerError = toml::from_str::<toml::Value>("= broken")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), "configuration");
    }
}
