//! Kubernetes adapter
//!
//! Uses the `scale` subresource of `apps/v1` Deployments, so reads and writes
//! touch only `spec.replicas` and never the pod template.

use super::ClusterOrchestrator;
use crate::error::{Result, ScalerError};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v1::Scale;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use tracing::{debug, info};

const FIELD_MANAGER: &str = "tenant-autoscaler";

/// [`ClusterOrchestrator`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeOrchestrator {
    client: Client,
}

impl KubeOrchestrator {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Desired replicas recorded in a `Scale`, zero when absent.
pub(crate) fn replicas_from_scale(scale: &Scale) -> i32 {
    scale
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(0)
}

/// Merge patch body for the `scale` subresource.
pub(crate) fn scale_patch(replicas: i32) -> serde_json::Value {
    serde_json::json!({
        "spec": {
            "replicas": replicas,
        }
    })
}

#[async_trait::async_trait]
impl ClusterOrchestrator for KubeOrchestrator {
    async fn get_replicas(&self, namespace: &str, deployment: &str) -> Result<i32> {
        let scale = self
            .deployments(namespace)
            .get_scale(deployment)
            .await
            .map_err(|e| ScalerError::KubeApi(e.to_string()))?;

        let replicas = replicas_from_scale(&scale);
        debug!(namespace = %namespace, deployment = %deployment, replicas, "Read deployment scale");
        Ok(replicas)
    }

    async fn set_replicas(&self, namespace: &str, deployment: &str, replicas: i32) -> Result<()> {
        let patch = scale_patch(replicas);

        self.deployments(namespace)
            .patch_scale(
                deployment,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await
            .map_err(|e| ScalerError::KubeApi(e.to_string()))?;

        info!(namespace = %namespace, deployment = %deployment, replicas, "Patched deployment scale");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "kubernetes"
    }
}
