//! SKE (Kubernetes Engine): clusters and kubeconfigs.

use crate::client::{ApiClient, seg};
use crate::error::ApiResult;
use crate::wait::{PollOutcome, WaitConfig, WaitError, wait};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const STATE_HEALTHY: &str = "STATE_HEALTHY";
pub const STATE_HIBERNATED: &str = "STATE_HIBERNATED";
pub const STATE_FAILED: &str = "STATE_FAILED";
pub const STATE_DELETING: &str = "STATE_DELETING";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregated: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ClusterError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
}

impl ClusterStatus {
    /// Reason reported by the service for a failed cluster.
    pub fn failure_reason(&self) -> String {
        self.errors
            .first()
            .and_then(|e| e.code.clone().or_else(|| e.message.clone()))
            .unwrap_or_else(|| "cluster reached state STATE_FAILED".to_string())
    }
}

/// Cluster as returned by the service. Nested specs are kept as raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodepools: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hibernation: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ClusterStatus>,
}

impl Cluster {
    pub fn state(&self) -> Option<&str> {
        self.status.as_ref()?.aggregated.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterListResponse {
    #[serde(default)]
    pub items: Vec<Cluster>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateOrUpdateClusterPayload {
    pub kubernetes: serde_json::Value,
    pub nodepools: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hibernation: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKubeconfigPayload {
    /// Lifetime in seconds, sent as a decimal string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_seconds: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kubeconfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginKubeconfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionOption {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriOption {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineImageVersion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cri: Vec<CriOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineImage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<MachineImageVersion>,
}

/// Versions and images the service currently offers in a region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOptions {
    #[serde(default)]
    pub kubernetes_versions: Vec<VersionOption>,
    #[serde(default)]
    pub machine_images: Vec<MachineImage>,
}

/// Cluster coordinates shared by every cluster-scoped request.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRef {
    pub project_id: String,
    pub region: String,
    pub cluster_name: String,
}

impl ClusterRef {
    fn path(&self) -> String {
        format!(
            "{}/{}",
            clusters_path(&self.project_id, &self.region),
            seg(&self.cluster_name)
        )
    }
}

fn clusters_path(project_id: &str, region: &str) -> String {
    format!(
        "/v2/projects/{}/regions/{}/clusters",
        seg(project_id),
        seg(region)
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListClustersRequest {
    pub project_id: String,
    pub region: String,
}

impl ListClustersRequest {
    pub async fn execute(&self, client: &ApiClient) -> ApiResult<ClusterListResponse> {
        client
            .call(Method::GET, &clusters_path(&self.project_id, &self.region))
            .fetch()
            .await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListProviderOptionsRequest {
    pub region: String,
}

impl ListProviderOptionsRequest {
    pub async fn execute(&self, client: &ApiClient) -> ApiResult<ProviderOptions> {
        let path = format!("/v2/regions/{}/provider-options", seg(&self.region));
        client.call(Method::GET, &path).fetch().await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetClusterRequest {
    pub cluster: ClusterRef,
}

impl GetClusterRequest {
    pub async fn execute(&self, client: &ApiClient) -> ApiResult<Cluster> {
        client.call(Method::GET, &self.cluster.path()).fetch().await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateOrUpdateClusterRequest {
    pub cluster: ClusterRef,
    pub payload: CreateOrUpdateClusterPayload,
}

impl CreateOrUpdateClusterRequest {
    pub async fn execute(&self, client: &ApiClient) -> ApiResult<Cluster> {
        client
            .call(Method::PUT, &self.cluster.path())
            .json(&self.payload)
            .fetch()
            .await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteClusterRequest {
    pub cluster: ClusterRef,
}

impl DeleteClusterRequest {
    pub async fn execute(&self, client: &ApiClient) -> ApiResult<()> {
        client.call(Method::DELETE, &self.cluster.path()).send().await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateKubeconfigRequest {
    pub cluster: ClusterRef,
    pub payload: CreateKubeconfigPayload,
}

impl CreateKubeconfigRequest {
    pub async fn execute(&self, client: &ApiClient) -> ApiResult<Kubeconfig> {
        client
            .call(Method::POST, &format!("{}/kubeconfig", self.cluster.path()))
            .json(&self.payload)
            .fetch()
            .await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetLoginKubeconfigRequest {
    pub cluster: ClusterRef,
}

impl GetLoginKubeconfigRequest {
    pub async fn execute(&self, client: &ApiClient) -> ApiResult<LoginKubeconfig> {
        client
            .call(Method::GET, &format!("{}/kubeconfig/login", self.cluster.path()))
            .fetch()
            .await
    }
}

/// Cluster operations can take a long time.
pub fn default_wait_config() -> WaitConfig {
    WaitConfig {
        deadline: Duration::from_secs(45 * 60),
        ..WaitConfig::default()
    }
}

/// Poll until the cluster is healthy or hibernated.
pub async fn wait_for_cluster_ready(
    client: &ApiClient,
    cluster: &ClusterRef,
    config: WaitConfig,
    cancel: &CancellationToken,
) -> Result<Cluster, WaitError> {
    let request = &GetClusterRequest {
        cluster: cluster.clone(),
    };
    wait(config.tolerate_not_found(), cancel, move || async move {
        let found = request.execute(client).await?;
        Ok(match found.state() {
            Some(STATE_HEALTHY) | Some(STATE_HIBERNATED) => PollOutcome::Done(found),
            Some(STATE_FAILED) => PollOutcome::Failed(
                found
                    .status
                    .as_ref()
                    .map(ClusterStatus::failure_reason)
                    .unwrap_or_default(),
            ),
            _ => PollOutcome::Pending,
        })
    })
    .await
}

/// Poll until the cluster is gone.
pub async fn wait_for_cluster_deleted(
    client: &ApiClient,
    cluster: &ClusterRef,
    config: WaitConfig,
    cancel: &CancellationToken,
) -> Result<(), WaitError> {
    let request = &GetClusterRequest {
        cluster: cluster.clone(),
    };
    wait(config, cancel, move || async move {
        match request.execute(client).await {
            Err(e) if e.is_not_found() => Ok(PollOutcome::Done(())),
            Err(e) => Err(e),
            Ok(found) if found.state() == Some(STATE_FAILED) => Ok(PollOutcome::Failed(
                found
                    .status
                    .as_ref()
                    .map(ClusterStatus::failure_reason)
                    .unwrap_or_default(),
            )),
            Ok(_) => Ok(PollOutcome::Pending),
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reason_prefers_error_code() {
        let status: ClusterStatus = serde_json::from_value(serde_json::json!({
            "aggregated": "STATE_FAILED",
            "errors": [{"code": "InsufficientQuota", "message": "quota exceeded"}]
        }))
        .unwrap();
        assert_eq!(status.failure_reason(), "InsufficientQuota");

        let status: ClusterStatus = serde_json::from_value(serde_json::json!({
            "errors": [{"message": "quota exceeded"}]
        }))
        .unwrap();
        assert_eq!(status.failure_reason(), "quota exceeded");
    }

    #[test]
    fn test_kubeconfig_expiration_is_a_string() {
        let payload = CreateKubeconfigPayload {
            expiration_seconds: Some("1800".into()),
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"expirationSeconds": "1800"})
        );
    }

    #[test]
    fn test_provider_options_tolerate_missing_lists() {
        let options: ProviderOptions = serde_json::from_value(serde_json::json!({
            "kubernetesVersions": [{"version": "1.30.2", "state": "supported"}]
        }))
        .unwrap();
        assert_eq!(options.kubernetes_versions.len(), 1);
        assert!(options.machine_images.is_empty());
    }
}
