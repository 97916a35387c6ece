//! IaaS: images and routes of routing tables.

use crate::client::{ApiClient, seg};
use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub type Labels = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boot_menu: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cdrom_bus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_bus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nic_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_system_distro: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_system_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rescue_bus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rescue_device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure_boot: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uefi: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtio_scsi: Option<bool>,
}

impl ImageConfig {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ImageConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_disk_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_ram: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageListResponse {
    #[serde(default)]
    pub items: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCreateResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateImagePayload {
    pub name: String,
    pub disk_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ImageConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_disk_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_ram: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protected: Option<bool>,
}

/// Sparse update: absent fields are left untouched by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateImagePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ImageConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_disk_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_ram: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protected: Option<bool>,
}

impl UpdateImagePayload {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn images_path(project_id: &str, region: &str) -> String {
    format!(
        "/v2/projects/{}/regions/{}/images",
        seg(project_id),
        seg(region)
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListImagesRequest {
    pub project_id: String,
    pub region: String,
    pub label_selector: Option<String>,
}

impl ListImagesRequest {
    pub async fn execute(&self, client: &ApiClient) -> ApiResult<ImageListResponse> {
        let mut query = Vec::new();
        if let Some(selector) = &self.label_selector {
            query.push(("label_selector", selector.clone()));
        }
        client
            .call(Method::GET, &images_path(&self.project_id, &self.region))
            .query(&query)
            .fetch()
            .await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetImageRequest {
    pub project_id: String,
    pub region: String,
    pub image_id: String,
}

impl GetImageRequest {
    pub async fn execute(&self, client: &ApiClient) -> ApiResult<Image> {
        let path = format!(
            "{}/{}",
            images_path(&self.project_id, &self.region),
            seg(&self.image_id)
        );
        client.call(Method::GET, &path).fetch().await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateImageRequest {
    pub project_id: String,
    pub region: String,
    pub payload: CreateImagePayload,
}

impl CreateImageRequest {
    pub async fn execute(&self, client: &ApiClient) -> ApiResult<ImageCreateResponse> {
        client
            .call(Method::POST, &images_path(&self.project_id, &self.region))
            .json(&self.payload)
            .fetch()
            .await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateImageRequest {
    pub project_id: String,
    pub region: String,
    pub image_id: String,
    pub payload: UpdateImagePayload,
}

impl UpdateImageRequest {
    pub async fn execute(&self, client: &ApiClient) -> ApiResult<Image> {
        let path = format!(
            "{}/{}",
            images_path(&self.project_id, &self.region),
            seg(&self.image_id)
        );
        client.call(Method::PATCH, &path).json(&self.payload).fetch().await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteImageRequest {
    pub project_id: String,
    pub region: String,
    pub image_id: String,
}

impl DeleteImageRequest {
    pub async fn execute(&self, client: &ApiClient) -> ApiResult<()> {
        let path = format!(
            "{}/{}",
            images_path(&self.project_id, &self.region),
            seg(&self.image_id)
        );
        client.call(Method::DELETE, &path).send().await
    }
}

/// Stream image data to the pre-signed upload URL.
///
/// The URL carries its own authorization, so the request goes out on a plain
/// client without the API bearer.
pub async fn upload_image(url: &str, body: reqwest::Body, content_length: u64) -> ApiResult<()> {
    let http = stackit_shared::tls_client::create_tls_client(Default::default())
        .map_err(ApiError::Client)?;
    debug!("uploading {} bytes to {}", content_length, url);
    let response = http
        .put(url)
        .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
        .header(reqwest::header::CONTENT_LENGTH, content_length)
        .body(body)
        .send()
        .await
        .map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(ApiError::Status {
            status: status.as_u16(),
            reason: format!("server rejected image upload with {status}"),
            request_id: None,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteDestination {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteNexthop {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<RouteDestination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nexthop: Option<RouteNexthop>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteListResponse {
    #[serde(default)]
    pub items: Vec<Route>,
}

/// Location of a routing table inside a network area.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingTableRef {
    pub organization_id: String,
    pub network_area_id: String,
    pub region: String,
    pub routing_table_id: String,
}

impl RoutingTableRef {
    fn routes_path(&self) -> String {
        format!(
            "/v2/organizations/{}/network-areas/{}/regions/{}/routing-tables/{}/routes",
            seg(&self.organization_id),
            seg(&self.network_area_id),
            seg(&self.region),
            seg(&self.routing_table_id)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListRoutesRequest {
    pub table: RoutingTableRef,
    pub label_selector: Option<String>,
}

impl ListRoutesRequest {
    pub async fn execute(&self, client: &ApiClient) -> ApiResult<RouteListResponse> {
        let mut query = Vec::new();
        if let Some(selector) = &self.label_selector {
            query.push(("label_selector", selector.clone()));
        }
        client
            .call(Method::GET, &self.table.routes_path())
            .query(&query)
            .fetch()
            .await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetRouteRequest {
    pub table: RoutingTableRef,
    pub route_id: String,
}

impl GetRouteRequest {
    pub async fn execute(&self, client: &ApiClient) -> ApiResult<Route> {
        let path = format!("{}/{}", self.table.routes_path(), seg(&self.route_id));
        client.call(Method::GET, &path).fetch().await
    }
}
