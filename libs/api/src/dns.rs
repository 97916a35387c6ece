//! DNS: zones and record sets.

use crate::client::{ApiClient, seg};
use crate::error::ApiResult;
use crate::wait::{PollOutcome, WaitConfig, WaitError, wait};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const RECORD_SET_CREATE_SUCCEEDED: &str = "CREATE_SUCCEEDED";
pub const RECORD_SET_CREATE_FAILED: &str = "CREATE_FAILED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Soa,
    Cname,
    Ns,
    Mx,
    Txt,
    Srv,
    Ptr,
    Alias,
    Dname,
    Caa,
}

impl RecordType {
    pub const ALL: [RecordType; 12] = [
        Self::A,
        Self::Aaaa,
        Self::Soa,
        Self::Cname,
        Self::Ns,
        Self::Mx,
        Self::Txt,
        Self::Srv,
        Self::Ptr,
        Self::Alias,
        Self::Dname,
        Self::Caa,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Soa => "SOA",
            Self::Cname => "CNAME",
            Self::Ns => "NS",
            Self::Mx => "MX",
            Self::Txt => "TXT",
            Self::Srv => "SRV",
            Self::Ptr => "PTR",
            Self::Alias => "ALIAS",
            Self::Dname => "DNAME",
            Self::Caa => "CAA",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSetResponse {
    pub rrset: RecordSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateRecordSetPayload {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: RecordType,
    pub records: Vec<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneResponse {
    pub zone: Zone,
}

fn zone_path(project_id: &str, zone_id: &str) -> String {
    format!("/v1/projects/{}/zones/{}", seg(project_id), seg(zone_id))
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetZoneRequest {
    pub project_id: String,
    pub zone_id: String,
}

impl GetZoneRequest {
    pub async fn execute(&self, client: &ApiClient) -> ApiResult<ZoneResponse> {
        client
            .call(Method::GET, &zone_path(&self.project_id, &self.zone_id))
            .fetch()
            .await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateRecordSetRequest {
    pub project_id: String,
    pub zone_id: String,
    pub payload: CreateRecordSetPayload,
}

impl CreateRecordSetRequest {
    pub async fn execute(&self, client: &ApiClient) -> ApiResult<RecordSetResponse> {
        let path = format!("{}/rrsets", zone_path(&self.project_id, &self.zone_id));
        client.call(Method::POST, &path).json(&self.payload).fetch().await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetRecordSetRequest {
    pub project_id: String,
    pub zone_id: String,
    pub record_set_id: String,
}

impl GetRecordSetRequest {
    pub async fn execute(&self, client: &ApiClient) -> ApiResult<RecordSetResponse> {
        let path = format!(
            "{}/rrsets/{}",
            zone_path(&self.project_id, &self.zone_id),
            seg(&self.record_set_id)
        );
        client.call(Method::GET, &path).fetch().await
    }
}

pub fn default_wait_config() -> WaitConfig {
    WaitConfig {
        deadline: Duration::from_secs(10 * 60),
        ..WaitConfig::default()
    }
}

pub async fn wait_for_record_set_created(
    client: &ApiClient,
    request: &GetRecordSetRequest,
    config: WaitConfig,
    cancel: &CancellationToken,
) -> Result<RecordSet, WaitError> {
    wait(config.tolerate_not_found(), cancel, move || async move {
        let rrset = request.execute(client).await?.rrset;
        Ok(match rrset.state.as_deref() {
            Some(RECORD_SET_CREATE_SUCCEEDED) => PollOutcome::Done(rrset),
            Some(RECORD_SET_CREATE_FAILED) => PollOutcome::Failed(
                rrset
                    .error
                    .unwrap_or_else(|| "record set creation failed".to_string()),
            ),
            _ => PollOutcome::Pending,
        })
    })
    .await
}
