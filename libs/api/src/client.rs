//! HTTP core shared by every service module.

use crate::error::{ApiError, ApiResult};
use reqwest::{Method, RequestBuilder, Response, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use stackit_shared::tls_client::{TlsClientConfig, create_tls_client};
use std::time::Duration;
use tracing::debug;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Cloud services the CLI talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Iaas,
    Ske,
    Dns,
}

impl Service {
    /// Prefix of the `<svc>.custom-endpoint` setting.
    pub fn config_name(&self) -> &'static str {
        match self {
            Self::Iaas => "iaas",
            Self::Ske => "ske",
            Self::Dns => "dns",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Iaas => "IaaS",
            Self::Ske => "SKE",
            Self::Dns => "DNS",
        }
    }

    /// Production endpoint. Regional services carry the region in the path.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Iaas => "https://iaas.api.stackit.cloud",
            Self::Ske => "https://ske.api.stackit.cloud",
            Self::Dns => "https://dns.api.stackit.cloud",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub endpoint: String,
    /// Full `Authorization` header value.
    pub authorization: String,
    pub user_agent: String,
    pub timeout: Option<Duration>,
}

impl ApiConfig {
    pub fn new(endpoint: impl Into<String>, authorization: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            authorization: authorization.into(),
            user_agent: format!("stackit-cli/{}", env!("CARGO_PKG_VERSION")),
            timeout: Some(Duration::from_secs(60)),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl ErrorBody {
    fn reason(self) -> Option<String> {
        self.message.or(self.msg).or_else(|| match self.error {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Object(map)) => map
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string),
            _ => None,
        })
    }
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> ApiResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&config.authorization)
                .map_err(|e| ApiError::Client(format!("invalid authorization header: {e}")))?,
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(&config.user_agent)
                .map_err(|e| ApiError::Client(format!("invalid user agent: {e}")))?,
        );

        let http = create_tls_client(TlsClientConfig {
            headers,
            timeout: config.timeout,
        })
        .map_err(ApiError::Client)?;

        Ok(Self {
            http,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a request against `path` below the service endpoint.
    pub(crate) fn call(&self, method: Method, path: &str) -> Call {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        Call {
            builder: self.http.request(method, &url),
            url,
        }
    }
}

pub(crate) struct Call {
    url: String,
    builder: RequestBuilder,
}

impl Call {
    pub(crate) fn query(mut self, query: &[(&str, String)]) -> Self {
        if !query.is_empty() {
            self.builder = self.builder.query(query);
        }
        self
    }

    pub(crate) fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        self.builder = self.builder.json(body);
        self
    }

    async fn send_raw(self) -> ApiResult<Response> {
        let url = self.url;
        let response = self
            .builder
            .send()
            .await
            .map_err(|source| ApiError::Transport { url, source })?;
        handle_response_error(response).await
    }

    /// Send and decode the JSON response body.
    pub(crate) async fn fetch<T: DeserializeOwned>(self) -> ApiResult<T> {
        let response = self.send_raw().await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Send and ignore whatever body comes back.
    pub(crate) async fn send(self) -> ApiResult<()> {
        self.send_raw().await.map(|_| ())
    }
}

/// Turn a non-success response into [`ApiError::Status`].
async fn handle_response_error(response: Response) -> ApiResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.unwrap_or_default();

    let reason = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::reason)
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    Err(ApiError::Status {
        status: status.as_u16(),
        reason,
        request_id,
    })
}

/// Path segment escaping.
pub(crate) fn seg(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
