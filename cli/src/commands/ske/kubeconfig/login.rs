//! Exec credential plugin for kubectl and other Kubernetes clients.
//!
//! Client certificates are cached per cluster server and account. A cached
//! certificate is reused until 15 minutes before it expires; inside that
//! window a new one is requested and the cached one is the fallback.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use stackit_api::Service;
use stackit_api::ske::{ClusterRef, CreateKubeconfigPayload, CreateKubeconfigRequest};
use stackit_shared::cache::Cache;
use std::future::Future;

use crate::client::{authenticator, configure};
use crate::commands::CmdParams;
use crate::errors::{CliError, Context};

pub const EXEC_INFO_ENV: &str = "KUBERNETES_EXEC_INFO";
const EXEC_CREDENTIAL_API_VERSION: &str = "client.authentication.k8s.io/v1";
const LOGIN_EXPIRATION_SECONDS: u64 = 30 * 60;
const REFRESH_BEFORE: Duration = Duration::minutes(15);

const MISSING_EXEC_INFO: &str = "KUBERNETES_EXEC_INFO env var is unset or empty.
The command probably was not called from a Kubernetes client application!
See `stackit ske kubeconfig login --help` for detailed usage instructions.";

#[derive(Debug, Deserialize)]
struct ExecCredentialRequest {
    spec: ExecCredentialSpec,
}

#[derive(Debug, Deserialize)]
struct ExecCredentialSpec {
    cluster: Option<ExecCluster>,
}

#[derive(Debug, Deserialize)]
struct ExecCluster {
    server: String,
    config: Option<ClusterConfig>,
}

/// Extension data of the login kubeconfig.
#[derive(Debug, Clone, PartialEq, Deserialize)]
struct ClusterConfig {
    #[serde(rename = "stackitProjectID")]
    project_id: String,
    #[serde(rename = "clusterName")]
    cluster_name: String,
    #[serde(default)]
    region: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecCredential {
    api_version: &'static str,
    kind: &'static str,
    status: ExecCredentialStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecCredentialStatus {
    expiration_timestamp: String,
    client_certificate_data: String,
    client_key_data: String,
}

/// Client certificate and key of a login kubeconfig.
#[derive(Debug, Clone, PartialEq)]
struct ClientCredential {
    certificate_pem: String,
    key_pem: String,
    not_after: DateTime<Utc>,
}

#[derive(Deserialize)]
struct KubeconfigDocument {
    #[serde(default)]
    users: Vec<NamedUser>,
}

#[derive(Deserialize)]
struct NamedUser {
    user: UserEntry,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct UserEntry {
    client_certificate_data: Option<String>,
    client_key_data: Option<String>,
}

impl ClientCredential {
    fn from_kubeconfig(raw: &[u8]) -> Result<Self, String> {
        let document: KubeconfigDocument =
            serde_yaml::from_slice(raw).map_err(|e| format!("parse kubeconfig: {e}"))?;
        let user = document
            .users
            .into_iter()
            .next()
            .ok_or("kubeconfig has no user")?
            .user;
        let decode = |data: Option<String>, what: &str| -> Result<String, String> {
            let data = data.ok_or_else(|| format!("kubeconfig has no {what}"))?;
            let bytes = STANDARD
                .decode(data.trim())
                .map_err(|e| format!("decode {what}: {e}"))?;
            String::from_utf8(bytes).map_err(|e| format!("decode {what}: {e}"))
        };
        let certificate_pem = decode(user.client_certificate_data, "client certificate")?;
        let key_pem = decode(user.client_key_data, "client key")?;
        let not_after = certificate_not_after(certificate_pem.as_bytes())?;
        Ok(Self {
            certificate_pem,
            key_pem,
            not_after,
        })
    }

    fn to_exec_credential(&self) -> ExecCredential {
        ExecCredential {
            api_version: EXEC_CREDENTIAL_API_VERSION,
            kind: "ExecCredential",
            status: ExecCredentialStatus {
                expiration_timestamp: (self.not_after - REFRESH_BEFORE)
                    .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                client_certificate_data: self.certificate_pem.clone(),
                client_key_data: self.key_pem.clone(),
            },
        }
    }
}

fn certificate_not_after(pem: &[u8]) -> Result<DateTime<Utc>, String> {
    let (_, pem) =
        x509_parser::pem::parse_x509_pem(pem).map_err(|e| format!("decode pem: {e}"))?;
    let certificate = pem
        .parse_x509()
        .map_err(|e| format!("parse certificate: {e}"))?;
    let timestamp = certificate.validity().not_after.timestamp();
    DateTime::from_timestamp(timestamp, 0)
        .ok_or_else(|| format!("certificate expiry {timestamp} is out of range"))
}

/// `ske-login-` and the hex SHA-256 of the server and the account email.
fn cache_key(server: &str, email: &str) -> String {
    let digest = Sha256::digest(format!("{server}\0{email}").as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("ske-login-{hex}")
}

fn read_request(params: &CmdParams) -> Result<String, CliError> {
    match params.settings.env().get(EXEC_INFO_ENV) {
        Some(info) if !info.trim().is_empty() => Ok(info.to_string()),
        _ if params.printer.stdin_is_tty() => Err(CliError::Other(MISSING_EXEC_INFO.to_string())),
        _ => Ok(params.printer.read_input()?),
    }
}

fn parse_request(raw: &str) -> Result<(String, ClusterConfig), CliError> {
    let request: ExecCredentialRequest = serde_json::from_str(raw)
        .map_err(|e| CliError::Other(format!("parse exec credential: {e}")))?;
    let cluster = request.spec.cluster.ok_or_else(|| {
        CliError::Other("ExecCredential contains not all needed fields".to_string())
    })?;
    let config = cluster.config.ok_or_else(|| {
        CliError::Other("ExecCredential contains not all needed fields".to_string())
    })?;
    Ok((cluster.server, config))
}

pub async fn handle_login(params: &CmdParams) -> Result<(), CliError> {
    let (server, mut config) =
        parse_request(&read_request(params)?).context("parse cluster config")?;
    if config.region.is_empty() {
        config.region = params.global.region.clone();
    }
    params.printer.debug(format!(
        "kubeconfig login for cluster {:?} in project {:?}",
        config.cluster_name, config.project_id
    ));

    let email = authenticator(params)?
        .auth_email()
        .context("error getting auth email")?;
    let cache = Cache::from_default_dir().context("cache init failed")?;
    let key = cache_key(&server, &email);

    let cluster = ClusterRef {
        project_id: config.project_id,
        region: config.region,
        cluster_name: config.cluster_name,
    };
    let credential = resolve_credential(params, &cache, &key, Utc::now(), || async {
        let client = configure(params, Service::Ske).await?;
        let response = CreateKubeconfigRequest {
            cluster: cluster.clone(),
            payload: CreateKubeconfigPayload {
                expiration_seconds: Some(LOGIN_EXPIRATION_SECONDS.to_string()),
            },
        }
        .execute(&client)
        .await
        .context("request kubeconfig")?;
        response
            .kubeconfig
            .ok_or_else(|| CliError::Other("request kubeconfig: empty response".to_string()))
    })
    .await?;

    let body = serde_json::to_string(&credential.to_exec_credential())
        .map_err(|e| CliError::Other(format!("marshal ExecCredential: {e}")))?;
    params.printer.outputf(body)?;
    Ok(())
}

/// Cached credential when fresh enough, else a newly fetched one.
async fn resolve_credential<F, Fut>(
    params: &CmdParams,
    cache: &Cache,
    key: &str,
    now: DateTime<Utc>,
    fetch: F,
) -> Result<ClientCredential, CliError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String, CliError>>,
{
    let cached = match cache.get(key) {
        Ok(raw) => match ClientCredential::from_kubeconfig(&raw) {
            Ok(credential) => Some(credential),
            Err(reason) => {
                params
                    .printer
                    .debug(format!("discard cached kubeconfig: {reason}"));
                cache.delete(key)?;
                None
            }
        },
        Err(_) => None,
    };

    let fallback = match cached {
        Some(credential) if now > credential.not_after => {
            cache.delete(key)?;
            None
        }
        Some(credential) if now + REFRESH_BEFORE > credential.not_after => Some(credential),
        Some(credential) => return Ok(credential),
        None => None,
    };

    let fetched = async {
        let kubeconfig = fetch().await?;
        let credential = ClientCredential::from_kubeconfig(kubeconfig.as_bytes())
            .map_err(|e| CliError::Other(format!("parse kubeconfig: {e}")))?;
        cache
            .put(key, kubeconfig.as_bytes())
            .context("cache kubeconfig")?;
        Ok::<_, CliError>(credential)
    }
    .await;

    match (fetched, fallback) {
        (Ok(credential), _) => Ok(credential),
        (Err(e), Some(cached)) => {
            params
                .printer
                .debug(format!("refresh failed, using cached kubeconfig: {e}"));
            Ok(cached)
        }
        (Err(e), None) => Err(e),
    }
}
