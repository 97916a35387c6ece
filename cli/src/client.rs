//! Per-service API clients built from the active profile.

use crate::commands::CmdParams;
use crate::commands::auth::handle_login;
use crate::config::{Settings, keys};
use crate::errors::{CliError, Context};
use stackit_api::{ApiClient, ApiConfig, Service};
use stackit_shared::auth::service_account::DEFAULT_TOKEN_ENDPOINT;
use stackit_shared::auth::{AuthSettings, Authenticator, CredentialStore, ENV_ACCESS_TOKEN};
use stackit_shared::oauth::config::{DEFAULT_CLIENT_ID, DEFAULT_IDP_ENDPOINT};
use stackit_shared::tls_client::{TlsClientConfig, create_tls_client};
use std::time::Duration;

const AUTH_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub fn user_agent() -> String {
    format!("stackit-cli/{}", env!("CARGO_PKG_VERSION"))
}

/// Identity settings of the active profile.
pub fn auth_settings(settings: &Settings) -> AuthSettings {
    AuthSettings {
        session_time_limit: settings.session_time_limit(),
        idp_endpoint: settings
            .get(keys::IDP_CUSTOM_ENDPOINT)
            .unwrap_or_else(|| DEFAULT_IDP_ENDPOINT.to_string()),
        client_id: settings
            .get(keys::IDP_CUSTOM_CLIENT_ID)
            .unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
        token_endpoint: settings
            .get(keys::TOKEN_CUSTOM_ENDPOINT)
            .unwrap_or_else(|| DEFAULT_TOKEN_ENDPOINT.to_string()),
    }
}

/// Plain HTTP client for the identity endpoints.
pub fn http_client() -> Result<reqwest::Client, CliError> {
    create_tls_client(TlsClientConfig {
        timeout: Some(AUTH_HTTP_TIMEOUT),
        ..Default::default()
    })
    .map_err(CliError::Other)
}

pub fn authenticator(params: &CmdParams) -> Result<Authenticator, CliError> {
    let settings = &params.settings;
    let store = CredentialStore::new(params.store.dir(), settings.profile());
    Ok(
        Authenticator::new(store, auth_settings(settings), http_client()?)
            .with_env_access_token(settings.env().get(ENV_ACCESS_TOKEN).map(str::to_string)),
    )
}

/// Endpoint override for `service`, else its production endpoint.
pub fn endpoint_for(settings: &Settings, service: Service) -> String {
    settings
        .custom_endpoint(service.config_name())
        .unwrap_or_else(|| service.default_endpoint().to_string())
}

/// Authenticated client for `service`.
pub async fn configure(params: &CmdParams, service: Service) -> Result<ApiClient, CliError> {
    let authenticator = authenticator(params)?;
    reauthenticate_if_expired(params, &authenticator).await?;
    let bearer = authenticator.resolve().await?;
    let endpoint = endpoint_for(&params.settings, service);
    params
        .printer
        .debug(format!("{} endpoint: {}", service.display_name(), endpoint));
    let client = ApiClient::new(ApiConfig::new(endpoint, bearer).with_user_agent(user_agent()))?;
    Ok(client)
}

/// Renew an expired browser session in place when a user is at the terminal.
async fn reauthenticate_if_expired(
    params: &CmdParams,
    authenticator: &Authenticator,
) -> Result<bool, CliError> {
    if !params.printer.stdin_is_tty() || !authenticator.user_session_expired()? {
        return Ok(false);
    }
    params
        .printer
        .prompt_for_enter("Your session has expired, press Enter to login again...")?;
    handle_login(params).await.context("user login")?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{Harness, harness};
    use crate::config::{ConfigFile, Environment};
    use crate::print::PrintError;
    use stackit_shared::auth::{Credentials, UserCredentials};

    fn settings(env: &[(&str, &str)]) -> Settings {
        Settings::new(
            ConfigFile::default(),
            Environment::from_pairs(env.iter().copied()),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_override_from_env() {
        let s = settings(&[("STACKIT_SKE_CUSTOM_ENDPOINT", "http://127.0.0.1:9000")]);
        assert_eq!(endpoint_for(&s, Service::Ske), "http://127.0.0.1:9000");
        assert_eq!(endpoint_for(&s, Service::Dns), Service::Dns.default_endpoint());
    }

    #[test]
    fn test_auth_settings_defaults_and_overrides() {
        let defaults = auth_settings(&settings(&[]));
        assert_eq!(defaults.idp_endpoint, DEFAULT_IDP_ENDPOINT);
        assert_eq!(defaults.client_id, DEFAULT_CLIENT_ID);
        assert_eq!(defaults.token_endpoint, DEFAULT_TOKEN_ENDPOINT);
        assert_eq!(defaults.session_time_limit, chrono::Duration::hours(12));

        let custom = auth_settings(&settings(&[
            ("STACKIT_SESSION_TIME_LIMIT", "2h"),
            ("STACKIT_TOKEN_CUSTOM_ENDPOINT", "http://localhost:1/token"),
        ]));
        assert_eq!(custom.session_time_limit, chrono::Duration::hours(2));
        assert_eq!(custom.token_endpoint, "http://localhost:1/token");
    }

    #[test]
    fn test_user_agent_carries_version() {
        assert!(user_agent().starts_with("stackit-cli/"));
    }

    fn expired_login(h: &Harness) -> Authenticator {
        let store = CredentialStore::file_only(h.params.store.dir(), "default");
        let now = chrono::Utc::now().timestamp();
        store
            .save(&Credentials::User(UserCredentials {
                access_token: "old-access".to_string(),
                refresh_token: "refresh-1".to_string(),
                id_token: None,
                access_token_expires_at_unix: now + 3600,
                user_email: "jane@example.com".to_string(),
                session_expires_at_unix: now - 1,
                idp_token_endpoint: None,
            }))
            .unwrap();
        Authenticator::new(store, AuthSettings::default(), reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_expired_session_without_terminal_is_left_to_resolve() {
        let h = harness(&[], "\n");
        let auth = expired_login(&h);
        assert!(!reauthenticate_if_expired(&h.params, &auth).await.unwrap());
        assert!(h.err.contents().is_empty());
    }

    #[tokio::test]
    async fn test_expired_session_prompts_before_login() {
        let mut h = harness(&[], "");
        h.params.printer = h.params.printer.clone().with_interactive_stdin(true);
        let auth = expired_login(&h);
        let err = reauthenticate_if_expired(&h.params, &auth)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Print(PrintError::NoInput)));
        assert_eq!(
            h.err.contents(),
            "Your session has expired, press Enter to login again..."
        );
    }
}
