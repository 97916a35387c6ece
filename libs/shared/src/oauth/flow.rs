//! OAuth 2.0 authorization code flow with PKCE

use super::config::OAuthConfig;
use super::error::{OAuthError, OAuthResult};
use super::pkce::PkceChallenge;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Token endpoint response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

pub struct OAuthFlow {
    config: OAuthConfig,
    pkce: PkceChallenge,
}

impl OAuthFlow {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            pkce: PkceChallenge::generate(),
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// State value the callback must echo back.
    pub fn state(&self) -> &str {
        &self.pkce.state
    }

    /// URL the user's browser is sent to.
    pub fn authorization_url(&self) -> String {
        format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&scope={}&code_challenge={}&code_challenge_method={}&state={}",
            self.config.auth_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_url),
            urlencoding::encode(&self.config.scopes_string()),
            urlencoding::encode(&self.pkce.challenge),
            PkceChallenge::METHOD,
            urlencoding::encode(&self.pkce.state),
        )
    }

    /// Trade the authorization code for access and refresh tokens.
    pub async fn exchange_code(
        &self,
        http: &reqwest::Client,
        code: &str,
    ) -> OAuthResult<TokenResponse> {
        debug!("trading authorization code for access and refresh tokens");
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", self.pkce.verifier.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_url.as_str()),
        ];
        let tokens = post_token_form(http, &self.config.token_url, &form).await?;
        if tokens.refresh_token.as_deref().unwrap_or_default().is_empty() {
            return Err(OAuthError::invalid_response("found no refresh token"));
        }
        Ok(tokens)
    }
}

/// Use a refresh token to obtain a new access token.
pub async fn refresh_access_token(
    http: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    refresh_token: &str,
) -> OAuthResult<TokenResponse> {
    debug!("refreshing access token at {}", token_url);
    let form = [
        ("grant_type", "refresh_token"),
        ("client_id", client_id),
        ("refresh_token", refresh_token),
    ];
    post_token_form(http, token_url, &form).await
}

/// POST a form-encoded grant to a token endpoint.
pub async fn post_token_form(
    http: &reqwest::Client,
    token_url: &str,
    form: &[(&str, &str)],
) -> OAuthResult<TokenResponse> {
    let response = http
        .post(token_url)
        .form(form)
        .send()
        .await
        .map_err(|source| OAuthError::Unreachable {
            endpoint: token_url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(OAuthError::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    let tokens = response
        .json::<TokenResponse>()
        .await
        .map_err(|e| OAuthError::invalid_response(format!("unmarshal response: {}", e)))?;
    if tokens.access_token.is_empty() {
        return Err(OAuthError::invalid_response("found no access token"));
    }
    Ok(tokens)
}
