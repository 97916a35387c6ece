//! Turns stored credentials into a bearer for outbound requests.
//!
//! Each mode is driven by [`SessionState`]:
//!
//! ```text
//! user:   NotLoggedIn -> Authorized -> NeedsRefresh -> Authorized | Expired
//! sa_key: NotLoggedIn -> Authorized -> NeedsRefresh (re-sign) -> Authorized | Expired
//! sa_token: NotLoggedIn -> Authorized | Expired
//! ```
//!
//! `Expired` means the local session cap (`session.time-limit`) has passed; a new
//! login is required even if the server would still accept a refresh.

use super::credentials::{Credentials, KeyCredentials, TokenCredentials, UserCredentials};
use super::error::{AuthError, AuthResult};
use super::jwt::{decode_claims, email_from_token};
use super::service_account::{DEFAULT_TOKEN_ENDPOINT, ServiceAccountKey};
use super::storage::CredentialStore;
use crate::oauth::config::{DEFAULT_CLIENT_ID, DEFAULT_IDP_ENDPOINT};
use crate::oauth::{TokenResponse, refresh_access_token};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};
use tracing::debug;

/// Tokens this close to expiry are refreshed before use.
pub const REFRESH_WINDOW: Duration = Duration::seconds(60);

pub const ENV_ACCESS_TOKEN: &str = "STACKIT_ACCESS_TOKEN";

static REFRESH_LOCKS: LazyLock<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Process-local lock serializing refreshes for one profile.
fn refresh_lock(profile: &str) -> Arc<tokio::sync::Mutex<()>> {
    match REFRESH_LOCKS.lock() {
        Ok(mut locks) => locks.entry(profile.to_string()).or_default().clone(),
        Err(poisoned) => poisoned
            .into_inner()
            .entry(profile.to_string())
            .or_default()
            .clone(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Authorized,
    NeedsRefresh,
    Expired,
}

impl SessionState {
    fn evaluate(
        session_expires_at: i64,
        token_expires_at: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        if now.timestamp() >= session_expires_at {
            return Self::Expired;
        }
        match token_expires_at {
            Some(exp) if exp - now.timestamp() > REFRESH_WINDOW.num_seconds() => Self::Authorized,
            _ => Self::NeedsRefresh,
        }
    }
}

/// Settings the resolver needs from the config store.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub session_time_limit: Duration,
    pub idp_endpoint: String,
    pub client_id: String,
    pub token_endpoint: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            session_time_limit: Duration::hours(12),
            idp_endpoint: DEFAULT_IDP_ENDPOINT.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
        }
    }
}

impl AuthSettings {
    pub fn idp_token_url(&self) -> String {
        format!("{}/token", self.idp_endpoint.trim_end_matches('/'))
    }
}

pub struct Authenticator {
    store: CredentialStore,
    settings: AuthSettings,
    http: reqwest::Client,
    env_access_token: Option<String>,
}

impl Authenticator {
    pub fn new(store: CredentialStore, settings: AuthSettings, http: reqwest::Client) -> Self {
        Self {
            store,
            settings,
            http,
            env_access_token: None,
        }
    }

    /// A token from the environment bypasses the credential store.
    pub fn with_env_access_token(mut self, token: Option<String>) -> Self {
        self.env_access_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// `Authorization` header value for the active profile.
    pub async fn resolve(&self) -> AuthResult<String> {
        Ok(format!("Bearer {}", self.access_token().await?))
    }

    /// True when a browser login exists but its session cap has passed.
    ///
    /// A token from the environment never expires locally.
    pub fn user_session_expired(&self) -> AuthResult<bool> {
        if self.env_access_token.is_some() {
            return Ok(false);
        }
        Ok(match self.store.load()? {
            Some(Credentials::User(user)) => {
                Utc::now().timestamp() >= user.session_expires_at_unix
            }
            _ => false,
        })
    }

    pub async fn access_token(&self) -> AuthResult<String> {
        if let Some(token) = &self.env_access_token {
            debug!("using access token from {}", ENV_ACCESS_TOKEN);
            return Ok(token.clone());
        }

        let credentials = self.store.load()?.ok_or(AuthError::NotLoggedIn)?;
        if let Some(token) = Self::current_token(&credentials, Utc::now())? {
            return Ok(token);
        }

        let lock = refresh_lock(self.store.profile());
        let _guard = lock.lock().await;

        // Another task may have refreshed while we waited.
        let credentials = self.store.load()?.ok_or(AuthError::NotLoggedIn)?;
        if let Some(token) = Self::current_token(&credentials, Utc::now())? {
            return Ok(token);
        }

        let refreshed = self.refresh(credentials).await?;
        self.store.save(&refreshed)?;
        Self::current_token(&refreshed, Utc::now())?.ok_or_else(|| {
            AuthError::TokenExpiredAndUnrefreshable(
                "refreshed token is already expired".to_string(),
            )
        })
    }

    /// The usable token, `None` if a refresh is needed first.
    fn current_token(credentials: &Credentials, now: DateTime<Utc>) -> AuthResult<Option<String>> {
        let (state, token) = match credentials {
            Credentials::User(user) => (
                SessionState::evaluate(
                    user.session_expires_at_unix,
                    Some(user.access_token_expires_at_unix),
                    now,
                ),
                Some(&user.access_token),
            ),
            Credentials::ServiceAccountKey(key) => (
                SessionState::evaluate(
                    key.session_expires_at_unix,
                    key.access_token_expires_at_unix,
                    now,
                ),
                key.access_token.as_ref(),
            ),
            Credentials::ServiceAccountToken(token) => {
                let state = if now.timestamp() >= token.session_expires_at_unix {
                    SessionState::Expired
                } else {
                    SessionState::Authorized
                };
                (state, Some(&token.service_account_token))
            }
        };

        match (state, token) {
            (SessionState::Expired, _) => Err(AuthError::TokenExpiredAndUnrefreshable(
                "session time limit reached".to_string(),
            )),
            (SessionState::Authorized, Some(token)) => Ok(Some(token.clone())),
            _ => Ok(None),
        }
    }

    async fn refresh(&self, credentials: Credentials) -> AuthResult<Credentials> {
        match credentials {
            Credentials::User(user) => {
                debug!("refreshing user access token");
                let token_url = user
                    .idp_token_endpoint
                    .clone()
                    .unwrap_or_else(|| self.settings.idp_token_url());
                let tokens = refresh_access_token(
                    &self.http,
                    &token_url,
                    &self.settings.client_id,
                    &user.refresh_token,
                )
                .await
                .map_err(|e| AuthError::from_grant(e, AuthError::TokenExpiredAndUnrefreshable))?;
                Ok(Credentials::User(UserCredentials {
                    access_token_expires_at_unix: token_expiry(&tokens, Utc::now()),
                    access_token: tokens.access_token,
                    refresh_token: tokens.refresh_token.unwrap_or(user.refresh_token),
                    id_token: tokens.id_token.or(user.id_token),
                    ..user
                }))
            }
            Credentials::ServiceAccountKey(key) => {
                debug!("re-signing service account assertion");
                let endpoint = key
                    .token_custom_endpoint
                    .clone()
                    .unwrap_or_else(|| self.settings.token_endpoint.clone());
                let tokens = key.service_account_key.exchange(&self.http, &endpoint).await?;
                Ok(Credentials::ServiceAccountKey(KeyCredentials {
                    access_token_expires_at_unix: Some(token_expiry(&tokens, Utc::now())),
                    access_token: Some(tokens.access_token),
                    ..key
                }))
            }
            Credentials::ServiceAccountToken(_) => Err(AuthError::TokenExpiredAndUnrefreshable(
                "service account tokens cannot be refreshed".to_string(),
            )),
        }
    }

    /// Persist tokens obtained through the browser login.
    pub fn complete_user_login(&self, tokens: TokenResponse) -> AuthResult<String> {
        let now = Utc::now();
        let email = email_from_token(&tokens.access_token)
            .ok_or_else(|| AuthError::Login("access token carries no email claim".to_string()))?;
        let refresh_token = tokens
            .refresh_token
            .clone()
            .ok_or_else(|| AuthError::Login("found no refresh token".to_string()))?;

        let credentials = Credentials::User(UserCredentials {
            access_token_expires_at_unix: token_expiry(&tokens, now),
            access_token: tokens.access_token,
            refresh_token,
            id_token: tokens.id_token,
            user_email: email.clone(),
            session_expires_at_unix: self.session_expires_at(now),
            idp_token_endpoint: Some(self.settings.idp_token_url()),
        });
        self.store.save(&credentials)?;
        debug!("user {} logged in successfully", email);
        Ok(email)
    }

    /// Store an opaque service account token. It is not validated.
    pub fn activate_service_account_token(&self, token: &str) -> AuthResult<Option<String>> {
        let email = email_from_token(token);
        self.store
            .save(&Credentials::ServiceAccountToken(TokenCredentials {
                service_account_token: token.to_string(),
                service_account_email: email.clone(),
                session_expires_at_unix: self.session_expires_at(Utc::now()),
            }))?;
        Ok(email)
    }

    /// Store a key and check it by acquiring a first access token.
    pub async fn activate_service_account_key(
        &self,
        key: ServiceAccountKey,
        token_custom_endpoint: Option<String>,
    ) -> AuthResult<String> {
        let endpoint = token_custom_endpoint
            .clone()
            .unwrap_or_else(|| self.settings.token_endpoint.clone());
        let tokens = key.exchange(&self.http, &endpoint).await?;
        let now = Utc::now();
        let email = email_from_token(&tokens.access_token)
            .unwrap_or_else(|| key.issuer().to_string());

        self.store
            .save(&Credentials::ServiceAccountKey(KeyCredentials {
                access_token_expires_at_unix: Some(token_expiry(&tokens, now)),
                access_token: Some(tokens.access_token),
                service_account_key: key,
                service_account_email: email.clone(),
                session_expires_at_unix: self.session_expires_at(now),
                token_custom_endpoint,
            }))?;
        Ok(email)
    }

    /// Email of the authenticated account.
    pub fn auth_email(&self) -> AuthResult<String> {
        if let Some(token) = &self.env_access_token {
            return Ok(email_from_token(token).unwrap_or_default());
        }
        let credentials = self.store.load()?.ok_or(AuthError::NotLoggedIn)?;
        Ok(credentials.email().unwrap_or_default().to_string())
    }

    pub fn logout(&self) -> AuthResult<()> {
        self.store.clear()
    }

    fn session_expires_at(&self, now: DateTime<Utc>) -> i64 {
        (now + self.settings.session_time_limit).timestamp()
    }
}

/// Expiry from the JWT `exp` claim, else from `expires_in`.
fn token_expiry(tokens: &TokenResponse, now: DateTime<Utc>) -> i64 {
    decode_claims(&tokens.access_token)
        .ok()
        .and_then(|claims| claims.exp)
        .or_else(|| tokens.expires_in.map(|secs| now.timestamp() + secs))
        .unwrap_or_else(|| now.timestamp())
}
