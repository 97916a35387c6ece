//! Credential bundle persisted per profile.
//!
//! The bundle is a tagged union keyed by `auth_flow_type`, one variant per
//! authentication mode. Only one mode is active per profile; activating another
//! mode replaces the stored bundle.
//!
//! ```json
//! {"auth_flow_type":"user_token","access_token":"eyJ...","refresh_token":"...",
//!  "access_token_expires_at_unix":1735600000,"user_email":"jane@example.com",
//!  "session_expires_at_unix":1735640000}
//! ```

use serde::{Deserialize, Serialize};

use super::service_account::ServiceAccountKey;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "auth_flow_type")]
pub enum Credentials {
    #[serde(rename = "user_token")]
    User(UserCredentials),
    #[serde(rename = "sa_key")]
    ServiceAccountKey(KeyCredentials),
    #[serde(rename = "sa_token")]
    ServiceAccountToken(TokenCredentials),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserCredentials {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    pub access_token_expires_at_unix: i64,
    pub user_email: String,
    pub session_expires_at_unix: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idp_token_endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyCredentials {
    pub service_account_key: ServiceAccountKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_expires_at_unix: Option<i64>,
    pub service_account_email: String,
    pub session_expires_at_unix: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_custom_endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenCredentials {
    pub service_account_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_email: Option<String>,
    pub session_expires_at_unix: i64,
}

impl Credentials {
    pub fn flow_name(&self) -> &'static str {
        match self {
            Self::User(_) => "user_token",
            Self::ServiceAccountKey(_) => "sa_key",
            Self::ServiceAccountToken(_) => "sa_token",
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Self::User(user) => Some(user.user_email.as_str()),
            Self::ServiceAccountKey(key) => Some(key.service_account_email.as_str()),
            Self::ServiceAccountToken(token) => token.service_account_email.as_deref(),
        }
    }

    pub fn session_expires_at_unix(&self) -> i64 {
        match self {
            Self::User(user) => user.session_expires_at_unix,
            Self::ServiceAccountKey(key) => key.session_expires_at_unix,
            Self::ServiceAccountToken(token) => token.session_expires_at_unix,
        }
    }
}
