use crate::oauth::OAuthError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("not logged in")]
    NotLoggedIn,

    #[error("the session has expired and the token cannot be refreshed: {0}")]
    TokenExpiredAndUnrefreshable(String),

    #[error("authentication endpoint {endpoint} is unreachable: {reason}")]
    AuthEndpointUnreachable { endpoint: String, reason: String },

    #[error("invalid service account key: {0}")]
    InvalidServiceAccountKey(String),

    #[error("credential storage: {0}")]
    Storage(String),

    #[error("login: {0}")]
    Login(String),
}

impl AuthError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Map a failed token grant onto the auth taxonomy.
    pub fn from_grant(err: OAuthError, on_rejected: fn(String) -> AuthError) -> Self {
        match err {
            OAuthError::Unreachable { endpoint, source } => Self::AuthEndpointUnreachable {
                endpoint,
                reason: source.to_string(),
            },
            OAuthError::Rejected { status, body } => {
                on_rejected(format!("token endpoint returned HTTP {status}: {body}"))
            }
            other => on_rejected(other.to_string()),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
