//! OAuth error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OAuthError {
    /// The token endpoint could not be reached at all.
    #[error("call token endpoint {endpoint}: {source}")]
    Unreachable {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The token endpoint answered with a non-success status.
    #[error("token endpoint returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    #[error("authorization callback failed: {0}")]
    Callback(String),

    #[error("state mismatch in authorization callback")]
    StateMismatch,

    #[error("bind port for login redirect: {0}")]
    Bind(#[from] std::io::Error),
}

impl OAuthError {
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn callback(msg: impl Into<String>) -> Self {
        Self::Callback(msg.into())
    }
}

pub type OAuthResult<T> = Result<T, OAuthError>;
