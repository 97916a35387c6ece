use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The service answered with a non-success status.
    #[error("{}", format_status(*status, reason, request_id.as_deref()))]
    Status {
        status: u16,
        reason: String,
        request_id: Option<String>,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("decode response: {0}")]
    Decode(String),

    #[error("build HTTP client: {0}")]
    Client(String),
}

fn format_status(status: u16, reason: &str, request_id: Option<&str>) -> String {
    match request_id {
        Some(id) => format!("{reason} (HTTP {status}, request id {id})"),
        None => format!("{reason} (HTTP {status})"),
    }
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// 5xx responses and network failures are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500,
            Self::Transport { .. } => true,
            Self::Decode(_) | Self::Client(_) => false,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
