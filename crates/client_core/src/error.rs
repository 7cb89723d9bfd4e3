use reqwest::StatusCode;
use thiserror::Error;

/// Failure taxonomy for one remote action. Every variant is terminal for that
/// action: the client never retries, and local state is left as it was before
/// the call.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not logged in: missing session token")]
    NotAuthenticated,

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("server returned {status} for {url}")]
    Status { url: String, status: StatusCode },

    #[error("malformed response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("session storage failed: {0}")]
    Session(#[source] anyhow::Error),
}

impl ClientError {
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::NotAuthenticated => true,
            Self::Status { status, .. } => *status == StatusCode::UNAUTHORIZED,
            _ => false,
        }
    }
}
