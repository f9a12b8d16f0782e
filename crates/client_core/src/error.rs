use std::io;

use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },
    #[error("server unreachable while calling {endpoint}: {source}")]
    Unreachable {
        endpoint: String,
        source: reqwest::Error,
    },
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("session rejected by server ({status})")]
    Unauthorized {
        status: u16,
        message: Option<String>,
    },
    #[error("api error: {0}")]
    Api(#[from] ApiError),
    #[error("malformed response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        source: serde_json::Error,
    },
    #[error("response from {endpoint} carried no data")]
    MissingData { endpoint: String },
    #[error("not logged in")]
    NotLoggedIn,
    #[error("invalid api url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("session storage failure: {0}")]
    Session(#[from] SessionError),
}

impl ClientError {
    /// True when the server could not be reached at all.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Unreachable { .. })
    }

    pub fn requires_reauth(&self) -> bool {
        match self {
            Self::Unauthorized { .. } | Self::NotLoggedIn => true,
            Self::Api(err) => err.code.is_auth(),
            _ => false,
        }
    }

    /// Message supplied by the server, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api(err) => err.message.as_deref(),
            Self::Unauthorized { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Api(err) => Some(err.code),
            Self::Unauthorized { status, .. } => Some(ErrorCode::from_status(*status)),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to access session file: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt session data: {0}")]
    Corrupt(#[from] serde_json::Error),
}
