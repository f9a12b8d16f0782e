use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Conflict,
    RateLimited,
    Internal,
    /// `success: false` on an otherwise successful HTTP exchange.
    Rejected,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            400 | 422 => Self::Validation,
            409 => Self::Conflict,
            429 => Self::RateLimited,
            200..=299 => Self::Rejected,
            _ => Self::Internal,
        }
    }

    pub fn is_auth(self) -> bool {
        matches!(self, Self::Unauthorized | Self::Forbidden)
    }
}

/// Application-level failure reported by the marketplace API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub struct ApiError {
    pub code: ErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            status: None,
            message: Some(message.into()),
        }
    }

    pub fn from_status(status: u16, message: Option<String>) -> Self {
        Self {
            code: ErrorCode::from_status(status),
            status: Some(status),
            message: message.filter(|m| !m.trim().is_empty()),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.status, &self.message) {
            (Some(status), Some(message)) => write!(f, "{:?} ({status}): {message}", self.code),
            (Some(status), None) => write!(f, "{:?} ({status})", self.code),
            (None, Some(message)) => write!(f, "{:?}: {message}", self.code),
            (None, None) => write!(f, "{:?}", self.code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_http_status_to_codes() {
        assert_eq!(ErrorCode::from_status(401), ErrorCode::Unauthorized);
        assert_eq!(ErrorCode::from_status(403), ErrorCode::Forbidden);
        assert_eq!(ErrorCode::from_status(422), ErrorCode::Validation);
        assert_eq!(ErrorCode::from_status(200), ErrorCode::Rejected);
        assert_eq!(ErrorCode::from_status(503), ErrorCode::Internal);
        assert!(ErrorCode::Forbidden.is_auth());
        assert!(!ErrorCode::NotFound.is_auth());
    }

    #[test]
    fn blank_server_message_is_dropped() {
        let err = ApiError::from_status(500, Some("   ".to_string()));
        assert_eq!(err.message, None);
        assert_eq!(err.to_string(), "Internal (500)");
    }
}
