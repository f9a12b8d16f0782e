//! User-facing error notices built from validation gaps and API failures.

use client_core::ClientError;
use shared::error::ErrorCode;

pub const UNREACHABLE_MESSAGE: &str = "Server unreachable; check your connection and retry.";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired; please sign in again.";
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong; please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeCategory {
    Auth,
    Network,
    Validation,
    Server,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeContext {
    Login,
    Registration,
    Booking,
    Payment,
    Listing,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    category: NoticeCategory,
    context: NoticeContext,
    message: String,
}

impl Notice {
    pub fn new(
        category: NoticeCategory,
        context: NoticeContext,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            context,
            message: message.into(),
        }
    }

    pub fn from_client_error(context: NoticeContext, err: &ClientError) -> Self {
        let (category, message) = match err {
            ClientError::Timeout { .. } | ClientError::Unreachable { .. } => {
                (NoticeCategory::Network, UNREACHABLE_MESSAGE.to_string())
            }
            ClientError::Unauthorized { .. } | ClientError::NotLoggedIn => {
                (NoticeCategory::Auth, SESSION_EXPIRED_MESSAGE.to_string())
            }
            ClientError::Api(api) => {
                let category = match api.code {
                    ErrorCode::Unauthorized | ErrorCode::Forbidden => NoticeCategory::Auth,
                    ErrorCode::Validation => NoticeCategory::Validation,
                    _ => NoticeCategory::Server,
                };
                let message = api
                    .message
                    .clone()
                    .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
                (category, message)
            }
            ClientError::Transport(_)
            | ClientError::Decode { .. }
            | ClientError::MissingData { .. }
            | ClientError::InvalidUrl(_)
            | ClientError::Session(_) => {
                (NoticeCategory::Unknown, GENERIC_FAILURE_MESSAGE.to_string())
            }
        };
        tracing::warn!(?context, ?category, error = %err, "surfacing api failure");
        Self::new(category, context, message)
    }

    pub fn missing_fields(context: NoticeContext, missing: &[&'static str]) -> Self {
        Self::new(
            NoticeCategory::Validation,
            context,
            format!("Please fill in: {}", missing.join(", ")),
        )
    }

    pub fn requires_reauth(&self) -> bool {
        self.category == NoticeCategory::Auth
    }

    pub fn category(&self) -> NoticeCategory {
        self.category
    }

    pub fn context(&self) -> NoticeContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
