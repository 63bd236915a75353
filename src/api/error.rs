//! Unified API error handling
//!
//! This module provides a consistent error response format across all API
//! endpoints.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use uuid::Uuid;

use crate::service::companion::{FetchError, PublishError, ToggleError};
use crate::service::session::SessionError;

/// Standard error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Unique request ID for tracing
    pub request_id: String,
    /// Seconds left on the fetch cooldown, present only for cooldown errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<u64>,
}

/// Unified API error type
///
/// All API endpoints should return `Result<T, ApiError>` for consistent
/// error handling.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Session not found (404)
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Thread not found in the session's listing (404)
    #[error("Unknown thread: {0}")]
    ThreadNotFound(String),

    /// Bad request / validation error (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// No text-generation API key configured for the session (409)
    #[error("No OpenAI API key configured for this session; provide one to run analyses")]
    MissingApiKey,

    /// Thread has no analysis yet, nothing to publish (409)
    #[error("Thread has not been analyzed yet: {0}")]
    NotAnalyzed(String),

    /// Fetch blocked by the cooldown (429)
    #[error("Please wait {remaining} seconds before fetching again")]
    CooldownActive { remaining: u64 },

    /// Forum unreachable or rejecting credentials (502)
    #[error("Forum unavailable: {0}")]
    ForumUnavailable(String),

    /// Text-generation service failure (502)
    #[error("Text generation failed: {0}")]
    GenerationFailed(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    #[allow(dead_code)] // Reserved for failures with no finer-grained mapping
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::SessionNotFound(_) | ApiError::ThreadNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingApiKey | ApiError::NotAnalyzed(_) => StatusCode::CONFLICT,
            ApiError::CooldownActive { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ForumUnavailable(_) | ApiError::GenerationFailed(_) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_type = match self {
            ApiError::SessionNotFound(_) => "session_not_found",
            ApiError::ThreadNotFound(_) => "thread_not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::MissingApiKey => "missing_api_key",
            ApiError::NotAnalyzed(_) => "not_analyzed",
            ApiError::CooldownActive { .. } => "cooldown_active",
            ApiError::ForumUnavailable(_) => "forum_unavailable",
            ApiError::GenerationFailed(_) => "generation_failed",
            ApiError::Internal(_) => "internal_error",
        };

        tracing::error!(
            error_type = error_type,
            status = status.as_u16(),
            message = %self,
            "API error"
        );

        let remaining_seconds = match self {
            ApiError::CooldownActive { remaining } => Some(*remaining),
            _ => None,
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            request_id: Uuid::new_v4().to_string(),
            remaining_seconds,
        })
    }
}

// ============================================================================
// From conversions for service errors
// ============================================================================

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) => ApiError::SessionNotFound(id.to_string()),
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Session(e) => e.into(),
            FetchError::CooldownActive { remaining } => ApiError::CooldownActive { remaining },
            FetchError::InvalidLimit => {
                ApiError::BadRequest("limit must be a positive integer".to_string())
            }
            FetchError::Forum(e) => ApiError::ForumUnavailable(e.to_string()),
        }
    }
}

impl From<ToggleError> for ApiError {
    fn from(err: ToggleError) -> Self {
        match err {
            ToggleError::Session(e) => e.into(),
            ToggleError::UnknownThread(id) => ApiError::ThreadNotFound(id),
            ToggleError::MissingApiKey => ApiError::MissingApiKey,
            ToggleError::Analysis(e) => ApiError::GenerationFailed(e.to_string()),
        }
    }
}

impl From<PublishError> for ApiError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::Session(e) => e.into(),
            PublishError::NotAnalyzed(id) => ApiError::NotAnalyzed(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_maps_to_429_with_remaining() {
        let err: ApiError = FetchError::CooldownActive { remaining: 42 }.into();
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert!(err.to_string().contains("42 seconds"));
    }

    #[test]
    fn missing_key_maps_to_conflict() {
        let err: ApiError = ToggleError::MissingApiKey.into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}
