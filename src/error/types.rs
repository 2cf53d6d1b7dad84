//! API error types

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::{DispatchError, ToolError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No Xueqiu credential available")]
    NoCredentialAvailable { retry_after_secs: Option<u64> },

    #[error("Upstream rejected credentials: {0}")]
    UpstreamAuth(String),

    #[error("Upstream rate limit exceeded: {0}")]
    UpstreamRateLimited(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnknownTool(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NoCredentialAvailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::UpstreamAuth(_) => StatusCode::BAD_GATEWAY,
            ApiError::UpstreamRateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::Cancelled => StatusCode::REQUEST_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::UnknownTool(_) => "not_found_error",
            ApiError::InvalidRequest(_) => "invalid_request_error",
            ApiError::NoCredentialAvailable { .. } => "credentials_unavailable_error",
            ApiError::UpstreamAuth(_) => "upstream_auth_error",
            ApiError::UpstreamRateLimited(_) => "rate_limit_error",
            ApiError::UpstreamUnavailable(_) => "upstream_error",
            ApiError::Cancelled => "cancelled_error",
            ApiError::Internal(_) => "api_error",
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        let message = err.to_string();
        match err.root() {
            DispatchError::NoCredentialAvailable => ApiError::NoCredentialAvailable {
                retry_after_secs: None,
            },
            DispatchError::UpstreamAuthRejected { .. } => ApiError::UpstreamAuth(message),
            DispatchError::UpstreamRateLimited { .. } => ApiError::UpstreamRateLimited(message),
            DispatchError::UpstreamTransient(_) => ApiError::UpstreamUnavailable(message),
            DispatchError::InvalidParameters(msg) => ApiError::InvalidRequest(msg.clone()),
            DispatchError::Cancelled => ApiError::Cancelled,
            DispatchError::CredentialsExhausted { .. } => ApiError::UpstreamUnavailable(message),
        }
    }
}

impl From<ToolError> for ApiError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::UnknownTool(name) => ApiError::UnknownTool(name),
            ToolError::Dispatch(err) => err.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = match &self {
            ApiError::NoCredentialAvailable { retry_after_secs } => {
                Some(retry_after_secs.unwrap_or(1).max(1))
            }
            _ => None,
        };
        let message = match &self {
            ApiError::Internal(err) => err.to_string(),
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            type_: "error".to_string(),
            error: ErrorDetail {
                type_: self.error_type().to_string(),
                message,
            },
        });

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    #[serde(rename = "type")]
    type_: String,
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    type_: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_mapping() {
        let cases = [
            (DispatchError::NoCredentialAvailable, StatusCode::SERVICE_UNAVAILABLE),
            (
                DispatchError::InvalidParameters("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                DispatchError::UpstreamTransient("502".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                DispatchError::CredentialsExhausted {
                    tried: 2,
                    last: Box::new(DispatchError::UpstreamRateLimited {
                        credential: "token_2".to_string(),
                        message: "slow down".to_string(),
                    }),
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_unknown_tool_is_not_found() {
        let err = ApiError::from(ToolError::UnknownTool("nope".to_string()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_no_credential_sets_retry_after() {
        let response = ApiError::NoCredentialAvailable {
            retry_after_secs: Some(42),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }
}
