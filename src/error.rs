use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MALFORMED_HINT: &str =
    "The AI response could not be parsed. Try simplifying your CSS or converting it in smaller pieces.";

/// Every way a conversion can fail. Each variant maps to one HTTP status.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Bad client input
    #[error("{message}")]
    Validation { message: String },

    /// The server has no API key
    #[error("API key is not configured")]
    Configuration,

    /// Could not reach the upstream API at all
    #[error("upstream transport failure: {0:#}")]
    UpstreamTransport(anyhow::Error),

    /// The upstream API answered with a non-success status
    #[error("upstream returned HTTP {status}")]
    UpstreamApi { status: u16, message: Option<String> },

    /// The upstream answered 2xx but with no usable text
    #[error("upstream returned no text")]
    EmptyResponse,

    /// The upstream text is not a valid `{output, analysis}` object
    #[error("upstream output is not a valid conversion result: {reason}")]
    MalformedOutput { reason: String },
}

/// JSON body sent to clients on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl RelayError {
    pub fn validation(message: impl Into<String>) -> Self {
        RelayError::Validation {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Validation { .. } => StatusCode::BAD_REQUEST,
            RelayError::UpstreamApi { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            RelayError::Configuration
            | RelayError::UpstreamTransport(_)
            | RelayError::EmptyResponse
            | RelayError::MalformedOutput { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// What the client sees. Specific for input errors, generic for the rest.
    pub fn body(&self) -> ErrorBody {
        let (error, details) = match self {
            RelayError::Validation { message } => (message.clone(), None),
            RelayError::Configuration => (
                "Server configuration error".to_string(),
                Some("API key is not configured".to_string()),
            ),
            RelayError::UpstreamTransport(_) => (
                "Failed to reach the conversion service".to_string(),
                None,
            ),
            RelayError::UpstreamApi { message, .. } => (
                "Conversion service returned an error".to_string(),
                message.clone(),
            ),
            RelayError::EmptyResponse => (
                "Conversion service returned an empty response".to_string(),
                None,
            ),
            RelayError::MalformedOutput { .. } => (
                "Failed to parse conversion result".to_string(),
                Some(MALFORMED_HINT.to_string()),
            ),
        };
        ErrorBody { error, details }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match &self {
            RelayError::Validation { .. } => tracing::debug!("client error: {}", self),
            RelayError::UpstreamApi { .. } => tracing::warn!("upstream error: {}", self),
            _ => tracing::error!("conversion failed: {}", self),
        }

        (self.status_code(), Json(self.body())).into_response()
    }
}
