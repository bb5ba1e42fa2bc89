use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::auth::AuthFailure;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthFailure),

    #[error("Request rejected (status {status}): {errors}")]
    Validation { status: u16, errors: FieldErrors },

    #[error("Server error (status {status}): {body}")]
    Server { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode request body: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Map a non-success status and its body to an error.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let code = status.as_u16();
        match code {
            401 => {
                let errors = FieldErrors::parse(body);
                let message = errors
                    .detail()
                    .map(str::to_string)
                    .unwrap_or_else(|| "Unauthorized".to_string());
                ApiError::Auth(AuthFailure::InvalidCredentials(message))
            }
            400..=499 => ApiError::Validation {
                status: code,
                errors: FieldErrors::parse(body),
            },
            500..=599 => ApiError::Server {
                status: code,
                body: Self::truncate_body(body),
            },
            _ => ApiError::InvalidResponse(format!(
                "Status {}: {}",
                status,
                Self::truncate_body(body)
            )),
        }
    }

    pub(crate) fn storage(err: anyhow::Error) -> Self {
        ApiError::Storage(format!("{:#}", err))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    /// HTTP status carried by the error, when there was a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Validation { status, .. } | ApiError::Server { status, .. } => Some(*status),
            ApiError::Auth(AuthFailure::InvalidCredentials(_)) => Some(401),
            _ => None,
        }
    }
}

/// Structured error payload returned with a 4xx response.
///
/// The backend answers with either `{"detail": ".."}`, `{"error": ".."}`, or a
/// map of field name to a list of messages.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldErrors(Value);

impl FieldErrors {
    pub fn parse(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(value) if !value.is_null() => Self(value),
            _ => {
                let text = body.trim();
                if text.is_empty() {
                    Self(Value::Object(Default::default()))
                } else {
                    Self(serde_json::json!({ "detail": ApiError::truncate_body(text) }))
                }
            }
        }
    }

    /// Top-level message (`detail`, or `error` when the endpoint uses that key)
    pub fn detail(&self) -> Option<&str> {
        self.0
            .get("detail")
            .or_else(|| self.0.get("error"))
            .and_then(Value::as_str)
    }

    /// Messages attached to one field
    pub fn field(&self, name: &str) -> Vec<String> {
        match self.0.get(name) {
            Some(Value::String(msg)) => vec![msg.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(detail) = self.detail() {
            return f.write_str(detail);
        }
        match &self.0 {
            Value::Object(map) if !map.is_empty() => {
                let parts: Vec<String> = map
                    .keys()
                    .map(|key| format!("{}: {}", key, self.field(key).join(", ")))
                    .collect();
                f.write_str(&parts.join("; "))
            }
            Value::Object(_) => f.write_str("no details"),
            other => write!(f, "{}", other),
        }
    }
}
