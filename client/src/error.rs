//! Error types for outbound calls to upstream services.
//!
//! A call ends in one of three ways: a resolved body, a [`ClientError`]
//! (the upstream answered with a status outside the success set), or a raw
//! transport error (the upstream could not be reached). [`RequestError`]
//! carries the two failure outcomes plus the pre-flight errors raised before
//! anything is sent.

use reqwest::header::InvalidHeaderValue;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Message used when an upstream failure carries no usable body.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// An upstream service answered with a status outside the success set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{service} responded with status {status}: {message}")]
pub struct ClientError {
    message: String,
    service: String,
    status: u16,
    error_identifier: Option<String>,
    reason: Option<String>,
}

impl ClientError {
    /// Create an error without upstream identifier or reason.
    #[must_use]
    pub fn new(message: impl Into<String>, service: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            service: service.into(),
            status,
            error_identifier: None,
            reason: None,
        }
    }

    /// Attach the upstream-defined error identifier.
    #[must_use]
    pub fn with_error_identifier(mut self, error_identifier: impl Into<String>) -> Self {
        self.error_identifier = Some(error_identifier.into());
        self
    }

    /// Attach the upstream-defined reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Build the error from a decoded upstream response body.
    ///
    /// The message is taken from `errors` (arrays joined with `", "`), then
    /// `message`, then the raw body, then [`UNKNOWN_ERROR_MESSAGE`].
    #[must_use]
    pub fn from_response(service: impl Into<String>, status: u16, body: &Value) -> Self {
        let fields = ErrorBody::from_value(body);

        let message = fields
            .errors
            .as_ref()
            .and_then(errors_message)
            .or_else(|| fields.message.as_ref().and_then(plain_message))
            .or_else(|| raw_message(body))
            .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string());

        Self {
            message,
            service: service.into(),
            status,
            error_identifier: fields.error_identifier.as_ref().and_then(plain_message),
            reason: fields.reason.as_ref().and_then(plain_message),
        }
    }

    /// Human-readable message extracted from the upstream body.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Logical name of the upstream service.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// HTTP status returned by the upstream.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Upstream-defined error identifier, if any.
    #[must_use]
    pub fn error_identifier(&self) -> Option<&str> {
        self.error_identifier.as_deref()
    }

    /// Upstream-defined reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

/// Fields an upstream error body may carry. Every field is optional.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    errors: Option<Value>,
    #[serde(default)]
    error_identifier: Option<Value>,
    #[serde(default)]
    reason: Option<Value>,
}

impl ErrorBody {
    fn from_value(body: &Value) -> Self {
        if body.is_object() {
            Self::deserialize(body).unwrap_or_default()
        } else {
            Self::default()
        }
    }
}

fn errors_message(errors: &Value) -> Option<String> {
    match errors {
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(plain_message)
                .collect::<Vec<_>>()
                .join(", ");
            (!joined.is_empty()).then_some(joined)
        }
        other => plain_message(other),
    }
}

fn plain_message(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn raw_message(body: &Value) -> Option<String> {
    match body {
        Value::Object(map) if map.is_empty() => None,
        other => plain_message(other),
    }
}

/// Terminal error of a single outbound call.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The upstream answered with a status outside the success set.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The call could not complete. Carries the transport error unmodified.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The URL could not be resolved to an absolute URL.
    #[error("cannot resolve request URL '{url}': {reason}")]
    InvalidUrl {
        /// URL as supplied by the caller
        url: String,
        /// Why resolution failed
        reason: String,
    },

    /// The verb bound at construction is not a valid HTTP method.
    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),

    /// The correlation id could not be encoded as a header value.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),

    /// A successful body did not match the type the caller asked for.
    #[error("failed to decode {service} response: {source}")]
    Decode {
        /// Logical name of the upstream service
        service: String,
        /// Underlying deserialization error
        source: serde_json::Error,
    },
}

impl RequestError {
    /// The upstream failure, if this is one.
    #[must_use]
    pub const fn as_client_error(&self) -> Option<&ClientError> {
        match self {
            Self::Client(error) => Some(error),
            _ => None,
        }
    }

    /// The raw transport error, if this is one.
    #[must_use]
    pub const fn as_transport_error(&self) -> Option<&reqwest::Error> {
        match self {
            Self::Transport(error) => Some(error),
            _ => None,
        }
    }

    /// Upstream status code for upstream failures.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.as_client_error().map(ClientError::status)
    }
}
