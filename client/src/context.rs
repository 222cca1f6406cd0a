//! Correlation and logging context.
//!
//! The correlation id belongs to the incoming request being handled. It is
//! handed to the wrapper explicitly through [`RequestContext`] and read once
//! per call when the [`LoggingContext`] is captured.

use chrono::{DateTime, Utc};
use reqwest::{Method, Url};
use serde_json::{Map, Value};
use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Identifier shared by every outbound call made while handling one
/// incoming request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Wrap an existing identifier, e.g. one received from a caller.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh identifier (32 lower-case hex characters).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Borrow the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-incoming-request values read by outbound calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    correlation_id: CorrelationId,
}

impl RequestContext {
    /// Context for calls made on behalf of the given correlation id.
    #[must_use]
    pub const fn new(correlation_id: CorrelationId) -> Self {
        Self { correlation_id }
    }

    /// Context for calls made outside any incoming request.
    #[must_use]
    pub fn detached() -> Self {
        Self::new(CorrelationId::generate())
    }

    /// The ambient correlation id.
    #[must_use]
    pub const fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }
}

/// Free-form metadata carried on a call purely for logging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogMetadata {
    /// Logical upstream service name (`connector`, `ledger`, ...)
    pub service: String,
    /// What the call is for, e.g. "get gateway account"
    pub description: String,
    /// Any further fields worth logging (gateway account id, ...)
    pub extra: Map<String, Value>,
}

/// Snapshot taken when a call starts. Read-only for the lifetime of the call.
#[derive(Debug, Clone)]
pub struct LoggingContext {
    correlation_id: CorrelationId,
    started_at: DateTime<Utc>,
    started: Instant,
    url: Url,
    method: Method,
    metadata: LogMetadata,
}

impl LoggingContext {
    /// Capture the context of a call about to be issued.
    #[must_use]
    pub fn capture(
        correlation_id: CorrelationId,
        url: Url,
        method: Method,
        metadata: LogMetadata,
    ) -> Self {
        Self {
            correlation_id,
            started_at: Utc::now(),
            started: Instant::now(),
            url,
            method,
            metadata,
        }
    }

    /// Correlation id the call was issued under.
    #[must_use]
    pub const fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Wall-clock start time.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time since the call started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Resolved absolute URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// HTTP method used for the call.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Logging metadata supplied by the caller.
    #[must_use]
    pub const fn metadata(&self) -> &LogMetadata {
        &self.metadata
    }

    /// Logical upstream service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.metadata.service
    }
}
