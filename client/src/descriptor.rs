//! Description of a single outbound call.

use crate::context::LogMetadata;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Function applied to a successful response body before it is returned.
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Everything the wrapper needs to issue one call.
///
/// Built fresh per call and consumed by it.
///
/// # Example
///
/// ```
/// use pay_selfservice_client::RequestDescriptor;
/// use reqwest::Method;
/// use serde_json::json;
///
/// let descriptor = RequestDescriptor::new("/v1/api/accounts/42/charges")
///     .method(Method::POST)
///     .json(json!({"amount": 1000}))
///     .service("connector")
///     .description("create charge")
///     .log_field("gateway_account_id", 42);
/// assert_eq!(descriptor.url(), "/v1/api/accounts/42/charges");
/// ```
#[derive(Clone, Default)]
pub struct RequestDescriptor {
    pub(crate) url: String,
    pub(crate) method: Option<Method>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Value>,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) transform: Option<Transform>,
    pub(crate) metadata: LogMetadata,
}

impl RequestDescriptor {
    /// Start describing a call to an absolute URL or a path relative to the
    /// wrapper's base URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Set the method. Ignored when the wrapper is bound to a verb.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Add or replace a header.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Merge a set of headers, replacing existing values of the same name.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// JSON request body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Append a query string pair.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Apply `transform` to the body of a successful response.
    #[must_use]
    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Logical upstream service name used in logs and errors.
    #[must_use]
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.metadata.service = service.into();
        self
    }

    /// Human description of the call, used in logs.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = description.into();
        self
    }

    /// Extra field carried into the call's log events.
    #[must_use]
    pub fn log_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.extra.insert(key.into(), value.into());
        self
    }

    /// URL or path as supplied.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Logging metadata.
    #[must_use]
    pub const fn metadata(&self) -> &LogMetadata {
        &self.metadata
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("query", &self.query)
            .field("transform", &self.transform.is_some())
            .field("metadata", &self.metadata)
            .finish()
    }
}
