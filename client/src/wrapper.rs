//! The request wrapper every upstream call passes through.

use crate::{
    context::{LoggingContext, RequestContext},
    descriptor::RequestDescriptor,
    error::{ClientError, RequestError},
    logging::{CallOutcome, EndOfCall, RequestLogger, TracingRequestLogger},
};
use reqwest::{
    header::{HeaderName, HeaderValue, CONTENT_TYPE},
    Client, Method, Url,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Status codes treated as success. Anything else is a failure, including
/// other 2xx codes such as 203 and 207.
pub const SUCCESS_CODES: [u16; 5] = [200, 201, 202, 204, 206];

/// Header carrying the correlation id to upstream services.
pub const CORRELATION_HEADER: &str = "x-request-id";

/// Whether `status` is in the success set.
#[must_use]
pub fn is_success(status: u16) -> bool {
    SUCCESS_CODES.contains(&status)
}

/// Uniform entry point for outbound calls to upstream REST services.
///
/// Injects the correlation id, defaults `Content-Type` to
/// `application/json`, logs around the call and classifies the response by
/// status code. One call is one attempt: nothing is retried here.
///
/// # Example
///
/// ```no_run
/// use pay_selfservice_client::{RequestContext, RequestDescriptor, RequestWrapper};
/// use reqwest::{Client, Url};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let wrapper = RequestWrapper::new(Client::new())
///     .with_base_url(Url::parse("http://connector.internal")?)
///     .bound_to("get")?;
///
/// let context = RequestContext::detached();
/// let account = wrapper
///     .execute(
///         &context,
///         RequestDescriptor::new("/v1/api/accounts/1")
///             .service("connector")
///             .description("get gateway account"),
///     )
///     .await?;
/// println!("{account}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RequestWrapper {
    client: Client,
    base_url: Option<Url>,
    method: Option<Method>,
    logger: Arc<dyn RequestLogger>,
}

impl RequestWrapper {
    /// Create a wrapper over `client`, logging through `tracing`.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: None,
            method: None,
            logger: Arc::new(TracingRequestLogger),
        }
    }

    /// Resolve relative descriptor URLs against `base_url`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Report log events to `logger` instead of `tracing`.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn RequestLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Use `method` for every call, whatever the descriptor says.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Bind the wrapper to a verb given in any casing (`"get"`, `"Post"`).
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidMethod`] if `verb` is not a valid
    /// HTTP method token.
    pub fn bound_to(self, verb: &str) -> Result<Self, RequestError> {
        let method = Method::from_bytes(verb.to_ascii_uppercase().as_bytes())
            .map_err(|_| RequestError::InvalidMethod(verb.to_string()))?;
        Ok(self.with_method(method))
    }

    /// Base URL relative paths are joined to, if any.
    #[must_use]
    pub const fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Resolve a descriptor URL to an absolute URL.
    ///
    /// Absolute `http`/`https` URLs are used as-is. Anything else is relative
    /// and appended to the base URL's path, so `http://connector/v1` joined
    /// with `/api/accounts` is `http://connector/v1/api/accounts`. The base's
    /// query is kept; a relative query is appended to it.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidUrl`] if the URL is relative and there
    /// is no usable base URL.
    pub fn resolve_url(&self, url: &str) -> Result<Url, RequestError> {
        let absolute = Url::parse(url)
            .ok()
            .filter(|parsed| matches!(parsed.scheme(), "http" | "https"));
        if let Some(absolute) = absolute {
            return Ok(absolute);
        }

        let invalid = |reason: &str| RequestError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let Some(base) = &self.base_url else {
            return Err(invalid("relative URL without a base URL"));
        };
        if base.cannot_be_a_base() {
            return Err(invalid("base URL cannot carry a path"));
        }

        let (rest, fragment) = match url.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (url, None),
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };

        let mut joined = base.clone();
        joined.set_path(&format!(
            "{}/{}",
            base.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        ));

        let query = match (base.query(), query) {
            (Some(base_query), Some(query)) => Some(format!("{base_query}&{query}")),
            (Some(base_query), None) => Some(base_query.to_string()),
            (None, query) => query.map(str::to_string),
        };
        joined.set_query(query.as_deref());
        joined.set_fragment(fragment);

        Ok(joined)
    }

    /// Issue one call and classify its outcome.
    ///
    /// Resolves with the response body (after the descriptor's transform)
    /// when the status is in [`SUCCESS_CODES`]. Bodies are decoded as JSON
    /// when possible, as a JSON string otherwise, and as `null` when empty.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Client`] when the upstream answers with any other
    ///   status
    /// - [`RequestError::Transport`] with the unmodified `reqwest` error when
    ///   the upstream cannot be reached or the body cannot be read
    /// - [`RequestError::InvalidUrl`] / [`RequestError::InvalidHeader`] when
    ///   the call cannot be built; nothing is sent or logged in that case
    pub async fn execute(
        &self,
        context: &RequestContext,
        descriptor: RequestDescriptor,
    ) -> Result<Value, RequestError> {
        let RequestDescriptor {
            url,
            method,
            mut headers,
            body,
            query,
            transform,
            metadata,
        } = descriptor;

        let url = self.resolve_url(&url)?;
        let method = self
            .method
            .clone()
            .or(method)
            .unwrap_or(Method::GET);

        let correlation_id = context.correlation_id();
        headers.insert(
            HeaderName::from_static(CORRELATION_HEADER),
            HeaderValue::from_str(correlation_id.as_str())?,
        );
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let log_context =
            LoggingContext::capture(correlation_id.clone(), url.clone(), method.clone(), metadata);

        let mut request = self.client.request(method, url).headers(headers);
        if !query.is_empty() {
            request = request.query(&query);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let mut end = EndOfCall::start(self.logger.as_ref(), &log_context);

        let response = match request.send().await {
            Ok(response) => response,
            Err(error) => {
                end.finish(CallOutcome::TransportError);
                self.logger.request_error(&log_context, &error);
                return Err(RequestError::Transport(error));
            }
        };

        let status = response.status().as_u16();
        let text = match response.text().await {
            Ok(text) => text,
            Err(error) => {
                end.finish(CallOutcome::TransportError);
                self.logger.request_error(&log_context, &error);
                return Err(RequestError::Transport(error));
            }
        };
        end.finish(CallOutcome::Status(status));

        let body = decode_body(&text);

        if is_success(status) {
            Ok(match transform {
                Some(transform) => transform(body),
                None => body,
            })
        } else {
            let error = ClientError::from_response(log_context.service(), status, &body);
            self.logger.request_failure(&log_context, &error);
            Err(RequestError::Client(error))
        }
    }

    /// [`execute`](Self::execute), then deserialize the body into `T`.
    ///
    /// # Errors
    ///
    /// Everything [`execute`](Self::execute) returns, plus
    /// [`RequestError::Decode`] when the successful body does not fit `T`.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        context: &RequestContext,
        descriptor: RequestDescriptor,
    ) -> Result<T, RequestError> {
        let service = descriptor.metadata().service.clone();
        let body = self.execute(context, descriptor).await?;
        serde_json::from_value(body).map_err(|source| RequestError::Decode { service, source })
    }
}

impl std::fmt::Debug for RequestWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestWrapper")
            .field("base_url", &self.base_url)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
