//! Axum middleware for correlation id tracking.
//!
//! # Flow
//!
//! 1. **Extract** the correlation id from the `x-request-id` header (or generate one)
//! 2. **Store** a [`RequestContext`] in request extensions for handlers
//! 3. **Create tracing span** with the correlation_id field
//! 4. **Inject** the correlation id into the response `x-request-id` header
//!
//! Handlers pass the stored context to every upstream call, so the same id
//! reaches adminusers, connector, ledger and products.
//!
//! # Example
//!
//! ```ignore
//! use axum::{routing::get, Router};
//! use pay_selfservice_web::middleware::correlation_id_layer;
//!
//! let app = Router::new()
//!     .route("/my-services", get(list_services))
//!     .layer(correlation_id_layer());
//! ```

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    response::Response,
};
use pay_selfservice_client::{CorrelationId, RequestContext, CORRELATION_HEADER};
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;

/// Create a layer that adds correlation id tracking to all requests.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation id tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation id tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

/// Correlation id carried by `headers`, if present and not blank.
pub(crate) fn correlation_id_from_headers(headers: &HeaderMap) -> Option<CorrelationId> {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(CorrelationId::new)
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id =
            correlation_id_from_headers(req.headers()).unwrap_or_else(CorrelationId::generate);

        req.extensions_mut()
            .insert(RequestContext::new(correlation_id.clone()));

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %req.method(),
            uri = %req.uri(),
        );

        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.instrument(span).await?;

            if let Ok(header_value) = HeaderValue::from_str(correlation_id.as_str()) {
                response
                    .headers_mut()
                    .insert(CORRELATION_HEADER, header_value);
            }

            Ok(response)
        })
    }
}
