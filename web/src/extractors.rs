//! Custom Axum extractors.
//!
//! [`Correlation`] hands handlers the [`RequestContext`] to pass to
//! upstream calls.
//!
//! # Example
//!
//! ```ignore
//! use pay_selfservice_web::extractors::Correlation;
//!
//! async fn handler(
//!     State(state): State<AppState>,
//!     Correlation(context): Correlation,
//! ) -> Result<Json<Value>, AppError> {
//!     let account = state
//!         .clients
//!         .connector
//!         .get(&context, RequestDescriptor::new("/v1/api/accounts/1"))
//!         .await?;
//!     Ok(Json(account))
//! }
//! ```

use crate::middleware::correlation_id_from_headers;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use pay_selfservice_client::{CorrelationId, RequestContext};

/// Request context of the incoming request.
///
/// Taken from the correlation middleware when installed; otherwise built
/// from the `x-request-id` header, or from a freshly generated id.
#[derive(Debug, Clone)]
pub struct Correlation(pub RequestContext);

#[async_trait]
impl<S> FromRequestParts<S> for Correlation
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(context) = parts.extensions.get::<RequestContext>() {
            return Ok(Self(context.clone()));
        }

        let correlation_id =
            correlation_id_from_headers(&parts.headers).unwrap_or_else(CorrelationId::generate);

        Ok(Self(RequestContext::new(correlation_id)))
    }
}
