//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::{extractors::Correlation, state::AppState};
use axum::{extract::State, http::StatusCode, Json};
use futures::future::join_all;
use pay_selfservice_client::{RequestDescriptor, UpstreamService};
use serde_json::{json, Map, Value};

/// Simple health check endpoint (for basic liveness).
///
/// Does NOT call any upstream service.
///
/// # Endpoint
///
/// ```text
/// GET /healthcheck
/// ```
///
/// # Response
///
/// ```json
/// { "ping": { "healthy": true } }
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "ping": { "healthy": true } })))
}

/// Health of every upstream service (for readiness).
///
/// Calls each upstream's `/healthcheck` concurrently, forwarding the
/// incoming correlation id.
///
/// # Status Codes
///
/// - 200 OK: every upstream answered with a success status
/// - 503 Service Unavailable: at least one did not
///
/// # Endpoint
///
/// ```text
/// GET /healthcheck/upstreams
/// ```
///
/// # Response
///
/// ```json
/// {
///   "adminusers": { "healthy": true },
///   "connector": { "healthy": true },
///   "ledger": { "healthy": false },
///   "products": { "healthy": true }
/// }
/// ```
pub async fn upstream_health(
    State(state): State<AppState>,
    Correlation(context): Correlation,
) -> (StatusCode, Json<Value>) {
    let checks = UpstreamService::ALL.map(|service| {
        let client = state.clients.for_service(service);
        let context = &context;
        async move {
            let healthy = client
                .get(
                    context,
                    RequestDescriptor::new("/healthcheck").description("check health"),
                )
                .await
                .is_ok();
            (service, healthy)
        }
    });

    let mut report = Map::new();
    let mut all_healthy = true;
    for (service, healthy) in join_all(checks).await {
        all_healthy &= healthy;
        report.insert(service.name().to_string(), json!({ "healthy": healthy }));
    }

    let status = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(Value::Object(report)))
}
