//! Integration tests for the request wrapper against stubbed upstreams.
//!
//! Upstream services are stood up with `wiremock`; log events are captured
//! with a recording `RequestLogger`.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect

use pay_selfservice_client::{
    CallOutcome, ClientError, CorrelationId, LoggingContext, RequestContext, RequestDescriptor,
    RequestError, RequestLogger, RequestWrapper, ServiceClient, UpstreamService,
    CORRELATION_HEADER, SUCCESS_CODES, UNKNOWN_ERROR_MESSAGE,
};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingLogger {
    events: Mutex<Vec<String>>,
    correlation_ids: Mutex<Vec<String>>,
}

impl RecordingLogger {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, context: &LoggingContext, event: String) {
        self.events.lock().unwrap().push(event);
        self.correlation_ids
            .lock()
            .unwrap()
            .push(context.correlation_id().to_string());
    }
}

impl RequestLogger for RecordingLogger {
    fn request_start(&self, context: &LoggingContext) {
        self.record(context, "start".to_string());
    }

    fn request_end(&self, context: &LoggingContext, outcome: CallOutcome) {
        self.record(context, format!("end:{outcome}"));
    }

    fn request_failure(&self, context: &LoggingContext, error: &ClientError) {
        self.record(context, format!("failure:{}", error.status()));
    }

    fn request_error(&self, context: &LoggingContext, _error: &reqwest::Error) {
        self.record(context, "error".to_string());
    }
}

fn wrapper(server: &MockServer, logger: &Arc<RecordingLogger>) -> RequestWrapper {
    RequestWrapper::new(Client::new())
        .with_base_url(Url::parse(&server.uri()).unwrap())
        .with_logger(logger.clone())
}

fn context() -> RequestContext {
    RequestContext::new(CorrelationId::new("corr-123"))
}

#[tokio::test]
async fn test_success_codes_resolve_with_body() {
    let server = MockServer::start().await;
    let logger = Arc::new(RecordingLogger::default());

    for status in SUCCESS_CODES {
        let route = format!("/status/{status}");
        let template = if status == 204 {
            ResponseTemplate::new(status)
        } else {
            ResponseTemplate::new(status).set_body_json(json!({"status": status}))
        };
        Mock::given(method("GET"))
            .and(path(route.as_str()))
            .respond_with(template)
            .expect(1)
            .mount(&server)
            .await;

        let body = wrapper(&server, &logger)
            .execute(&context(), RequestDescriptor::new(route))
            .await
            .unwrap_or_else(|e| panic!("{status} should resolve: {e}"));

        if status == 204 {
            assert_eq!(body, Value::Null);
        } else {
            assert_eq!(body, json!({"status": status}));
        }
    }
}

#[tokio::test]
async fn test_other_codes_reject_with_client_error() {
    let server = MockServer::start().await;
    let logger = Arc::new(RecordingLogger::default());

    for status in [203_u16, 207, 400, 404, 409, 500, 503] {
        let route = format!("/status/{status}");
        Mock::given(method("GET"))
            .and(path(route.as_str()))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({"message": "nope"})))
            .mount(&server)
            .await;

        let error = wrapper(&server, &logger)
            .execute(&context(), RequestDescriptor::new(route).service("ledger"))
            .await
            .expect_err("should reject");

        let client_error = error.as_client_error().expect("client error");
        assert_eq!(client_error.status(), status);
        assert_eq!(client_error.service(), "ledger");
        assert_eq!(client_error.message(), "nope");
    }
}

#[tokio::test]
async fn test_error_message_extraction() {
    let server = MockServer::start().await;
    let logger = Arc::new(RecordingLogger::default());

    Mock::given(path("/errors"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"errors": ["a", "b"]})))
        .mount(&server)
        .await;
    Mock::given(path("/empty"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(path("/text"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream exploded"))
        .mount(&server)
        .await;
    Mock::given(path("/identified"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Refund amount available mismatch",
            "error_identifier": "REFUND_AMOUNT_AVAILABLE_MISMATCH",
            "reason": "amount_available_mismatch"
        })))
        .mount(&server)
        .await;

    let wrapper = wrapper(&server, &logger);
    let fail = |route: &'static str| {
        let wrapper = wrapper.clone();
        async move {
            match wrapper.execute(&context(), RequestDescriptor::new(route)).await {
                Err(RequestError::Client(error)) => error,
                other => panic!("expected client error, got {other:?}"),
            }
        }
    };

    assert_eq!(fail("/errors").await.message(), "a, b");
    assert_eq!(fail("/empty").await.message(), UNKNOWN_ERROR_MESSAGE);
    assert_eq!(fail("/text").await.message(), "upstream exploded");

    let identified = fail("/identified").await;
    assert_eq!(identified.message(), "Refund amount available mismatch");
    assert_eq!(
        identified.error_identifier(),
        Some("REFUND_AMOUNT_AVAILABLE_MISMATCH")
    );
    assert_eq!(identified.reason(), Some("amount_available_mismatch"));
}

#[tokio::test]
async fn test_transform_applied_to_success_body() {
    let server = MockServer::start().await;
    let logger = Arc::new(RecordingLogger::default());

    Mock::given(path("/v1/transaction"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"results": [{"id": 1}], "total": 1})),
        )
        .mount(&server)
        .await;

    let wrapper = wrapper(&server, &logger);

    let transformed = wrapper
        .execute(
            &context(),
            RequestDescriptor::new("/v1/transaction").transform(|body| body["results"].clone()),
        )
        .await
        .unwrap();
    assert_eq!(transformed, json!([{"id": 1}]));

    let untouched = wrapper
        .execute(&context(), RequestDescriptor::new("/v1/transaction"))
        .await
        .unwrap();
    assert_eq!(untouched, json!({"results": [{"id": 1}], "total": 1}));
}

#[tokio::test]
async fn test_transform_not_applied_to_failures() {
    let server = MockServer::start().await;
    let logger = Arc::new(RecordingLogger::default());

    Mock::given(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "not found"})))
        .mount(&server)
        .await;

    let error = wrapper(&server, &logger)
        .execute(
            &context(),
            RequestDescriptor::new("/missing").transform(|_| json!("transformed")),
        )
        .await
        .expect_err("should reject");
    assert_eq!(error.as_client_error().unwrap().message(), "not found");
}

#[tokio::test]
async fn test_correlation_and_content_type_headers() {
    let server = MockServer::start().await;
    let logger = Arc::new(RecordingLogger::default());

    Mock::given(method("POST"))
        .and(path("/v1/api/accounts"))
        .and(header(CORRELATION_HEADER, "corr-123"))
        .and(header("content-type", "application/json"))
        .and(header("x-custom", "kept"))
        .and(body_json(json!({"type": "test"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"gateway_account_id": 9})))
        .expect(1)
        .mount(&server)
        .await;

    let body = wrapper(&server, &logger)
        .execute(
            &context(),
            RequestDescriptor::new("/v1/api/accounts")
                .method(Method::POST)
                .header(
                    CORRELATION_HEADER.parse().unwrap(),
                    HeaderValue::from_static("caller-value"),
                )
                .header("x-custom".parse().unwrap(), HeaderValue::from_static("kept"))
                .json(json!({"type": "test"})),
        )
        .await
        .unwrap();

    assert_eq!(body, json!({"gateway_account_id": 9}));
}

#[tokio::test]
async fn test_caller_content_type_preserved() {
    let server = MockServer::start().await;
    let logger = Arc::new(RecordingLogger::default());

    Mock::given(path("/upload"))
        .and(header("content-type", "text/csv"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    wrapper(&server, &logger)
        .execute(
            &context(),
            RequestDescriptor::new("/upload")
                .method(Method::PUT)
                .header(CONTENT_TYPE, HeaderValue::from_static("text/csv")),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_bound_verb_overrides_descriptor_method() {
    let server = MockServer::start().await;
    let logger = Arc::new(RecordingLogger::default());

    Mock::given(method("GET"))
        .and(path("/v1/api/users/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"external_id": "abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let body = wrapper(&server, &logger)
        .bound_to("get")
        .unwrap()
        .execute(
            &context(),
            RequestDescriptor::new("/v1/api/users/abc").method(Method::POST),
        )
        .await
        .unwrap();

    assert_eq!(body["external_id"], "abc");
}

#[tokio::test]
async fn test_query_pairs_sent() {
    let server = MockServer::start().await;
    let logger = Arc::new(RecordingLogger::default());

    Mock::given(path("/v1/transaction"))
        .and(query_param("account_id", "42"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"page": 3})))
        .expect(1)
        .mount(&server)
        .await;

    let body = wrapper(&server, &logger)
        .execute(
            &context(),
            RequestDescriptor::new("/v1/transaction")
                .query("account_id", "42")
                .query("page", "3"),
        )
        .await
        .unwrap();
    assert_eq!(body["page"], 3);
}

#[tokio::test]
async fn test_success_logs_start_and_end_only() {
    let server = MockServer::start().await;
    let logger = Arc::new(RecordingLogger::default());

    Mock::given(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    wrapper(&server, &logger)
        .execute(&context(), RequestDescriptor::new("/ok"))
        .await
        .unwrap();

    assert_eq!(logger.events(), vec!["start", "end:200"]);
    assert!(logger
        .correlation_ids
        .lock()
        .unwrap()
        .iter()
        .all(|id| id == "corr-123"));
}

#[tokio::test]
async fn test_failure_logs_failure_not_error() {
    let server = MockServer::start().await;
    let logger = Arc::new(RecordingLogger::default());

    Mock::given(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let _ = wrapper(&server, &logger)
        .execute(&context(), RequestDescriptor::new("/gone"))
        .await;

    assert_eq!(logger.events(), vec!["start", "end:404", "failure:404"]);
}

#[tokio::test]
async fn test_transport_error_is_raw_and_logged_as_error() {
    // Bind then release a port so nothing is listening on it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let logger = Arc::new(RecordingLogger::default());
    let wrapper = RequestWrapper::new(Client::new())
        .with_base_url(Url::parse(&format!("http://127.0.0.1:{port}")).unwrap())
        .with_logger(logger.clone());

    let error = wrapper
        .execute(&context(), RequestDescriptor::new("/v1/api/users"))
        .await
        .expect_err("nothing is listening");

    let transport = error.as_transport_error().expect("raw transport error");
    assert!(transport.is_connect());
    assert!(error.as_client_error().is_none());

    assert_eq!(logger.events(), vec!["start", "end:transport error", "error"]);
}

#[tokio::test]
async fn test_truncated_body_is_transport_error() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Headers promise more body than is sent before the connection closes
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let upstream = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0_u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let read = socket.read(&mut buf).await.unwrap();
            if read == 0 {
                break;
            }
            request.extend_from_slice(&buf[..read]);
        }
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{\"results\":",
            )
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });

    let logger = Arc::new(RecordingLogger::default());
    let wrapper = RequestWrapper::new(Client::new())
        .with_base_url(Url::parse(&format!("http://127.0.0.1:{port}")).unwrap())
        .with_logger(logger.clone());

    let error = wrapper
        .execute(&context(), RequestDescriptor::new("/v1/transaction"))
        .await
        .expect_err("body is cut short");

    assert!(error.as_transport_error().is_some());
    assert!(error.as_client_error().is_none());
    assert_eq!(logger.events(), vec!["start", "end:transport error", "error"]);

    upstream.await.unwrap();
}

#[tokio::test]
async fn test_dropped_call_still_logs_end() {
    let server = MockServer::start().await;
    let logger = Arc::new(RecordingLogger::default());

    Mock::given(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let wrapper = wrapper(&server, &logger);
    let context = context();
    let call = wrapper.execute(&context, RequestDescriptor::new("/slow"));
    let timed_out = tokio::time::timeout(Duration::from_millis(100), call).await;

    assert!(timed_out.is_err());
    assert_eq!(logger.events(), vec!["start", "end:cancelled"]);
}

#[tokio::test]
async fn test_unresolvable_url_sends_and_logs_nothing() {
    let logger = Arc::new(RecordingLogger::default());
    let wrapper = RequestWrapper::new(Client::new()).with_logger(logger.clone());

    let error = wrapper
        .execute(&context(), RequestDescriptor::new("/v1/api/services"))
        .await
        .expect_err("no base URL");

    assert!(matches!(error, RequestError::InvalidUrl { .. }));
    assert!(logger.events().is_empty());
}

#[tokio::test]
async fn test_service_client_names_service() {
    let server = MockServer::start().await;
    let logger = Arc::new(RecordingLogger::default());

    Mock::given(method("DELETE"))
        .and(path("/v1/api/products/p1"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"errors": ["in use"]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ServiceClient::new(
        UpstreamService::Products,
        Url::parse(&server.uri()).unwrap(),
        Client::new(),
    )
    .with_logger(logger.clone());

    let error = client
        .delete(&context(), RequestDescriptor::new("/v1/api/products/p1"))
        .await
        .expect_err("should reject");

    let client_error = error.as_client_error().unwrap();
    assert_eq!(client_error.service(), "products");
    assert_eq!(client_error.message(), "in use");
}

#[tokio::test]
async fn test_execute_json_decodes_typed_body() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Service {
        id: u32,
        name: String,
    }

    let server = MockServer::start().await;
    let logger = Arc::new(RecordingLogger::default());

    Mock::given(path("/v1/api/services/7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "Pay for parking"})),
        )
        .mount(&server)
        .await;

    let wrapper = wrapper(&server, &logger);

    let service: Service = wrapper
        .execute_json(&context(), RequestDescriptor::new("/v1/api/services/7"))
        .await
        .unwrap();
    assert_eq!(
        service,
        Service {
            id: 7,
            name: "Pay for parking".to_string()
        }
    );

    let result: Result<Vec<u32>, _> = wrapper
        .execute_json(
            &context(),
            RequestDescriptor::new("/v1/api/services/7").service("adminusers"),
        )
        .await;
    assert!(matches!(result, Err(RequestError::Decode { service, .. }) if service == "adminusers"));
}
