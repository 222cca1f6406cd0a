//! # Pay self-service upstream client
//!
//! Every call the self-service console makes to an upstream REST service
//! (adminusers, connector, ledger, products) goes through
//! [`RequestWrapper`]. The wrapper:
//!
//! - forwards the correlation id of the incoming request in `x-request-id`
//! - defaults `Content-Type` to `application/json`
//! - logs the start and end of every call, plus failures and transport errors
//! - resolves with the response body for 200, 201, 202, 204 and 206 and
//!   rejects with a [`ClientError`] for any other status
//!
//! ## Example
//!
//! ```no_run
//! use pay_selfservice_client::{
//!     ClientConfig, CorrelationId, RequestContext, RequestDescriptor, UpstreamClients,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::from_env()?;
//!     let clients = UpstreamClients::from_config(&config)?;
//!
//!     // Normally taken from the incoming request
//!     let context = RequestContext::new(CorrelationId::new("4b8f0c2e"));
//!
//!     let service = clients
//!         .adminusers
//!         .get(
//!             &context,
//!             RequestDescriptor::new("/v1/api/services/7")
//!                 .description("find service"),
//!         )
//!         .await?;
//!
//!     println!("Service: {service}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod logging;
pub mod services;
pub mod wrapper;

// Re-export main types for convenience
pub use config::{ClientConfig, ConfigError};
pub use context::{CorrelationId, LogMetadata, LoggingContext, RequestContext};
pub use descriptor::{RequestDescriptor, Transform};
pub use error::{ClientError, RequestError, UNKNOWN_ERROR_MESSAGE};
pub use logging::{CallOutcome, RequestLogger, TracingRequestLogger};
pub use services::{ServiceClient, UpstreamClients, UpstreamService};
pub use wrapper::{is_success, RequestWrapper, CORRELATION_HEADER, SUCCESS_CODES};
