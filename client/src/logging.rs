//! Structured logging around outbound calls.
//!
//! Every call reports through four hooks: start, end, failure (upstream
//! answered outside the success set) and error (transport failed). Start and
//! end fire exactly once per issued call; failure and error are mutually
//! exclusive.

use crate::{context::LoggingContext, error::ClientError};
use serde_json::Value;
use std::fmt;

/// How a call settled, as reported to [`RequestLogger::request_end`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// A response arrived with this status
    Status(u16),
    /// The transport failed before a complete response was read
    TransportError,
    /// The caller dropped the call before it settled
    Cancelled,
}

impl fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "{status}"),
            Self::TransportError => f.write_str("transport error"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Receiver of the log events of outbound calls.
pub trait RequestLogger: Send + Sync {
    /// The call is about to be issued.
    fn request_start(&self, context: &LoggingContext);

    /// The call settled.
    fn request_end(&self, context: &LoggingContext, outcome: CallOutcome);

    /// The upstream answered with a status outside the success set.
    fn request_failure(&self, context: &LoggingContext, error: &ClientError);

    /// The transport failed.
    fn request_error(&self, context: &LoggingContext, error: &reqwest::Error);
}

/// Default logger emitting `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRequestLogger;

fn extra_fields(context: &LoggingContext) -> Value {
    Value::Object(context.metadata().extra.clone())
}

impl RequestLogger for TracingRequestLogger {
    fn request_start(&self, context: &LoggingContext) {
        let metadata = context.metadata();
        tracing::info!(
            correlation_id = %context.correlation_id(),
            service = %metadata.service,
            method = %context.method(),
            url = %context.url(),
            started_at = %context.started_at().to_rfc3339(),
            description = %metadata.description,
            extra = %extra_fields(context),
            "Calling {} to {}",
            metadata.service,
            metadata.description,
        );
    }

    fn request_end(&self, context: &LoggingContext, outcome: CallOutcome) {
        let elapsed_ms = u64::try_from(context.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            correlation_id = %context.correlation_id(),
            service = %context.service(),
            method = %context.method(),
            url = %context.url(),
            outcome = %outcome,
            elapsed_ms,
            extra = %extra_fields(context),
            "{} to {} ended - elapsed time: {} ms",
            context.method(),
            context.url(),
            elapsed_ms,
        );
    }

    fn request_failure(&self, context: &LoggingContext, error: &ClientError) {
        let metadata = context.metadata();
        tracing::info!(
            correlation_id = %context.correlation_id(),
            service = %metadata.service,
            method = %context.method(),
            url = %context.url(),
            status = error.status(),
            error_identifier = error.error_identifier(),
            message = %error.message(),
            extra = %extra_fields(context),
            "Calling {} to {} failed",
            metadata.service,
            metadata.description,
        );
    }

    fn request_error(&self, context: &LoggingContext, error: &reqwest::Error) {
        let metadata = context.metadata();
        tracing::error!(
            correlation_id = %context.correlation_id(),
            service = %metadata.service,
            method = %context.method(),
            url = %context.url(),
            error = %error,
            extra = %extra_fields(context),
            "Calling {} to {} threw exception",
            metadata.service,
            metadata.description,
        );
    }
}

/// Fires `request_end` exactly once: explicitly via [`EndOfCall::finish`], or
/// with [`CallOutcome::Cancelled`] when the owning future is dropped first.
pub(crate) struct EndOfCall<'a> {
    logger: &'a dyn RequestLogger,
    context: &'a LoggingContext,
    finished: bool,
}

impl<'a> EndOfCall<'a> {
    pub(crate) fn start(logger: &'a dyn RequestLogger, context: &'a LoggingContext) -> Self {
        logger.request_start(context);
        Self {
            logger,
            context,
            finished: false,
        }
    }

    pub(crate) fn finish(&mut self, outcome: CallOutcome) {
        if !self.finished {
            self.finished = true;
            self.logger.request_end(self.context, outcome);
        }
    }
}

impl Drop for EndOfCall<'_> {
    fn drop(&mut self) {
        self.finish(CallOutcome::Cancelled);
    }
}
