//! Application state for Axum handlers.

use pay_selfservice_client::{ClientConfig, ConfigError, UpstreamClients};

/// Application state shared across all HTTP handlers.
///
/// Holds one client per upstream service; cloning shares their
/// connection pool.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Upstream REST clients
    pub clients: UpstreamClients,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(clients: UpstreamClients) -> Self {
        Self { clients }
    }

    /// Build the state from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(UpstreamClients::from_config(config)?))
    }
}
