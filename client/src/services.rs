//! Upstream services and verb-bound clients for them.

use crate::{
    config::{ClientConfig, ConfigError},
    context::RequestContext,
    descriptor::RequestDescriptor,
    error::RequestError,
    logging::RequestLogger,
    wrapper::RequestWrapper,
};
use reqwest::{Client, Method, Url};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// REST services the console calls as a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpstreamService {
    /// Users, services and roles
    AdminUsers,
    /// Gateway accounts, charges and refunds
    Connector,
    /// Read-only transaction history
    Ledger,
    /// Payment links
    Products,
}

impl UpstreamService {
    /// Every upstream service.
    pub const ALL: [Self; 4] = [Self::AdminUsers, Self::Connector, Self::Ledger, Self::Products];

    /// Logical name used in logs and errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AdminUsers => "adminusers",
            Self::Connector => "connector",
            Self::Ledger => "ledger",
            Self::Products => "products",
        }
    }
}

impl fmt::Display for UpstreamService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Client for one upstream service.
///
/// Each verb method issues the call through a [`RequestWrapper`] bound to
/// that verb, and names the service in the call's metadata unless the
/// descriptor already does.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    service: UpstreamService,
    wrapper: RequestWrapper,
}

impl ServiceClient {
    /// Client for `service` rooted at `base_url`.
    #[must_use]
    pub fn new(service: UpstreamService, base_url: Url, client: Client) -> Self {
        Self {
            service,
            wrapper: RequestWrapper::new(client).with_base_url(base_url),
        }
    }

    /// Report log events to `logger`.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn RequestLogger>) -> Self {
        self.wrapper = self.wrapper.with_logger(logger);
        self
    }

    /// The service this client talks to.
    #[must_use]
    pub const fn service(&self) -> UpstreamService {
        self.service
    }

    /// Root URL of the service.
    #[must_use]
    pub const fn base_url(&self) -> Option<&Url> {
        self.wrapper.base_url()
    }

    /// Issue a `GET`.
    ///
    /// # Errors
    ///
    /// See [`RequestWrapper::execute`].
    pub async fn get(
        &self,
        context: &RequestContext,
        descriptor: RequestDescriptor,
    ) -> Result<Value, RequestError> {
        self.call(Method::GET, context, descriptor).await
    }

    /// Issue a `POST`.
    ///
    /// # Errors
    ///
    /// See [`RequestWrapper::execute`].
    pub async fn post(
        &self,
        context: &RequestContext,
        descriptor: RequestDescriptor,
    ) -> Result<Value, RequestError> {
        self.call(Method::POST, context, descriptor).await
    }

    /// Issue a `PUT`.
    ///
    /// # Errors
    ///
    /// See [`RequestWrapper::execute`].
    pub async fn put(
        &self,
        context: &RequestContext,
        descriptor: RequestDescriptor,
    ) -> Result<Value, RequestError> {
        self.call(Method::PUT, context, descriptor).await
    }

    /// Issue a `PATCH`.
    ///
    /// # Errors
    ///
    /// See [`RequestWrapper::execute`].
    pub async fn patch(
        &self,
        context: &RequestContext,
        descriptor: RequestDescriptor,
    ) -> Result<Value, RequestError> {
        self.call(Method::PATCH, context, descriptor).await
    }

    /// Issue a `DELETE`.
    ///
    /// # Errors
    ///
    /// See [`RequestWrapper::execute`].
    pub async fn delete(
        &self,
        context: &RequestContext,
        descriptor: RequestDescriptor,
    ) -> Result<Value, RequestError> {
        self.call(Method::DELETE, context, descriptor).await
    }

    async fn call(
        &self,
        method: Method,
        context: &RequestContext,
        mut descriptor: RequestDescriptor,
    ) -> Result<Value, RequestError> {
        if descriptor.metadata.service.is_empty() {
            descriptor.metadata.service = self.service.name().to_string();
        }
        self.wrapper
            .clone()
            .with_method(method)
            .execute(context, descriptor)
            .await
    }
}

/// One client per upstream service, sharing a connection pool.
#[derive(Debug, Clone)]
pub struct UpstreamClients {
    /// Admin/user-management API
    pub adminusers: ServiceClient,
    /// Payment connector API
    pub connector: ServiceClient,
    /// Ledger API
    pub ledger: ServiceClient,
    /// Products API
    pub products: ServiceClient,
}

impl UpstreamClients {
    /// Build the clients, applying the configured transport timeout.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the HTTP client cannot be built
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| ConfigError::ValidationError(format!("cannot build HTTP client: {e}")))?;

        let client = |service| ServiceClient::new(service, config.base_url(service).clone(), http.clone());

        Ok(Self {
            adminusers: client(UpstreamService::AdminUsers),
            connector: client(UpstreamService::Connector),
            ledger: client(UpstreamService::Ledger),
            products: client(UpstreamService::Products),
        })
    }

    /// Report log events of every client to `logger`.
    #[must_use]
    pub fn with_logger(self, logger: &Arc<dyn RequestLogger>) -> Self {
        Self {
            adminusers: self.adminusers.with_logger(Arc::clone(logger)),
            connector: self.connector.with_logger(Arc::clone(logger)),
            ledger: self.ledger.with_logger(Arc::clone(logger)),
            products: self.products.with_logger(Arc::clone(logger)),
        }
    }

    /// The client for `service`.
    #[must_use]
    pub const fn for_service(&self, service: UpstreamService) -> &ServiceClient {
        match service {
            UpstreamService::AdminUsers => &self.adminusers,
            UpstreamService::Connector => &self.connector,
            UpstreamService::Ledger => &self.ledger,
            UpstreamService::Products => &self.products,
        }
    }
}
