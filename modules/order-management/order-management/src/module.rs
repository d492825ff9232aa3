//! Order management module definition
//!
//! Builds the domain service from configuration and exposes it as tonic
//! routes for the host binary to serve.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tonic::service::Routes;

use order_management_sdk::{OrderManagementServer, SERVICE_NAME};

use crate::api::grpc::OrderManagementServiceImpl;
use crate::config::{CatalogConfig, OrderServiceConfig};
use crate::domain::{Catalog, InMemoryCatalog, Service};

/// Order management module.
pub struct OrderManagementModule {
    service: Service,
    config: OrderServiceConfig,
}

impl OrderManagementModule {
    #[must_use]
    pub fn new(catalog: Arc<dyn Catalog>, config: OrderServiceConfig) -> Self {
        Self {
            service: Service::new(catalog),
            config,
        }
    }

    /// Module backed by an in-memory catalog of the configured items.
    #[must_use]
    pub fn from_config(config: OrderServiceConfig, catalog: &CatalogConfig) -> Self {
        let catalog = InMemoryCatalog::new(catalog.items.iter().cloned());
        tracing::info!(
            items = catalog.len(),
            stream_buffer = config.stream_buffer,
            max_call_duration_ms = config.max_call_duration_ms,
            "order management module initialized"
        );
        Self::new(Arc::new(catalog), config)
    }

    /// gRPC server for the service; calls in flight are cancelled once
    /// `shutdown` fires.
    #[must_use]
    pub fn grpc_service(
        &self,
        shutdown: CancellationToken,
    ) -> OrderManagementServer<OrderManagementServiceImpl> {
        OrderManagementServer::new(OrderManagementServiceImpl::new(
            self.service.clone(),
            self.config.clone(),
            shutdown,
        ))
    }

    /// Routes serving [`SERVICE_NAME`].
    #[must_use]
    pub fn routes(&self, shutdown: CancellationToken) -> Routes {
        tracing::debug!(service_name = SERVICE_NAME, "registering gRPC service");
        Routes::new(self.grpc_service(shutdown))
    }
}
