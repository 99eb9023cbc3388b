//! Front-end server

use crate::common::{FrontendConfig, Result};
use crate::frontend::client::HttpConnector;
use crate::frontend::http::{create_router, FrontState};
use crate::frontend::naming::{NameResolver, StaticResolver};
use crate::frontend::quorum::QuorumCoordinator;
use std::sync::Arc;

pub struct FrontEnd {
    config: FrontendConfig,
}

impl FrontEnd {
    pub fn new(config: FrontendConfig) -> Self {
        Self { config }
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!("Starting front-end");
        tracing::info!("  HTTP API: {}", self.config.bind_addr);
        tracing::info!("  Replicas: {}", self.config.replica_names().join(", "));
        tracing::info!("  Fan-out: {:?}", self.config.fan_out);

        let resolver = StaticResolver::from_entries(&self.config.registry);
        for name in self.config.replica_names() {
            if let Err(e) = resolver.lookup(&name) {
                tracing::warn!("Replica {} not resolvable yet: {}", name, e);
            }
        }

        let connector = HttpConnector::new(self.config.request_timeout())?;
        let coordinator = QuorumCoordinator::from_config(&self.config, resolver, connector)?;
        let router = create_router(FrontState {
            coordinator: Arc::new(coordinator),
        });

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!("✓ Front-end ready");

        axum::serve(listener, router)
            .with_graceful_shutdown(crate::common::utils::shutdown_signal())
            .await?;

        tracing::info!("Front-end stopped");
        Ok(())
    }
}
