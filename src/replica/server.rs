//! Replica server

use crate::common::{ReplicaConfig, Result};
use crate::replica::http::{create_router, ReplicaState};
use crate::replica::store::AccountStore;
use std::sync::Arc;

pub struct ReplicaServer {
    config: ReplicaConfig,
    store: Arc<AccountStore>,
}

impl ReplicaServer {
    /// The store is created here and owned by the server for its lifetime.
    pub fn new(config: ReplicaConfig) -> Result<Self> {
        let store = Arc::new(AccountStore::with_initial_balance(config.initial_balance)?);
        Ok(Self { config, store })
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!("Starting replica: {}", self.config.name);
        tracing::info!("  RPC API: {}", self.config.bind_addr);
        tracing::info!("  Initial balance: {}", self.config.initial_balance);

        let state = ReplicaState {
            store: self.store.clone(),
            name: self.config.name.clone(),
        };
        let router = create_router(state);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!("✓ Replica {} ready", self.config.name);

        axum::serve(listener, router)
            .with_graceful_shutdown(crate::common::utils::shutdown_signal())
            .await?;

        tracing::info!("Replica {} stopped", self.config.name);
        Ok(())
    }
}
