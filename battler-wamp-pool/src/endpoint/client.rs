use std::sync::Arc;

use log::error;

use crate::{
    connection::{
        ConnectionManager,
        ConnectionPool,
    },
    core::types::Value,
    endpoint::{
        config::{
            ClientConfig,
            ConfigError,
        },
        error::EndpointError,
    },
    pending::PendingRequests,
};

/// A client of one router connection, shared by every endpoint configured with it.
///
/// The client does not own its connection. The connection lives in the pool, so clients with the
/// same address and realm share it.
pub struct WampClient {
    config: ClientConfig,
    pool: Arc<ConnectionPool>,
    pending_invocations: Arc<PendingRequests<Value>>,
}

impl WampClient {
    /// Creates a new client for a validated configuration.
    pub fn new(config: ClientConfig, pool: Arc<ConnectionPool>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            pool,
            pending_invocations: Arc::new(PendingRequests::default()),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The shared connection, created on first use.
    pub async fn connection(&self) -> Arc<ConnectionManager> {
        self.pool
            .get(
                &self.config.address,
                &self.config.realm,
                self.config.credentials(),
                self.config.max_retry_delay(),
            )
            .await
    }

    /// Closes the shared connection for every endpoint using it.
    pub async fn close(&self) {
        self.pool
            .close(&self.config.address, &self.config.realm)
            .await
    }

    /// Invocations received by callee endpoints that are waiting for a response.
    pub fn pending_invocations(&self) -> Arc<PendingRequests<Value>> {
        self.pending_invocations.clone()
    }
}

/// Resolves the client an endpoint was configured with.
pub(crate) fn require_client(
    id: &str,
    client: Option<Arc<WampClient>>,
) -> Result<Arc<WampClient>, EndpointError> {
    client.ok_or_else(|| {
        error!("Endpoint {id} cannot start: wamp client config is missing");
        EndpointError::MissingClientConfig
    })
}
