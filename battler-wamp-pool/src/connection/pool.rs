use std::{
    sync::Arc,
    time::Duration,
};

use ahash::HashMap;
use futures_util::lock::Mutex;
use log::info;

use crate::{
    connection::manager::ConnectionManager,
    core::{
        credentials::Credentials,
        key::ConnectionKey,
    },
    session::SessionProvider,
};

/// A registry of shared connections, at most one per [`ConnectionKey`].
///
/// The pool is meant to be created once by the owner of the process (or test) and handed to every
/// consumer that needs a connection. Consumers asking for the same address and realm share the
/// same [`ConnectionManager`] until the connection is closed through the pool. Connections should
/// be closed with [`Self::close_all`] when the pool is no longer needed.
pub struct ConnectionPool {
    provider: Arc<dyn SessionProvider>,
    connections: Mutex<HashMap<ConnectionKey, Arc<ConnectionManager>>>,
}

impl ConnectionPool {
    /// Creates a new pool, opening connections through the given provider.
    pub fn new(provider: Arc<dyn SessionProvider>) -> Self {
        Self {
            provider,
            connections: Mutex::new(HashMap::default()),
        }
    }

    /// Returns the connection for the address and realm, creating and starting it if needed.
    ///
    /// Credentials and the retry delay ceiling are only used when the connection is created.
    /// Connection failures are never returned here; they are reported through the status events of
    /// the returned manager.
    pub async fn get(
        &self,
        address: &str,
        realm: &str,
        credentials: Credentials,
        max_retry_delay: Duration,
    ) -> Arc<ConnectionManager> {
        let key = ConnectionKey::new(address, realm);
        let mut connections = self.connections.lock().await;
        if let Some(manager) = connections.get(&key) {
            return manager.clone();
        }

        info!("Creating connection {key}");
        let manager = Arc::new(ConnectionManager::new(
            key.clone(),
            credentials,
            max_retry_delay,
        ));
        manager.start(self.provider.clone()).await;
        connections.insert(key, manager.clone());
        manager
    }

    /// Closes the connection for the address and realm, if there is one.
    ///
    /// The connection is removed from the pool before it is closed, so a later call to
    /// [`Self::get`] creates a fresh connection. Closing a connection that does not exist does
    /// nothing.
    pub async fn close(&self, address: &str, realm: &str) {
        let key = ConnectionKey::new(address, realm);
        let manager = self.connections.lock().await.remove(&key);
        if let Some(manager) = manager {
            info!("Closing connection {key}");
            manager.close().await;
        }
    }

    /// Closes every connection in the pool.
    pub async fn close_all(&self) {
        let managers = self
            .connections
            .lock()
            .await
            .drain()
            .map(|(_, manager)| manager)
            .collect::<Vec<_>>();
        for manager in managers {
            manager.close().await;
        }
    }

    /// Whether the pool holds a connection for the key.
    pub async fn contains(&self, key: &ConnectionKey) -> bool {
        self.connections.lock().await.contains_key(key)
    }

    /// The number of connections in the pool.
    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    /// Whether the pool holds no connections.
    pub async fn is_empty(&self) -> bool {
        self.connections.lock().await.is_empty()
    }
}
