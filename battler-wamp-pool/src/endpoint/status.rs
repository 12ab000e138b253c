use std::sync::Arc;

use log::debug;
use tokio::{
    sync::{
        broadcast::error::RecvError,
        watch,
    },
    task::JoinHandle,
};

use crate::connection::{
    ConnectionManager,
    ConnectionState,
    ConnectionStatus,
};

/// The connection status shown by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointStatus {
    Connected,
    NotConnected,
}

impl From<ConnectionStatus> for EndpointStatus {
    fn from(value: ConnectionStatus) -> Self {
        match value {
            ConnectionStatus::Ready => Self::Connected,
            ConnectionStatus::Closed => Self::NotConnected,
        }
    }
}

/// Follows the status events of a connection on behalf of one endpoint.
///
/// Tracking stops when the tracker is dropped.
pub struct StatusTracker {
    status_rx: watch::Receiver<EndpointStatus>,
    task: JoinHandle<()>,
}

impl StatusTracker {
    /// Starts tracking a connection.
    pub fn start(id: &str, connection: &Arc<ConnectionManager>) -> Self {
        // Subscribe before reading the current state, so that no event is missed in between.
        let mut events_rx = connection.status_rx();
        let initial = match connection.state() {
            ConnectionState::Connected => EndpointStatus::Connected,
            _ => EndpointStatus::NotConnected,
        };
        let (status_tx, status_rx) = watch::channel(initial);
        let id = id.to_owned();
        let task = tokio::spawn(async move {
            loop {
                match events_rx.recv().await {
                    Ok(event) => {
                        let status = EndpointStatus::from(event);
                        debug!("Endpoint {id} is now {status:?}");
                        status_tx.send_replace(status);
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Self { status_rx, task }
    }

    /// The current status.
    pub fn status(&self) -> EndpointStatus {
        *self.status_rx.borrow()
    }

    /// A receiver of status changes.
    pub fn status_rx(&self) -> watch::Receiver<EndpointStatus> {
        self.status_rx.clone()
    }
}

impl Drop for StatusTracker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
