use ahash::HashMap;
use anyhow::{
    Error,
    Result,
};
use futures_util::lock::Mutex;
use log::{
    debug,
    warn,
};
use tokio::sync::oneshot;
use uuid::Uuid;

/// A response slot for a request issued by [`PendingRequests::issue`].
#[derive(Debug)]
pub struct PendingResponse<T> {
    id: Uuid,
    response_rx: oneshot::Receiver<T>,
}

impl<T> PendingResponse<T> {
    /// The correlation ID of the request.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Waits for the request to be resolved.
    ///
    /// Fails if the request is dropped from its table without being resolved.
    pub async fn wait(self) -> Result<T> {
        self.response_rx
            .await
            .map_err(|_| Error::msg(format!("request {} was abandoned", self.id)))
    }
}

/// A table of requests waiting for a response that arrives through some other path.
///
/// Each request is identified by a generated correlation ID, which travels with the request and
/// must come back with the response. A request is resolved at most once.
///
/// A request whose [`PendingResponse`] is dropped is no longer awaited, and is removed from the
/// table the next time the table is used.
pub struct PendingRequests<T> {
    requests: Mutex<HashMap<Uuid, oneshot::Sender<T>>>,
}

impl<T> Default for PendingRequests<T> {
    fn default() -> Self {
        Self {
            requests: Mutex::new(HashMap::default()),
        }
    }
}

impl<T> PendingRequests<T>
where
    T: Send,
{
    /// Creates a new request, returning the slot its response is delivered to.
    pub async fn issue(&self) -> PendingResponse<T> {
        let id = Uuid::new_v4();
        let (response_tx, response_rx) = oneshot::channel();
        let mut requests = self.requests.lock().await;
        Self::prune(&mut requests);
        requests.insert(id, response_tx);
        debug!("Issued pending request {id}");
        PendingResponse { id, response_rx }
    }

    /// Resolves a request with its response.
    ///
    /// Returns `false` if the request is unknown, was already resolved, or is no longer awaited.
    pub async fn resolve(&self, id: &Uuid, response: T) -> bool {
        let response_tx = match self.requests.lock().await.remove(id) {
            Some(response_tx) => response_tx,
            None => {
                warn!("Ignoring response for unknown or already resolved request {id}");
                return false;
            }
        };
        if response_tx.send(response).is_err() {
            warn!("Ignoring response for request {id}, which is no longer awaited");
            return false;
        }
        true
    }

    /// Drops a request without resolving it.
    pub async fn abandon(&self, id: &Uuid) {
        self.requests.lock().await.remove(id);
    }

    /// The number of unresolved requests that are still awaited.
    pub async fn len(&self) -> usize {
        let mut requests = self.requests.lock().await;
        Self::prune(&mut requests);
        requests.len()
    }

    /// Whether there are no unresolved requests that are still awaited.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn prune(requests: &mut HashMap<Uuid, oneshot::Sender<T>>) {
        requests.retain(|id, response_tx| {
            let awaited = !response_tx.is_closed();
            if !awaited {
                debug!("Dropping pending request {id}, which is no longer awaited");
            }
            awaited
        });
    }
}

#[cfg(test)]
mod pending_requests_test {
    use uuid::Uuid;

    use crate::pending::PendingRequests;

    #[tokio::test]
    async fn resolves_request_once() {
        let requests = PendingRequests::<u64>::default();
        let response = requests.issue().await;
        let id = response.id();
        assert_eq!(requests.len().await, 1);

        assert!(requests.resolve(&id, 7).await);
        assert!(!requests.resolve(&id, 8).await);
        assert_eq!(response.wait().await.unwrap(), 7);
        assert!(requests.is_empty().await);
    }

    #[tokio::test]
    async fn ignores_unknown_request() {
        let requests = PendingRequests::<u64>::default();
        assert!(!requests.resolve(&Uuid::new_v4(), 1).await);
    }

    #[tokio::test]
    async fn correlates_concurrent_requests() {
        let requests = PendingRequests::<&str>::default();
        let first = requests.issue().await;
        let second = requests.issue().await;
        assert_ne!(first.id(), second.id());

        assert!(requests.resolve(&second.id(), "second").await);
        assert!(requests.resolve(&first.id(), "first").await);
        assert_eq!(first.wait().await.unwrap(), "first");
        assert_eq!(second.wait().await.unwrap(), "second");
    }

    #[tokio::test]
    async fn abandoned_request_fails_waiter() {
        let requests = PendingRequests::<u64>::default();
        let response = requests.issue().await;
        requests.abandon(&response.id()).await;
        assert!(response.wait().await.is_err());
    }

    #[tokio::test]
    async fn dropped_waiter_is_not_resolved() {
        let requests = PendingRequests::<u64>::default();
        let response = requests.issue().await;
        let id = response.id();
        drop(response);
        assert!(!requests.resolve(&id, 1).await);
    }

    #[tokio::test]
    async fn dropped_waiters_leave_table() {
        let requests = PendingRequests::<u64>::default();
        let kept = requests.issue().await;
        for _ in 0..5 {
            drop(requests.issue().await);
        }
        assert_eq!(requests.len().await, 1);

        drop(kept);
        assert!(requests.is_empty().await);
    }
}
