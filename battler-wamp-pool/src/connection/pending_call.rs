use anyhow::Result;
use tokio::sync::oneshot;

use crate::session::{
    NotConnectedError,
    RpcResult,
};

/// A procedure call in flight.
///
/// The call proceeds in the background whether or not its result is awaited.
#[derive(Debug)]
pub struct PendingCall {
    procedure: String,
    result_rx: oneshot::Receiver<Result<RpcResult>>,
}

impl PendingCall {
    pub(crate) fn new(procedure: String, result_rx: oneshot::Receiver<Result<RpcResult>>) -> Self {
        Self {
            procedure,
            result_rx,
        }
    }

    /// The procedure being called.
    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    /// Waits for the result of the procedure call.
    pub async fn result(self) -> Result<RpcResult> {
        match self.result_rx.await {
            Ok(result) => result,
            Err(_) => Err(NotConnectedError.into()),
        }
    }
}
