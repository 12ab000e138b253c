use anyhow::Result;
use async_trait::async_trait;

use crate::session::session::{
    Invocation,
    ReceivedEvent,
    RpcYield,
};

/// A handler for events received on a subscription.
///
/// The same handler object is reused across every session a subscription is restored on.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handles an event published to the subscribed topic.
    async fn handle_event(&self, event: ReceivedEvent);
}

/// A handler for invocations of a registered procedure.
///
/// The same handler object is reused across every session a registration is restored on.
#[async_trait]
pub trait ProcedureHandler: Send + Sync {
    /// Invokes the procedure.
    ///
    /// An error is reported back to the caller.
    async fn invoke(&self, invocation: Invocation) -> Result<RpcYield>;
}
