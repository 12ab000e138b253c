use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::{
    core::{
        options::{
            CallOptions,
            PublishOptions,
            RegisterOptions,
            SubscribeOptions,
        },
        types::{
            Dictionary,
            List,
        },
    },
    session::handler::{
        EventHandler,
        ProcedureHandler,
    },
};

/// An event to publish.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PublishedEvent {
    pub arguments: List,
    pub arguments_keyword: Dictionary,
    pub options: PublishOptions,
}

/// An event received on a subscription.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReceivedEvent {
    /// The topic the event was published to.
    ///
    /// For pattern-based subscriptions, this is the concrete topic, not the pattern.
    pub topic: String,
    pub arguments: List,
    pub arguments_keyword: Dictionary,
    pub details: Dictionary,
}

/// An invocation of a registered procedure.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Invocation {
    /// The procedure being invoked.
    ///
    /// For pattern-based registrations, this is the concrete procedure, not the pattern.
    pub procedure: String,
    pub arguments: List,
    pub arguments_keyword: Dictionary,
    pub details: Dictionary,
}

/// The result of a procedure invocation, sent back by the callee.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RpcYield {
    pub arguments: List,
    pub arguments_keyword: Dictionary,
}

/// A procedure call.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RpcCall {
    pub arguments: List,
    pub arguments_keyword: Dictionary,
    pub options: CallOptions,
}

/// A result of a procedure call.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RpcResult {
    pub arguments: List,
    pub arguments_keyword: Dictionary,
}

/// An active subscription on one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    /// The subscription ID, as given by the router.
    pub id: u64,
}

/// An active procedure registration on one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationHandle {
    /// The registration ID, as given by the router.
    pub id: u64,
}

/// An open WAMP session in a realm.
///
/// Sessions are produced by a [`SessionProvider`][`crate::session::SessionProvider`]. Every
/// resource created on a session (subscriptions, registrations) is discarded by the router when
/// the session ends.
#[async_trait]
pub trait Session: Send + Sync {
    /// The session ID, as given by the router.
    fn id(&self) -> u64;

    /// Publishes an event to a topic.
    async fn publish(&self, topic: &str, event: PublishedEvent) -> Result<()>;

    /// Subscribes to a topic.
    ///
    /// Events are passed to the handler until the session ends.
    async fn subscribe(
        &self,
        topic: &str,
        options: &SubscribeOptions,
        handler: Arc<dyn EventHandler>,
    ) -> Result<SubscriptionHandle>;

    /// Registers a procedure.
    ///
    /// Invocations are passed to the handler until the session ends.
    async fn register(
        &self,
        procedure: &str,
        options: &RegisterOptions,
        handler: Arc<dyn ProcedureHandler>,
    ) -> Result<RegistrationHandle>;

    /// Calls a procedure and waits for its result.
    async fn call(&self, procedure: &str, rpc_call: RpcCall) -> Result<RpcResult>;

    /// Leaves the realm, ending the session.
    async fn leave(&self) -> Result<()>;
}
