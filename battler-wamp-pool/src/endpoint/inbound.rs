use std::{
    fmt::Debug,
    str::FromStr,
    sync::Arc,
};

use anyhow::{
    Error,
    Result,
};
use async_trait::async_trait;
use log::{
    debug,
    error,
};
use serde::Deserialize;
use serde_string_enum::{
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
};
use tokio::sync::mpsc;

use crate::{
    connection::ConnectionManager,
    core::{
        arguments::{
            ArgumentParts,
            Arguments,
        },
        match_style::MatchStyle,
        options::{
            RegisterOptions,
            SubscribeOptions,
        },
        types::Value,
    },
    endpoint::{
        client::{
            WampClient,
            require_client,
        },
        error::EndpointError,
        message::InboundMessage,
        status::{
            EndpointStatus,
            StatusTracker,
        },
    },
    pending::PendingRequests,
    session::{
        EventHandler,
        Invocation,
        ProcedureHandler,
        ReceivedEvent,
        RpcYield,
    },
};

/// What an [`InboundEndpoint`] receives.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializeLabeledStringEnum, DeserializeLabeledStringEnum,
)]
pub enum InboundRole {
    /// Events published to a topic.
    #[string = "subscriber"]
    Subscriber,
    /// Invocations of a procedure.
    #[string = "calleeReceiver"]
    CalleeReceiver,
}

/// Configuration for an [`InboundEndpoint`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct InboundConfig {
    pub role: String,
    /// The topic subscribed to, or the procedure registered.
    pub topic: String,
    #[serde(default, rename = "match")]
    pub match_style: MatchStyle,
}

/// Forwards subscription events as messages.
struct ForwardingSubscription {
    messages_tx: mpsc::UnboundedSender<InboundMessage>,
}

#[async_trait]
impl EventHandler for ForwardingSubscription {
    async fn handle_event(&self, event: ReceivedEvent) {
        let message = InboundMessage::Event {
            topic: event.topic,
            payload: ArgumentParts::new(event.arguments, event.arguments_keyword),
        };
        if self.messages_tx.send(message).is_err() {
            debug!("Dropping event because nothing receives messages");
        }
    }
}

/// Forwards invocations as messages, and waits for their responses.
struct DeferredProcedure {
    messages_tx: mpsc::UnboundedSender<InboundMessage>,
    pending: Arc<PendingRequests<Value>>,
}

#[async_trait]
impl ProcedureHandler for DeferredProcedure {
    async fn invoke(&self, invocation: Invocation) -> Result<RpcYield> {
        let response = self.pending.issue().await;
        let id = response.id();
        let message = InboundMessage::Invocation {
            procedure: invocation.procedure,
            payload: ArgumentParts::new(invocation.arguments, invocation.arguments_keyword),
            details: invocation.details,
            invocation: id,
        };
        if self.messages_tx.send(message).is_err() {
            self.pending.abandon(&id).await;
            return Err(Error::msg("invocation cannot be delivered"));
        }
        let (arguments, arguments_keyword) =
            Arguments::from_payload(response.wait().await?).into_parts();
        Ok(RpcYield {
            arguments,
            arguments_keyword,
        })
    }
}

/// An endpoint that receives messages from a shared connection.
///
/// The endpoint's subscription or registration is recorded on the connection under the endpoint's
/// ID, so it is restored on every new session.
pub struct InboundEndpoint {
    id: String,
    role: InboundRole,
    client: Arc<WampClient>,
    connection: Arc<ConnectionManager>,
    status: StatusTracker,
}

impl Debug for InboundEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundEndpoint")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("status", &self.status.status())
            .finish_non_exhaustive()
    }
}

impl InboundEndpoint {
    /// Creates a new endpoint on the client's shared connection.
    ///
    /// Received messages are sent to `messages_tx`.
    pub async fn new<S>(
        id: S,
        config: InboundConfig,
        client: Option<Arc<WampClient>>,
        messages_tx: mpsc::UnboundedSender<InboundMessage>,
    ) -> Result<Self, EndpointError>
    where
        S: Into<String>,
    {
        let id = id.into();
        let client = require_client(&id, client)?;
        let role = match InboundRole::from_str(&config.role) {
            Ok(role) => role,
            Err(err) => {
                error!("Endpoint {id} cannot start: {err}");
                return Err(EndpointError::UnknownRole(config.role));
            }
        };
        let connection = client.connection().await;
        let status = StatusTracker::start(&id, &connection);
        match role {
            InboundRole::Subscriber => connection.subscribe(
                config.topic,
                Arc::new(ForwardingSubscription { messages_tx }),
                SubscribeOptions::with_match_style(config.match_style),
                id.clone(),
            ),
            InboundRole::CalleeReceiver => connection.register_procedure(
                config.topic,
                Arc::new(DeferredProcedure {
                    messages_tx,
                    pending: client.pending_invocations(),
                }),
                RegisterOptions::with_match_style(config.match_style),
                id.clone(),
            ),
        }
        Ok(Self {
            id,
            role,
            client,
            connection,
            status,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> InboundRole {
        self.role
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    pub fn status(&self) -> EndpointStatus {
        self.status.status()
    }

    pub fn status_tracker(&self) -> &StatusTracker {
        &self.status
    }

    /// Closes the shared connection of the endpoint's client.
    pub async fn close(&self) {
        self.client.close().await
    }
}
