use std::{
    fmt::Debug,
    str::FromStr,
    sync::Arc,
};

use log::{
    error,
    info,
    warn,
};
use serde::Deserialize;
use serde_string_enum::{
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
};

use crate::{
    connection::ConnectionManager,
    core::{
        arguments::Arguments,
        options::PublishOptions,
    },
    endpoint::{
        client::{
            WampClient,
            require_client,
        },
        error::EndpointError,
        message::OutboundMessage,
        status::{
            EndpointStatus,
            StatusTracker,
        },
    },
};

/// What an [`OutboundEndpoint`] does with its messages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializeLabeledStringEnum, DeserializeLabeledStringEnum,
)]
pub enum OutboundRole {
    /// Publishes each message as an event.
    #[string = "publisher"]
    Publisher,
    /// Answers the invocation each message refers to.
    #[string = "calleeResponse"]
    CalleeResponse,
}

/// Configuration for an [`OutboundEndpoint`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct OutboundConfig {
    pub role: String,
    /// Topic to publish to.
    ///
    /// If unset, each message must name its own topic.
    #[serde(default)]
    pub topic: Option<String>,
}

/// An endpoint that sends messages out through a shared connection.
pub struct OutboundEndpoint {
    id: String,
    role: OutboundRole,
    topic: Option<String>,
    client: Arc<WampClient>,
    connection: Arc<ConnectionManager>,
    status: StatusTracker,
}

impl Debug for OutboundEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundEndpoint")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("topic", &self.topic)
            .field("status", &self.status.status())
            .finish_non_exhaustive()
    }
}

impl OutboundEndpoint {
    /// Creates a new endpoint on the client's shared connection.
    pub async fn new<S>(
        id: S,
        config: OutboundConfig,
        client: Option<Arc<WampClient>>,
    ) -> Result<Self, EndpointError>
    where
        S: Into<String>,
    {
        let id = id.into();
        let client = require_client(&id, client)?;
        let role = match OutboundRole::from_str(&config.role) {
            Ok(role) => role,
            Err(err) => {
                error!("Endpoint {id} cannot start: {err}");
                return Err(EndpointError::UnknownRole(config.role));
            }
        };
        let connection = client.connection().await;
        let status = StatusTracker::start(&id, &connection);
        Ok(Self {
            id,
            role,
            topic: config.topic,
            client,
            connection,
            status,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> OutboundRole {
        self.role
    }

    pub fn status(&self) -> EndpointStatus {
        self.status.status()
    }

    pub fn status_tracker(&self) -> &StatusTracker {
        &self.status
    }

    /// Handles one message according to the endpoint's role.
    ///
    /// Only a publication without any topic is an error. Publications while disconnected and
    /// responses to unknown invocations are dropped with a warning.
    pub async fn handle(&self, message: OutboundMessage) -> Result<(), EndpointError> {
        match self.role {
            OutboundRole::Publisher => self.publish(message),
            OutboundRole::CalleeResponse => {
                self.respond(message).await;
                Ok(())
            }
        }
    }

    fn publish(&self, message: OutboundMessage) -> Result<(), EndpointError> {
        let topic = match self.topic.clone().or(message.topic) {
            Some(topic) => topic,
            None => {
                error!("Endpoint {} has no topic to publish to", self.id);
                return Err(EndpointError::MissingTopic);
            }
        };
        info!("Endpoint {} publishing to {topic}: {}", self.id, message.payload);
        let (arguments, arguments_keyword) = Arguments::from_payload(message.payload).into_parts();
        self.connection.publish(
            topic,
            arguments,
            arguments_keyword,
            PublishOptions::default(),
        );
        Ok(())
    }

    async fn respond(&self, message: OutboundMessage) {
        let invocation = match message.invocation {
            Some(invocation) => invocation,
            None => {
                warn!(
                    "Endpoint {} received a response that does not refer to an invocation",
                    self.id
                );
                return;
            }
        };
        self.client
            .pending_invocations()
            .resolve(&invocation, message.payload)
            .await;
    }

    /// Closes the shared connection of the endpoint's client.
    pub async fn close(&self) {
        self.client.close().await
    }
}
