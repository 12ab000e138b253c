use serde::Serialize;
use uuid::Uuid;

use crate::core::{
    arguments::ArgumentParts,
    types::{
        Dictionary,
        Value,
    },
};

/// A message handed to an [`OutboundEndpoint`][`crate::endpoint::OutboundEndpoint`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OutboundMessage {
    /// Topic to publish to, used when the endpoint has none configured.
    pub topic: Option<String>,
    pub payload: Value,
    /// The invocation being answered, as delivered by an
    /// [`InboundEndpoint`][`crate::endpoint::InboundEndpoint`].
    pub invocation: Option<Uuid>,
}

impl OutboundMessage {
    /// A message carrying only a payload.
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            ..Default::default()
        }
    }

    /// A response to an invocation.
    pub fn response(invocation: Uuid, payload: Value) -> Self {
        Self {
            topic: None,
            payload,
            invocation: Some(invocation),
        }
    }
}

/// A message delivered by an [`InboundEndpoint`][`crate::endpoint::InboundEndpoint`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InboundMessage {
    /// An event received on a subscription.
    Event {
        topic: String,
        payload: ArgumentParts,
    },
    /// An invocation of a registered procedure.
    ///
    /// The invocation stays open until a response carrying the same ID is handed to an outbound
    /// endpoint of the same client.
    Invocation {
        procedure: String,
        payload: ArgumentParts,
        details: Dictionary,
        invocation: Uuid,
    },
}

/// A request handed to a [`CallEndpoint`][`crate::endpoint::CallEndpoint`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CallRequest {
    /// An object with optional `args` and `kwargs`.
    pub payload: Value,
    /// Call options, as understood by
    /// [`CallOptions::from_value`][`crate::core::options::CallOptions::from_value`].
    pub options: Option<Value>,
}

/// The result of a procedure call made by a [`CallEndpoint`][`crate::endpoint::CallEndpoint`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallResponse {
    pub payload: ArgumentParts,
}
