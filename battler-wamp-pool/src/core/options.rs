use std::time::Duration;

use crate::core::{
    match_style::MatchStyle,
    types::Value,
};

/// Options for subscribing to a topic.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// How the subscription should be matched for published events.
    pub match_style: MatchStyle,
}

impl SubscribeOptions {
    pub fn with_match_style(match_style: MatchStyle) -> Self {
        Self { match_style }
    }
}

/// Options for registering a procedure.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegisterOptions {
    /// How the procedure should be matched for procedure calls.
    pub match_style: MatchStyle,
    /// The caller's identity should be disclosed.
    pub disclose_caller: bool,
}

impl RegisterOptions {
    pub fn with_match_style(match_style: MatchStyle) -> Self {
        Self {
            match_style,
            ..Default::default()
        }
    }
}

/// Options for publishing an event.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    /// The router should acknowledge the publication.
    pub acknowledge: bool,
    /// The publisher should not receive its own event, even if subscribed.
    pub exclude_me: bool,
    /// The publisher's identity should be disclosed to subscribers.
    pub disclose_me: bool,
}

/// Options for calling a procedure.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CallOptions {
    /// Timeout for the call, enforced by the router or callee.
    pub timeout: Option<Duration>,
    /// The caller's identity should be disclosed to the callee.
    pub disclose_me: bool,
}

impl CallOptions {
    /// Reads call options from a message's options object.
    ///
    /// Understands `timeout` (in milliseconds) and `disclose_me`. Unknown keys are ignored.
    pub fn from_value(value: &Value) -> Self {
        let timeout = value
            .get("timeout")
            .and_then(|timeout| timeout.as_u64())
            .filter(|timeout| *timeout > 0)
            .map(Duration::from_millis);
        let disclose_me = value
            .get("disclose_me")
            .and_then(|disclose_me| disclose_me.as_bool())
            .unwrap_or(false);
        Self {
            timeout,
            disclose_me,
        }
    }
}
