use std::{
    fmt::{
        Debug,
        Display,
    },
    sync::Arc,
    time::Duration,
};

use serde_string_enum::{
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
};
use tokio::sync::mpsc;

use crate::{
    core::{
        credentials::{
            AuthMethod,
            Credentials,
        },
        key::ConnectionKey,
    },
    session::session::Session,
};

/// The transport used to reach a router.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    SerializeLabeledStringEnum,
    DeserializeLabeledStringEnum,
)]
pub enum TransportType {
    #[default]
    #[string = "websocket"]
    WebSocket,
    #[string = "rawsocket"]
    RawSocket,
}

/// Configuration for opening a connection through a [`SessionProvider`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The router address.
    pub transport_url: String,
    /// The transport type.
    pub transport_type: TransportType,
    /// The realm to join.
    pub realm: String,
    /// Whether to keep retrying when the router cannot be reached.
    pub retry_if_unreachable: bool,
    /// The maximum number of consecutive failed attempts before giving up.
    ///
    /// `None` retries forever.
    pub max_retries: Option<u32>,
    /// The ceiling on the delay between attempts.
    pub max_retry_delay: Duration,
    /// Credentials offered when the router challenges the peer.
    ///
    /// `None` joins the realm without authentication.
    pub authentication: Option<Credentials>,
}

impl SessionConfig {
    /// Creates the configuration for a connection to the realm and address of a key.
    ///
    /// Connections retry forever with the given backoff ceiling.
    pub fn new(key: &ConnectionKey, credentials: &Credentials, max_retry_delay: Duration) -> Self {
        Self {
            transport_url: key.address().to_owned(),
            transport_type: TransportType::WebSocket,
            realm: key.realm().to_owned(),
            retry_if_unreachable: true,
            max_retries: None,
            max_retry_delay,
            authentication: credentials
                .authenticates()
                .then(|| credentials.clone()),
        }
    }

    /// The authentication methods offered to the router.
    pub fn auth_methods(&self) -> Vec<AuthMethod> {
        self.authentication
            .iter()
            .map(|credentials| credentials.auth_method)
            .collect()
    }
}

/// The reason a connection closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The connection was closed on request.
    Closed,
    /// An established session was lost.
    Lost,
    /// The router could not be reached.
    Unreachable,
}

impl Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Lost => write!(f, "lost"),
            Self::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// Details of a connection closing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseDetails {
    pub reason: CloseReason,
    pub message: Option<String>,
    /// Whether the provider will attempt to reconnect on its own.
    pub will_retry: bool,
}

impl CloseDetails {
    pub fn new(reason: CloseReason, will_retry: bool) -> Self {
        Self {
            reason,
            message: None,
            will_retry,
        }
    }

    pub fn with_message<S>(mut self, message: S) -> Self
    where
        S: Into<String>,
    {
        self.message = Some(message.into());
        self
    }
}

/// An event reported by a connection.
pub enum ConnectionEvent {
    /// A new session was established.
    Opened(Arc<dyn Session>),
    /// The current session (or connect attempt) ended.
    Closed(CloseDetails),
}

impl Debug for ConnectionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Opened(session) => write!(f, "Opened(session = {})", session.id()),
            Self::Closed(details) => write!(f, "Closed({details:?})"),
        }
    }
}

/// Channel for reporting [`ConnectionEvent`]s back to the owner of a connection.
pub type ConnectionEventSender = mpsc::UnboundedSender<ConnectionEvent>;

/// A handle to a connection opened by a [`SessionProvider`].
pub trait Connection: Send + Sync {
    /// Closes the connection for good.
    ///
    /// Any open session is left, and no further connect attempts are made. A final
    /// [`ConnectionEvent::Closed`] is reported if a session was open.
    fn close(&self);
}

/// A source of WAMP sessions.
///
/// Opening a connection never fails directly. The provider keeps trying to establish a session
/// according to the [`SessionConfig`] and reports every session it opens or loses as a
/// [`ConnectionEvent`]. When a [`ConnectionEvent::Closed`] says the provider will not retry, the
/// connection is finished and a new one must be opened.
pub trait SessionProvider: Send + Sync {
    /// Opens a connection.
    fn open(&self, config: SessionConfig, events_tx: ConnectionEventSender)
    -> Box<dyn Connection>;
}

#[cfg(test)]
mod provider_test {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use crate::{
        core::{
            credentials::{
                AuthMethod,
                Credentials,
            },
            key::ConnectionKey,
        },
        session::provider::SessionConfig,
    };

    #[test]
    fn retries_forever_by_default() {
        let config = SessionConfig::new(
            &ConnectionKey::new("ws://localhost:8080", "realm"),
            &Credentials::none(),
            Duration::from_secs(10),
        );
        assert_eq!(config.transport_url, "ws://localhost:8080");
        assert_eq!(config.realm, "realm");
        assert!(config.retry_if_unreachable);
        assert_eq!(config.max_retries, None);
        assert_eq!(config.max_retry_delay, Duration::from_secs(10));
        assert!(config.authentication.is_none());
        assert!(config.auth_methods().is_empty());
    }

    #[test]
    fn offers_configured_auth_method() {
        let config = SessionConfig::new(
            &ConnectionKey::new("ws://localhost:8080", "realm"),
            &Credentials::new(AuthMethod::Ticket, "user", "secret"),
            Duration::from_secs(10),
        );
        assert_eq!(config.auth_methods(), vec![AuthMethod::Ticket]);
        assert_eq!(
            config
                .authentication
                .as_ref()
                .map(|credentials| credentials.challenge_response()),
            Some("secret")
        );
    }
}
