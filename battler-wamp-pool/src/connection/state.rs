use std::fmt::Display;

/// The lifecycle state of a [`ConnectionManager`][`crate::connection::ConnectionManager`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session, and no connect attempt in flight.
    #[default]
    Disconnected,
    /// Waiting for the provider to establish a session.
    Connecting,
    /// A session is open.
    Connected,
    /// Closing was requested, and the last session is ending.
    Closing,
    /// Closed for good.
    Closed,
}

impl ConnectionState {
    /// Whether the state is terminal or on its way to being terminal.
    pub fn closing(&self) -> bool {
        match self {
            Self::Closing | Self::Closed => true,
            _ => false,
        }
    }
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// A status event emitted by a [`ConnectionManager`][`crate::connection::ConnectionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// A new session is usable.
    ///
    /// This is the only signal that publishing and calling are safe.
    Ready,
    /// There is no usable session.
    ///
    /// Emitted before every connect attempt and once when the connection closes for good.
    Closed,
}
