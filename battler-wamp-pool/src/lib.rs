//! # battler-wamp-pool
//! ## Shared, self-healing WAMP connections
//!
//! **battler-wamp-pool** keeps one long-lived connection to a **Web Application Message Protocol**
//! (WAMP) router per address and realm, and shares it between every component of a process that
//! needs it.
//!
//! Consumers never deal with sessions directly. They record subscriptions and procedure
//! registrations with a [`ConnectionManager`][`crate::connection::ConnectionManager`] under their
//! own IDs, at any time. Whenever a new session is established, the manager replays every recorded
//! request on it, in the order the requests were first made. Publications and calls pass through to
//! the current session, and are skipped while disconnected.
//!
//! ## Usage
//!
//! A [`ConnectionPool`][`crate::connection::ConnectionPool`] is created once, with a
//! [`SessionProvider`][`crate::session::SessionProvider`] that knows how to open sessions. The
//! provider is responsible for transport details and for reconnecting;
//! [`RetryingSessionProvider`][`crate::session::RetryingSessionProvider`] wraps any
//! [`Connector`][`crate::session::Connector`] with exponential backoff.
//!
//! [`ConnectionPool::get`][`crate::connection::ConnectionPool::get`] returns the shared manager for
//! an address and realm, creating and starting it on first use. Connection progress is observed
//! through [`ConnectionStatus`][`crate::connection::ConnectionStatus`] events: `Ready` every time a
//! session is established, just before the recorded requests are replayed on it, and `Closed`
//! whenever a session is lost or the connection is closed.
//!
//! The [`endpoint`] module builds the message-level roles of a WAMP client (publishers,
//! subscribers, callers, and callees) on top of a shared connection.

extern crate alloc;

pub mod connection;
pub mod core;
pub mod endpoint;
pub mod pending;
pub mod session;
