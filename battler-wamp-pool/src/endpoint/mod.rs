//! Message-level WAMP client roles built on a shared connection.
//!
//! A [`WampClient`] describes one router connection. Endpoints share the client's pooled
//! connection and translate between application messages and WAMP interactions:
//!
//! - [`OutboundEndpoint`] publishes events, or answers invocations received by a callee.
//! - [`InboundEndpoint`] delivers subscription events, or procedure invocations that are answered
//!   later through an [`OutboundEndpoint`].
//! - [`CallEndpoint`] calls a procedure and delivers its result.

mod call;
mod client;
mod config;
mod error;
mod inbound;
mod message;
mod outbound;
mod status;

pub use call::{
    CallConfig,
    CallEndpoint,
};
pub use client::WampClient;
pub use config::{
    ClientConfig,
    ConfigError,
};
pub use error::EndpointError;
pub use inbound::{
    InboundConfig,
    InboundEndpoint,
    InboundRole,
};
pub use message::{
    CallRequest,
    CallResponse,
    InboundMessage,
    OutboundMessage,
};
pub use outbound::{
    OutboundConfig,
    OutboundEndpoint,
    OutboundRole,
};
pub use status::{
    EndpointStatus,
    StatusTracker,
};
