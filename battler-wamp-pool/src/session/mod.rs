mod error;
mod handler;
mod provider;
mod retry;
mod session;

pub use error::{
    ConnectionClosedError,
    NotConnectedError,
};
pub use handler::{
    EventHandler,
    ProcedureHandler,
};
pub use provider::{
    CloseDetails,
    CloseReason,
    Connection,
    ConnectionEvent,
    ConnectionEventSender,
    SessionConfig,
    SessionProvider,
    TransportType,
};
pub use retry::{
    Backoff,
    Connector,
    EstablishedSession,
    RetryPolicy,
    RetryingSessionProvider,
};
pub use session::{
    Invocation,
    PublishedEvent,
    ReceivedEvent,
    RegistrationHandle,
    RpcCall,
    RpcResult,
    RpcYield,
    Session,
    SubscriptionHandle,
};
