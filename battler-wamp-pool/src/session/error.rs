use thiserror::Error;

/// Error for an operation requiring a session when there is none.
#[derive(Debug, Error)]
#[error("not connected")]
pub struct NotConnectedError;

/// Error for a connection that stopped trying to reach the router.
#[derive(Debug, Error)]
#[error("{msg}")]
pub struct ConnectionClosedError {
    msg: String,
}

impl ConnectionClosedError {
    pub fn new<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self { msg: msg.into() }
    }
}
