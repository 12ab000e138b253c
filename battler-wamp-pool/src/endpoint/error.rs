use thiserror::Error;

/// An error for an endpoint that cannot be set up or cannot handle a message.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("wamp client config is missing")]
    MissingClientConfig,
    #[error("the role {0} is not recognized")]
    UnknownRole(String),
    #[error("no topic for the message")]
    MissingTopic,
}
