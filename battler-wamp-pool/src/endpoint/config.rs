use std::{
    fmt::Debug,
    time::Duration,
};

use anyhow::Result;
use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::core::{
    credentials::{
        AuthMethod,
        Credentials,
    },
    key::ConnectionKey,
};

/// An error for an invalid [`ClientConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("router address is empty")]
    EmptyAddress,
    #[error("realm is empty")]
    EmptyRealm,
    #[error("authentication method {0} requires an authentication ID")]
    MissingAuthId(&'static str),
}

fn default_max_retry_delay() -> u64 {
    300
}

/// Configuration for a connection to a router, shared by every endpoint that uses it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// The router address.
    #[serde(default)]
    pub address: String,
    /// The realm to join.
    #[serde(default)]
    pub realm: String,
    /// The authentication method offered to the router.
    #[serde(default, alias = "authmethod")]
    pub auth_method: AuthMethod,
    /// The authentication ID.
    #[serde(default, alias = "authid")]
    pub auth_id: String,
    /// The secret used to answer authentication challenges.
    #[serde(default)]
    pub secret: String,
    /// The ceiling on the delay between reconnect attempts, in seconds.
    #[serde(default = "default_max_retry_delay", alias = "maxretrydelay")]
    pub max_retry_delay: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: String::default(),
            realm: String::default(),
            auth_method: AuthMethod::default(),
            auth_id: String::default(),
            secret: String::default(),
            max_retry_delay: default_max_retry_delay(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for an unauthenticated connection.
    pub fn new<A, R>(address: A, realm: R) -> Self
    where
        A: Into<String>,
        R: Into<String>,
    {
        Self {
            address: address.into(),
            realm: realm.into(),
            ..Default::default()
        }
    }

    /// Reads and validates a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config = serde_json::from_str::<Self>(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration describes a usable connection.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.is_empty() {
            return Err(ConfigError::EmptyAddress);
        }
        if self.realm.is_empty() {
            return Err(ConfigError::EmptyRealm);
        }
        if self.auth_method.requires_id() && self.auth_id.is_empty() {
            return Err(ConfigError::MissingAuthId(self.auth_method.name()));
        }
        Ok(())
    }

    /// The pool key of the connection.
    pub fn key(&self) -> ConnectionKey {
        ConnectionKey::new(&self.address, &self.realm)
    }

    /// The credentials offered when joining the realm.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.auth_method, &self.auth_id, &self.secret)
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_secs(self.max_retry_delay)
    }
}

impl Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("address", &self.address)
            .field("realm", &self.realm)
            .field("auth_method", &self.auth_method)
            .field("auth_id", &self.auth_id)
            .field("secret", &"<redacted>")
            .field("max_retry_delay", &self.max_retry_delay)
            .finish()
    }
}
