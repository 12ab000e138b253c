use std::fmt::Debug;

use serde_string_enum::{
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
};

/// An authentication method a peer can offer to a router.
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
pub enum AuthMethod {
    /// No authentication is offered.
    #[default]
    #[string = "none"]
    None,
    #[string = "anonymous"]
    Anonymous,
    #[string = "ticket"]
    Ticket,
    #[string = "wampcra"]
    WampCra,
    #[string = "wamp-scram"]
    #[alias = "wampscram"]
    WampScram,
    #[string = "cryptosign"]
    Cryptosign,
}

impl AuthMethod {
    /// The method name, as communicated to the router.
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Anonymous => "anonymous",
            Self::Ticket => "ticket",
            Self::WampCra => "wampcra",
            Self::WampScram => "wamp-scram",
            Self::Cryptosign => "cryptosign",
        }
    }

    /// Whether the method identifies the peer with an authentication ID.
    pub fn requires_id(&self) -> bool {
        match self {
            Self::None | Self::Anonymous => false,
            _ => true,
        }
    }
}

/// Credentials used when joining a realm.
///
/// The secret is never printed, including through [`Debug`].
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub auth_method: AuthMethod,
    pub auth_id: String,
    secret: String,
}

impl Credentials {
    /// Credentials for a connection without authentication.
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates new credentials.
    pub fn new<I, S>(auth_method: AuthMethod, auth_id: I, secret: S) -> Self
    where
        I: Into<String>,
        S: Into<String>,
    {
        Self {
            auth_method,
            auth_id: auth_id.into(),
            secret: secret.into(),
        }
    }

    /// Whether authentication should be offered when joining the realm.
    pub fn authenticates(&self) -> bool {
        self.auth_method != AuthMethod::None
    }

    /// The response to an authentication challenge from the router.
    pub fn challenge_response(&self) -> &str {
        &self.secret
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_method", &self.auth_method)
            .field("auth_id", &self.auth_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod credentials_test {
    use crate::core::credentials::{
        AuthMethod,
        Credentials,
    };

    #[test]
    fn debug_redacts_secret() {
        let credentials = Credentials::new(AuthMethod::Ticket, "user", "hunter2");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("user"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn none_does_not_authenticate() {
        assert!(!Credentials::none().authenticates());
        assert!(Credentials::new(AuthMethod::WampCra, "user", "secret").authenticates());
    }

    #[test]
    fn deserializes_method_names() {
        assert_eq!(
            serde_json::from_str::<AuthMethod>(r#""wampcra""#).unwrap(),
            AuthMethod::WampCra
        );
        assert_eq!(
            serde_json::from_str::<AuthMethod>(r#""wampscram""#).unwrap(),
            AuthMethod::WampScram
        );
        assert_eq!(
            serde_json::from_str::<AuthMethod>(r#""none""#).unwrap(),
            AuthMethod::None
        );
    }
}
