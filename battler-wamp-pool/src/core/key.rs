use std::fmt::Display;

/// Identifies one physical connection to a router.
///
/// A key is the pair of router address and realm. Any number of consumers referencing the same
/// key share the same connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionKey {
    realm: String,
    address: String,
}

impl ConnectionKey {
    /// Creates a new key for a realm on a router address.
    pub fn new<A, R>(address: A, realm: R) -> Self
    where
        A: Into<String>,
        R: Into<String>,
    {
        Self {
            realm: realm.into(),
            address: address.into(),
        }
    }

    /// The router address (e.g., `ws://localhost:8080/ws`).
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The realm joined on the router.
    pub fn realm(&self) -> &str {
        &self.realm
    }
}

impl Display for ConnectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.realm, self.address)
    }
}
