//! Value types carried by WAMP application messages.
//!
//! Payloads are JSON-shaped, so the generic value type is [`serde_json::Value`].

/// A value for WAMP messages.
pub type Value = serde_json::Value;

/// A sequence of values, used for positional arguments.
pub type List = Vec<Value>;

/// A dictionary of key-value pairs, used for keyword arguments.
pub type Dictionary = serde_json::Map<String, Value>;
