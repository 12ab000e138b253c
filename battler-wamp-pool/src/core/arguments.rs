use crate::core::types::{
    Dictionary,
    List,
    Value,
};

/// Application arguments resolved from a generic payload.
///
/// WAMP messages carry positional and keyword arguments separately. A payload arriving from an
/// endpoint is classified exactly once, at the boundary, into one of these shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Arguments {
    /// A sequence of positional arguments.
    Positional(List),
    /// A dictionary of keyword arguments.
    Keyword(Dictionary),
    /// A single value, sent as the only positional argument.
    Scalar(Value),
}

impl Arguments {
    /// Classifies a payload.
    ///
    /// Objects become keyword arguments, arrays become positional arguments, and everything else
    /// (including `null`) is a scalar.
    pub fn from_payload(payload: Value) -> Self {
        match payload {
            Value::Object(dictionary) => Self::Keyword(dictionary),
            Value::Array(list) => Self::Positional(list),
            value => Self::Scalar(value),
        }
    }

    /// Splits the arguments into the positional and keyword parts of a WAMP message.
    pub fn into_parts(self) -> (List, Dictionary) {
        match self {
            Self::Positional(list) => (list, Dictionary::default()),
            Self::Keyword(dictionary) => (List::default(), dictionary),
            Self::Scalar(value) => (Vec::from_iter([value]), Dictionary::default()),
        }
    }
}

/// Explicit positional and keyword arguments, as carried by call requests and delivered messages.
///
/// Serializes as `{"args": [...], "kwargs": {...}}`.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize)]
pub struct ArgumentParts {
    pub args: List,
    pub kwargs: Dictionary,
}

impl ArgumentParts {
    /// Creates new argument parts.
    pub fn new(args: List, kwargs: Dictionary) -> Self {
        Self { args, kwargs }
    }

    /// Reads `args` and `kwargs` out of a payload object.
    ///
    /// Missing or mistyped parts are empty. A non-object payload yields no arguments.
    pub fn from_payload(payload: &Value) -> Self {
        let args = match payload.get("args") {
            Some(Value::Array(args)) => args.clone(),
            _ => List::default(),
        };
        let kwargs = match payload.get("kwargs") {
            Some(Value::Object(kwargs)) => kwargs.clone(),
            _ => Dictionary::default(),
        };
        Self { args, kwargs }
    }

    /// The parts as a payload value.
    pub fn into_payload(self) -> Value {
        let mut payload = Dictionary::default();
        payload.insert("args".to_owned(), Value::Array(self.args));
        payload.insert("kwargs".to_owned(), Value::Object(self.kwargs));
        Value::Object(payload)
    }
}

impl From<Arguments> for ArgumentParts {
    fn from(value: Arguments) -> Self {
        let (args, kwargs) = value.into_parts();
        Self { args, kwargs }
    }
}

#[cfg(test)]
mod arguments_test {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::core::{
        arguments::{
            ArgumentParts,
            Arguments,
        },
        types::Dictionary,
    };

    #[test]
    fn objects_are_keyword_arguments() {
        let arguments = Arguments::from_payload(json!({"a": 1, "b": "two"}));
        assert_matches::assert_matches!(&arguments, Arguments::Keyword(_));
        let (args, kwargs) = arguments.into_parts();
        assert!(args.is_empty());
        assert_eq!(kwargs.get("a"), Some(&json!(1)));
        assert_eq!(kwargs.get("b"), Some(&json!("two")));
    }

    #[test]
    fn arrays_are_positional_arguments() {
        let (args, kwargs) = Arguments::from_payload(json!([1, "x", null])).into_parts();
        assert_eq!(args, vec![json!(1), json!("x"), json!(null)]);
        assert!(kwargs.is_empty());
    }

    #[test]
    fn scalars_are_single_positional_argument() {
        for payload in [json!("hello"), json!(42), json!(true), json!(null)] {
            let (args, kwargs) = Arguments::from_payload(payload.clone()).into_parts();
            assert_eq!(args, vec![payload]);
            assert!(kwargs.is_empty());
        }
    }

    #[test]
    fn reads_explicit_parts_with_defaults() {
        assert_eq!(
            ArgumentParts::from_payload(&json!({"args": [1, 2]})),
            ArgumentParts::new(vec![json!(1), json!(2)], Dictionary::default())
        );
        assert_eq!(
            ArgumentParts::from_payload(&json!({"kwargs": {"k": "v"}})).kwargs.get("k"),
            Some(&json!("v"))
        );
        assert_eq!(
            ArgumentParts::from_payload(&json!("scalar")),
            ArgumentParts::default()
        );
    }

    #[test]
    fn parts_become_payload_object() {
        assert_eq!(
            ArgumentParts::new(vec![json!(1)], Dictionary::default()).into_payload(),
            json!({"args": [1], "kwargs": {}})
        );
    }
}
