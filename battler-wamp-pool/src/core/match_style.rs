use serde_string_enum::{
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
};

/// How a procedure registration or subscription should be matched.
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
pub enum MatchStyle {
    /// The URI must match exactly.
    #[default]
    #[string = "exact"]
    Exact,
    /// The URI is a prefix of matched URIs.
    #[string = "prefix"]
    Prefix,
    /// The URI contains empty components that match any component.
    #[string = "wildcard"]
    Wildcard,
}

impl MatchStyle {
    /// The match option value sent to the router.
    ///
    /// Exact matching is the router default, so no option is sent for it.
    pub fn option_value(&self) -> Option<&'static str> {
        match self {
            Self::Exact => None,
            Self::Prefix => Some("prefix"),
            Self::Wildcard => Some("wildcard"),
        }
    }
}

impl Into<&'static str> for MatchStyle {
    fn into(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Prefix => "prefix",
            Self::Wildcard => "wildcard",
        }
    }
}

#[cfg(test)]
mod match_style_test {
    use crate::core::match_style::MatchStyle;

    #[test]
    fn deserializes_case_insensitive() {
        assert_eq!(
            serde_json::from_str::<MatchStyle>(r#""exact""#).unwrap(),
            MatchStyle::Exact
        );
        assert_eq!(
            serde_json::from_str::<MatchStyle>(r#""Prefix""#).unwrap(),
            MatchStyle::Prefix
        );
        assert_eq!(
            serde_json::from_str::<MatchStyle>(r#""WILDCARD""#).unwrap(),
            MatchStyle::Wildcard
        );
        assert!(serde_json::from_str::<MatchStyle>(r#""fuzzy""#).is_err());
    }

    #[test]
    fn exact_sends_no_option() {
        assert_eq!(MatchStyle::Exact.option_value(), None);
        assert_eq!(MatchStyle::Prefix.option_value(), Some("prefix"));
    }
}
