pub mod arguments;
pub mod credentials;
pub mod key;
pub mod match_style;
pub mod options;
pub mod types;
