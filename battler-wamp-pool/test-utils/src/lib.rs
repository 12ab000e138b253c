pub mod fake;
pub mod setup;
pub mod wait;
