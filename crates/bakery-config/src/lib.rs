//! Build manifest parsing for bakery.
//!
//! This crate handles:
//! - Parsing the versioned YAML build manifest into build services
//! - Environment-variable resolution of `${VAR}` placeholders

pub mod error;
pub mod manifest;
pub mod variables;

pub use error::{ConfigError, ConfigResult};
pub use manifest::Manifest;
pub use variables::Environment;
