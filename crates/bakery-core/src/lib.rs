//! Core domain types for the bakery image build tool.
//!
//! This crate contains:
//! - Build service definitions (templated and resolved forms)
//! - Image references
//! - The image builder trait and its spec/outcome types

pub mod builder;
pub mod error;
pub mod service;

pub use error::{Error, Result};
pub use service::{BuildArg, BuildService, ImageRef, ResolvedBuildService, DEFAULT_NETWORK};
