//! Image build backends for bakery.
//!
//! Hands resolved build services to an external build engine:
//! - Local Docker daemon (via bollard)

pub mod context;
pub mod docker;

pub use bakery_core::builder::{BuildOutcome, BuildSpec, ImageBuilder};
pub use context::pack_context;
pub use docker::DockerBuilder;
